//! Smoke tests for the pagecheck CLI
//!
//! These run the built binary against small local pages.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the pagecheck binary
fn pagecheck() -> Command {
    Command::cargo_bin("pagecheck").expect("pagecheck binary should exist")
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    pagecheck()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    pagecheck()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_no_args_fails() {
    pagecheck().assert().failure();
}

// ============================================================================
// Catalog and Generation
// ============================================================================

#[test]
fn test_bugs_lists_catalog() {
    pagecheck()
        .arg("bugs")
        .assert()
        .success()
        .stdout(predicate::str::contains("broken_link"))
        .stdout(predicate::str::contains("combined_form"));
}

#[test]
fn test_generate_to_stdout() {
    pagecheck()
        .args(["generate", "-b", "javascript_link"])
        .assert()
        .success()
        .stdout(predicate::str::contains("javascript:void(0);"));
}

#[test]
fn test_generate_unknown_family_fails() {
    pagecheck()
        .args(["generate", "-b", "no_such_bug"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no known bug families"));
}

#[test]
fn test_generate_to_file_and_check() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("buggy.html");
    pagecheck()
        .args(["generate", "-b", "empty_button", "--check", "--color", "never", "-o"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("########## BUTTON TESTS ##########"));
    assert_eq!(fs::read_to_string(&page).unwrap(), "<button></button>");
}

// ============================================================================
// Check
// ============================================================================

#[test]
fn test_check_file_text_report() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("page.html");
    fs::write(&page, r#"<button type="button">Save</button><a>Link Without Href</a>"#).unwrap();

    pagecheck()
        .args(["check", "--no-network", "--color", "never"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("### Button 1 ###\nButton Text: Save\n"))
        .stdout(predicate::str::contains("Href Test: FAILED (No href attribute)"))
        .stdout(predicate::str::contains("########## FORM TESTS ##########\n\nNo results found."));
}

#[test]
fn test_check_json_to_file() {
    let temp = TempDir::new().unwrap();
    let report = temp.path().join("report.json");

    pagecheck()
        .args(["check", "<button>Go</button>", "-c", "buttons", "--format", "json", "-q", "-o"])
        .arg(&report)
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["categories"], serde_json::json!(["buttons"]));
    assert_eq!(json["buttons"][0]["outcome"]["verdict"], "PASSED");
}

#[test]
fn test_fail_on_defects_exit_code() {
    pagecheck()
        .args(["check", "<button></button>", "-c", "buttons", "-q"])
        .assert()
        .success();
    pagecheck()
        .args(["check", "<button></button>", "-c", "buttons", "-q", "--fail-on-defects"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 element(s) failed"));
}

#[test]
fn test_suggest_without_key_fails() {
    let temp = TempDir::new().unwrap();
    let report = temp.path().join("report.json");
    fs::write(&report, "{}").unwrap();
    pagecheck()
        .env_remove("OPENAI_API_KEY")
        .arg("suggest")
        .arg(&report)
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key"));
}
