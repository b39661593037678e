//! End-to-end scenarios against the in-process driver
//!
//! Each scenario loads a small page, runs the full engine and inspects the
//! resulting verdicts.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use pagecheck::checks::names;
use pagecheck::{
    compose, run_session, CheckOutcome, ElementKind, EngineConfig, LinkProbe, PageSource,
    ProbeError, ProbeResponse, QaEngine, StaticDriver, StaticFactory, TestReport, Verdict,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Probe answering every URL with one status
#[derive(Debug, Default)]
struct FixedProbe {
    status: u16,
    calls: AtomicUsize,
}

impl FixedProbe {
    fn new(status: u16) -> Self {
        Self {
            status,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LinkProbe for FixedProbe {
    async fn probe(&self, _url: &str, _timeout: Duration) -> Result<ProbeResponse, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProbeResponse {
            status: self.status,
            body_len: 64,
        })
    }
}

fn engine() -> QaEngine {
    QaEngine::new(EngineConfig::immediate())
}

async fn check(html: &str) -> TestReport {
    run_session(&StaticFactory::default(), &engine(), &PageSource::from_input(html))
        .await
        .unwrap()
}

// ============================================================================
// Links
// ============================================================================

#[tokio::test]
async fn test_broken_link_reports_status() {
    let probe = Arc::new(FixedProbe::new(404));
    let engine = engine().with_probe(probe.clone());
    let factory = StaticFactory::new(StaticDriver::new().with_base_url("http://site.test/"));
    let source = PageSource::from_input(r#"<a href="nonexistent.html">Broken Link</a>"#);

    let report = run_session(&factory, &engine, &source).await.unwrap();
    let link = &report.links[0];
    assert_eq!(link.check(names::HREF).unwrap().outcome(), CheckOutcome::Passed);
    let broken = link.check(names::BROKEN_LINK).unwrap();
    assert_eq!(broken.outcome(), CheckOutcome::Failed);
    assert_eq!(broken.result.reason, "Status Code: 404");
    assert_eq!(link.check(names::CLICK).unwrap().outcome(), CheckOutcome::Passed);
    assert_eq!(link.verdict(), Verdict::Failed);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_relative_link_without_base_fails() {
    let report = check(r#"<a href="nonexistent.html">Broken Link</a>"#).await;
    let link = &report.links[0];
    assert_eq!(link.check(names::HREF).unwrap().outcome(), CheckOutcome::Passed);
    assert_eq!(link.check(names::BROKEN_LINK).unwrap().outcome(), CheckOutcome::Failed);
    assert_eq!(link.verdict(), Verdict::Failed);
}

#[tokio::test]
async fn test_link_without_href() {
    let report = check("<a>Link Without Href</a>").await;
    let link = &report.links[0];
    assert_eq!(link.check(names::HREF).unwrap().result.reason, "No href attribute");
    for name in [names::INTERACTIVITY, names::BROKEN_LINK, names::ANCHOR] {
        let entry = link.check(name).unwrap();
        assert_eq!(entry.outcome(), CheckOutcome::Failed, "{name}");
        assert_eq!(entry.result.reason, "No href to test", "{name}");
    }
    assert_eq!(link.check(names::CLICK).unwrap().outcome(), CheckOutcome::NotAttempted);
    assert_eq!(link.verdict(), Verdict::Failed);
}

#[tokio::test]
async fn test_healthy_link_passes() {
    let engine = engine().with_probe(Arc::new(FixedProbe::new(200)));
    let factory = StaticFactory::new(
        StaticDriver::new()
            .with_base_url("http://site.test/")
            .with_route("http://site.test/about.html", "<h1>About</h1>"),
    );
    let source = PageSource::from_input(r#"<a href="about.html">About</a>"#);
    let report = run_session(&factory, &engine, &source).await.unwrap();
    assert_eq!(report.links[0].verdict(), Verdict::Passed);
    assert!(!report.has_defects());
}

// ============================================================================
// Forms
// ============================================================================

#[tokio::test]
async fn test_form_with_plain_button_has_no_submit() {
    let report = check(r#"<form><button type="button">Submit</button></form>"#).await;
    let form = &report.forms[0];
    let submission = form.check(names::SUBMISSION).unwrap();
    assert_eq!(submission.outcome(), CheckOutcome::Failed);
    assert_eq!(submission.result.reason, "No Submit Button");
    assert_eq!(form.outcome.verdict, Verdict::Failed);
}

#[tokio::test]
async fn test_email_field_classified_without_mismatch() {
    let report =
        check(r#"<form><input type="email" name="email"><input type="submit" value="Go"></form>"#)
            .await;
    let field = &report.forms[0].fields[0];
    assert_eq!(field.kind, ElementKind::EmailInput);
    assert_eq!(field.check(names::TYPE_MATCH).unwrap().outcome(), CheckOutcome::Passed);
    let malformed = field
        .check("Boundary Value: malformed address (length 13)")
        .expect("malformed address row");
    assert_eq!(malformed.outcome(), CheckOutcome::Passed);
}

#[tokio::test]
async fn test_option_without_value() {
    let report = check(
        r#"<form><select name="choice">
            <option value="">Please select</option>
            <option>Option1</option>
        </select><button type="submit">Go</button></form>"#,
    )
    .await;
    let select = &report.forms[0].fields[0];
    assert_eq!(select.kind, ElementKind::Select);
    assert_eq!(
        select.check("Option 1: Please select").unwrap().outcome(),
        CheckOutcome::Skipped
    );
    let option = select.check("Option 2: Option1").unwrap();
    assert_eq!(option.outcome(), CheckOutcome::Failed);
    assert_eq!(option.result.reason, "option has no value property");
}

#[tokio::test]
async fn test_disabled_option_is_a_defect() {
    let fixture = compose(["dropdown_selection"], 0);
    let report = check(&fixture.html).await;
    let form = &report.forms[0];
    assert_eq!(form.name, "Buggy Form");
    let select = &form.fields[0];
    assert_eq!(select.check(names::NAME).unwrap().outcome(), CheckOutcome::Failed);
    assert_eq!(select.check("Option 2: Saab").unwrap().outcome(), CheckOutcome::Passed);
    let fiat = select.check("Option 3: Fiat").unwrap();
    assert_eq!(fiat.outcome(), CheckOutcome::Failed);
    assert_eq!(fiat.result.reason, "Option is disabled");
    assert_eq!(select.check("Option 4: Audi").unwrap().outcome(), CheckOutcome::Passed);
}

// ============================================================================
// Whole runs
// ============================================================================

#[tokio::test]
async fn test_repeated_runs_agree() {
    let fixture = compose(
        ["empty_button", "disabled_button", "incorrect_anchor_link", "combined_form"],
        0,
    );
    let first = check(&fixture.html).await;
    let second = check(&fixture.html).await;
    assert_eq!(first.buttons, second.buttons);
    assert_eq!(first.links, second.links);
    assert_eq!(first.forms, second.forms);
    assert_eq!(first.summary(), second.summary());
}

#[tokio::test]
async fn test_failures_point_at_markup() {
    let fixture = compose(["empty_button", "javascript_link"], 0);
    let report = check(&fixture.html).await;
    let failures = report.failures();
    assert!(failures
        .iter()
        .any(|f| f.test == names::LABEL && f.code_snippet == "<button></button>"));
    assert!(failures
        .iter()
        .any(|f| f.test == names::BROKEN_LINK && f.code_snippet.contains("javascript:void(0);")));

    let restored = TestReport::from_json(&report.to_json().unwrap()).unwrap();
    assert_eq!(restored.failures(), failures);
}

#[cfg(feature = "http")]
#[tokio::test]
async fn test_live_url_is_fetched_and_checked() {
    use axum::response::Html;
    use axum::routing::get;
    use axum::Router;

    let app = Router::new().route(
        "/",
        get(|| async { Html(r#"<button type="button">Go</button><a href="about.html">About</a>"#) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let probe = Arc::new(FixedProbe::new(200));
    let report = run_session(
        &StaticFactory::default(),
        &engine().with_probe(probe.clone()),
        &PageSource::from_input(&format!("http://{addr}/")),
    )
    .await
    .unwrap();

    assert_eq!(report.buttons.len(), 1);
    assert_eq!(report.buttons[0].verdict(), Verdict::Passed);
    assert_eq!(report.links.len(), 1);
    let broken = report.links[0].check(names::BROKEN_LINK).unwrap();
    assert_eq!(broken.outcome(), CheckOutcome::Passed);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Properties
// ============================================================================

fn label_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[A-Za-z]{1,8}".prop_map(Some)]
}

fn run_blocking(html: &str) -> TestReport {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(check(html))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every located button gets exactly one verdict, and unlabeled ones are never clicked
    #[test]
    fn prop_one_verdict_per_button(labels in prop::collection::vec(label_strategy(), 0..6)) {
        let html: String = labels
            .iter()
            .map(|label| format!(r#"<button type="button">{}</button>"#, label.as_deref().unwrap_or("")))
            .collect();
        let report = run_blocking(&html);
        prop_assert_eq!(report.buttons.len(), labels.len());
        for (button, label) in report.buttons.iter().zip(&labels) {
            let click = button.check(names::CLICK).unwrap().outcome();
            match label {
                Some(_) => prop_assert_eq!(click, CheckOutcome::Passed),
                None => prop_assert_eq!(click, CheckOutcome::NotAttempted),
            }
        }
    }
}
