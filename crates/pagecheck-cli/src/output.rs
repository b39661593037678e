//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use pagecheck::{Category, CheckEntry, ElementVerdict, FormVerdict, TestReport, Verdict};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

impl OutputFormat {
    /// Render a report in this format
    pub fn render(self, report: &TestReport) -> Result<String, serde_json::Error> {
        match self {
            Self::Text => Ok(render_text(report)),
            Self::Json => serde_json::to_string_pretty(report),
        }
    }
}

fn write_checks(out: &mut String, checks: &[CheckEntry]) {
    for check in checks {
        let _ = writeln!(
            out,
            "    {}: {} ({})",
            check.name, check.result.outcome, check.result.reason
        );
    }
}

/// Element block; `text_label` names the text line, fields show their kind instead
fn write_element(out: &mut String, verdict: &ElementVerdict, text_label: Option<&str>) {
    let _ = writeln!(out, "### {} ###", verdict.name);
    match text_label {
        Some(label) => {
            let _ = writeln!(out, "{label}: {}", verdict.text.as_deref().unwrap_or("N/A"));
        }
        None => {
            let _ = writeln!(out, "Kind: {}", verdict.kind);
        }
    }
    if let Some(href) = &verdict.href {
        let _ = writeln!(out, "Link Href: {href}");
    }
    let _ = writeln!(out, "Result: {}", verdict.verdict());
    write_checks(out, &verdict.checks);
    out.push('\n');
}

fn write_form(out: &mut String, form: &FormVerdict) {
    let _ = writeln!(out, "######## {} ########", form.name);
    let _ = writeln!(out, "Result: {}", form.outcome.verdict);
    write_checks(out, &form.checks);
    out.push('\n');
    for field in form.fields.iter().chain(&form.controls) {
        write_element(out, field, None);
    }
}

/// Plain-text report: a banner per category, a block per element
#[must_use]
pub fn render_text(report: &TestReport) -> String {
    let mut out = String::new();
    for category in Category::ALL {
        if !report.ran(category) {
            continue;
        }
        let _ = writeln!(out, "########## {} TESTS ##########\n", category.title());
        let empty = match category {
            Category::Buttons => report.buttons.is_empty(),
            Category::Links => report.links.is_empty(),
            Category::Forms => report.forms.is_empty(),
        };
        if empty {
            out.push_str("No results found.\n\n");
            continue;
        }
        match category {
            Category::Buttons => {
                for button in &report.buttons {
                    write_element(&mut out, button, Some("Button Text"));
                }
            }
            Category::Links => {
                for link in &report.links {
                    write_element(&mut out, link, Some("Link Text"));
                }
            }
            Category::Forms => {
                for form in &report.forms {
                    write_form(&mut out, form);
                }
            }
        }
    }
    out
}

/// Progress reporter for check runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner while a run is in flight
    pub fn start(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(message.to_string());
        self.spinner = Some(spinner);
    }

    /// Remove the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Per-category tally lines
    pub fn summary(&self, report: &TestReport) {
        let summary = report.summary();
        if self.quiet && summary.failed() == 0 {
            return;
        }
        let _ = self.term.write_line("");
        for category in report.categories.iter().copied() {
            let tally = summary.get(category);
            let status = if tally.failed > 0 {
                Verdict::Failed
            } else if tally.unknown > 0 || tally.total == 0 {
                Verdict::Unknown
            } else {
                Verdict::Passed
            };
            let line = format!(
                "{} {}: {} checked ({} passed, {} failed, {} unknown)",
                self.styled(status),
                category,
                tally.total,
                tally.passed,
                tally.failed,
                tally.unknown
            );
            let _ = self.term.write_line(&line);
        }
    }

    fn styled(&self, verdict: Verdict) -> String {
        if !self.use_color {
            return verdict.to_string();
        }
        let style = match verdict {
            Verdict::Passed => Style::new().green().bold(),
            Verdict::Failed => Style::new().red().bold(),
            Verdict::Unknown => Style::new().yellow(),
        };
        style.apply_to(verdict).to_string()
    }
}
