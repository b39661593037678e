//! Run reports.
//!
//! A [`TestReport`] groups per-element verdicts by category. Forms carry
//! their fields and controls as nested verdicts plus their own form-level
//! checks. [`TestReport::failures`] flattens everything that failed into
//! [`FailureDigest`] records, the input to fix suggestion.

use crate::driver::{ElementSnapshot, PageSource};
use crate::result::PagecheckResult;
use crate::verdict::{Aggregate, CheckEntry, CheckOutcome, CheckResult, ElementVerdict, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Element category tested by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Buttons anywhere in the document
    Buttons,
    /// Anchors
    Links,
    /// Forms and their controls
    Forms,
}

impl Category {
    /// Every category in run order
    pub const ALL: [Self; 3] = [Self::Buttons, Self::Links, Self::Forms];

    /// Lowercase identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buttons => "buttons",
            Self::Links => "links",
            Self::Forms => "forms",
        }
    }

    /// Singular upper-case title, e.g. "BUTTON"
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Buttons => "BUTTON",
            Self::Links => "LINK",
            Self::Forms => "FORM",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buttons" | "button" => Ok(Self::Buttons),
            "links" | "link" => Ok(Self::Links),
            "forms" | "form" => Ok(Self::Forms),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Verdict for one form: nested field and control verdicts plus form checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormVerdict {
    /// Zero-based position among forms
    pub index: usize,
    /// `id` attribute or "Form N"
    pub name: String,
    /// Opening markup of the form
    pub snippet: String,
    /// Inputs, selects and textareas
    pub fields: Vec<ElementVerdict>,
    /// Buttons and button-typed inputs
    pub controls: Vec<ElementVerdict>,
    /// Form-level checks (submission, feedback)
    pub checks: Vec<CheckEntry>,
    /// Fold of own checks and every nested verdict
    pub outcome: Aggregate,
}

impl FormVerdict {
    /// Start a form verdict
    #[must_use]
    pub fn new(index: usize, snapshot: &ElementSnapshot) -> Self {
        let name = snapshot
            .attr("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| format!("Form {}", index + 1), str::to_string);
        Self {
            index,
            name,
            snippet: opening_tag(&snapshot.outer_html),
            fields: Vec::new(),
            controls: Vec::new(),
            checks: Vec::new(),
            outcome: Aggregate::default(),
        }
    }

    /// Append a form-level check
    pub fn record(&mut self, name: impl Into<String>, result: CheckResult) {
        let name = name.into();
        tracing::debug!(form = %self.name, check = %name, outcome = %result.outcome, "form check recorded");
        self.checks.push(CheckEntry { name, result });
    }

    /// Fold own checks with each nested element's aggregate
    #[must_use]
    pub fn finish(mut self) -> Self {
        let nested = self
            .fields
            .iter()
            .chain(&self.controls)
            .map(|v| (v.name.as_str(), v.outcome.as_outcome()));
        let own = self.checks.iter().map(|c| (c.name.as_str(), c.outcome()));
        self.outcome = Aggregate::fold(nested.chain(own));
        self
    }

    /// First form-level check with the given name
    #[must_use]
    pub fn check(&self, name: &str) -> Option<&CheckEntry> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Nested verdict by display name
    #[must_use]
    pub fn element(&self, name: &str) -> Option<&ElementVerdict> {
        self.fields.iter().chain(&self.controls).find(|v| v.name == name)
    }
}

fn opening_tag(outer_html: &str) -> String {
    match outer_html.find('>') {
        Some(end) => outer_html[..=end].to_string(),
        None => outer_html.to_string(),
    }
}

/// Passed/failed/unknown counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Items in the category
    pub total: usize,
    /// Aggregate PASSED
    pub passed: usize,
    /// Aggregate FAILED
    pub failed: usize,
    /// Aggregate UNKNOWN
    pub unknown: usize,
}

impl Tally {
    fn count<'a>(verdicts: impl IntoIterator<Item = &'a Aggregate>) -> Self {
        verdicts.into_iter().fold(Self::default(), |mut tally, agg| {
            tally.total += 1;
            match agg.verdict {
                Verdict::Passed => tally.passed += 1,
                Verdict::Failed => tally.failed += 1,
                Verdict::Unknown => tally.unknown += 1,
            }
            tally
        })
    }
}

/// Per-category tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Buttons
    pub buttons: Tally,
    /// Links
    pub links: Tally,
    /// Forms
    pub forms: Tally,
}

impl ReportSummary {
    /// Tally for one category
    #[must_use]
    pub const fn get(&self, category: Category) -> Tally {
        match category {
            Category::Buttons => self.buttons,
            Category::Links => self.links,
            Category::Forms => self.forms,
        }
    }

    /// Failed items across all categories
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.buttons.failed + self.links.failed + self.forms.failed
    }
}

/// One failed check with enough context to ask for a fix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDigest {
    /// Category the element belongs to
    pub category: Category,
    /// Element display name; form elements are prefixed with the form name
    pub item: String,
    /// Failed check name
    pub test: String,
    /// Failure reason
    pub reason: String,
    /// Markup of the element
    pub code_snippet: String,
}

/// Result of one engine run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Description of the page under test
    pub source: String,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// End of the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Categories that ran
    pub categories: Vec<Category>,
    /// Button verdicts in document order
    #[serde(default)]
    pub buttons: Vec<ElementVerdict>,
    /// Link verdicts in document order
    #[serde(default)]
    pub links: Vec<ElementVerdict>,
    /// Form verdicts in document order
    #[serde(default)]
    pub forms: Vec<FormVerdict>,
}

impl TestReport {
    /// Empty report for a source
    #[must_use]
    pub fn new(source: &PageSource) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source: source.describe(),
            started_at: Utc::now(),
            finished_at: None,
            categories: Vec::new(),
            buttons: Vec::new(),
            links: Vec::new(),
            forms: Vec::new(),
        }
    }

    /// Stamp the end time
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Absorb another run's categories, keeping this run's identity.
    ///
    /// Categories already present here are replaced by `other`'s.
    pub fn merge(&mut self, mut other: Self) {
        for category in std::mem::take(&mut other.categories) {
            match category {
                Category::Buttons => self.buttons = std::mem::take(&mut other.buttons),
                Category::Links => self.links = std::mem::take(&mut other.links),
                Category::Forms => self.forms = std::mem::take(&mut other.forms),
            }
            if !self.categories.contains(&category) {
                self.categories.push(category);
            }
        }
        self.categories.sort();
        self.started_at = self.started_at.min(other.started_at);
        self.finished_at = match (self.finished_at, other.finished_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Whether a category ran
    #[must_use]
    pub fn ran(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Aggregates of a category's items
    fn aggregates(&self, category: Category) -> Vec<&Aggregate> {
        match category {
            Category::Buttons => self.buttons.iter().map(|v| &v.outcome).collect(),
            Category::Links => self.links.iter().map(|v| &v.outcome).collect(),
            Category::Forms => self.forms.iter().map(|v| &v.outcome).collect(),
        }
    }

    /// Per-category tallies
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            buttons: Tally::count(self.aggregates(Category::Buttons)),
            links: Tally::count(self.aggregates(Category::Links)),
            forms: Tally::count(self.aggregates(Category::Forms)),
        }
    }

    /// Any item's aggregate is FAILED
    #[must_use]
    pub fn has_defects(&self) -> bool {
        self.summary().failed() > 0
    }

    /// Every FAILED check, in report order
    #[must_use]
    pub fn failures(&self) -> Vec<FailureDigest> {
        let mut digests = Vec::new();
        for (category, verdicts) in [
            (Category::Buttons, &self.buttons),
            (Category::Links, &self.links),
        ] {
            for verdict in verdicts {
                push_failures(&mut digests, category, &verdict.name, verdict);
            }
        }
        for form in &self.forms {
            for element in form.fields.iter().chain(&form.controls) {
                let item = format!("{} / {}", form.name, element.name);
                push_failures(&mut digests, Category::Forms, &item, element);
            }
            for check in form.checks.iter().filter(|c| c.outcome() == CheckOutcome::Failed) {
                digests.push(FailureDigest {
                    category: Category::Forms,
                    item: form.name.clone(),
                    test: check.name.clone(),
                    reason: check.result.reason.clone(),
                    code_snippet: form.snippet.clone(),
                });
            }
        }
        digests
    }

    /// Pretty JSON
    pub fn to_json(&self) -> PagecheckResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report written by [`Self::to_json`]
    pub fn from_json(json: &str) -> PagecheckResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn push_failures(
    digests: &mut Vec<FailureDigest>,
    category: Category,
    item: &str,
    verdict: &ElementVerdict,
) {
    for check in verdict
        .checks
        .iter()
        .filter(|c| c.outcome() == CheckOutcome::Failed)
    {
        digests.push(FailureDigest {
            category,
            item: item.to_string(),
            test: check.name.clone(),
            reason: check.result.reason.clone(),
            code_snippet: verdict.snippet.clone(),
        });
    }
}
