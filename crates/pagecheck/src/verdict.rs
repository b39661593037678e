//! Check outcomes and their fold into verdicts.
//!
//! A check produces a [`CheckResult`]; an element collects named checks in
//! execution order and folds them into an [`Aggregate`]. The fold is the
//! single place where outcome precedence is decided.

use crate::classifier::ElementKind;
use crate::driver::ElementSnapshot;
use crate::result::PagecheckError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckOutcome {
    /// Condition held
    Passed,
    /// Condition violated
    Failed,
    /// Check does not apply
    Skipped,
    /// Precondition prevented the attempt
    NotAttempted,
}

impl CheckOutcome {
    /// Tie-break rank: FAILED > SKIPPED > NOT_ATTEMPTED > PASSED
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Failed => 3,
            Self::Skipped => 2,
            Self::NotAttempted => 1,
            Self::Passed => 0,
        }
    }

    /// Report label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
            Self::NotAttempted => "NOT ATTEMPTED",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome plus human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Outcome
    pub outcome: CheckOutcome,
    /// Why
    pub reason: String,
}

impl CheckResult {
    /// Create a result
    #[must_use]
    pub fn new(outcome: CheckOutcome, reason: impl Into<String>) -> Self {
        Self {
            outcome,
            reason: reason.into(),
        }
    }

    /// PASSED with reason
    #[must_use]
    pub fn passed(reason: impl Into<String>) -> Self {
        Self::new(CheckOutcome::Passed, reason)
    }

    /// FAILED with reason
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(CheckOutcome::Failed, reason)
    }

    /// SKIPPED with reason
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::new(CheckOutcome::Skipped, reason)
    }

    /// NOT_ATTEMPTED with reason
    #[must_use]
    pub fn not_attempted(reason: impl Into<String>) -> Self {
        Self::new(CheckOutcome::NotAttempted, reason)
    }

    /// FAILED carrying the error message
    #[must_use]
    pub fn from_error(err: &PagecheckError) -> Self {
        Self::failed(err.to_string())
    }

    /// PASSED or FAILED depending on `condition`
    #[must_use]
    pub fn expect(
        condition: bool,
        pass_reason: impl Into<String>,
        fail_reason: impl Into<String>,
    ) -> Self {
        if condition {
            Self::passed(pass_reason)
        } else {
            Self::failed(fail_reason)
        }
    }
}

/// A named check in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEntry {
    /// Check name, e.g. "Visibility Test"
    pub name: String,
    /// Outcome and reason
    #[serde(flatten)]
    pub result: CheckResult,
}

impl CheckEntry {
    /// Outcome shortcut
    #[must_use]
    pub const fn outcome(&self) -> CheckOutcome {
        self.result.outcome
    }
}

/// Folded verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Every participating check passed
    Passed,
    /// At least one check failed
    Failed,
    /// Nothing conclusive
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Result of folding a set of named outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Folded verdict
    pub verdict: Verdict,
    /// Highest-severity outcome seen, if any
    pub dominant: Option<CheckOutcome>,
    /// Names of failing constituents, in order
    pub failing: Vec<String>,
    /// Whether any non-SKIPPED outcome was folded
    #[serde(default)]
    pub participated: bool,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self {
            verdict: Verdict::Unknown,
            dominant: None,
            failing: Vec::new(),
            participated: false,
        }
    }
}

impl Aggregate {
    /// Fold named outcomes.
    ///
    /// SKIPPED never participates. FAILED if anything failed; PASSED if at
    /// least one outcome participated and all of those passed; otherwise
    /// UNKNOWN.
    pub fn fold<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, CheckOutcome)>,
    {
        let mut dominant: Option<CheckOutcome> = None;
        let mut failing = Vec::new();
        let mut participated = false;
        let mut all_passed = true;

        for (name, outcome) in outcomes {
            if dominant.map_or(true, |d| outcome.severity() > d.severity()) {
                dominant = Some(outcome);
            }
            match outcome {
                CheckOutcome::Skipped => {}
                CheckOutcome::Passed => participated = true,
                CheckOutcome::NotAttempted => {
                    participated = true;
                    all_passed = false;
                }
                CheckOutcome::Failed => {
                    participated = true;
                    all_passed = false;
                    failing.push(name.to_string());
                }
            }
        }

        let verdict = if !failing.is_empty() {
            Verdict::Failed
        } else if participated && all_passed {
            Verdict::Passed
        } else {
            Verdict::Unknown
        };

        Self {
            verdict,
            dominant,
            failing,
            participated,
        }
    }

    /// Fold a check list
    #[must_use]
    pub fn from_checks(checks: &[CheckEntry]) -> Self {
        Self::fold(checks.iter().map(|c| (c.name.as_str(), c.outcome())))
    }

    /// Outcome this aggregate contributes when nested in a parent fold.
    ///
    /// An inconclusive aggregate contributes NOT_ATTEMPTED when anything
    /// participated and SKIPPED when every outcome was skipped.
    #[must_use]
    pub const fn as_outcome(&self) -> CheckOutcome {
        match self.verdict {
            Verdict::Passed => CheckOutcome::Passed,
            Verdict::Failed => CheckOutcome::Failed,
            Verdict::Unknown if self.participated => CheckOutcome::NotAttempted,
            Verdict::Unknown => CheckOutcome::Skipped,
        }
    }
}

/// One record per located element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementVerdict {
    /// Zero-based position within its role query
    pub index: usize,
    /// Display name, e.g. "Button 3"
    pub name: String,
    /// Usable label, if any
    pub text: Option<String>,
    /// Outer markup at discovery
    pub snippet: String,
    /// Classification, fixed at discovery
    pub kind: ElementKind,
    /// `href` for links
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Checks in execution order
    pub checks: Vec<CheckEntry>,
    /// Fold of `checks`
    pub outcome: Aggregate,
}

impl ElementVerdict {
    /// Start a verdict for a discovered element
    #[must_use]
    pub fn new(
        index: usize,
        name: impl Into<String>,
        snapshot: &ElementSnapshot,
        kind: ElementKind,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            text: snapshot.display_text(),
            snippet: snapshot.outer_html.clone(),
            kind,
            href: None,
            checks: Vec::new(),
            outcome: Aggregate::default(),
        }
    }

    /// Append a check
    pub fn record(&mut self, name: impl Into<String>, result: CheckResult) {
        let name = name.into();
        tracing::debug!(
            element = %self.name,
            check = %name,
            outcome = %result.outcome,
            reason = %result.reason,
            "check recorded"
        );
        self.checks.push(CheckEntry { name, result });
    }

    /// Fold the recorded checks into `outcome`
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.outcome = Aggregate::from_checks(&self.checks);
        self
    }

    /// First check with the given name
    #[must_use]
    pub fn check(&self, name: &str) -> Option<&CheckEntry> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Folded verdict shortcut
    #[must_use]
    pub const fn verdict(&self) -> Verdict {
        self.outcome.verdict
    }
}
