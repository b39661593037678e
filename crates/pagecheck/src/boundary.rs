//! Boundary-value matrix.
//!
//! Each textual field kind has a fixed, ordered table of probe values. The
//! interaction layer fills every value in turn and reads the committed value
//! back; [`evaluate`] decides whether that observation is acceptable.

use crate::classifier::ElementKind;
use crate::driver::ElementSnapshot;
use crate::verdict::CheckResult;
use regex::Regex;
use std::sync::OnceLock;

/// Longest excerpt of a value quoted in a reason
const QUOTE_LIMIT: usize = 40;

/// One probe value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryValue {
    /// What the value represents
    pub label: &'static str,
    /// The value to fill
    pub value: String,
}

impl BoundaryValue {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }

    /// Check name for this probe's row
    #[must_use]
    pub fn check_name(&self) -> String {
        format!(
            "Boundary Value: {} (length {})",
            self.label,
            self.value.chars().count()
        )
    }
}

fn empty() -> BoundaryValue {
    BoundaryValue::new("empty", "")
}

fn short() -> BoundaryValue {
    BoundaryValue::new("short", "a".repeat(10))
}

fn long(len: usize) -> BoundaryValue {
    BoundaryValue::new("long", "a".repeat(len))
}

fn special() -> BoundaryValue {
    BoundaryValue::new("special characters", "special@#$%^&*()")
}

/// Ordered probe values for a field kind; empty for non-textual kinds
#[must_use]
pub fn matrix(kind: ElementKind) -> Vec<BoundaryValue> {
    match kind {
        ElementKind::TextInput | ElementKind::PasswordInput => {
            vec![empty(), short(), long(255), special()]
        }
        ElementKind::TextArea => vec![empty(), short(), long(1024), special()],
        ElementKind::EmailInput => vec![
            empty(),
            BoundaryValue::new("valid address", "test@example.com"),
            BoundaryValue::new("long address", format!("{}@example.com", "a".repeat(245))),
            special(),
            BoundaryValue::new("malformed address", "invalid-email"),
        ],
        ElementKind::NumberInput => vec![
            empty(),
            short(),
            long(255),
            special(),
            BoundaryValue::new("positive number", "123"),
            BoundaryValue::new("negative number", "-123"),
            BoundaryValue::new("non-numeric", "abc"),
            BoundaryValue::new("oversized number", "12345678901234567890"),
        ],
        _ => Vec::new(),
    }
}

/// HTML "valid floating-point number" that parses to a finite value
#[must_use]
pub fn is_numeric(value: &str) -> bool {
    static FLOAT: OnceLock<Regex> = OnceLock::new();
    let pattern = FLOAT.get_or_init(|| {
        Regex::new(r"^-?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
            .expect("float pattern is valid")
    });
    pattern.is_match(value) && value.parse::<f64>().is_ok_and(f64::is_finite)
}

/// HTML "valid e-mail address"
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let pattern = EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("email pattern is valid")
    });
    pattern.is_match(value)
}

/// Declared constraints that legitimately change a read-back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldConstraints {
    /// `maxlength`, in characters
    pub max_length: Option<usize>,
    /// `required`
    pub required: bool,
}

impl FieldConstraints {
    /// Read constraints from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &ElementSnapshot) -> Self {
        Self {
            max_length: snapshot
                .attr("maxlength")
                .and_then(|v| v.trim().parse::<usize>().ok()),
            required: snapshot.has_attr("required"),
        }
    }
}

/// What the page reported after a fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Committed value
    pub read_back: String,
    /// Constraint-validation state, when queried
    pub valid: Option<bool>,
}

fn quote(value: &str) -> String {
    let count = value.chars().count();
    if count <= QUOTE_LIMIT {
        format!("'{value}'")
    } else {
        let head: String = value.chars().take(QUOTE_LIMIT).collect();
        format!("'{head}...' ({count} chars)")
    }
}

fn textual(probe: &BoundaryValue, constraints: FieldConstraints, read_back: &str) -> CheckResult {
    if read_back == probe.value {
        return CheckResult::passed(format!("Value {} accepted", quote(&probe.value)));
    }
    if let Some(max) = constraints.max_length {
        let truncated: String = probe.value.chars().take(max).collect();
        if probe.value.chars().count() > max && read_back == truncated {
            return CheckResult::passed(format!("Value truncated to maxlength {max}"));
        }
    }
    CheckResult::failed(format!(
        "Value not retained: expected {}, got {}",
        quote(&probe.value),
        quote(read_back)
    ))
}

fn numeric(probe: &BoundaryValue, read_back: &str) -> CheckResult {
    if is_numeric(&probe.value) {
        CheckResult::expect(
            read_back == probe.value,
            format!("Numeric input accepted valid number {}", quote(&probe.value)),
            format!(
                "Numeric input did not accept valid number: expected {}, got {}",
                quote(&probe.value),
                quote(read_back)
            ),
        )
    } else {
        CheckResult::expect(
            read_back.is_empty(),
            format!("Numeric input rejected {}", quote(&probe.value)),
            format!(
                "Numeric input accepted non-numeric value {}",
                quote(read_back)
            ),
        )
    }
}

fn email(
    probe: &BoundaryValue,
    constraints: FieldConstraints,
    observed: &Observation,
) -> CheckResult {
    let retained = textual(probe, constraints, &observed.read_back);
    if retained.outcome != crate::verdict::CheckOutcome::Passed {
        return retained;
    }
    let Some(reported) = observed.valid else {
        return retained;
    };
    let expected = if observed.read_back.is_empty() {
        !constraints.required
    } else {
        is_valid_email(&observed.read_back)
    };
    match (expected, reported) {
        (true, true) => CheckResult::passed(format!(
            "{} accepted as a valid address",
            quote(&observed.read_back)
        )),
        (false, false) => CheckResult::passed(format!(
            "{} retained and flagged invalid",
            quote(&observed.read_back)
        )),
        (true, false) => CheckResult::failed(format!(
            "Email field rejected well-formed value {}",
            quote(&observed.read_back)
        )),
        (false, true) => CheckResult::failed(format!(
            "Email field reported malformed value {} as valid",
            quote(&observed.read_back)
        )),
    }
}

/// Judge one probe's observation for a field kind
#[must_use]
pub fn evaluate(
    kind: ElementKind,
    probe: &BoundaryValue,
    constraints: FieldConstraints,
    observed: &Observation,
) -> CheckResult {
    match kind {
        ElementKind::NumberInput => numeric(probe, &observed.read_back),
        ElementKind::EmailInput => email(probe, constraints, observed),
        _ => textual(probe, constraints, &observed.read_back),
    }
}
