//! Check evaluators.
//!
//! Pure functions from what was observed about an element to a
//! [`CheckResult`]. The engine gathers the observations through the
//! interaction layer; nothing here touches a driver.

use crate::classifier::{type_mismatch, ElementKind, NameHint};
use crate::driver::ElementSnapshot;
use crate::probe::{ProbeError, ProbeResponse};
use crate::verdict::CheckResult;
use url::Url;

/// Check names, in the order elements run them
pub mod names {
    /// Element is rendered
    pub const VISIBILITY: &str = "Visibility Test";
    /// Element has a usable label
    pub const LABEL: &str = "Label Test";
    /// Element accepts interaction
    pub const INTERACTIVITY: &str = "Interactivity Test";
    /// Click succeeded
    pub const CLICK: &str = "Click Test";
    /// Link has an href
    pub const HREF: &str = "Href Test";
    /// Link URL uses http(s)
    pub const URL_FORMAT: &str = "URL Format Test";
    /// In-page anchor resolves
    pub const ANCHOR: &str = "Anchor Test";
    /// Destination answers with 2xx
    pub const BROKEN_LINK: &str = "Broken-Link Test";
    /// Destination returns content
    pub const RESPONSIVE: &str = "Responsive Test";
    /// Field has a name
    pub const NAME: &str = "Name Test";
    /// Field naming matches its type
    pub const TYPE_MATCH: &str = "Type Match Test";
    /// Checkbox or radio ends checked
    pub const TOGGLE: &str = "Toggle Test";
    /// Select has options at all
    pub const OPTIONS: &str = "Options Test";
    /// Form has exactly one submit control and submits
    pub const SUBMISSION: &str = "Form Submission Test";
    /// Page feedback after submission
    pub const FEEDBACK: &str = "Submission Feedback";
}

const NO_HREF_TO_TEST: &str = "No href to test";

/// Where a link's `href` points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// No `href` attribute
    Missing,
    /// `href=""`
    Empty,
    /// `href="#"`
    Placeholder,
    /// `href="#fragment"`
    Anchor(String),
    /// `javascript:` URL
    Script,
    /// `mailto:` or `tel:` URL
    Contact(String),
    /// Absolute http(s) URL after resolution
    Web(Url),
    /// Absolute URL with another scheme
    OtherScheme(String),
    /// Relative URL without a usable base
    Unresolved(String),
}

impl LinkTarget {
    /// Interpret `href` relative to the document URL `base`
    #[must_use]
    pub fn parse(href: Option<&str>, base: &str) -> Self {
        let Some(raw) = href else {
            return Self::Missing;
        };
        let href = raw.trim();
        if href.is_empty() {
            return Self::Empty;
        }
        if href == "#" {
            return Self::Placeholder;
        }
        if let Some(fragment) = href.strip_prefix('#') {
            return Self::Anchor(fragment.to_string());
        }
        let lower = href.to_ascii_lowercase();
        if lower.starts_with("javascript:") {
            return Self::Script;
        }
        for scheme in ["mailto", "tel"] {
            if lower.starts_with(&format!("{scheme}:")) {
                return Self::Contact(scheme.to_string());
            }
        }
        let resolved = Url::parse(href).or_else(|_| Url::parse(base).and_then(|b| b.join(href)));
        match resolved {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Self::Web(url),
            Ok(url) => Self::OtherScheme(url.to_string()),
            Err(_) => Self::Unresolved(href.to_string()),
        }
    }

    /// No usable href
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing | Self::Empty)
    }

    /// Resolved http(s) URL
    #[must_use]
    pub const fn web_url(&self) -> Option<&Url> {
        match self {
            Self::Web(url) => Some(url),
            _ => None,
        }
    }

    /// Whether clicking is expected to leave the document
    #[must_use]
    pub const fn navigates(&self) -> bool {
        matches!(self, Self::Web(_) | Self::OtherScheme(_) | Self::Unresolved(_))
    }
}

/// Visibility Test
#[must_use]
pub fn visibility(visible: bool, snapshot: &ElementSnapshot) -> CheckResult {
    if visible {
        CheckResult::passed("Element is visible")
    } else if snapshot.tag == "input" && snapshot.input_type().as_deref() == Some("hidden") {
        CheckResult::skipped("Hidden input is not meant to be rendered")
    } else {
        CheckResult::failed("Element is not visible")
    }
}

/// Label Test
#[must_use]
pub fn label(snapshot: &ElementSnapshot, kind: ElementKind) -> CheckResult {
    match snapshot.display_text() {
        Some(text) => CheckResult::passed(format!("Label: '{text}'")),
        None => CheckResult::failed(format!("The {} has no visible text, title or value", kind)),
    }
}

/// Interactivity Test for buttons and fields
#[must_use]
pub fn interactivity(enabled: bool) -> CheckResult {
    CheckResult::expect(enabled, "Element is enabled", "Element is disabled")
}

/// Interactivity Test for links
#[must_use]
pub fn link_interactivity(target: &LinkTarget, visible: bool, enabled: bool) -> CheckResult {
    if target.is_missing() {
        return CheckResult::failed(NO_HREF_TO_TEST);
    }
    match (visible, enabled) {
        (true, true) => CheckResult::passed("Link is visible and enabled"),
        (false, _) => CheckResult::failed("Link is not visible"),
        (true, false) => CheckResult::failed("Link is disabled"),
    }
}

/// Href Test
#[must_use]
pub fn href(target: &LinkTarget, raw: Option<&str>) -> CheckResult {
    match target {
        LinkTarget::Missing => CheckResult::failed("No href attribute"),
        LinkTarget::Empty => CheckResult::failed("Empty href attribute"),
        _ => CheckResult::passed(format!("href=\"{}\"", raw.unwrap_or_default().trim())),
    }
}

/// URL Format Test
#[must_use]
pub fn url_format(target: &LinkTarget) -> CheckResult {
    match target {
        LinkTarget::Missing | LinkTarget::Empty => CheckResult::skipped(NO_HREF_TO_TEST),
        LinkTarget::Placeholder | LinkTarget::Anchor(_) => {
            CheckResult::skipped("In-page anchor, see Anchor Test")
        }
        LinkTarget::Script => CheckResult::skipped("javascript: link, see Broken-Link Test"),
        LinkTarget::Contact(scheme) => CheckResult::skipped(format!("{scheme}: links are exempt")),
        LinkTarget::Web(url) => CheckResult::passed(format!("{} URL", url.scheme())),
        LinkTarget::OtherScheme(url) => CheckResult::failed(format!(
            "URL does not start with 'http' or 'https': {url}"
        )),
        LinkTarget::Unresolved(href) => CheckResult::failed(format!(
            "URL does not start with 'http' or 'https': {href}"
        )),
    }
}

/// Anchor Test; `target_found` is consulted for `#fragment` links only
#[must_use]
pub fn anchor(target: &LinkTarget, target_found: Option<bool>) -> CheckResult {
    match target {
        LinkTarget::Missing | LinkTarget::Empty => CheckResult::failed(NO_HREF_TO_TEST),
        LinkTarget::Placeholder => {
            CheckResult::failed("Placeholder href \"#\" does not point to any section")
        }
        LinkTarget::Anchor(fragment) => match target_found {
            Some(true) => CheckResult::passed(format!("Target #{fragment} found")),
            Some(false) => {
                CheckResult::failed(format!("No element with id or name \"{fragment}\""))
            }
            None => CheckResult::skipped("Anchor target could not be inspected"),
        },
        _ => CheckResult::skipped("Not an in-page anchor"),
    }
}

/// Outcome of a destination probe, or why none was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Probing disabled or unavailable
    NotProbed,
    /// Probe answered
    Answered(ProbeResponse),
    /// Probe failed
    Unreachable(ProbeError),
}

/// Broken-Link Test
#[must_use]
pub fn broken_link(target: &LinkTarget, destination: &Destination) -> CheckResult {
    match target {
        LinkTarget::Missing | LinkTarget::Empty => CheckResult::failed(NO_HREF_TO_TEST),
        LinkTarget::Placeholder | LinkTarget::Anchor(_) => {
            CheckResult::skipped("In-page anchor, see Anchor Test")
        }
        LinkTarget::Script => {
            CheckResult::failed("Non-navigational link: javascript: URL has no destination")
        }
        LinkTarget::Contact(scheme) => CheckResult::skipped(format!("{scheme}: links are exempt")),
        LinkTarget::OtherScheme(url) => {
            CheckResult::failed(format!("Invalid URL format: unsupported scheme in {url}"))
        }
        LinkTarget::Unresolved(href) => CheckResult::failed(format!(
            "Invalid URL format: cannot resolve \"{href}\" without a base URL"
        )),
        LinkTarget::Web(_) => match destination {
            Destination::NotProbed => CheckResult::skipped("Network checks disabled"),
            Destination::Answered(response) => CheckResult::expect(
                response.is_success(),
                format!("Status Code: {}", response.status),
                format!("Status Code: {}", response.status),
            ),
            Destination::Unreachable(err) => CheckResult::failed(err.to_string()),
        },
    }
}

/// Responsive Test
#[must_use]
pub fn responsive(target: &LinkTarget, destination: &Destination) -> CheckResult {
    if target.is_missing() {
        return CheckResult::skipped(NO_HREF_TO_TEST);
    }
    if target.web_url().is_none() {
        return CheckResult::skipped("Not an HTTP destination");
    }
    match destination {
        Destination::NotProbed => CheckResult::skipped("Network checks disabled"),
        Destination::Answered(response) if response.is_success() => CheckResult::expect(
            response.body_len > 0,
            format!("Responded with {} bytes", response.body_len),
            "Destination returned an empty body",
        ),
        _ => CheckResult::skipped("Destination unavailable, see Broken-Link Test"),
    }
}

/// Name Test
#[must_use]
pub fn name_present(snapshot: &ElementSnapshot) -> CheckResult {
    match snapshot.attr("name").map(str::trim) {
        Some(name) if !name.is_empty() => CheckResult::passed(format!("name=\"{name}\"")),
        _ => CheckResult::failed("Field has no name attribute and will not be submitted"),
    }
}

/// Type Match Test
#[must_use]
pub fn type_match(snapshot: &ElementSnapshot) -> CheckResult {
    if NameHint::detect(snapshot).is_none() {
        return CheckResult::skipped("No naming convention applies");
    }
    match type_mismatch(snapshot) {
        Some(reason) => CheckResult::failed(reason),
        None => CheckResult::passed("Declared name matches input type"),
    }
}

/// Form Submission Test precondition on the number of submit controls
#[must_use]
pub fn submit_control_count(count: usize) -> Option<CheckResult> {
    match count {
        0 => Some(CheckResult::failed("No Submit Button")),
        1 => None,
        n => Some(CheckResult::failed(format!(
            "Multiple submit controls ({n}); expected exactly one"
        ))),
    }
}

/// Submission Feedback from `.error` and `.success` texts
#[must_use]
pub fn feedback(errors: &[String], successes: &[String]) -> CheckResult {
    let errors: Vec<&str> = errors
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect();
    if !errors.is_empty() {
        return CheckResult::failed(format!("Error message shown: {}", errors.join("; ")));
    }
    match successes.iter().map(|s| s.trim()).find(|s| !s.is_empty()) {
        Some(text) => CheckResult::passed(format!("Success message shown: {text}")),
        None if !successes.is_empty() => CheckResult::passed("Success indicator shown"),
        None => CheckResult::skipped("No clear success or error message found"),
    }
}
