//! PageDriver - abstract page automation trait.
//!
//! The engine talks to a loaded document only through [`PageDriver`]. Two
//! implementations ship with the crate:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PageDriver (async trait)                                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────┐      ┌──────────────────────────┐ │
//! │  │  StaticDriver        │      │  CdpDriver               │ │
//! │  │  (dom.rs)            │      │  (browser.rs, feature)   │ │
//! │  │  scraper-backed DOM, │      │  headless Chromium via   │ │
//! │  │  no JavaScript       │      │  chromiumoxide           │ │
//! │  └──────────────────────┘      └──────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Element handles are paths of `(selector, index)` steps rather than live
//! node references. Every driver call resolves the path again, so a handle
//! whose node disappeared yields [`crate::PagecheckError::StaleElement`] instead of
//! silently pointing at something else.

use crate::result::PagecheckResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What to load into a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PageSource {
    /// Inline HTML document
    Html(String),
    /// Live URL
    Url(String),
}

impl PageSource {
    /// Interpret user input: anything starting with `http` is a URL.
    #[must_use]
    pub fn from_input(input: impl Into<String>) -> Self {
        let input = input.into();
        if input.trim_start().starts_with("http") {
            Self::Url(input.trim().to_string())
        } else {
            Self::Html(input)
        }
    }

    /// Whether the source is inline HTML
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(self, Self::Html(_))
    }

    /// Short description for reports and logs
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Html(html) => format!("inline HTML ({} bytes)", html.len()),
        }
    }
}

/// One resolution step of an [`ElementHandle`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleStep {
    /// CSS selector evaluated in the previous step's scope
    pub selector: String,
    /// Index into that selector's matches, document order
    pub index: usize,
}

/// Opaque reference to an element, resolved afresh on every use
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    steps: Vec<HandleStep>,
}

impl ElementHandle {
    /// Handle for the `index`-th document match of `selector`
    #[must_use]
    pub fn root(selector: impl Into<String>, index: usize) -> Self {
        Self {
            steps: vec![HandleStep {
                selector: selector.into(),
                index,
            }],
        }
    }

    /// Handle for the `index`-th match of `selector` inside this element
    #[must_use]
    pub fn child(&self, selector: impl Into<String>, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(HandleStep {
            selector: selector.into(),
            index,
        });
        Self { steps }
    }

    /// Resolution steps, outermost first
    #[must_use]
    pub fn steps(&self) -> &[HandleStep] {
        &self.steps
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" >> ")?;
            }
            write!(f, "{}[{}]", step.selector, step.index)?;
        }
        Ok(())
    }
}

/// Attributes and text captured when an element was discovered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Lowercase tag name
    pub tag: String,
    /// All attributes, names lowercased
    pub attributes: BTreeMap<String, String>,
    /// Text content
    pub text: String,
    /// Outer markup
    pub outer_html: String,
    /// Whether a `<form>` ancestor exists
    pub in_form: bool,
}

impl ElementSnapshot {
    /// Attribute value, if present
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute presence
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Lowercased `type` attribute; `<input>` defaults to `text`
    #[must_use]
    pub fn input_type(&self) -> Option<String> {
        match self.attr("type") {
            Some(t) => Some(t.trim().to_ascii_lowercase()),
            None if self.tag == "input" => Some("text".to_string()),
            None => None,
        }
    }

    /// Usable label: text, then `title`, `value`, `aria-label`
    #[must_use]
    pub fn display_text(&self) -> Option<String> {
        let text = collapse_whitespace(&self.text);
        if !text.is_empty() {
            return Some(text);
        }
        ["title", "value", "aria-label"]
            .iter()
            .filter_map(|name| self.attr(name))
            .map(collapse_whitespace)
            .find(|label| !label.is_empty())
    }
}

/// Collapse runs of whitespace and trim
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `document.readyState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Still parsing
    Loading,
    /// Parsed, subresources loading
    Interactive,
    /// Fully loaded
    Complete,
}

impl ReadyState {
    /// Parse the DOM string value; unknown values count as loading
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "complete" => Self::Complete,
            "interactive" => Self::Interactive,
            _ => Self::Loading,
        }
    }
}

/// Page automation used by the engine.
///
/// Queries take an optional scope; `None` means the whole document. All
/// element methods resolve the handle on each call.
#[async_trait]
pub trait PageDriver: Send {
    /// Load a source, replacing the current document
    async fn load(&mut self, source: &PageSource) -> PagecheckResult<()>;

    /// Current document URL
    async fn current_url(&mut self) -> PagecheckResult<String>;

    /// Handles for every match of `selector`, document order
    async fn query_all(
        &mut self,
        scope: Option<&ElementHandle>,
        selector: &str,
    ) -> PagecheckResult<Vec<ElementHandle>>;

    /// Capture tag, attributes and text
    async fn snapshot(&mut self, element: &ElementHandle) -> PagecheckResult<ElementSnapshot>;

    /// Rendered with a non-empty box
    async fn is_visible(&mut self, element: &ElementHandle) -> PagecheckResult<bool>;

    /// Not disabled
    async fn is_enabled(&mut self, element: &ElementHandle) -> PagecheckResult<bool>;

    /// Checkbox or radio checked state
    async fn is_checked(&mut self, element: &ElementHandle) -> PagecheckResult<bool>;

    /// Current value of a form control
    async fn value(&mut self, element: &ElementHandle) -> PagecheckResult<String>;

    /// Constraint-validation state of a form control
    async fn is_valid(&mut self, element: &ElementHandle) -> PagecheckResult<bool>;

    /// Click the element
    async fn click(&mut self, element: &ElementHandle) -> PagecheckResult<()>;

    /// Clear the control, then type `value`
    async fn fill(&mut self, element: &ElementHandle, value: &str) -> PagecheckResult<()>;

    /// Select the `option_index`-th `<option>` of a `<select>`
    async fn select_option(
        &mut self,
        element: &ElementHandle,
        option_index: usize,
    ) -> PagecheckResult<()>;

    /// `document.readyState`
    async fn ready_state(&mut self) -> PagecheckResult<ReadyState>;

    /// Release the session
    async fn close(&mut self) -> PagecheckResult<()>;
}
