//! Result and error types for Pagecheck.
//!
//! Only session-level failures travel through [`PagecheckError`] to the
//! caller. Everything that goes wrong while exercising a single element is
//! folded into a FAILED check by the engine; the helpers below tell the two
//! apart.

use thiserror::Error;

/// Result type for Pagecheck operations
pub type PagecheckResult<T> = Result<T, PagecheckError>;

/// Errors that can occur in Pagecheck
#[derive(Debug, Error)]
pub enum PagecheckError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Connection to browser failed or was lost
    #[error("Failed to connect to browser: {message}")]
    ConnectionFailed {
        /// Error message
        message: String,
    },

    /// The driver was already closed
    #[error("Session closed")]
    SessionClosed,

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Element handle no longer resolves to a node
    #[error("Stale element reference: {selector} #{index} is no longer attached")]
    StaleElement {
        /// Selector of the step that failed to resolve
        selector: String,
        /// Match index of that step
        index: usize,
    },

    /// Element exists but cannot receive the requested action
    #[error("Element not interactable: {message}")]
    ElementNotInteractable {
        /// Error message
        message: String,
    },

    /// Selector could not be parsed
    #[error("Invalid selector `{selector}`: {message}")]
    InvalidSelector {
        /// The selector text
        selector: String,
        /// Parser message
        message: String,
    },

    /// Script evaluation error
    #[error("Script evaluation failed: {message}")]
    ScriptError {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PagecheckError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Create a not-interactable error
    #[must_use]
    pub fn not_interactable(message: impl Into<String>) -> Self {
        Self::ElementNotInteractable {
            message: message.into(),
        }
    }

    /// Create a stale-element error for one handle step
    #[must_use]
    pub fn stale(selector: impl Into<String>, index: usize) -> Self {
        Self::StaleElement {
            selector: selector.into(),
            index,
        }
    }

    /// Whether re-locating the element may fix this error
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement { .. })
    }

    /// Whether the session itself is unusable.
    ///
    /// Fatal errors abort the run; every other error degrades one check.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BrowserNotFound
                | Self::BrowserLaunchError { .. }
                | Self::ConnectionFailed { .. }
                | Self::SessionClosed
        )
    }
}
