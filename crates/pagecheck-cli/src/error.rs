//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Check run error
    #[error("Check failed: {message}")]
    CheckExecution {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pagecheck library error
    #[error("Pagecheck error: {0}")]
    Pagecheck(#[from] pagecheck::PagecheckError),

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Fix suggestion error
    #[error("Suggestion failed: {message}")]
    Suggestion {
        /// Error message
        message: String,
    },

    /// The report contains failed verdicts
    #[error("{count} element(s) failed")]
    Defects {
        /// Failed verdict count
        count: usize,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a check execution error
    #[must_use]
    pub fn check_execution(message: impl Into<String>) -> Self {
        Self::CheckExecution {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a suggestion error
    #[must_use]
    pub fn suggestion(message: impl Into<String>) -> Self {
        Self::Suggestion {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_check_execution_error() {
        let err = CliError::check_execution("runtime");
        assert!(err.to_string().contains("Check failed"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_suggestion_error() {
        let err = CliError::suggestion("no key");
        assert_eq!(err.to_string(), "Suggestion failed: no key");
    }

    #[test]
    fn test_defects_error() {
        assert_eq!(CliError::Defects { count: 3 }.to_string(), "3 element(s) failed");
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }

    #[test]
    fn test_library_error_from() {
        let cli_err: CliError = pagecheck::PagecheckError::SessionClosed.into();
        assert!(cli_err.to_string().starts_with("Pagecheck error"));
    }
}
