//! Link destination probes.
//!
//! The engine asks a [`LinkProbe`] whether a link's destination answers.
//! [`HttpProbe`] issues a single bounded GET and reports the status and body
//! length; tests substitute their own probe.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What a destination answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    /// HTTP status code
    pub status: u16,
    /// Body length in bytes
    pub body_len: usize,
}

impl ProbeResponse {
    /// 2xx status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Why a probe produced no response
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// URL could not be parsed or is not HTTP(S)
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    /// Connection could not be established
    #[error("Unable to connect: {0}")]
    Connect(String),
    /// No answer within the timeout
    #[error("No response within {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },
    /// Any other transport failure
    #[error("Request failed: {0}")]
    Request(String),
}

/// Network access for destination checks
#[async_trait]
pub trait LinkProbe: Send + Sync + std::fmt::Debug {
    /// Fetch `url` within `timeout`
    async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, ProbeError>;
}

#[cfg(feature = "http")]
pub use http::HttpProbe;

#[cfg(feature = "http")]
mod http {
    use super::{LinkProbe, ProbeError, ProbeResponse};
    use async_trait::async_trait;
    use std::time::Duration;
    use tracing::debug;

    /// `reqwest`-backed probe
    #[derive(Debug, Clone)]
    pub struct HttpProbe {
        client: reqwest::Client,
    }

    impl Default for HttpProbe {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpProbe {
        /// Create a probe that follows redirects
        #[must_use]
        pub fn new() -> Self {
            let client = reqwest::Client::builder()
                .user_agent(concat!("pagecheck/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default();
            Self { client }
        }

        /// Use a preconfigured client
        #[must_use]
        pub const fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    fn classify(err: &reqwest::Error, timeout: Duration) -> ProbeError {
        if err.is_timeout() {
            ProbeError::Timeout {
                ms: timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            ProbeError::Connect(err.to_string())
        } else if err.is_builder() {
            ProbeError::InvalidUrl(err.to_string())
        } else {
            ProbeError::Request(err.to_string())
        }
    }

    #[async_trait]
    impl LinkProbe for HttpProbe {
        async fn probe(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, ProbeError> {
            let parsed =
                url::Url::parse(url).map_err(|e| ProbeError::InvalidUrl(format!("{url}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ProbeError::InvalidUrl(format!(
                    "{url}: scheme {} is not http or https",
                    parsed.scheme()
                )));
            }
            let response = self
                .client
                .get(parsed)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify(&e, timeout))?;
            let status = response.status().as_u16();
            let body = response.bytes().await.map_err(|e| classify(&e, timeout))?;
            debug!(url, status, body_len = body.len(), "probed");
            Ok(ProbeResponse {
                status,
                body_len: body.len(),
            })
        }
    }
}
