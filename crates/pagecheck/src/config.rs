//! Engine configuration.
//!
//! Every timeout the engine honours lives here and is passed explicitly to
//! the components that need it. Configuration can be built in code with the
//! `with_*` methods or loaded from YAML.

use crate::report::Category;
use crate::result::{PagecheckError, PagecheckResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default wait for the first element of a role (ms)
pub const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 10_000;
/// Default presence polling interval (ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
/// Default wait for a quiescent document after a click (ms)
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 10_000;
/// Default pause before checking quiescence after a click (ms)
pub const DEFAULT_POST_CLICK_DELAY_MS: u64 = 250;
/// Default link probe timeout (ms)
pub const DEFAULT_LINK_TIMEOUT_MS: u64 = 5_000;
/// Default number of re-locate attempts for stale references
pub const DEFAULT_STALE_RETRIES: u32 = 2;

/// Configuration for one engine run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bounded wait for at least one element of a role
    pub discovery_timeout_ms: u64,
    /// Polling interval while waiting for presence
    pub poll_interval_ms: u64,
    /// Bounded wait for `document.readyState == "complete"`
    pub settle_timeout_ms: u64,
    /// Pause after a click before the quiescence check
    pub post_click_delay_ms: u64,
    /// Timeout for one link destination probe
    pub link_timeout_ms: u64,
    /// Re-locate attempts before a stale reference fails its check
    pub stale_retries: u32,
    /// Probe link destinations over the network
    pub check_destinations: bool,
    /// Follow links with a click
    pub click_links: bool,
    /// Categories to run, in order
    pub categories: Vec<Category>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: DEFAULT_DISCOVERY_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            settle_timeout_ms: DEFAULT_SETTLE_TIMEOUT_MS,
            post_click_delay_ms: DEFAULT_POST_CLICK_DELAY_MS,
            link_timeout_ms: DEFAULT_LINK_TIMEOUT_MS,
            stale_retries: DEFAULT_STALE_RETRIES,
            check_destinations: true,
            click_links: true,
            categories: Category::ALL.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration suited to in-process documents: no waiting, no delays.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            discovery_timeout_ms: 0,
            post_click_delay_ms: 0,
            settle_timeout_ms: 1_000,
            ..Self::default()
        }
    }

    /// Set discovery timeout
    #[must_use]
    pub const fn with_discovery_timeout(mut self, ms: u64) -> Self {
        self.discovery_timeout_ms = ms;
        self
    }

    /// Set presence polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set settle timeout
    #[must_use]
    pub const fn with_settle_timeout(mut self, ms: u64) -> Self {
        self.settle_timeout_ms = ms;
        self
    }

    /// Set post-click delay
    #[must_use]
    pub const fn with_post_click_delay(mut self, ms: u64) -> Self {
        self.post_click_delay_ms = ms;
        self
    }

    /// Set link probe timeout
    #[must_use]
    pub const fn with_link_timeout(mut self, ms: u64) -> Self {
        self.link_timeout_ms = ms;
        self
    }

    /// Set stale retry budget
    #[must_use]
    pub const fn with_stale_retries(mut self, retries: u32) -> Self {
        self.stale_retries = retries;
        self
    }

    /// Enable or disable network destination probes
    #[must_use]
    pub const fn with_check_destinations(mut self, enabled: bool) -> Self {
        self.check_destinations = enabled;
        self
    }

    /// Enable or disable link clicks
    #[must_use]
    pub const fn with_click_links(mut self, enabled: bool) -> Self {
        self.click_links = enabled;
        self
    }

    /// Restrict the run to the given categories
    #[must_use]
    pub fn with_categories(mut self, categories: impl Into<Vec<Category>>) -> Self {
        self.categories = categories.into();
        self
    }

    /// Discovery timeout as a duration
    #[must_use]
    pub const fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    /// Polling interval as a duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Settle timeout as a duration
    #[must_use]
    pub const fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    /// Post-click delay as a duration
    #[must_use]
    pub const fn post_click_delay(&self) -> Duration {
        Duration::from_millis(self.post_click_delay_ms)
    }

    /// Link probe timeout as a duration
    #[must_use]
    pub const fn link_timeout(&self) -> Duration {
        Duration::from_millis(self.link_timeout_ms)
    }

    /// Parse configuration from YAML; missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> PagecheckResult<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| PagecheckError::Config {
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> PagecheckResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}
