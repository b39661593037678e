//! Element discovery by semantic role.
//!
//! [`locate`] auto-waits: it polls until at least one element of the role is
//! present or the timeout elapses, and then returns whatever it found. An
//! empty result after the wait is a normal outcome, never an error.

use crate::config::{EngineConfig, DEFAULT_DISCOVERY_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};
use crate::driver::{ElementHandle, ElementSnapshot, PageDriver};
use crate::result::PagecheckResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Semantic roles the engine discovers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Button-like elements anywhere in the document
    Button,
    /// Anchors
    Link,
    /// Forms
    Form,
    /// Inputs, selects and textareas inside a form
    Field,
    /// `<button>` elements inside a form
    FormButton,
    /// Submit-typed controls inside a form
    SubmitControl,
    /// Options inside a select
    Option,
}

impl Role {
    /// CSS selector for the role
    #[must_use]
    pub const fn selector(self) -> &'static str {
        match self {
            Self::Button => {
                r#"button, input[type="button"], input[type="submit"], input[type="reset"], [role="button"]"#
            }
            Self::Link => "a",
            Self::Form => "form",
            Self::Field => "input, select, textarea",
            Self::FormButton => "button",
            Self::SubmitControl => r#"input[type="submit"], button[type="submit"]"#,
            Self::Option => "option",
        }
    }

    /// Display prefix for element names
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Button => "Button",
            Self::Link => "Link",
            Self::Form => "Form",
            Self::Field => "Field",
            Self::FormButton => "Form Button",
            Self::SubmitControl => "Submit Control",
            Self::Option => "Option",
        }
    }
}

/// Wait behaviour for [`locate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Bounded wait for the first match
    pub timeout: Duration,
    /// Polling interval while waiting
    pub poll_interval: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_DISCOVERY_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl LocatorOptions {
    /// Single query, no waiting
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Options from engine configuration
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            timeout: config.discovery_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A located element: live handle plus what it looked like at discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    /// Handle, replaced when the element is re-located
    pub handle: ElementHandle,
    /// Attributes captured at discovery
    pub snapshot: ElementSnapshot,
    /// Role it was located by
    pub role: Role,
    /// Position within the role query
    pub index: usize,
    /// Scope the role query ran in
    pub scope: Option<ElementHandle>,
}

impl ElementRef {
    /// Positional display name, e.g. "Link 2"
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.role.label(), self.index + 1)
    }
}

/// Locate every element of `role`, waiting up to `options.timeout` for the
/// first one to appear.
pub async fn locate<D>(
    driver: &mut D,
    scope: Option<&ElementHandle>,
    role: Role,
    options: &LocatorOptions,
) -> PagecheckResult<Vec<ElementRef>>
where
    D: PageDriver + ?Sized,
{
    let deadline = Instant::now() + options.timeout;
    loop {
        let handles = driver.query_all(scope, role.selector()).await?;
        if !handles.is_empty() {
            let mut located = Vec::with_capacity(handles.len());
            for (index, handle) in handles.into_iter().enumerate() {
                let snapshot = driver.snapshot(&handle).await?;
                located.push(ElementRef {
                    handle,
                    snapshot,
                    role,
                    index,
                    scope: scope.cloned(),
                });
            }
            debug!(role = ?role, count = located.len(), "located");
            return Ok(located);
        }
        if Instant::now() >= deadline {
            debug!(role = ?role, timeout_ms = options.timeout.as_millis() as u64, "none located");
            return Ok(Vec::new());
        }
        tokio::time::sleep(options.poll_interval).await;
    }
}

/// Locate without waiting
pub async fn locate_now<D>(
    driver: &mut D,
    scope: Option<&ElementHandle>,
    role: Role,
) -> PagecheckResult<Vec<ElementRef>>
where
    D: PageDriver + ?Sized,
{
    locate(driver, scope, role, &LocatorOptions::immediate()).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dom::StaticDriver;
    use crate::driver::PageSource;

    async fn driver_with(html: &str) -> StaticDriver {
        let mut driver = StaticDriver::new();
        driver.load(&PageSource::Html(html.into())).await.unwrap();
        driver
    }

    mod role_tests {
        use super::*;

        #[tokio::test]
        async fn test_button_role_members() {
            let mut driver = driver_with(
                r#"<button>a</button><input type="button" value="b"><input type="submit">
                <input type="reset"><div role="button">c</div><input type="text"><a>x</a>"#,
            )
            .await;
            let found = locate_now(&mut driver, None, Role::Button).await.unwrap();
            let tags: Vec<&str> = found.iter().map(|e| e.snapshot.tag.as_str()).collect();
            assert_eq!(tags, vec!["button", "input", "input", "input", "div"]);
        }

        #[tokio::test]
        async fn test_fields_are_scoped_to_form() {
            let mut driver = driver_with(
                "<input id=outside><form><input id=a><textarea></textarea><select></select></form>",
            )
            .await;
            let forms = locate_now(&mut driver, None, Role::Form).await.unwrap();
            let fields = locate_now(&mut driver, Some(&forms[0].handle), Role::Field)
                .await
                .unwrap();
            assert_eq!(fields.len(), 3);
            assert_eq!(fields[0].snapshot.attr("id"), Some("a"));
            assert_eq!(fields[0].scope.as_ref(), Some(&forms[0].handle));
        }

        #[test]
        fn test_display_name_is_one_based() {
            let element = ElementRef {
                handle: ElementHandle::root("a", 1),
                snapshot: ElementSnapshot::default(),
                role: Role::Link,
                index: 1,
                scope: None,
            };
            assert_eq!(element.display_name(), "Link 2");
        }
    }

    mod wait_tests {
        use super::*;

        #[tokio::test]
        async fn test_empty_after_timeout() {
            let mut driver = driver_with("<p>nothing here</p>").await;
            let options = LocatorOptions::default().with_timeout(Duration::from_millis(30));
            let start = std::time::Instant::now();
            let found = locate(&mut driver, None, Role::Form, &options).await.unwrap();
            assert!(found.is_empty());
            assert!(start.elapsed() >= Duration::from_millis(30));
        }

        #[tokio::test]
        async fn test_stable_order_across_calls() {
            let mut driver = driver_with("<a>1</a><a>2</a><a>3</a>").await;
            let first = locate_now(&mut driver, None, Role::Link).await.unwrap();
            let second = locate_now(&mut driver, None, Role::Link).await.unwrap();
            assert_eq!(first, second);
            assert_eq!(first[2].snapshot.text, "3");
        }

        #[test]
        fn test_options_from_config() {
            let config = EngineConfig::default().with_discovery_timeout(123);
            let options = LocatorOptions::from_config(&config);
            assert_eq!(options.timeout, Duration::from_millis(123));
        }
    }
}
