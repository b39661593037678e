//! Headless Chromium driver.
//!
//! [`BrowserConfig`] is always available so callers can carry browser
//! settings without the feature. With the `browser` feature, [`CdpDriver`]
//! implements [`crate::PageDriver`] over the Chrome DevTools Protocol
//! through chromiumoxide, and [`ChromiumFactory`] opens one browser per
//! session.
//!
//! Element handles are resolved in page JavaScript on every call by
//! walking the `(selector, index)` steps with `querySelectorAll`. Clicks go
//! through real CDP mouse events: the resolved element is pinned with a
//! temporary attribute, found with `find_element`, unpinned, then clicked.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser launch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
    /// Path to the chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// CDP request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
            request_timeout_ms: 30_000,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set CDP request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// CDP request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(feature = "browser")]
pub use cdp::{CdpDriver, ChromiumFactory};

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{ElementHandle, ElementSnapshot, PageDriver, PageSource, ReadyState};
    use crate::result::{PagecheckError, PagecheckResult};
    use crate::session::DriverFactory;
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
    use chromiumoxide::error::CdpError;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use tokio::task::JoinHandle;
    use tracing::{debug, warn};

    const PIN_ATTRIBUTE: &str = "data-pagecheck-target";

    /// Shared visibility predicate, evaluated with `el` bound
    const VISIBLE_JS: &str = "(() => { const s = getComputedStyle(el); const r = el.getBoundingClientRect(); \
        return s.display !== 'none' && s.visibility !== 'hidden' && s.visibility !== 'collapse' \
        && r.width > 0 && r.height > 0; })()";

    const ENABLED_JS: &str = "!(el.matches(':disabled') || el.getAttribute('aria-disabled') === 'true')";

    /// Reply envelope from element scripts
    #[derive(Debug, Deserialize)]
    struct Reply<T> {
        #[serde(default)]
        stale: bool,
        #[serde(default)]
        invalid: Option<String>,
        #[serde(default)]
        error: Option<String>,
        ok: Option<T>,
    }

    fn steps_json(handle: Option<&ElementHandle>) -> PagecheckResult<String> {
        let steps: Vec<(&str, usize)> = handle
            .map(|h| {
                h.steps()
                    .iter()
                    .map(|s| (s.selector.as_str(), s.index))
                    .collect()
            })
            .unwrap_or_default();
        Ok(serde_json::to_string(&steps)?)
    }

    /// Wrap `body` in a resolver that binds `el` or replies `{stale: true}`
    pub(super) fn element_script(handle: Option<&ElementHandle>, body: &str) -> PagecheckResult<String> {
        Ok(format!(
            "(() => {{ let el = document; \
             for (const [s, i] of {steps}) {{ el = el.querySelectorAll(s)[i]; if (!el) return {{ stale: true }}; }} \
             {body} }})()",
            steps = steps_json(handle)?
        ))
    }

    fn cdp_error(err: CdpError, timeout_ms: u64) -> PagecheckError {
        match err {
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                PagecheckError::ConnectionFailed {
                    message: err.to_string(),
                }
            }
            CdpError::Timeout => PagecheckError::Timeout { ms: timeout_ms },
            other => PagecheckError::ScriptError {
                message: other.to_string(),
            },
        }
    }

    /// [`PageDriver`] over one Chromium page
    #[derive(Debug)]
    pub struct CdpDriver {
        browser: Browser,
        page: Page,
        handler: JoinHandle<()>,
        timeout_ms: u64,
        pins: u64,
        closed: bool,
    }

    impl CdpDriver {
        /// Launch a browser and open a blank page
        pub async fn launch(config: &BrowserConfig) -> PagecheckResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .request_timeout(config.request_timeout());
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder
                .build()
                .map_err(|message| PagecheckError::BrowserLaunchError { message })?;

            let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(|e| {
                PagecheckError::BrowserLaunchError {
                    message: e.to_string(),
                }
            })?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| PagecheckError::page(e.to_string()))?;
            debug!(headless = config.headless, "chromium session opened");
            Ok(Self {
                browser,
                page,
                handler,
                timeout_ms: config.request_timeout_ms,
                pins: 0,
                closed: false,
            })
        }

        fn ensure_open(&self) -> PagecheckResult<()> {
            if self.closed {
                Err(PagecheckError::SessionClosed)
            } else {
                Ok(())
            }
        }

        async fn evaluate<T: DeserializeOwned>(&self, script: String) -> PagecheckResult<T> {
            self.ensure_open()?;
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| cdp_error(e, self.timeout_ms))?;
            result.into_value().map_err(|e| PagecheckError::ScriptError {
                message: e.to_string(),
            })
        }

        async fn on_element<T: DeserializeOwned>(
            &self,
            handle: &ElementHandle,
            body: &str,
        ) -> PagecheckResult<T> {
            let reply: Reply<T> = self.evaluate(element_script(Some(handle), body)?).await?;
            if reply.stale {
                let last = handle.steps().last();
                return Err(PagecheckError::stale(
                    last.map_or("", |s| s.selector.as_str()),
                    last.map_or(0, |s| s.index),
                ));
            }
            if let Some(message) = reply.error {
                return Err(PagecheckError::ElementNotInteractable { message });
            }
            reply.ok.ok_or_else(|| PagecheckError::ScriptError {
                message: "element script returned no value".to_string(),
            })
        }
    }

    impl Drop for CdpDriver {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }

    #[async_trait]
    impl PageDriver for CdpDriver {
        async fn load(&mut self, source: &PageSource) -> PagecheckResult<()> {
            self.ensure_open()?;
            match source {
                PageSource::Html(html) => {
                    self.page.goto("about:blank").await.map_err(|e| {
                        PagecheckError::NavigationError {
                            url: "about:blank".to_string(),
                            message: e.to_string(),
                        }
                    })?;
                    self.page
                        .set_content(html)
                        .await
                        .map_err(|e| PagecheckError::page(e.to_string()))?;
                }
                PageSource::Url(url) => {
                    self.page
                        .goto(url.as_str())
                        .await
                        .map_err(|e| PagecheckError::NavigationError {
                            url: url.clone(),
                            message: e.to_string(),
                        })?;
                }
            }
            Ok(())
        }

        async fn current_url(&mut self) -> PagecheckResult<String> {
            self.ensure_open()?;
            let url = self
                .page
                .url()
                .await
                .map_err(|e| cdp_error(e, self.timeout_ms))?;
            Ok(url.unwrap_or_else(|| "about:blank".to_string()))
        }

        async fn query_all(
            &mut self,
            scope: Option<&ElementHandle>,
            selector: &str,
        ) -> PagecheckResult<Vec<ElementHandle>> {
            let selector_json = serde_json::to_string(selector)?;
            let body = format!(
                "try {{ return {{ ok: el.querySelectorAll({selector_json}).length }}; }} \
                 catch (e) {{ return {{ invalid: String(e) }}; }}"
            );
            let reply: Reply<usize> = self.evaluate(element_script(scope, &body)?).await?;
            if reply.stale {
                let last = scope.and_then(|s| s.steps().last());
                return Err(PagecheckError::stale(
                    last.map_or("", |s| s.selector.as_str()),
                    last.map_or(0, |s| s.index),
                ));
            }
            if let Some(message) = reply.invalid {
                return Err(PagecheckError::InvalidSelector {
                    selector: selector.to_string(),
                    message,
                });
            }
            let count = reply.ok.unwrap_or_default();
            Ok((0..count)
                .map(|index| match scope {
                    Some(scope) => scope.child(selector, index),
                    None => ElementHandle::root(selector, index),
                })
                .collect())
        }

        async fn snapshot(&mut self, element: &ElementHandle) -> PagecheckResult<ElementSnapshot> {
            self.on_element(
                element,
                "const attributes = {}; for (const a of el.attributes) attributes[a.name.toLowerCase()] = a.value; \
                 return { ok: { tag: el.tagName.toLowerCase(), attributes, text: el.textContent || '', \
                 outer_html: el.outerHTML, in_form: !!(el.parentElement && el.parentElement.closest('form')) } };",
            )
            .await
        }

        async fn is_visible(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
            self.on_element(element, &format!("return {{ ok: {VISIBLE_JS} }};"))
                .await
        }

        async fn is_enabled(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
            self.on_element(element, &format!("return {{ ok: {ENABLED_JS} }};"))
                .await
        }

        async fn is_checked(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
            self.on_element(element, "return { ok: !!el.checked };").await
        }

        async fn value(&mut self, element: &ElementHandle) -> PagecheckResult<String> {
            self.on_element(element, "return { ok: el.value == null ? '' : String(el.value) };")
                .await
        }

        async fn is_valid(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
            self.on_element(element, "return { ok: el.validity ? el.validity.valid : true };")
                .await
        }

        async fn click(&mut self, element: &ElementHandle) -> PagecheckResult<()> {
            self.pins += 1;
            let token = format!("pin-{}", self.pins);
            let body = format!(
                "if (!{VISIBLE_JS}) return {{ error: 'element is not visible' }}; \
                 if (!{ENABLED_JS}) return {{ error: 'element is disabled' }}; \
                 el.setAttribute('{PIN_ATTRIBUTE}', '{token}'); return {{ ok: true }};"
            );
            let _: bool = self.on_element(element, &body).await?;

            let selector = format!("[{PIN_ATTRIBUTE}=\"{token}\"]");
            let found = self.page.find_element(selector.as_str()).await;
            let unpin = format!(
                "(() => {{ const el = document.querySelector('{selector}'); \
                 if (el) el.removeAttribute('{PIN_ATTRIBUTE}'); return true; }})()",
                selector = selector.replace('\'', "\\'")
            );
            if let Err(err) = self.evaluate::<bool>(unpin).await {
                warn!(error = %err, "could not remove click pin");
            }
            let target = found.map_err(|e| PagecheckError::not_interactable(e.to_string()))?;
            target
                .click()
                .await
                .map_err(|e| PagecheckError::not_interactable(e.to_string()))?;
            debug!(element = %element, "clicked");
            Ok(())
        }

        async fn fill(&mut self, element: &ElementHandle, value: &str) -> PagecheckResult<()> {
            let value_json = serde_json::to_string(value)?;
            let body = format!(
                "const tag = el.tagName.toLowerCase(); \
                 if (tag !== 'input' && tag !== 'textarea') return {{ error: 'element is not a text field' }}; \
                 const blocked = ['checkbox','radio','submit','button','reset','file','image','hidden','range','color']; \
                 if (tag === 'input' && blocked.includes(el.type)) return {{ error: `input type ${{el.type}} cannot be filled` }}; \
                 if (!{VISIBLE_JS}) return {{ error: 'element is not visible' }}; \
                 if (!{ENABLED_JS}) return {{ error: 'element is disabled' }}; \
                 if (el.readOnly) return {{ error: 'element is readonly' }}; \
                 let v = {value_json}; \
                 if (el.maxLength >= 0 && el.type !== 'number') v = Array.from(v).slice(0, el.maxLength).join(''); \
                 el.focus(); el.value = ''; el.value = v; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                 return {{ ok: true }};"
            );
            let _: bool = self.on_element(element, &body).await?;
            Ok(())
        }

        async fn select_option(
            &mut self,
            element: &ElementHandle,
            option_index: usize,
        ) -> PagecheckResult<()> {
            let body = format!(
                "if (el.tagName.toLowerCase() !== 'select') return {{ error: 'element is not a select' }}; \
                 if (el.disabled) return {{ error: 'select is disabled' }}; \
                 const option = el.options[{option_index}]; \
                 if (!option) return {{ error: 'no option at index {option_index}' }}; \
                 if (option.disabled) return {{ error: 'option is disabled' }}; \
                 el.selectedIndex = {option_index}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                 return {{ ok: true }};"
            );
            let _: bool = self.on_element(element, &body).await?;
            Ok(())
        }

        async fn ready_state(&mut self) -> PagecheckResult<ReadyState> {
            let state: String = self.evaluate("document.readyState".to_string()).await?;
            Ok(ReadyState::parse(&state))
        }

        async fn close(&mut self) -> PagecheckResult<()> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            let closed = self.browser.close().await;
            if let Err(err) = self.browser.wait().await {
                warn!(error = %err, "browser process did not exit cleanly");
            }
            self.handler.abort();
            closed.map(|_| ()).map_err(|e| PagecheckError::ConnectionFailed {
                message: e.to_string(),
            })
        }
    }

    /// Opens a fresh Chromium per session
    #[derive(Debug, Clone, Default)]
    pub struct ChromiumFactory {
        config: BrowserConfig,
    }

    impl ChromiumFactory {
        /// Factory with launch configuration
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }
    }

    #[async_trait]
    impl DriverFactory for ChromiumFactory {
        type Driver = CdpDriver;

        async fn open(&self) -> PagecheckResult<CdpDriver> {
            CdpDriver::launch(&self.config).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = BrowserConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert_eq!(config.request_timeout(), Duration::from_secs(30));
        }

        #[test]
        fn test_builder() {
            let config = BrowserConfig::default()
                .with_viewport(390, 844)
                .with_headless(false)
                .with_no_sandbox()
                .with_chromium_path("/usr/bin/chromium")
                .with_request_timeout(5_000);
            assert_eq!((config.viewport_width, config.viewport_height), (390, 844));
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert_eq!(config.request_timeout_ms, 5_000);
        }

        #[test]
        fn test_partial_yaml() {
            let config: BrowserConfig = serde_yaml_ng::from_str("headless: false\n").unwrap();
            assert!(!config.headless);
            assert_eq!(config.viewport_width, 1280);
        }
    }

    #[cfg(feature = "browser")]
    mod script_tests {
        use super::cdp::element_script;
        use crate::driver::ElementHandle;

        #[test]
        fn test_script_walks_steps() {
            let handle = ElementHandle::root("form", 1).child("input, select, textarea", 2);
            let script = element_script(Some(&handle), "return { ok: 1 };").unwrap();
            assert!(script.contains(r#"[["form",1],["input, select, textarea",2]]"#));
            assert!(script.ends_with("return { ok: 1 }; })()"));
        }

        #[test]
        fn test_document_scope() {
            let script = element_script(None, "return { ok: 0 };").unwrap();
            assert!(script.contains("of []"));
        }
    }
}
