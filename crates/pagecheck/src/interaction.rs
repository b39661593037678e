//! Interaction driver.
//!
//! [`Interactor`] owns the session for the length of a run. Every element
//! operation goes through a retry loop: a stale handle triggers a settle,
//! a restore of the original source if the session wandered off, and a
//! re-query of the element's role within its scope by index.
//!
//! Clicks that may leave the document are followed by a bounded settle and,
//! when the URL changed (or the source is inline markup that a navigation
//! would have replaced), by a reload of the original source.

use crate::boundary::{self, FieldConstraints, Observation};
use crate::checks::{self, names};
use crate::classifier::ElementKind;
use crate::config::EngineConfig;
use crate::driver::{collapse_whitespace, ElementHandle, PageDriver, PageSource, ReadyState};
use crate::locator::{self, ElementRef, LocatorOptions, Role};
use crate::result::{PagecheckError, PagecheckResult};
use crate::verdict::CheckResult;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Split session-fatal errors from per-check failures.
///
/// The outer `Err` aborts the run; the inner one becomes a FAILED check.
pub fn recoverable<T>(
    result: PagecheckResult<T>,
) -> PagecheckResult<Result<T, PagecheckError>> {
    match result {
        Err(err) if err.is_fatal() => Err(err),
        other => Ok(other),
    }
}

/// Whether clicking this element may replace the document
#[must_use]
pub fn may_navigate(kind: ElementKind, element: &ElementRef) -> bool {
    let snapshot = &element.snapshot;
    match kind {
        ElementKind::Link => {
            checks::LinkTarget::parse(snapshot.attr("href"), "about:blank").navigates()
        }
        ElementKind::SubmitControl => snapshot.in_form,
        ElementKind::Button => snapshot.in_form && snapshot.tag == "button" && !snapshot.has_attr("type"),
        _ => false,
    }
}

fn without_fragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or_default().to_string(),
    }
}

fn attribute_selector(name: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("[{name}=\"{escaped}\"]")
}

/// What a successful click led to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClickOutcome {
    /// URL the document moved to, if it changed
    pub navigated_to: Option<String>,
}

impl ClickOutcome {
    fn describe(&self, base: &str) -> String {
        match &self.navigated_to {
            Some(url) => format!("{base}; navigated to {url}"),
            None => base.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Op<'v> {
    Visible,
    Enabled,
    Checked,
    Value,
    Valid,
    Click,
    Fill(&'v str),
    Select(usize),
}

#[derive(Debug)]
enum Answer {
    Flag(bool),
    Text(String),
    Done,
}

impl Answer {
    fn flag(self) -> PagecheckResult<bool> {
        match self {
            Self::Flag(flag) => Ok(flag),
            other => Err(PagecheckError::page(format!("expected a flag, got {other:?}"))),
        }
    }

    fn text(self) -> PagecheckResult<String> {
        match self {
            Self::Text(text) => Ok(text),
            other => Err(PagecheckError::page(format!("expected text, got {other:?}"))),
        }
    }
}

/// Session wrapper that performs element interactions for one run
#[derive(Debug)]
pub struct Interactor<'a, D: PageDriver + ?Sized> {
    driver: &'a mut D,
    config: &'a EngineConfig,
    source: &'a PageSource,
    home_url: String,
}

impl<'a, D: PageDriver + ?Sized> Interactor<'a, D> {
    /// Load `source` into `driver` and wait for it to settle
    pub async fn open(
        driver: &'a mut D,
        config: &'a EngineConfig,
        source: &'a PageSource,
    ) -> PagecheckResult<Self> {
        let mut interactor = Self {
            driver,
            config,
            source,
            home_url: String::new(),
        };
        interactor.restore().await?;
        Ok(interactor)
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        self.config
    }

    /// URL of the loaded source
    #[must_use]
    pub fn home_url(&self) -> &str {
        &self.home_url
    }

    /// Reload the original source
    pub async fn restore(&mut self) -> PagecheckResult<()> {
        self.driver.load(self.source).await?;
        if let Err(err) = self.settle().await {
            warn!(error = %err, "source did not settle after load");
        }
        self.home_url = self.driver.current_url().await?;
        debug!(url = %self.home_url, "source loaded");
        Ok(())
    }

    /// Wait for `document.readyState == "complete"`, bounded
    pub async fn settle(&mut self) -> PagecheckResult<()> {
        let timeout = self.config.settle_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            match self.driver.ready_state().await {
                Ok(ReadyState::Complete) => return Ok(()),
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => debug!(error = %err, "ready state unavailable"),
            }
            if Instant::now() >= deadline {
                return Err(PagecheckError::Timeout {
                    ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Base URL for resolving relative links: `<base href>` or the document URL
    pub async fn base_url(&mut self) -> PagecheckResult<String> {
        let current = self.driver.current_url().await?;
        let mut href = None;
        match self.driver.query_all(None, "base[href]").await {
            Ok(bases) => {
                if let Some(base) = bases.first() {
                    href = self.driver.snapshot(base).await?.attr("href").map(str::to_string);
                }
            }
            Err(err) => debug!(error = %err, "base element query failed; using document URL"),
        }
        Ok(match href {
            Some(href) => match Url::parse(&current).and_then(|c| c.join(&href)) {
                Ok(url) => url.to_string(),
                Err(_) => Url::parse(&href).map_or(current, |u| u.to_string()),
            },
            None => current,
        })
    }

    /// Locate a role, waiting for presence when `wait` is set
    pub async fn locate(
        &mut self,
        scope: Option<&ElementHandle>,
        role: Role,
        wait: bool,
    ) -> PagecheckResult<Vec<ElementRef>> {
        let options = if wait {
            LocatorOptions::from_config(self.config)
        } else {
            LocatorOptions::immediate()
        };
        locator::locate(&mut *self.driver, scope, role, &options).await
    }

    /// Trimmed text of every visible element matching `selector`
    pub async fn visible_texts(&mut self, selector: &str) -> PagecheckResult<Vec<String>> {
        let handles = self.driver.query_all(None, selector).await?;
        let mut texts = Vec::new();
        for handle in handles {
            if self.driver.is_visible(&handle).await? {
                let snapshot = self.driver.snapshot(&handle).await?;
                texts.push(collapse_whitespace(&snapshot.text));
            }
        }
        Ok(texts)
    }

    /// Whether an element with `id` or `name` equal to `fragment` exists
    pub async fn anchor_exists(&mut self, fragment: &str) -> PagecheckResult<bool> {
        let selector = format!(
            "{}, {}",
            attribute_selector("id", fragment),
            attribute_selector("name", fragment)
        );
        Ok(!self.driver.query_all(None, &selector).await?.is_empty())
    }

    async fn dispatch(&mut self, handle: &ElementHandle, op: Op<'_>) -> PagecheckResult<Answer> {
        let driver = &mut *self.driver;
        Ok(match op {
            Op::Visible => Answer::Flag(driver.is_visible(handle).await?),
            Op::Enabled => Answer::Flag(driver.is_enabled(handle).await?),
            Op::Checked => Answer::Flag(driver.is_checked(handle).await?),
            Op::Valid => Answer::Flag(driver.is_valid(handle).await?),
            Op::Value => Answer::Text(driver.value(handle).await?),
            Op::Click => {
                driver.click(handle).await?;
                Answer::Done
            }
            Op::Fill(value) => {
                driver.fill(handle, value).await?;
                Answer::Done
            }
            Op::Select(index) => {
                driver.select_option(handle, index).await?;
                Answer::Done
            }
        })
    }

    async fn relocate(&mut self, element: &mut ElementRef) -> PagecheckResult<()> {
        if let Err(err) = self.settle().await {
            if err.is_fatal() {
                return Err(err);
            }
        }
        let current = self.driver.current_url().await?;
        if without_fragment(&current) != without_fragment(&self.home_url) {
            warn!(from = %current, "session left the source, restoring");
            self.restore().await?;
        }
        let handles = self
            .driver
            .query_all(element.scope.as_ref(), element.role.selector())
            .await?;
        let handle = handles
            .into_iter()
            .nth(element.index)
            .ok_or_else(|| PagecheckError::stale(element.role.selector(), element.index))?;
        element.handle = handle;
        Ok(())
    }

    async fn run(&mut self, element: &mut ElementRef, op: Op<'_>) -> PagecheckResult<Answer> {
        let mut attempts = 0;
        loop {
            let result = self.dispatch(&element.handle, op).await;
            match result {
                Err(err) if err.is_stale() && attempts < self.config.stale_retries => {
                    attempts += 1;
                    warn!(
                        element = %element.display_name(),
                        attempt = attempts,
                        op = ?op,
                        "stale reference, re-locating"
                    );
                    self.relocate(element).await?;
                }
                other => return other,
            }
        }
    }

    /// Rendered
    pub async fn is_visible(&mut self, element: &mut ElementRef) -> PagecheckResult<bool> {
        self.run(element, Op::Visible).await?.flag()
    }

    /// Not disabled
    pub async fn is_enabled(&mut self, element: &mut ElementRef) -> PagecheckResult<bool> {
        self.run(element, Op::Enabled).await?.flag()
    }

    /// Checked
    pub async fn is_checked(&mut self, element: &mut ElementRef) -> PagecheckResult<bool> {
        self.run(element, Op::Checked).await?.flag()
    }

    /// Committed value
    pub async fn value(&mut self, element: &mut ElementRef) -> PagecheckResult<String> {
        self.run(element, Op::Value).await?.text()
    }

    /// Constraint-validation state
    pub async fn is_valid(&mut self, element: &mut ElementRef) -> PagecheckResult<bool> {
        self.run(element, Op::Valid).await?.flag()
    }

    /// Clear and type a value
    pub async fn fill(&mut self, element: &mut ElementRef, value: &str) -> PagecheckResult<()> {
        self.run(element, Op::Fill(value)).await.map(|_| ())
    }

    /// Select an option by index
    pub async fn select_option(
        &mut self,
        element: &mut ElementRef,
        index: usize,
    ) -> PagecheckResult<()> {
        self.run(element, Op::Select(index)).await.map(|_| ())
    }

    /// Click, pause, and wait for the document to settle.
    ///
    /// Does not restore the source; see [`Self::return_home`].
    pub async fn click(&mut self, element: &mut ElementRef) -> PagecheckResult<ClickOutcome> {
        self.run(element, Op::Click).await?;
        let delay = self.config.post_click_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.settle().await?;
        let current = self.driver.current_url().await?;
        let navigated_to =
            (without_fragment(&current) != without_fragment(&self.home_url)).then_some(current);
        Ok(ClickOutcome { navigated_to })
    }

    /// Restore the source if the session left it, or if a navigating click
    /// may have replaced inline markup.
    pub async fn return_home(&mut self, may_navigate: bool) -> PagecheckResult<()> {
        let current = self.driver.current_url().await?;
        let left = without_fragment(&current) != without_fragment(&self.home_url);
        if left || (may_navigate && self.source.is_inline()) {
            debug!(left, "restoring source after click");
            self.restore().await?;
        }
        Ok(())
    }

    /// Click Test: click, settle, restore; errors become FAILED
    pub async fn press(
        &mut self,
        element: &mut ElementRef,
        may_navigate: bool,
    ) -> PagecheckResult<CheckResult> {
        let clicked = recoverable(self.click(element).await)?;
        let restored = recoverable(self.return_home(may_navigate).await)?;
        Ok(match (clicked, restored) {
            (Ok(outcome), Ok(())) => CheckResult::passed(outcome.describe("Clicked successfully")),
            (Err(err), _) => CheckResult::failed(format!("Error during clicking: {err}")),
            (Ok(_), Err(err)) => {
                CheckResult::failed(format!("Clicked, but the page could not be restored: {err}"))
            }
        })
    }

    /// Fill every boundary value for the field's kind and judge each read-back
    pub async fn probe_boundaries(
        &mut self,
        element: &mut ElementRef,
        kind: ElementKind,
    ) -> PagecheckResult<Vec<(String, CheckResult)>> {
        let constraints = FieldConstraints::from_snapshot(&element.snapshot);
        let mut rows = Vec::new();
        for probe in boundary::matrix(kind) {
            let result = match recoverable(self.observe(element, kind, &probe.value).await)? {
                Ok(observed) => boundary::evaluate(kind, &probe, constraints, &observed),
                Err(err) => CheckResult::from_error(&err),
            };
            rows.push((probe.check_name(), result));
        }
        Ok(rows)
    }

    async fn observe(
        &mut self,
        element: &mut ElementRef,
        kind: ElementKind,
        value: &str,
    ) -> PagecheckResult<Observation> {
        self.fill(element, value).await?;
        let read_back = self.value(element).await?;
        let valid = if kind == ElementKind::EmailInput {
            Some(self.is_valid(element).await?)
        } else {
            None
        };
        Ok(Observation { read_back, valid })
    }

    /// Toggle Test: click only when unchecked, never uncheck
    pub async fn toggle(&mut self, element: &mut ElementRef) -> PagecheckResult<CheckResult> {
        Ok(recoverable(self.check_on(element).await)?
            .unwrap_or_else(|err| CheckResult::from_error(&err)))
    }

    async fn check_on(&mut self, element: &mut ElementRef) -> PagecheckResult<CheckResult> {
        if self.is_checked(element).await? {
            return Ok(CheckResult::passed("Already checked"));
        }
        self.click(element).await?;
        let checked = self.is_checked(element).await?;
        Ok(CheckResult::expect(
            checked,
            "Checked after click",
            "Still unchecked after click",
        ))
    }

    /// One row per option; the first option is the placeholder.
    ///
    /// `blocked` carries the reason the select cannot be interacted with.
    pub async fn choose_options(
        &mut self,
        select: &mut ElementRef,
        blocked: Option<&str>,
    ) -> PagecheckResult<Vec<(String, CheckResult)>> {
        let options = match recoverable(self.locate(Some(&select.handle), Role::Option, false).await)? {
            Ok(options) => options,
            Err(err) => return Ok(vec![(names::OPTIONS.to_string(), CheckResult::from_error(&err))]),
        };
        if options.is_empty() {
            return Ok(vec![(
                names::OPTIONS.to_string(),
                CheckResult::failed("Select has no options"),
            )]);
        }

        let mut rows = Vec::with_capacity(options.len());
        for mut option in options {
            let text = option.snapshot.display_text().unwrap_or_default();
            let name = format!("Option {}: {}", option.index + 1, text);
            let result = if option.index == 0 {
                CheckResult::skipped("First option treated as placeholder")
            } else if let Some(reason) = blocked {
                CheckResult::not_attempted(reason)
            } else {
                match recoverable(self.choose(select, &mut option).await)? {
                    Ok(result) => result,
                    Err(err) => CheckResult::from_error(&err),
                }
            };
            rows.push((name, result));
        }
        Ok(rows)
    }

    async fn choose(
        &mut self,
        select: &mut ElementRef,
        option: &mut ElementRef,
    ) -> PagecheckResult<CheckResult> {
        if !self.is_enabled(option).await? {
            return Ok(CheckResult::failed("Option is disabled"));
        }
        let Some(expected) = option
            .snapshot
            .attr("value")
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
        else {
            return Ok(CheckResult::failed("option has no value property"));
        };
        self.select_option(select, option.index).await?;
        let committed = self.value(select).await?;
        Ok(CheckResult::expect(
            committed == expected,
            format!("Selected, value '{expected}'"),
            format!("Select committed '{committed}' instead of '{expected}'"),
        ))
    }

    /// Form Submission Test and Submission Feedback for one submit control
    pub async fn submit(
        &mut self,
        control: &mut ElementRef,
    ) -> PagecheckResult<(CheckResult, CheckResult)> {
        let submitted = match recoverable(self.click(control).await)? {
            Ok(outcome) => {
                let errors = recoverable(self.visible_texts(".error").await)?.unwrap_or_default();
                let successes =
                    recoverable(self.visible_texts(".success").await)?.unwrap_or_default();
                (
                    CheckResult::passed(outcome.describe("Form submitted")),
                    checks::feedback(&errors, &successes),
                )
            }
            Err(err) => (
                CheckResult::failed(format!("Submission failed: {err}")),
                CheckResult::skipped("Form was not submitted"),
            ),
        };
        if let Err(err) = recoverable(self.return_home(true).await)? {
            warn!(error = %err, "could not restore source after submission");
        }
        Ok(submitted)
    }
}
