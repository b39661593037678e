//! QA engine.
//!
//! Runs the button, link and form suites against one session and collects
//! one verdict per located element. The source is reloaded before each
//! category so every suite starts from a fresh document.
//!
//! Per-element failures never abort a run. Only session-fatal errors
//! (see [`PagecheckError::is_fatal`]) propagate out of [`QaEngine::run`].
//!
//! [`PagecheckError::is_fatal`]: crate::PagecheckError::is_fatal

use crate::checks::{self, names, Destination, LinkTarget};
use crate::classifier::{classify, ElementKind};
use crate::config::EngineConfig;
use crate::driver::{PageDriver, PageSource};
use crate::interaction::{may_navigate, recoverable, Interactor};
use crate::locator::{ElementRef, Role};
use crate::probe::{LinkProbe, ProbeError};
use crate::report::{Category, FormVerdict, TestReport};
use crate::result::{PagecheckError, PagecheckResult};
use crate::verdict::{CheckOutcome, CheckResult, ElementVerdict};
use std::sync::Arc;
use tracing::{debug, info, instrument};

type Observed = Result<bool, PagecheckError>;

fn observed(value: &Observed, check: impl FnOnce(bool) -> CheckResult) -> CheckResult {
    match value {
        Ok(flag) => check(*flag),
        Err(err) => CheckResult::from_error(err),
    }
}

/// Why a click or fill must not be attempted, if anything
fn blocked(labelled: bool, visible: &Observed, enabled: &Observed) -> Option<&'static str> {
    if !labelled {
        return Some("No visible text, title or value; not clicked");
    }
    match visible {
        Ok(true) => {}
        Ok(false) => return Some("Element is not visible"),
        Err(_) => return Some("Visibility could not be determined"),
    }
    match enabled {
        Ok(true) => None,
        Ok(false) => Some("Element is disabled"),
        Err(_) => Some("Interactivity could not be determined"),
    }
}

fn field_name(element: &ElementRef) -> String {
    match element.snapshot.attr("name").map(str::trim) {
        Some(name) if !name.is_empty() => format!("{} ({name})", element.display_name()),
        _ => element.display_name(),
    }
}

/// Element-interaction test engine
#[derive(Debug, Clone)]
pub struct QaEngine {
    config: EngineConfig,
    probe: Option<Arc<dyn LinkProbe>>,
}

impl Default for QaEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl QaEngine {
    /// Engine without a destination probe
    #[must_use]
    pub const fn new(config: EngineConfig) -> Self {
        Self {
            config,
            probe: None,
        }
    }

    /// Use `probe` for Broken-Link and Responsive tests
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn LinkProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Use a `reqwest`-backed probe
    #[cfg(feature = "http")]
    #[must_use]
    pub fn with_http_probe(self) -> Self {
        self.with_probe(Arc::new(crate::probe::HttpProbe::new()))
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Same engine restricted to one category
    #[must_use]
    pub fn for_category(&self, category: Category) -> Self {
        Self {
            config: self.config.clone().with_categories([category]),
            probe: self.probe.clone(),
        }
    }

    /// Run every configured category against `source`
    #[instrument(skip_all, fields(source = %source.describe()))]
    pub async fn run<D>(&self, driver: &mut D, source: &PageSource) -> PagecheckResult<TestReport>
    where
        D: PageDriver + ?Sized,
    {
        let mut report = TestReport::new(source);
        let mut ix = Interactor::open(driver, &self.config, source).await?;
        for (position, category) in self.config.categories.iter().copied().enumerate() {
            if position > 0 {
                ix.restore().await?;
            }
            match category {
                Category::Buttons => report.buttons = self.test_buttons(&mut ix).await?,
                Category::Links => report.links = self.test_links(&mut ix).await?,
                Category::Forms => report.forms = self.test_forms(&mut ix).await?,
            }
            report.categories.push(category);
            let tally = report.summary().get(category);
            info!(
                category = %category,
                total = tally.total,
                passed = tally.passed,
                failed = tally.failed,
                unknown = tally.unknown,
                "category complete"
            );
        }
        Ok(report.finish())
    }

    /// Button suite
    pub async fn test_buttons<D>(
        &self,
        ix: &mut Interactor<'_, D>,
    ) -> PagecheckResult<Vec<ElementVerdict>>
    where
        D: PageDriver + ?Sized,
    {
        let buttons = ix.locate(None, Role::Button, true).await?;
        let mut verdicts = Vec::with_capacity(buttons.len());
        for mut button in buttons {
            let name = button.display_name();
            verdicts.push(self.test_clickable(ix, &mut button, name, true).await?);
        }
        Ok(verdicts)
    }

    /// Visibility, Label, Interactivity and Click for a button-like element.
    ///
    /// With `click_submits` unset, submit controls are left to the form's
    /// submission test.
    async fn test_clickable<D>(
        &self,
        ix: &mut Interactor<'_, D>,
        element: &mut ElementRef,
        name: String,
        click_submits: bool,
    ) -> PagecheckResult<ElementVerdict>
    where
        D: PageDriver + ?Sized,
    {
        let kind = classify(&element.snapshot);
        let mut verdict = ElementVerdict::new(element.index, name, &element.snapshot, kind);

        let visible = recoverable(ix.is_visible(element).await)?;
        verdict.record(
            names::VISIBILITY,
            observed(&visible, |v| checks::visibility(v, &element.snapshot)),
        );
        let label = checks::label(&element.snapshot, kind);
        let labelled = label.outcome == CheckOutcome::Passed;
        verdict.record(names::LABEL, label);
        let enabled = recoverable(ix.is_enabled(element).await)?;
        verdict.record(names::INTERACTIVITY, observed(&enabled, checks::interactivity));

        let click = if kind == ElementKind::SubmitControl && !click_submits {
            CheckResult::skipped("Exercised by Form Submission Test")
        } else if let Some(reason) = blocked(labelled, &visible, &enabled) {
            CheckResult::not_attempted(reason)
        } else {
            let navigates = may_navigate(kind, element);
            ix.press(element, navigates).await?
        };
        verdict.record(names::CLICK, click);
        Ok(verdict.finish())
    }

    /// Link suite
    pub async fn test_links<D>(
        &self,
        ix: &mut Interactor<'_, D>,
    ) -> PagecheckResult<Vec<ElementVerdict>>
    where
        D: PageDriver + ?Sized,
    {
        let links = ix.locate(None, Role::Link, true).await?;
        let base = ix.base_url().await?;
        let mut verdicts = Vec::with_capacity(links.len());
        for mut link in links {
            verdicts.push(self.test_link(ix, &mut link, &base).await?);
        }
        Ok(verdicts)
    }

    async fn test_link<D>(
        &self,
        ix: &mut Interactor<'_, D>,
        link: &mut ElementRef,
        base: &str,
    ) -> PagecheckResult<ElementVerdict>
    where
        D: PageDriver + ?Sized,
    {
        let raw = link.snapshot.attr("href").map(str::to_string);
        let target = LinkTarget::parse(raw.as_deref(), base);
        let mut verdict =
            ElementVerdict::new(link.index, link.display_name(), &link.snapshot, ElementKind::Link);
        verdict.href.clone_from(&raw);

        let visible = recoverable(ix.is_visible(link).await)?;
        verdict.record(
            names::VISIBILITY,
            observed(&visible, |v| checks::visibility(v, &link.snapshot)),
        );
        let label = checks::label(&link.snapshot, ElementKind::Link);
        let labelled = label.outcome == CheckOutcome::Passed;
        verdict.record(names::LABEL, label);
        verdict.record(names::HREF, checks::href(&target, raw.as_deref()));
        let enabled = recoverable(ix.is_enabled(link).await)?;
        let interactivity = match (&visible, &enabled) {
            (Ok(v), Ok(e)) => checks::link_interactivity(&target, *v, *e),
            (Err(err), _) | (_, Err(err)) => CheckResult::from_error(err),
        };
        verdict.record(names::INTERACTIVITY, interactivity);
        verdict.record(names::URL_FORMAT, checks::url_format(&target));

        let found = match &target {
            LinkTarget::Anchor(fragment) => recoverable(ix.anchor_exists(fragment).await)?.ok(),
            _ => None,
        };
        verdict.record(names::ANCHOR, checks::anchor(&target, found));

        let destination = self.destination(&target).await;
        verdict.record(names::BROKEN_LINK, checks::broken_link(&target, &destination));
        verdict.record(names::RESPONSIVE, checks::responsive(&target, &destination));

        let click = match &target {
            LinkTarget::Missing => CheckResult::not_attempted("No href attribute"),
            LinkTarget::Empty => CheckResult::not_attempted("Empty href attribute"),
            _ if !self.config.click_links => CheckResult::skipped("Link clicks disabled"),
            LinkTarget::Contact(scheme) => {
                CheckResult::skipped(format!("{scheme}: links are not followed"))
            }
            _ => match blocked(labelled, &visible, &enabled) {
                Some(reason) => CheckResult::not_attempted(reason),
                None => ix.press(link, target.navigates()).await?,
            },
        };
        verdict.record(names::CLICK, click);
        Ok(verdict.finish())
    }

    /// Probe a web destination once, bounded by the link timeout
    async fn destination(&self, target: &LinkTarget) -> Destination {
        let (Some(url), Some(probe)) = (target.web_url(), self.probe.as_ref()) else {
            return Destination::NotProbed;
        };
        if !self.config.check_destinations {
            return Destination::NotProbed;
        }
        let limit = self.config.link_timeout();
        let answer = tokio::time::timeout(limit, probe.probe(url.as_str(), limit)).await;
        let destination = match answer {
            Ok(Ok(response)) => Destination::Answered(response),
            Ok(Err(err)) => Destination::Unreachable(err),
            Err(_) => Destination::Unreachable(ProbeError::Timeout {
                ms: limit.as_millis() as u64,
            }),
        };
        debug!(url = %url, destination = ?destination, "destination probed");
        destination
    }

    /// Form suite
    pub async fn test_forms<D>(
        &self,
        ix: &mut Interactor<'_, D>,
    ) -> PagecheckResult<Vec<FormVerdict>>
    where
        D: PageDriver + ?Sized,
    {
        let forms = ix.locate(None, Role::Form, true).await?;
        let mut verdicts = Vec::with_capacity(forms.len());
        for (position, form) in forms.iter().enumerate() {
            if position > 0 {
                ix.restore().await?;
            }
            verdicts.push(self.test_form(ix, form).await?);
        }
        Ok(verdicts)
    }

    async fn test_form<D>(
        &self,
        ix: &mut Interactor<'_, D>,
        form: &ElementRef,
    ) -> PagecheckResult<FormVerdict>
    where
        D: PageDriver + ?Sized,
    {
        let mut verdict = FormVerdict::new(form.index, &form.snapshot);
        debug!(form = %verdict.name, "testing form");

        let (mut controls, fields): (Vec<_>, Vec<_>) = ix
            .locate(Some(&form.handle), Role::Field, false)
            .await?
            .into_iter()
            .partition(|f| classify(&f.snapshot).is_clickable());
        for mut field in fields {
            verdict.fields.push(self.test_field(ix, &mut field).await?);
        }

        controls.extend(ix.locate(Some(&form.handle), Role::FormButton, false).await?);
        for mut control in controls {
            let name = field_name(&control);
            verdict
                .controls
                .push(self.test_clickable(ix, &mut control, name, false).await?);
        }

        let mut submits = ix.locate(Some(&form.handle), Role::SubmitControl, false).await?;
        if let Some(result) = checks::submit_control_count(submits.len()) {
            verdict.record(names::SUBMISSION, result);
            verdict.record(names::FEEDBACK, CheckResult::skipped("Form was not submitted"));
        } else if let Some(submit) = submits.first_mut() {
            let (submission, feedback) = ix.submit(submit).await?;
            verdict.record(names::SUBMISSION, submission);
            verdict.record(names::FEEDBACK, feedback);
        }
        Ok(verdict.finish())
    }

    async fn test_field<D>(
        &self,
        ix: &mut Interactor<'_, D>,
        field: &mut ElementRef,
    ) -> PagecheckResult<ElementVerdict>
    where
        D: PageDriver + ?Sized,
    {
        let kind = classify(&field.snapshot);
        let mut verdict =
            ElementVerdict::new(field.index, field_name(field), &field.snapshot, kind);

        let visible = recoverable(ix.is_visible(field).await)?;
        verdict.record(
            names::VISIBILITY,
            observed(&visible, |v| checks::visibility(v, &field.snapshot)),
        );
        if kind == ElementKind::Unknown {
            return Ok(verdict.finish());
        }

        verdict.record(names::NAME, checks::name_present(&field.snapshot));
        if kind.has_type_convention() {
            verdict.record(names::TYPE_MATCH, checks::type_match(&field.snapshot));
        }
        let enabled = recoverable(ix.is_enabled(field).await)?;
        verdict.record(names::INTERACTIVITY, observed(&enabled, checks::interactivity));

        let mut reason = blocked(true, &visible, &enabled);
        if reason.is_none() && kind.is_textual() && field.snapshot.has_attr("readonly") {
            reason = Some("Field is readonly");
        }

        match kind {
            _ if kind.is_textual() => match reason {
                Some(reason) => {
                    for probe in crate::boundary::matrix(kind) {
                        verdict.record(probe.check_name(), CheckResult::not_attempted(reason));
                    }
                }
                None => {
                    for (name, result) in ix.probe_boundaries(field, kind).await? {
                        verdict.record(name, result);
                    }
                }
            },
            ElementKind::Checkbox | ElementKind::Radio => {
                let result = match reason {
                    Some(reason) => CheckResult::not_attempted(reason),
                    None => ix.toggle(field).await?,
                };
                verdict.record(names::TOGGLE, result);
            }
            ElementKind::Select => {
                for (name, result) in ix.choose_options(field, reason).await? {
                    verdict.record(name, result);
                }
            }
            _ => {}
        }
        Ok(verdict.finish())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dom::StaticDriver;
    use crate::verdict::Verdict;

    fn engine() -> QaEngine {
        QaEngine::new(EngineConfig::immediate())
    }

    async fn run(html: &str) -> TestReport {
        let mut driver = StaticDriver::new();
        engine()
            .run(&mut driver, &PageSource::Html(html.into()))
            .await
            .unwrap()
    }

    mod button_tests {
        use super::*;

        #[tokio::test]
        async fn test_working_button_passes() {
            let report = run(r#"<button type="button">Go</button>"#).await;
            assert_eq!(report.buttons.len(), 1);
            assert_eq!(report.buttons[0].verdict(), Verdict::Passed);
        }

        #[tokio::test]
        async fn test_empty_button_not_clicked() {
            let report = run("<button></button>").await;
            let button = &report.buttons[0];
            assert_eq!(button.verdict(), Verdict::Failed);
            assert_eq!(
                button.check(names::CLICK).unwrap().outcome(),
                CheckOutcome::NotAttempted
            );
        }

        #[tokio::test]
        async fn test_disabled_button() {
            let report = run("<button disabled>Save</button>").await;
            let button = &report.buttons[0];
            assert_eq!(button.check(names::INTERACTIVITY).unwrap().outcome(), CheckOutcome::Failed);
            assert_eq!(button.check(names::CLICK).unwrap().result.reason, "Element is disabled");
        }
    }

    mod link_tests {
        use super::*;

        #[tokio::test]
        async fn test_missing_href() {
            let report = run("<a>Click me</a>").await;
            let link = &report.links[0];
            assert_eq!(link.check(names::HREF).unwrap().result.reason, "No href attribute");
            assert_eq!(link.check(names::CLICK).unwrap().outcome(), CheckOutcome::NotAttempted);
            assert_eq!(link.verdict(), Verdict::Failed);
        }

        #[tokio::test]
        async fn test_anchor_resolution() {
            let report =
                run(r##"<h2 id="s">S</h2><a href="#s">ok</a><a href="#nonexistent_anchor">bad</a>"##).await;
            assert_eq!(report.links[0].check(names::ANCHOR).unwrap().outcome(), CheckOutcome::Passed);
            assert_eq!(report.links[1].check(names::ANCHOR).unwrap().outcome(), CheckOutcome::Failed);
        }

        #[tokio::test]
        async fn test_click_links_disabled() {
            let engine = QaEngine::new(EngineConfig::immediate().with_click_links(false));
            let mut driver = StaticDriver::new();
            let report = engine
                .run(&mut driver, &PageSource::Html(r#"<a href="x.html">x</a>"#.into()))
                .await
                .unwrap();
            assert_eq!(report.links[0].check(names::CLICK).unwrap().outcome(), CheckOutcome::Skipped);
        }
    }

    mod form_tests {
        use super::*;

        #[tokio::test]
        async fn test_form_without_submit() {
            let report = run(r#"<form id="f"><input name="q"></form>"#).await;
            let form = &report.forms[0];
            assert_eq!(form.name, "f");
            assert_eq!(form.check(names::SUBMISSION).unwrap().result.reason, "No Submit Button");
            assert_eq!(form.check(names::FEEDBACK).unwrap().outcome(), CheckOutcome::Skipped);
            assert_eq!(form.outcome.verdict, Verdict::Failed);
        }

        #[tokio::test]
        async fn test_submit_input_is_a_control() {
            let report = run(r#"<form><input name="q"><input type="submit" value="Go"></form>"#).await;
            let form = &report.forms[0];
            assert_eq!(form.fields.len(), 1);
            assert_eq!(form.controls.len(), 1);
            assert_eq!(
                form.controls[0].check(names::CLICK).unwrap().outcome(),
                CheckOutcome::Skipped
            );
            assert_eq!(form.check(names::SUBMISSION).unwrap().outcome(), CheckOutcome::Passed);
            assert_eq!(form.outcome.verdict, Verdict::Passed);
        }

        #[tokio::test]
        async fn test_hidden_input_does_not_block_pass() {
            let report = run(
                r#"<form><input type="hidden" name="csrf" value="t"><input name="q">
                <button type="submit">Send</button></form>"#,
            )
            .await;
            let form = &report.forms[0];
            assert_eq!(form.fields[0].kind, ElementKind::Unknown);
            assert_eq!(form.fields[0].checks.len(), 1);
            assert_eq!(form.outcome.verdict, Verdict::Passed);
        }

        #[tokio::test]
        async fn test_disabled_field_rows_not_attempted() {
            let report = run(r#"<form><input name="q" disabled><button type="submit">S</button></form>"#).await;
            let field = &report.forms[0].fields[0];
            let rows: Vec<_> = field
                .checks
                .iter()
                .filter(|c| c.name.starts_with("Boundary Value"))
                .collect();
            assert_eq!(rows.len(), 4);
            assert!(rows.iter().all(|c| c.outcome() == CheckOutcome::NotAttempted));
            assert_eq!(report.forms[0].outcome.verdict, Verdict::Failed);
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_only_configured_categories_run() {
            let engine = QaEngine::new(EngineConfig::immediate().with_categories([Category::Links]));
            let mut driver = StaticDriver::new();
            let report = engine
                .run(&mut driver, &PageSource::Html("<button>b</button><a href='#'>a</a>".into()))
                .await
                .unwrap();
            assert_eq!(report.categories, vec![Category::Links]);
            assert!(report.buttons.is_empty());
            assert_eq!(report.links.len(), 1);
        }

        #[tokio::test]
        async fn test_empty_page_yields_empty_categories() {
            let report = run("<p>nothing</p>").await;
            assert_eq!(report.categories, Category::ALL.to_vec());
            assert!(report.buttons.is_empty() && report.links.is_empty() && report.forms.is_empty());
        }

        #[tokio::test]
        async fn test_closed_session_is_fatal() {
            let mut driver = StaticDriver::new();
            driver.close().await.unwrap();
            let err = engine()
                .run(&mut driver, &PageSource::Html("<a>x</a>".into()))
                .await
                .unwrap_err();
            assert!(err.is_fatal());
        }
    }
}
