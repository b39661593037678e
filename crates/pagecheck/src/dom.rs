//! StaticDriver - in-process page driver over a parsed HTML document.
//!
//! The driver keeps the document as markup and parses it with `scraper` on
//! each call; form-control state (values, checked flags, selections) lives
//! beside it, keyed by the element's position in the tree. No JavaScript
//! runs. The form semantics that matter to the engine are emulated:
//!
//! - visibility from `hidden`, inline `display`/`visibility`/zero size, on
//!   the element or any ancestor
//! - disabled controls, including `fieldset[disabled]` descendants
//! - value sanitisation for `number` and `email` inputs, `maxlength`
//! - checkbox toggling, radio groups, select state
//! - link clicks and form submission navigate to registered routes; an
//!   unregistered destination loads an empty document
//!
//! A URL source with no registered document is fetched over HTTP once per
//! session (feature `http`) and cached as a route, so reloads reuse it.

use crate::boundary::{is_numeric, is_valid_email};
use crate::driver::{ElementHandle, ElementSnapshot, PageDriver, PageSource, ReadyState};
use crate::result::{PagecheckError, PagecheckResult};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// URL given to inline documents unless configured otherwise
pub const BLANK_URL: &str = "about:blank";

/// Default bound on fetching a URL source
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const NOT_FOUND_DOCUMENT: &str = "<!DOCTYPE html><html><head><title>Not Found</title></head><body></body></html>";

const UNFILLABLE_TYPES: [&str; 10] = [
    "checkbox", "radio", "submit", "button", "reset", "file", "image", "hidden", "range", "color",
];

#[derive(Debug, Clone, Default)]
struct ControlState {
    value: Option<String>,
    checked: Option<bool>,
    selected: Option<usize>,
}

/// What a click does to the session
#[derive(Debug, Clone, PartialEq, Eq)]
enum ClickEffect {
    None,
    Toggle(usize),
    Check { target: usize, group: Vec<usize> },
    Navigate(String),
    Reload,
    Reset(Vec<usize>),
}

/// In-process [`PageDriver`] backed by `scraper`
#[derive(Debug, Clone)]
pub struct StaticDriver {
    html: String,
    url: String,
    base_url: String,
    routes: HashMap<String, String>,
    controls: HashMap<usize, ControlState>,
    fetch: bool,
    fetch_timeout: Duration,
    closed: bool,
}

impl Default for StaticDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticDriver {
    /// Create a driver with an empty document
    #[must_use]
    pub fn new() -> Self {
        Self {
            html: String::new(),
            url: BLANK_URL.to_string(),
            base_url: BLANK_URL.to_string(),
            routes: HashMap::new(),
            controls: HashMap::new(),
            fetch: cfg!(feature = "http"),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            closed: false,
        }
    }

    /// URL assigned to inline documents, used to resolve relative links
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Register a document served at `url`
    #[must_use]
    pub fn with_route(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.routes.insert(url.into(), html.into());
        self
    }

    /// Fetch unregistered URL sources over HTTP; needs the `http` feature
    #[must_use]
    pub const fn with_fetch(mut self, fetch: bool) -> Self {
        self.fetch = fetch;
        self
    }

    /// Bound on fetching a URL source
    #[must_use]
    pub const fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Whether [`PageDriver::close`] was called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> PagecheckResult<()> {
        if self.closed {
            Err(PagecheckError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn replace_document(&mut self, url: String, html: String) {
        debug!(url = %url, bytes = html.len(), "document replaced");
        self.url = url;
        self.html = html;
        self.controls.clear();
    }

    fn navigate(&mut self, target: &str) {
        let resolved = resolve_url(&self.url, target);
        let html = self
            .routes
            .get(&resolved)
            .or_else(|| self.routes.get(target))
            .cloned()
            .unwrap_or_else(|| NOT_FOUND_DOCUMENT.to_string());
        self.replace_document(resolved, html);
    }

    fn state(&self, position: usize) -> Option<&ControlState> {
        self.controls.get(&position)
    }

    fn state_mut(&mut self, position: usize) -> &mut ControlState {
        self.controls.entry(position).or_default()
    }

    fn current_value(&self, doc: &Html, el: ElementRef<'_>) -> String {
        let element = el.value();
        match element.name() {
            "input" => {
                if let Some(value) = self.state(position(doc, el)).and_then(|s| s.value.clone()) {
                    return value;
                }
                let input_type = input_type(el);
                let default = element.attr("value").unwrap_or_default();
                match input_type.as_str() {
                    "checkbox" | "radio" => element.attr("value").unwrap_or("on").to_string(),
                    _ => sanitize(&input_type, &default.replace(['\r', '\n'], "")),
                }
            }
            "textarea" => self
                .state(position(doc, el))
                .and_then(|s| s.value.clone())
                .unwrap_or_else(|| el.text().collect()),
            "select" => {
                let options = options_of(el);
                self.selected_index(doc, el, &options)
                    .and_then(|i| options.get(i).copied())
                    .map(option_value)
                    .unwrap_or_default()
            }
            _ => String::new(),
        }
    }

    fn selected_index(
        &self,
        doc: &Html,
        select: ElementRef<'_>,
        options: &[ElementRef<'_>],
    ) -> Option<usize> {
        if let Some(index) = self.state(position(doc, select)).and_then(|s| s.selected) {
            return Some(index);
        }
        options
            .iter()
            .rposition(|o| o.value().attr("selected").is_some())
            .or_else(|| (!options.is_empty() && select.value().attr("multiple").is_none()).then_some(0))
    }

    fn checked(&self, doc: &Html, el: ElementRef<'_>) -> bool {
        self.state(position(doc, el))
            .and_then(|s| s.checked)
            .unwrap_or_else(|| el.value().attr("checked").is_some())
    }

    fn click_effect(&self, doc: &Html, el: ElementRef<'_>) -> PagecheckResult<ClickEffect> {
        if !is_rendered(el) {
            return Err(PagecheckError::not_interactable("element is not visible"));
        }
        if !is_enabled(el) {
            return Err(PagecheckError::not_interactable("element is disabled"));
        }
        let element = el.value();
        let effect = match element.name() {
            "a" => match element.attr("href") {
                Some(href) if is_navigational(href) && element.attr("target") != Some("_blank") => {
                    ClickEffect::Navigate(href.trim().to_string())
                }
                _ => ClickEffect::None,
            },
            "input" => match input_type(el).as_str() {
                "checkbox" => ClickEffect::Toggle(position(doc, el)),
                "radio" => ClickEffect::Check {
                    target: position(doc, el),
                    group: radio_group(doc, el),
                },
                "submit" | "image" => submission(el),
                "reset" => ClickEffect::Reset(form_controls(doc, el)),
                _ => ClickEffect::None,
            },
            "button" => match element.attr("type").map(|t| t.trim().to_ascii_lowercase()) {
                None => submission(el),
                Some(t) if t == "submit" => submission(el),
                Some(t) if t == "reset" => ClickEffect::Reset(form_controls(doc, el)),
                Some(_) => ClickEffect::None,
            },
            _ => ClickEffect::None,
        };
        Ok(effect)
    }

    fn fill_value(&self, el: ElementRef<'_>, value: &str) -> PagecheckResult<String> {
        let element = el.value();
        let tag = element.name();
        if tag != "input" && tag != "textarea" {
            return Err(PagecheckError::not_interactable(format!(
                "<{tag}> is not an <input> or <textarea>"
            )));
        }
        let input_type = if tag == "input" {
            input_type(el)
        } else {
            String::new()
        };
        if UNFILLABLE_TYPES.contains(&input_type.as_str()) {
            return Err(PagecheckError::not_interactable(format!(
                "input of type \"{input_type}\" cannot be filled"
            )));
        }
        if !is_rendered(el) {
            return Err(PagecheckError::not_interactable("element is not visible"));
        }
        if !is_enabled(el) {
            return Err(PagecheckError::not_interactable("element is disabled"));
        }
        if element.attr("readonly").is_some() {
            return Err(PagecheckError::not_interactable("element is readonly"));
        }

        let mut committed = if tag == "input" {
            value.replace(['\r', '\n'], "")
        } else {
            value.to_string()
        };
        if input_type != "number" {
            if let Some(max) = element
                .attr("maxlength")
                .and_then(|m| m.trim().parse::<usize>().ok())
            {
                committed = committed.chars().take(max).collect();
            }
        }
        Ok(sanitize(&input_type, &committed))
    }
}

fn parse_selector(selector: &str) -> PagecheckResult<Selector> {
    Selector::parse(selector).map_err(|e| PagecheckError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{e:?}"),
    })
}

/// Walk a handle's steps from the document root
fn resolve<'a>(doc: &'a Html, handle: &ElementHandle) -> PagecheckResult<ElementRef<'a>> {
    let mut current: Option<ElementRef<'a>> = None;
    for step in handle.steps() {
        let selector = parse_selector(&step.selector)?;
        let found = match current {
            Some(scope) => scope.select(&selector).nth(step.index),
            None => doc.select(&selector).nth(step.index),
        };
        current = Some(found.ok_or_else(|| PagecheckError::stale(&step.selector, step.index))?);
    }
    current.ok_or_else(|| PagecheckError::page("element handle has no steps"))
}

/// Stable position of an element in the parsed tree
fn position(doc: &Html, el: ElementRef<'_>) -> usize {
    doc.tree
        .root()
        .descendants()
        .position(|node| node.id() == el.id())
        .unwrap_or(usize::MAX)
}

fn ancestors_and_self(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::once(el).chain(el.ancestors().filter_map(ElementRef::wrap))
}

fn input_type(el: ElementRef<'_>) -> String {
    el.value()
        .attr("type")
        .map_or_else(|| "text".to_string(), |t| t.trim().to_ascii_lowercase())
}

fn style_properties(el: ElementRef<'_>) -> Vec<(String, String)> {
    el.value()
        .attr("style")
        .unwrap_or_default()
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            Some((
                name.trim().to_ascii_lowercase(),
                value
                    .trim()
                    .trim_end_matches("!important")
                    .trim()
                    .to_ascii_lowercase(),
            ))
        })
        .collect()
}

fn hides_subtree(el: ElementRef<'_>) -> bool {
    let element = el.value();
    if element.attr("hidden").is_some() {
        return true;
    }
    if matches!(
        element.name(),
        "head" | "script" | "style" | "template" | "noscript" | "title"
    ) {
        return true;
    }
    style_properties(el).iter().any(|(name, value)| {
        (name == "display" && value == "none")
            || (name == "visibility" && (value == "hidden" || value == "collapse"))
    })
}

fn zero_sized(el: ElementRef<'_>) -> bool {
    let collapsed = style_properties(el).iter().any(|(name, value)| {
        (name == "width" || name == "height") && matches!(value.as_str(), "0" | "0px")
    });
    if collapsed {
        return true;
    }
    let element = el.value();
    if element.name() == "input" && input_type(el) == "hidden" {
        return true;
    }
    // An empty inline anchor has no box.
    element.name() == "a"
        && el.text().all(|t| t.trim().is_empty())
        && el.children().filter_map(ElementRef::wrap).next().is_none()
}

fn is_rendered(el: ElementRef<'_>) -> bool {
    !zero_sized(el) && !ancestors_and_self(el).any(hides_subtree)
}

fn is_enabled(el: ElementRef<'_>) -> bool {
    let element = el.value();
    if element
        .attr("aria-disabled")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return false;
    }
    let disableable = matches!(
        element.name(),
        "button" | "input" | "select" | "textarea" | "option" | "optgroup" | "fieldset"
    );
    if !disableable {
        return true;
    }
    if element.attr("disabled").is_some() {
        return false;
    }
    el.ancestors().filter_map(ElementRef::wrap).all(|ancestor| {
        let a = ancestor.value();
        let blocks = match a.name() {
            "fieldset" => a.attr("disabled").is_some(),
            "optgroup" => element.name() == "option" && a.attr("disabled").is_some(),
            _ => false,
        };
        !blocks
    })
}

fn owning_form(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "form")
}

fn options_of(select: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    select
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "option")
        .collect()
}

fn option_value(option: ElementRef<'_>) -> String {
    option.value().attr("value").map_or_else(
        || crate::driver::collapse_whitespace(&option.text().collect::<String>()),
        str::to_string,
    )
}

fn radio_group(doc: &Html, el: ElementRef<'_>) -> Vec<usize> {
    let Some(name) = el.value().attr("name") else {
        return Vec::new();
    };
    let form = owning_form(el).map(|f| f.id());
    let Ok(selector) = Selector::parse("input") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter(|other| {
            input_type(*other) == "radio"
                && other.value().attr("name") == Some(name)
                && owning_form(*other).map(|f| f.id()) == form
        })
        .map(|other| position(doc, other))
        .collect()
}

fn form_controls(doc: &Html, el: ElementRef<'_>) -> Vec<usize> {
    let Some(form) = owning_form(el) else {
        return Vec::new();
    };
    form.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "input" | "select" | "textarea"))
        .map(|e| position(doc, e))
        .collect()
}

fn submission(el: ElementRef<'_>) -> ClickEffect {
    let Some(form) = owning_form(el) else {
        return ClickEffect::None;
    };
    let action = el
        .value()
        .attr("formaction")
        .or_else(|| form.value().attr("action"))
        .map(str::trim)
        .filter(|a| !a.is_empty());
    match action {
        Some(action) if action.starts_with("javascript:") => ClickEffect::None,
        Some(action) => ClickEffect::Navigate(action.to_string()),
        None => ClickEffect::Reload,
    }
}

fn is_navigational(href: &str) -> bool {
    let href = href.trim().to_ascii_lowercase();
    !(href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:"))
}

/// Resolve `target` against `base`; unresolvable targets are returned as is
fn resolve_url(base: &str, target: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(target)) {
        Ok(url) => url.to_string(),
        Err(_) => target.to_string(),
    }
}

/// Value sanitisation applied by `<input>` on assignment
fn sanitize(input_type: &str, value: &str) -> String {
    match input_type {
        "number" => {
            if is_numeric(value) {
                value.to_string()
            } else {
                String::new()
            }
        }
        "email" | "url" => value.trim().to_string(),
        _ => value.to_string(),
    }
}

fn validity(el: ElementRef<'_>, value: &str) -> bool {
    let element = el.value();
    if value.is_empty() {
        return element.attr("required").is_none();
    }
    match (element.name(), input_type(el).as_str()) {
        ("input", "email") => {
            if element.attr("multiple").is_some() {
                value.split(',').all(|part| is_valid_email(part.trim()))
            } else {
                is_valid_email(value)
            }
        }
        ("input", "url") => Url::parse(value).is_ok(),
        _ => true,
    }
}

fn snapshot_of(el: ElementRef<'_>) -> ElementSnapshot {
    let element = el.value();
    ElementSnapshot {
        tag: element.name().to_ascii_lowercase(),
        attributes: element
            .attrs()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect(),
        text: el.text().collect(),
        outer_html: el.html(),
        in_form: owning_form(el).is_some(),
    }
}

/// GET `url`; returns the final URL after redirects and the body
#[cfg(feature = "http")]
async fn fetch_document(url: &str, timeout: Duration) -> PagecheckResult<(String, String)> {
    let failed = |message: String| PagecheckError::NavigationError {
        url: url.to_string(),
        message,
    };
    let client = reqwest::Client::builder()
        .user_agent(concat!("pagecheck/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| failed(e.to_string()))?;
    let response = client.get(url).send().await.map_err(|e| failed(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("HTTP status {}", status.as_u16())));
    }
    let final_url = response.url().to_string();
    let html = response.text().await.map_err(|e| failed(e.to_string()))?;
    debug!(url, final_url = %final_url, status = status.as_u16(), "fetched source");
    Ok((final_url, html))
}

#[cfg(not(feature = "http"))]
async fn fetch_document(url: &str, _timeout: Duration) -> PagecheckResult<(String, String)> {
    Err(PagecheckError::NavigationError {
        url: url.to_string(),
        message: "fetching URL sources needs the http feature".to_string(),
    })
}

#[async_trait]
impl PageDriver for StaticDriver {
    async fn load(&mut self, source: &PageSource) -> PagecheckResult<()> {
        self.ensure_open()?;
        match source {
            PageSource::Html(html) => {
                let url = self.base_url.clone();
                self.replace_document(url, html.clone());
                Ok(())
            }
            PageSource::Url(url) => {
                if let Some(html) = self.routes.get(url).cloned() {
                    self.replace_document(url.clone(), html);
                    return Ok(());
                }
                if !self.fetch {
                    return Err(PagecheckError::NavigationError {
                        url: url.clone(),
                        message: "no document registered for this URL".to_string(),
                    });
                }
                let (final_url, html) = fetch_document(url, self.fetch_timeout).await?;
                self.routes.insert(url.clone(), html.clone());
                self.replace_document(final_url, html);
                Ok(())
            }
        }
    }

    async fn current_url(&mut self) -> PagecheckResult<String> {
        self.ensure_open()?;
        Ok(self.url.clone())
    }

    async fn query_all(
        &mut self,
        scope: Option<&ElementHandle>,
        selector: &str,
    ) -> PagecheckResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        let doc = Html::parse_document(&self.html);
        let parsed = parse_selector(selector)?;
        let handles = match scope {
            Some(scope_handle) => {
                let root = resolve(&doc, scope_handle)?;
                (0..root.select(&parsed).count())
                    .map(|i| scope_handle.child(selector, i))
                    .collect()
            }
            None => (0..doc.select(&parsed).count())
                .map(|i| ElementHandle::root(selector, i))
                .collect(),
        };
        Ok(handles)
    }

    async fn snapshot(&mut self, element: &ElementHandle) -> PagecheckResult<ElementSnapshot> {
        self.ensure_open()?;
        let doc = Html::parse_document(&self.html);
        Ok(snapshot_of(resolve(&doc, element)?))
    }

    async fn is_visible(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
        self.ensure_open()?;
        let doc = Html::parse_document(&self.html);
        Ok(is_rendered(resolve(&doc, element)?))
    }

    async fn is_enabled(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
        self.ensure_open()?;
        let doc = Html::parse_document(&self.html);
        Ok(is_enabled(resolve(&doc, element)?))
    }

    async fn is_checked(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
        self.ensure_open()?;
        let doc = Html::parse_document(&self.html);
        let el = resolve(&doc, element)?;
        let checkable = el.value().name() == "input"
            && matches!(input_type(el).as_str(), "checkbox" | "radio");
        Ok(checkable && self.checked(&doc, el))
    }

    async fn value(&mut self, element: &ElementHandle) -> PagecheckResult<String> {
        self.ensure_open()?;
        let doc = Html::parse_document(&self.html);
        let el = resolve(&doc, element)?;
        Ok(self.current_value(&doc, el))
    }

    async fn is_valid(&mut self, element: &ElementHandle) -> PagecheckResult<bool> {
        self.ensure_open()?;
        let doc = Html::parse_document(&self.html);
        let el = resolve(&doc, element)?;
        let value = self.current_value(&doc, el);
        Ok(validity(el, &value))
    }

    async fn click(&mut self, element: &ElementHandle) -> PagecheckResult<()> {
        self.ensure_open()?;
        let effect = {
            let doc = Html::parse_document(&self.html);
            let el = resolve(&doc, element)?;
            match self.click_effect(&doc, el)? {
                ClickEffect::Toggle(target) => {
                    let now = !self.checked(&doc, el);
                    self.state_mut(target).checked = Some(now);
                    ClickEffect::None
                }
                other => other,
            }
        };
        debug!(element = %element, effect = ?effect, "click");
        match effect {
            ClickEffect::None | ClickEffect::Toggle(_) => {}
            ClickEffect::Check { target, group } => {
                for member in group {
                    self.state_mut(member).checked = Some(false);
                }
                self.state_mut(target).checked = Some(true);
            }
            ClickEffect::Reset(controls) => {
                for control in controls {
                    self.controls.remove(&control);
                }
            }
            ClickEffect::Navigate(target) => self.navigate(&target),
            ClickEffect::Reload => self.controls.clear(),
        }
        Ok(())
    }

    async fn fill(&mut self, element: &ElementHandle, value: &str) -> PagecheckResult<()> {
        self.ensure_open()?;
        let (target, committed) = {
            let doc = Html::parse_document(&self.html);
            let el = resolve(&doc, element)?;
            (position(&doc, el), self.fill_value(el, value)?)
        };
        self.state_mut(target).value = Some(committed);
        Ok(())
    }

    async fn select_option(
        &mut self,
        element: &ElementHandle,
        option_index: usize,
    ) -> PagecheckResult<()> {
        self.ensure_open()?;
        let target = {
            let doc = Html::parse_document(&self.html);
            let el = resolve(&doc, element)?;
            if el.value().name() != "select" {
                return Err(PagecheckError::not_interactable(
                    "element is not a <select> element",
                ));
            }
            if !is_enabled(el) {
                return Err(PagecheckError::not_interactable("element is disabled"));
            }
            let options = options_of(el);
            let option = options.get(option_index).ok_or_else(|| {
                PagecheckError::not_interactable(format!("no option at index {option_index}"))
            })?;
            if !is_enabled(*option) {
                return Err(PagecheckError::not_interactable("option is disabled"));
            }
            position(&doc, el)
        };
        self.state_mut(target).selected = Some(option_index);
        Ok(())
    }

    async fn ready_state(&mut self) -> PagecheckResult<ReadyState> {
        self.ensure_open()?;
        Ok(ReadyState::Complete)
    }

    async fn close(&mut self) -> PagecheckResult<()> {
        self.closed = true;
        self.controls.clear();
        Ok(())
    }
}
