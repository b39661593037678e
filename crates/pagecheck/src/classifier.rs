//! Element classification.
//!
//! [`classify`] maps a discovery snapshot to an [`ElementKind`] using the
//! `type` attribute first and the tag name second. Naming conventions
//! (`name`/`id` containing "email", "password", ...) never change the
//! kind; [`type_mismatch`] reports them separately.

use crate::driver::ElementSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic kind of an interactive element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// `<button>`, `input[type=button|reset]`, `[role=button]`
    Button,
    /// `<a>`
    Link,
    /// Free text input (`text`, `search`, `tel`, `url`)
    TextInput,
    /// `input[type=password]`
    PasswordInput,
    /// `input[type=email]`
    EmailInput,
    /// `input[type=number]`
    NumberInput,
    /// `input[type=checkbox]`
    Checkbox,
    /// `input[type=radio]`
    Radio,
    /// `<select>`
    Select,
    /// `<textarea>`
    TextArea,
    /// `input[type=submit|image]`, `button[type=submit]`
    SubmitControl,
    /// Anything else
    Unknown,
}

impl ElementKind {
    /// Driven through the boundary-value matrix
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(
            self,
            Self::TextInput
                | Self::PasswordInput
                | Self::EmailInput
                | Self::NumberInput
                | Self::TextArea
        )
    }

    /// Exercised with a click
    #[must_use]
    pub const fn is_clickable(self) -> bool {
        matches!(self, Self::Button | Self::SubmitControl | Self::Link)
    }

    /// Subject to the name/type convention check
    #[must_use]
    pub const fn has_type_convention(self) -> bool {
        matches!(
            self,
            Self::TextInput | Self::PasswordInput | Self::EmailInput | Self::NumberInput
        )
    }

    /// Human label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
            Self::TextInput => "text input",
            Self::PasswordInput => "password input",
            Self::EmailInput => "email input",
            Self::NumberInput => "number input",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio button",
            Self::Select => "select",
            Self::TextArea => "textarea",
            Self::SubmitControl => "submit control",
            Self::Unknown => "unknown element",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a snapshot
#[must_use]
pub fn classify(snapshot: &ElementSnapshot) -> ElementKind {
    match snapshot.tag.as_str() {
        "input" => {
            let input_type = snapshot.input_type().unwrap_or_default();
            match input_type.as_str() {
                "text" | "search" | "tel" | "url" => ElementKind::TextInput,
                "password" => ElementKind::PasswordInput,
                "email" => ElementKind::EmailInput,
                "number" => ElementKind::NumberInput,
                "checkbox" => ElementKind::Checkbox,
                "radio" => ElementKind::Radio,
                "submit" | "image" => ElementKind::SubmitControl,
                "button" | "reset" => ElementKind::Button,
                _ => ElementKind::Unknown,
            }
        }
        "button" => match snapshot.input_type().as_deref() {
            Some("submit") => ElementKind::SubmitControl,
            _ => ElementKind::Button,
        },
        "textarea" => ElementKind::TextArea,
        "select" => ElementKind::Select,
        "a" => ElementKind::Link,
        _ if snapshot
            .attr("role")
            .is_some_and(|r| r.trim().eq_ignore_ascii_case("button")) =>
        {
            ElementKind::Button
        }
        _ => ElementKind::Unknown,
    }
}

/// Semantic hint carried by a field's `name` or `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameHint {
    /// "password", "passwd"
    Password,
    /// "email", "e-mail"
    Email,
    /// "phone", "mobile"
    Phone,
    /// "card", "ccnum"
    Card,
    /// "date", "dob", "birthday"
    Date,
}

impl NameHint {
    const RULES: [(Self, &'static [&'static str]); 5] = [
        (Self::Password, &["password", "passwd"]),
        (Self::Email, &["email", "e-mail"]),
        (Self::Phone, &["phone", "mobile"]),
        (Self::Card, &["card", "ccnum"]),
        (Self::Date, &["date", "dob", "birthday"]),
    ];

    /// First hint whose keyword appears in `name` or `id`
    #[must_use]
    pub fn detect(snapshot: &ElementSnapshot) -> Option<Self> {
        let haystack = [snapshot.attr("name"), snapshot.attr("id")]
            .into_iter()
            .flatten()
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        if haystack.is_empty() {
            return None;
        }
        Self::RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
            .map(|(hint, _)| *hint)
    }

    /// Whether the field's actual attributes honour the hint
    #[must_use]
    pub fn accepts(self, snapshot: &ElementSnapshot) -> bool {
        let input_type = snapshot.input_type().unwrap_or_default();
        match self {
            Self::Password => input_type == "password",
            Self::Email => input_type == "email",
            Self::Phone => matches!(input_type.as_str(), "tel" | "number"),
            Self::Card => {
                matches!(input_type.as_str(), "number" | "tel")
                    || snapshot
                        .attr("inputmode")
                        .is_some_and(|m| m.eq_ignore_ascii_case("numeric"))
            }
            Self::Date => matches!(input_type.as_str(), "date" | "datetime-local" | "month"),
        }
    }

    /// What the hint expects, for reasons
    #[must_use]
    pub const fn expectation(self) -> &'static str {
        match self {
            Self::Password => "type=\"password\"",
            Self::Email => "type=\"email\"",
            Self::Phone => "type=\"tel\"",
            Self::Card => "a numeric type or inputmode=\"numeric\"",
            Self::Date => "type=\"date\"",
        }
    }

    /// Keyword family, for reasons
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Card => "card",
            Self::Date => "date",
        }
    }
}

/// Reason text when a field's naming disagrees with its type
#[must_use]
pub fn type_mismatch(snapshot: &ElementSnapshot) -> Option<String> {
    let hint = NameHint::detect(snapshot)?;
    if hint.accepts(snapshot) {
        return None;
    }
    let declared = snapshot
        .attr("name")
        .or_else(|| snapshot.attr("id"))
        .unwrap_or_default();
    let actual = snapshot.input_type().unwrap_or_else(|| snapshot.tag.clone());
    Some(format!(
        "Field \"{declared}\" looks like a {} field and should use {}, but has type=\"{actual}\"",
        hint.keyword(),
        hint.expectation()
    ))
}
