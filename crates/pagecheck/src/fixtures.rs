//! Bug-fixture catalog.
//!
//! Families of deliberately broken HTML snippets. [`compose`] joins one
//! variant per requested family into a page the engine can be pointed at;
//! each family documents which category of test it should trip.

use crate::report::Category;
use serde::Serialize;

/// A family of snippets sharing one defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BugFamily {
    /// Lookup key, e.g. "broken_link"
    pub key: &'static str,
    /// Category whose tests should flag it; `None` for page-level defects
    pub category: Option<Category>,
    /// One-line description
    pub description: &'static str,
    /// Snippet variants
    pub variants: &'static [&'static str],
}

impl BugFamily {
    /// Variant at `index` modulo the family size
    #[must_use]
    pub fn variant(&self, index: usize) -> &'static str {
        self.variants[index % self.variants.len()]
    }
}

const DROPDOWN_FORM: &str = r#"<form id="Buggy Form">
    <label>Choose a car:</label>
    <select id="cars" name="">
        <option value="volvo">Volvo</option>
        <option value="saab">Saab</option>
        <option value="fiat" disabled>Fiat</option>
        <option value="audi">Audi</option>
    </select>
</form>"#;

const INPUTS_BUTTONS_FORM: &str = r#"<form id="buggyForm">
    <label for="name">Name:</label>
    <input type="text" id="name" name="name"><br><br>
    <label for="email">Email:</label>
    <input type="email" id="email" name="email">
    <button type="button" onclick="checkEmail()">Check Email</button><br><br>
    <label for="password">Password:</label>
    <input type="password" id="password" name="password"><br><br>
    <label for="confirm_password">Confirm Password:</label>
    <input type="password" id="confirm_password">
    <button type="button" onclick="checkPasswords()">Check Passwords</button><br><br>
</form>"#;

const COMBINED_FORM: &str = r#"<form id="buggyForm">
    <label for="name">Name:</label>
    <input type="text" id="name" name="name"><br><br>
    <label for="email">Email:</label>
    <input type="email" id="email" name="email">
    <button type="button" onclick="checkEmail()">Check Email</button><br><br>
    <label for="password">Password:</label>
    <input type="password" id="password" name="password"><br><br>
    <label for="confirm_password">Confirm Password:</label>
    <input type="password" id="confirm_password">
    <button type="button" onclick="checkPasswords()">Check Passwords</button><br><br>
    <label for="dropdown">Choose an option:</label>
    <select id="dropdown" name="dropdown">
        <option value="">Please select</option>
        <option>Option1</option>
        <option value="option2">Option 2</option>
    </select>
    <button type="button" onclick="checkDropdown()">Check Dropdown</button><br><br>
    <label>Choose a car:</label>
    <select id="cars" name="">
        <option value="volvo">Volvo</option>
        <option value="saab">Saab</option>
        <option value="fiat" disabled>Fiat</option>
        <option value="audi">Audi</option>
    </select>
    <button type="button" onclick="checkCarSelection()">Check Car</button><br><br>
    <label for="subscribe">Subscribe to newsletter:</label>
    <input type="checkbox" id="subscribe" name="subscribe"><br><br>
    <input type="submit" value="Submit">
</form>"#;

const NON_FUNCTIONAL_TABS: &str = r##"<ul>
    <li><a href="#">Home</a></li>
    <li><a href="#">Contact</a></li>
    <li><a href="#">About Us</a></li>
</ul>"##;

/// Every family, in listing order
pub static CATALOG: &[BugFamily] = &[
    BugFamily {
        key: "broken_link",
        category: Some(Category::Links),
        description: "Link to a resource that does not exist",
        variants: &[
            r#"<a href="nonexistent.html">Broken Link</a>"#,
            r#"<a href="404.html">Another Broken Link</a>"#,
        ],
    },
    BugFamily {
        key: "non_visible_link",
        category: Some(Category::Links),
        description: "Link hidden with CSS",
        variants: &[
            r#"<a href="https://n12.com" style="display:none;">Invisible Link</a>"#,
            r#"<a href="https://n12.com" style="visibility:hidden;">Another Invisible Link</a>"#,
        ],
    },
    BugFamily {
        key: "no_href_link",
        category: Some(Category::Links),
        description: "Anchor without a usable href",
        variants: &[r#"<a>Link Without Href</a>"#, r#"<a href="">Empty Href Link</a>"#],
    },
    BugFamily {
        key: "incorrect_anchor_link",
        category: Some(Category::Links),
        description: "In-page anchor whose target does not exist",
        variants: &[r##"<a href="#nonexistent_anchor">Broken Anchor</a>"##],
    },
    BugFamily {
        key: "javascript_link",
        category: Some(Category::Links),
        description: "javascript: pseudo-link with no destination",
        variants: &[r#"<a href="javascript:void(0);">JavaScript Link</a>"#],
    },
    BugFamily {
        key: "non_functional_tabs",
        category: Some(Category::Links),
        description: "Navigation tabs that all point at \"#\"",
        variants: &[NON_FUNCTIONAL_TABS],
    },
    BugFamily {
        key: "empty_button",
        category: Some(Category::Buttons),
        description: "Button with no text, title or value",
        variants: &[r#"<button></button>"#, r#"<input type="button">"#],
    },
    BugFamily {
        key: "hidden_button",
        category: Some(Category::Buttons),
        description: "Button hidden with CSS",
        variants: &[
            r#"<button style="display:none;">Hidden Button</button>"#,
            r#"<button style="visibility:hidden;">Invisible Button</button>"#,
        ],
    },
    BugFamily {
        key: "disabled_button",
        category: Some(Category::Buttons),
        description: "Button that cannot be interacted with",
        variants: &[
            r#"<button disabled>Disabled Button</button>"#,
            r#"<div role="button" aria-disabled="true">Fake Button</div>"#,
        ],
    },
    BugFamily {
        key: "submit_button_no_action",
        category: Some(Category::Forms),
        description: "Form whose only button does not submit",
        variants: &[
            r#"<form><button type="button">Submit</button></form>"#,
            r#"<form><input type="button" value="Submit"></form>"#,
        ],
    },
    BugFamily {
        key: "dropdown_selection",
        category: Some(Category::Forms),
        description: "Unnamed select with a disabled option",
        variants: &[DROPDOWN_FORM],
    },
    BugFamily {
        key: "inputs_buttons",
        category: Some(Category::Forms),
        description: "Form with an unnamed field and no submit control",
        variants: &[INPUTS_BUTTONS_FORM],
    },
    BugFamily {
        key: "combined_form",
        category: Some(Category::Forms),
        description: "Form combining naming, option and select defects",
        variants: &[COMBINED_FORM],
    },
    BugFamily {
        key: "missing_alt",
        category: None,
        description: "Image without alt text",
        variants: &[r#"<img src="image.jpg">"#, r#"<img src="photo.png">"#],
    },
    BugFamily {
        key: "missing_doctype",
        category: None,
        description: "Document without a DOCTYPE",
        variants: &[
            "<html><head><title>Test</title></head><body></body></html>",
            "<html><body><p>Content without DOCTYPE</p></body></html>",
        ],
    },
];

/// Look up a family by key
#[must_use]
pub fn family(key: &str) -> Option<&'static BugFamily> {
    CATALOG.iter().find(|f| f.key == key.trim())
}

/// A composed buggy page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    /// Joined snippets
    pub html: String,
    /// Families included, in request order
    pub bugs: Vec<String>,
    /// Requested keys with no family
    pub unknown: Vec<String>,
}

/// Join one variant of each known family, skipping unknown keys
pub fn compose<I, S>(keys: I, variant: usize) -> Fixture
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut snippets = Vec::new();
    let mut bugs = Vec::new();
    let mut unknown = Vec::new();
    for key in keys {
        let key = key.as_ref();
        match family(key) {
            Some(found) => {
                snippets.push(found.variant(variant));
                bugs.push(found.key.to_string());
            }
            None => unknown.push(key.to_string()),
        }
    }
    Fixture {
        html: snippets.join("\n"),
        bugs,
        unknown,
    }
}
