//! Element locators and the in-page scripts that resolve them.
//!
//! Role, option-row and text locators cannot be expressed as a CSS selector, so the
//! driver evaluates a marking script that tags the matched element with a unique
//! attribute value and then queries that attribute.

use serde_json::Value;
use std::fmt;

pub const MARK_ATTRIBUTE: &str = "data-tenderscout-target";

/// Roles tried when a role locator names no explicit role.
const INTERACTIVE_ROLES: &[&str] = &[
    "button", "link", "menuitem", "tab", "checkbox", "radio", "option", "textbox", "combobox",
];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Accessible name, optionally restricted to one role.
    Role { role: Option<String>, name: String },
    /// Checkbox nested inside the option row carrying `name`.
    OptionCheckbox { name: String },
    /// Visible element whose text contains `content`.
    Text { content: String },
    Css(String),
    XPath(String),
}

impl Locator {
    /// Parse a role target written as `role:name` or just `name`.
    pub fn role_target(target: &str) -> Self {
        if let Some((role, name)) = target.split_once(':') {
            let role = role.trim().to_ascii_lowercase();
            if !role.is_empty() && role.chars().all(|c| c.is_ascii_alphabetic()) {
                return Locator::Role {
                    role: Some(role),
                    name: name.trim().to_string(),
                };
            }
        }
        Locator::Role {
            role: None,
            name: target.trim().to_string(),
        }
    }

    pub fn textbox(name: &str) -> Self {
        Locator::Role {
            role: Some("textbox".to_string()),
            name: name.trim().to_string(),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// Selector for an element previously tagged by a marking script.
    pub fn marked_selector(token: &str) -> String {
        format!("[{}=\"{}\"]", MARK_ATTRIBUTE, token)
    }

    /// Script that tags the matching element with `token` and returns `{found: bool}`.
    ///
    /// `None` for locators that are already selectors.
    pub fn marking_script(&self, token: &str) -> Option<String> {
        match self {
            Locator::Role { role, name } => {
                let roles: Vec<&str> = match role {
                    Some(role) => vec![role.as_str()],
                    None => INTERACTIVE_ROLES.to_vec(),
                };
                Some(role_script(&roles, name, token))
            }
            Locator::OptionCheckbox { name } => Some(option_checkbox_script(name, token)),
            Locator::Text { content } => Some(text_script(content, token)),
            Locator::Css(_) | Locator::XPath(_) => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Role {
                role: Some(role),
                name,
            } => write!(f, "role {role} named '{name}'"),
            Locator::Role { role: None, name } => write!(f, "control named '{name}'"),
            Locator::OptionCheckbox { name } => write!(f, "option row '{name}'"),
            Locator::Text { content } => write!(f, "text '{content}'"),
            Locator::Css(selector) => write!(f, "selector '{selector}'"),
            Locator::XPath(xpath) => write!(f, "xpath '{xpath}'"),
        }
    }
}

fn js_string(input: &str) -> String {
    Value::String(input.to_string()).to_string()
}

const SHARED_HELPERS: &str = r#"
            const normalize = (input) => (input || '').replace(/\s+/g, ' ').trim().toLowerCase();
            const isVisible = (el) => {
                if (!(el instanceof Element)) return false;
                const style = window.getComputedStyle(el);
                if (style.visibility === 'hidden' || style.display === 'none') return false;
                const rect = el.getBoundingClientRect();
                return rect.width > 0 || rect.height > 0 || el.getClientRects().length > 0;
            };
            const implicitRole = (el) => {
                const explicit = el.getAttribute('role');
                if (explicit) return explicit.toLowerCase();
                const tag = el.tagName.toLowerCase();
                if (tag === 'button') return 'button';
                if (tag === 'a' && el.hasAttribute('href')) return 'link';
                if (tag === 'select') return 'combobox';
                if (tag === 'textarea') return 'textbox';
                if (tag === 'option') return 'option';
                if (tag === 'input') {
                    const type = (el.getAttribute('type') || 'text').toLowerCase();
                    if (type === 'checkbox') return 'checkbox';
                    if (type === 'radio') return 'radio';
                    if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
                    if (type === 'hidden') return '';
                    return 'textbox';
                }
                return '';
            };
            const accessibleName = (el) => {
                const label = el.getAttribute('aria-label');
                if (label) return label;
                const labelledby = el.getAttribute('aria-labelledby');
                if (labelledby) {
                    return labelledby.split(/\s+/)
                        .map(id => document.getElementById(id))
                        .map(node => node ? (node.textContent || '') : '')
                        .join(' ');
                }
                if (el.id) {
                    const forLabel = document.querySelector('label[for="' + CSS.escape(el.id) + '"]');
                    if (forLabel) return forLabel.textContent || '';
                }
                const wrapping = el.closest('label');
                if (wrapping && wrapping !== el) return wrapping.textContent || '';
                if (el.getAttribute('placeholder')) return el.getAttribute('placeholder');
                if (el.title) return el.title;
                if (el.tagName.toLowerCase() === 'input') return el.value || '';
                return el.innerText || el.textContent || '';
            };"#;

fn role_script(roles: &[&str], name: &str, token: &str) -> String {
    let roles_literal = Value::from(roles.to_vec()).to_string();
    format!(
        r#"(() => {{
            const roles = {roles};
            const targetName = {name};
            const attr = {attr};
            const token = {token};
            {helpers}
            const candidates = Array.from(document.querySelectorAll('body *'))
                .filter(el => roles.includes(implicitRole(el)) && isVisible(el));
            const wanted = normalize(targetName);
            const match = candidates.find(el => normalize(accessibleName(el)) === wanted)
                || candidates.find(el => normalize(accessibleName(el)).includes(wanted));
            if (!match) return {{ found: false }};
            match.setAttribute(attr, token);
            return {{ found: true }};
        }})()"#,
        roles = roles_literal,
        name = js_string(name),
        attr = js_string(MARK_ATTRIBUTE),
        token = js_string(token),
        helpers = SHARED_HELPERS,
    )
}

fn option_checkbox_script(name: &str, token: &str) -> String {
    format!(
        r#"(() => {{
            const targetName = {name};
            const attr = {attr};
            const token = {token};
            {helpers}
            const wanted = normalize(targetName);
            const rows = Array.from(document.querySelectorAll('[role="option"], li, label, tr'))
                .filter(el => isVisible(el) && normalize(el.innerText || el.textContent).includes(wanted));
            rows.sort((a, b) => (a.innerText || '').length - (b.innerText || '').length);
            for (const row of rows) {{
                const box = row.querySelector('input[type="checkbox"], [role="checkbox"]');
                if (box) {{
                    box.setAttribute(attr, token);
                    return {{ found: true }};
                }}
            }}
            if (rows.length > 0) {{
                rows[0].setAttribute(attr, token);
                return {{ found: true }};
            }}
            return {{ found: false }};
        }})()"#,
        name = js_string(name),
        attr = js_string(MARK_ATTRIBUTE),
        token = js_string(token),
        helpers = SHARED_HELPERS,
    )
}

fn text_script(content: &str, token: &str) -> String {
    format!(
        r#"(() => {{
            const target = {content};
            const attr = {attr};
            const token = {token};
            {helpers}
            const wanted = normalize(target);
            const nodes = Array.from(document.querySelectorAll('body *'))
                .filter(el => isVisible(el) && normalize(el.innerText || el.textContent).includes(wanted));
            if (nodes.length === 0) return {{ found: false }};
            // deepest match: the element with the shortest text
            nodes.sort((a, b) => (a.innerText || '').length - (b.innerText || '').length);
            nodes[0].setAttribute(attr, token);
            return {{ found: true }};
        }})()"#,
        content = js_string(content),
        attr = js_string(MARK_ATTRIBUTE),
        token = js_string(token),
        helpers = SHARED_HELPERS,
    )
}

/// Script selecting an option of a `<select>` by value, falling back to its label.
pub(crate) fn select_option_script(selector: &str, value: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return {{ status: 'no-element' }};
            const wanted = {value};
            const options = Array.from(el.options || []);
            const option = options.find(o => o.value === wanted)
                || options.find(o => (o.label || o.textContent || '').trim() === wanted.trim());
            if (!option) return {{ status: 'no-option' }};
            el.value = option.value;
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ status: 'ok' }};
        }})()"#,
        selector = js_string(selector),
        value = js_string(value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_target_with_prefix() {
        assert_eq!(
            Locator::role_target("button: Search"),
            Locator::Role {
                role: Some("button".into()),
                name: "Search".into()
            }
        );
    }

    #[test]
    fn bare_name_spans_interactive_roles() {
        let locator = Locator::role_target("Export to Excel");
        assert_eq!(
            locator,
            Locator::Role {
                role: None,
                name: "Export to Excel".into()
            }
        );
        let script = locator.marking_script("tok").expect("script");
        assert!(script.contains("\"menuitem\""));
    }

    #[test]
    fn colon_inside_name_is_not_a_role() {
        assert_eq!(
            Locator::role_target("Deadline 12:00"),
            Locator::Role {
                role: None,
                name: "Deadline 12:00".into()
            }
        );
    }

    #[test]
    fn marking_script_escapes_names() {
        let locator = Locator::Text {
            content: "Tender \"A\" </script>".into(),
        };
        let script = locator.marking_script("tok-1").expect("script");
        assert!(script.contains(r#""Tender \"A\" </script>""#));
        assert!(script.contains("\"tok-1\""));
        assert!(Locator::css("#x").marking_script("tok").is_none());
    }

    #[test]
    fn marked_selector_uses_attribute() {
        assert_eq!(
            Locator::marked_selector("abc"),
            "[data-tenderscout-target=\"abc\"]"
        );
    }
}
