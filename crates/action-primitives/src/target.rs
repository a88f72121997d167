//! Translation of an action's `target` / `value` into locators and URLs.

use cdp_adapter::Locator;
use tenderscout_core_types::{AutomationAction, TargetKind, ValueKind};
use tracing::warn;

use crate::{errors::ActionError, types::ExecCtx};

/// Locator for clicks, using the action's `target_kind`.
pub fn click_locator(action: &AutomationAction) -> Result<Locator, ActionError> {
    let target = required_target(action)?;
    Ok(match action.target_kind {
        Some(TargetKind::Role) => Locator::role_target(target),
        Some(TargetKind::OptionRow) => Locator::OptionCheckbox {
            name: target.to_string(),
        },
        Some(TargetKind::Text) => Locator::Text {
            content: target.to_string(),
        },
        Some(TargetKind::Xpath) => Locator::XPath(target.to_string()),
        Some(TargetKind::Css) | Some(TargetKind::Page) | Some(TargetKind::Other) | None => {
            raw_selector(target)
        }
    })
}

/// Locator for text inputs: a `role` target names a textbox.
pub fn input_locator(action: &AutomationAction) -> Result<Locator, ActionError> {
    let target = required_target(action)?;
    if action.target_kind == Some(TargetKind::Role) {
        return Ok(match Locator::role_target(target) {
            Locator::Role { role: None, name } => Locator::textbox(&name),
            explicit => explicit,
        });
    }
    click_locator(action)
}

/// Locator for text extraction; `None` reads the whole page body.
pub fn text_locator(action: &AutomationAction) -> Result<Option<Locator>, ActionError> {
    if action.target_kind == Some(TargetKind::Page) {
        return Ok(None);
    }
    match action.trimmed_target() {
        None => Ok(None),
        Some("body") => Ok(None),
        Some(_) => click_locator(action).map(Some),
    }
}

/// URL a `goto` should open.
///
/// An explicit value (or target) has `{url}` / `{id}` replaced by the fan-out token.
/// Without one, a URL-kind token is opened directly, else the configuration target.
pub fn goto_url(action: &AutomationAction, ctx: &ExecCtx) -> Result<String, ActionError> {
    let explicit = action
        .value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| action.trimmed_target());

    if let Some(template) = explicit {
        return Ok(match &ctx.token {
            Some(token) => token.substitute(template),
            None => {
                if template.contains("{url}") || template.contains("{id}") {
                    warn!(
                        order = action.order,
                        template, "goto placeholder without a fan-out value"
                    );
                }
                template.to_string()
            }
        });
    }

    if let Some(token) = ctx.token.as_ref().filter(|t| t.kind == ValueKind::Url) {
        return Ok(token.value.clone());
    }

    let fallback = ctx.target_url.trim();
    if fallback.is_empty() {
        return Err(ActionError::MissingTarget(format!(
            "goto #{} has no URL and the configuration has no target_url",
            action.order
        )));
    }
    Ok(fallback.to_string())
}

fn required_target(action: &AutomationAction) -> Result<&str, ActionError> {
    action
        .trimmed_target()
        .ok_or_else(|| ActionError::MissingTarget(action.to_string()))
}

fn raw_selector(target: &str) -> Locator {
    if let Some(xpath) = target.strip_prefix("xpath=") {
        return Locator::XPath(xpath.to_string());
    }
    if target.starts_with("//") || target.starts_with("(//") {
        return Locator::XPath(target.to_string());
    }
    Locator::Css(target.strip_prefix("css=").unwrap_or(target).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderscout_core_types::{ActionKind, FanOutToken};

    fn ctx(token: Option<FanOutToken>) -> ExecCtx {
        ExecCtx::new("cfg", "step-1", "https://tenders.example/search").with_token(token)
    }

    #[test]
    fn goto_substitutes_token_into_value() {
        let action = AutomationAction::new(1, ActionKind::Goto)
            .with_value("https://tenders.example/notice/{id}");
        let url = goto_url(&action, &ctx(Some(FanOutToken::new(ValueKind::Id, "N-77")))).unwrap();
        assert_eq!(url, "https://tenders.example/notice/N-77");
    }

    #[test]
    fn goto_without_value_prefers_url_token() {
        let action = AutomationAction::new(1, ActionKind::Goto);
        let token = FanOutToken::new(ValueKind::Url, "https://other.example/a");
        assert_eq!(
            goto_url(&action, &ctx(Some(token))).unwrap(),
            "https://other.example/a"
        );
        let id_token = FanOutToken::new(ValueKind::Id, "A-1");
        assert_eq!(
            goto_url(&action, &ctx(Some(id_token))).unwrap(),
            "https://tenders.example/search"
        );
        assert_eq!(
            goto_url(&action, &ctx(None)).unwrap(),
            "https://tenders.example/search"
        );
    }

    #[test]
    fn goto_without_any_url_fails() {
        let action = AutomationAction::new(3, ActionKind::Goto);
        let ctx = ExecCtx::new("cfg", "step-1", "  ");
        assert!(matches!(
            goto_url(&action, &ctx),
            Err(ActionError::MissingTarget(_))
        ));
    }

    #[test]
    fn click_locators_follow_target_kind() {
        let option = AutomationAction::new(1, ActionKind::Click)
            .with_target("Madrid", TargetKind::OptionRow);
        assert_eq!(
            click_locator(&option).unwrap(),
            Locator::OptionCheckbox {
                name: "Madrid".into()
            }
        );

        let xpath = AutomationAction::new(2, ActionKind::Click).with_selector("//button[1]");
        assert_eq!(
            click_locator(&xpath).unwrap(),
            Locator::XPath("//button[1]".into())
        );

        let css = AutomationAction::new(3, ActionKind::Click).with_selector("#search");
        assert_eq!(click_locator(&css).unwrap(), Locator::Css("#search".into()));

        let missing = AutomationAction::new(4, ActionKind::Click);
        assert!(click_locator(&missing).is_err());
    }

    #[test]
    fn role_input_targets_textbox() {
        let action = AutomationAction::new(1, ActionKind::Type)
            .with_target("Keywords", TargetKind::Role)
            .with_value("roads");
        assert_eq!(input_locator(&action).unwrap(), Locator::textbox("Keywords"));
    }

    #[test]
    fn page_text_reads_body() {
        let action = AutomationAction::new(1, ActionKind::ExtractText)
            .with_target("anything", TargetKind::Page);
        assert_eq!(text_locator(&action).unwrap(), None);
        let bare = AutomationAction::new(2, ActionKind::ExtractText);
        assert_eq!(text_locator(&bare).unwrap(), None);
    }
}
