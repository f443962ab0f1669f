//! Typed browser actions.
//!
//! Tool calls arrive as a name plus a JSON argument map. [`BrowserAction::parse`]
//! turns that pair into a validated action before anything touches the page.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;

pub const CLICK_ELEMENT: &str = "click_element";
pub const TYPE_TEXT: &str = "type_text";
pub const NAVIGATE_TO_URL: &str = "navigate_to_url";
pub const SCROLL_PAGE: &str = "scroll_page";
pub const GET_ELEMENT_TEXT: &str = "get_element_text";
pub const WAIT_FOR_ELEMENT: &str = "wait_for_element";
pub const PRESS_KEY: &str = "press_key";
pub const WAIT_FOR_NAVIGATION: &str = "wait_for_navigation";
pub const CLOSE_POPUP_IF_PRESENT: &str = "close_popup_if_present";

pub const DEFAULT_SCROLL_PIXELS: u64 = 500;
pub const DEFAULT_ELEMENT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Why a tool call could not become an action.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("unknown browser action '{0}'")]
    Unknown(String),
    #[error("invalid element identifier '{0}', expected something like 'ai-id-5'")]
    InvalidElementId(String),
    #[error("invalid URL")]
    InvalidUrl,
    #[error("invalid scroll direction '{0}'. Use one of: down, up, top, bottom")]
    InvalidDirection(String),
    #[error("'{0}' must be a non-negative integer")]
    NotNonNegative(&'static str),
    #[error("missing or non-text parameter '{0}'")]
    MissingText(&'static str),
}

// ─────────────────────────────────────────────
// Scroll direction
// ─────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Up,
    Top,
    Bottom,
}

impl ScrollDirection {
    pub const ALL: [&'static str; 4] = ["down", "up", "top", "bottom"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Down => "down",
            ScrollDirection::Up => "up",
            ScrollDirection::Top => "top",
            ScrollDirection::Bottom => "bottom",
        }
    }
}

impl FromStr for ScrollDirection {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "down" => Ok(ScrollDirection::Down),
            "up" => Ok(ScrollDirection::Up),
            "top" => Ok(ScrollDirection::Top),
            "bottom" => Ok(ScrollDirection::Bottom),
            other => Err(ActionError::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────
// BrowserAction
// ─────────────────────────────────────────────

/// One validated browser action.
#[derive(Clone, Debug, PartialEq)]
pub enum BrowserAction {
    Click { ai_id: String },
    TypeText { ai_id: String, text: String },
    Navigate { url: String },
    Scroll { direction: ScrollDirection, pixels: u64 },
    GetText { ai_id: String },
    WaitForElement { ai_id: String, timeout: Duration },
    PressKey { key: String },
    WaitForNavigation { timeout: Duration },
    ClosePopup,
}

impl BrowserAction {
    /// Build an action from a tool name and its arguments.
    ///
    /// Optional arguments that are absent take their documented defaults.
    pub fn parse(name: &str, args: &HashMap<String, Value>) -> Result<Self, ActionError> {
        let action = match name {
            CLICK_ELEMENT => BrowserAction::Click {
                ai_id: element_id(args)?,
            },
            TYPE_TEXT => BrowserAction::TypeText {
                ai_id: element_id(args)?,
                text: text(args, "text")?,
            },
            NAVIGATE_TO_URL => BrowserAction::Navigate {
                url: normalize_url(&text(args, "url").map_err(|_| ActionError::InvalidUrl)?)?,
            },
            SCROLL_PAGE => BrowserAction::Scroll {
                direction: match args.get("direction") {
                    None | Some(Value::Null) => ScrollDirection::Down,
                    Some(Value::String(s)) => s.parse()?,
                    Some(other) => return Err(ActionError::InvalidDirection(other.to_string())),
                },
                pixels: non_negative(args, "pixels", DEFAULT_SCROLL_PIXELS)?,
            },
            GET_ELEMENT_TEXT => BrowserAction::GetText {
                ai_id: element_id(args)?,
            },
            WAIT_FOR_ELEMENT => BrowserAction::WaitForElement {
                ai_id: element_id(args)?,
                timeout: Duration::from_millis(non_negative(
                    args,
                    "timeout",
                    DEFAULT_ELEMENT_TIMEOUT_MS,
                )?),
            },
            PRESS_KEY => BrowserAction::PressKey {
                key: text(args, "key")?,
            },
            WAIT_FOR_NAVIGATION => BrowserAction::WaitForNavigation {
                timeout: Duration::from_millis(non_negative(
                    args,
                    "timeout",
                    DEFAULT_NAVIGATION_TIMEOUT_MS,
                )?),
            },
            CLOSE_POPUP_IF_PRESENT => BrowserAction::ClosePopup,
            other => return Err(ActionError::Unknown(other.to_string())),
        };
        Ok(action)
    }

    /// The tool name this action is called by.
    pub fn name(&self) -> &'static str {
        match self {
            BrowserAction::Click { .. } => CLICK_ELEMENT,
            BrowserAction::TypeText { .. } => TYPE_TEXT,
            BrowserAction::Navigate { .. } => NAVIGATE_TO_URL,
            BrowserAction::Scroll { .. } => SCROLL_PAGE,
            BrowserAction::GetText { .. } => GET_ELEMENT_TEXT,
            BrowserAction::WaitForElement { .. } => WAIT_FOR_ELEMENT,
            BrowserAction::PressKey { .. } => PRESS_KEY,
            BrowserAction::WaitForNavigation { .. } => WAIT_FOR_NAVIGATION,
            BrowserAction::ClosePopup => CLOSE_POPUP_IF_PRESENT,
        }
    }
}

/// CSS selector of a tagged element.
pub fn selector(ai_id: &str) -> String {
    format!("[data-ai-id='{ai_id}']")
}

/// Prefix `https://` when the URL has no scheme.
pub fn normalize_url(url: &str) -> Result<String, ActionError> {
    let url = url.trim();
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(ActionError::InvalidUrl);
    }
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("about:") {
        Ok(url.to_string())
    } else {
        Ok(format!("https://{url}"))
    }
}

fn text(args: &HashMap<String, Value>, key: &'static str) -> Result<String, ActionError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ActionError::MissingText(key))
}

/// Element ids end up inside a CSS selector, so only id-like text passes.
fn element_id(args: &HashMap<String, Value>) -> Result<String, ActionError> {
    let raw = match args.get("ai_id") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(ActionError::InvalidElementId(other.to_string())),
        None => return Err(ActionError::InvalidElementId(String::new())),
    };
    let valid = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(raw)
    } else {
        Err(ActionError::InvalidElementId(raw))
    }
}

fn non_negative(
    args: &HashMap<String, Value>,
    key: &'static str,
    default: u64,
) -> Result<u64, ActionError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_u64().ok_or(ActionError::NotNonNegative(key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_element_actions() {
        assert_eq!(
            BrowserAction::parse(CLICK_ELEMENT, &args(json!({"ai_id": "ai-id-5"}))).unwrap(),
            BrowserAction::Click {
                ai_id: "ai-id-5".into()
            }
        );
        assert_eq!(
            BrowserAction::parse(
                TYPE_TEXT,
                &args(json!({"ai_id": "ai-id-3", "text": "rust jobs"}))
            )
            .unwrap(),
            BrowserAction::TypeText {
                ai_id: "ai-id-3".into(),
                text: "rust jobs".into()
            }
        );
    }

    #[test]
    fn test_element_id_rejects_selector_breakouts() {
        for bad in [json!(""), json!("ai-id-1'] , a[href"), json!(7)] {
            let err = BrowserAction::parse(GET_ELEMENT_TEXT, &args(json!({"ai_id": bad})));
            assert!(matches!(err, Err(ActionError::InvalidElementId(_))));
        }
        assert!(BrowserAction::parse(CLICK_ELEMENT, &HashMap::new()).is_err());
    }

    #[test]
    fn test_navigate_adds_scheme() {
        let action = BrowserAction::parse(NAVIGATE_TO_URL, &args(json!({"url": "example.com"})));
        assert_eq!(
            action.unwrap(),
            BrowserAction::Navigate {
                url: "https://example.com".into()
            }
        );
        assert_eq!(normalize_url("http://localhost:8080").unwrap(), "http://localhost:8080");
        assert_eq!(normalize_url(" "), Err(ActionError::InvalidUrl));
        assert!(BrowserAction::parse(NAVIGATE_TO_URL, &args(json!({"url": 3}))).is_err());
    }

    #[test]
    fn test_scroll_defaults_and_validation() {
        assert_eq!(
            BrowserAction::parse(SCROLL_PAGE, &HashMap::new()).unwrap(),
            BrowserAction::Scroll {
                direction: ScrollDirection::Down,
                pixels: 500
            }
        );
        assert_eq!(
            BrowserAction::parse(SCROLL_PAGE, &args(json!({"direction": "top", "pixels": 0})))
                .unwrap(),
            BrowserAction::Scroll {
                direction: ScrollDirection::Top,
                pixels: 0
            }
        );
        assert_eq!(
            BrowserAction::parse(SCROLL_PAGE, &args(json!({"direction": "left"}))),
            Err(ActionError::InvalidDirection("left".into()))
        );
        assert_eq!(
            BrowserAction::parse(SCROLL_PAGE, &args(json!({"pixels": -10}))),
            Err(ActionError::NotNonNegative("pixels"))
        );
    }

    #[test]
    fn test_wait_defaults() {
        assert_eq!(
            BrowserAction::parse(WAIT_FOR_NAVIGATION, &HashMap::new()).unwrap(),
            BrowserAction::WaitForNavigation {
                timeout: Duration::from_millis(30_000)
            }
        );
        assert_eq!(
            BrowserAction::parse(WAIT_FOR_ELEMENT, &args(json!({"ai_id": "ai-id-2"}))).unwrap(),
            BrowserAction::WaitForElement {
                ai_id: "ai-id-2".into(),
                timeout: Duration::from_millis(10_000)
            }
        );
    }

    #[test]
    fn test_unknown_and_name_roundtrip() {
        assert_eq!(
            BrowserAction::parse("take_screenshot", &HashMap::new()),
            Err(ActionError::Unknown("take_screenshot".into()))
        );
        let action = BrowserAction::parse(PRESS_KEY, &args(json!({"key": "Enter"}))).unwrap();
        assert_eq!(action.name(), PRESS_KEY);
        assert_eq!(BrowserAction::ClosePopup.name(), CLOSE_POPUP_IF_PRESENT);
    }

    #[test]
    fn test_selector() {
        assert_eq!(selector("ai-id-0"), "[data-ai-id='ai-id-0']");
    }
}
