//! Browser tools exposed to the LLM.
//!
//! Each tool is a thin shell over one [`BrowserAction`]: arguments are
//! validated into the typed action, then handed to the environment.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use webpilot_agent::environment::Environment;
use webpilot_agent::tools::{Tool, ToolSource, ToolSpec};

use crate::actions::{
    BrowserAction, ScrollDirection, CLICK_ELEMENT, CLOSE_POPUP_IF_PRESENT,
    DEFAULT_ELEMENT_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_SCROLL_PIXELS,
    GET_ELEMENT_TEXT, NAVIGATE_TO_URL, PRESS_KEY, SCROLL_PAGE, TYPE_TEXT, WAIT_FOR_ELEMENT,
    WAIT_FOR_NAVIGATION,
};

const CLICK_DOC: &str = "Click the element with the given data-ai-id.
After clicking a link or button that opens a new page, call wait_for_navigation.

Args:
    ai_id: Element identifier (for example 'ai-id-5').";

const TYPE_DOC: &str = "Type text into the field with the given data-ai-id, replacing its value.

Args:
    ai_id: Element identifier (for example 'ai-id-3').
    text: Text to enter.";

const NAVIGATE_DOC: &str = "Open a URL in the current page.

Args:
    url: Address to open; https:// is added when the scheme is missing.";

const SCROLL_DOC: &str = "Scroll the page.

Args:
    direction: One of 'down', 'up', 'top', 'bottom'.
    pixels: Distance in pixels for down and up.";

const GET_TEXT_DOC: &str = "Read the text of the element with the given data-ai-id.

Args:
    ai_id: Element identifier.";

const WAIT_ELEMENT_DOC: &str = "Wait until the element with the given data-ai-id exists.

Args:
    ai_id: Element identifier.
    timeout: Maximum wait in milliseconds.";

const PRESS_KEY_DOC: &str = "Press a key on the focused element.

Args:
    key: Key name such as 'Enter', 'Escape' or 'Tab'.";

const WAIT_NAVIGATION_DOC: &str = "Wait for a page load to finish.
Use it right after a click on a link or button that opens a new page.

Args:
    timeout: Maximum wait in milliseconds.";

const CLOSE_POPUP_DOC: &str = "Look for a common popup (sign-up, cookie consent) and close it.
Use it when arriving on a new page or when an element cannot be clicked.";

// ─────────────────────────────────────────────
// BrowserTool
// ─────────────────────────────────────────────

/// One browser action as a [`Tool`].
pub struct BrowserTool {
    spec: ToolSpec,
    env: Arc<dyn Environment>,
}

impl BrowserTool {
    pub fn new(spec: ToolSpec, env: Arc<dyn Environment>) -> Self {
        Self { spec, env }
    }
}

#[async_trait]
impl Tool for BrowserTool {
    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn invoke(&self, args: HashMap<String, Value>) -> anyhow::Result<String> {
        let action = BrowserAction::parse(&self.spec.name, &args)?;
        debug!(tool = %self.spec.name, ?action, "browser tool");
        Ok(self.env.perform(action.name(), &args).await?)
    }
}

// ─────────────────────────────────────────────
// BrowserTools
// ─────────────────────────────────────────────

/// The full browser tool set, bound to one environment.
pub struct BrowserTools {
    env: Arc<dyn Environment>,
}

impl BrowserTools {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env }
    }

    /// Specs of every browser tool, in catalog order.
    pub fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(CLICK_ELEMENT)
                .param::<String>("ai_id")
                .doc(CLICK_DOC),
            ToolSpec::new(TYPE_TEXT)
                .param::<String>("ai_id")
                .param::<String>("text")
                .doc(TYPE_DOC),
            ToolSpec::new(NAVIGATE_TO_URL)
                .param::<String>("url")
                .doc(NAVIGATE_DOC),
            ToolSpec::new(SCROLL_PAGE)
                .param_with_default::<String>("direction", ScrollDirection::Down.as_str())
                .param_with_default::<u64>("pixels", DEFAULT_SCROLL_PIXELS)
                .allowed_values("direction", ScrollDirection::ALL)
                .doc(SCROLL_DOC),
            ToolSpec::new(GET_ELEMENT_TEXT)
                .param::<String>("ai_id")
                .doc(GET_TEXT_DOC),
            ToolSpec::new(WAIT_FOR_ELEMENT)
                .param::<String>("ai_id")
                .param_with_default::<u64>("timeout", DEFAULT_ELEMENT_TIMEOUT_MS)
                .doc(WAIT_ELEMENT_DOC),
            ToolSpec::new(PRESS_KEY)
                .param::<String>("key")
                .doc(PRESS_KEY_DOC),
            ToolSpec::new(WAIT_FOR_NAVIGATION)
                .param_with_default::<u64>("timeout", DEFAULT_NAVIGATION_TIMEOUT_MS)
                .doc(WAIT_NAVIGATION_DOC),
            ToolSpec::new(CLOSE_POPUP_IF_PRESENT).doc(CLOSE_POPUP_DOC),
        ]
    }
}

impl ToolSource for BrowserTools {
    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        Self::specs()
            .into_iter()
            .map(|spec| Arc::new(BrowserTool::new(spec, self.env.clone())) as Arc<dyn Tool>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use webpilot_agent::environment::{EnvironmentError, Snapshot};
    use webpilot_agent::ToolRegistry;

    /// Records every action it is asked to perform.
    #[derive(Default)]
    struct RecordingEnv {
        performed: Mutex<Vec<(String, HashMap<String, Value>)>>,
    }

    #[async_trait]
    impl Environment for RecordingEnv {
        async fn snapshot(&self) -> Result<Snapshot, EnvironmentError> {
            Ok(Snapshot::default())
        }
        async fn perform(
            &self,
            action: &str,
            args: &HashMap<String, Value>,
        ) -> Result<String, EnvironmentError> {
            self.performed
                .lock()
                .unwrap()
                .push((action.to_string(), args.clone()));
            if action == CLICK_ELEMENT {
                return Err(EnvironmentError::Other("element ai-id-9 not found".into()));
            }
            Ok(format!("did {action}"))
        }
        async fn teardown(&self) {}
    }

    fn registry(env: Arc<RecordingEnv>) -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register_all(&BrowserTools::new(env), None).unwrap();
        reg
    }

    #[test]
    fn test_all_tools_register() {
        let reg = registry(Arc::new(RecordingEnv::default()));
        assert_eq!(
            reg.tool_names(),
            vec![
                "click_element",
                "type_text",
                "navigate_to_url",
                "scroll_page",
                "get_element_text",
                "wait_for_element",
                "press_key",
                "wait_for_navigation",
                "close_popup_if_present",
            ]
        );
    }

    #[test]
    fn test_specs_take_docs_and_defaults() {
        let reg = registry(Arc::new(RecordingEnv::default()));
        let scroll = reg.spec("scroll_page").unwrap();
        assert!(scroll.required().is_empty());
        let direction = scroll.get_param("direction").unwrap();
        assert_eq!(direction.default, Some(json!("down")));
        assert_eq!(direction.allowed_values.as_ref().unwrap().len(), 4);
        assert_eq!(
            direction.description,
            "One of 'down', 'up', 'top', 'bottom'."
        );

        let click = reg.spec("click_element").unwrap();
        assert_eq!(click.required(), vec!["ai_id"]);
        assert!(click.description.starts_with("Click the element"));
        assert!(!click.description.contains("Args:"));

        assert_eq!(
            reg.spec("wait_for_navigation")
                .unwrap()
                .get_param("timeout")
                .unwrap()
                .default,
            Some(json!(30000))
        );
    }

    #[tokio::test]
    async fn test_call_reaches_environment_with_defaults() {
        let env = Arc::new(RecordingEnv::default());
        let reg = registry(env.clone());

        let out = reg.call("scroll_page", HashMap::new()).await;
        assert_eq!(out, "did scroll_page");

        let performed = env.performed.lock().unwrap();
        assert_eq!(performed[0].1.get("direction"), Some(&json!("down")));
        assert_eq!(performed[0].1.get("pixels"), Some(&json!(500)));
    }

    #[tokio::test]
    async fn test_invalid_action_never_reaches_environment() {
        let env = Arc::new(RecordingEnv::default());
        let reg = registry(env.clone());

        let mut args = HashMap::new();
        args.insert("ai_id".to_string(), json!("x'] , body"));
        let out = reg.call("get_element_text", args).await;
        assert!(out.starts_with("Error executing get_element_text:"), "{out}");
        assert!(out.contains("invalid element identifier"));

        let mut args = HashMap::new();
        args.insert("direction".to_string(), json!("sideways"));
        let out = reg.call("scroll_page", args).await;
        assert!(out.starts_with("Error: invalid arguments for scroll_page"), "{out}");

        assert!(env.performed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_environment_failure_becomes_error_text() {
        let env = Arc::new(RecordingEnv::default());
        let reg = registry(env);

        let mut args = HashMap::new();
        args.insert("ai_id".to_string(), json!("ai-id-9"));
        let out = reg.call("click_element", args).await;
        assert_eq!(out, "Error executing click_element: element ai-id-9 not found");
    }
}
