//! Tool trait: the interface every action exposed to the LLM implements.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::spec::ToolSpec;

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The registry reads `spec()` once at registration, sends the derived
/// definition to the LLM, and dispatches calls via `invoke()` with the
/// arguments already validated against that spec.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, documentation and parameters of this tool.
    fn spec(&self) -> ToolSpec;

    /// Run the tool. The returned text is what the LLM reads.
    ///
    /// On failure return an `Err`; the registry turns it into an error
    /// string for the LLM.
    async fn invoke(&self, args: HashMap<String, Value>) -> anyhow::Result<String>;
}

/// A bundle of tools registered together.
pub trait ToolSource {
    fn tools(&self) -> Vec<Arc<dyn Tool>>;
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required `String` param, returning a user-friendly error.
pub fn require_string(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_string_present() {
        let mut params = HashMap::new();
        params.insert("ai_id".into(), json!("ai-id-3"));
        assert_eq!(require_string(&params, "ai_id").unwrap(), "ai-id-3");
    }

    #[test]
    fn test_require_string_missing_or_wrong_type() {
        let mut params = HashMap::new();
        assert!(require_string(&params, "url").is_err());
        params.insert("url".into(), json!(42));
        let err = require_string(&params, "url").unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[tokio::test]
    async fn test_tool_source_bundles_tools() {
        struct Noop;

        #[async_trait]
        impl Tool for Noop {
            fn spec(&self) -> ToolSpec {
                ToolSpec::new("noop").doc("Does nothing.")
            }
            async fn invoke(&self, _args: HashMap<String, Value>) -> anyhow::Result<String> {
                Ok("ok".into())
            }
        }

        struct Bundle;
        impl ToolSource for Bundle {
            fn tools(&self) -> Vec<Arc<dyn Tool>> {
                vec![Arc::new(Noop)]
            }
        }

        let tools = Bundle.tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].spec().name, "noop");
        assert_eq!(tools[0].invoke(HashMap::new()).await.unwrap(), "ok");
    }
}
