//! Tool Registry: the catalog the LLM chooses from, and the dispatcher
//! that runs its choices.
//!
//! Registration order is preserved and becomes the catalog order.
//! `call` never fails: unknown tools, invalid arguments and tool errors
//! all come back as text the LLM can read and react to.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use webpilot_core::types::ToolDefinition;
use webpilot_core::utils::truncate_string;

use super::base::{Tool, ToolSource};
use super::spec::ToolSpec;

/// Rejected registration.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("cannot register tool '{name}': {reason}")]
    InvalidToolKind { name: String, reason: String },
}

struct Entry {
    spec: ToolSpec,
    tool: Arc<dyn Tool>,
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools by name, in registration order, and dispatches calls.
///
/// Owns `Arc<dyn Tool>` so tools can be shared across tasks.
pub struct ToolRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool under the name its spec declares.
    ///
    /// Registering a name twice replaces the earlier tool but keeps its
    /// position in the catalog.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let spec = tool.spec();
        self.insert(spec, tool)
    }

    /// Register a tool under an explicit name.
    pub fn register_as(&mut self, name: &str, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let mut spec = tool.spec();
        spec.name = name.to_string();
        self.insert(spec, tool)
    }

    /// Register every public tool of a source, optionally prefixing names.
    ///
    /// Tools whose name starts with `_` are private and skipped. Returns the
    /// number of tools registered.
    pub fn register_all(
        &mut self,
        source: &dyn ToolSource,
        prefix: Option<&str>,
    ) -> Result<usize, RegistryError> {
        let mut count = 0;
        for tool in source.tools() {
            let spec = tool.spec();
            if spec.name.starts_with('_') {
                debug!(tool = %spec.name, "skipping private tool");
                continue;
            }
            let name = format!("{}{}", prefix.unwrap_or_default(), spec.name);
            self.register_as(&name, tool)?;
            count += 1;
        }
        Ok(count)
    }

    fn insert(&mut self, spec: ToolSpec, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        validate_spec(&spec)?;
        info!(tool = %spec.name, params = spec.params.len(), "registered tool");
        let entry = Entry { spec, tool };
        match self.index.get(&entry.spec.name).copied() {
            Some(slot) => self.entries[slot] = entry,
            None => {
                self.index.insert(entry.spec.name.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.entries[i].tool)
    }

    /// The `ToolSpec` a tool was registered with.
    pub fn spec(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.entries[i].spec)
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Names of all registered tools, in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.spec.name.as_str()).collect()
    }

    /// The LLM-facing catalog, in registration order.
    pub fn get_catalog(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(|e| e.spec.to_definition()).collect()
    }

    /// Execute a tool by name.
    ///
    /// Arguments are checked against the tool's spec and defaults are filled
    /// in before the tool runs. Every failure is returned as an error string.
    pub async fn call(&self, name: &str, args: HashMap<String, Value>) -> String {
        let Some(entry) = self.index.get(name).map(|&i| &self.entries[i]) else {
            warn!(tool = name, "tool not found");
            return format!("Error: Tool '{name}' not found");
        };

        let args = match bind_args(&entry.spec, args) {
            Ok(args) => args,
            Err(problems) => {
                warn!(tool = name, problems = %problems.join("; "), "invalid tool arguments");
                return format!("Error: invalid arguments for {name}: {}", problems.join("; "));
            }
        };

        debug!(tool = name, args = ?args, "invoking tool");
        match entry.tool.invoke(args).await {
            Ok(result) => {
                debug!(tool = name, result = %truncate_string(&result, 200), "tool finished");
                result
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                format!("Error executing {name}: {e}")
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────

fn validate_spec(spec: &ToolSpec) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidToolKind {
        name: spec.name.clone(),
        reason,
    };

    if spec.name.is_empty()
        || !spec
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(invalid(
            "name must be non-empty and use only letters, digits, '_' or '-'".into(),
        ));
    }

    for (i, param) in spec.params.iter().enumerate() {
        if spec.params[..i].iter().any(|p| p.name == param.name) {
            return Err(invalid(format!("duplicate parameter '{}'", param.name)));
        }
        if param.required && param.default.is_some() {
            return Err(invalid(format!(
                "'{}' is required but declares a default",
                param.name
            )));
        }
        if let Some(ref default) = param.default {
            if !param.kind.accepts(default) {
                return Err(invalid(format!(
                    "default of '{}' is not a {}",
                    param.name,
                    param.kind.as_str()
                )));
            }
            if let Some(ref allowed) = param.allowed_values {
                if !allowed.contains(default) {
                    return Err(invalid(format!(
                        "default of '{}' is outside its allowed values",
                        param.name
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Check call arguments against a spec and fill in defaults.
fn bind_args(
    spec: &ToolSpec,
    mut args: HashMap<String, Value>,
) -> Result<HashMap<String, Value>, Vec<String>> {
    let mut problems = Vec::new();

    let mut unknown: Vec<&String> = args
        .keys()
        .filter(|k| spec.get_param(k).is_none())
        .collect();
    unknown.sort();
    for key in unknown {
        problems.push(format!("unexpected parameter '{key}'"));
    }

    for param in &spec.params {
        let provided = args.get(&param.name).is_some_and(|v| !v.is_null());
        if !provided {
            match param.default {
                Some(ref default) => {
                    args.insert(param.name.clone(), default.clone());
                }
                None => problems.push(format!("missing required parameter '{}'", param.name)),
            }
            continue;
        }
        let value = &args[&param.name];

        if !param.kind.accepts(value) {
            problems.push(format!(
                "parameter '{}' must be of type {}",
                param.name,
                param.kind.as_str()
            ));
        } else if let Some(ref allowed) = param.allowed_values {
            if !allowed.contains(value) {
                let choices: Vec<String> = allowed.iter().map(Value::to_string).collect();
                problems.push(format!(
                    "parameter '{}' must be one of [{}]",
                    param.name,
                    choices.join(", ")
                ));
            }
        }
    }

    if problems.is_empty() {
        Ok(args)
    } else {
        Err(problems)
    }
}
