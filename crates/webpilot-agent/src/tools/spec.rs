//! Tool specifications: the machine-readable description of one tool.
//!
//! A [`ToolSpec`] is assembled once, when a tool is registered, from three
//! sources: the Rust types of its parameters (through [`JsonType`]), its
//! documentation block (description plus an `Args:` section), and explicit
//! constraints such as defaults and allowed-value sets.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use webpilot_core::types::ToolDefinition;

// ─────────────────────────────────────────────
// Parameter types
// ─────────────────────────────────────────────

/// JSON-schema type of a tool parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Whether a JSON value is acceptable for this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// Maps a Rust type to the JSON type the LLM sees.
///
/// `Option<T>` unwraps to `T`; anything without an impl can still be
/// declared through [`ToolSpec::param_of`], which defaults to `string`.
pub trait JsonType {
    const PARAM_TYPE: ParamType;
}

macro_rules! json_type {
    ($kind:expr => $($t:ty),+) => {
        $(impl JsonType for $t { const PARAM_TYPE: ParamType = $kind; })+
    };
}

json_type!(ParamType::String => String, char);
json_type!(ParamType::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
json_type!(ParamType::Number => f32, f64);
json_type!(ParamType::Boolean => bool);
json_type!(ParamType::Object => Map<String, Value>);

impl JsonType for &str {
    const PARAM_TYPE: ParamType = ParamType::String;
}

impl<T> JsonType for Vec<T> {
    const PARAM_TYPE: ParamType = ParamType::Array;
}

impl<K, V> JsonType for HashMap<K, V> {
    const PARAM_TYPE: ParamType = ParamType::Object;
}

impl<T: JsonType> JsonType for Option<T> {
    const PARAM_TYPE: ParamType = T::PARAM_TYPE;
}

// ─────────────────────────────────────────────
// ParamSpec / ToolSpec
// ─────────────────────────────────────────────

/// One declared parameter of a tool.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub description: String,
    /// True iff no default is declared.
    pub required: bool,
    pub default: Option<Value>,
    pub allowed_values: Option<Vec<Value>>,
}

/// Immutable description of a registered tool.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order.
    pub params: Vec<ParamSpec>,
    arg_docs: HashMap<String, String>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach a documentation block.
    ///
    /// Text before `Args:` becomes the description; each `name: text` line
    /// inside the `Args:` section documents the parameter of that name.
    pub fn doc(mut self, doc: &str) -> Self {
        let (description, arg_docs) = parse_doc(doc);
        self.description = description;
        for param in &mut self.params {
            if let Some(text) = arg_docs.get(&param.name) {
                param.description = text.clone();
            }
        }
        self.arg_docs = arg_docs;
        self
    }

    /// Declare a required parameter typed after `T`.
    pub fn param<T: JsonType>(self, name: &str) -> Self {
        self.param_of(name, T::PARAM_TYPE, None)
    }

    /// Declare an optional parameter with a default value.
    pub fn param_with_default<T: JsonType>(self, name: &str, default: impl Into<Value>) -> Self {
        self.param_of(name, T::PARAM_TYPE, Some(default.into()))
    }

    /// Declare a parameter with an explicit JSON type.
    pub fn param_of(mut self, name: &str, kind: ParamType, default: Option<Value>) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            description: self.arg_docs.get(name).cloned().unwrap_or_default(),
            required: default.is_none(),
            default,
            allowed_values: None,
        });
        self
    }

    /// Restrict an already-declared parameter to a fixed set of values.
    pub fn allowed_values<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if let Some(param) = self.params.iter_mut().find(|p| p.name == name) {
            param.allowed_values = Some(values.into_iter().map(Into::into).collect());
        }
        self
    }

    pub fn get_param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Names of the parameters without a default.
    pub fn required(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Build the function-calling definition sent to the LLM.
    pub fn to_definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        for param in &self.params {
            let mut schema = Map::new();
            schema.insert("type".into(), json!(param.kind.as_str()));
            schema.insert("description".into(), json!(param.description));
            if let Some(ref default) = param.default {
                schema.insert("default".into(), default.clone());
            }
            if let Some(ref allowed) = param.allowed_values {
                schema.insert("enum".into(), Value::Array(allowed.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(schema));
        }

        let description = if self.description.is_empty() {
            format!("Performs action: {}", self.name)
        } else {
            self.description.clone()
        };

        ToolDefinition::new(
            &self.name,
            description,
            json!({
                "type": "object",
                "properties": properties,
                "required": self.required(),
            }),
        )
    }
}

// ─────────────────────────────────────────────
// Doc parsing
// ─────────────────────────────────────────────

fn arg_line() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\w+):\s*(.*)$").ok()).as_ref()
}

/// Split a doc block into its description and per-argument texts.
pub fn parse_doc(doc: &str) -> (String, HashMap<String, String>) {
    let mut description = Vec::new();
    let mut args = HashMap::new();
    let mut in_args = false;

    for line in doc.lines() {
        let trimmed = line.trim();
        match trimmed {
            "Args:" => {
                in_args = true;
                continue;
            }
            "Returns:" | "Raises:" => break,
            _ => {}
        }
        if in_args {
            if let Some(caps) = arg_line().and_then(|re| re.captures(line)) {
                args.insert(caps[1].to_string(), caps[2].trim().to_string());
            }
        } else {
            description.push(trimmed);
        }
    }

    (description.join("\n").trim().to_string(), args)
}
