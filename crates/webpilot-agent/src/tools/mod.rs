//! Tool trait, tool specifications and the registry that dispatches them.

pub mod base;
pub mod registry;
pub mod spec;

pub use base::{require_string, Tool, ToolSource};
pub use registry::{RegistryError, ToolRegistry};
pub use spec::{JsonType, ParamSpec, ParamType, ToolSpec};
