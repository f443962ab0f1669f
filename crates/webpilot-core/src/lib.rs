//! Webpilot Core: shared types, configuration and helpers.
//!
//! - **types**: chat messages, tool calls, tool definitions (OpenAI wire format)
//! - **config**: `~/.webpilot/config.json` schema, loader, env overrides
//! - **utils**: data paths and string helpers

pub mod config;
pub mod types;
pub mod utils;

pub use types::{LlmResponse, Message, ToolCall, ToolDefinition};
