//! Webpilot Agent: the decision loop and its supporting pieces.
//!
//! This crate contains:
//! - **tools**: Tool trait, tool specs and the registry that builds the catalog
//! - **context**: system prompt loading and the bounded message window
//! - **environment**: the trait a browser (or any other target) implements
//! - **agent_loop**: the observe, decide, act loop

pub mod agent_loop;
pub mod context;
pub mod environment;
pub mod tools;

pub use agent_loop::{AgentLoop, Decision, FatalError, LoopSettings, Session, TaskOutcome, TaskReport};
pub use context::ContextManager;
pub use environment::{
    Environment, EnvironmentError, EnvironmentHandle, InteractiveElement, Snapshot,
};
pub use tools::{RegistryError, Tool, ToolRegistry, ToolSource, ToolSpec};
