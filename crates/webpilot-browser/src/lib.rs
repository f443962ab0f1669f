//! Webpilot Browser: the Chromium environment and the tools that drive it.
//!
//! - **actions**: typed, validated browser actions
//! - **page**: scripts evaluated in the page (element tagging, popups, scrolling)
//! - **chrome**: [`ChromeEnvironment`], the chromiumoxide-backed [`Environment`](webpilot_agent::Environment)
//! - **tools**: [`BrowserTools`], the tool set registered with the agent

pub mod actions;
pub mod chrome;
pub mod page;
pub mod tools;

pub use actions::{ActionError, BrowserAction, ScrollDirection};
pub use chrome::ChromeEnvironment;
pub use tools::{BrowserTool, BrowserTools};
