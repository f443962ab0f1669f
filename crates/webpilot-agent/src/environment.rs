//! The environment seam: what the agent observes and acts upon.
//!
//! The agent loop only knows the [`Environment`] trait. A browser adapter
//! implements it in its own crate; tests use in-memory fakes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use webpilot_core::utils::take_chars;

/// Failures reported by an environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// Nothing to observe or act on (e.g. the page was closed).
    #[error("no active page to observe")]
    NoActiveSurface,

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for EnvironmentError {
    fn from(e: anyhow::Error) -> Self {
        EnvironmentError::Other(e.to_string())
    }
}

// ─────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────

/// One interactive element, addressable by its opaque id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub id: String,
    pub tag: String,
    /// The element's `type` attribute, or its role.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// State of the environment at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub url: String,
    pub title: String,
    pub text_preview: String,
    pub interactive_elements: Vec<InteractiveElement>,
}

impl Snapshot {
    /// Render the observation message, with the text preview cut to
    /// `preview_chars` characters.
    pub fn render(&self, preview_chars: usize) -> String {
        let elements = if self.interactive_elements.is_empty() {
            "No interactive elements on the page.".to_string()
        } else {
            self.interactive_elements
                .iter()
                .map(|e| {
                    format!(
                        "<{tag} data-ai-id=\"{id}\" type=\"{kind}\">{text}</{tag}>",
                        tag = e.tag,
                        id = e.id,
                        kind = e.kind,
                        text = e.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "Current page:\nURL: {}\nTitle: {}\nText content: {}...\n\n\
             Interactive elements on the page:\n{}",
            self.url,
            self.title,
            take_chars(&self.text_preview, preview_chars),
            elements
        )
    }
}

// ─────────────────────────────────────────────
// Environment trait
// ─────────────────────────────────────────────

/// Something the agent can observe and act upon.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Current state.
    async fn snapshot(&self) -> Result<Snapshot, EnvironmentError>;

    /// Perform a named action and describe the outcome.
    async fn perform(
        &self,
        action: &str,
        args: &HashMap<String, Value>,
    ) -> Result<String, EnvironmentError>;

    /// Release every resource. Called once per environment.
    async fn teardown(&self);
}

// ─────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────

/// Owner of an environment that guarantees teardown happens exactly once.
///
/// Call [`close`](Self::close) on every exit path; if a handle is dropped
/// unclosed inside a Tokio runtime, teardown is spawned in the background.
pub struct EnvironmentHandle {
    env: Arc<dyn Environment>,
    closed: AtomicBool,
}

impl EnvironmentHandle {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            closed: AtomicBool::new(false),
        }
    }

    pub fn env(&self) -> &Arc<dyn Environment> {
        &self.env
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Tear the environment down. Later calls do nothing.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("tearing down environment");
        self.env.teardown().await;
    }
}

impl Drop for EnvironmentHandle {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                let env = self.env.clone();
                rt.spawn(async move { env.teardown().await });
            }
            Err(_) => warn!("environment dropped outside a runtime without teardown"),
        }
    }
}
