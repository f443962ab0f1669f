//! Agent loop: observe the environment, ask the LLM, act, repeat.
//!
//! One call to [`AgentLoop::run_task`] drives one task from a fresh
//! [`Session`] to a terminal [`TaskOutcome`]. Every cycle:
//!
//! 1. takes a snapshot of the environment and appends it as an observation,
//! 2. sends the trimmed transcript plus the tool catalog to the LLM,
//! 3. ends the task on a plain answer, or runs every requested tool call
//!    and appends the results in request order.
//!
//! Provider failures are classified before the transcript is touched:
//! authentication and quota problems stop the task, everything else is
//! reported into the transcript so the model can adapt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use webpilot_core::config::AgentConfig;
use webpilot_core::types::{LlmResponse, Message, ToolCall};
use webpilot_core::utils::expand_home;
use webpilot_providers::traits::{LlmError, LlmProvider, LlmRequestConfig};

use crate::context::{goal_message, load_system_prompt, ContextManager};
use crate::environment::{Environment, EnvironmentError};
use crate::tools::registry::ToolRegistry;

/// Answer recorded when the model finishes without any text.
const FALLBACK_ANSWER: &str = "Task completed.";

/// Longest pause before re-issuing a rate-limited call.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Tunables of the loop, usually taken from [`AgentConfig`].
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub model: String,
    pub system_prompt: String,
    pub max_iterations: usize,
    pub max_context_messages: usize,
    pub observation_preview_chars: usize,
    pub action_delay: Duration,
    pub rate_limit_retries: u32,
    pub rate_limit_backoff: Duration,
    pub request: LlmRequestConfig,
}

impl LoopSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        let prompt_path = config.system_prompt_path.as_deref().map(expand_home);
        Self {
            model: config.model.clone(),
            system_prompt: load_system_prompt(prompt_path.as_deref()),
            max_iterations: config.max_iterations as usize,
            max_context_messages: config.max_context_messages,
            observation_preview_chars: config.observation_preview_chars,
            action_delay: Duration::from_millis(config.action_delay_ms),
            rate_limit_retries: config.rate_limit_retries,
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            request: LlmRequestConfig {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

// ─────────────────────────────────────────────
// Outcomes
// ─────────────────────────────────────────────

/// Why a task could not continue.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FatalError {
    #[error(
        "the LLM provider rejected the credentials ({0}). \
         Check the API key in ~/.webpilot/config.json or the provider's environment variable"
    )]
    Authentication(String),

    #[error(
        "the LLM provider account has no quota left ({0}). \
         Top up the account's billing or switch to another provider"
    )]
    QuotaExceeded(String),

    #[error("the browser page is gone. Restart webpilot to open a new browser")]
    NoActiveSurface,
}

impl FatalError {
    fn from_llm(error: LlmError) -> Option<Self> {
        match error {
            LlmError::Authentication(msg) => Some(FatalError::Authentication(msg)),
            LlmError::QuotaExceeded(msg) => Some(FatalError::QuotaExceeded(msg)),
            _ => None,
        }
    }
}

/// Terminal state of a task.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    /// The model gave a final answer.
    Done,
    /// The iteration ceiling was reached.
    StoppedOnLimit,
    StoppedOnFatalError(FatalError),
    /// Cancelled from outside.
    Interrupted,
}

impl std::fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskOutcome::Done => write!(f, "task completed"),
            TaskOutcome::StoppedOnLimit => write!(f, "stopped: iteration limit reached"),
            TaskOutcome::StoppedOnFatalError(e) => write!(f, "stopped: {e}"),
            TaskOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Everything the caller learns about a finished task.
#[derive(Clone, Debug)]
pub struct TaskReport {
    pub outcome: TaskOutcome,
    /// Iterations started.
    pub iterations: usize,
    /// Calls made to the LLM, retries included.
    pub decision_attempts: usize,
    /// Tool calls dispatched to the registry.
    pub tool_invocations: usize,
    pub final_answer: Option<String>,
    pub transcript: Vec<Message>,
}

/// Result of one decide step.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Answer(String),
    ToolRequest {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
    Failure(LlmError),
}

impl From<Result<LlmResponse, LlmError>> for Decision {
    fn from(result: Result<LlmResponse, LlmError>) -> Self {
        match result {
            Ok(resp) if resp.has_tool_calls() => Decision::ToolRequest {
                content: resp.content,
                calls: resp.tool_calls,
            },
            Ok(resp) => Decision::Answer(
                resp.content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_ANSWER.to_string()),
            ),
            Err(e) => Decision::Failure(e),
        }
    }
}

// ─────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────

/// State of one task. Created fresh for every task and never reused.
#[derive(Debug)]
pub struct Session {
    pub context: ContextManager,
    pub iteration: usize,
    pub max_iterations: usize,
    decision_attempts: usize,
    tool_invocations: usize,
    final_answer: Option<String>,
}

impl Session {
    pub fn new(system_prompt: &str, task: &str, max_iterations: usize) -> Self {
        Self {
            context: ContextManager::new(system_prompt, goal_message(task)),
            iteration: 0,
            max_iterations,
            decision_attempts: 0,
            tool_invocations: 0,
            final_answer: None,
        }
    }

    fn into_report(self, outcome: TaskOutcome) -> TaskReport {
        TaskReport {
            outcome,
            iterations: self.iteration,
            decision_attempts: self.decision_attempts,
            tool_invocations: self.tool_invocations,
            final_answer: self.final_answer,
            transcript: self.context.into_messages(),
        }
    }
}

enum Step {
    Continue,
    Finish(TaskOutcome),
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

/// Drives tasks against an environment through an LLM.
pub struct AgentLoop {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    settings: LoopSettings,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry, settings: LoopSettings) -> Self {
        info!(
            provider = provider.display_name(),
            model = %settings.model,
            tools = tools.len(),
            max_iterations = settings.max_iterations,
            "agent loop ready"
        );
        Self {
            provider,
            tools,
            settings,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Run one task to completion.
    ///
    /// Cancellation is honoured between phases; an in-flight LLM or tool
    /// call is allowed to finish.
    pub async fn run_task(
        &self,
        task: &str,
        env: &dyn Environment,
        cancel: &CancellationToken,
    ) -> TaskReport {
        let mut session = Session::new(&self.settings.system_prompt, task, self.settings.max_iterations);
        info!(task, "starting task");

        let outcome = loop {
            if cancel.is_cancelled() {
                info!(iteration = session.iteration, "task interrupted");
                break TaskOutcome::Interrupted;
            }
            if session.iteration >= session.max_iterations {
                warn!(max = session.max_iterations, "iteration limit reached");
                break TaskOutcome::StoppedOnLimit;
            }
            session.iteration += 1;
            info!(iteration = session.iteration, "iteration");

            if let Step::Finish(outcome) = self.step(&mut session, env, cancel).await {
                break outcome;
            }
        };

        info!(
            outcome = %outcome,
            iterations = session.iteration,
            decisions = session.decision_attempts,
            tool_calls = session.tool_invocations,
            "task finished"
        );
        session.into_report(outcome)
    }

    /// One observe, decide, act cycle.
    async fn step(
        &self,
        session: &mut Session,
        env: &dyn Environment,
        cancel: &CancellationToken,
    ) -> Step {
        // Observe
        let snapshot = match env.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(EnvironmentError::NoActiveSurface) => {
                error!("no active page to observe");
                return Step::Finish(TaskOutcome::StoppedOnFatalError(FatalError::NoActiveSurface));
            }
            Err(e) => {
                warn!(error = %e, "snapshot failed");
                session
                    .context
                    .append(Message::user(format!("An error occurred while observing the page: {e}")));
                return Step::Continue;
            }
        };
        debug!(url = %snapshot.url, title = %snapshot.title, elements = snapshot.interactive_elements.len(), "observed");

        session
            .context
            .trim(self.settings.max_context_messages.saturating_sub(1));
        session
            .context
            .append(Message::user(snapshot.render(self.settings.observation_preview_chars)));

        // Decide
        let Some(decision) = self.decide(session, cancel).await else {
            return Step::Finish(TaskOutcome::Interrupted);
        };

        // Act
        match decision {
            Decision::Answer(text) => {
                info!(answer = %text, "agent finished");
                session.context.append(Message::assistant(text.clone()));
                session.final_answer = Some(text);
                Step::Finish(TaskOutcome::Done)
            }
            Decision::ToolRequest { content, calls } => {
                session
                    .context
                    .append(Message::assistant_tool_calls(content, calls.clone()));
                for call in &calls {
                    self.act(session, call).await;
                }
                if !self.settings.action_delay.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.action_delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
                Step::Continue
            }
            Decision::Failure(e) if e.is_fatal() => {
                error!(error = %e, "fatal LLM error");
                match FatalError::from_llm(e) {
                    Some(fatal) => Step::Finish(TaskOutcome::StoppedOnFatalError(fatal)),
                    None => Step::Continue,
                }
            }
            Decision::Failure(LlmError::InvalidRequest(msg)) => {
                warn!(error = %msg, "request rejected, restarting the task from the goal");
                session.context.reset();
                Step::Continue
            }
            Decision::Failure(e) => {
                warn!(error = %e, "LLM call failed");
                session.context.append(Message::user(format!(
                    "An error occurred: {e}. Continue working on the goal."
                )));
                Step::Continue
            }
        }
    }

    /// Ask the LLM, re-issuing rate-limited calls. `None` when cancelled
    /// while waiting to retry.
    async fn decide(&self, session: &mut Session, cancel: &CancellationToken) -> Option<Decision> {
        let catalog = self.tools.get_catalog();
        let tools = (!catalog.is_empty()).then_some(catalog.as_slice());
        let mut retries = 0;

        loop {
            session.decision_attempts += 1;
            debug!(
                attempt = session.decision_attempts,
                messages = session.context.len(),
                "calling LLM"
            );
            let result = self
                .provider
                .chat(
                    session.context.messages(),
                    tools,
                    &self.settings.model,
                    &self.settings.request,
                )
                .await;

            match result {
                Err(LlmError::RateLimited { message, retry_after }) => {
                    if retries >= self.settings.rate_limit_retries {
                        warn!(retries, "rate limit retries exhausted");
                        return Some(Decision::Failure(LlmError::Transport(message)));
                    }
                    retries += 1;
                    let wait = retry_wait(retry_after, self.settings.rate_limit_backoff);
                    warn!(retry = retries, wait_ms = wait.as_millis() as u64, "rate limited, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return None,
                    }
                }
                other => return Some(Decision::from(other)),
            }
        }
    }

    /// Run one tool call and record its result.
    async fn act(&self, session: &mut Session, call: &ToolCall) {
        let name = call.name();
        let result = match parse_arguments(&call.function.arguments) {
            Ok(args) => {
                info!(tool = name, args = %call.function.arguments, "executing tool");
                session.tool_invocations += 1;
                self.tools.call(name, args).await
            }
            Err(e) => {
                warn!(tool = name, arguments = %call.function.arguments, error = %e, "malformed tool arguments");
                format!(
                    "Error: invalid JSON arguments for {name}: {e}. \
                     The tool was not run; call it again with a JSON object of arguments."
                )
            }
        };
        debug!(tool = name, result = %webpilot_core::utils::truncate_string(&result, 200), "tool result");
        session
            .context
            .append(Message::tool_result(&call.id, name, result));
    }
}

/// The provider's hint, or the configured backoff, capped at [`MAX_RATE_LIMIT_WAIT`].
fn retry_wait(retry_after: Option<Duration>, backoff: Duration) -> Duration {
    retry_after.unwrap_or(backoff).min(MAX_RATE_LIMIT_WAIT)
}

/// Parse a tool call's argument payload into a keyword map.
fn parse_arguments(raw: &str) -> Result<HashMap<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(e) => Err(e.to_string()),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
