//! Conversation context: the system prompt and the bounded message window.
//!
//! [`ContextManager`] owns the transcript of one task. Its window policy
//! keeps the two essential messages (the system prompt and the task goal)
//! forever and slides over everything after them.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};
use webpilot_core::types::{Message, Role};

// ─────────────────────────────────────────────
// System prompt
// ─────────────────────────────────────────────

/// Used when no prompt file is configured or it cannot be read.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an autonomous AI agent controlling a web browser.

Each turn you receive the current page: its URL, title, a preview of its text \
and a list of interactive elements. Every element carries a data-ai-id \
attribute (for example ai-id-5); use that id to act on it.

Work towards the goal one action at a time by calling the available tools. \
After a click that opens a new page, wait for the navigation before acting \
again. If an action fails, read the error and try a different approach.

When the goal is reached, reply with a plain answer that summarises the \
result and call no tools.";

/// Load the system prompt from `path`, falling back to the built-in prompt.
pub fn load_system_prompt(path: Option<&Path>) -> String {
    let Some(path) = path else {
        return DEFAULT_SYSTEM_PROMPT.to_string();
    };
    match std::fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => {
            debug!(path = %path.display(), "loaded system prompt");
            text
        }
        Ok(_) => {
            warn!(path = %path.display(), "system prompt file is empty, using default");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read system prompt, using default");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

/// The first user message of every task.
pub fn goal_message(task: &str) -> Message {
    Message::user(format!("Goal: {task}"))
}

// ─────────────────────────────────────────────
// ContextManager
// ─────────────────────────────────────────────

/// Ordered message history of one task.
#[derive(Clone, Debug)]
pub struct ContextManager {
    messages: Vec<Message>,
}

impl ContextManager {
    /// Start a transcript with the system prompt and the goal.
    pub fn new(system_prompt: impl Into<String>, goal: Message) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), goal],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything except the system prompt and the goal.
    pub fn reset(&mut self) {
        let (essentials, _) = self.split_essentials();
        self.messages = essentials;
    }

    /// Shrink the window to at most `max_size` messages.
    ///
    /// The system prompt and the goal always survive, even when `max_size`
    /// is smaller than two. From the rest only the newest messages are kept,
    /// and a tool result whose assistant request did not survive is dropped
    /// with it.
    pub fn trim(&mut self, max_size: usize) {
        if self.messages.len() <= max_size {
            return;
        }
        let before = self.messages.len();
        let (mut kept, rest) = self.split_essentials();
        let window = max_size.saturating_sub(kept.len());
        let skip = rest.len().saturating_sub(window);
        kept.extend(drop_orphaned_results(rest.into_iter().skip(skip)));
        self.messages = kept;

        debug!(before, after = self.messages.len(), max_size, "context trimmed");
    }

    /// Split into (system + goal, everything after the goal).
    fn split_essentials(&self) -> (Vec<Message>, Vec<Message>) {
        let system = self.messages.iter().position(|m| m.role() == Role::System);
        let goal = self.messages.iter().position(|m| m.role() == Role::User);

        let mut essentials = Vec::with_capacity(2);
        essentials.extend(system.map(|i| self.messages[i].clone()));
        essentials.extend(goal.map(|i| self.messages[i].clone()));

        let start = goal.or(system).map_or(0, |i| i + 1);
        let rest = self.messages[start..]
            .iter()
            .enumerate()
            .filter(|(offset, _)| Some(start + offset) != system)
            .map(|(_, m)| m.clone())
            .collect();
        (essentials, rest)
    }
}

/// Keep a tool result only if it answers a call of the assistant message
/// it follows.
fn drop_orphaned_results(messages: impl Iterator<Item = Message>) -> Vec<Message> {
    let mut open_calls: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for message in messages {
        match message.role() {
            Role::Assistant => {
                open_calls = message.tool_calls().iter().map(|c| c.id.clone()).collect();
            }
            Role::Tool => {
                let answered = message
                    .tool_call_id()
                    .is_some_and(|id| open_calls.contains(id));
                if !answered {
                    debug!(id = ?message.tool_call_id(), "dropping orphaned tool result");
                    continue;
                }
            }
            Role::User | Role::System => open_calls.clear(),
        }
        out.push(message);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_core::types::ToolCall;

    fn observation(n: usize) -> Message {
        Message::user(format!("Current page:\nURL: https://example.com/{n}"))
    }

    fn call(id: &str) -> Message {
        Message::assistant_tool_calls(None, vec![ToolCall::new(id, "click_element", "{}")])
    }

    fn result(id: &str) -> Message {
        Message::tool_result(id, "click_element", "ok")
    }

    /// system, goal, then `cycles` × (observation, call, result).
    fn session(cycles: usize) -> ContextManager {
        let mut ctx = ContextManager::new("sys", goal_message("find the title"));
        for n in 0..cycles {
            ctx.append(observation(n));
            ctx.append(call(&format!("c{n}")));
            ctx.append(result(&format!("c{n}")));
        }
        ctx
    }

    fn assert_essentials(ctx: &ContextManager) {
        assert_eq!(ctx.messages()[0], Message::system("sys"));
        assert_eq!(ctx.messages()[1], goal_message("find the title"));
    }

    #[test]
    fn test_goal_message_format() {
        assert_eq!(
            goal_message("Open example.com").content(),
            Some("Goal: Open example.com")
        );
    }

    #[test]
    fn test_trim_noop_at_or_below_limit() {
        let mut ctx = session(3);
        let before = ctx.messages().to_vec();
        ctx.trim(ctx.len());
        assert_eq!(ctx.messages(), before.as_slice());
        ctx.trim(100);
        assert_eq!(ctx.messages(), before.as_slice());
    }

    #[test]
    fn test_trim_keeps_essentials_for_every_size() {
        for max in 2..20 {
            let mut ctx = session(6);
            ctx.trim(max);
            ctx.trim(max);
            assert!(ctx.len() <= max, "len {} > max {}", ctx.len(), max);
            assert_essentials(&ctx);
        }
    }

    #[test]
    fn test_trim_below_essentials_keeps_only_essentials() {
        let mut ctx = session(2);
        ctx.trim(1);
        assert_eq!(ctx.len(), 2);
        assert_essentials(&ctx);
    }

    #[test]
    fn test_trim_keeps_newest_suffix_in_order() {
        let mut ctx = session(4);
        ctx.trim(5);
        let tail: Vec<&Message> = ctx.messages()[2..].iter().collect();
        assert_eq!(tail, vec![&observation(3), &call("c3"), &result("c3")]);
    }

    #[test]
    fn test_trim_drops_orphaned_tool_result() {
        // system, goal, obs0, call0, result0, obs1, call1, result1
        let mut ctx = session(2);
        // The window would start at result0, whose call is cut.
        ctx.trim(6);
        assert_essentials(&ctx);
        assert_eq!(ctx.len(), 5);
        assert_eq!(ctx.messages()[2], observation(1));
        assert!(ctx.messages().iter().all(|m| m.tool_call_id() != Some("c0")));
    }

    #[test]
    fn test_trimmed_results_always_follow_their_call() {
        for max in 2..15 {
            let mut ctx = session(5);
            ctx.trim(max);
            let msgs = ctx.messages();
            for (i, m) in msgs.iter().enumerate() {
                if let Some(id) = m.tool_call_id() {
                    let owner = msgs[..i]
                        .iter()
                        .rev()
                        .find(|p| p.role() != Role::Tool)
                        .unwrap();
                    assert!(owner.tool_calls().iter().any(|c| c.id == id));
                }
            }
        }
    }

    #[test]
    fn test_reset_returns_to_system_and_goal() {
        let mut ctx = session(3);
        ctx.reset();
        assert_eq!(ctx.len(), 2);
        assert_essentials(&ctx);
    }

    #[test]
    fn test_load_system_prompt_fallbacks() {
        assert_eq!(load_system_prompt(None), DEFAULT_SYSTEM_PROMPT);
        assert_eq!(
            load_system_prompt(Some(Path::new("/nonexistent/prompt.txt"))),
            DEFAULT_SYSTEM_PROMPT
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Be brief.").unwrap();
        assert_eq!(load_system_prompt(Some(&path)), "Be brief.");
    }
}
