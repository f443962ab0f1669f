//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig`, `ProvidersConfig`, `BrowserConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.webpilot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub providers: ProvidersConfig,
    pub browser: BrowserConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Decision-loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// LLM model identifier.
    pub model: String,
    /// Iteration ceiling per task.
    pub max_iterations: u32,
    /// Maximum number of messages sent to the LLM per decision call.
    pub max_context_messages: usize,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Characters of page text included in each observation.
    pub observation_preview_chars: usize,
    /// Pause after every acting phase, letting the page settle.
    pub action_delay_ms: u64,
    /// How many times a rate-limited decision call is re-issued.
    pub rate_limit_retries: u32,
    /// Backoff before re-issuing a rate-limited call (when the provider gives no hint).
    pub rate_limit_backoff_ms: u64,
    /// Optional file holding the system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt_path: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_iterations: 50,
            max_context_messages: 30,
            max_tokens: 4096,
            temperature: 0.7,
            observation_preview_chars: 500,
            action_delay_ms: 1000,
            rate_limit_retries: 3,
            rate_limit_backoff_ms: 2000,
            system_prompt_path: None,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single LLM provider (API key, base URL, headers).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations, one per supported backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub openrouter: ProviderConfig,
    pub anthropic: ProviderConfig,
    pub deepseek: ProviderConfig,
    pub groq: ProviderConfig,
    pub gemini: ProviderConfig,
    pub vllm: ProviderConfig,
}

impl ProvidersConfig {
    /// `(name, config)` pairs in a fixed order.
    pub fn entries(&self) -> [(&'static str, &ProviderConfig); 7] {
        [
            ("openai", &self.openai),
            ("openrouter", &self.openrouter),
            ("anthropic", &self.anthropic),
            ("deepseek", &self.deepseek),
            ("groq", &self.groq),
            ("gemini", &self.gemini),
            ("vllm", &self.vllm),
        ]
    }

    pub fn entries_mut(&mut self) -> [(&'static str, &mut ProviderConfig); 7] {
        [
            ("openai", &mut self.openai),
            ("openrouter", &mut self.openrouter),
            ("anthropic", &mut self.anthropic),
            ("deepseek", &mut self.deepseek),
            ("groq", &mut self.groq),
            ("gemini", &mut self.gemini),
            ("vllm", &mut self.vllm),
        ]
    }

    /// Convert to a map for use with the provider registry.
    pub fn to_map(&self) -> HashMap<String, ProviderConfig> {
        self.entries()
            .into_iter()
            .map(|(name, config)| (name.to_string(), config.clone()))
            .collect()
    }
}

// ─────────────────────────────────────────────
// Browser
// ─────────────────────────────────────────────

/// Chromium launch and interaction settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserConfig {
    pub headless: bool,
    /// Explicit Chrome/Chromium binary. Auto-detected when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data_dir: Option<String>,
    pub launch_timeout_secs: u64,
    /// Bounded wait for element interactions.
    pub action_timeout_ms: u64,
    /// Bounded wait for navigation and page-settle.
    pub navigation_timeout_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            executable_path: None,
            user_data_dir: None,
            launch_timeout_secs: 20,
            action_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            window_width: 1280,
            window_height: 900,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_loop_contract() {
        let config = Config::default();
        assert_eq!(config.agent.max_iterations, 50);
        assert_eq!(config.agent.max_context_messages, 30);
        assert_eq!(config.browser.action_timeout_ms, 10_000);
        assert_eq!(config.browser.navigation_timeout_ms, 30_000);
    }

    #[test]
    fn test_to_map_has_every_provider() {
        let map = ProvidersConfig::default().to_map();
        assert_eq!(map.len(), 7);
        assert!(map.contains_key("openrouter"));
    }
}
