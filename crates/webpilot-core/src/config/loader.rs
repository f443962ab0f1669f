//! Config loader: reads `~/.webpilot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.webpilot/config.json`
//! 3. Environment variables `WEBPILOT_<SECTION>__<FIELD>` (override JSON)
//! 4. Conventional provider variables (`OPENAI_API_KEY`, ...) fill keys still empty

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path (or `path`) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_from_path(&config_path))
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `WEBPILOT_AGENT__MODEL`, `WEBPILOT_AGENT__MAX_ITERATIONS`,
///   `WEBPILOT_AGENT__MAX_CONTEXT_MESSAGES`, `WEBPILOT_AGENT__TEMPERATURE`,
///   `WEBPILOT_AGENT__ACTION_DELAY_MS`, `WEBPILOT_AGENT__SYSTEM_PROMPT_PATH`
/// - `WEBPILOT_PROVIDERS__<NAME>__API_KEY`, `WEBPILOT_PROVIDERS__<NAME>__API_BASE`
/// - `WEBPILOT_BROWSER__HEADLESS`, `WEBPILOT_BROWSER__EXECUTABLE_PATH`
/// - `CHROME_PATH` when no executable is configured
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(val) = std::env::var("WEBPILOT_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Some(n) = env_parse("WEBPILOT_AGENT__MAX_ITERATIONS") {
        config.agent.max_iterations = n;
    }
    if let Some(n) = env_parse("WEBPILOT_AGENT__MAX_CONTEXT_MESSAGES") {
        config.agent.max_context_messages = n;
    }
    if let Some(t) = env_parse("WEBPILOT_AGENT__TEMPERATURE") {
        config.agent.temperature = t;
    }
    if let Some(ms) = env_parse("WEBPILOT_AGENT__ACTION_DELAY_MS") {
        config.agent.action_delay_ms = ms;
    }
    if let Ok(val) = std::env::var("WEBPILOT_AGENT__SYSTEM_PROMPT_PATH") {
        config.agent.system_prompt_path = Some(val);
    }

    for (name, provider) in config.providers.entries_mut() {
        apply_provider_env(provider, name);
    }

    if let Ok(val) = std::env::var("WEBPILOT_BROWSER__HEADLESS") {
        config.browser.headless = val == "true" || val == "1";
    }
    if let Ok(val) = std::env::var("WEBPILOT_BROWSER__EXECUTABLE_PATH") {
        config.browser.executable_path = Some(val);
    }
    if config.browser.executable_path.is_none() {
        config.browser.executable_path = std::env::var("CHROME_PATH").ok();
    }

    config
}

/// Apply env var overrides for a single provider.
fn apply_provider_env(provider: &mut ProviderConfig, name: &str) {
    let upper = name.to_uppercase();
    if let Ok(val) = std::env::var(format!("WEBPILOT_PROVIDERS__{upper}__API_KEY")) {
        provider.api_key = val;
    }
    if let Ok(val) = std::env::var(format!("WEBPILOT_PROVIDERS__{upper}__API_BASE")) {
        provider.api_base = Some(val);
    }
    if !provider.is_configured() {
        if let Ok(val) = std::env::var(format!("{upper}_API_KEY")) {
            provider.api_key = val;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
