//! Provider registry: static specs for the supported LLM providers.
//!
//! Every provider here speaks the OpenAI `/chat/completions` dialect with
//! function calling. A `ProviderSpec` tells the matching logic which
//! provider serves a model name and where its endpoint lives.

use std::collections::HashMap;

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal name, also the config key (e.g. `"openrouter"`).
    pub name: &'static str,
    /// Keywords to match in lowercase model names.
    pub keywords: &'static [&'static str],
    /// Conventional environment variable for the API key.
    pub env_key: &'static str,
    /// Human-readable name for logs.
    pub display_name: &'static str,
    /// Gateways serve any model and are used as fallback.
    pub is_gateway: bool,
    /// Self-hosted endpoints are never matched by keyword.
    pub is_local: bool,
    /// OpenAI-compatible base URL used when the config does not set one.
    pub default_api_base: &'static str,
}

/// Supported providers in matching priority order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: "openrouter",
        keywords: &["openrouter"],
        env_key: "OPENROUTER_API_KEY",
        display_name: "OpenRouter",
        is_gateway: true,
        is_local: false,
        default_api_base: "https://openrouter.ai/api/v1",
    },
    ProviderSpec {
        name: "openai",
        keywords: &["openai", "gpt", "o1", "o3", "o4"],
        env_key: "OPENAI_API_KEY",
        display_name: "OpenAI",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.openai.com/v1",
    },
    ProviderSpec {
        name: "anthropic",
        keywords: &["anthropic", "claude"],
        env_key: "ANTHROPIC_API_KEY",
        display_name: "Anthropic",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.anthropic.com/v1",
    },
    ProviderSpec {
        name: "deepseek",
        keywords: &["deepseek"],
        env_key: "DEEPSEEK_API_KEY",
        display_name: "DeepSeek",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.deepseek.com/v1",
    },
    ProviderSpec {
        name: "groq",
        keywords: &["groq", "llama"],
        env_key: "GROQ_API_KEY",
        display_name: "Groq",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://api.groq.com/openai/v1",
    },
    ProviderSpec {
        name: "gemini",
        keywords: &["gemini"],
        env_key: "GEMINI_API_KEY",
        display_name: "Gemini",
        is_gateway: false,
        is_local: false,
        default_api_base: "https://generativelanguage.googleapis.com/v1beta/openai",
    },
    ProviderSpec {
        name: "vllm",
        keywords: &["vllm"],
        env_key: "VLLM_API_KEY",
        display_name: "vLLM",
        is_gateway: false,
        is_local: true,
        default_api_base: "http://localhost:8000/v1",
    },
];

/// Find a provider spec by matching keywords against a model name.
///
/// Skips gateways and local providers; those are fallback only.
pub fn find_by_model(model: &str) -> Option<&'static ProviderSpec> {
    let model_lower = model.to_lowercase();
    PROVIDERS.iter().find(|spec| {
        !spec.is_gateway
            && !spec.is_local
            && spec.keywords.iter().any(|kw| model_lower.contains(kw))
    })
}

/// Find a provider spec by exact name.
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.name == name)
}

/// Provider config lives in core; re-exported here for callers of the registry.
pub use webpilot_core::config::schema::ProviderConfig;

/// Match a model name to a configured provider.
///
/// 1. Keyword match, only if that provider has an API key.
/// 2. A configured local endpoint (vLLM) when the model names it.
/// 3. Fallback to the first configured gateway.
pub fn match_provider<'a>(
    model: &str,
    providers: &'a HashMap<String, ProviderConfig>,
) -> Option<(&'a ProviderConfig, &'static ProviderSpec)> {
    let configured = |spec: &'static ProviderSpec| {
        providers
            .get(spec.name)
            .filter(|c| c.is_configured())
            .map(|c| (c, spec))
    };

    if let Some(found) = find_by_model(model).and_then(configured) {
        return Some(found);
    }

    let model_lower = model.to_lowercase();
    if let Some(found) = PROVIDERS
        .iter()
        .filter(|s| s.is_local && s.keywords.iter().any(|kw| model_lower.contains(kw)))
        .find_map(configured)
    {
        return Some(found);
    }

    PROVIDERS.iter().filter(|s| s.is_gateway).find_map(configured)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(name: &str, key: &str) -> HashMap<String, ProviderConfig> {
        let mut providers = HashMap::new();
        providers.insert(
            name.to_string(),
            ProviderConfig {
                api_key: key.to_string(),
                ..Default::default()
            },
        );
        providers
    }

    #[test]
    fn test_find_by_model() {
        assert_eq!(find_by_model("gpt-4o").unwrap().name, "openai");
        assert_eq!(find_by_model("claude-sonnet-4").unwrap().name, "anthropic");
        assert_eq!(find_by_model("deepseek-chat").unwrap().name, "deepseek");
        assert_eq!(find_by_model("gemini-2.0-flash").unwrap().name, "gemini");
        assert!(find_by_model("some-random-model-xyz").is_none());
    }

    #[test]
    fn test_find_by_model_skips_gateway() {
        assert_eq!(
            find_by_model("openrouter/anthropic/claude-3").unwrap().name,
            "anthropic"
        );
    }

    #[test]
    fn test_match_provider_direct() {
        let providers = keyed("openai", "sk-123");
        let (config, spec) = match_provider("gpt-4o", &providers).unwrap();
        assert_eq!(spec.name, "openai");
        assert_eq!(config.api_key, "sk-123");
    }

    #[test]
    fn test_match_provider_gateway_fallback() {
        let providers = keyed("openrouter", "sk-or-fallback");
        let (_, spec) = match_provider("mistral-large", &providers).unwrap();
        assert_eq!(spec.name, "openrouter");
    }

    #[test]
    fn test_match_provider_local() {
        let providers = keyed("vllm", "token");
        let (_, spec) = match_provider("vllm/qwen2.5", &providers).unwrap();
        assert_eq!(spec.name, "vllm");
    }

    #[test]
    fn test_match_provider_no_key() {
        let providers = keyed("openai", "");
        assert!(match_provider("gpt-4o", &providers).is_none());
    }

    #[test]
    fn test_all_providers_have_unique_names() {
        let mut names: Vec<&str> = PROVIDERS.iter().map(|s| s.name).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total, "Duplicate provider names found");
    }
}
