//! Provider selection from configuration.

use std::sync::Arc;
use tooloop_config::ModelConfig;
use tooloop_core::error::ProviderError;
use tooloop_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
///
/// An explicit `base_url` wins over the provider's well-known default.
/// Ollama URLs given without the `/v1` suffix (as in `OLLAMA_BASE_URL`)
/// are pointed at the OpenAI-compatible API.
pub fn build_from_config(config: &ModelConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let base_url = match &config.base_url {
        Some(url) => normalize_base_url(&config.provider, url),
        None => default_base_url(&config.provider).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "unknown provider '{}' and no model.base_url set",
                config.provider
            ))
        })?,
    };

    tracing::debug!(provider = %config.provider, %base_url, "Building provider");
    Ok(Arc::new(OpenAiCompatProvider::new(
        &config.provider,
        base_url,
        config.api_key.clone(),
    )))
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> Option<String> {
    let url = match provider_name {
        "ollama" => "http://localhost:11434/v1",
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    };
    Some(url.into())
}

fn normalize_base_url(provider_name: &str, url: &str) -> String {
    let url = url.trim_end_matches('/');
    if provider_name == "ollama" && !url.ends_with("/v1") {
        format!("{url}/v1")
    } else {
        url.to_string()
    }
}
