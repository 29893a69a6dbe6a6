//! Model Gateway: one bounded call to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use tooloop_config::ModelConfig;
use tooloop_core::error::RunError;
use tooloop_core::message::ConversationTurn;
use tooloop_core::provider::{ModelReply, Provider, ProviderRequest, ToolDefinition};
use tracing::{debug, warn};

/// Wraps a [`Provider`] with the model settings and the per-call timeout.
///
/// Every failure comes back as a [`RunError`]; a capability failure is kept
/// apart from transient ones so the caller can switch to the direct path.
#[derive(Clone)]
pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    supports_tool_calls: bool,
    timeout: Duration,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            supports_tool_calls: true,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &ModelConfig) -> Self {
        Self::new(provider, &config.model)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_tool_support(config.supports_tool_calls)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Declare whether the model can emit structured tool calls at all.
    pub fn with_tool_support(mut self, supported: bool) -> Self {
        self.supports_tool_calls = supported;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn supports_tool_calls(&self) -> bool {
        self.supports_tool_calls
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send the history plus the available tools and return the model's reply.
    pub async fn generate(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, RunError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            turns: history.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tools.to_vec(),
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            turns = history.len(),
            tools = tools.len(),
            "Calling model"
        );

        let response = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(provider = self.provider.name(), error = %e, "Model call failed");
                return Err(RunError::from_provider(e));
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Model call timed out"
                );
                return Err(RunError::ModelTimeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }

        Ok(response.reply)
    }
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("supports_tool_calls", &self.supports_tool_calls)
            .field("timeout", &self.timeout)
            .finish()
    }
}
