//! Direct single-shot path for models without tool calling.

use tooloop_core::error::RunError;
use tooloop_core::message::ConversationTurn;
use tooloop_core::provider::ModelReply;
use tracing::{debug, warn};

use crate::model::ModelGateway;
use crate::prompt;

/// Sends the instruction and the raw message as one user turn, with no tools.
#[derive(Debug, Clone)]
pub struct FallbackDispatcher {
    gateway: ModelGateway,
}

impl FallbackDispatcher {
    pub fn new(gateway: ModelGateway) -> Self {
        Self { gateway }
    }

    pub async fn dispatch(&self, message: &str) -> Result<String, RunError> {
        debug!(model = self.gateway.model(), "Direct generation without tools");
        let turns = [ConversationTurn::user(prompt::fallback_prompt(message))];

        match self.gateway.generate(&turns, &[]).await? {
            ModelReply::Text(text) => Ok(text),
            ModelReply::ToolCalls { content, calls } => {
                warn!(
                    requested = calls.len(),
                    "Model requested tools on the direct path; keeping its text only"
                );
                Ok(content)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, make_tool_call, tool_call_response};
    use std::sync::Arc;

    #[tokio::test]
    async fn one_call_without_tools() {
        let provider = Arc::new(ScriptedProvider::single_text("A joke."));
        let fallback = FallbackDispatcher::new(ModelGateway::new(provider.clone(), "tiny"));

        assert_eq!(fallback.dispatch("Tell me a joke").await.unwrap(), "A joke.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[0].turns.len(), 1);
        assert!(matches!(&requests[0].turns[0], ConversationTurn::User { content }
            if content.starts_with("You are a tool-using AI agent.")
                && content.ends_with("\nUser: Tell me a joke")));
    }

    #[tokio::test]
    async fn stray_tool_calls_yield_their_text() {
        let mut response =
            tool_call_response(vec![make_tool_call("calculator", serde_json::json!({}))]);
        if let ModelReply::ToolCalls { content, .. } = &mut response.reply {
            *content = "partial".into();
        }
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(response)]));
        let fallback = FallbackDispatcher::new(ModelGateway::new(provider, "tiny"));
        assert_eq!(fallback.dispatch("2+2").await.unwrap(), "partial");
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(
            tooloop_core::error::ProviderError::Network("down".into()),
        )]));
        let fallback = FallbackDispatcher::new(ModelGateway::new(provider, "tiny"));
        assert!(matches!(
            fallback.dispatch("hi").await,
            Err(RunError::ModelUnavailable(_))
        ));
    }
}
