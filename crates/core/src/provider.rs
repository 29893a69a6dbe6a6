//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get back either
//! plain text or a set of tool-call requests.
//!
//! Implementations: any OpenAI-compatible chat-completions endpoint
//! (Ollama, OpenAI, OpenRouter, local servers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ConversationTurn, ToolCallRequest};

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "qwen2.5:1.5b", "gpt-4o-mini")
    pub model: String,

    /// The full conversation history
    pub turns: Vec<ConversationTurn>,

    /// Temperature (0.0 = deterministic)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Available tools the model can call. Empty means a plain completion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// What the model produced on one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelReply {
    /// A final textual answer.
    Text(String),

    /// One or more tool requests, possibly with accompanying text.
    ToolCalls {
        #[serde(default)]
        content: String,
        calls: Vec<ToolCallRequest>,
    },
}

impl ModelReply {
    /// Build a reply from raw parts, picking the variant once.
    pub fn from_parts(content: String, calls: Vec<ToolCallRequest>) -> Self {
        if calls.is_empty() {
            Self::Text(content)
        } else {
            Self::ToolCalls { content, calls }
        }
    }

    /// Convert into the assistant turn that records it in history.
    pub fn into_turn(self) -> ConversationTurn {
        match self {
            Self::Text(content) => ConversationTurn::assistant(content),
            Self::ToolCalls { content, calls } => ConversationTurn::tool_request(content, calls),
        }
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated reply
    pub reply: ModelReply,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend sits
/// behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
