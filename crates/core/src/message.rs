//! Conversation turn domain types.
//!
//! These are the value objects that flow through one agent run:
//! the user's message → assistant turns (text or tool requests) → tool results.
//! A turn's shape is decided when it is constructed; nothing downstream
//! inspects fields to guess what kind of turn it is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request from the model to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Generate a correlation ID for providers that omit one.
    pub fn generate_id() -> String {
        format!("call_{}", Uuid::new_v4().simple())
    }
}

/// The outcome of one tool request. Always produced, even for failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The correlation ID of the request this answers
    pub call_id: String,

    /// The tool that was (or would have been) invoked
    pub tool_name: String,

    /// Output text, or the failure message the model gets to see
    pub output: String,

    /// Whether the tool executed successfully
    pub success: bool,
}

impl ToolCallResult {
    pub fn ok(call_id: impl Into<String>, tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: output.into(),
            success: true,
        }
    }

    pub fn failed(call_id: impl Into<String>, tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output: output.into(),
            success: false,
        }
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ConversationTurn {
    /// The fixed instruction that opens every run
    System { content: String },

    /// The end user
    User { content: String },

    /// The model, optionally requesting tools
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },

    /// A tool result fed back to the model
    Tool(ToolCallResult),
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    /// A plain-text assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// An assistant turn that requests tools.
    pub fn tool_request(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool(result: ToolCallResult) -> Self {
        Self::Tool(result)
    }

    /// The role name used on the wire.
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool(_) => "tool",
        }
    }

    /// The text content of this turn (tool output for tool turns).
    pub fn content(&self) -> &str {
        match self {
            Self::System { content } | Self::User { content } | Self::Assistant { content, .. } => {
                content
            }
            Self::Tool(result) => &result.output,
        }
    }

    /// Tool requests carried by an assistant turn.
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}
