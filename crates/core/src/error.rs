//! Error types for the Tooloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum. Only [`RunError`] is
//! run-fatal; tool-level errors are folded into failed tool results.

use thiserror::Error;

/// The top-level error type for all Tooloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Registry errors ---
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    // --- Run-fatal agent errors ---
    #[error("Agent run failed: {0}")]
    Run(#[from] RunError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The model cannot emit structured tool calls at all.
    #[error("Model does not support tool calls: {0}")]
    ToolsUnsupported(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool_name}: {reason}")]
    InvalidArguments { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

impl ToolError {
    /// Shorthand used by tool bodies.
    pub fn failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand used by tool bodies and schema validation.
    pub fn invalid(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("A tool named '{0}' is already registered")]
    DuplicateTool(String),
}

/// Failures that end an agent run. Everything else is absorbed by the loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// The model cannot honor tool calling; the caller should use the fallback path.
    #[error("Model cannot honor tool calls: {0}")]
    ModelCapability(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model call timed out after {timeout_secs}s")]
    ModelTimeout { timeout_secs: u64 },

    #[error("Tool-call iteration cap of {cap} exceeded")]
    IterationCapExceeded { cap: u32 },

    #[error("Run cancelled before reaching a terminal state")]
    Cancelled,
}

impl RunError {
    /// Map a provider failure into the run-fatal taxonomy.
    pub fn from_provider(err: ProviderError) -> Self {
        match err {
            ProviderError::ToolsUnsupported(msg) => Self::ModelCapability(msg),
            other => Self::ModelUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::invalid("calculator", "missing field 'expression'"));
        assert!(err.to_string().contains("calculator"));
        assert!(err.to_string().contains("expression"));
    }

    #[test]
    fn capability_errors_map_to_model_capability() {
        let err = RunError::from_provider(ProviderError::ToolsUnsupported("tinyllama".into()));
        assert!(matches!(err, RunError::ModelCapability(_)));

        let err = RunError::from_provider(ProviderError::Network("connection refused".into()));
        assert!(matches!(err, RunError::ModelUnavailable(ref m) if m.contains("refused")));
    }
}
