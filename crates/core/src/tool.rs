//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! search the web, do math, look up facts, read and write personal memory.
//!
//! Each tool declares a typed [`InputSchema`]. The registry validates model
//! supplied arguments against it before a tool ever runs, so tool bodies can
//! rely on required fields being present and well-typed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{RegistryError, ToolError};
use crate::message::{ToolCallRequest, ToolCallResult};
use crate::provider::ToolDefinition;

/// What a tool hands back: plain text or a structured value.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Structured(serde_json::Value),
}

impl ToolOutput {
    /// Render the output as the text the model will see.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Structured(serde_json::Value::String(s)) => s,
            Self::Structured(value) => {
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// The primitive kinds an input field can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    /// A string restricted to a fixed set of values.
    Enum(Vec<String>),
}

impl FieldKind {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Enum(values) => value
                .as_str()
                .is_some_and(|s| values.iter().any(|v| v == s)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::String => "a string".into(),
            Self::Integer => "an integer".into(),
            Self::Number => "a number".into(),
            Self::Boolean => "a boolean".into(),
            Self::Enum(values) => format!("one of [{}]", values.join(", ")),
        }
    }

    fn json_schema(&self) -> serde_json::Value {
        match self {
            Self::String => serde_json::json!({ "type": "string" }),
            Self::Integer => serde_json::json!({ "type": "integer" }),
            Self::Number => serde_json::json!({ "type": "number" }),
            Self::Boolean => serde_json::json!({ "type": "boolean" }),
            Self::Enum(values) => serde_json::json!({ "type": "string", "enum": values }),
        }
    }
}

/// One named input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    pub required: bool,
}

/// The declared input shape of a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSchema {
    pub fields: Vec<FieldSpec>,
}

impl InputSchema {
    /// A schema with no fields.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a required field.
    pub fn required(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        });
        self
    }

    /// Add an optional field.
    pub fn optional(mut self, name: &str, kind: FieldKind, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
        });
        self
    }

    /// Render as JSON Schema for the LLM.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for field in &self.fields {
            let mut prop = field.kind.json_schema();
            prop["description"] = serde_json::Value::String(field.description.clone());
            properties.insert(field.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate model-supplied arguments.
    ///
    /// Required fields must be present and of the declared kind, optional
    /// fields may be absent or `null`, unknown fields are ignored.
    /// A `null` argument payload is treated as an empty object.
    pub fn validate(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Result<serde_json::Map<String, serde_json::Value>, ToolError> {
        let args = match arguments {
            serde_json::Value::Object(map) => map.clone(),
            serde_json::Value::Null => serde_json::Map::new(),
            other => {
                return Err(ToolError::invalid(
                    tool_name,
                    format!("arguments must be a JSON object, got {other}"),
                ));
            }
        };

        for field in &self.fields {
            match args.get(&field.name) {
                None | Some(serde_json::Value::Null) => {
                    if field.required {
                        return Err(ToolError::invalid(
                            tool_name,
                            format!("missing required field '{}'", field.name),
                        ));
                    }
                }
                Some(value) if !field.kind.accepts(value) => {
                    return Err(ToolError::invalid(
                        tool_name,
                        format!(
                            "field '{}' must be {}, got {}",
                            field.name,
                            field.kind.describe(),
                            value
                        ),
                    ));
                }
                Some(_) => {}
            }
        }

        Ok(args)
    }
}

/// The core Tool trait.
///
/// Each built-in tool (calculator, web_search, personal_memory, etc.)
/// implements this trait. `execute` only ever sees arguments that passed
/// `input_schema()` validation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// The declared input fields.
    fn input_schema(&self) -> InputSchema;

    /// Execute the tool with validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError>;
}

/// A registered tool: its declaration plus the capability to invoke it.
#[derive(Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub schema: InputSchema,
    tool: Arc<dyn Tool>,
}

impl ToolSpec {
    pub fn new(tool: impl Tool + 'static) -> Self {
        Self::from_arc(Arc::new(tool))
    }

    pub fn from_arc(tool: Arc<dyn Tool>) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            schema: tool.input_schema(),
            tool,
        }
    }

    /// Convert this spec into a ToolDefinition for sending to the LLM.
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema.to_json_schema(),
        }
    }

    /// Validate, then execute.
    pub async fn invoke(&self, arguments: &serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args = self.schema.validate(&self.name, arguments)?;
        self.tool.execute(serde_json::Value::Object(args)).await
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish()
    }
}

/// A registry of available tools.
///
/// The agent loop uses this to:
/// 1. Advertise tool definitions to the LLM (in registration order)
/// 2. Resolve, validate and run tools when the LLM requests them
#[derive(Default)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool spec. Names must be unique.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), RegistryError> {
        if self.index.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateTool(spec.name));
        }
        self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Register a tool implementation directly.
    pub fn register_tool(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        self.register(ToolSpec::new(tool))
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// All registered tools, in registration order.
    pub fn describe(&self) -> &[ToolSpec] {
        &self.specs
    }

    /// Tool definitions for sending to the LLM.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.specs.iter().map(ToolSpec::to_definition).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Resolve, validate and run one tool request.
    ///
    /// Never fails: unknown tools, invalid arguments, execution errors and
    /// timeouts all come back as a failed [`ToolCallResult`] carrying the
    /// request's correlation id.
    pub async fn dispatch(&self, request: &ToolCallRequest, timeout: Duration) -> ToolCallResult {
        let Some(spec) = self.resolve(&request.name) else {
            let err = ToolError::UnknownTool(request.name.clone());
            warn!(tool = %request.name, "Model requested an unknown tool");
            return ToolCallResult::failed(
                &request.id,
                &request.name,
                format!("Error: {err}. Available tools: {}", self.names().join(", ")),
            );
        };

        let invocation = spec.invoke(&request.arguments);
        match tokio::time::timeout(timeout, invocation).await {
            Ok(Ok(output)) => {
                debug!(tool = %spec.name, call_id = %request.id, "Tool succeeded");
                ToolCallResult::ok(&request.id, &spec.name, output.into_text())
            }
            Ok(Err(err)) => {
                warn!(tool = %spec.name, error = %err, "Tool call failed");
                ToolCallResult::failed(&request.id, &spec.name, format!("Error: {err}"))
            }
            Err(_) => {
                let err = ToolError::Timeout {
                    tool_name: spec.name.clone(),
                    timeout_secs: timeout.as_secs(),
                };
                warn!(tool = %spec.name, "Tool call timed out");
                ToolCallResult::failed(&request.id, &spec.name, format!("Error: {err}"))
            }
        }
    }
}
