//! Personal memory tool: lets the agent read and write facts about the user.
//!
//! Bridges the tools system with [`MemoryStore`]. The store is injected, so
//! every run sees the same facts.

use async_trait::async_trait;
use std::sync::Arc;
use tooloop_core::error::ToolError;
use tooloop_core::tool::{FieldKind, InputSchema, Tool, ToolOutput};
use tooloop_memory::{MemoryItem, MemoryStore};

const ACTIONS: [&str; 6] = ["get", "search", "add", "update", "delete", "list"];

pub struct PersonalMemoryTool {
    store: Arc<MemoryStore>,
}

impl PersonalMemoryTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn required<'a>(
        &self,
        args: &'a serde_json::Value,
        field: &str,
        action: &str,
    ) -> Result<&'a str, ToolError> {
        args[field]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ToolError::invalid(self.name(), format!("action '{action}' requires '{field}'"))
            })
    }
}

#[async_trait]
impl Tool for PersonalMemoryTool {
    fn name(&self) -> &str {
        "personal_memory"
    }

    fn description(&self) -> &str {
        "Read or write personal facts about the user (name, age, location, hobbies, ...). \
         Use 'get' with a key, 'search' with a query, 'add'/'update' with key and value, \
         'delete' with a key, or 'list' to see everything."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::empty()
            .required("action", FieldKind::one_of(ACTIONS), "What to do")
            .optional("key", FieldKind::String, "Fact name, e.g. 'favorite_food'")
            .optional("value", FieldKind::String, "Fact value for add/update")
            .optional("query", FieldKind::String, "Text to look for in keys and values")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let action = arguments["action"].as_str().unwrap_or_default();

        let text = match action {
            "get" => {
                let key = self.required(&arguments, "key", action)?;
                match self.store.get(key).await {
                    Some(item) => format!("{}: {}", item.key, item.value),
                    None => format!("No memory stored for '{key}'."),
                }
            }
            "search" => {
                let query = arguments["query"]
                    .as_str()
                    .or_else(|| arguments["key"].as_str())
                    .unwrap_or_default()
                    .trim();
                let hits = self.store.search(query).await;
                if hits.is_empty() {
                    format!("No memories match '{query}'.")
                } else {
                    render_items(&hits)
                }
            }
            "add" => {
                let key = self.required(&arguments, "key", action)?;
                let value = self.required(&arguments, "value", action)?;
                let item = self.store.add(key, value).await;
                format!("Remembered {}: {}", item.key, item.value)
            }
            "update" => {
                let key = self.required(&arguments, "key", action)?;
                let value = self.required(&arguments, "value", action)?;
                if self.store.update(key, value).await {
                    format!("Updated {key}: {value}")
                } else {
                    return Err(ToolError::failed(
                        self.name(),
                        format!("no memory stored for '{key}'; use 'add' to create it"),
                    ));
                }
            }
            "delete" => {
                let key = self.required(&arguments, "key", action)?;
                if self.store.delete(key).await {
                    format!("Forgot {key}.")
                } else {
                    format!("No memory stored for '{key}'.")
                }
            }
            "list" => {
                let items = self.store.list().await;
                if items.is_empty() {
                    "No memories stored.".to_string()
                } else {
                    render_items(&items)
                }
            }
            other => {
                return Err(ToolError::invalid(self.name(), format!("unknown action '{other}'")));
            }
        };

        Ok(ToolOutput::Text(text))
    }
}

fn render_items(items: &[MemoryItem]) -> String {
    items
        .iter()
        .map(|i| format!("- {}: {}", i.key, i.value))
        .collect::<Vec<_>>()
        .join("\n")
}
