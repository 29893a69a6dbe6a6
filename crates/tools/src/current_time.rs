//! Current time tool: the wall-clock time in a configured fixed offset.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use tooloop_core::error::ToolError;
use tooloop_core::tool::{InputSchema, Tool, ToolOutput};

pub struct CurrentTimeTool {
    offset_minutes: i32,
    label: String,
    description: String,
}

impl CurrentTimeTool {
    pub fn new(offset_minutes: i32, label: impl Into<String>) -> Self {
        let label = label.into();
        let description = format!("Returns the current date and time in {label}.");
        Self {
            offset_minutes,
            label,
            description,
        }
    }

    /// Indian Standard Time (UTC+05:30).
    pub fn ist() -> Self {
        Self::new(330, "IST")
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::ist()
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::empty()
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        format_time(Utc::now(), self.offset_minutes, &self.label)
            .map(ToolOutput::Text)
            .ok_or_else(|| {
                ToolError::failed(
                    self.name(),
                    format!("invalid UTC offset of {} minutes", self.offset_minutes),
                )
            })
    }
}

/// Render `now` in the long human format, e.g.
/// `Monday, 19 October 2026, 04:05 PM IST`.
pub fn format_time(now: DateTime<Utc>, offset_minutes: i32, label: &str) -> Option<String> {
    let offset = FixedOffset::east_opt(offset_minutes * 60)?;
    let local = now.with_timezone(&offset);
    Some(format!("{} {label}", local.format("%A, %-d %B %Y, %I:%M %p")))
}
