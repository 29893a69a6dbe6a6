//! Built-in tool implementations for Tooloop.
//!
//! Tools give the agent the ability to interact with the world:
//! search the web, do math, tell the time, check the weather, look up
//! Pokémon, and read or write personal facts about the user.

pub mod calculator;
pub mod current_time;
pub mod personal_memory;
pub mod pokemon_info;
pub mod weather_lookup;
pub mod web_search;

use std::sync::Arc;
use std::time::Duration;
use tooloop_config::ToolsConfig;
use tooloop_core::error::{RegistryError, ToolError};
use tooloop_core::tool::ToolRegistry;
use tooloop_memory::MemoryStore;

pub use calculator::CalculatorTool;
pub use current_time::CurrentTimeTool;
pub use personal_memory::PersonalMemoryTool;
pub use pokemon_info::PokemonInfoTool;
pub use weather_lookup::WeatherLookupTool;
pub use web_search::WebSearchTool;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; tooloop/0.1)";

/// Errors building the default registry.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Shared HTTP client for tools that call out to the web.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to a default HTTP client");
            reqwest::Client::new()
        })
}

/// Create the default tool registry with all built-in tools,
/// in the order they are advertised to the model.
pub fn default_registry(
    memory: Arc<MemoryStore>,
    config: &ToolsConfig,
) -> Result<ToolRegistry, SetupError> {
    let client = http_client(Duration::from_secs(20));
    let mut registry = ToolRegistry::new();
    registry.register_tool(WebSearchTool::new(client.clone(), config.search_max_results)?)?;
    registry.register_tool(CalculatorTool)?;
    registry.register_tool(CurrentTimeTool::new(
        config.timezone_offset_minutes,
        config.timezone_label.clone(),
    ))?;
    registry.register_tool(PokemonInfoTool::new(client.clone()))?;
    registry.register_tool(WeatherLookupTool::new(
        client,
        config.openweather_api_key.clone(),
    ))?;
    registry.register_tool(PersonalMemoryTool::new(memory))?;
    Ok(registry)
}
