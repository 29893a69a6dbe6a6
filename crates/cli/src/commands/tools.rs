//! `tooloop tools`: list the tools advertised to the model.

use std::path::Path;

use tooloop_agent::AgentService;

pub fn run(config_path: Option<&Path>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let service = AgentService::from_config(&config)?;
    let definitions = service.tools().definitions();

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    println!("{} tools:", definitions.len());
    for def in &definitions {
        println!();
        println!("  {}", def.name);
        println!("    {}", def.description);
    }
    if !config.model.supports_tool_calls {
        println!();
        println!("  Note: model.supports_tool_calls = false; answers skip tools entirely.");
    }
    Ok(())
}
