//! `tooloop config`: configuration helpers.

use std::path::Path;

use clap::Subcommand;
use tooloop_config::AppConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a config file with every default filled in
    Default,

    /// Print where the config file is read from
    Path,

    /// Load the config (file + environment) and report what is in effect
    Validate,
}

pub fn run(
    config_path: Option<&Path>,
    action: Option<ConfigAction>,
) -> Result<(), Box<dyn std::error::Error>> {
    match action.unwrap_or(ConfigAction::Default) {
        ConfigAction::Default => print!("{}", AppConfig::default_toml()),
        ConfigAction::Path => println!("{}", resolve_path(config_path).display()),
        ConfigAction::Validate => validate(config_path)?,
    }
    Ok(())
}

fn resolve_path(config_path: Option<&Path>) -> std::path::PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

fn validate(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", resolve_path(config_path).display());

    let config = match super::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   Config parsed successfully");

    let mut warnings = Vec::new();
    if config.model.provider != "ollama" && config.model.api_key.is_none() {
        warnings.push("No API key set (set TOOLOOP_API_KEY or OPENAI_API_KEY)");
    }
    if config.tools.openweather_api_key.is_none() {
        warnings.push("No OpenWeather key set; weather_lookup will fail (set OPENWEATHER_API_KEY)");
    }
    for w in &warnings {
        println!("   Warning: {w}");
    }

    println!();
    println!("   Provider:        {}", config.model.provider);
    println!("   Model:           {}", config.model.model);
    println!("   Tool calling:    {}", config.model.supports_tool_calls);
    println!("   Max iterations:  {}", config.agent.max_iterations);
    println!(
        "   Gateway:         {}:{}",
        config.gateway.host, config.gateway.port
    );
    Ok(())
}
