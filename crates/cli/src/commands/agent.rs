//! `tooloop agent`: interactive or single-message chat mode.

use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tooloop_agent::AgentService;

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let service = AgentService::from_config(&config)?;

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let response = service.submit(&msg).await;
        eprint!("\r              \r");
        println!("{response}");
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Tooloop Agent: interactive mode");
    println!();
    println!("  Provider:  {}", config.model.provider);
    println!("  Model:     {}", config.model.model);
    println!(
        "  Tools:     {}",
        if config.model.supports_tool_calls {
            service.tools().names().join(", ")
        } else {
            "disabled (model has no tool calling)".to_string()
        }
    );
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        eprint!("  ...");
        let response = service.submit(line).await;
        eprint!("\r     \r");
        println!();
        for text in response.lines() {
            println!("  Assistant > {text}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}
