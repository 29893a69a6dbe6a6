//! Tooloop CLI, the main entry point.
//!
//! Commands:
//! - `agent`   Interactive chat or single-message mode
//! - `serve`   Start the HTTP gateway
//! - `tools`   List the tools the agent can call
//! - `config`  Print the default config, its path, or validate it

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "tooloop",
    about = "Tooloop: a tool-calling AI agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.tooloop/config.toml
    #[arg(short, long, global = true, env = "TOOLOOP_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// List the tools advertised to the model
    Tools {
        /// Print full JSON schemas
        #[arg(long)]
        json: bool,
    },

    /// Configuration helpers (prints the default config when no action is given)
    Config {
        #[command(subcommand)]
        action: Option<commands::config_cmd::ConfigAction>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Agent { message } => commands::agent::run(config_path, message).await?,
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Tools { json } => commands::tools::run(config_path, json)?,
        Commands::Config { action } => commands::config_cmd::run(config_path, action)?,
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `--verbose` selects `debug` over `info`.
/// Logs go to stderr so answers on stdout stay clean.
fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
