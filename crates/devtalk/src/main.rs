//! devtalk: local chat front-end
//!
//! Usage:
//!   devtalk                    - Start the server as a child process and open a browser
//!   devtalk --serve            - Run the chat page server in the foreground
//!   devtalk --config <PATH>    - Use an explicit configuration file
//!   devtalk --help             - Show help

mod launcher;

use devtalk_core::{ChatEngine, Config, LocalModelClient, SessionManager};
use devtalk_web::{WebConfig, WebServer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Spawn the server and open the browser
    Launch,
    /// Chat page server
    Serve,
    /// Show help
    Help,
    /// Show version
    Version,
}

/// Parsed command line
#[derive(Debug)]
struct Args {
    mode: RunMode,
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    match args.mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("devtalk {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load_from(args.config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    match args.mode {
        RunMode::Serve => run_server(config).await,
        RunMode::Launch => launcher::run(&config, args.config_path.as_deref()).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> anyhow::Result<Args>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = RunMode::Launch;
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--serve" | "-s" => mode = RunMode::Serve,
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(Args { mode: RunMode::Help, config_path }),
            "--version" | "-v" => return Ok(Args { mode: RunMode::Version, config_path }),
            other => anyhow::bail!("Unknown argument: {} (see --help)", other),
        }
    }

    Ok(Args { mode, config_path })
}

/// Print help message
fn print_help() {
    println!("devtalk - local chat front-end");
    println!();
    println!("Usage:");
    println!("  devtalk                  Start the server and open the chat page in a browser");
    println!("  devtalk --serve          Run the chat page server only");
    println!("  devtalk --config <PATH>  Read configuration from PATH (default: ./devtalk.toml)");
    println!("  devtalk --help           Show this help message");
    println!("  devtalk --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  DEVTALK_MODEL            Model file name");
    println!("  DEVTALK_MODEL_DIR        Directory holding the model file (default: model)");
    println!("  DEVTALK_PROVIDER         Inference server: llamacpp or openai (default: llamacpp)");
    println!("  DEVTALK_BASE_URL         Inference server URL (default: http://127.0.0.1:8080)");
    println!("  DEVTALK_PORT             Chat page port (default: 8501)");
    println!("  DEVTALK_PERSONA          Default personality");
    println!("  DEVTALK_TEMPERATURE      Default temperature, 0.1-1.0 (default: 0.4)");
}

/// Run the chat page server in the foreground
async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting DevTalk page server...");
    tracing::info!(
        "Model: {} ({:?} at {})",
        config.model.name,
        config.model.provider,
        config.model.base_url
    );

    let client = LocalModelClient::new(&config.model)
        .map_err(|e| anyhow::anyhow!("Failed to load model: {}", e))?;

    let engine = Arc::new(ChatEngine::new(Arc::new(client), &config));
    let sessions = Arc::new(SessionManager::new(config.session.clone()));

    WebServer::new(WebConfig::from(&config.server), sessions, engine)
        .run()
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<Args> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_default_mode_is_launch() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.mode, RunMode::Launch);
        assert!(args.config_path.is_none());
    }

    #[test]
    fn test_serve_with_config() {
        let args = parse(&["--serve", "--config", "custom.toml"]).unwrap();
        assert_eq!(args.mode, RunMode::Serve);
        assert_eq!(args.config_path, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse(&["--help"]).unwrap().mode, RunMode::Help);
        assert_eq!(parse(&["-v"]).unwrap().mode, RunMode::Version);
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
