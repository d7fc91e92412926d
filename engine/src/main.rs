// Concierge
// Main entry point for the concierge binary

use clap::Parser;
use concierge_engine::cli::{Cli, Command, ConfigAction};
use concierge_engine::config::Config;
use concierge_engine::handlers::{
    handle_chat, handle_config_show, handle_doctor, handle_serve, OutputFormat,
};
use concierge_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    tracing::info!(
        "Concierge v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    match cli.command {
        Command::Chat { request } => {
            tracing::info!("Starting chat session");
            handle_chat(request, &config, format).await
        }

        Command::Serve { port } => {
            tracing::info!("Starting gateway");
            handle_serve(port, &config).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, format).await
        }

        Command::Config { action } => {
            tracing::info!("Config management: {:?}", action);
            match action {
                ConfigAction::Show => handle_config_show(&config, format),
            }
        }
    }
}
