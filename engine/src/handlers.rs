//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: Interactive session on the console
//! - serve: HTTP gateway
//! - doctor: Validate configuration and check dependencies
//! - config show: Print the effective configuration

use anyhow::{Context, Result};
use async_trait::async_trait;
use sdk::errors::{ConciergeErrorExt, EngineError};
use serde_json::json;
use std::io::Write;
use std::process::Stdio;
use tokio::io::{BufReader, Stdin};

use crate::config::Config;
use crate::gateway;
use crate::llm::{build_provider, LLMProvider};
use crate::workflow::{InputSource, LineInput, Workflow};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Stdin that shows a prompt before each read in text mode
struct ConsoleInput {
    lines: LineInput<BufReader<Stdin>>,
    prompt: bool,
}

#[async_trait]
impl InputSource for ConsoleInput {
    async fn next_line(&mut self) -> Result<Option<String>, EngineError> {
        if self.prompt {
            print!("> ");
            std::io::stdout().flush()?;
        }
        self.lines.next_line().await
    }
}

/// Run an interactive session until the user exits or stdin closes
pub async fn handle_chat(request: Option<String>, config: &Config, format: OutputFormat) -> Result<()> {
    let provider = build_provider(&config.llm)?;
    let mut workflow = Workflow::from_config(config, provider);
    tracing::info!(session = %workflow.session_id(), "Starting console session");

    let mut input = ConsoleInput {
        lines: LineInput::new(BufReader::new(tokio::io::stdin())),
        prompt: matches!(format, OutputFormat::Text),
    };

    let emit = move |reply: &str| match format {
        OutputFormat::Text => println!("{}\n", reply),
        OutputFormat::Json => println!("{}", json!({ "reply": reply })),
    };

    match workflow.run(request, &mut input, emit).await {
        Ok(()) => {
            if let OutputFormat::Text = format {
                println!("Goodbye!");
            }
            Ok(())
        }
        Err(e) => {
            match format {
                OutputFormat::Text => eprintln!("✗ {}", e.user_hint()),
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "status": "failed", "error": e.to_string() })
                ),
            }
            Err(e.into())
        }
    }
}

/// Serve concierge sessions over HTTP until Ctrl+C
pub async fn handle_serve(port: Option<u16>, config: &Config) -> Result<()> {
    let mut config = config.clone();
    if let Some(port) = port {
        config.gateway.port = port;
    }
    let provider = build_provider(&config.llm)?;
    gateway::serve(&config, provider).await
}

/// Validate configuration and check collaborators
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));

    checks.push((
        "Build",
        format!(
            "v{} ({} - {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_COMMIT_HASH"),
            env!("BUILD_TIMESTAMP")
        ),
    ));

    for (label, dir) in [
        ("Data directory", &config.core.data_dir),
        ("Work directory", &config.services.work_dir),
    ] {
        if dir.exists() {
            checks.push((label, "Exists".to_string()));
        } else {
            checks.push((label, "Missing".to_string()));
            issues.push(format!("{} does not exist: {}", label, dir.display()));
        }
    }

    if config.llm.provider == "openai" && std::env::var(&config.llm.openai.api_key_env).is_err() {
        checks.push(("OpenAI API key", "Not configured".to_string()));
        issues.push(format!(
            "Set {} to use the OpenAI provider",
            config.llm.openai.api_key_env
        ));
    }

    match build_provider(&config.llm) {
        Ok(provider) => {
            let status = provider_status(provider.as_ref()).await;
            if status != "Available" {
                issues.push(format!("LLM provider '{}' is not reachable", provider.name()));
            }
            checks.push(("LLM provider", format!("{} ({})", provider.name(), status)));
        }
        Err(e) => {
            checks.push(("LLM provider", "Error".to_string()));
            issues.push(e.to_string());
        }
    }

    match python_version(&config.services.python).await {
        Some(version) => checks.push(("Python", version)),
        None => {
            checks.push(("Python", "Not found".to_string()));
            issues.push(format!(
                "'{}' not found; diagrams cannot be rendered",
                config.services.python
            ));
        }
    }

    checks.push((
        "Task agents",
        config
            .workflow
            .agents
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    ));

    match format {
        OutputFormat::Text => {
            println!("Concierge Diagnostics");
            println!("=====================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            println!("{}", text);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

async fn provider_status(provider: &dyn LLMProvider) -> &'static str {
    if provider.check_health().await {
        "Available"
    } else {
        "Unreachable"
    }
}

async fn python_version(python: &str) -> Option<String> {
    let output = tokio::process::Command::new(python)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    // Older interpreters print the version on stderr
    let text = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    Some(String::from_utf8_lossy(&text).trim().to_string())
}
