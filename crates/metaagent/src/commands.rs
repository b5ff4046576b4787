//! metaagent command implementations

use anyhow::{Context, Result};
use std::io::Write;
use tracing::{info, warn};

use metaagent_agent::{executor, AgentSettings, FeedbackController, RunOutput};
use metaagent_config::{self, Config, ExecutorBackend};
use metaagent_provider::openrouter::OpenRouterProvider;

use crate::server;

/// Build the agent from configuration
async fn build_agent(config: &Config) -> Result<FeedbackController<OpenRouterProvider>> {
    let api_key = config
        .api_key()
        .context("No API key configured. Set OPENROUTER_API_KEY or edit ~/.metaagent/config.json")?;

    let provider = OpenRouterProvider::new(api_key, config.api_base(), Some(config.model()));

    let working_dir = config.working_dir();
    if config.executor.backend == ExecutorBackend::Local {
        tokio::fs::create_dir_all(&working_dir)
            .await
            .with_context(|| format!("Failed to create working directory {}", working_dir.display()))?;
    }

    let executor = executor::from_config(&config.executor, working_dir);
    Ok(FeedbackController::new(
        provider,
        executor,
        AgentSettings::from_config(config),
    ))
}

fn print_output(output: &RunOutput) {
    let stats = output.stats.report();
    println!("\n◆ {}", output.answer);
    println!(
        "\n  calls: {}  latency: {:.2}s  models: {}{}",
        stats.calls,
        stats.total_latency,
        stats.models_used.join(", "),
        if stats.depth_exhausted {
            "  (depth limit reached)"
        } else {
            ""
        }
    );
}

/// Initialize config and workspace
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing metaagent...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = metaagent_config::init()
        .await
        .context("Failed to write default configuration")?;

    let working_dir = config.working_dir();
    tokio::fs::create_dir_all(&working_dir).await?;
    info!("◆ Working directory {}", working_dir.display());

    println!("\n◆ metaagent initialized");
    println!("\nNext steps:");
    println!(
        "  1. Add your API key to {}",
        metaagent_config::config_path().display()
    );
    println!("     Get one at: https://openrouter.ai/keys");
    println!("  2. Ask something: metaagent ask -m \"What files are in the workspace?\"");

    Ok(())
}

/// Answer one query, or run an interactive loop
pub async fn ask_command(message: Option<String>) -> Result<()> {
    let config = Config::load().await.context("Failed to load configuration")?;
    let mut agent = build_agent(&config).await?;

    if let Some(msg) = message {
        let output = agent.run(&msg).await?;
        print_output(&output);
        return Ok(());
    }

    println!("◆ Interactive mode (type 'exit' to quit)");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match agent.run(input).await {
            Ok(output) => {
                print_output(&output);
                println!();
            }
            Err(e) => warn!("◆ {}", e),
        }
    }

    Ok(())
}

/// Start the HTTP ingress
pub async fn serve_command(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = Config::load().await.context("Failed to load configuration")?;
    let agent = build_agent(&config).await?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    println!("◆ metaagent listening on http://{}", addr);
    println!(
        "  model: {}  depth: {}  history: {}",
        config.model(),
        config.max_recursion_depth(),
        config.max_history_items()
    );
    info!("◆ INGRESS ONLINE AT {}", addr);

    axum::serve(listener, server::build_router(agent))
        .await
        .context("Server error")?;

    Ok(())
}

/// Show system status
pub async fn status_command() -> Result<()> {
    let config_path = metaagent_config::config_path();

    println!("◆ metaagent Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await.context("Failed to load configuration")?;
    let working_dir = config.working_dir();

    println!(
        "Workspace: {} {}",
        working_dir.display(),
        if working_dir.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );
    println!("Model:     {}", config.model());
    println!("Summary:   {}", config.summary_model());
    println!(
        "API Key:   {}",
        if config.has_api_key() {
            "[Set]"
        } else {
            "[Missing]"
        }
    );
    match config.executor.backend {
        ExecutorBackend::Local => println!("Executor:  local shell"),
        ExecutorBackend::Docker => println!("Executor:  docker ({})", config.executor.docker_image),
    }
    let allowed = if config.executor.allowed_commands.is_empty() {
        "Any".to_string()
    } else {
        config.executor.allowed_commands.join(", ")
    };
    println!("Allowed:   {}", allowed);
    println!(
        "Limits:    depth {}, history {}",
        config.max_recursion_depth(),
        config.max_history_items()
    );

    println!("\n◆ Ready");

    Ok(())
}
