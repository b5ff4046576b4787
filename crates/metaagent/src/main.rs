//! metaagent - recursive meta-expert agent

use clap::{Parser, Subcommand};
use tracing::error;

mod commands;
mod server;

use commands::{ask_command, init_command, serve_command, status_command};

/// metaagent - plans, runs commands and consults experts to answer queries
#[derive(Parser)]
#[command(name = "metaagent")]
#[command(about = "◆ A recursive meta-expert agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and workspace
    Init,
    /// Ask the agent a question
    Ask {
        /// Query to answer; interactive when omitted
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Start the HTTP ingress
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show system status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Serve { verbose: true, .. }) {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let result = match cli.command {
        Commands::Init => init_command().await.map_err(|e| ("Init failed", e)),
        Commands::Ask { message } => ask_command(message).await.map_err(|e| ("Error", e)),
        Commands::Serve { host, port, .. } => serve_command(host, port)
            .await
            .map_err(|e| ("Serve failed", e)),
        Commands::Status => status_command().await.map_err(|e| ("Status failed", e)),
    };

    if let Err((what, e)) = result {
        error!("{}: {:#}", what, e);
        std::process::exit(1);
    }
}
