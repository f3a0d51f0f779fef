//! # warden-cli
//!
//! Binary entry point for Warden.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - The interactive terminal chat loop via `warden chat`
//! - The polling web front end via `warden serve`

mod chat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_core::{InputCoordinator, InterventionWatcher, LoopbackAgent, SupervisorContext};
use warden_web::AppState;

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Supervise a streaming agent from a terminal or a polling web client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal chat with intervention support
    Chat(ChatArgs),
    /// Run the web front end
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug)]
struct ChatArgs {
    /// Seconds to wait at the prompt before sending the default
    /// continuation message ('w' at the prompt waits indefinitely)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Directory with the static webui to serve alongside the API
    #[arg(long)]
    webui: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warden=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let ctx = Arc::new(SupervisorContext::new());
    let agent = Arc::new(LoopbackAgent::with_token_delay(Duration::from_millis(50)));

    match cli.command {
        Command::Chat(args) => {
            let input = Arc::new(InputCoordinator::terminal());
            InterventionWatcher::new(Arc::clone(&ctx), Arc::clone(&input)).spawn()?;

            let timeout = args.timeout.map(Duration::from_secs);
            tokio::task::spawn_blocking(move || chat::run(&ctx, agent.as_ref(), &input, timeout))
                .await??;
        }
        Command::Serve(args) => {
            let state = AppState { ctx, agent };
            let config = warden_web::Config {
                port: args.port,
                webui_dir: args.webui,
            };
            warden_web::serve(config, state).await?;
        }
    }

    Ok(())
}
