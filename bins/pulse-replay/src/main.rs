mod config;
mod error;
mod plugins;

use clap::Parser;
use config::{Cli, Commands};

mod cmd;

#[tokio::main]
async fn main() {
    // stdout carries data; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Replay(args) => cmd::replay::run(args).await,
        Commands::Import(args) => cmd::import::run(args).await,
    };
    // Exit explicitly: a pending stdin read sits on a blocking thread and
    // would hold the runtime open after a cancelled replay.
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = %e, "pulse-replay failed");
            std::process::exit(1);
        }
    }
}
