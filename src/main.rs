use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skylight::app::AppContext;
use skylight::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new()?;

    match cli.command {
        Commands::Fetch { count } => {
            commands::fetch_once(&ctx, count).await?;
        }
        Commands::Watch { interval } => {
            commands::watch(Arc::new(ctx), interval).await?;
        }
    }

    Ok(())
}
