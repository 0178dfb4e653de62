pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "skylight")]
#[command(about = "Timeline reconciliation engine for a Bluesky feed", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the timeline once and print it
    Fetch {
        /// Number of posts to fetch (1-100, default from config)
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Keep the timeline fresh, printing changes as they arrive
    Watch {
        /// Seconds between fetches (minimum 180, default from config)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}
