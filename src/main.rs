// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "dualcam")]
#[command(about = "Synchronized capture from a main and an auxiliary camera")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras and the resolved MAIN/AUX roles
    List,

    /// Describe one camera
    Info {
        /// Camera identifier (from 'dualcam list')
        id: String,
    },

    /// Take one picture with both cameras
    Capture {
        /// Camera identifier for the MAIN role (default: first camera)
        #[arg(long)]
        main: Option<String>,

        /// Camera identifier for the AUX role (default: last camera)
        #[arg(long)]
        aux: Option<String>,

        /// Output directory (default: ~/Pictures/dualcam)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=dualcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Info { id }) => cli::camera_info(&id),
        Some(Commands::Capture { main, aux, output }) => cli::capture(main, aux, output),
        Some(Commands::List) | None => cli::list_cameras(),
    }
}
