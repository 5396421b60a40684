//! VClean command-line client.

mod activity;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vclean_models::AudioLevel;

#[derive(Parser)]
#[command(name = "vclean", version)]
#[command(about = "Submit and track VClean processing jobs", long_about = None)]
struct Cli {
    /// Service base URL (overrides VCLEAN_SERVER_URL)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video for processing
    Upload(UploadArgs),
    /// Show the status of a task
    Status {
        task_id: String,
        /// Keep polling until the task finishes
        #[arg(long)]
        wait: bool,
    },
    /// Cancel a task
    Cancel { task_id: String },
    /// Download a finished artifact
    Download {
        task_id: String,
        /// Output file path (defaults to protected_<id>.mp4)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check service health
    Health {
        /// Keep probing every 30 seconds
        #[arg(long)]
        watch: bool,
    },
    /// Show the local activity log
    Log,
}

#[derive(clap::Args)]
struct UploadArgs {
    /// Path to the video file
    video: PathBuf,

    /// Noise strength (0.04-0.20)
    #[arg(long, default_value_t = 0.12)]
    epsilon: f64,

    /// Strength multiplier (1.0-2.0)
    #[arg(long, default_value_t = 1.0)]
    strength: f64,

    /// Audio masking level (off, weak, medium, strong)
    #[arg(long, default_value = "weak")]
    audio: AudioLevel,

    /// Apply noise to every N-th frame (1-30)
    #[arg(long, default_value_t = 10)]
    frames: u32,

    /// Submitting user id
    #[arg(long, default_value = "web_user")]
    user: String,

    /// Wait for the job to finish
    #[arg(long)]
    wait: bool,

    /// Download the result into this directory when done (implies --wait)
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vclean=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let cli = Cli::parse();

    if let Err(err) = commands::run(cli).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}
