//! Gradecast CLI
//!
//! A command-line client for running pass/fail predictions and
//! inspecting the prediction server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::Principal;
use commands::{health, predict, stats};

/// Gradecast CLI
#[derive(Parser)]
#[command(name = "gradecast")]
#[command(author, version, about = "CLI for the Gradecast student prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GRADECAST_API_URL env var)
    #[arg(long, env = "GRADECAST_API_URL")]
    pub api_url: Option<String>,

    /// Act as this teacher
    #[arg(long, env = "GRADECAST_TEACHER_ID", conflicts_with = "admin")]
    pub teacher_id: Option<i64>,

    /// Act as the administrator (all students)
    #[arg(long)]
    pub admin: bool,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict pass/fail for one student
    Predict {
        /// Student ID
        id: i64,
    },

    /// Predict pass/fail for every student in scope
    PredictAll,

    /// Show pass/fail statistics
    Stats,

    /// Show server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    let principal = if cli.admin {
        Principal::Admin
    } else {
        config
            .resolve_teacher_id(cli.teacher_id)
            .map_or(Principal::Anonymous, Principal::Teacher)
    };

    // Initialize client
    let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url), principal)?;

    // Execute command
    match cli.command {
        Commands::Predict { id } => predict::predict_student(&client, id, cli.format).await?,
        Commands::PredictAll => predict::predict_all(&client, cli.format).await?,
        Commands::Stats => stats::show_stats(&client, cli.format).await?,
        Commands::Health => health::show_health(&client, cli.format).await?,
    }

    Ok(())
}
