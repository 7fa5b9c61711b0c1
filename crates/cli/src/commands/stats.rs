//! Prediction statistics command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{format_probability, print_json, print_warning, OutputFormat};

/// Show pass/fail counts over stored predictions
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats = client.stats().await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            if stats.total == 0 {
                print_warning("No students found");
                return Ok(());
            }

            let unpredicted = stats.total.saturating_sub(stats.passes + stats.fails);

            println!("{}", "Prediction Statistics".bold());
            println!("{}", "=".repeat(40));
            println!("Students:     {}", stats.total);
            println!(
                "Passing:      {} (avg {})",
                stats.passes.to_string().green(),
                format_probability(stats.avg_prob_pass)
            );
            println!(
                "Failing:      {} (avg {})",
                stats.fails.to_string().red(),
                format_probability(stats.avg_prob_fail)
            );
            if unpredicted > 0 {
                println!("Not predicted: {}", unpredicted.to_string().yellow());
            }
        }
    }

    Ok(())
}
