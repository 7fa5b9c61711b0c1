//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability as a percentage
///
/// Values above 1 are taken to be percentages already.
pub fn format_probability(probability: f64) -> String {
    let percent = if probability > 1.0 {
        probability
    } else {
        probability * 100.0
    };
    format!("{:.1}%", percent)
}

/// Color a Pass/Fail label
pub fn color_label(label: &str) -> String {
    match label {
        "Pass" => label.green().bold().to_string(),
        "Fail" => label.red().bold().to_string(),
        _ => label.to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_probability_fraction() {
        assert_eq!(format_probability(0.81), "81.0%");
        assert_eq!(format_probability(0.0), "0.0%");
        assert_eq!(format_probability(1.0), "100.0%");
    }

    #[test]
    fn test_format_probability_already_percent() {
        assert_eq!(format_probability(81.0), "81.0%");
        assert_eq!(format_probability(1.5), "1.5%");
    }

    #[test]
    fn test_unknown_label_is_uncolored() {
        assert_eq!(color_label("Unknown"), "Unknown");
        assert_eq!(color_status("starting"), "starting");
    }
}
