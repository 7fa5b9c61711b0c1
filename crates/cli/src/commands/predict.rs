//! Prediction CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_label, format_probability, print_info, print_json, print_success, print_warning,
    OutputFormat,
};

/// Row for batch prediction table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Student")]
    id: i64,
    #[tabled(rename = "Prediction")]
    prediction: String,
    #[tabled(rename = "Probability")]
    probability: String,
}

/// Predict one student
pub async fn predict_student(client: &ApiClient, student_id: i64, format: OutputFormat) -> Result<()> {
    let result = client.predict(student_id).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!(
                "Student {}: {} ({} chance of passing)",
                student_id.to_string().cyan(),
                color_label(&result.prediction),
                format_probability(result.probability)
            );
        }
    }

    Ok(())
}

/// Predict every student visible to the caller
pub async fn predict_all(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.predict_all().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if let Some(message) = &result.error {
                print_warning(message);
                return Ok(());
            }

            let rows: Vec<PredictionRow> = result
                .students
                .iter()
                .map(|s| PredictionRow {
                    id: s.id,
                    prediction: color_label(&s.prediction),
                    probability: format_probability(s.probability),
                })
                .collect();

            if !rows.is_empty() {
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("{}", table);
            }

            print_success(&format!("Updated {} students", result.updated));
            if result.skipped > 0 {
                print_info(&format!(
                    "Skipped {} records with no usable scores",
                    result.skipped
                ));
            }
        }
    }

    Ok(())
}
