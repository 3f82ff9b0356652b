//! Run output — ranked terminal listing plus a structured results file.

use std::path::{Path, PathBuf};

use chrono::{Local, Utc};
use serde::Serialize;
use tracing::info;

use crate::analysis::analyzer::CandidateResult;
use crate::errors::AppError;

#[derive(Debug, Serialize)]
struct ResultsFile<'a> {
    timestamp: String,
    total_candidates: usize,
    candidates: &'a [CandidateResult],
}

/// Prints the ranked top-N listing in the terminal.
pub fn display_results(top_candidates: &[CandidateResult], job_description: &str) {
    println!("\n{}", "=".repeat(80));
    println!("TOP CANDIDATES - CV ANALYSIS RESULTS");
    println!("{}", "=".repeat(80));
    println!(
        "\nJob Description Preview: {}...",
        truncate(job_description, 200)
    );
    println!("\nCandidates shown: {}", top_candidates.len());
    println!("\n{}\n", "-".repeat(80));

    for (rank, candidate) in top_candidates.iter().enumerate() {
        println!("RANK #{}", rank + 1);
        println!("CV File: {}", candidate.cv_file);
        println!("Fit Score: {}/100", candidate.score.final_score);
        println!("Recommendation: {}", candidate.score.recommendation);
        println!("\nSummary: {}", candidate.summary);

        println!("\nScore Breakdown:");
        for line in &candidate.score.breakdown {
            println!("  {line}");
        }

        println!(
            "\nCV Preview: {}...",
            truncate(&candidate.cv_text_preview, 200)
        );
        println!("\n{}\n", "-".repeat(80));
    }
}

/// Writes the full result set to a JSON file. Defaults to a timestamped
/// `cv_analysis_results_*.json` in the working directory.
pub fn save_results(
    results: &[CandidateResult],
    output: Option<&Path>,
) -> Result<PathBuf, AppError> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(format!(
            "cv_analysis_results_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        )),
    };

    let file = ResultsFile {
        timestamp: Utc::now().to_rfc3339(),
        total_candidates: results.len(),
        candidates: results,
    };

    let raw = serde_json::to_string_pretty(&file)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize results: {e}")))?;
    std::fs::write(&path, raw)?;

    info!("Results saved to {}", path.display());
    Ok(path)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
