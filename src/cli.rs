//! CLI surface and interactive input collection.
//!
//! Anything the user can get wrong (missing directory, empty job
//! description) is surfaced here, before the model loads.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::errors::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "cvscreen",
    about = "Screen a directory of CV PDFs against a job description using a local GGUF model",
    version
)]
pub struct Cli {
    /// Configuration JSON file
    #[arg(long, short = 'c', default_value = "config.json")]
    pub config: PathBuf,

    /// Directory containing CV PDFs (prompted for when omitted)
    #[arg(long)]
    pub cv_dir: Option<PathBuf>,

    /// File holding the job description (prompted for when omitted)
    #[arg(long)]
    pub jd_file: Option<PathBuf>,

    /// How many ranked candidates to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Results file path (defaults to a timestamped name)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Skip the per-candidate model summary call
    #[arg(long)]
    pub no_summaries: bool,

    /// Verbose logging and inference server output
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Write the effective configuration back to the config path and exit
    #[arg(long)]
    pub save_config: bool,
}

/// Resolves the CV directory and job description, prompting interactively
/// for whichever the command line did not provide.
pub fn resolve_inputs(cli: &Cli) -> Result<(PathBuf, String), AppError> {
    let cv_dir = match &cli.cv_dir {
        Some(dir) => dir.clone(),
        None => PathBuf::from(prompt_line("Enter CV directory path: ")?),
    };

    let job_description = match &cli.jd_file {
        Some(file) => std::fs::read_to_string(file).map_err(|e| {
            AppError::Validation(format!(
                "Cannot read job description file {}: {e}",
                file.display()
            ))
        })?,
        None => prompt_multiline("Paste the job description (finish with an empty line):")?,
    };

    validate_job_description(&job_description)?;
    Ok((cv_dir, job_description))
}

fn validate_job_description(job_description: &str) -> Result<(), AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn prompt_line(message: &str) -> Result<String, AppError> {
    print!("{message}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_multiline(message: &str) -> Result<String, AppError> {
    println!("{message}");

    let stdin = std::io::stdin();
    let mut lines = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_job_description_is_rejected() {
        assert!(validate_job_description("").is_err());
        assert!(validate_job_description("   \n\t ").is_err());
    }

    #[test]
    fn test_nonempty_job_description_passes() {
        assert!(validate_job_description("Senior Rust Engineer").is_ok());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["cvscreen"]);
        assert_eq!(cli.top, 10);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert!(!cli.no_summaries);
        assert!(cli.cv_dir.is_none());
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = Cli::parse_from([
            "cvscreen",
            "--cv-dir",
            "/cvs",
            "--jd-file",
            "jd.txt",
            "--top",
            "5",
            "--no-summaries",
        ]);
        assert_eq!(cli.cv_dir, Some(PathBuf::from("/cvs")));
        assert_eq!(cli.jd_file, Some(PathBuf::from("jd.txt")));
        assert_eq!(cli.top, 5);
        assert!(cli.no_summaries);
    }
}
