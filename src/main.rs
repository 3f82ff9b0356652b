use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cvscreen::analysis::analyzer::{collect_cv_files, Analyzer};
use cvscreen::analysis::report::{display_results, save_results};
use cvscreen::cli::{resolve_inputs, Cli};
use cvscreen::config::Config;
use cvscreen::errors::AppError;
use cvscreen::extractor::PdfExtractor;
use cvscreen::llm::ModelRunner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        Config::load(&cli.config).map_err(|e| AppError::Config(format!("{e:#}")))?;
    if cli.no_summaries {
        config.enable_summaries = false;
    }
    if cli.verbose {
        config.verbose = true;
    }

    // Initialize structured logging
    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), default_level))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cvscreen v{}", env!("CARGO_PKG_VERSION"));

    if cli.save_config {
        config.save(&cli.config)?;
        info!("Configuration saved to {}", cli.config.display());
        return Ok(());
    }

    // Collect and validate user input before the (slow) model load.
    let (cv_dir, job_description) = resolve_inputs(&cli)?;
    let cv_files = collect_cv_files(&cv_dir)?;

    // Fatal if the artifact is missing or the server never comes up.
    let runner = Arc::new(ModelRunner::load(&config).await?);

    let analyzer = Analyzer::new(runner, PdfExtractor::default(), &config);
    let results = analyzer.run(cv_files, &job_description).await;

    if results.is_empty() {
        anyhow::bail!("No CVs were successfully analyzed");
    }

    let top = results.len().min(cli.top);
    display_results(&results[..top], &job_description);

    let output_path = save_results(&results, cli.output.as_deref())?;
    println!("\n✓ Results saved to: {}", output_path.display());

    Ok(())
}
