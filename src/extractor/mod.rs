//! PDF text extraction — an ordered fallback chain of backend strategies.
//!
//! Each strategy is tried in sequence; the first one producing non-empty text
//! wins. When every strategy fails the caller gets an explicit
//! `ExtractionFailure` value so the pipeline can skip the candidate and
//! continue. No invariant on text quality is enforced beyond non-empty —
//! garbage text is passed through and the model layer must tolerate it.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// A single PDF text extraction capability.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Primary backend: the `pdf-extract` crate.
pub struct PdfExtractStrategy;

impl ExtractionStrategy for PdfExtractStrategy {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        pdf_extract::extract_text(path)
            .with_context(|| format!("pdf-extract failed on {}", path.display()))
    }
}

/// Fallback backend: page-wise extraction via `lopdf`. Handles some documents
/// whose content streams trip up pdf-extract.
pub struct LopdfStrategy;

impl ExtractionStrategy for LopdfStrategy {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let document = lopdf::Document::load(path)
            .with_context(|| format!("lopdf failed to load {}", path.display()))?;
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        document
            .extract_text(&pages)
            .with_context(|| format!("lopdf failed to extract text from {}", path.display()))
    }
}

/// All strategies failed for one file. Never propagates past the extraction
/// boundary as a panic or error — the orchestrator logs and skips.
#[derive(Debug)]
pub struct ExtractionFailure {
    pub path: PathBuf,
    pub attempted: Vec<&'static str>,
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "text extraction failed for {} (tried: {})",
            self.path.display(),
            self.attempted.join(", ")
        )
    }
}

impl std::error::Error for ExtractionFailure {}

/// Ordered strategy chain, first non-empty success wins.
pub struct PdfExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        PdfExtractor {
            strategies: vec![Box::new(PdfExtractStrategy), Box::new(LopdfStrategy)],
        }
    }
}

impl PdfExtractor {
    /// Builds an extractor with a custom chain (tests inject stubs here).
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        PdfExtractor { strategies }
    }

    pub fn extract_text(&self, path: &Path) -> Result<String, ExtractionFailure> {
        let mut attempted = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            attempted.push(strategy.name());
            match strategy.extract(path) {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(
                        "extracted {} chars from {} via {}",
                        text.len(),
                        path.display(),
                        strategy.name()
                    );
                    return Ok(text);
                }
                Ok(_) => debug!("{} produced empty text for {}", strategy.name(), path.display()),
                Err(e) => debug!("{} failed on {}: {e:#}", strategy.name(), path.display()),
            }
        }

        Err(ExtractionFailure {
            path: path.to_path_buf(),
            attempted,
        })
    }
}
