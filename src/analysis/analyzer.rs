//! Analyzer — drives the screening pipeline for one run.
//!
//! Stages: EXTRACT_TEXT (bounded blocking pool) → EXTRACT_DATA (bounded pool,
//! inference serialized by the model runner's mutex) → SCORE (pure) →
//! SUMMARIZE (optional model call) → RANK (stable, score-descending).
//!
//! Failure policy: a candidate whose text extraction fails is dropped with a
//! warning; a candidate whose model extraction fails or parses to garbage is
//! retained and scored from empty data, annotated with a weak_evidence issue.
//! The run as a whole never aborts because one candidate failed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::analysis::extraction::{parse_extraction, ExtractedData, Issue, IssueKind, Relevance};
use crate::analysis::scorer::{calculate_score, ScoreResult};
use crate::config::Config;
use crate::errors::AppError;
use crate::extractor::PdfExtractor;
use crate::llm::prompts::{
    EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_SYSTEM, SUMMARY_PROMPT_TEMPLATE, SUMMARY_SYSTEM,
};
use crate::llm::{ChatMessage, ModelRunner};

/// Candidates with less extracted text than this are skipped (covers blank
/// and image-only PDFs that still "extract").
const MIN_CV_TEXT_CHARS: usize = 50;

/// Extraction and summary calls run cold for reproducibility, regardless of
/// the configured chat temperature.
const ANALYSIS_TEMPERATURE: f32 = 0.2;

const PREVIEW_CHARS: usize = 500;

/// Everything known about one screened CV. Assembled once at the end of the
/// per-candidate pipeline, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResult {
    pub cv_file: String,
    pub cv_path: String,
    pub extracted: ExtractedData,
    pub score: ScoreResult,
    pub summary: String,
    pub cv_text_preview: String,
}

/// Pipeline orchestrator. Cheap to construct; all heavy state (the model
/// session) lives in the shared runner.
pub struct Analyzer {
    runner: Arc<ModelRunner>,
    extractor: Arc<PdfExtractor>,
    parallel_workers: usize,
    pdf_extraction_workers: usize,
    enable_summaries: bool,
    use_chat_format: bool,
    max_tokens: u32,
}

impl Analyzer {
    pub fn new(runner: Arc<ModelRunner>, extractor: PdfExtractor, config: &Config) -> Self {
        Analyzer {
            runner,
            extractor: Arc::new(extractor),
            parallel_workers: config.parallel_workers.max(1),
            pdf_extraction_workers: config.pdf_extraction_workers.max(1),
            enable_summaries: config.enable_summaries,
            use_chat_format: config.use_chat_format,
            max_tokens: config.max_tokens,
        }
    }

    /// Runs the full pipeline over `cv_files` and returns ranked results
    /// (score descending, ties in input order). Never fails as a whole.
    pub async fn run(&self, cv_files: Vec<PathBuf>, job_description: &str) -> Vec<CandidateResult> {
        let total = cv_files.len();
        info!("Processing {total} CV(s) against job description");

        let texts = self.extract_texts(cv_files).await;
        info!("Text extracted for {}/{total} CV(s)", texts.len());

        let mut results = self.analyze_candidates(texts, job_description).await;

        // Stable sort: equal scores keep input order.
        results.sort_by(|a, b| (b.1.score.final_score).cmp(&a.1.score.final_score));
        info!("Ranked {} candidate(s)", results.len());

        results.into_iter().map(|(_, result)| result).collect()
    }

    /// EXTRACT_TEXT: all candidates concurrently across a bounded blocking
    /// pool; unordered completion, input index retained for tie-breaking.
    async fn extract_texts(&self, cv_files: Vec<PathBuf>) -> Vec<(usize, PathBuf, String)> {
        let semaphore = Arc::new(Semaphore::new(self.pdf_extraction_workers));
        let mut tasks: JoinSet<(usize, PathBuf, Option<String>)> = JoinSet::new();

        for (index, path) in cv_files.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let extractor = self.extractor.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, path, None);
                };
                let blocking_path = path.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    extractor.extract_text(&blocking_path).ok()
                })
                .await;
                match outcome {
                    Ok(text) => (index, path, text),
                    Err(e) => {
                        warn!("Text extraction task failed for {}: {e}", path.display());
                        (index, path, None)
                    }
                }
            });
        }

        let mut extracted = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let Ok((index, path, text)) = joined else {
                continue;
            };
            match text {
                Some(text) if text.trim().len() >= MIN_CV_TEXT_CHARS => {
                    extracted.push((index, path, text));
                }
                Some(_) => {
                    warn!(
                        "Skipping {} — insufficient text extracted",
                        path.display()
                    );
                }
                None => {
                    warn!("Skipping {} — text extraction failed", path.display());
                }
            }
        }
        extracted
    }

    /// EXTRACT_DATA + SCORE + SUMMARIZE: concurrent prompt construction and
    /// response parsing; every inference call serialized by the runner.
    async fn analyze_candidates(
        &self,
        texts: Vec<(usize, PathBuf, String)>,
        job_description: &str,
    ) -> Vec<(usize, CandidateResult)> {
        let semaphore = Arc::new(Semaphore::new(self.parallel_workers));
        let mut tasks: JoinSet<(usize, CandidateResult)> = JoinSet::new();

        for (index, path, text) in texts {
            let semaphore = semaphore.clone();
            let runner = self.runner.clone();
            let job_description = job_description.to_string();
            let enable_summaries = self.enable_summaries;
            let use_chat_format = self.use_chat_format;
            let max_tokens = self.max_tokens;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                let cv_file = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());

                let extracted = extract_candidate_data(
                    &runner,
                    &job_description,
                    &text,
                    &cv_file,
                    use_chat_format,
                    max_tokens,
                )
                .await;

                let score = calculate_score(&extracted);
                info!(
                    "{cv_file}: {}/100 ({})",
                    score.final_score, score.recommendation
                );

                let summary = if enable_summaries {
                    model_summary(&runner, &extracted, &score, max_tokens)
                        .await
                        .unwrap_or_else(|| synthesize_summary(&extracted, &score))
                } else {
                    synthesize_summary(&extracted, &score)
                };

                let result = CandidateResult {
                    cv_file,
                    cv_path: path.display().to_string(),
                    extracted,
                    score,
                    summary,
                    cv_text_preview: preview(&text),
                };
                (index, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(entry) = joined {
                results.push(entry);
            }
        }
        // Restore input order before the stable rank sort.
        results.sort_by_key(|(index, _)| *index);
        results
    }
}

/// One extraction call. Failures degrade to empty data annotated with a
/// weak_evidence issue so the candidate stays in the ranking, visibly.
async fn extract_candidate_data(
    runner: &ModelRunner,
    job_description: &str,
    cv_text: &str,
    cv_file: &str,
    use_chat_format: bool,
    max_tokens: u32,
) -> ExtractedData {
    let prompt = EXTRACTION_PROMPT_TEMPLATE
        .replace("{job_description}", job_description)
        .replace("{cv_text}", cv_text);

    let response = if use_chat_format {
        let messages = [
            ChatMessage::system(EXTRACTION_SYSTEM),
            ChatMessage::user(prompt),
        ];
        runner
            .chat(&messages, max_tokens, ANALYSIS_TEMPERATURE)
            .await
    } else {
        let prompt = format!("{EXTRACTION_SYSTEM}\n\n{prompt}");
        runner
            .generate(&prompt, max_tokens, ANALYSIS_TEMPERATURE)
            .await
    };

    match response {
        Ok(raw) => match parse_extraction(&raw) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("{cv_file}: unparsable extraction output ({e}); scoring with empty data");
                degraded_data("model output could not be parsed; scored with no extracted data")
            }
        },
        Err(e) => {
            warn!("{cv_file}: model extraction failed ({e}); scoring with empty data");
            degraded_data("model extraction call failed; scored with no extracted data")
        }
    }
}

fn degraded_data(description: &str) -> ExtractedData {
    ExtractedData {
        issues: vec![Issue {
            kind: IssueKind::WeakEvidence,
            description: description.to_string(),
        }],
        ..Default::default()
    }
}

/// SUMMARIZE via one more serialized model call; None on any failure.
async fn model_summary(
    runner: &ModelRunner,
    extracted: &ExtractedData,
    score: &ScoreResult,
    max_tokens: u32,
) -> Option<String> {
    let extracted_json = serde_json::to_string_pretty(extracted).ok()?;
    let prompt = SUMMARY_PROMPT_TEMPLATE
        .replace("{extracted_json}", &extracted_json)
        .replace("{score}", &score.final_score.to_string())
        .replace("{recommendation}", &score.recommendation.to_string());
    let messages = [ChatMessage::system(SUMMARY_SYSTEM), ChatMessage::user(prompt)];

    match runner
        .chat(&messages, max_tokens, ANALYSIS_TEMPERATURE)
        .await
    {
        Ok(text) => Some(text.trim().to_string()),
        Err(e) => {
            warn!("Summary call failed ({e}); falling back to synthesized summary");
            None
        }
    }
}

/// Deterministic summary from already-extracted fields; used when summaries
/// are disabled or the summary call fails.
pub fn synthesize_summary(extracted: &ExtractedData, score: &ScoreResult) -> String {
    let mut parts = Vec::new();

    if !extracted.required_skills.is_empty() {
        let found = extracted.required_skills.iter().filter(|s| s.found).count();
        parts.push(format!(
            "{found} of {} required skill(s) found",
            extracted.required_skills.len()
        ));
    }

    let high_projects = extracted
        .projects
        .iter()
        .filter(|p| p.relevance == Relevance::High)
        .count();
    if high_projects > 0 {
        parts.push(format!("{high_projects} highly relevant project(s)"));
    }

    if let Some(years) = extracted.experience_years {
        parts.push(format!("{years} year(s) of relevant experience"));
    }

    if !extracted.issues.is_empty() {
        parts.push(format!("{} issue(s) flagged", extracted.issues.len()));
    }

    if parts.is_empty() {
        parts.push("no scoring-relevant evidence extracted".to_string());
    }

    format!("{}. Recommendation: {}.", parts.join("; "), score.recommendation)
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Finds the unique PDF files under `dir` (case-insensitive extension match,
/// canonicalized, sorted). Validation failures surface before any processing.
pub fn collect_cv_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !dir.exists() {
        return Err(AppError::Validation(format!(
            "CV directory not found: {}",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(AppError::Validation(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .map(|path| path.canonicalize().unwrap_or(path))
        .collect();

    files.sort();
    files.dedup();

    if files.is_empty() {
        return Err(AppError::Validation(format!(
            "No PDF files found in directory: {}",
            dir.display()
        )));
    }

    info!("Found {} unique PDF file(s)", files.len());
    Ok(files)
}
