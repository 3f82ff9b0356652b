//! End-to-end pipeline tests with a scripted inference backend and a
//! plain-text extraction strategy standing in for the PDF chain.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use cvscreen::analysis::analyzer::Analyzer;
use cvscreen::analysis::extraction::IssueKind;
use cvscreen::analysis::scorer::Recommendation;
use cvscreen::config::Config;
use cvscreen::extractor::{ExtractionStrategy, PdfExtractor};
use cvscreen::llm::{ChatMessage, InferenceBackend, LlmError, ModelRunner};

/// Reads candidate files as UTF-8; fails when the marker text asks it to,
/// simulating an unextractable PDF.
struct PlainTextStrategy;

impl ExtractionStrategy for PlainTextStrategy {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn extract(&self, path: &Path) -> anyhow::Result<String> {
        let text = std::fs::read_to_string(path)?;
        if text.contains("FAILEXTRACT") {
            anyhow::bail!("unreadable document");
        }
        Ok(text)
    }
}

/// Maps marker tokens in the CV text to canned extraction payloads.
struct ScriptedBackend {
    chat_calls: Arc<AtomicUsize>,
    generate_calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    fn new() -> Self {
        ScriptedBackend {
            chat_calls: Arc::new(AtomicUsize::new(0)),
            generate_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn respond(&self, prompt: &str) -> Result<String, LlmError> {
        if !prompt.contains("CV CONTENT:") {
            // Summary call
            return Ok("scripted model summary".to_string());
        }
        if prompt.contains("STRONG_CANDIDATE") {
            return Ok(r#"{
                "required_skills": [
                    {"name": "Python", "found": true, "evidence": "built Django services"},
                    {"name": "Django", "found": true, "evidence": "4 years of Django"},
                    {"name": "PostgreSQL", "found": true, "evidence": "schema design"}
                ],
                "projects": [
                    {"title": "Payments", "technologies": ["Python"], "relevance": "high", "deployment_proof": true}
                ],
                "experience_years": 6
            }"#
            .to_string());
        }
        if prompt.contains("WEAK_CANDIDATE") {
            return Ok(r#"{
                "required_skills": [
                    {"name": "Python", "found": true, "evidence": "scripting"},
                    {"name": "Django", "found": false, "evidence": ""}
                ]
            }"#
            .to_string());
        }
        if prompt.contains("BROKEN_OUTPUT") {
            return Ok("I am sorry, I cannot analyze this CV.".to_string());
        }
        if prompt.contains("CALL_FAILS") {
            return Err(LlmError::EmptyContent);
        }
        // Neutral candidate: nothing extracted
        Ok("{}".to_string())
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        self.respond(prompt)
    }

    async fn generate(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(prompt)
    }
}

fn pipeline_config() -> Config {
    Config {
        parallel_workers: 2,
        pdf_extraction_workers: 2,
        enable_summaries: false,
        ..Config::default()
    }
}

fn analyzer_with(config: &Config) -> (Analyzer, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let backend = ScriptedBackend::new();
    let chat_calls = backend.chat_calls.clone();
    let generate_calls = backend.generate_calls.clone();
    let runner = Arc::new(ModelRunner::with_backend(Box::new(backend)));
    let extractor = PdfExtractor::with_strategies(vec![Box::new(PlainTextStrategy)]);
    (Analyzer::new(runner, extractor, config), chat_calls, generate_calls)
}

fn write_cv(dir: &Path, name: &str, marker: &str) -> PathBuf {
    let path = dir.join(name);
    // Padding keeps every fixture above the minimum extracted-text length.
    let body = format!("{marker}\n{}", "Curriculum vitae body text. ".repeat(10));
    std::fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn test_one_failing_extraction_yields_n_minus_one_results() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_cv(dir.path(), "alice.pdf", "STRONG_CANDIDATE"),
        write_cv(dir.path(), "bob.pdf", "WEAK_CANDIDATE"),
        write_cv(dir.path(), "carol.pdf", "FAILEXTRACT"),
        write_cv(dir.path(), "dave.pdf", "NEUTRAL"),
    ];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Senior Python engineer").await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.cv_file != "carol.pdf"));
}

#[tokio::test]
async fn test_ranking_is_score_descending() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_cv(dir.path(), "bob.pdf", "WEAK_CANDIDATE"),
        write_cv(dir.path(), "alice.pdf", "STRONG_CANDIDATE"),
        write_cv(dir.path(), "dave.pdf", "NEUTRAL"),
    ];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Senior Python engineer").await;

    // alice: 50+45+10+5 → clamp 100; dave: 50; bob: 50+15-20 = 45
    let scores: Vec<u32> = results.iter().map(|r| r.score.final_score).collect();
    assert_eq!(scores, vec![100, 50, 45]);
    assert_eq!(results[0].cv_file, "alice.pdf");
    assert_eq!(results[0].score.recommendation, Recommendation::Shortlist);
    assert_eq!(results[2].cv_file, "bob.pdf");
    assert_eq!(results[2].score.recommendation, Recommendation::Reject);
}

#[tokio::test]
async fn test_ties_keep_input_order() {
    let dir = tempfile::tempdir().unwrap();
    // Both neutral → identical score 50; input order must survive the sort.
    let files = vec![
        write_cv(dir.path(), "zeta.pdf", "NEUTRAL"),
        write_cv(dir.path(), "alpha.pdf", "NEUTRAL"),
    ];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Any role").await;

    assert_eq!(results[0].cv_file, "zeta.pdf");
    assert_eq!(results[1].cv_file, "alpha.pdf");
}

#[tokio::test]
async fn test_unparsable_model_output_keeps_candidate_annotated() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![write_cv(dir.path(), "noisy.pdf", "BROKEN_OUTPUT")];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Any role").await;

    assert_eq!(results.len(), 1);
    let result = &results[0];
    // Empty data (-3 weak_evidence annotation) through the normal scorer.
    assert_eq!(result.score.final_score, 47);
    assert_eq!(result.extracted.issues.len(), 1);
    assert_eq!(result.extracted.issues[0].kind, IssueKind::WeakEvidence);
    assert!(result
        .score
        .breakdown
        .iter()
        .any(|line| line.contains("weak_evidence")));
}

#[tokio::test]
async fn test_failed_model_call_keeps_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_cv(dir.path(), "ok.pdf", "NEUTRAL"),
        write_cv(dir.path(), "down.pdf", "CALL_FAILS"),
    ];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Any role").await;

    assert_eq!(results.len(), 2);
    let failed = results.iter().find(|r| r.cv_file == "down.pdf").unwrap();
    assert_eq!(failed.score.final_score, 47);
}

#[tokio::test]
async fn test_summaries_disabled_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![write_cv(dir.path(), "alice.pdf", "STRONG_CANDIDATE")];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Senior Python engineer").await;

    let summary = &results[0].summary;
    assert!(summary.contains("3 of 3 required skill(s) found"), "{summary}");
    assert!(summary.contains("Recommendation: SHORTLIST"), "{summary}");
}

#[tokio::test]
async fn test_summaries_enabled_use_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![write_cv(dir.path(), "alice.pdf", "STRONG_CANDIDATE")];

    let config = Config {
        enable_summaries: true,
        ..pipeline_config()
    };
    let (analyzer, chat_calls, _) = analyzer_with(&config);
    let results = analyzer.run(files, "Senior Python engineer").await;

    assert_eq!(results[0].summary, "scripted model summary");
    // One extraction call plus one summary call.
    assert_eq!(chat_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_completion_format_uses_generate() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![write_cv(dir.path(), "alice.pdf", "STRONG_CANDIDATE")];

    let config = Config {
        use_chat_format: false,
        ..pipeline_config()
    };
    let (analyzer, chat_calls, generate_calls) = analyzer_with(&config);
    let results = analyzer.run(files, "Senior Python engineer").await;

    assert_eq!(results[0].score.final_score, 100);
    assert_eq!(generate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(chat_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_short_extracted_text_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let tiny = dir.path().join("tiny.pdf");
    std::fs::write(&tiny, "too short").unwrap();
    let files = vec![tiny, write_cv(dir.path(), "ok.pdf", "NEUTRAL")];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Any role").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].cv_file, "ok.pdf");
}

#[tokio::test]
async fn test_preview_is_captured_from_cv_text() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![write_cv(dir.path(), "alice.pdf", "STRONG_CANDIDATE")];

    let (analyzer, _, _) = analyzer_with(&pipeline_config());
    let results = analyzer.run(files, "Any role").await;

    assert!(results[0].cv_text_preview.starts_with("STRONG_CANDIDATE"));
    assert!(results[0].cv_text_preview.chars().count() <= 500);
}
