//! Deterministic scoring engine — a fixed point table over extracted data.
//!
//! Pure and total: never fails, missing sub-fields already defaulted at the
//! extraction boundary. Identical input always yields an identical
//! `ScoreResult`, including breakdown line ordering (required → preferred →
//! projects → deployment proofs → transferable → deductions).
//!
//! Additions are capped per category; deductions are deliberately uncapped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::extraction::{ExtractedData, IssueKind, Relevance};

const BASE_SCORE: i32 = 50;

const REQUIRED_SKILL_POINTS: i32 = 15;
const REQUIRED_SKILL_MAX_COUNT: usize = 3;
const PREFERRED_SKILL_POINTS: i32 = 5;
const PREFERRED_SKILL_MAX_COUNT: usize = 2;
const RELEVANT_PROJECT_POINTS: i32 = 10;
const RELEVANT_PROJECT_MAX_COUNT: usize = 2;
const DEPLOYMENT_PROOF_POINTS: i32 = 5;
const DEPLOYMENT_PROOF_MAX_COUNT: usize = 2;
const TRANSFERABLE_SKILL_POINTS: i32 = 5;
const TRANSFERABLE_SKILL_MAX_COUNT: usize = 2;

const MISSING_REQUIRED_PENALTY: i32 = -20;
const CONTRADICTION_PENALTY: i32 = -10;
const AMBIGUOUS_PENALTY: i32 = -5;
const WEAK_EVIDENCE_PENALTY: i32 = -3;

const SHORTLIST_THRESHOLD: u32 = 75;
const REVIEW_THRESHOLD: u32 = 60;

const EVIDENCE_PREVIEW_CHARS: usize = 60;

/// Hiring recommendation derived from the final score via fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Shortlist,
    Review,
    Reject,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::Shortlist => "SHORTLIST",
            Recommendation::Review => "REVIEW",
            Recommendation::Reject => "REJECT",
        };
        f.write_str(label)
    }
}

/// Immutable scoring output: clamped score, ordered human-readable breakdown,
/// recommendation, and an echo of the scoring-relevant input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub final_score: u32,
    pub breakdown: Vec<String>,
    pub recommendation: Recommendation,
    pub details: ExtractedData,
}

/// Applies the point table to `extracted` and returns the score, breakdown,
/// and recommendation.
pub fn calculate_score(extracted: &ExtractedData) -> ScoreResult {
    let mut score = BASE_SCORE;
    let mut breakdown = vec![format!("Base score: {BASE_SCORE}")];

    // Required skills found (capped)
    let found_required: Vec<_> = extracted.required_skills.iter().filter(|s| s.found).collect();
    let counted = found_required.len().min(REQUIRED_SKILL_MAX_COUNT);
    if counted > 0 {
        let points = counted as i32 * REQUIRED_SKILL_POINTS;
        score += points;
        breakdown.push(format!("+{points} for {counted} required skill(s) found"));
        for skill in found_required.iter().take(REQUIRED_SKILL_MAX_COUNT) {
            breakdown.push(format!(
                "  ✓ {}: \"{}\"",
                skill.name,
                truncate(&skill.evidence, EVIDENCE_PREVIEW_CHARS)
            ));
        }
    }

    // Preferred skills found (capped)
    let found_preferred: Vec<_> = extracted.preferred_skills.iter().filter(|s| s.found).collect();
    let counted = found_preferred.len().min(PREFERRED_SKILL_MAX_COUNT);
    if counted > 0 {
        let points = counted as i32 * PREFERRED_SKILL_POINTS;
        score += points;
        breakdown.push(format!("+{points} for {counted} preferred skill(s)"));
        for skill in found_preferred.iter().take(PREFERRED_SKILL_MAX_COUNT) {
            breakdown.push(format!("  ✓ {}", skill.name));
        }
    }

    // Highly relevant projects (capped)
    let high_relevance: Vec<_> = extracted
        .projects
        .iter()
        .filter(|p| p.relevance == Relevance::High)
        .collect();
    let counted = high_relevance.len().min(RELEVANT_PROJECT_MAX_COUNT);
    if counted > 0 {
        let points = counted as i32 * RELEVANT_PROJECT_POINTS;
        score += points;
        breakdown.push(format!("+{points} for {counted} highly relevant project(s)"));
        for project in high_relevance.iter().take(RELEVANT_PROJECT_MAX_COUNT) {
            breakdown.push(format!("  ✓ {}", project.title));
        }
    }

    // Deployment proof (capped)
    let proofs = extracted
        .projects
        .iter()
        .filter(|p| p.deployment_proof)
        .count();
    let counted = proofs.min(DEPLOYMENT_PROOF_MAX_COUNT);
    if counted > 0 {
        let points = counted as i32 * DEPLOYMENT_PROOF_POINTS;
        score += points;
        breakdown.push(format!("+{points} for {counted} deployment proof(s)"));
    }

    // Transferable skills (capped)
    let counted = extracted
        .transferable_skills
        .len()
        .min(TRANSFERABLE_SKILL_MAX_COUNT);
    if counted > 0 {
        let points = counted as i32 * TRANSFERABLE_SKILL_POINTS;
        score += points;
        breakdown.push(format!("+{points} for {counted} transferable skill(s)"));
        for skill in extracted
            .transferable_skills
            .iter()
            .take(TRANSFERABLE_SKILL_MAX_COUNT)
        {
            breakdown.push(format!("  ✓ {}", skill.name));
        }
    }

    // Missing required skills (uncapped deduction)
    let missing: Vec<_> = extracted
        .required_skills
        .iter()
        .filter(|s| !s.found)
        .collect();
    if !missing.is_empty() {
        let penalty = missing.len() as i32 * MISSING_REQUIRED_PENALTY;
        score += penalty;
        breakdown.push(format!(
            "{penalty} for {} missing required skill(s)",
            missing.len()
        ));
        for skill in missing.iter().take(REQUIRED_SKILL_MAX_COUNT) {
            breakdown.push(format!("  ✗ Missing: {}", skill.name));
        }
    }

    // Issues (uncapped deductions)
    for issue in &extracted.issues {
        let penalty = match issue.kind {
            IssueKind::Contradiction => CONTRADICTION_PENALTY,
            IssueKind::Ambiguous => AMBIGUOUS_PENALTY,
            IssueKind::WeakEvidence => WEAK_EVIDENCE_PENALTY,
        };
        score += penalty;
        breakdown.push(format!(
            "{penalty} for {}: {}",
            issue.kind.label(),
            truncate(&issue.description, EVIDENCE_PREVIEW_CHARS)
        ));
    }

    let final_score = score.clamp(0, 100) as u32;

    ScoreResult {
        final_score,
        breakdown,
        recommendation: recommendation_for(final_score),
        details: extracted.clone(),
    }
}

fn recommendation_for(score: u32) -> Recommendation {
    if score >= SHORTLIST_THRESHOLD {
        Recommendation::Shortlist
    } else if score >= REVIEW_THRESHOLD {
        Recommendation::Review
    } else {
        Recommendation::Reject
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
