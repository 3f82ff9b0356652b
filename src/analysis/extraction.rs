//! Extraction payload — the strict schema the model's JSON-shaped output is
//! coerced into immediately after the inference call.
//!
//! The payload is inherently schema-less at the boundary, so every field
//! defaults: absent lists become empty, unknown enum strings collapse into
//! the most conservative variant, and `experience_years` tolerates integers,
//! floats, and numeric strings. Nothing downstream ever sees raw model JSON.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One required or preferred skill checked against the CV.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillCheck {
    pub name: String,
    pub found: bool,
    pub evidence: String,
}

/// How directly a project proves a required responsibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Medium,
    #[default]
    Low,
}

impl<'de> Deserialize<'de> for Relevance {
    // Unknown strings coerce to Low rather than failing the whole payload.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Relevance::High,
            "medium" => Relevance::Medium,
            _ => Relevance::Low,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub title: String,
    pub technologies: Vec<String>,
    pub relevance: Relevance,
    pub deployment_proof: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferableSkill {
    pub name: String,
    pub evidence: String,
}

/// Kinds of evidence problems the model can flag. Each carries a fixed
/// deduction in the scorer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Contradiction,
    #[default]
    Ambiguous,
    WeakEvidence,
}

impl IssueKind {
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::Contradiction => "contradiction",
            IssueKind::Ambiguous => "ambiguous",
            IssueKind::WeakEvidence => "weak_evidence",
        }
    }
}

impl<'de> Deserialize<'de> for IssueKind {
    // Unknown kinds coerce to Ambiguous, the mildest generic bucket.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "contradiction" => IssueKind::Contradiction,
            "weak_evidence" | "weak evidence" => IssueKind::WeakEvidence,
            _ => IssueKind::Ambiguous,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub kind: IssueKind,
    pub description: String,
}

/// Structured facts the model pulled from one CV against one job description.
/// Produced once per model call and never retried; a failed call yields
/// `ExtractedData::default()` at the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedData {
    pub required_skills: Vec<SkillCheck>,
    pub preferred_skills: Vec<SkillCheck>,
    pub projects: Vec<Project>,
    pub transferable_skills: Vec<TransferableSkill>,
    #[serde(deserialize_with = "lenient_years")]
    pub experience_years: Option<u32>,
    pub issues: Vec<Issue>,
}

/// Accepts an integer, a float, a numeric-leading string ("5 years"), or
/// null. Anything else coerces to None instead of failing.
fn lenient_years<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u32),
        Some(Value::String(s)) => leading_integer(&s),
        _ => None,
    })
}

fn leading_integer(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Parses the model's raw response into `ExtractedData`, stripping markdown
/// code fences and any prose around the JSON object first.
pub fn parse_extraction(raw: &str) -> Result<ExtractedData, serde_json::Error> {
    let text = strip_json_fences(raw);
    let text = isolate_json_object(text);
    serde_json::from_str(text)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Narrows to the outermost `{...}` span when the model pads the JSON with
/// prose despite the system prompt.
fn isolate_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}
