// All LLM prompt constants for the screening pipeline.

/// System prompt for structured CV extraction — enforces JSON-only output.
pub const EXTRACTION_SYSTEM: &str =
    "You are an objective technical recruiter AI. Compare a CV only against \
    the job description. Be neutral, literal, and fully evidence-based. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// CV extraction prompt template. Replace `{job_description}` and `{cv_text}`
/// before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Compare the CV against the job description and extract structured findings.

Return a JSON object with this EXACT schema (no extra fields):
{
  "required_skills": [
    {"name": "Python", "found": true, "evidence": "short CV quote backing the claim"}
  ],
  "preferred_skills": [
    {"name": "Docker", "found": false, "evidence": ""}
  ],
  "projects": [
    {
      "title": "Payments platform",
      "technologies": ["Python", "PostgreSQL"],
      "relevance": "high",
      "deployment_proof": true
    }
  ],
  "transferable_skills": [
    {"name": "Team leadership", "evidence": "short CV quote"}
  ],
  "experience_years": 5,
  "issues": [
    {"kind": "ambiguous", "description": "what is unclear and where"}
  ]
}

Rules:
- Use ONLY text explicitly present in the CV or job description. No assumptions, no invented experience.
- List EVERY required skill from the job description with found true/false. Missing or unclear evidence means found: false with empty evidence.
- Credit transferable skills ONLY when backed by a direct CV quote.
- "relevance" is one of "high", "medium", "low" — how directly the project proves a required responsibility.
- "deployment_proof" is true only for explicit production/deployment evidence.
- "experience_years" is total relevant experience as an integer, or null if not stated.
- "issues" kinds: "contradiction" (claims that conflict), "ambiguous" (vague or unverifiable claims), "weak_evidence" (claims with thin support).
- Do not infer or mention protected attributes.

JOB DESCRIPTION:
{job_description}

CV CONTENT:
{cv_text}"#;

/// System prompt for the per-candidate summary call.
pub const SUMMARY_SYSTEM: &str =
    "You are an objective technical recruiter AI. Write terse, factual, \
    evidence-based candidate summaries. Respond with plain text only.";

/// Summary prompt template. Replace `{extracted_json}`, `{score}` and
/// `{recommendation}` before sending.
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Write a 1-2 sentence recruiter summary of this candidate based only on the structured findings below. State the strongest match and the most significant gap. Do not mention the numeric score.

FINDINGS:
{extracted_json}

SCORE: {score}/100
RECOMMENDATION: {recommendation}"#;
