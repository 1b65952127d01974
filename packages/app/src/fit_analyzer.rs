//! LLM resume-fit analyzer (C7, app-level): wraps the generic streaming
//! client with the prompt shape, key pool, and response coercion specific
//! to scoring one job against a cached resume blob.

use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tokio::sync::OnceCell;

use fetcher::html;
use llm_client::{parse_json_response, truncate_to_char_boundary, ChatRequest, KeyPool, LlmClient, StreamConfig};

use crate::domain::canonical_job::CanonicalJob;
use crate::domain::fit_analysis::FitAnalysis;
use crate::domain::types::Verdict;

const KEY_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_DESCRIPTION_CHARS: usize = 8_000;
const TRUNCATION_MARKER: &str = "\n\n[...truncated...]";

const SYSTEM_PROMPT: &str = "You are a career coach evaluating how well a candidate's resume fits a specific job posting. \
Respond with ONLY a JSON object, no prose before or after it, matching this schema: \
{\"fitScore\": number 0-100, \"verdict\": \"strong\"|\"moderate\"|\"weak\"|\"stretch\", \"summary\": string, \
\"strengths\": string[], \"gaps\": string[], \"matchedSkills\": string[], \"missingSkills\": string[], \"bonusSkills\": string[], \
\"experienceLevelMatch\": string, \"domainRelevance\": string, \"recommendation\": string, \
\"tailoringTips\": string[], \"coverLetterPoints\": string[]}.";

static RESUME: OnceCell<String> = OnceCell::const_new();

/// Load and cache the resume blob from disk. Subsequent calls return the
/// cached copy; the file is only ever read once per process.
async fn load_resume(resume_path: &str) -> anyhow::Result<&'static str> {
    RESUME
        .get_or_try_init(|| async { tokio::fs::read_to_string(resume_path).await.map_err(anyhow::Error::from) })
        .await
        .map(String::as_str)
}

/// Strip HTML, decode the common named/numeric entities, collapse
/// whitespace, and truncate to the contract's 8,000-character ceiling.
fn clean_description(html_body: &str) -> String {
    let text = html::strip_tags(html_body);
    let decoded = decode_entities(&text);
    let collapsed = Regex::new(r"\s+").unwrap().replace_all(&decoded, " ").trim().to_string();

    if collapsed.len() <= MAX_DESCRIPTION_CHARS {
        collapsed
    } else {
        let truncated = truncate_to_char_boundary(&collapsed, MAX_DESCRIPTION_CHARS);
        format!("{truncated}{TRUNCATION_MARKER}")
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&mdash;", "\u{2014}")
        .replace("&ndash;", "\u{2013}")
}

fn build_user_prompt(job: &CanonicalJob, description: &str, resume: &str) -> String {
    format!(
        "RESUME:\n{resume}\n\nJOB POSTING:\nTitle: {}\nCompany: {}\n\nDescription:\n{description}",
        job.title, job.company
    )
}

/// Analyze one job's fit against the cached resume. Returns `None` on any
/// total failure (missing key pool, exhausted retries, unparseable
/// response) — the pipeline proceeds without analysis in that case.
pub async fn analyze(
    job: &CanonicalJob,
    job_description_html: &str,
    resume_path: &str,
    primary_keys: &KeyPool,
    primary_base_url: &str,
    model: &str,
    fallback: Option<(&str, &str)>,
) -> Option<FitAnalysis> {
    let resume = match load_resume(resume_path).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, resume_path, "could not load resume, skipping fit analysis");
            return None;
        }
    };

    let description = clean_description(job_description_html);
    let user_prompt = build_user_prompt(job, &description, resume);
    let request = ChatRequest::fit_analysis(model, SYSTEM_PROMPT, user_prompt);
    let config = StreamConfig::default();

    let guard = primary_keys.acquire(KEY_ACQUIRE_TIMEOUT).await;
    let primary_result = match &guard {
        Some(guard) => {
            let client = LlmClient::new(primary_base_url, guard.key());
            Some(client.stream_with_retry(request.clone(), &config).await)
        }
        None => None,
    };
    if let Some(guard) = guard {
        guard.release().await;
    }

    let (content, provider) = match primary_result {
        Some(Ok(completion)) => (completion.content, "primary"),
        _ => match fallback {
            Some((fallback_base_url, fallback_key)) => {
                let client = LlmClient::new(fallback_base_url, fallback_key);
                match client.stream_fallback(request, &config).await {
                    Ok(completion) => (completion.content, "fallback"),
                    Err(e) => {
                        tracing::warn!(error = %e, "fallback provider also failed fit analysis");
                        return None;
                    }
                }
            }
            None => {
                tracing::warn!("primary provider failed fit analysis and no fallback is configured");
                return None;
            }
        },
    };

    let parsed = match parse_json_response(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "could not parse fit analysis response as JSON");
            return None;
        }
    };

    coerce_fit_analysis(job, &parsed, provider, model)
}

/// Apply the response-parsing contract: required fields present or `None`,
/// score clamped, missing arrays/strings defaulted.
fn coerce_fit_analysis(job: &CanonicalJob, value: &Value, provider: &str, model: &str) -> Option<FitAnalysis> {
    let raw_score = value.get("fitScore")?.as_f64()?;
    let verdict: Verdict = value.get("verdict")?.as_str()?.parse().ok()?;
    let summary = value.get("summary")?.as_str()?.to_string();

    let fit_score = raw_score.round().clamp(0.0, 100.0) as i32;

    let mut analysis = FitAnalysis::new(job.id, fit_score, verdict, summary, provider, model);
    analysis.strengths = string_array(value, "strengths");
    analysis.gaps = string_array(value, "gaps");
    analysis.matched_skills = string_array(value, "matchedSkills");
    analysis.missing_skills = string_array(value, "missingSkills");
    analysis.bonus_skills = string_array(value, "bonusSkills");
    analysis.tailoring_tips = string_array(value, "tailoringTips");
    analysis.cover_letter_points = string_array(value, "coverLetterPoints");
    analysis.experience_level_match = string_field(value, "experienceLevelMatch", "unknown");
    analysis.domain_relevance = string_field(value, "domainRelevance", "");
    analysis.recommendation = string_field(value, "recommendation", "");

    Some(analysis)
}

fn string_array(value: &Value, key: &str) -> Value {
    value.get(key).filter(|v| v.is_array()).cloned().unwrap_or_else(|| Value::Array(vec![]))
}

fn string_field(value: &Value, key: &str, default: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{PostedAtConfidence, TitleBucket, WorkMode};

    fn sample_job() -> CanonicalJob {
        CanonicalJob::new(
            None,
            "greenhouse",
            "Senior Engineer",
            "Acme",
            "https://example.com/1",
            "hash",
            "fingerprint",
            WorkMode::Remote,
            TitleBucket::Include,
            PostedAtConfidence::High,
        )
    }

    #[test]
    fn cleans_and_decodes_description() {
        let cleaned = clean_description("<p>R&amp;D   team &mdash; join us</p>");
        assert_eq!(cleaned, "R&D team \u{2014} join us");
    }

    #[test]
    fn truncates_long_description_with_marker() {
        let long = "a".repeat(9_000);
        let cleaned = clean_description(&long);
        assert!(cleaned.ends_with(TRUNCATION_MARKER));
        assert!(cleaned.len() < 9_000);
    }

    #[test]
    fn coerces_minimal_valid_response() {
        let job = sample_job();
        let value: Value = serde_json::from_str(r#"{"fitScore": 142, "verdict": "strong", "summary": "Great fit"}"#).unwrap();
        let analysis = coerce_fit_analysis(&job, &value, "primary", "gpt-4o-mini").unwrap();
        assert_eq!(analysis.fit_score, 100);
        assert_eq!(analysis.experience_level_match, "unknown");
        assert_eq!(analysis.strengths, serde_json::json!([]));
    }

    #[test]
    fn negative_score_clamps_to_zero() {
        let job = sample_job();
        let value: Value = serde_json::from_str(r#"{"fitScore": -10, "verdict": "weak", "summary": "Not a fit"}"#).unwrap();
        let analysis = coerce_fit_analysis(&job, &value, "primary", "gpt-4o-mini").unwrap();
        assert_eq!(analysis.fit_score, 0);
    }

    #[test]
    fn missing_required_field_returns_none() {
        let job = sample_job();
        let value: Value = serde_json::from_str(r#"{"fitScore": 80, "verdict": "strong"}"#).unwrap();
        assert!(coerce_fit_analysis(&job, &value, "primary", "gpt-4o-mini").is_none());
    }

    #[test]
    fn invalid_verdict_returns_none() {
        let job = sample_job();
        let value: Value = serde_json::from_str(r#"{"fitScore": 80, "verdict": "excellent", "summary": "x"}"#).unwrap();
        assert!(coerce_fit_analysis(&job, &value, "primary", "gpt-4o-mini").is_none());
    }

    #[test]
    fn preserves_provided_arrays() {
        let job = sample_job();
        let value: Value = serde_json::from_str(
            r#"{"fitScore": 70, "verdict": "moderate", "summary": "ok", "strengths": ["Rust", "Postgres"]}"#,
        )
        .unwrap();
        let analysis = coerce_fit_analysis(&job, &value, "primary", "gpt-4o-mini").unwrap();
        assert_eq!(analysis.strengths, serde_json::json!(["Rust", "Postgres"]));
    }
}
