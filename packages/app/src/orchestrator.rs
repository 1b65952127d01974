//! Pipeline orchestrator (C8): one invocation, one `RunLog`. Drives the
//! connector fleet, normalizes and deduplicates each raw posting, scores
//! and persists the survivors, runs fit analysis on the ones that clear
//! the AI threshold, and dispatches alerts for the ones that clear the
//! notification bar. A single job's failure is logged and counted, never
//! allowed to abort the run.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};
use sqlx::PgPool;

use fetcher::{batch_fetch, BatchOptions, RateLimitedFetcher};
use llm_client::KeyPool;

use crate::connectors::{Connector, ConnectorResult, RunConnectorOptions};
use crate::dedup::{self, DedupOutcome, FuzzyIndex};
use crate::domain::alternate_url::AlternateUrl;
use crate::domain::canonical_job::{CanonicalJob, CanonicalJobId};
use crate::domain::connector_checkpoint::ConnectorCheckpoint;
use crate::domain::discovered_board::DiscoveredBoard;
use crate::domain::fit_analysis::FitAnalysis;
use crate::domain::job_duplicate::JobDuplicate;
use crate::domain::raw_job::RawJob;
use crate::domain::run_log::{RunLog, RunLogId};
use crate::domain::source_metric::SourceMetric;
use crate::domain::types::{DedupMethod, ScoreBand, TitleBucket};
use crate::fit_analyzer;
use crate::normalizer;
use crate::notifier::Notifier;
use crate::rules::{Rules, SourceDef};
use crate::scoring::{self, ScoringInput};

const FUZZY_INDEX_WINDOW_DAYS: i64 = 7;
const FAILURE_ALERT_EVERY: i32 = 3;

/// The eight platform connectors always belong to the `ats` family
/// regardless of how `sources.json` tags them.
const ATS_PLATFORM_TYPES: &[&str] = &[
    "greenhouse",
    "lever",
    "ashby",
    "workable",
    "genericCareersPage",
    "icims",
    "smartrecruiters",
    "successfactors",
];

fn family_of(def: &SourceDef) -> &'static str {
    if ATS_PLATFORM_TYPES.contains(&def.source_type.as_str()) {
        "ats"
    } else {
        match def.category.as_deref() {
            Some("underground") => "underground",
            _ => "aggregator",
        }
    }
}

fn family_included(family: &str, options: &RunConnectorOptions) -> bool {
    match family {
        "ats" => options.include_ats,
        "underground" => options.include_underground,
        _ => options.include_aggregators,
    }
}

#[derive(Debug, Clone, Default)]
struct SourceAccumulator {
    jobs_found: i32,
    jobs_new: i32,
    jobs_duplicate: i32,
    parse_failures: i32,
    rate_limit_hits: i32,
    response_time_total_ms: i64,
    response_time_samples: i32,
    success_count: i32,
    attempt_count: i32,
}

/// LLM provider configuration the fit analyzer needs, threaded through
/// from `AppConfig` so the orchestrator stays free of env-var reads.
pub struct LlmProviderConfig {
    pub resume_path: String,
    pub primary_keys: KeyPool,
    pub primary_base_url: String,
    pub model: String,
    pub fallback: Option<(String, String)>,
}

/// Everything one pipeline run needs that outlives a single invocation:
/// the rule set, the connector registry, the outbound fetcher, and the
/// collaborators the run reports through.
pub struct Pipeline<'a> {
    pub pool: PgPool,
    pub rules: &'a Rules,
    pub fetcher: &'a RateLimitedFetcher,
    pub connectors: &'a HashMap<String, Box<dyn Connector>>,
    pub notifier: &'a dyn Notifier,
    pub llm: &'a LlmProviderConfig,
    pub timezone: String,
    pub ai_analysis_min_score: i32,
}

enum ProcessOutcome {
    Rejected,
    Duplicate,
    Inserted {
        job: CanonicalJob,
        description: String,
        enqueue_ai: bool,
        enqueue_alert: bool,
    },
}

impl<'a> Pipeline<'a> {
    pub async fn run(&self, run_type: &str, options: RunConnectorOptions, is_backfill: bool) -> anyhow::Result<RunLogId> {
        let run_id = RunLog::create(run_type, is_backfill, &self.pool).await?;
        let mut errors: Vec<String> = Vec::new();

        let mut boards_by_platform: HashMap<&str, Vec<DiscoveredBoard>> = HashMap::new();
        for platform in ATS_PLATFORM_TYPES {
            match DiscoveredBoard::find_active_by_platform(platform, &self.pool).await {
                Ok(boards) => {
                    boards_by_platform.insert(platform, boards);
                }
                Err(e) => errors.push(format!("loading discovered boards for {platform}: {e}")),
            }
        }

        let mut accumulators: HashMap<String, SourceAccumulator> = HashMap::new();
        let mut all_raw_jobs: Vec<RawJob> = Vec::new();

        for (name, def) in &self.rules.sources.sources {
            if !def.enabled {
                continue;
            }
            let family = family_of(def);
            if !family_included(family, &options) {
                continue;
            }
            let Some(connector) = self.connectors.get(name) else {
                errors.push(format!("no connector registered for source \"{name}\""));
                continue;
            };

            let companies = self.companies_for(name, def, family, &boards_by_platform);
            let batch_opts = BatchOptions {
                batch_size: def.rate_limiting.batch_size.unwrap_or(5),
                delay_between_requests_ms: def.rate_limiting.delay_between_requests_ms.unwrap_or(0),
                batch_pause_ms: def.rate_limiting.batch_pause_ms.unwrap_or(0),
            };

            let results: Vec<ConnectorResult> = batch_fetch(
                companies,
                |company| async move { connector.fetch(&company, def, self.fetcher).await },
                &batch_opts,
            )
            .await;

            for result in results {
                self.record_connector_result(result, &mut accumulators, &mut all_raw_jobs, &mut errors).await;
            }
        }

        let recent_active = CanonicalJob::find_recent_active(FUZZY_INDEX_WINDOW_DAYS, &self.pool)
            .await
            .unwrap_or_default();
        let fuzzy_index = FuzzyIndex::build(&recent_active);

        let mut jobs_new = 0i32;
        let mut jobs_duplicate = 0i32;
        let mut jobs_rejected = 0i32;
        let mut enqueued_for_ai: Vec<(CanonicalJob, String)> = Vec::new();
        let mut enqueued_for_alert: Vec<CanonicalJob> = Vec::new();

        for raw in all_raw_jobs {
            let source = raw.source.clone();
            let accumulator = accumulators.entry(source.clone()).or_default();

            match self.process_raw_job(raw, &fuzzy_index, is_backfill).await {
                Ok(ProcessOutcome::Rejected) => {
                    jobs_rejected += 1;
                }
                Ok(ProcessOutcome::Duplicate) => {
                    jobs_duplicate += 1;
                    accumulator.jobs_duplicate += 1;
                }
                Ok(ProcessOutcome::Inserted {
                    job,
                    description,
                    enqueue_ai,
                    enqueue_alert,
                }) => {
                    jobs_new += 1;
                    accumulator.jobs_new += 1;
                    if enqueue_alert {
                        enqueued_for_alert.push(job.clone());
                    }
                    if enqueue_ai {
                        enqueued_for_ai.push((job, description));
                    }
                }
                Err(e) => {
                    errors.push(format!("processing raw job from {source}: {e}"));
                    accumulator.parse_failures += 1;
                }
            }
        }
        drop(fuzzy_index);

        let concurrency = self.llm.primary_keys.size().max(1);
        let analyses: Vec<(CanonicalJobId, FitAnalysis)> = stream::iter(enqueued_for_ai)
            .map(|(job, description)| async move {
                let analysis = fit_analyzer::analyze(
                    &job,
                    &description,
                    &self.llm.resume_path,
                    &self.llm.primary_keys,
                    &self.llm.primary_base_url,
                    &self.llm.model,
                    self.llm.fallback.as_ref().map(|(u, k)| (u.as_str(), k.as_str())),
                )
                .await;
                (job.id, analysis)
            })
            .buffer_unordered(concurrency)
            .filter_map(|(id, analysis)| async move { analysis.map(|a| (id, a)) })
            .collect()
            .await;

        let mut analysis_by_job: HashMap<CanonicalJobId, FitAnalysis> = analyses.into_iter().collect();
        for (_, analysis) in analysis_by_job.iter() {
            if let Err(e) = analysis.upsert(&self.pool).await {
                errors.push(format!("persisting fit analysis: {e}"));
            }
        }

        let mut alerts_sent = 0i32;
        for job in &enqueued_for_alert {
            let analysis = analysis_by_job.remove(&job.id);
            match self.notifier.send_alert(job, analysis.as_ref()).await {
                Ok(()) => alerts_sent += 1,
                Err(e) => errors.push(format!("sending alert for job {}: {e}", job.id)),
            }
        }

        let today = chrono::Utc::now().date_naive();
        for (source, acc) in &accumulators {
            if let Err(e) = SourceMetric::additive_upsert(
                source,
                today,
                acc.jobs_found,
                acc.jobs_new,
                acc.jobs_duplicate,
                acc.parse_failures,
                acc.rate_limit_hits,
                acc.response_time_total_ms,
                acc.response_time_samples,
                acc.success_count,
                acc.attempt_count,
                &self.pool,
            )
            .await
            {
                errors.push(format!("committing source metrics for {source}: {e}"));
            }
        }

        let jobs_found_total: i32 = accumulators.values().map(|a| a.jobs_found).sum();
        let status = if errors.is_empty() { "completed" } else { "completed_with_errors" };
        RunLog::finish(
            run_id,
            status,
            jobs_found_total,
            jobs_new,
            jobs_duplicate,
            jobs_rejected,
            alerts_sent,
            &errors,
            &self.pool,
        )
        .await?;

        Ok(run_id)
    }

    /// Re-run normalize/dedup/score/insert over `raw_jobs` already captured
    /// on disk, skipping the connector-fetch phase entirely. Used by the
    /// `replay` binary (re-processing one source/date after a rule change)
    /// and by `backfill` (seeding history without live alerts/AI spend,
    /// hence `is_backfill = true` forcing both off in `process_raw_job`).
    pub async fn replay(&self, run_type: &str, raw_jobs: Vec<RawJob>, is_backfill: bool) -> anyhow::Result<RunLogId> {
        let run_id = RunLog::create(run_type, is_backfill, &self.pool).await?;
        let mut errors: Vec<String> = Vec::new();

        let recent_active = CanonicalJob::find_recent_active(FUZZY_INDEX_WINDOW_DAYS, &self.pool)
            .await
            .unwrap_or_default();
        let fuzzy_index = FuzzyIndex::build(&recent_active);

        let mut jobs_new = 0i32;
        let mut jobs_duplicate = 0i32;
        let mut jobs_rejected = 0i32;

        for raw in raw_jobs {
            let source = raw.source.clone();
            match self.process_raw_job(raw, &fuzzy_index, is_backfill).await {
                Ok(ProcessOutcome::Rejected) => jobs_rejected += 1,
                Ok(ProcessOutcome::Duplicate) => jobs_duplicate += 1,
                Ok(ProcessOutcome::Inserted { .. }) => jobs_new += 1,
                Err(e) => errors.push(format!("replaying raw job from {source}: {e}")),
            }
        }
        drop(fuzzy_index);

        let status = if errors.is_empty() { "completed" } else { "completed_with_errors" };
        RunLog::finish(run_id, status, jobs_new + jobs_duplicate + jobs_rejected, jobs_new, jobs_duplicate, jobs_rejected, 0, &errors, &self.pool).await?;

        Ok(run_id)
    }

    fn companies_for(
        &self,
        name: &str,
        def: &SourceDef,
        family: &str,
        boards_by_platform: &HashMap<&str, Vec<DiscoveredBoard>>,
    ) -> Vec<String> {
        if family != "ats" {
            return vec![name.to_string()];
        }

        let mut companies: Vec<String> = boards_by_platform
            .get(def.source_type.as_str())
            .into_iter()
            .flatten()
            .map(|b| b.board_slug.clone())
            .collect();
        companies.extend(self.rules.companies.seeds_for(&def.source_type).iter().cloned());
        companies.sort();
        companies.dedup();
        companies
    }

    async fn record_connector_result(
        &self,
        result: ConnectorResult,
        accumulators: &mut HashMap<String, SourceAccumulator>,
        all_raw_jobs: &mut Vec<RawJob>,
        errors: &mut Vec<String>,
    ) {
        let accumulator = accumulators.entry(result.source.clone()).or_default();
        accumulator.attempt_count += 1;
        accumulator.response_time_total_ms += result.response_time_ms as i64;
        accumulator.response_time_samples += 1;
        if result.rate_limited {
            accumulator.rate_limit_hits += 1;
        }

        if result.success {
            accumulator.success_count += 1;
            accumulator.jobs_found += result.jobs.len() as i32;
            if let Err(e) = ConnectorCheckpoint::record_success(&result.source, &result.company, &self.pool).await {
                errors.push(format!("recording connector success for {}/{}: {e}", result.source, result.company));
            }
            all_raw_jobs.extend(result.jobs);
        } else {
            accumulator.parse_failures += 1;
            errors.push(format!(
                "{}/{}: {}",
                result.source,
                result.company,
                result.error.as_deref().unwrap_or("unknown error")
            ));
            match ConnectorCheckpoint::record_failure(&result.source, &result.company, &self.pool).await {
                Ok(count) if count >= FAILURE_ALERT_EVERY && count % FAILURE_ALERT_EVERY == 0 => {
                    let message = format!(
                        "{} consecutive failures fetching {} for {}",
                        count, result.source, result.company
                    );
                    let _ = self.notifier.send_system_alert(&message).await;
                }
                Ok(_) => {}
                Err(e) => errors.push(format!("recording connector failure for {}/{}: {e}", result.source, result.company)),
            }
        }
    }

    async fn process_raw_job(&self, raw: RawJob, fuzzy_index: &FuzzyIndex, is_backfill: bool) -> anyhow::Result<ProcessOutcome> {
        let raw_job_id = raw.insert(&self.pool).await?;
        let fields = normalizer::normalize(&raw, self.rules, &self.timezone);

        if fields.title_bucket == TitleBucket::Reject {
            return Ok(ProcessOutcome::Rejected);
        }

        let existing_by_url = CanonicalJob::find_by_url_hash(&fields.url_hash, &self.pool).await?;
        let city = fields.city.clone().unwrap_or_default();

        let outcome = dedup::check_url_hash(existing_by_url.as_ref())
            .or_else(|| dedup::check_fuzzy(fuzzy_index, &fields.company, &raw.title, &city));
        let outcome = match outcome {
            Some(o) => Some(o),
            None => {
                let content_matches = CanonicalJob::find_by_content_fingerprint_active(&fields.content_fingerprint, &self.pool).await?;
                dedup::check_content_fingerprint(&content_matches)
            }
        };

        if let Some(DedupOutcome::Duplicate { existing_job_id, .. }) = outcome {
            if let Ok(existing) = CanonicalJob::find_by_id(existing_job_id, &self.pool).await {
                if existing.source != raw.source {
                    let _ = AlternateUrl::insert_ignore_conflict(existing_job_id, &raw.source, &raw.url, &self.pool).await;
                }
            }
            return Ok(ProcessOutcome::Duplicate);
        }

        let mut job = CanonicalJob::new(
            Some(raw_job_id),
            &raw.source,
            &raw.title,
            &fields.company,
            &raw.url,
            &fields.url_hash,
            &fields.content_fingerprint,
            fields.work_mode,
            fields.title_bucket,
            fields.posted_at_confidence,
        );
        job.city = fields.city.clone();
        job.province = fields.province.clone();
        job.location_tier = fields.location_tier.clone();
        job.posted_at = fields.posted_at;
        job.is_backfill = is_backfill;

        let mut potential_edge = None;
        match outcome {
            Some(DedupOutcome::PotentialDuplicate { existing_job_id, similarity }) => {
                job.is_potential_duplicate = true;
                potential_edge = Some((existing_job_id, similarity));
            }
            Some(DedupOutcome::Repost { original_post_date }) => {
                job.is_reposted = true;
                job.original_post_date = Some(original_post_date);
            }
            Some(DedupOutcome::Duplicate { .. }) => unreachable!("handled above"),
            Some(DedupOutcome::Unique) | None => {}
        }

        let breakdown = scoring::score(
            &ScoringInput {
                posted_at: job.posted_at,
                first_seen_at: job.first_seen_at,
                posted_at_confidence: job.posted_at_confidence,
                location_tier: job.location_tier.as_deref(),
                work_mode: job.work_mode,
            },
            self.rules,
        );
        job.score = breakdown.total;
        job.score_freshness = breakdown.freshness;
        job.score_location = breakdown.location;
        job.score_mode = breakdown.mode;
        job.score_band = breakdown.band;

        job.insert(&self.pool).await?;

        if let Some((existing_job_id, similarity)) = potential_edge {
            let _ = JobDuplicate::insert(job.id, existing_job_id, DedupMethod::FuzzyKey, similarity as f32, true, &self.pool).await;
        }

        let enqueue_ai = job.score >= self.ai_analysis_min_score && !is_backfill;
        let enqueue_alert = job.score_band == ScoreBand::TopPriority && job.title_bucket == TitleBucket::Include && !is_backfill;
        let description = raw.content.clone();

        Ok(ProcessOutcome::Inserted {
            job,
            description,
            enqueue_ai,
            enqueue_alert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::sources::RateLimiting;

    fn def(source_type: &str, category: Option<&str>) -> SourceDef {
        SourceDef {
            source_type: source_type.to_string(),
            enabled: true,
            schedule: None,
            endpoint_template: None,
            url_template: None,
            rate_limiting: RateLimiting::default(),
            timeout_ms: 30_000,
            queries: vec![],
            category: category.map(str::to_string),
            url_allow: vec![],
            url_deny: vec![],
        }
    }

    #[test]
    fn ats_platform_types_always_classify_as_ats() {
        assert_eq!(family_of(&def("greenhouse", Some("aggregator"))), "ats");
        assert_eq!(family_of(&def("icims", None)), "ats");
    }

    #[test]
    fn search_aggregator_defaults_to_aggregator_family() {
        assert_eq!(family_of(&def("searchAggregator", None)), "aggregator");
        assert_eq!(family_of(&def("searchAggregator", Some("underground"))), "underground");
    }

    #[test]
    fn family_included_respects_run_connector_options() {
        let options = RunConnectorOptions {
            include_ats: true,
            include_aggregators: false,
            include_underground: false,
        };
        assert!(family_included("ats", &options));
        assert!(!family_included("aggregator", &options));
        assert!(!family_included("underground", &options));
    }
}
