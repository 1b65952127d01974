//! The notifier contract: the orchestrator depends only on this trait, not
//! on any concrete chat platform SDK (§1 treats the transport itself as an
//! external collaborator). `LoggingNotifier` is the collaborator used by
//! tests and by any deployment that hasn't wired a transport yet; it
//! honors `DRY_RUN` by only ever logging. `TelegramNotifier` is a minimal
//! real transport against the two-bot contract described in §6 (one bot
//! for job alerts, one for system/log alerts), with inline action buttons
//! on job alerts and a retry-queue fallback on transient send failure.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::canonical_job::CanonicalJob;
use crate::domain::fit_analysis::FitAnalysis;
use crate::domain::retry_queue::RetryQueueItem;
use crate::domain::source_metric::SourceMetric;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alert(&self, job: &CanonicalJob, analysis: Option<&FitAnalysis>) -> anyhow::Result<()>;
    async fn send_system_alert(&self, message: &str) -> anyhow::Result<()>;
    /// A morning/evening digest: every job the slot's window selected,
    /// however many that is (including zero).
    async fn send_digest(&self, kind: &str, jobs: &[CanonicalJob]) -> anyhow::Result<()>;
    /// The weekly per-source metrics summary.
    async fn send_weekly_report(&self, metrics: &[SourceMetric]) -> anyhow::Result<()>;
}

pub struct LoggingNotifier {
    pub dry_run: bool,
}

impl LoggingNotifier {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_alert(&self, job: &CanonicalJob, analysis: Option<&FitAnalysis>) -> anyhow::Result<()> {
        let fit_score = analysis.map(|a| a.fit_score);
        if self.dry_run {
            tracing::info!(job_id = %job.id, title = %job.title, company = %job.company, fit_score, "dry run: would send job alert");
        } else {
            tracing::info!(job_id = %job.id, title = %job.title, company = %job.company, fit_score, "sending job alert");
        }
        Ok(())
    }

    async fn send_system_alert(&self, message: &str) -> anyhow::Result<()> {
        if self.dry_run {
            tracing::warn!(message, "dry run: would send system alert");
        } else {
            tracing::warn!(message, "sending system alert");
        }
        Ok(())
    }

    async fn send_digest(&self, kind: &str, jobs: &[CanonicalJob]) -> anyhow::Result<()> {
        let count = jobs.len();
        if self.dry_run {
            tracing::info!(kind, count, "dry run: would send digest");
        } else {
            tracing::info!(kind, count, "sending digest");
        }
        Ok(())
    }

    async fn send_weekly_report(&self, metrics: &[SourceMetric]) -> anyhow::Result<()> {
        let sources = metrics.len();
        if self.dry_run {
            tracing::info!(sources, "dry run: would send weekly report");
        } else {
            tracing::info!(sources, "sending weekly report");
        }
        Ok(())
    }
}

/// Which bot a message should go out through: `jobs` carries alerts and
/// digests, `logs` carries system alerts. Matches `RetryQueueItem::bot_type`.
const BOT_JOBS: &str = "jobs";
const BOT_LOGS: &str = "logs";

/// Telegram-style bot transport: job alerts go out with an inline keyboard
/// (`Applied` / `Skip`, matching the `/api/telegram/callback` contract's
/// `applied_<id>`/`skip_<id>` actions); everything else is plain text. A
/// send that fails is enqueued to `RetryQueueItem` rather than dropped —
/// the next scheduled flush (`retry-alerts`) re-sends it.
pub struct TelegramNotifier {
    http: reqwest::Client,
    pool: sqlx::PgPool,
    jobs_bot_token: Option<String>,
    jobs_chat_id: Option<String>,
    logs_bot_token: Option<String>,
    logs_chat_id: Option<String>,
    dry_run: bool,
}

impl TelegramNotifier {
    pub fn new(
        pool: sqlx::PgPool,
        jobs_bot_token: Option<String>,
        jobs_chat_id: Option<String>,
        logs_bot_token: Option<String>,
        logs_chat_id: Option<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            pool,
            jobs_bot_token,
            jobs_chat_id,
            logs_bot_token,
            logs_chat_id,
            dry_run,
        }
    }

    /// Send one message through `bot_type`'s configured token/chat, with an
    /// optional inline keyboard. Absent token/chat means that channel is
    /// skipped and only logged, per §6's env-knob contract. A configured
    /// but failing send is enqueued to the retry queue.
    async fn send(&self, bot_type: &str, text: &str, reply_markup: Option<serde_json::Value>) -> anyhow::Result<()> {
        let (token, chat_id) = match bot_type {
            BOT_JOBS => (&self.jobs_bot_token, &self.jobs_chat_id),
            _ => (&self.logs_bot_token, &self.logs_chat_id),
        };

        let (Some(token), Some(chat_id)) = (token, chat_id) else {
            tracing::info!(bot_type, text, "no bot configured for this channel, message only logged");
            return Ok(());
        };

        if self.dry_run {
            tracing::info!(bot_type, text, "dry run: would send via telegram");
            return Ok(());
        }

        let mut body = json!({ "chat_id": chat_id, "text": text, "parse_mode": "HTML" });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup;
        }

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let result = self.http.post(&url).json(&body).send().await;

        match result {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => {
                let status = resp.status();
                tracing::warn!(bot_type, %status, "telegram send failed, enqueuing retry");
                RetryQueueItem::enqueue(text, bot_type, &self.pool).await?;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(bot_type, error = %e, "telegram send errored, enqueuing retry");
                RetryQueueItem::enqueue(text, bot_type, &self.pool).await?;
                Ok(())
            }
        }
    }

    fn job_alert_text(job: &CanonicalJob, analysis: Option<&FitAnalysis>) -> String {
        let fit_line = analysis
            .map(|a| format!("\nFit: {}/100 ({})", a.fit_score, a.verdict))
            .unwrap_or_default();
        format!(
            "<b>{}</b> at {}\n{} · {}{}\n{}",
            job.title,
            job.company,
            job.score_band,
            job.city.as_deref().unwrap_or("location unknown"),
            fit_line,
            job.url,
        )
    }

    fn job_alert_keyboard(job: &CanonicalJob) -> serde_json::Value {
        json!({
            "inline_keyboard": [[
                { "text": "Applied", "callback_data": format!("applied_{}", job.id) },
                { "text": "Skip", "callback_data": format!("skip_{}", job.id) },
            ]]
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_alert(&self, job: &CanonicalJob, analysis: Option<&FitAnalysis>) -> anyhow::Result<()> {
        let text = Self::job_alert_text(job, analysis);
        let keyboard = Self::job_alert_keyboard(job);
        self.send(BOT_JOBS, &text, Some(keyboard)).await
    }

    async fn send_system_alert(&self, message: &str) -> anyhow::Result<()> {
        self.send(BOT_LOGS, message, None).await
    }

    async fn send_digest(&self, kind: &str, jobs: &[CanonicalJob]) -> anyhow::Result<()> {
        if jobs.is_empty() {
            return self.send(BOT_JOBS, &format!("{kind} digest: nothing new"), None).await;
        }
        let mut text = format!("<b>{kind} digest</b> — {} jobs\n\n", jobs.len());
        for job in jobs.iter().take(20) {
            text.push_str(&format!("• {} at {} ({})\n", job.title, job.company, job.score_band));
        }
        self.send(BOT_JOBS, &text, None).await
    }

    async fn send_weekly_report(&self, metrics: &[SourceMetric]) -> anyhow::Result<()> {
        let mut text = String::from("<b>Weekly report</b>\n\n");
        for m in metrics {
            text.push_str(&format!(
                "{}: {} found, {} new, {:.0}% success\n",
                m.source,
                m.jobs_found,
                m.jobs_new,
                m.success_rate() * 100.0
            ));
        }
        self.send(BOT_LOGS, &text, None).await
    }
}

/// Flush every due retry-queue item. Successes are removed; failures bump
/// the item's retry count and exponential backoff for the next flush.
pub async fn flush_retry_queue(notifier: &TelegramNotifier, pool: &sqlx::PgPool) -> anyhow::Result<(u32, u32)> {
    let due = RetryQueueItem::due(pool).await?;
    let mut sent = 0u32;
    let mut failed = 0u32;

    for item in due {
        let result = notifier.send(&item.bot_type, &item.message, None).await;
        match result {
            Ok(()) => {
                RetryQueueItem::remove(item.id, pool).await?;
                sent += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, item_id = %item.id, "retry-queue flush attempt failed");
                RetryQueueItem::increment_retry(item.id, pool).await?;
                failed += 1;
            }
        }
    }

    Ok((sent, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{PostedAtConfidence, ScoreBand, TitleBucket, WorkMode};

    fn sample_job() -> CanonicalJob {
        let mut job = CanonicalJob::new(
            None,
            "greenhouse",
            "Engineer",
            "Acme",
            "https://example.com/1",
            "hash",
            "fingerprint",
            WorkMode::Remote,
            TitleBucket::Include,
            PostedAtConfidence::High,
        );
        job.score_band = ScoreBand::TopPriority;
        job
    }

    #[tokio::test]
    async fn dry_run_notifier_never_errors() {
        let notifier = LoggingNotifier::new(true);
        let job = sample_job();
        assert!(notifier.send_alert(&job, None).await.is_ok());
        assert!(notifier.send_system_alert("test").await.is_ok());
        assert!(notifier.send_digest("morning", &[]).await.is_ok());
        assert!(notifier.send_weekly_report(&[]).await.is_ok());
    }

    #[test]
    fn job_alert_keyboard_encodes_applied_and_skip_actions() {
        let job = sample_job();
        let keyboard = TelegramNotifier::job_alert_keyboard(&job);
        let buttons = keyboard["inline_keyboard"][0].as_array().unwrap();
        assert_eq!(buttons[0]["callback_data"], format!("applied_{}", job.id));
        assert_eq!(buttons[1]["callback_data"], format!("skip_{}", job.id));
    }

    #[test]
    fn job_alert_text_includes_fit_score_when_present() {
        let job = sample_job();
        let analysis = FitAnalysis::new(job.id, 87, crate::domain::types::Verdict::Strong, "Great fit", "primary", "gpt-4o-mini");
        let text = TelegramNotifier::job_alert_text(&job, Some(&analysis));
        assert!(text.contains("87/100"));
    }
}
