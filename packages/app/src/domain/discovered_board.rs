use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::Id;

pub struct DiscoveredBoardMarker;
pub type DiscoveredBoardId = Id<DiscoveredBoardMarker>;

/// Registry of ATS boards found by discovery.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiscoveredBoard {
    pub id: DiscoveredBoardId,
    pub platform: String,
    pub board_url: String,
    pub board_slug: String,
    pub confidence: f32,
    pub status: String,
    pub last_seen_at: DateTime<Utc>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_zero_yield_runs: i32,
    pub created_at: DateTime<Utc>,
}

impl DiscoveredBoard {
    /// Upsert a discovered board: confidence takes the max of existing and
    /// new, status resets to active, last_seen_at bumps to now.
    pub async fn upsert(
        platform: &str,
        board_url: &str,
        board_slug: &str,
        confidence: f32,
        pool: &PgPool,
    ) -> Result<DiscoveredBoardId> {
        sqlx::query_scalar::<_, DiscoveredBoardId>(
            "INSERT INTO discovered_boards
                (id, platform, board_url, board_slug, confidence, status, last_seen_at, created_at)
             VALUES ($1, $2, $3, $4, $5, 'active', now(), now())
             ON CONFLICT (board_url) DO UPDATE SET
                confidence = GREATEST(discovered_boards.confidence, EXCLUDED.confidence),
                status = 'active',
                last_seen_at = now()
             RETURNING id",
        )
        .bind(DiscoveredBoardId::new())
        .bind(platform)
        .bind(board_url)
        .bind(board_slug)
        .bind(confidence)
        .fetch_one(pool)
        .await
        .context("upserting discovered board")
    }

    pub async fn find_active_by_platform(platform: &str, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, DiscoveredBoard>(
            "SELECT * FROM discovered_boards WHERE platform = $1 AND status = 'active'",
        )
        .bind(platform)
        .fetch_all(pool)
        .await
        .context("loading active discovered boards")
    }

    pub async fn record_success(board_url: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE discovered_boards
             SET last_success_at = now(), consecutive_zero_yield_runs = 0
             WHERE board_url = $1",
        )
        .bind(board_url)
        .execute(pool)
        .await
        .context("recording discovered board success")?;
        Ok(())
    }

    pub async fn record_zero_yield(board_url: &str, pool: &PgPool) -> Result<()> {
        sqlx::query(
            "UPDATE discovered_boards
             SET consecutive_zero_yield_runs = consecutive_zero_yield_runs + 1
             WHERE board_url = $1",
        )
        .bind(board_url)
        .execute(pool)
        .await
        .context("recording discovered board zero-yield run")?;
        Ok(())
    }
}
