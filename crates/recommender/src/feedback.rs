//! Explanation feedback collection
//!
//! Best-effort telemetry: `FeedbackCollector::record` always acknowledges.
//! Storage failures are logged and reported through `FeedbackAck::persisted`,
//! never returned as errors.
//!
//! Stores:
//! - `JsonLinesFeedbackStore`: append-only newline-delimited JSON file
//! - `PostgresFeedbackStore`: `explanation_feedback` table
//! - `InMemoryFeedbackStore`: process-local, for tests and embedding

use crate::types::{DetailLevel, FeedbackRating, ItemId, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub const MAX_COMMENT_CHARS: usize = 1000;

/// Which explanation the feedback is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationRef {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub detail_level: DetailLevel,
    /// Snapshot that produced the explanation, when known
    #[serde(default)]
    pub snapshot_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: Uuid,
    pub explanation: ExplanationRef,
    pub rating: FeedbackRating,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub feedback_id: Uuid,
    /// False when the store failed; the caller's flow is unaffected either way
    pub persisted: bool,
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn append(&self, record: &FeedbackRecord) -> Result<()>;

    fn name(&self) -> &'static str;
}

pub struct FeedbackCollector {
    store: Arc<dyn FeedbackStore>,
}

impl FeedbackCollector {
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> (Self, Arc<InMemoryFeedbackStore>) {
        let store = Arc::new(InMemoryFeedbackStore::default());
        (Self::new(store.clone()), store)
    }

    pub async fn record(
        &self,
        explanation: ExplanationRef,
        rating: FeedbackRating,
        comment: Option<String>,
    ) -> FeedbackAck {
        let record = FeedbackRecord {
            feedback_id: Uuid::new_v4(),
            explanation,
            rating,
            comment: normalize_comment(comment),
            submitted_at: Utc::now(),
        };

        let persisted = match self.store.append(&record).await {
            Ok(()) => {
                tracing::debug!(
                    feedback_id = %record.feedback_id,
                    store = self.store.name(),
                    rating = record.rating.as_str(),
                    "Recorded explanation feedback"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    feedback_id = %record.feedback_id,
                    store = self.store.name(),
                    error = %format!("{:#}", e),
                    "Failed to persist explanation feedback"
                );
                false
            }
        };

        FeedbackAck {
            feedback_id: record.feedback_id,
            persisted,
        }
    }
}

fn normalize_comment(comment: Option<String>) -> Option<String> {
    let comment = comment?;
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_COMMENT_CHARS).collect())
}

#[derive(Debug, Default)]
pub struct InMemoryFeedbackStore {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackStore {
    pub fn records(&self) -> Vec<FeedbackRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("feedback buffer lock poisoned"))?
            .push(record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Append-only JSON lines file
pub struct JsonLinesFeedbackStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesFeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FeedbackStore for JsonLinesFeedbackStore {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record).context("Failed to serialize feedback")?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(&line)
            .await
            .context("Failed to append feedback")?;
        file.flush().await.context("Failed to flush feedback")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

/// PostgreSQL-backed feedback log
pub struct PostgresFeedbackStore {
    pool: PgPool,
}

impl PostgresFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the feedback table if it doesn't exist
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS explanation_feedback (
                feedback_id UUID PRIMARY KEY,
                user_id BIGINT NOT NULL,
                item_id BIGINT NOT NULL,
                detail_level VARCHAR(16) NOT NULL,
                snapshot_id UUID,
                rating VARCHAR(8) NOT NULL,
                comment TEXT,
                submitted_at TIMESTAMP WITH TIME ZONE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create explanation_feedback table")?;
        Ok(())
    }

    pub async fn count_for_item(&self, item_id: ItemId) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM explanation_feedback WHERE item_id = $1")
                .bind(item_id as i64)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count feedback")?;
        Ok(count)
    }
}

#[async_trait]
impl FeedbackStore for PostgresFeedbackStore {
    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO explanation_feedback (
                feedback_id,
                user_id,
                item_id,
                detail_level,
                snapshot_id,
                rating,
                comment,
                submitted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.feedback_id)
        .bind(record.explanation.user_id as i64)
        .bind(record.explanation.item_id as i64)
        .bind(record.explanation.detail_level.as_str())
        .bind(record.explanation.snapshot_id)
        .bind(record.rating.as_str())
        .bind(record.comment.as_deref())
        .bind(record.submitted_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert explanation feedback")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
