use crate::domain::snapshot::Snapshot;
use crate::ingest::provider::{parse_snapshot, SnapshotSource};
use crate::time::report_day::date_key;
use anyhow::Context;
use chrono::NaiveDate;

/// Snapshots kept in Postgres as one JSONB document per day, keyed by
/// `YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: sqlx::PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    /// Insert or replace the document for `date`. The document is validated
    /// against the snapshot shape before it is written.
    pub async fn upsert_snapshot(&self, date: NaiveDate, document: &str) -> anyhow::Result<u64> {
        parse_snapshot(document)?;

        let res = sqlx::query(
            "INSERT INTO market_snapshots (id, document, updated_at) \
             VALUES ($1, $2::jsonb, now()) \
             ON CONFLICT (id) DO UPDATE SET document = EXCLUDED.document, updated_at = now()",
        )
        .persistent(false)
        .bind(date_key(date))
        .bind(document)
        .execute(&self.pool)
        .await
        .context("upsert market_snapshots failed")?;

        Ok(res.rows_affected())
    }
}

#[async_trait::async_trait]
impl SnapshotSource for PgSnapshotStore {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_snapshot(&self, date: NaiveDate) -> anyhow::Result<Option<Snapshot>> {
        let key = date_key(date);
        let row: Option<(String,)> =
            sqlx::query_as("SELECT document::text FROM market_snapshots WHERE id = $1")
                .persistent(false)
                .bind(&key)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("select market_snapshots failed (id={key})"))?;

        match row {
            Some((document,)) => parse_snapshot(&document)
                .with_context(|| format!("market snapshot {key} is malformed"))
                .map(Some),
            None => Ok(None),
        }
    }
}
