//! # rb-db-sqlite Implementation
//!
//! SQLite-backed `PostStore`: the "mine" and "seen" post id sets, each record
//! expiring ten days after it was last written.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rb_core::error::AppError;
use rb_core::models::{IdKind, PostId};
use rb_core::traits::PostStore;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS post_ids (
    kind    TEXT    NOT NULL,
    id      INTEGER NOT NULL,
    op      INTEGER NOT NULL,
    expires INTEGER NOT NULL,
    PRIMARY KEY (kind, id)
)";

/// How long a stored id is remembered.
pub fn retention() -> Duration {
    Duration::days(10)
}

pub struct SqlitePostStore {
    pool: SqlitePool,
}

fn to_sql(id: PostId) -> Result<i64, AppError> {
    i64::try_from(id).map_err(|_| AppError::Storage(format!("post id {id} out of range")))
}

fn storage(e: sqlx::Error) -> AppError {
    AppError::Storage(e.to_string())
}

impl SqlitePostStore {
    /// Opens (creating if needed) the database at `url` and its schema.
    ///
    /// # Developer Note
    /// Every connection to `sqlite::memory:` gets its own empty database, so
    /// in-memory stores keep a single connection open for the life of the
    /// pool. The schema is applied on every new connection in case that one
    /// is ever replaced.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage)?
            .create_if_missing(true);
        let pool_options = SqlitePoolOptions::new().after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query(SCHEMA).execute(&mut *conn).await?;
                Ok(())
            })
        });
        let pool_options = if url.contains(":memory:") {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(4)
        };
        let pool = pool_options.connect_with(options).await.map_err(storage)?;

        sqlx::query(SCHEMA).execute(&pool).await.map_err(storage)?;
        log::debug!("post id store ready at {url}");
        Ok(Self { pool })
    }

    /// Upserts a record of `kind` that is forgotten after `expires`.
    pub async fn store_until(
        &self,
        kind: IdKind,
        id: PostId,
        op: PostId,
        expires: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO post_ids (kind, id, op, expires) VALUES (?, ?, ?, ?)
             ON CONFLICT (kind, id) DO UPDATE SET op = excluded.op, expires = excluded.expires",
        )
        .bind(kind.as_str())
        .bind(to_sql(id)?)
        .bind(to_sql(op)?)
        .bind(expires.timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    /// Deletes expired records, returning how many were removed.
    pub async fn purge_expired(&self) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM post_ids WHERE expires <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        if result.rows_affected() > 0 {
            log::info!("purged {} expired post ids", result.rows_affected());
        }
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn store_mine(&self, id: PostId, op: PostId) -> anyhow::Result<()> {
        self.store_until(IdKind::Mine, id, op, Utc::now() + retention()).await
    }

    async fn store_seen_post(&self, id: PostId, op: PostId) -> anyhow::Result<()> {
        self.store_until(IdKind::SeenPost, id, op, Utc::now() + retention()).await
    }

    async fn read_ids(&self, kind: IdKind, threads: &[PostId]) -> anyhow::Result<Vec<PostId>> {
        if threads.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM post_ids WHERE kind = ");
        query
            .push_bind(kind.as_str())
            .push(" AND expires > ")
            .push_bind(Utc::now().timestamp())
            .push(" AND op IN (");
        let mut ops = query.separated(", ");
        for op in threads {
            ops.push_bind(to_sql(*op)?);
        }
        ops.push_unseparated(") ORDER BY id ASC");

        query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?
            .iter()
            .map(|row| -> anyhow::Result<PostId> { Ok(PostId::try_from(row.get::<i64, _>("id"))?) })
            .collect()
    }
}
