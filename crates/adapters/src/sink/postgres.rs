//! PostgreSQL sink.

use async_trait::async_trait;
use inventory_listener_core::{HostId, StoredHost};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use super::{HostSink, Result, SinkError};

/// Default size of the connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const CREATE_HOSTS_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS hosts (
    id BIGINT PRIMARY KEY,
    request TEXT NOT NULL,
    checksum TEXT NOT NULL,
    updated TIMESTAMPTZ NOT NULL
)";

const UPSERT_HOST: &str = "\
INSERT INTO hosts (id, request, checksum, updated)
VALUES ($1, $2, $3, $4)
ON CONFLICT (id) DO UPDATE
SET request = EXCLUDED.request,
    checksum = EXCLUDED.checksum,
    updated = EXCLUDED.updated";

const SELECT_HOST: &str = "SELECT id, request, checksum, updated FROM hosts WHERE id = $1";

const DELETE_HOSTS: &str = "DELETE FROM hosts";

/// Sink storing records in the `hosts` table.
#[derive(Debug, Clone)]
pub struct PostgresSink {
    pool: PgPool,
}

impl PostgresSink {
    /// Connect to `url` with a pool of at most `max_connections`.
    ///
    /// Fails with [`SinkError::Unavailable`] when no connection can be
    /// opened.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `hosts` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_HOSTS_TABLE).execute(&self.pool).await?;
        info!("Hosts table ready");
        Ok(())
    }
}

fn host_from_row(row: &PgRow) -> std::result::Result<StoredHost, sqlx::Error> {
    Ok(StoredHost {
        id: row.try_get("id")?,
        request: row.try_get("request")?,
        checksum: row.try_get("checksum")?,
        updated: row.try_get("updated")?,
    })
}

#[async_trait]
impl HostSink for PostgresSink {
    async fn insert(&self, host: StoredHost) -> Result<()> {
        sqlx::query(UPSERT_HOST)
            .bind(host.id)
            .bind(&host.request)
            .bind(&host.checksum)
            .bind(host.updated)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get(&self, id: HostId) -> Result<Option<StoredHost>> {
        let row = sqlx::query(SELECT_HOST)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(host_from_row).transpose()?)
    }

    async fn delete_all(&self) -> Result<u64> {
        let done = sqlx::query(DELETE_HOSTS).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}
