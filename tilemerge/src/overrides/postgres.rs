//! Postgres-backed override source.
//!
//! Reads the `features` table maintained by the feature editing service:
//! one row per `merge_id` with optional `name` and `color` columns.
//! Soft-deleted rows (non-null `deleted_at`) are ignored.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

use super::{OverrideError, OverrideRecord, OverrideSource};
use crate::BoxFuture;

/// Default override table.
pub const DEFAULT_OVERRIDE_TABLE: &str = "features";

/// Default number of pooled database connections.
pub const DEFAULT_OVERRIDE_CONNECTIONS: u32 = 5;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Override source querying a Postgres table with one `= ANY($1)` batch.
pub struct PostgresOverrides {
    pool: PgPool,
    query: String,
}

impl PostgresOverrides {
    /// Create a lazily connecting pool for `url`.
    ///
    /// No connection is made until the first lookup, so an unreachable
    /// database surfaces as a per-request lookup failure rather than a
    /// startup failure.
    pub fn connect_lazy(url: &str, table: &str, max_connections: u32) -> Result<Self, OverrideError> {
        let options = PgConnectOptions::from_str(url)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);
        let source = Self::from_pool(pool, table)?;
        info!(table, max_connections, "Configured Postgres override source");
        Ok(source)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, table: &str) -> Result<Self, OverrideError> {
        Ok(Self {
            pool,
            query: batch_query(table)?,
        })
    }

    async fn query_batch(&self, identifiers: &[String]) -> Result<Vec<OverrideRecord>, OverrideError> {
        // The connection goes back to the pool when `conn` drops, on every path.
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(&self.query)
            .bind(identifiers)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter()
            .map(|row| -> Result<OverrideRecord, OverrideError> {
                Ok(OverrideRecord {
                    identifier: row.try_get("merge_id")?,
                    display_name: row.try_get("name")?,
                    color: row.try_get("color")?,
                })
            })
            .collect()
    }
}

impl OverrideSource for PostgresOverrides {
    fn fetch_batch<'a>(
        &'a self,
        identifiers: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<OverrideRecord>, OverrideError>> {
        Box::pin(self.query_batch(identifiers))
    }
}

fn batch_query(table: &str) -> Result<String, OverrideError> {
    if !is_identifier(table) {
        return Err(OverrideError::InvalidTable(table.to_string()));
    }
    Ok(format!(
        "SELECT merge_id, name, color FROM {table} \
         WHERE merge_id = ANY($1) AND deleted_at IS NULL"
    ))
}

/// Plain or schema-qualified SQL identifier.
fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
