//! Derived metadata rows
//!
//! Rows are append-only: nothing here updates or removes a single row.
//! They disappear only when their network is deleted.

use super::models::parse_uuid;
use crate::db::MetadataEntry;
use crate::Result;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

/// Append one metadata row
pub async fn append_metadata<'e, E>(
    executor: E,
    network_id: Uuid,
    key: &str,
    value: &str,
) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("INSERT INTO metadata (network_id, key, value) VALUES (?, ?, ?)")
        .bind(network_id.to_string())
        .bind(key)
        .bind(value)
        .execute(executor)
        .await?;
    Ok(())
}

/// All metadata rows of a network, in the order they were written
pub async fn metadata_for_network<'e, E>(executor: E, network_id: Uuid) -> Result<Vec<MetadataEntry>>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT key, value FROM metadata WHERE network_id = ? ORDER BY id ASC")
            .bind(network_id.to_string())
            .fetch_all(executor)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(key, value)| MetadataEntry {
            network_id,
            key,
            value,
        })
        .collect())
}

/// Every (network id, value) pair recorded under `key`
pub async fn rows_with_key<'e, E>(executor: E, key: &str) -> Result<Vec<(Uuid, String)>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query("SELECT network_id, value FROM metadata WHERE key = ? ORDER BY id ASC")
        .bind(key)
        .fetch_all(executor)
        .await?;

    rows.iter()
        .map(|row| -> Result<(Uuid, String)> {
            let id: String = row.try_get(0)?;
            Ok((parse_uuid(&id)?, row.try_get(1)?))
        })
        .collect()
}
