//! Network record persistence

use super::models::network_from_row;
use crate::db::Network;
use crate::Result;
use sqlx::{SqliteConnection, SqliteExecutor};
use uuid::Uuid;

const NETWORK_COLUMNS: &str =
    "id, filename, owner_id, uploaded_at, available, title, description";

/// Insert a new network record
pub async fn insert_network<'e, E>(executor: E, network: &Network) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO networks (id, filename, owner_id, uploaded_at, available, title, description)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(network.id.to_string())
    .bind(&network.filename)
    .bind(network.owner_id.to_string())
    .bind(network.uploaded_at.to_rfc3339())
    .bind(network.available as i64)
    .bind(&network.title)
    .bind(&network.description)
    .execute(executor)
    .await?;

    Ok(())
}

/// Load a network by id
pub async fn load_network<'e, E>(executor: E, id: Uuid) -> Result<Option<Network>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {} FROM networks WHERE id = ?", NETWORK_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(network_from_row).transpose()
}

/// List every network, oldest upload first
pub async fn list_networks<'e, E>(executor: E) -> Result<Vec<Network>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM networks ORDER BY uploaded_at ASC, id ASC",
        NETWORK_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(network_from_row).collect()
}

/// List networks that are available to search, oldest upload first
pub async fn list_available_networks<'e, E>(executor: E) -> Result<Vec<Network>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM networks WHERE available = 1 ORDER BY uploaded_at ASC, id ASC",
        NETWORK_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(network_from_row).collect()
}

/// Set the availability flag
pub async fn set_available<'e, E>(executor: E, id: Uuid, available: bool) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE networks SET available = ? WHERE id = ?")
        .bind(available as i64)
        .bind(id.to_string())
        .execute(executor)
        .await?;
    Ok(())
}

/// Update the owner-editable title and description
pub async fn update_details<'e, E>(
    executor: E,
    id: Uuid,
    title: &str,
    description: &str,
) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("UPDATE networks SET title = ?, description = ? WHERE id = ?")
        .bind(title)
        .bind(description)
        .bind(id.to_string())
        .execute(executor)
        .await?;
    Ok(())
}

/// Delete a network together with its metadata rows and tag links
///
/// Returns `false` if no such network existed. Run inside a transaction so
/// the three deletes commit together.
pub async fn delete_network(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let id = id.to_string();

    sqlx::query("DELETE FROM metadata WHERE network_id = ?")
        .bind(&id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM network_tags WHERE network_id = ?")
        .bind(&id)
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM networks WHERE id = ?")
        .bind(&id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}
