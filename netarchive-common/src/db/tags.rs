//! Tag persistence and tag-to-network links

use super::models::parse_uuid;
use crate::db::Tag;
use crate::tags::{normalize_tag, normalize_tags};
use crate::{Error, Result};
use sqlx::{Row, SqliteConnection, SqliteExecutor};
use uuid::Uuid;

/// Ensure a tag exists, returning the stored tag
///
/// Idempotent: creating a tag that already exists returns the existing one.
pub async fn ensure_tag(conn: &mut SqliteConnection, name: &str) -> Result<Tag> {
    let name = normalize_tag(name)
        .ok_or_else(|| Error::InvalidInput("Tag name must not be empty".to_string()))?;

    sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
        .bind(&name)
        .execute(&mut *conn)
        .await?;

    let (id, name): (i64, String) = sqlx::query_as("SELECT id, name FROM tags WHERE name = ?")
        .bind(&name)
        .fetch_one(&mut *conn)
        .await?;

    Ok(Tag { id, name })
}

/// Ensure every tag in the list exists (after normalisation)
pub async fn ensure_tags<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    names: &[S],
) -> Result<Vec<Tag>> {
    let mut tags = Vec::new();
    for name in normalize_tags(names) {
        tags.push(ensure_tag(conn, &name).await?);
    }
    Ok(tags)
}

/// Replace the tag set of a network
pub async fn set_network_tags<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    network_id: Uuid,
    names: &[S],
) -> Result<Vec<Tag>> {
    sqlx::query("DELETE FROM network_tags WHERE network_id = ?")
        .bind(network_id.to_string())
        .execute(&mut *conn)
        .await?;

    let tags = ensure_tags(conn, names).await?;
    for tag in &tags {
        sqlx::query("INSERT OR IGNORE INTO network_tags (network_id, tag_id) VALUES (?, ?)")
            .bind(network_id.to_string())
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(tags)
}

/// Tag names attached to a network, alphabetically
pub async fn tags_for_network<'e, E>(executor: E, network_id: Uuid) -> Result<Vec<String>>
where
    E: SqliteExecutor<'e>,
{
    let names = sqlx::query_scalar(
        r#"
        SELECT t.name FROM tags t
        JOIN network_tags nt ON nt.tag_id = t.id
        WHERE nt.network_id = ?
        ORDER BY t.name ASC
        "#,
    )
    .bind(network_id.to_string())
    .fetch_all(executor)
    .await?;
    Ok(names)
}

/// Every known tag name, alphabetically
pub async fn list_tags<'e, E>(executor: E) -> Result<Vec<String>>
where
    E: SqliteExecutor<'e>,
{
    let names = sqlx::query_scalar("SELECT name FROM tags ORDER BY name ASC")
        .fetch_all(executor)
        .await?;
    Ok(names)
}

/// Ids of the networks carrying the given (already normalised) tag
pub async fn network_ids_with_tag<'e, E>(executor: E, name: &str) -> Result<Vec<Uuid>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT nt.network_id FROM network_tags nt
        JOIN tags t ON t.id = nt.tag_id
        WHERE t.name = ?
        "#,
    )
    .bind(name)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| parse_uuid(&row.try_get::<String, _>(0)?))
        .collect()
}
