//! Database models

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

/// A principal who owns uploaded networks and authenticates with an API key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub created_at: DateTime<Utc>,
}

/// An archived network record
///
/// The identifier is assigned at creation and never reused. The backing file
/// lives in the archive directory under `filename`, which is always
/// `<id>.<extension>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: Uuid,
    pub filename: String,
    pub owner_id: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub available: bool,
    pub title: String,
    pub description: String,
}

impl Network {
    /// Create a new, not yet available, network record
    pub fn new(
        owner_id: Uuid,
        extension: &str,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            filename: format!("{}.{}", id, extension),
            owner_id,
            uploaded_at: Utc::now(),
            available: false,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// A tag, unique by its lower-cased name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// One derived (key, value) row for a network. Values are always strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub network_id: Uuid,
    pub key: String,
    pub value: String,
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Invalid UUID in database: {}", e)))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp in database: {}", e)))
}

pub(crate) fn network_from_row(row: &SqliteRow) -> Result<Network> {
    let id: String = row.try_get("id")?;
    let owner_id: String = row.try_get("owner_id")?;
    let uploaded_at: String = row.try_get("uploaded_at")?;
    Ok(Network {
        id: parse_uuid(&id)?,
        filename: row.try_get("filename")?,
        owner_id: parse_uuid(&owner_id)?,
        uploaded_at: parse_timestamp(&uploaded_at)?,
        available: row.try_get::<i64, _>("available")? != 0,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
    })
}

pub(crate) fn owner_from_row(row: &SqliteRow) -> Result<Owner> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Owner {
        id: parse_uuid(&id)?,
        email: row.try_get("email")?,
        api_key: row.try_get("api_key")?,
        created_at: parse_timestamp(&created_at)?,
    })
}
