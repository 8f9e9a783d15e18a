//! Owner records and API keys

use super::models::owner_from_row;
use crate::db::Owner;
use crate::{Error, Result};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqliteExecutor;
use uuid::Uuid;

/// Length of generated API keys
pub const API_KEY_LENGTH: usize = 40;

/// Generate a random alphanumeric API key
pub fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH)
        .map(char::from)
        .collect()
}

/// Create a new owner with a fresh API key
pub async fn create_owner<'e, E>(executor: E, email: &str) -> Result<Owner>
where
    E: SqliteExecutor<'e>,
{
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::InvalidInput("Owner email must not be empty".to_string()));
    }

    let owner = Owner {
        id: Uuid::new_v4(),
        email: email.to_string(),
        api_key: generate_api_key(),
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO owners (id, email, api_key, created_at) VALUES (?, ?, ?, ?)")
        .bind(owner.id.to_string())
        .bind(&owner.email)
        .bind(&owner.api_key)
        .bind(owner.created_at.to_rfc3339())
        .execute(executor)
        .await?;

    tracing::info!(owner_id = %owner.id, email = %owner.email, "Created owner");

    Ok(owner)
}

/// Look up the owner presenting the given API key
pub async fn owner_by_api_key<'e, E>(executor: E, api_key: &str) -> Result<Option<Owner>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT id, email, api_key, created_at FROM owners WHERE api_key = ?")
        .bind(api_key)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(owner_from_row).transpose()
}

/// Look up an owner by id
pub async fn owner_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Owner>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT id, email, api_key, created_at FROM owners WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(owner_from_row).transpose()
}
