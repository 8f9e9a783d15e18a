//! Integration tests for the metadata store
//!
//! Tests cover:
//! - Database creation and re-opening
//! - Idempotent tag creation and tag normalisation
//! - Append-only metadata rows
//! - Cascading deletion of a network's metadata and tag links

use netarchive_common::db::{self, metadata, networks, owners, tags, Network};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = db::init_database(&dir.path().join("test.db"))
        .await
        .expect("Should initialize database");
    (dir, pool)
}

async fn add_network(pool: &SqlitePool, owner: &db::Owner, tag_names: &[&str]) -> Network {
    let mut network = Network::new(owner.id, "al", "A test network", "A network");
    network.available = true;
    let mut conn = pool.acquire().await.unwrap();
    networks::insert_network(&mut *conn, &network).await.unwrap();
    tags::set_network_tags(&mut conn, network.id, tag_names)
        .await
        .unwrap();
    network
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.db");

    let pool1 = db::init_database(&path).await;
    assert!(pool1.is_ok());
    drop(pool1);

    let pool2 = db::init_database(&path).await;
    assert!(pool2.is_ok(), "Failed to reopen database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_owner_lookup_by_api_key() {
    let (_dir, pool) = setup_test_db().await;
    let owner = owners::create_owner(&pool, "test@test.com").await.unwrap();

    let found = owners::owner_by_api_key(&pool, &owner.api_key)
        .await
        .unwrap()
        .expect("Owner should be found by key");
    assert_eq!(found.id, owner.id);
    assert_eq!(found.email, "test@test.com");

    assert!(owners::owner_by_api_key(&pool, "wrong").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_owner_email_rejected() {
    let (_dir, pool) = setup_test_db().await;
    owners::create_owner(&pool, "dup@test.com").await.unwrap();
    assert!(owners::create_owner(&pool, "dup@test.com").await.is_err());
}

#[tokio::test]
async fn test_ensure_tag_is_idempotent() {
    let (_dir, pool) = setup_test_db().await;
    let mut conn = pool.acquire().await.unwrap();

    let first = tags::ensure_tag(&mut conn, "Random").await.unwrap();
    let second = tags::ensure_tag(&mut conn, "random").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.name, "random");
    assert_eq!(tags::list_tags(&mut *conn).await.unwrap(), vec!["random"]);
}

#[tokio::test]
async fn test_empty_tag_rejected() {
    let (_dir, pool) = setup_test_db().await;
    let mut conn = pool.acquire().await.unwrap();
    assert!(tags::ensure_tag(&mut conn, "   ").await.is_err());
}

#[tokio::test]
async fn test_network_tags_normalised_and_replaced() {
    let (_dir, pool) = setup_test_db().await;
    let owner = owners::create_owner(&pool, "test@test.com").await.unwrap();
    let network = add_network(&pool, &owner, &["Test", "bonus", "TEST"]).await;

    assert_eq!(
        tags::tags_for_network(&pool, network.id).await.unwrap(),
        vec!["bonus", "test"]
    );

    let mut conn = pool.acquire().await.unwrap();
    tags::set_network_tags(&mut conn, network.id, &["er"])
        .await
        .unwrap();
    assert_eq!(
        tags::tags_for_network(&pool, network.id).await.unwrap(),
        vec!["er"]
    );

    // Old tags stay in the tag table
    assert_eq!(
        tags::list_tags(&pool).await.unwrap(),
        vec!["bonus", "er", "test"]
    );
}

#[tokio::test]
async fn test_network_ids_with_tag() {
    let (_dir, pool) = setup_test_db().await;
    let owner = owners::create_owner(&pool, "test@test.com").await.unwrap();
    let a = add_network(&pool, &owner, &["random"]).await;
    let b = add_network(&pool, &owner, &["random", "er"]).await;
    add_network(&pool, &owner, &["test"]).await;

    let mut ids = tags::network_ids_with_tag(&pool, "random").await.unwrap();
    ids.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(ids, expected);
    assert!(tags::network_ids_with_tag(&pool, "missing")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_metadata_rows_accumulate() {
    let (_dir, pool) = setup_test_db().await;
    let owner = owners::create_owner(&pool, "test@test.com").await.unwrap();
    let network = add_network(&pool, &owner, &[]).await;

    metadata::append_metadata(&pool, network.id, "N", "100").await.unwrap();
    metadata::append_metadata(&pool, network.id, "N", "100").await.unwrap();
    metadata::append_metadata(&pool, network.id, "M", "250").await.unwrap();

    let rows = metadata::metadata_for_network(&pool, network.id).await.unwrap();
    let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["N", "N", "M"]);

    let n_rows = metadata::rows_with_key(&pool, "N").await.unwrap();
    assert_eq!(n_rows.len(), 2);
    assert!(n_rows.iter().all(|(id, v)| *id == network.id && v == "100"));
}

#[tokio::test]
async fn test_delete_network_cascades() {
    let (_dir, pool) = setup_test_db().await;
    let owner = owners::create_owner(&pool, "test@test.com").await.unwrap();
    let network = add_network(&pool, &owner, &["random"]).await;
    metadata::append_metadata(&pool, network.id, "N", "100").await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    assert!(networks::delete_network(&mut tx, network.id).await.unwrap());
    tx.commit().await.unwrap();

    assert!(networks::load_network(&pool, network.id).await.unwrap().is_none());
    assert!(metadata::rows_with_key(&pool, "N").await.unwrap().is_empty());
    assert!(tags::network_ids_with_tag(&pool, "random")
        .await
        .unwrap()
        .is_empty());

    // Deleting again reports nothing deleted
    let mut conn = pool.acquire().await.unwrap();
    assert!(!networks::delete_network(&mut conn, network.id).await.unwrap());
}

#[tokio::test]
async fn test_available_listing_and_details() {
    let (_dir, pool) = setup_test_db().await;
    let owner = owners::create_owner(&pool, "test@test.com").await.unwrap();
    let visible = add_network(&pool, &owner, &[]).await;
    let hidden = add_network(&pool, &owner, &[]).await;
    networks::set_available(&pool, hidden.id, false).await.unwrap();

    let all = networks::list_networks(&pool).await.unwrap();
    assert_eq!(all.len(), 2);
    let available = networks::list_available_networks(&pool).await.unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].id, visible.id);

    networks::update_details(&pool, visible.id, "New title", "New description")
        .await
        .unwrap();
    let reloaded = networks::load_network(&pool, visible.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.title, "New title");
    assert_eq!(reloaded.description, "New description");
    assert_eq!(reloaded.uploaded_at.timestamp(), visible.uploaded_at.timestamp());
}
