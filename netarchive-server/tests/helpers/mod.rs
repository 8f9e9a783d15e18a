//! Test Helper Utilities
//!
//! Shared utilities for testing netarchive-server: a throw-away archive
//! (database plus network directory) and adjacency-list generators.

#![allow(dead_code)]

use anyhow::Result;
use netarchive_common::db::{self, owners, Owner};
use netarchive_server::archive::{Archive, Submission};
use netarchive_server::graph::ArchiveFiles;
use netarchive_server::AppState;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::SqlitePool;
use std::fmt::Write;
use tempfile::TempDir;
use uuid::Uuid;

/// An archive rooted in a temporary directory, with one registered owner
///
/// The TempDir must be kept alive for the duration of the test.
pub struct TestArchive {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub archive: Archive,
    pub owner: Owner,
}

impl TestArchive {
    pub async fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let pool = db::init_database(&dir.path().join("test_netarchive.db")).await?;
        let files = ArchiveFiles::new(dir.path().join("networks"));
        std::fs::create_dir_all(files.dir())?;
        let archive = Archive::with_default_analysers(pool.clone(), files);
        let owner = owners::create_owner(&pool, "owner@example.com").await?;
        Ok(Self {
            dir,
            pool,
            archive,
            owner,
        })
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.archive.clone())
    }

    /// Submit an adjacency list as the test owner, returning the new id
    pub async fn submit(&self, adjacency: &str, tags: &[&str]) -> Result<Uuid> {
        let (network, _) = self
            .archive
            .submit(
                &self.owner,
                Submission {
                    filename: "network.al".to_string(),
                    data: adjacency.as_bytes().to_vec(),
                    title: "Test network".to_string(),
                    description: "Generated for a test".to_string(),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                },
            )
            .await?;
        Ok(network.id)
    }

    /// Another owner, for ownership checks
    pub async fn other_owner(&self) -> Result<Owner> {
        Ok(owners::create_owner(&self.pool, "someone-else@example.com").await?)
    }
}

/// Cycle over `n` nodes: every node has degree 2
pub fn ring(n: usize) -> String {
    (0..n).fold(String::new(), |mut out, i| {
        let _ = writeln!(out, "{} {}", i, (i + 1) % n);
        out
    })
}

/// Hub node 0 joined to `n - 1` leaves
pub fn star(n: usize) -> String {
    let mut out = String::from("0");
    for i in 1..n {
        let _ = write!(out, " {}", i);
    }
    out.push('\n');
    out
}

/// Erdős–Rényi G(n, p) random graph; every node gets its own line so
/// isolated nodes are kept
pub fn erdos_renyi(n: usize, p: f64, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::new();
    for i in 0..n {
        let _ = write!(out, "{}", i);
        for j in (i + 1)..n {
            if rng.gen_bool(p) {
                let _ = write!(out, " {}", j);
            }
        }
        out.push('\n');
    }
    out
}
