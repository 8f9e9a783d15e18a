//! # Network Archive Common Library
//!
//! Shared code for the network archive:
//! - Database schema and the metadata store (networks, tags, metadata rows)
//! - Record types for networks, tags and owners
//! - Tag normalisation
//! - Configuration loading and root folder resolution

pub mod config;
pub mod db;
pub mod error;
pub mod tags;

pub use error::{Error, Result};
pub use tags::normalize_tags;
