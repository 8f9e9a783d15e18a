//! Metadata store: networks, tags, owners and derived metadata rows

pub mod init;
pub mod metadata;
pub mod models;
pub mod networks;
pub mod owners;
pub mod tags;

pub use init::*;
pub use models::*;
