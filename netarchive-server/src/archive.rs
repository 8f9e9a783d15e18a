//! Archive service
//!
//! Owns the lifecycle of archived networks: storing an upload and running
//! the analyser chain over it, owner edits, and deletion. Each operation
//! commits its database writes in one transaction.

use crate::analysis::{self, AnalyserChain, AnalysisReport, ChainError};
use crate::graph::{acceptable_extension, ArchiveFiles, GraphLoader, LoadError};
use netarchive_common::db::{metadata, networks, owners, tags, MetadataEntry, Network, Owner};
use sqlx::SqlitePool;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Failure of an archive operation
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Upload is not a network type the archive can read
    #[error("Unacceptable network file '{0}': expected .al, .al.gz or .al.bz2")]
    UnacceptableFile(String),

    #[error("Network {0} not found")]
    NotFound(Uuid),

    /// Caller does not own the network
    #[error("Network {0} belongs to another owner")]
    NotOwner(Uuid),

    /// Upload was stored but could not be loaded as a network
    #[error("Network {id} was stored but cannot be analysed: {source}")]
    Load {
        id: Uuid,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Store(#[from] netarchive_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Analysis died before producing a report
    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<sqlx::Error> for ArchiveError {
    fn from(e: sqlx::Error) -> Self {
        ArchiveError::Store(e.into())
    }
}

/// An uploaded network with its owner-supplied details
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Name the file was uploaded under; only its extension is kept
    pub filename: String,
    pub data: Vec<u8>,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Owner changes to a network; `None` leaves a field as it is
#[derive(Debug, Clone, Default)]
pub struct NetworkEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Replaces the whole tag set
    pub tags: Option<Vec<String>>,
}

/// A network with everything recorded about it
#[derive(Debug, Clone)]
pub struct NetworkDetails {
    pub network: Network,
    pub owner: Option<Owner>,
    pub tags: Vec<String>,
    pub metadata: Vec<MetadataEntry>,
}

/// Stored networks, their files and the analysis run on upload
#[derive(Clone)]
pub struct Archive {
    db: SqlitePool,
    files: ArchiveFiles,
    chain: Arc<AnalyserChain>,
}

impl Archive {
    pub fn new(db: SqlitePool, files: ArchiveFiles, chain: Arc<AnalyserChain>) -> Self {
        Self { db, files, chain }
    }

    /// Archive with the standard analysers over the given archive directory
    pub fn with_default_analysers(db: SqlitePool, files: ArchiveFiles) -> Self {
        let chain = AnalyserChain::with_default_analysers(Arc::new(files.clone()));
        Self::new(db, files, Arc::new(chain))
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn files(&self) -> &ArchiveFiles {
        &self.files
    }

    pub fn chain(&self) -> &Arc<AnalyserChain> {
        &self.chain
    }

    /// Store an upload, analyse it and make it searchable
    ///
    /// Analysis runs on the blocking pool before any database write, so a
    /// slow network never holds the store's write lock. The record, its tags
    /// and the derived metadata then commit together, and the network only
    /// becomes available once analysis has run. If the file cannot be loaded
    /// as a network, the record is still committed but stays unavailable with
    /// no derived metadata, and [`ArchiveError::Load`] is returned.
    pub async fn submit(
        &self,
        owner: &Owner,
        submission: Submission,
    ) -> Result<(Network, AnalysisReport), ArchiveError> {
        let extension = acceptable_extension(&submission.filename)
            .ok_or_else(|| ArchiveError::UnacceptableFile(submission.filename.clone()))?;

        let mut network = Network::new(
            owner.id,
            extension,
            submission.title,
            submission.description,
        );
        let path = self.files.path_of(&network);
        tokio::fs::create_dir_all(self.files.dir()).await?;
        tokio::fs::write(&path, &submission.data).await?;

        let outcome = self.chain.analyse_blocking(&network, Vec::new()).await;
        let result = self
            .record_submission(&network, &submission.tags, outcome)
            .await;
        match result {
            Ok(report) => {
                network.available = true;
                info!(
                    network_id = %network.id,
                    owner = %owner.email,
                    bytes = submission.data.len(),
                    derived = report.rows.len(),
                    "Network submitted"
                );
                Ok((network, report))
            }
            Err(ArchiveError::Load { id, source }) => {
                warn!(network_id = %id, "Submitted network cannot be loaded: {}", source);
                Err(ArchiveError::Load { id, source })
            }
            Err(e) => {
                // Nothing was committed, so the file has no record
                if let Err(remove) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove {}: {}", path.display(), remove);
                }
                Err(e)
            }
        }
    }

    async fn record_submission(
        &self,
        network: &Network,
        tag_names: &[String],
        outcome: Result<AnalysisReport, ChainError>,
    ) -> Result<AnalysisReport, ArchiveError> {
        let report = match outcome {
            Ok(report) => report,
            Err(ChainError::Load(source)) => {
                // No analyser ran, so the record goes in unavailable and bare
                let mut tx = self.db.begin().await?;
                networks::insert_network(&mut *tx, network).await?;
                tags::set_network_tags(&mut tx, network.id, tag_names).await?;
                tx.commit().await?;
                return Err(ArchiveError::Load {
                    id: network.id,
                    source,
                });
            }
            Err(ChainError::Store(e)) => return Err(e.into()),
            Err(ChainError::Task(e)) => return Err(e.into()),
        };

        let mut tx = self.db.begin().await?;
        networks::insert_network(&mut *tx, network).await?;
        tags::set_network_tags(&mut tx, network.id, tag_names).await?;
        analysis::record_report(&mut tx, network, &report).await?;
        networks::set_available(&mut *tx, network.id, true).await?;
        tx.commit().await?;
        Ok(report)
    }

    /// Load a network the caller owns
    async fn owned_network(&self, owner: &Owner, id: Uuid) -> Result<Network, ArchiveError> {
        let network = networks::load_network(&self.db, id)
            .await?
            .ok_or(ArchiveError::NotFound(id))?;
        if network.owner_id != owner.id {
            return Err(ArchiveError::NotOwner(id));
        }
        Ok(network)
    }

    /// Apply an owner's edits to title, description and tags
    pub async fn edit(
        &self,
        owner: &Owner,
        id: Uuid,
        edit: NetworkEdit,
    ) -> Result<Network, ArchiveError> {
        let mut network = self.owned_network(owner, id).await?;
        if let Some(title) = edit.title {
            network.title = title;
        }
        if let Some(description) = edit.description {
            network.description = description;
        }

        let mut tx = self.db.begin().await?;
        networks::update_details(&mut *tx, id, &network.title, &network.description).await?;
        if let Some(tag_names) = &edit.tags {
            tags::set_network_tags(&mut tx, id, tag_names.as_slice()).await?;
        }
        tx.commit().await?;

        info!(network_id = %id, owner = %owner.email, "Network edited");
        Ok(network)
    }

    /// Delete a network the caller owns, record first and then its file
    pub async fn delete(&self, owner: &Owner, id: Uuid) -> Result<(), ArchiveError> {
        let network = self.owned_network(owner, id).await?;

        let mut tx = self.db.begin().await?;
        if !networks::delete_network(&mut tx, id).await? {
            return Err(ArchiveError::NotFound(id));
        }
        tx.commit().await?;

        let path = self.files.path_of(&network);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(network_id = %id, "Deleted network had no file at {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }

        info!(network_id = %id, owner = %owner.email, "Network deleted");
        Ok(())
    }

    /// Everything recorded about a network
    pub async fn details(&self, id: Uuid) -> Result<NetworkDetails, ArchiveError> {
        let network = networks::load_network(&self.db, id)
            .await?
            .ok_or(ArchiveError::NotFound(id))?;
        let owner = owners::owner_by_id(&self.db, network.owner_id).await?;
        let tags = tags::tags_for_network(&self.db, id).await?;
        let metadata = metadata::metadata_for_network(&self.db, id).await?;

        Ok(NetworkDetails {
            network,
            owner,
            tags,
            metadata,
        })
    }

    /// The network's backing file contents
    pub async fn raw(&self, id: Uuid) -> Result<(Network, Vec<u8>), ArchiveError> {
        let network = networks::load_network(&self.db, id)
            .await?
            .ok_or(ArchiveError::NotFound(id))?;
        let data = tokio::fs::read(self.files.path_of(&network)).await?;
        Ok((network, data))
    }
}
