//! Network analysis
//!
//! An [`Analyser`] inspects one archived network and derives metadata from
//! it. Analysers are registered on an [`AnalyserChain`], which runs them in
//! registration order whenever a network is submitted. Order matters: an
//! analyser sees the metadata written by the analysers before it, so the
//! degree-distribution fit can build on the topology statistics.
//!
//! A failing analyser is logged and skipped; the rest of the chain still runs.
//! Only a failure to load the network at all aborts the run.

pub mod degree_distribution;
pub mod hash;
pub mod stats;
pub mod topology;

use crate::graph::{GraphLoader, LoadError, NetworkGraph};
use crate::value::MetadataValue;
use netarchive_common::db::{metadata, MetadataEntry, Network};
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use degree_distribution::{ErdosRenyi, DEGREE_DISTRIBUTION_KEY};
pub use hash::ContentHash;
pub use topology::Topology;

/// Metadata derived by one analyser
pub type Derived = BTreeMap<String, MetadataValue>;

/// Failure of a single analyser
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Reading the network's backing file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The network has no nodes to analyse
    #[error("Network has no nodes")]
    EmptyNetwork,

    /// An earlier analyser did not record a value this one needs
    #[error("Required metadata '{0}' is missing")]
    MissingMetadata(String),

    /// A recorded value this analyser needs is not a number
    #[error("Metadata '{key}' is not numeric: {value}")]
    NonNumericMetadata { key: String, value: String },

    /// The analysis cannot reach a conclusion for this network
    #[error("Analysis inconclusive: {0}")]
    Inconclusive(String),
}

/// Failure of a whole chain run
#[derive(Debug, Error)]
pub enum ChainError {
    /// The network could not be loaded, so no analyser ran
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Reading existing or writing derived metadata failed
    #[error(transparent)]
    Store(#[from] netarchive_common::Error),

    /// The blocking analysis task panicked or was cancelled
    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Metadata recorded for a network so far: rows already in the store plus
/// rows produced earlier in the current run, in write order
#[derive(Debug, Clone, Default)]
pub struct MetadataView {
    entries: Vec<(String, String)>,
}

impl MetadataView {
    pub fn from_entries(entries: Vec<MetadataEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key, e.value)).collect(),
        }
    }

    /// First value recorded under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First value recorded under `key`, read as a number
    pub fn number(&self, key: &str) -> Result<f64, AnalysisError> {
        let value = self
            .get(key)
            .ok_or_else(|| AnalysisError::MissingMetadata(key.to_string()))?;
        crate::value::StoredValue::new(value)
            .as_number()
            .ok_or_else(|| AnalysisError::NonNumericMetadata {
                key: key.to_string(),
                value: value.to_string(),
            })
    }

    pub fn push(&mut self, key: String, value: String) {
        self.entries.push((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What an analyser is given to look at besides the loaded graph
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub network: &'a Network,
    /// Backing file in the archive directory
    pub path: &'a Path,
    pub metadata: &'a MetadataView,
}

/// A unit of analysis run over each submitted network
///
/// Implementations must not have side effects beyond reading the network
/// they are given.
pub trait Analyser: Send + Sync {
    /// Analyser name for logging
    fn name(&self) -> &'static str;

    /// Derive metadata for the network
    fn analyse(&self, subject: &Subject<'_>, graph: &NetworkGraph)
        -> Result<Derived, AnalysisError>;
}

/// An analyser that failed during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyserFailure {
    pub analyser: &'static str,
    pub error: String,
}

/// Outcome of one chain run
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    /// Rows appended to the metadata table, in write order
    pub rows: Vec<(String, String)>,
    pub failures: Vec<AnalyserFailure>,
}

/// Ordered registry of analysers
pub struct AnalyserChain {
    loader: Arc<dyn GraphLoader>,
    analysers: Vec<Box<dyn Analyser>>,
}

impl AnalyserChain {
    /// Create an empty chain loading networks through `loader`
    pub fn new(loader: Arc<dyn GraphLoader>) -> Self {
        Self {
            loader,
            analysers: Vec::new(),
        }
    }

    /// Chain with the standard analysers: content hash, topology, ER fit
    pub fn with_default_analysers(loader: Arc<dyn GraphLoader>) -> Self {
        let mut chain = Self::new(loader);
        chain
            .register(ContentHash)
            .register(Topology)
            .register(ErdosRenyi);
        chain
    }

    /// Append an analyser; registration order is execution order
    pub fn register<A: Analyser + 'static>(&mut self, analyser: A) -> &mut Self {
        self.analysers.push(Box::new(analyser));
        self
    }

    pub fn len(&self) -> usize {
        self.analysers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analysers.is_empty()
    }

    /// Names of the registered analysers, in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.analysers.iter().map(|a| a.name()).collect()
    }

    pub fn loader(&self) -> &dyn GraphLoader {
        self.loader.as_ref()
    }

    /// Run every analyser over the network without touching the store
    ///
    /// Loads the graph once, then invokes each analyser in order. Returns the
    /// rows to append, with values in their stored string form.
    pub fn analyse(
        &self,
        network: &Network,
        existing: Vec<MetadataEntry>,
    ) -> Result<AnalysisReport, LoadError> {
        let graph = self.loader.load(network)?;
        let path = self.loader.path_of(network);
        let mut view = MetadataView::from_entries(existing);
        let mut report = AnalysisReport::default();

        for analyser in &self.analysers {
            let subject = Subject {
                network,
                path: &path,
                metadata: &view,
            };

            match analyser.analyse(&subject, &graph) {
                Ok(derived) => {
                    debug!(
                        network_id = %network.id,
                        analyser = analyser.name(),
                        keys = derived.len(),
                        "Analyser finished"
                    );
                    for (key, value) in derived {
                        let value = value.to_string();
                        view.push(key.clone(), value.clone());
                        report.rows.push((key, value));
                    }
                }
                Err(e) => {
                    warn!(
                        network_id = %network.id,
                        analyser = analyser.name(),
                        "Analyser failed, skipping: {}",
                        e
                    );
                    report.failures.push(AnalyserFailure {
                        analyser: analyser.name(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// [`analyse`](Self::analyse) on the blocking thread pool
    ///
    /// Loading, hashing and fitting are synchronous file and CPU work, so they
    /// stay off the async workers and outside any open transaction.
    pub async fn analyse_blocking(
        self: &Arc<Self>,
        network: &Network,
        existing: Vec<MetadataEntry>,
    ) -> Result<AnalysisReport, ChainError> {
        let chain = Arc::clone(self);
        let network = network.clone();
        let report = tokio::task::spawn_blocking(move || chain.analyse(&network, existing)).await??;
        Ok(report)
    }

    /// Run the chain over a network and append the derived rows
    ///
    /// Rows are appended, never replaced, so re-running the chain duplicates
    /// keys.
    pub async fn run(
        self: &Arc<Self>,
        conn: &mut SqliteConnection,
        network: &Network,
    ) -> Result<AnalysisReport, ChainError> {
        let existing = metadata::metadata_for_network(&mut *conn, network.id).await?;
        let report = self.analyse_blocking(network, existing).await?;
        record_report(conn, network, &report).await?;
        Ok(report)
    }
}

/// Append the rows of a finished run for `network`
///
/// Pass a transaction to commit the rows together with the caller's other
/// writes.
pub async fn record_report(
    conn: &mut SqliteConnection,
    network: &Network,
    report: &AnalysisReport,
) -> Result<(), netarchive_common::Error> {
    for (key, value) in &report.rows {
        metadata::append_metadata(&mut *conn, network.id, key, value).await?;
    }

    info!(
        network_id = %network.id,
        rows = report.rows.len(),
        failed = report.failures.len(),
        "Analysis complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    /// Loader handing out a fixed graph
    struct FixedLoader(Option<NetworkGraph>);

    impl GraphLoader for FixedLoader {
        fn path_of(&self, network: &Network) -> PathBuf {
            PathBuf::from(&network.filename)
        }

        fn load(&self, network: &Network) -> Result<NetworkGraph, LoadError> {
            self.0
                .clone()
                .ok_or_else(|| LoadError::Missing(self.path_of(network)))
        }
    }

    struct Constant(&'static str, &'static str);

    impl Analyser for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }

        fn analyse(&self, _: &Subject<'_>, _: &NetworkGraph) -> Result<Derived, AnalysisError> {
            Ok(Derived::from([(self.0.to_string(), MetadataValue::from(self.1))]))
        }
    }

    struct Failing;

    impl Analyser for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn analyse(&self, _: &Subject<'_>, _: &NetworkGraph) -> Result<Derived, AnalysisError> {
            Err(AnalysisError::Inconclusive("always".to_string()))
        }
    }

    /// Copies an earlier value under a new key
    struct Echo(&'static str);

    impl Analyser for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn analyse(&self, subject: &Subject<'_>, _: &NetworkGraph) -> Result<Derived, AnalysisError> {
            let value = subject
                .metadata
                .get(self.0)
                .ok_or_else(|| AnalysisError::MissingMetadata(self.0.to_string()))?;
            Ok(Derived::from([(format!("echo-{}", self.0), MetadataValue::from(value))]))
        }
    }

    fn network() -> Network {
        Network::new(Uuid::new_v4(), "al", "", "")
    }

    fn loader() -> Arc<dyn GraphLoader> {
        Arc::new(FixedLoader(Some(NetworkGraph::default())))
    }

    #[test]
    fn test_registration_order_is_execution_order() {
        let mut chain = AnalyserChain::new(loader());
        chain.register(Echo("a")).register(Constant("a", "1")).register(Echo("a"));
        assert_eq!(chain.names(), vec!["echo", "constant", "echo"]);

        let report = chain.analyse(&network(), Vec::new()).unwrap();
        // The first echo runs before "a" exists
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.rows,
            vec![
                ("a".to_string(), "1".to_string()),
                ("echo-a".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_failure_does_not_stop_chain() {
        let mut chain = AnalyserChain::new(loader());
        chain.register(Failing).register(Constant("k", "v"));

        let report = chain.analyse(&network(), Vec::new()).unwrap();
        assert_eq!(report.rows, vec![("k".to_string(), "v".to_string())]);
        assert_eq!(
            report.failures,
            vec![AnalyserFailure {
                analyser: "failing",
                error: "Analysis inconclusive: always".to_string(),
            }]
        );
    }

    #[test]
    fn test_load_failure_aborts_run() {
        let mut chain = AnalyserChain::new(Arc::new(FixedLoader(None)));
        chain.register(Constant("k", "v"));
        assert!(matches!(
            chain.analyse(&network(), Vec::new()),
            Err(LoadError::Missing(_))
        ));
    }

    #[test]
    fn test_existing_metadata_visible_to_analysers() {
        let n = network();
        let mut chain = AnalyserChain::new(loader());
        chain.register(Echo("N"));
        let existing = vec![MetadataEntry {
            network_id: n.id,
            key: "N".to_string(),
            value: "500".to_string(),
        }];

        let report = chain.analyse(&n, existing).unwrap();
        assert_eq!(report.rows, vec![("echo-N".to_string(), "500".to_string())]);
    }

    #[test]
    fn test_independent_chains() {
        let mut a = AnalyserChain::new(loader());
        let b = AnalyserChain::new(loader());
        a.register(Constant("k", "v"));
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_metadata_view_number() {
        let mut view = MetadataView::default();
        view.push("N".to_string(), "100".to_string());
        view.push("N".to_string(), "200".to_string());
        view.push("label".to_string(), "x".to_string());

        assert_eq!(view.number("N").unwrap(), 100.0);
        assert!(matches!(view.number("M"), Err(AnalysisError::MissingMetadata(_))));
        assert!(matches!(
            view.number("label"),
            Err(AnalysisError::NonNumericMetadata { .. })
        ));
    }
}
