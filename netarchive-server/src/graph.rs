//! Network loading
//!
//! Uploaded networks are stored as adjacency lists, optionally gzip or bzip2
//! compressed, in the archive directory. Each non-comment line holds a node
//! followed by its neighbours, separated by whitespace; `#` starts a comment.
//! The loaded network is an undirected simple graph: repeated edges collapse
//! and a self-loop adds two to its node's degree.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use netarchive_common::db::Network;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to turn an archived file into a network
#[derive(Debug, Error)]
pub enum LoadError {
    /// Backing file is missing from the archive directory
    #[error("Network file not found: {}", .0.display())]
    Missing(PathBuf),

    /// File name does not name a network type we can read
    #[error("Unsupported network file type: {0}")]
    UnsupportedType(String),

    /// File exists but could not be read as an adjacency list
    #[error("Cannot parse {}: {reason}", path.display())]
    Unparseable { path: PathBuf, reason: String },
}

/// Compression applied to an archived network file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

/// Work out the compression of a network file from its name
///
/// Only adjacency lists are understood, so the type check is just that the
/// innermost extension is `al`.
pub fn file_compression(filename: &str) -> Result<Compression, LoadError> {
    let lower = filename.to_ascii_lowercase();
    let (stem, compression) = if let Some(stem) = lower.strip_suffix(".gz") {
        (stem, Compression::Gzip)
    } else if let Some(stem) = lower.strip_suffix(".bz2") {
        (stem, Compression::Bzip2)
    } else {
        (lower.as_str(), Compression::None)
    };

    match Path::new(stem).extension().and_then(|e| e.to_str()) {
        Some("al") => Ok(compression),
        Some(ext) => Err(LoadError::UnsupportedType(ext.to_string())),
        None => Err(LoadError::UnsupportedType(format!(
            "no extension on {}",
            filename
        ))),
    }
}

/// Canonical archive extension for an uploaded file name, if acceptable
pub fn acceptable_extension(filename: &str) -> Option<&'static str> {
    match file_compression(filename) {
        Ok(Compression::None) => Some("al"),
        Ok(Compression::Gzip) => Some("al.gz"),
        Ok(Compression::Bzip2) => Some("al.bz2"),
        Err(_) => None,
    }
}

/// An undirected network loaded from the archive
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    graph: UnGraph<String, ()>,
}

impl NetworkGraph {
    /// Read an adjacency list
    pub fn from_adjacency_list<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut graph = UnGraph::<String, ()>::new_undirected();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        let mut edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();

        let mut node = |graph: &mut UnGraph<String, ()>, name: &str| -> NodeIndex {
            *nodes
                .entry(name.to_string())
                .or_insert_with(|| graph.add_node(name.to_string()))
        };

        for line in reader.lines() {
            let line = line?;
            let content = line.split('#').next().unwrap_or("");
            let mut tokens = content.split_whitespace();
            let Some(first) = tokens.next() else {
                continue;
            };

            let u = node(&mut graph, first);
            for neighbour in tokens {
                let v = node(&mut graph, neighbour);
                let key = if u <= v { (u, v) } else { (v, u) };
                if edges.insert(key) {
                    graph.add_edge(u, v, ());
                }
            }
        }

        Ok(Self { graph })
    }

    /// Number of nodes
    pub fn order(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges
    pub fn size(&self) -> usize {
        self.graph.edge_count()
    }

    /// Degree of every node, in node insertion order
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.graph.node_count()];
        for edge in self.graph.raw_edges() {
            degrees[edge.source().index()] += 1;
            degrees[edge.target().index()] += 1;
        }
        degrees
    }

    pub fn inner(&self) -> &UnGraph<String, ()> {
        &self.graph
    }
}

/// Resolves archived networks to files and loads them
///
/// Consumed by the analyser chain; tests substitute their own.
pub trait GraphLoader: Send + Sync {
    /// Path of the network's backing file
    fn path_of(&self, network: &Network) -> PathBuf;

    /// Load the network's graph
    fn load(&self, network: &Network) -> Result<NetworkGraph, LoadError>;
}

/// Network files kept in the archive directory
#[derive(Debug, Clone)]
pub struct ArchiveFiles {
    dir: PathBuf,
}

impl ArchiveFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl GraphLoader for ArchiveFiles {
    fn path_of(&self, network: &Network) -> PathBuf {
        self.dir.join(&network.filename)
    }

    fn load(&self, network: &Network) -> Result<NetworkGraph, LoadError> {
        let path = self.path_of(network);
        let compression = file_compression(&network.filename)?;

        let file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::Missing(path.clone()),
            _ => LoadError::Unparseable {
                path: path.clone(),
                reason: e.to_string(),
            },
        })?;

        let reader: Box<dyn BufRead> = match compression {
            Compression::None => Box::new(BufReader::new(file)),
            Compression::Gzip => Box::new(BufReader::new(GzDecoder::new(file))),
            Compression::Bzip2 => Box::new(BufReader::new(BzDecoder::new(file))),
        };

        NetworkGraph::from_adjacency_list(reader).map_err(|e| LoadError::Unparseable {
            path,
            reason: e.to_string(),
        })
    }
}
