//! Content hash analyser
//!
//! Computes the SHA-256 digest of the network's on-disk representation.
//! This reads the file again, so it is potentially expensive for large
//! networks.

use super::{Analyser, AnalysisError, Derived, Subject};
use crate::graph::NetworkGraph;
use crate::value::MetadataValue;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of chunks read from the file
pub const CHUNK_SIZE: usize = 4096;

/// Metadata key holding the digest
pub const HASH_KEY: &str = "sha256";

/// Streams the backing file through SHA-256
pub struct ContentHash;

/// Hex-encoded SHA-256 digest of a file, read in fixed-size chunks
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

impl Analyser for ContentHash {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn analyse(&self, subject: &Subject<'_>, _graph: &NetworkGraph) -> Result<Derived, AnalysisError> {
        let digest = hash_file(subject.path)?;
        Ok(Derived::from([(HASH_KEY.to_string(), MetadataValue::Text(digest))]))
    }
}
