//! Streaming content hasher.
//!
//! # Overview
//!
//! [`Hasher`] computes a 256-bit digest of a file by reading it in
//! fixed-size chunks through a running accumulator. Peak memory is one chunk
//! regardless of file size, so multi-hundred-GB files hash in O(chunk size).
//!
//! Two algorithms are supported, both producing 32-byte digests:
//! - SHA-256 (default)
//! - BLAKE3
//!
//! Byte-for-byte equality is inferred from digest equality; files are not
//! re-compared after their digests match.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;

use super::ReadError;

/// Default read chunk: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// A 256-bit content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Lowercase hexadecimal rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Digest algorithm used for content comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256
    #[default]
    Sha256,
    /// BLAKE3
    Blake3,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

enum Accumulator {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finalize(self) -> Digest {
        match self {
            Self::Sha256(h) => Digest(h.finalize().into()),
            Self::Blake3(h) => Digest(*h.finalize().as_bytes()),
        }
    }
}

/// Chunked file hasher.
///
/// The hasher is stateless between calls and is shared across worker threads.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    algorithm: HashAlgorithm,
    chunk_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a SHA-256 hasher with the default 4 MiB chunk.
    #[must_use]
    pub fn new() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Select the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the read chunk size. Zero is clamped to one byte.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The configured chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Hash the full contents of a file.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] naming the path and cause when the file cannot
    /// be opened or a read fails part-way through.
    pub fn hash_file(&self, path: &Path) -> Result<Digest, ReadError> {
        let file = File::open(path).map_err(|e| ReadError::new(path, e))?;
        self.hash_reader(file).map_err(|e| ReadError::new(path, e))
    }

    /// Hash everything a reader yields.
    ///
    /// # Errors
    ///
    /// Propagates any read error other than [`ErrorKind::Interrupted`],
    /// which is retried.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<Digest> {
        let mut acc = Accumulator::new(self.algorithm);
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => acc.update(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(acc.finalize())
    }

    /// Hash an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> Digest {
        let mut acc = Accumulator::new(self.algorithm);
        acc.update(data);
        acc.finalize()
    }
}
