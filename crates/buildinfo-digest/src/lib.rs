//! Content-address digests.
//!
//! A digest identifies a blob (layer, image config, or manifest document) as
//! `algorithm:hex`. This crate parses and renders digests and maps them to the
//! file names used when blobs are laid out in storage.

mod storage;

pub use storage::{from_storage_name, to_storage_name, MANIFEST_FILE_NAME, STORAGE_SEPARATOR};

use serde::{Deserialize, Serialize};
use sha1::{Digest as _, Sha1};
use std::fmt;
use std::str::FromStr;

/// Algorithm tag of the manifest self-hash namespace.
///
/// Registry blobs are addressed with sha256; the manifest document's own
/// content hash is computed locally with sha1 and lives under this tag.
pub const SELF_HASH_ALGORITHM: &str = "sha1";

/// Separator between the algorithm and hex parts.
pub const SEPARATOR: char = ':';

/// Errors for digest parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    #[error("Malformed digest '{input}': {reason}")]
    Malformed { input: String, reason: &'static str },
}

/// A content-address digest.
///
/// Two digests are equal iff algorithm and hex match exactly; hex comparison
/// is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    /// Build a digest from its parts, enforcing the same invariants as [`Digest::parse`].
    pub fn new(algorithm: impl Into<String>, hex: impl Into<String>) -> Result<Self, DigestError> {
        let algorithm = algorithm.into();
        let hex = hex.into();
        let input = || format!("{}{}{}", algorithm, SEPARATOR, hex);

        if algorithm.is_empty() {
            return Err(DigestError::Malformed {
                input: input(),
                reason: "empty algorithm",
            });
        }
        if algorithm.contains(SEPARATOR) {
            return Err(DigestError::Malformed {
                input: input(),
                reason: "algorithm contains ':'",
            });
        }
        // The storage name must split back on its first `__`.
        if algorithm.contains(STORAGE_SEPARATOR) || algorithm.ends_with('_') {
            return Err(DigestError::Malformed {
                input: input(),
                reason: "algorithm contains or ends with the storage separator",
            });
        }
        if hex.is_empty() {
            return Err(DigestError::Malformed {
                input: input(),
                reason: "empty hex value",
            });
        }
        if hex.contains(SEPARATOR) {
            return Err(DigestError::Malformed {
                input: input(),
                reason: "hex value contains ':'",
            });
        }

        Ok(Self { algorithm, hex })
    }

    /// Parse `algorithm:hex`, splitting on the first `:`.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let (algorithm, hex) = s.split_once(SEPARATOR).ok_or_else(|| DigestError::Malformed {
            input: s.to_string(),
            reason: "missing ':' separator",
        })?;
        Self::new(algorithm, hex)
    }

    /// Self-hash digest of a manifest document: sha1 over the exact bytes.
    pub fn manifest_self_hash(bytes: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        Self {
            algorithm: SELF_HASH_ALGORITHM.to_string(),
            hex: hex::encode(hasher.finalize()),
        }
    }

    /// The algorithm tag (e.g. `sha256`).
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The hex value without the algorithm prefix.
    pub fn value(&self) -> &str {
        &self.hex
    }

    /// Whether this digest is in the manifest self-hash namespace.
    pub fn is_self_hash(&self) -> bool {
        self.algorithm == SELF_HASH_ALGORITHM
    }

    /// File name used when this blob is stored.
    pub fn storage_name(&self) -> String {
        to_storage_name(self)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.algorithm, SEPARATOR, self.hex)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Digest> for String {
    fn from(d: Digest) -> Self {
        d.to_string()
    }
}
