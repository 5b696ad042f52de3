//! Content digests (`sha256:<hex>`).

use std::fmt;
use std::str::FromStr;

use obom_core::error::{ObomError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Hash algorithms a digest may be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DigestAlgorithm {
    Sha256,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Length of the hex-encoded hash value.
    fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm-tagged content hash of an exact byte sequence.
///
/// Computed once from the bytes and carried around afterwards; nothing in
/// obom recomputes a digest implicitly except store-side integrity checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: DigestAlgorithm,
    hex: String,
}

impl Digest {
    /// SHA-256 digest of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            hex: hex::encode(Sha256::digest(data)),
        }
    }

    /// Parse `algorithm:hex`.
    pub fn parse(s: &str) -> Result<Self> {
        let (algorithm, encoded) = s
            .split_once(':')
            .ok_or_else(|| ObomError::InvalidDigest(format!("'{}': expected algorithm:hex", s)))?;

        let algorithm = match algorithm {
            "sha256" => DigestAlgorithm::Sha256,
            other => {
                return Err(ObomError::InvalidDigest(format!(
                    "'{}': unsupported algorithm '{}'",
                    s, other
                )))
            }
        };

        let well_formed = encoded.len() == algorithm.hex_len()
            && encoded
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !well_formed {
            return Err(ObomError::InvalidDigest(format!(
                "'{}': expected {} lowercase hex characters",
                s,
                algorithm.hex_len()
            )));
        }

        Ok(Self {
            algorithm,
            hex: encoded.to_string(),
        })
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Hex-encoded hash value without the algorithm prefix.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Whether `data` hashes to this digest.
    pub fn verifies(&self, data: &[u8]) -> bool {
        match self.algorithm {
            DigestAlgorithm::Sha256 => Digest::from_bytes(data) == *self,
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl FromStr for Digest {
    type Err = ObomError;

    fn from_str(s: &str) -> Result<Self> {
        Digest::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = ObomError;

    fn try_from(s: String) -> Result<Self> {
        Digest::parse(&s)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}
