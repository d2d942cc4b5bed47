//! Content-address digests in canonical `algorithm:encoded` form.
//!
//! A [`Digest`] is the opaque, immutable key under which content (and its
//! metadata) is addressed, e.g. `sha256:2cf24d…`. Digests are validated on
//! construction; everything downstream can treat them as plain comparable
//! strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::CoreError;

/// Hex length of a sha256 payload.
const SHA256_ENCODED_LEN: usize = 64;

/// A validated content digest: `algorithm:encoded`.
///
/// Construct via [`Digest::sha256`] or by parsing a canonical string with
/// [`FromStr`]. Cheap to clone, hashable, and totally ordered by its
/// canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Compute the sha256 digest of a byte slice.
    pub fn sha256(bytes: impl AsRef<[u8]>) -> Self {
        let hash = Sha256::digest(bytes.as_ref());
        Digest(format!("sha256:{}", hex::encode(hash)))
    }

    /// The algorithm portion, e.g. `sha256`.
    pub fn algorithm(&self) -> &str {
        // Validated at construction: exactly one ':' separator exists.
        self.0.split_once(':').map(|(a, _)| a).unwrap_or_default()
    }

    /// The encoded payload portion (lowercase hex).
    pub fn encoded(&self) -> &str {
        self.0.split_once(':').map(|(_, e)| e).unwrap_or_default()
    }

    /// The full canonical `algorithm:encoded` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), String> {
        let Some((algorithm, encoded)) = s.split_once(':') else {
            return Err("missing ':' separator".to_string());
        };
        if algorithm.is_empty() {
            return Err("empty algorithm".to_string());
        }
        if !algorithm.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-')
        }) {
            return Err(format!("invalid algorithm {algorithm:?}"));
        }
        if encoded.is_empty() {
            return Err("empty encoded payload".to_string());
        }
        if !encoded
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err("payload is not lowercase hex".to_string());
        }
        if algorithm == "sha256" && encoded.len() != SHA256_ENCODED_LEN {
            return Err(format!(
                "sha256 payload must be {SHA256_ENCODED_LEN} hex chars, got {}",
                encoded.len()
            ));
        }
        Ok(())
    }
}

impl FromStr for Digest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::validate(s).map_err(|reason| CoreError::InvalidDigest {
            digest: s.to_string(),
            reason,
        })?;
        Ok(Digest(s.to_string()))
    }
}

impl TryFrom<String> for Digest {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Digest::validate(&s).map_err(|reason| CoreError::InvalidDigest {
            digest: s.clone(),
            reason,
        })?;
        Ok(Digest(s))
    }
}

impl From<Digest> for String {
    fn from(d: Digest) -> String {
        d.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
