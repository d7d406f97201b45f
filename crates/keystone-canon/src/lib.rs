//! Canonical JSON helpers and the stable SHA-256 digest type used across Keystone.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sha2::{Digest, Sha256};
use std::fmt;

/// Serialize a value into its canonical JSON form: compact separators and
/// lexicographically sorted object keys at every nesting level. Semantically
/// equal inputs always produce byte-equal output, which is what makes two
/// independent hashing layers comparable.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonError> {
    // Round-tripping through `serde_json::Value` sorts keys: the default
    // `Map` is BTreeMap-backed, and `to_string` emits compact separators.
    let canonical: serde_json::Value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&canonical)?)
}

/// Error returned when a value cannot be canonicalized (non-finite floats,
/// non-string map keys, serializer failures).
#[derive(Debug, thiserror::Error)]
#[error("canonicalization error: {0}")]
pub struct CanonError(#[from] serde_json::Error);

/// Wrapper around a 32-byte SHA-256 digest used to key committed envelopes.
///
/// Rendered as bare 64-character lowercase hex, matching the store's row keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvelopeHash([u8; 32]);

impl EnvelopeHash {
    /// Compute the digest of a value's canonical JSON encoding.
    pub fn of_value<T: Serialize>(value: &T) -> Result<Self, CanonError> {
        Ok(Self::of_bytes(to_canonical_json(value)?.as_bytes()))
    }

    /// Compute the digest of the provided byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&digest);
        EnvelopeHash(arr)
    }

    /// Borrow the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a digest from its 64-character hex representation.
    pub fn from_hex_str(s: &str) -> Result<Self, HashParseError> {
        if s.len() != 64 {
            return Err(HashParseError::InvalidLength(s.len()));
        }
        let mut buf = [0u8; 32];
        hex::decode_to_slice(s, &mut buf).map_err(HashParseError::InvalidHex)?;
        Ok(EnvelopeHash(buf))
    }
}

impl fmt::Debug for EnvelopeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnvelopeHash").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for EnvelopeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; 32]> for EnvelopeHash {
    fn from(value: [u8; 32]) -> Self {
        EnvelopeHash(value)
    }
}

impl From<EnvelopeHash> for [u8; 32] {
    fn from(value: EnvelopeHash) -> Self {
        value.0
    }
}

impl TryFrom<&str> for EnvelopeHash {
    type Error = HashParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        EnvelopeHash::from_hex_str(value)
    }
}

impl Serialize for EnvelopeHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EnvelopeHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        EnvelopeHash::from_hex_str(&s).map_err(de::Error::custom)
    }
}

/// Error returned when a hex digest string is malformed.
#[derive(Debug, thiserror::Error)]
pub enum HashParseError {
    #[error("hash hex length must be 64, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
