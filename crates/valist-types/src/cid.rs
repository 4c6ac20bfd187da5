use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content identifier for a blob in the content-addressed store.
///
/// A `Cid` is the BLAKE3 hash of the blob bytes. Its string form is
/// self-describing (`cidv1-blake3-<hex>`): the prefix names the identifier
/// version and the hash function, so a reader can verify a blob without any
/// out-of-band knowledge. Identical content always produces the same `Cid`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid([u8; 32]);

impl Cid {
    /// String prefix of every encoded identifier.
    pub const PREFIX: &'static str = "cidv1-blake3-";

    /// Compute the identifier of raw content.
    pub fn for_content(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed digest.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// The raw 32-byte digest.
    pub fn digest(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns `true` if `data` hashes to this identifier.
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::for_content(data) == *self
    }

    /// Short hex representation (first 8 characters of the digest).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse the self-describing string form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let digest = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| TypeError::InvalidCid(format!("missing prefix in {s:?}")))?;
        let bytes = hex::decode(digest).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.short_hex())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, hex::encode(self.0))
    }
}

impl FromStr for Cid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// CIDs travel as strings on the wire and inside metadata, never as bytes.
impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
