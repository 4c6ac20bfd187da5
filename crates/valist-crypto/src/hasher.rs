use valist_types::{EventTopic, OrgId, TxHash};

/// Domain-separated BLAKE3 hasher.
///
/// Each hasher carries a domain tag (e.g., `"valist-tx-v1"`) that is
/// prepended to every hash computation, so a transaction and an event
/// signature with identical bytes never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for transaction requests.
    pub const TX: Self = Self {
        domain: "valist-tx-v1",
    };
    /// Hasher for organization ID derivation.
    pub const ORG: Self = Self {
        domain: "valist-org-v1",
    };
    /// Hasher for event signatures.
    pub const EVENT: Self = Self {
        domain: "valist-event-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }

    /// Hash a serializable value in its bincode wire encoding.
    pub fn hash_encoded<T: serde::Serialize>(&self, value: &T) -> Result<[u8; 32], HasherError> {
        let data = bincode::serialize(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Transaction hash of an encodable request.
    pub fn tx_hash<T: serde::Serialize>(request: &T) -> Result<TxHash, HasherError> {
        Self::TX.hash_encoded(request).map(TxHash::from_hash)
    }

    /// Topic of an event signature such as `"OrgCreated(bytes32,string,address)"`.
    pub fn event_topic(signature: &str) -> EventTopic {
        EventTopic::from_hash(Self::EVENT.hash(signature.as_bytes()))
    }

    /// Organization ID for the `sequence`-th organization on `chain_id`.
    pub fn org_id(chain_id: u64, sequence: u64) -> OrgId {
        let mut data = [0u8; 16];
        data[..8].copy_from_slice(&chain_id.to_be_bytes());
        data[8..].copy_from_slice(&sequence.to_be_bytes());
        OrgId::from_hash(Self::ORG.hash(&data))
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
