use serde::{Deserialize, Serialize};
use valist_crypto::{AccountKey, ContentHasher, PublicKey, TxSignature};
use valist_types::{Address, Cid, EventTopic, KeyOperation, OperationKind, OrgId, TxHash};

use crate::error::{LedgerError, LedgerResult};

/// Typed call data of a registry transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    CreateOrganization {
        meta_cid: Cid,
    },
    SetOrganizationMeta {
        org_id: OrgId,
        meta_cid: Cid,
    },
    CreateRepository {
        org_id: OrgId,
        name: String,
        meta_cid: Cid,
    },
    SetRepositoryMeta {
        org_id: OrgId,
        name: String,
        meta_cid: Cid,
    },
    /// Key vote; `repo_name = None` targets the organization admins.
    VoteKey {
        org_id: OrgId,
        repo_name: Option<String>,
        operation: KeyOperation,
        key: Address,
    },
    VoteThreshold {
        org_id: OrgId,
        repo_name: Option<String>,
        threshold: u64,
    },
}

impl Call {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateOrganization { .. } => OperationKind::CreateOrganization,
            Self::SetOrganizationMeta { .. } => OperationKind::SetOrganizationMeta,
            Self::CreateRepository { .. } => OperationKind::CreateRepository,
            Self::SetRepositoryMeta { .. } => OperationKind::SetRepositoryMeta,
            Self::VoteKey { .. } => OperationKind::VoteAdminKey,
            Self::VoteThreshold { .. } => OperationKind::VoteThreshold,
        }
    }

    /// The metadata CID this call makes the ledger reference, if any.
    pub fn meta_cid(&self) -> Option<&Cid> {
        match self {
            Self::CreateOrganization { meta_cid }
            | Self::SetOrganizationMeta { meta_cid, .. }
            | Self::CreateRepository { meta_cid, .. }
            | Self::SetRepositoryMeta { meta_cid, .. } => Some(meta_cid),
            Self::VoteKey { .. } | Self::VoteThreshold { .. } => None,
        }
    }

    /// Wire encoding of the call data.
    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LedgerError::Encoding(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> LedgerResult<Self> {
        bincode::deserialize(data).map_err(|e| LedgerError::Encoding(e.to_string()))
    }
}

/// Unsigned transaction request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    pub chain_id: u64,
    pub from: Address,
    pub nonce: u64,
    pub call: Call,
}

impl TxRequest {
    /// Hash of the encoded request; this is what gets signed.
    pub fn hash(&self) -> LedgerResult<TxHash> {
        ContentHasher::tx_hash(self).map_err(|e| LedgerError::Encoding(e.to_string()))
    }
}

/// Signed transaction envelope as submitted to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub request: TxRequest,
    pub public_key: [u8; 32],
    pub signature: TxSignature,
}

impl SignedTransaction {
    /// Sign `request` with `key`. The request's `from` must be the key's
    /// address.
    pub fn sign(request: TxRequest, key: &AccountKey) -> LedgerResult<Self> {
        if request.from != key.address() {
            return Err(LedgerError::SubmissionRejected(format!(
                "sender {} does not match signing key {}",
                request.from,
                key.address()
            )));
        }
        let hash = request.hash()?;
        let signature = key.sign_tx(&hash);
        Ok(Self {
            request,
            public_key: key.public_key().to_bytes(),
            signature,
        })
    }

    pub fn hash(&self) -> LedgerResult<TxHash> {
        self.request.hash()
    }

    /// Check that the envelope is signed by the key controlling `from`.
    pub fn verify(&self) -> LedgerResult<TxHash> {
        let key = PublicKey::from_bytes(self.public_key)
            .map_err(|e| LedgerError::SubmissionRejected(e.to_string()))?;
        if key.address() != self.request.from {
            return Err(LedgerError::SubmissionRejected(
                "public key does not control sender address".into(),
            ));
        }
        let hash = self.hash()?;
        key.verify_tx(&hash, &self.signature)
            .map_err(|e| LedgerError::SubmissionRejected(e.to_string()))?;
        Ok(hash)
    }
}

/// Handle to a submitted, not yet confirmed transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxHandle {
    pub tx_hash: TxHash,
    pub from: Address,
    pub nonce: u64,
}

/// Execution result recorded in a receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
    Reverted { reason: String },
}

/// Proof of inclusion for a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// Unix seconds.
    pub block_timestamp: u64,
    pub status: ReceiptStatus,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ReceiptStatus::Success)
    }

    /// Logs whose topic matches `topic`.
    pub fn logs_with_topic(&self, topic: &EventTopic) -> impl Iterator<Item = &Log> {
        let topic = *topic;
        self.logs.iter().filter(move |log| log.topic == topic)
    }
}

/// A single event emitted during transaction execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u32,
    pub topic: EventTopic,
    /// Indexed organization the event concerns.
    pub org_id: OrgId,
    /// Encoded event payload.
    pub data: Vec<u8>,
}

/// Query over historical logs.
#[derive(Clone, Debug, Default)]
pub struct LogFilter {
    pub org_id: Option<OrgId>,
    /// Empty matches every topic.
    pub topics: Vec<EventTopic>,
    pub from_block: u64,
}

impl LogFilter {
    pub fn for_org(org_id: OrgId) -> Self {
        Self {
            org_id: Some(org_id),
            ..Default::default()
        }
    }

    pub fn with_topic(mut self, topic: EventTopic) -> Self {
        self.topics.push(topic);
        self
    }

    pub fn matches(&self, log: &Log) -> bool {
        if log.block_number < self.from_block {
            return false;
        }
        if let Some(org_id) = self.org_id {
            if log.org_id != org_id {
                return false;
            }
        }
        self.topics.is_empty() || self.topics.contains(&log.topic)
    }
}

/// What the ledger knows about a transaction hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Never seen, or dropped from the pool.
    Unknown,
    /// Accepted into the pool, not yet included.
    Pending,
    Mined(Receipt),
}
