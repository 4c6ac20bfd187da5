//! Event payloads emitted by the registry contract.
//!
//! Each event type is identified on the wire by the topic derived from its
//! signature string. Payloads are bincode-encoded.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use valist_crypto::ContentHasher;
use valist_types::{Address, Cid, EventTopic, KeyOperation, OrgId};

use crate::error::{LedgerError, LedgerResult};

/// A typed registry contract event.
pub trait ContractEvent: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Short event name, e.g. `"OrgCreated"`.
    const NAME: &'static str;
    /// Full signature string the topic is derived from.
    const SIGNATURE: &'static str;

    /// Organization the event concerns; indexed on the log.
    fn org_id(&self) -> OrgId;

    fn topic() -> EventTopic {
        ContentHasher::event_topic(Self::SIGNATURE)
    }

    fn encode(&self) -> LedgerResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LedgerError::Encoding(e.to_string()))
    }

    fn decode(data: &[u8]) -> LedgerResult<Self> {
        bincode::deserialize(data).map_err(|e| LedgerError::Encoding(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgCreated {
    pub org_id: OrgId,
    pub meta_cid: Cid,
    pub admin: Address,
}

impl ContractEvent for OrgCreated {
    const NAME: &'static str = "OrgCreated";
    const SIGNATURE: &'static str = "OrgCreated(bytes32,string,address)";

    fn org_id(&self) -> OrgId {
        self.org_id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoCreated {
    pub org_id: OrgId,
    pub repo_name: String,
    pub meta_cid: Cid,
    pub signer: Address,
}

impl ContractEvent for RepoCreated {
    const NAME: &'static str = "RepoCreated";
    const SIGNATURE: &'static str = "RepoCreated(bytes32,string,string,address)";

    fn org_id(&self) -> OrgId {
        self.org_id
    }
}

/// Metadata pointer change for an organization (`repo_name = None`) or one
/// of its repositories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaUpdate {
    pub org_id: OrgId,
    pub repo_name: Option<String>,
    pub signer: Address,
    pub meta_cid: Cid,
}

impl ContractEvent for MetaUpdate {
    const NAME: &'static str = "MetaUpdate";
    const SIGNATURE: &'static str = "MetaUpdate(bytes32,string,address,string)";

    fn org_id(&self) -> OrgId {
        self.org_id
    }
}

/// One key vote as recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteKeyEvent {
    pub org_id: OrgId,
    pub repo_name: Option<String>,
    pub signer: Address,
    pub operation: KeyOperation,
    pub key: Address,
    /// Distinct votes accumulated for this change, including this one.
    pub sig_count: u64,
    /// Threshold in force when the vote was counted.
    pub threshold: u64,
}

impl VoteKeyEvent {
    /// Whether this vote made the change take effect.
    pub fn is_applied(&self) -> bool {
        self.operation == KeyOperation::Rotate || self.sig_count >= self.threshold.max(1)
    }
}

impl ContractEvent for VoteKeyEvent {
    const NAME: &'static str = "VoteKeyEvent";
    const SIGNATURE: &'static str =
        "VoteKeyEvent(bytes32,string,address,bytes32,address,uint256,uint256)";

    fn org_id(&self) -> OrgId {
        self.org_id
    }
}

/// One threshold vote as recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteThresholdEvent {
    pub org_id: OrgId,
    pub repo_name: Option<String>,
    pub signer: Address,
    pub pending_threshold: u64,
    pub sig_count: u64,
    /// Threshold in force after the vote was counted.
    pub threshold: u64,
}

impl VoteThresholdEvent {
    /// Whether this vote made the new threshold take effect.
    pub fn is_applied(&self) -> bool {
        self.threshold == self.pending_threshold
    }
}

impl ContractEvent for VoteThresholdEvent {
    const NAME: &'static str = "VoteThresholdEvent";
    const SIGNATURE: &'static str =
        "VoteThresholdEvent(bytes32,string,address,uint256,uint256,uint256)";

    fn org_id(&self) -> OrgId {
        self.org_id
    }
}
