use std::fmt;

use thiserror::Error;
use valist_ledger::LedgerError;
use valist_store::StoreError;
use valist_types::{Cid, OperationKind, OrgId, TxHash};

/// Pipeline stage an error was raised in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Ledger reads made before anything is written.
    Precheck,
    Staging,
    Submission,
    Confirmation,
    Decoding,
    /// Read paths outside the write pipeline.
    Read,
    Config,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Precheck => "precheck",
            Self::Staging => "staging",
            Self::Submission => "submission",
            Self::Confirmation => "confirmation",
            Self::Decoding => "decoding",
            Self::Read => "read",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SdkError {
    /// Storing the metadata blob failed; nothing was submitted.
    #[error("{op}: staging metadata failed: {source}")]
    StagingFailed {
        op: OperationKind,
        #[source]
        source: StoreError,
    },

    #[error("{op}: metadata could not be encoded: {reason}")]
    MetaEncoding { op: OperationKind, reason: String },

    #[error("{op}: submission rejected: {reason}")]
    SubmissionRejected { op: OperationKind, reason: String },

    /// The wait ended before a receipt appeared. The transaction may still
    /// be mined; check `transaction_status` before retrying.
    #[error("{op}: confirmation of {tx_hash} timed out, outcome unknown")]
    ConfirmationTimeout { op: OperationKind, tx_hash: TxHash },

    #[error("{op}: transaction {tx_hash} reverted: {reason}")]
    TransactionReverted {
        op: OperationKind,
        tx_hash: TxHash,
        reason: String,
    },

    #[error("{op}: expected one {expected} event, found {found}")]
    UnexpectedEventShape {
        op: OperationKind,
        expected: &'static str,
        found: String,
    },

    #[error("content not found: {0}")]
    ContentNotFound(Cid),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("metadata {cid} is corrupt: {reason}")]
    MetaCorrupt { cid: Cid, reason: String },

    #[error("organization {0} does not exist")]
    OrganizationNotExist(OrgId),

    #[error("repository {name} does not exist in organization {org_id}")]
    RepositoryNotExist { org_id: OrgId, name: String },

    #[error("repository {name} already exists in organization {org_id}")]
    RepositoryAlreadyExists { org_id: OrgId, name: String },

    /// Ledger failure inside the write pipeline that is not one of the
    /// outcomes above. A present `tx_hash` means the transaction was
    /// accepted and may still be mined.
    #[error("{op}: ledger failure during {stage}: {source}")]
    LedgerFailure {
        op: OperationKind,
        stage: Stage,
        tx_hash: Option<TxHash>,
        #[source]
        source: LedgerError,
    },

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// Map a ledger failure raised while running `op` through the pipeline.
    /// `tx_hash` is set once the ledger has accepted the transaction.
    pub(crate) fn from_ledger(
        op: OperationKind,
        stage: Stage,
        tx_hash: Option<TxHash>,
        err: LedgerError,
    ) -> Self {
        match err {
            LedgerError::SubmissionRejected(reason) => Self::SubmissionRejected { op, reason },
            LedgerError::Reverted { tx_hash, reason } => Self::TransactionReverted {
                op,
                tx_hash,
                reason,
            },
            LedgerError::ConfirmationTimeout { tx_hash } => {
                Self::ConfirmationTimeout { op, tx_hash }
            }
            source => Self::LedgerFailure {
                op,
                stage,
                tx_hash,
                source,
            },
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::StagingFailed { .. } | Self::MetaEncoding { .. } => Stage::Staging,
            Self::SubmissionRejected { .. } => Stage::Submission,
            Self::ConfirmationTimeout { .. } | Self::TransactionReverted { .. } => {
                Stage::Confirmation
            }
            Self::UnexpectedEventShape { .. } => Stage::Decoding,
            Self::LedgerFailure { stage, .. } => *stage,
            Self::OrganizationNotExist(_)
            | Self::RepositoryNotExist { .. }
            | Self::RepositoryAlreadyExists { .. } => Stage::Precheck,
            Self::ContentNotFound(_)
            | Self::StorageUnavailable(_)
            | Self::MetaCorrupt { .. }
            | Self::Ledger(_) => Stage::Read,
            Self::Config(_) => Stage::Config,
        }
    }

    /// Operation the error was raised for, if it came from the write
    /// pipeline.
    pub fn operation(&self) -> Option<OperationKind> {
        match self {
            Self::StagingFailed { op, .. }
            | Self::MetaEncoding { op, .. }
            | Self::SubmissionRejected { op, .. }
            | Self::ConfirmationTimeout { op, .. }
            | Self::TransactionReverted { op, .. }
            | Self::UnexpectedEventShape { op, .. }
            | Self::LedgerFailure { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Whether the transaction may have been applied despite the error.
    pub fn is_outcome_unknown(&self) -> bool {
        match self {
            Self::ConfirmationTimeout { .. } => true,
            Self::LedgerFailure { tx_hash, .. } => tx_hash.is_some(),
            _ => false,
        }
    }

    /// Hash of the submitted transaction, if the error came after the
    /// ledger accepted it.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::ConfirmationTimeout { tx_hash, .. }
            | Self::TransactionReverted { tx_hash, .. } => Some(*tx_hash),
            Self::LedgerFailure { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }
}

/// Read-path store failures.
impl From<StoreError> for SdkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(cid) => Self::ContentNotFound(cid),
            StoreError::HashMismatch { cid, computed } => Self::MetaCorrupt {
                cid,
                reason: format!("stored bytes hash to {computed}"),
            },
            StoreError::Unavailable(reason) => Self::StorageUnavailable(reason),
            StoreError::Io(e) => Self::StorageUnavailable(e.to_string()),
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_pipeline_errors() {
        let tx_hash = TxHash::from_hash([1; 32]);
        let op = OperationKind::SetOrganizationMeta;

        let err = SdkError::from_ledger(
            op,
            Stage::Confirmation,
            Some(tx_hash),
            LedgerError::Reverted {
                tx_hash,
                reason: "organization does not exist".into(),
            },
        );
        assert!(matches!(err, SdkError::TransactionReverted { .. }));
        assert_eq!(err.stage(), Stage::Confirmation);
        assert_eq!(err.operation(), Some(op));

        let err = SdkError::from_ledger(
            op,
            Stage::Confirmation,
            Some(tx_hash),
            LedgerError::ConfirmationTimeout { tx_hash },
        );
        assert!(err.is_outcome_unknown());
        assert_eq!(err.tx_hash(), Some(tx_hash));

        let err = SdkError::from_ledger(
            op,
            Stage::Submission,
            None,
            LedgerError::SubmissionRejected("nonce".into()),
        );
        assert_eq!(err.stage(), Stage::Submission);
    }

    #[test]
    fn pipeline_ledger_failures_keep_their_context() {
        let op = OperationKind::CreateOrganization;
        let before = SdkError::from_ledger(
            op,
            Stage::Submission,
            None,
            LedgerError::Unavailable("connection reset".into()),
        );
        assert_eq!(before.stage(), Stage::Submission);
        assert_eq!(before.operation(), Some(op));
        assert!(!before.is_outcome_unknown());

        let tx_hash = TxHash::from_hash([2; 32]);
        let after = SdkError::from_ledger(
            op,
            Stage::Confirmation,
            Some(tx_hash),
            LedgerError::Encoding("truncated receipt".into()),
        );
        assert_eq!(after.stage(), Stage::Confirmation);
        assert!(after.is_outcome_unknown());
        assert_eq!(after.tx_hash(), Some(tx_hash));

        let read = SdkError::from(LedgerError::Unavailable("down".into()));
        assert_eq!(read.stage(), Stage::Read);
        assert_eq!(read.operation(), None);
    }

    #[test]
    fn store_errors_map_to_read_errors() {
        let cid = Cid::for_content(b"x");
        assert!(matches!(
            SdkError::from(StoreError::NotFound(cid)),
            SdkError::ContentNotFound(c) if c == cid
        ));
        assert!(matches!(
            SdkError::from(StoreError::Unavailable("offline".into())),
            SdkError::StorageUnavailable(_)
        ));
        let corrupt = SdkError::from(StoreError::HashMismatch {
            cid,
            computed: Cid::for_content(b"y"),
        });
        assert!(matches!(corrupt, SdkError::MetaCorrupt { .. }));
        assert_eq!(corrupt.stage(), Stage::Read);
    }

    #[test]
    fn staging_failure_reports_stage_and_operation() {
        let err = SdkError::StagingFailed {
            op: OperationKind::CreateOrganization,
            source: StoreError::Unavailable("offline".into()),
        };
        assert_eq!(err.stage(), Stage::Staging);
        assert_eq!(err.operation(), Some(OperationKind::CreateOrganization));
        assert!(err.to_string().contains("CreateOrganization"));
    }
}
