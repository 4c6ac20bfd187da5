//! Store-then-submit-then-confirm pipeline shared by every mutating call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use valist_ledger::{
    await_mined, CallContext, Call, ContractEvent, Ledger, LedgerError, PollPolicy, TxHandle,
    TxRequest,
};
use valist_store::ContentStore;
use valist_types::{
    Address, Cid, KeyOperation, OperationId, OperationKind, OrgId, OrganizationMeta,
    RepositoryMeta, Scope, TxHash,
};

use crate::account::TransactionSigner;
use crate::config::ClientConfig;
use crate::error::{SdkError, SdkResult, Stage};
use crate::events::EventDecoder;

/// A mutating registry operation with its payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    CreateOrganization {
        meta: OrganizationMeta,
    },
    SetOrganizationMeta {
        org_id: OrgId,
        meta: OrganizationMeta,
    },
    CreateRepository {
        org_id: OrgId,
        name: String,
        meta: RepositoryMeta,
    },
    SetRepositoryMeta {
        org_id: OrgId,
        name: String,
        meta: RepositoryMeta,
    },
    VoteKey {
        org_id: OrgId,
        scope: Scope,
        operation: KeyOperation,
        key: Address,
    },
    VoteThreshold {
        org_id: OrgId,
        scope: Scope,
        threshold: u64,
    },
}

impl Operation {
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

    /// Organization the operation targets; `None` until one is created.
    pub fn org_id(&self) -> Option<OrgId> {
        match self {
            Self::CreateOrganization { .. } => None,
            Self::SetOrganizationMeta { org_id, .. }
            | Self::CreateRepository { org_id, .. }
            | Self::SetRepositoryMeta { org_id, .. }
            | Self::VoteKey { org_id, .. }
            | Self::VoteThreshold { org_id, .. } => Some(*org_id),
        }
    }
}

/// Lifecycle of one in-flight operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Staging,
    Submitted,
    Confirmed,
    TimedOut,
    Reverted,
    StagingFailed,
    Rejected,
    Malformed,
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Confirmed
                | Self::TimedOut
                | Self::Reverted
                | Self::StagingFailed
                | Self::Rejected
                | Self::Malformed
        )
    }

    fn can_advance_to(&self, next: TxState) -> bool {
        use TxState::*;
        matches!(
            (self, next),
            (Idle, Staging)
                | (Staging, StagingFailed | Rejected | Submitted)
                | (Submitted, Confirmed | TimedOut | Reverted | Malformed)
        )
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ephemeral record of a submitted-but-unconfirmed mutation. Owned by a
/// single `execute` call and dropped when it returns.
#[derive(Debug)]
pub struct PendingTransaction {
    id: OperationId,
    kind: OperationKind,
    state: TxState,
    meta_cid: Option<Cid>,
    tx_hash: Option<TxHash>,
}

impl PendingTransaction {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            id: OperationId::new(),
            kind,
            state: TxState::Idle,
            meta_cid: None,
            tx_hash: None,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn meta_cid(&self) -> Option<Cid> {
        self.meta_cid
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        self.tx_hash
    }

    fn advance(&mut self, next: TxState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {} -> {next}",
            self.state
        );
        debug!(
            op_id = %self.id,
            kind = %self.kind,
            from = %self.state,
            to = %next,
            "operation state changed"
        );
        self.state = next;
    }
}

/// Result of a confirmed operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Confirmed<E> {
    pub operation_id: OperationId,
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// Metadata blob staged for the operation, if it carried one.
    pub meta_cid: Option<Cid>,
    pub event: E,
}

/// Runs operations through stage, submit, await and decode.
///
/// Holds no state across calls; the signer is supplied per call.
#[derive(Clone)]
pub struct TransactionOrchestrator {
    ledger: Arc<dyn Ledger>,
    store: Arc<dyn ContentStore>,
    chain_id: u64,
    policy: PollPolicy,
    confirmation_timeout: Duration,
}

impl TransactionOrchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        store: Arc<dyn ContentStore>,
        chain_id: u64,
        config: &ClientConfig,
    ) -> Self {
        Self {
            ledger,
            store,
            chain_id,
            policy: config.poll_policy(),
            confirmation_timeout: config.confirmation_timeout(),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Run `op` to completion and return the `E` event it emitted.
    ///
    /// The metadata blob, if any, is stored before the transaction is
    /// built; a staging failure means nothing was submitted.
    pub async fn execute<E: ContractEvent>(
        &self,
        signer: &dyn TransactionSigner,
        op: Operation,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<E>> {
        let kind = op.kind();
        let mut pending = PendingTransaction::new(kind);

        pending.advance(TxState::Staging);
        let call = match self.stage(&op).await {
            Ok((call, meta_cid)) => {
                pending.meta_cid = meta_cid;
                call
            }
            Err(e) => {
                pending.advance(TxState::StagingFailed);
                warn!(op_id = %pending.id, %kind, error = %e, "staging failed");
                return Err(e);
            }
        };

        let handle = match self.submit(signer, call).await {
            Ok(handle) => handle,
            Err(e) => {
                pending.advance(TxState::Rejected);
                warn!(op_id = %pending.id, %kind, error = %e, "submission failed");
                return Err(SdkError::from_ledger(kind, Stage::Submission, None, e));
            }
        };
        pending.tx_hash = Some(handle.tx_hash);
        pending.advance(TxState::Submitted);

        let bounded = ctx.bounded(self.confirmation_timeout);
        let receipt = match await_mined(&*self.ledger, &handle, &self.policy, &bounded).await {
            Ok(receipt) => receipt,
            Err(e) => {
                let state = match e {
                    LedgerError::Reverted { .. } => TxState::Reverted,
                    _ => TxState::TimedOut,
                };
                pending.advance(state);
                return Err(SdkError::from_ledger(
                    kind,
                    Stage::Confirmation,
                    Some(handle.tx_hash),
                    e,
                ));
            }
        };

        let event = match EventDecoder::decode_single::<E>(kind, &receipt) {
            Ok(event) => event,
            Err(e) => {
                pending.advance(TxState::Malformed);
                return Err(e);
            }
        };
        pending.advance(TxState::Confirmed);
        info!(
            op_id = %pending.id,
            %kind,
            tx = %handle.tx_hash.short_hex(),
            block = receipt.block_number,
            "operation confirmed"
        );

        Ok(Confirmed {
            operation_id: pending.id,
            tx_hash: handle.tx_hash,
            block_number: receipt.block_number,
            meta_cid: pending.meta_cid,
            event,
        })
    }

    /// Store the operation's metadata, if any, and build its call data.
    async fn stage(&self, op: &Operation) -> SdkResult<(Call, Option<Cid>)> {
        let kind = op.kind();
        let staged = match op {
            Operation::CreateOrganization { meta } => {
                let meta_cid = self.put_meta(kind, meta).await?;
                (Call::CreateOrganization { meta_cid }, Some(meta_cid))
            }
            Operation::SetOrganizationMeta { org_id, meta } => {
                let meta_cid = self.put_meta(kind, meta).await?;
                let call = Call::SetOrganizationMeta {
                    org_id: *org_id,
                    meta_cid,
                };
                (call, Some(meta_cid))
            }
            Operation::CreateRepository { org_id, name, meta } => {
                let meta_cid = self.put_meta(kind, meta).await?;
                let call = Call::CreateRepository {
                    org_id: *org_id,
                    name: name.clone(),
                    meta_cid,
                };
                (call, Some(meta_cid))
            }
            Operation::SetRepositoryMeta { org_id, name, meta } => {
                let meta_cid = self.put_meta(kind, meta).await?;
                let call = Call::SetRepositoryMeta {
                    org_id: *org_id,
                    name: name.clone(),
                    meta_cid,
                };
                (call, Some(meta_cid))
            }
            Operation::VoteKey {
                org_id,
                scope,
                operation,
                key,
            } => {
                let call = Call::VoteKey {
                    org_id: *org_id,
                    repo_name: scope.repo_name().map(str::to_string),
                    operation: *operation,
                    key: *key,
                };
                (call, None)
            }
            Operation::VoteThreshold {
                org_id,
                scope,
                threshold,
            } => {
                let call = Call::VoteThreshold {
                    org_id: *org_id,
                    repo_name: scope.repo_name().map(str::to_string),
                    threshold: *threshold,
                };
                (call, None)
            }
        };
        Ok(staged)
    }

    async fn put_meta<T: Serialize + Sync>(&self, op: OperationKind, meta: &T) -> SdkResult<Cid> {
        let bytes = serde_json::to_vec(meta).map_err(|e| SdkError::MetaEncoding {
            op,
            reason: e.to_string(),
        })?;
        let cid = self
            .store
            .put(&bytes)
            .await
            .map_err(|source| SdkError::StagingFailed { op, source })?;
        debug!(%op, cid = %cid.short_hex(), len = bytes.len(), "metadata staged");
        Ok(cid)
    }

    async fn submit(
        &self,
        signer: &dyn TransactionSigner,
        call: Call,
    ) -> Result<TxHandle, LedgerError> {
        let from = signer.address();
        let confirmed = self.ledger.next_nonce(&from).await?;
        let nonce = signer.reserve_nonce(confirmed);
        let request = TxRequest {
            chain_id: self.chain_id,
            from,
            nonce,
            call,
        };

        let submitted = match signer.sign(request) {
            Ok(tx) => self.ledger.submit(tx).await,
            Err(e) => Err(e),
        };
        if submitted.is_err() {
            signer.release_nonce(nonce);
        }
        submitted
    }
}

impl fmt::Debug for TransactionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionOrchestrator")
            .field("chain_id", &self.chain_id)
            .field("policy", &self.policy)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}
