use valist_ledger::{CallContext, VoteKeyEvent, VoteThresholdEvent};
use valist_types::{Address, KeyOperation, OrgId, Scope};

use crate::account::TransactionSigner;
use crate::error::SdkResult;
use crate::orchestrator::{Confirmed, Operation, TransactionOrchestrator};

/// Threshold-vote operations.
///
/// Each call submits exactly one vote and reports what the ledger recorded.
/// Quorum counting happens on the ledger only; inspect
/// [`VoteKeyEvent::is_applied`] or [`VoteThresholdEvent::is_applied`] to see
/// whether a vote took effect.
#[derive(Clone, Debug)]
pub struct GovernanceCoordinator {
    orchestrator: TransactionOrchestrator,
}

impl GovernanceCoordinator {
    pub fn new(orchestrator: TransactionOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Vote to add, revoke, or rotate a member key of `scope`.
    pub async fn vote_admin(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        scope: Scope,
        operation: KeyOperation,
        key: Address,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<VoteKeyEvent>> {
        let op = Operation::VoteKey {
            org_id,
            scope,
            operation,
            key,
        };
        self.orchestrator.execute(signer, op, ctx).await
    }

    /// Vote to change the signature threshold of `scope`.
    pub async fn vote_threshold(
        &self,
        signer: &dyn TransactionSigner,
        org_id: OrgId,
        scope: Scope,
        threshold: u64,
        ctx: &CallContext,
    ) -> SdkResult<Confirmed<VoteThresholdEvent>> {
        let op = Operation::VoteThreshold {
            org_id,
            scope,
            threshold,
        };
        self.orchestrator.execute(signer, op, ctx).await
    }
}
