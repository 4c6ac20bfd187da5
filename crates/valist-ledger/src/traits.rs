use async_trait::async_trait;
use valist_types::{Address, OrgId, Organization, Repository, TxHash};

use crate::error::LedgerResult;
use crate::tx::{Log, LogFilter, Receipt, SignedTransaction, TxHandle, TxStatus};

/// Read boundary for on-chain registry state.
///
/// Missing entities are reported as `None`, never as zero-valued records.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Chain the ledger serves; signed requests must carry the same ID.
    async fn chain_id(&self) -> LedgerResult<u64>;

    async fn organization(&self, org_id: &OrgId) -> LedgerResult<Option<Organization>>;

    async fn repository(&self, org_id: &OrgId, name: &str) -> LedgerResult<Option<Repository>>;

    /// Admin keys of an organization, or `None` if it does not exist.
    async fn organization_members(&self, org_id: &OrgId) -> LedgerResult<Option<Vec<Address>>>;

    /// Developer keys of a repository, or `None` if it does not exist.
    async fn repository_members(
        &self,
        org_id: &OrgId,
        name: &str,
    ) -> LedgerResult<Option<Vec<Address>>>;

    /// Next nonce the ledger will accept from `address`, counting only
    /// mined transactions.
    async fn next_nonce(&self, address: &Address) -> LedgerResult<u64>;

    async fn transaction_status(&self, tx_hash: &TxHash) -> LedgerResult<TxStatus>;

    /// Historical logs matching `filter`, in block order.
    async fn logs(&self, filter: &LogFilter) -> LedgerResult<Vec<Log>>;
}

/// Write boundary: submission and receipt polling.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Hand a signed transaction to the ledger. Returns once the ledger has
    /// accepted it into its pool; inclusion is observed via `receipt`.
    async fn submit(&self, tx: SignedTransaction) -> LedgerResult<TxHandle>;

    /// Receipt of a mined transaction, `None` while pending or unknown.
    async fn receipt(&self, tx_hash: &TxHash) -> LedgerResult<Option<Receipt>>;
}

/// Full ledger capability.
pub trait Ledger: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter + ?Sized> Ledger for T {}
