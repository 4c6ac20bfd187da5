use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use valist_types::{Address, OrgId, Organization, Repository, TxHash};

use crate::contract::RegistryState;
use crate::error::{LedgerError, LedgerResult};
use crate::traits::{LedgerReader, LedgerWriter};
use crate::tx::{
    Log, LogFilter, Receipt, ReceiptStatus, SignedTransaction, TxHandle, TxStatus,
};

/// When submitted transactions are included in blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MiningMode {
    /// Every accepted submission is mined right away.
    #[default]
    Instant,
    /// Transactions wait in the pool until [`InMemoryLedger::mine`] runs.
    Manual,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    pub chain_id: u64,
    pub mining: MiningMode,
    /// Charged per included transaction. Zero disables balance checks.
    pub tx_fee: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            mining: MiningMode::Instant,
            tx_fee: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Account {
    nonce: u64,
    balance: u64,
}

#[derive(Debug)]
struct LedgerState {
    registry: RegistryState,
    accounts: HashMap<Address, Account>,
    /// Pool keyed by (sender, nonce).
    mempool: BTreeMap<(Address, u64), (TxHash, SignedTransaction)>,
    pending: HashSet<TxHash>,
    receipts: HashMap<TxHash, Receipt>,
    logs: Vec<Log>,
    block_number: u64,
    block_timestamp: u64,
}

impl LedgerState {
    fn nonce_of(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.nonce)
    }

    fn pending_from(&self, address: &Address) -> u64 {
        self.mempool
            .range((*address, 0)..=(*address, u64::MAX))
            .count() as u64
    }
}

/// In-memory ledger simulating block production and the registry contract.
///
/// Intended for tests, local demos, and embedding.
pub struct InMemoryLedger {
    config: LedgerConfig,
    inner: RwLock<LedgerState>,
    submitted: AtomicU64,
}

impl InMemoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let registry = RegistryState::new(config.chain_id);
        Self {
            config,
            inner: RwLock::new(LedgerState {
                registry,
                accounts: HashMap::new(),
                mempool: BTreeMap::new(),
                pending: HashSet::new(),
                receipts: HashMap::new(),
                logs: Vec::new(),
                block_number: 0,
                block_timestamp: 0,
            }),
            submitted: AtomicU64::new(0),
        }
    }

    /// Ledger that mines every submission immediately.
    pub fn instant(chain_id: u64) -> Self {
        Self::new(LedgerConfig {
            chain_id,
            ..Default::default()
        })
    }

    /// Ledger that only mines when asked to.
    pub fn manual(chain_id: u64) -> Self {
        Self::new(LedgerConfig {
            chain_id,
            mining: MiningMode::Manual,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Number of transactions accepted by `submit`.
    pub fn submitted_count(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Transactions waiting in the pool.
    pub fn pending_count(&self) -> LedgerResult<usize> {
        Ok(self.read()?.mempool.len())
    }

    pub fn block_number(&self) -> LedgerResult<u64> {
        Ok(self.read()?.block_number)
    }

    /// Credit `amount` to `address`.
    pub fn fund(&self, address: Address, amount: u64) -> LedgerResult<()> {
        let mut state = self.write()?;
        let account = state.accounts.entry(address).or_default();
        account.balance = account.balance.saturating_add(amount);
        Ok(())
    }

    pub fn balance(&self, address: &Address) -> LedgerResult<u64> {
        Ok(self
            .read()?
            .accounts
            .get(address)
            .map_or(0, |a| a.balance))
    }

    /// Include every executable pool transaction in a new block.
    ///
    /// Returns the number of transactions included; no block is produced
    /// when nothing is executable.
    pub fn mine(&self) -> LedgerResult<usize> {
        let mut state = self.write()?;
        Ok(self.mine_locked(&mut state))
    }

    /// Mine every `interval` on a background task until the ledger is
    /// dropped.
    pub fn spawn_block_producer(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let ledger = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(ledger) = ledger.upgrade() else {
                    break;
                };
                if let Err(e) = ledger.mine() {
                    warn!(error = %e, "block producer stopped");
                    break;
                }
            }
        })
    }

    fn mine_locked(&self, state: &mut LedgerState) -> usize {
        let block_number = state.block_number + 1;
        let block_timestamp = unix_now().max(state.block_timestamp);
        let mut included = 0usize;
        let mut log_index = 0u32;

        loop {
            let ready: Vec<(Address, u64)> = state
                .mempool
                .keys()
                .filter(|(from, nonce)| *nonce == state.nonce_of(from))
                .copied()
                .collect();
            if ready.is_empty() {
                break;
            }

            for key in ready {
                let Some((tx_hash, tx)) = state.mempool.remove(&key) else {
                    continue;
                };
                let from = tx.request.from;
                state.pending.remove(&tx_hash);

                let account = state.accounts.entry(from).or_default();
                account.nonce += 1;
                account.balance = account.balance.saturating_sub(self.config.tx_fee);

                let (status, logs) =
                    match state
                        .registry
                        .execute(from, &tx.request.call, block_timestamp)
                    {
                        Ok(events) => {
                            let logs: Vec<Log> = events
                                .into_iter()
                                .map(|event| {
                                    let log = Log {
                                        tx_hash,
                                        block_number,
                                        log_index,
                                        topic: event.topic,
                                        org_id: event.org_id,
                                        data: event.data,
                                    };
                                    log_index += 1;
                                    log
                                })
                                .collect();
                            (ReceiptStatus::Success, logs)
                        }
                        Err(reason) => {
                            debug!(
                                tx = %tx_hash.short_hex(),
                                kind = %tx.request.call.kind(),
                                %reason,
                                "execution reverted"
                            );
                            (ReceiptStatus::Reverted { reason }, Vec::new())
                        }
                    };

                state.logs.extend(logs.iter().cloned());
                state.receipts.insert(
                    tx_hash,
                    Receipt {
                        tx_hash,
                        block_number,
                        block_timestamp,
                        status,
                        logs,
                    },
                );
                included += 1;
            }
        }

        if included > 0 {
            state.block_number = block_number;
            state.block_timestamp = block_timestamp;
            info!(block = block_number, txs = included, "block mined");
        }
        included
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Unavailable("ledger read lock poisoned".into()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Unavailable("ledger write lock poisoned".into()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("config", &self.config)
            .field("submitted", &self.submitted_count())
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn submit(&self, tx: SignedTransaction) -> LedgerResult<TxHandle> {
        let request = &tx.request;
        if request.chain_id != self.config.chain_id {
            return Err(LedgerError::SubmissionRejected(format!(
                "wrong chain id: expected {}, got {}",
                self.config.chain_id, request.chain_id
            )));
        }
        let tx_hash = tx.verify()?;
        let from = request.from;
        let nonce = request.nonce;

        let mut state = self.write()?;
        if state.pending.contains(&tx_hash) || state.receipts.contains_key(&tx_hash) {
            return Err(LedgerError::SubmissionRejected(format!(
                "known transaction {}",
                tx_hash.short_hex()
            )));
        }
        let account_nonce = state.nonce_of(&from);
        if nonce < account_nonce {
            return Err(LedgerError::SubmissionRejected(format!(
                "nonce too low: account nonce is {account_nonce}, got {nonce}"
            )));
        }
        if state.mempool.contains_key(&(from, nonce)) {
            return Err(LedgerError::SubmissionRejected(format!(
                "nonce {nonce} already pending for {from}"
            )));
        }
        if self.config.tx_fee > 0 {
            let balance = state.accounts.get(&from).map_or(0, |a| a.balance);
            let owed = self
                .config
                .tx_fee
                .saturating_mul(state.pending_from(&from) + 1);
            if balance < owed {
                return Err(LedgerError::SubmissionRejected(format!(
                    "insufficient funds: balance {balance}, required {owed}"
                )));
            }
        }

        debug!(
            tx = %tx_hash.short_hex(),
            %from,
            nonce,
            kind = %request.call.kind(),
            "transaction accepted"
        );
        state.mempool.insert((from, nonce), (tx_hash, tx));
        state.pending.insert(tx_hash);
        self.submitted.fetch_add(1, Ordering::SeqCst);

        if self.config.mining == MiningMode::Instant {
            self.mine_locked(&mut state);
        }
        Ok(TxHandle {
            tx_hash,
            from,
            nonce,
        })
    }

    async fn receipt(&self, tx_hash: &TxHash) -> LedgerResult<Option<Receipt>> {
        Ok(self.read()?.receipts.get(tx_hash).cloned())
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn chain_id(&self) -> LedgerResult<u64> {
        Ok(self.config.chain_id)
    }

    async fn organization(&self, org_id: &OrgId) -> LedgerResult<Option<Organization>> {
        Ok(self.read()?.registry.organization(org_id))
    }

    async fn repository(&self, org_id: &OrgId, name: &str) -> LedgerResult<Option<Repository>> {
        Ok(self.read()?.registry.repository(org_id, name))
    }

    async fn organization_members(&self, org_id: &OrgId) -> LedgerResult<Option<Vec<Address>>> {
        Ok(self.read()?.registry.organization_members(org_id))
    }

    async fn repository_members(
        &self,
        org_id: &OrgId,
        name: &str,
    ) -> LedgerResult<Option<Vec<Address>>> {
        Ok(self.read()?.registry.repository_members(org_id, name))
    }

    async fn next_nonce(&self, address: &Address) -> LedgerResult<u64> {
        Ok(self.read()?.nonce_of(address))
    }

    async fn transaction_status(&self, tx_hash: &TxHash) -> LedgerResult<TxStatus> {
        let state = self.read()?;
        if let Some(receipt) = state.receipts.get(tx_hash) {
            return Ok(TxStatus::Mined(receipt.clone()));
        }
        if state.pending.contains(tx_hash) {
            return Ok(TxStatus::Pending);
        }
        Ok(TxStatus::Unknown)
    }

    async fn logs(&self, filter: &LogFilter) -> LedgerResult<Vec<Log>> {
        Ok(self
            .read()?
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect())
    }
}
