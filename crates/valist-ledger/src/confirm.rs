use std::time::Duration;

use tracing::{debug, warn};

use crate::context::CallContext;
use crate::error::{LedgerError, LedgerResult};
use crate::traits::LedgerWriter;
use crate::tx::{Receipt, ReceiptStatus, TxHandle};

/// Receipt polling schedule for [`await_mined`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: u32,
}

impl PollPolicy {
    /// Interval to wait after one of length `current`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.backoff_factor.max(1))
            .min(self.max_interval)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(2),
            backoff_factor: 2,
        }
    }
}

/// Wait until the transaction behind `handle` is mined.
///
/// Polls the ledger for a receipt with exponential backoff until one appears
/// or `ctx` ends. A mined but reverted transaction is an error. Ending the
/// context yields `ConfirmationTimeout`; the transaction may still be mined
/// afterwards.
pub async fn await_mined<L>(
    ledger: &L,
    handle: &TxHandle,
    policy: &PollPolicy,
    ctx: &CallContext,
) -> LedgerResult<Receipt>
where
    L: LedgerWriter + ?Sized,
{
    let tx_hash = handle.tx_hash;
    let mut interval = policy.initial_interval;
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        match ledger.receipt(&tx_hash).await {
            Ok(Some(receipt)) => return settle(receipt, polls),
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                debug!(tx = %tx_hash.short_hex(), polls, error = %e, "receipt poll failed");
            }
            Err(e) => return Err(e),
        }

        tokio::select! {
            biased;
            _ = ctx.done() => {
                warn!(
                    tx = %tx_hash.short_hex(),
                    polls,
                    cancelled = ctx.is_cancelled(),
                    "stopped waiting for confirmation"
                );
                return Err(LedgerError::ConfirmationTimeout { tx_hash });
            }
            _ = tokio::time::sleep(interval) => {}
        }
        interval = policy.next_interval(interval);
    }
}

fn settle(receipt: Receipt, polls: u32) -> LedgerResult<Receipt> {
    let tx_hash = receipt.tx_hash;
    match &receipt.status {
        ReceiptStatus::Success => {
            debug!(
                tx = %tx_hash.short_hex(),
                block = receipt.block_number,
                polls,
                "transaction mined"
            );
            Ok(receipt)
        }
        ReceiptStatus::Reverted { reason } => {
            warn!(tx = %tx_hash.short_hex(), %reason, "transaction reverted");
            Err(LedgerError::Reverted {
                tx_hash,
                reason: reason.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use valist_types::{Address, TxHash};

    use super::*;
    use crate::tx::SignedTransaction;

    /// Writer whose receipt shows up after a fixed number of polls.
    struct DelayedReceipt {
        after_polls: u32,
        /// Polls up to this one fail as if the node were unreachable.
        failing_polls: u32,
        polls: AtomicU32,
        status: ReceiptStatus,
    }

    impl DelayedReceipt {
        fn new(after_polls: u32, status: ReceiptStatus) -> Self {
            Self {
                after_polls,
                failing_polls: 0,
                polls: AtomicU32::new(0),
                status,
            }
        }

        fn failing_first(mut self, polls: u32) -> Self {
            self.failing_polls = polls;
            self
        }
    }

    #[async_trait]
    impl LedgerWriter for DelayedReceipt {
        async fn submit(&self, _tx: SignedTransaction) -> LedgerResult<TxHandle> {
            Err(LedgerError::Unavailable("read-only".into()))
        }

        async fn receipt(&self, tx_hash: &TxHash) -> LedgerResult<Option<Receipt>> {
            let seen = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if seen <= self.failing_polls {
                return Err(LedgerError::Unavailable("rpc timeout".into()));
            }
            if seen < self.after_polls {
                return Ok(None);
            }
            Ok(Some(Receipt {
                tx_hash: *tx_hash,
                block_number: 1,
                block_timestamp: 0,
                status: self.status.clone(),
                logs: vec![],
            }))
        }
    }

    fn handle() -> TxHandle {
        TxHandle {
            tx_hash: TxHash::from_hash([7; 32]),
            from: Address::from_bytes([1; 20]),
            nonce: 0,
        }
    }

    fn fast() -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            backoff_factor: 2,
        }
    }

    #[test]
    fn backoff_is_capped() {
        let policy = PollPolicy::default();
        let mut interval = policy.initial_interval;
        for _ in 0..20 {
            interval = policy.next_interval(interval);
        }
        assert_eq!(interval, policy.max_interval);
        assert_eq!(
            policy.next_interval(Duration::from_millis(50)),
            Duration::from_millis(100)
        );
    }

    #[tokio::test]
    async fn returns_receipt_once_mined() {
        let ledger = DelayedReceipt::new(3, ReceiptStatus::Success);
        let receipt = await_mined(&ledger, &handle(), &fast(), &CallContext::background())
            .await
            .unwrap();
        assert!(receipt.is_success());
        assert_eq!(ledger.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reverted_receipt_is_an_error() {
        let ledger = DelayedReceipt::new(
            1,
            ReceiptStatus::Reverted {
                reason: "access denied".into(),
            },
        );
        let err = await_mined(&ledger, &handle(), &fast(), &CallContext::background())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Reverted {
                tx_hash: handle().tx_hash,
                reason: "access denied".into(),
            }
        );
    }

    #[tokio::test]
    async fn unreachable_node_does_not_end_the_wait() {
        let ledger = DelayedReceipt::new(4, ReceiptStatus::Success).failing_first(3);
        let receipt = await_mined(&ledger, &handle(), &fast(), &CallContext::background())
            .await
            .unwrap();
        assert!(receipt.is_success());
        assert_eq!(ledger.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn persistent_outage_times_out_with_tx_hash() {
        let ledger = DelayedReceipt::new(u32::MAX, ReceiptStatus::Success).failing_first(u32::MAX);
        let ctx = CallContext::with_timeout(Duration::from_millis(30));
        let err = await_mined(&ledger, &handle(), &fast(), &ctx)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::ConfirmationTimeout {
                tx_hash: handle().tx_hash
            }
        );
    }

    #[tokio::test]
    async fn deadline_yields_timeout() {
        let ledger = DelayedReceipt::new(u32::MAX, ReceiptStatus::Success);
        let ctx = CallContext::with_timeout(Duration::from_millis(30));
        let err = await_mined(&ledger, &handle(), &fast(), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::ConfirmationTimeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_is_prompt() {
        let ledger = DelayedReceipt::new(u32::MAX, ReceiptStatus::Success);
        let slow = PollPolicy {
            initial_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(30),
            backoff_factor: 1,
        };
        let (ctx, cancel) = CallContext::cancellable();

        let started = std::time::Instant::now();
        let wait = tokio::spawn(async move { await_mined(&ledger, &handle(), &slow, &ctx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let err = wait.await.unwrap().unwrap_err();
        assert!(matches!(err, LedgerError::ConfirmationTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
