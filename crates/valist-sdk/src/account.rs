use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use valist_crypto::AccountKey;
use valist_ledger::{LedgerResult, SignedTransaction, TxRequest};
use valist_types::Address;

/// Signing capability passed explicitly into every mutating call.
///
/// Implementations own nonce reservation so that concurrent calls from one
/// identity never reuse a nonce.
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Reserve the next nonce, given the ledger's confirmed nonce for this
    /// address.
    fn reserve_nonce(&self, confirmed: u64) -> u64;

    /// Return a reserved nonce that was never accepted by the ledger. It is
    /// handed out again before any fresh nonce.
    fn release_nonce(&self, nonce: u64);

    fn sign(&self, request: TxRequest) -> LedgerResult<SignedTransaction>;
}

#[derive(Debug, Default)]
struct NonceCursor {
    next: u64,
    /// Reserved below `next` but handed back after a failed submission.
    released: BTreeSet<u64>,
}

/// Account backed by an in-process Ed25519 key.
pub struct LocalAccount {
    key: AccountKey,
    address: Address,
    nonces: Mutex<NonceCursor>,
}

impl LocalAccount {
    pub fn new(key: AccountKey) -> Self {
        let address = key.address();
        Self {
            key,
            address,
            nonces: Mutex::new(NonceCursor::default()),
        }
    }

    pub fn generate() -> Self {
        Self::new(AccountKey::generate())
    }

    // A poisoned cursor is still consistent.
    fn nonces(&self) -> MutexGuard<'_, NonceCursor> {
        self.nonces.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionSigner for LocalAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn reserve_nonce(&self, confirmed: u64) -> u64 {
        let mut cursor = self.nonces();
        // Anything below the confirmed nonce was used by someone else.
        cursor.released = cursor.released.split_off(&confirmed);
        if let Some(lowest) = cursor.released.pop_first() {
            return lowest;
        }
        let nonce = cursor.next.max(confirmed);
        cursor.next = nonce + 1;
        nonce
    }

    fn release_nonce(&self, nonce: u64) {
        let mut cursor = self.nonces();
        if nonce >= cursor.next {
            return;
        }
        cursor.released.insert(nonce);
        while let Some(&top) = cursor.released.last() {
            if top + 1 != cursor.next {
                break;
            }
            cursor.released.pop_last();
            cursor.next = top;
        }
    }

    fn sign(&self, request: TxRequest) -> LedgerResult<SignedTransaction> {
        SignedTransaction::sign(request, &self.key)
    }
}

impl fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .field("nonces", &*self.nonces())
            .finish_non_exhaustive()
    }
}
