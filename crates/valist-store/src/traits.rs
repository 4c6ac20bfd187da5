use async_trait::async_trait;
use valist_types::Cid;

use crate::error::StoreResult;

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Blobs are immutable once written. The same bytes always produce the
///   same [`Cid`].
/// - `put` returns only after the blob is durably stored; callers may
///   reference the returned CID immediately.
/// - Storing identical bytes twice is a no-op on the second call.
/// - The store never interprets blob contents.
/// - Nothing is ever deleted through this interface.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a blob and return its content identifier.
    async fn put(&self, data: &[u8]) -> StoreResult<Cid>;

    /// Fetch a blob by identifier.
    ///
    /// Returns `StoreError::NotFound` if the blob does not exist.
    async fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>>;

    /// Check whether a blob exists.
    async fn exists(&self, cid: &Cid) -> StoreResult<bool>;
}
