use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use valist_types::Cid;

use crate::error::{StoreError, StoreResult};
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock` for
/// safe concurrent access. The store can be switched offline to simulate a
/// storage network outage.
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<Cid, Vec<u8>>>,
    available: AtomicBool,
    puts: AtomicU64,
}

impl InMemoryContentStore {
    /// Create a new empty, available store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            puts: AtomicU64::new(0),
        }
    }

    /// Toggle availability. While unavailable every call fails with
    /// `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful `put` calls, including idempotent repeats.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of distinct blobs stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|blob| blob.len() as u64)
            .sum()
    }

    /// Overwrite the bytes stored under `cid` without rehashing.
    ///
    /// Only useful for simulating corruption in tests.
    pub fn insert_raw(&self, cid: Cid, data: Vec<u8>) {
        self.blobs.write().expect("lock poisoned").insert(cid, data);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, data: &[u8]) -> StoreResult<Cid> {
        self.ensure_available()?;
        let cid = Cid::for_content(data);
        let mut map = self.blobs.write().map_err(|_| poisoned())?;
        // Same CID always maps to the same bytes, so a repeat is a no-op.
        map.entry(cid).or_insert_with(|| data.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(cid)
    }

    async fn get(&self, cid: &Cid) -> StoreResult<Vec<u8>> {
        self.ensure_available()?;
        let map = self.blobs.read().map_err(|_| poisoned())?;
        let data = map.get(cid).ok_or(StoreError::NotFound(*cid))?;
        if !cid.verify(data) {
            return Err(StoreError::HashMismatch {
                cid: *cid,
                computed: Cid::for_content(data),
            });
        }
        Ok(data.clone())
    }

    async fn exists(&self, cid: &Cid) -> StoreResult<bool> {
        self.ensure_available()?;
        let map = self.blobs.read().map_err(|_| poisoned())?;
        Ok(map.contains_key(cid))
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("store lock poisoned".into())
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("blob_count", &self.len())
            .field("available", &self.available.load(Ordering::SeqCst))
            .finish()
    }
}
