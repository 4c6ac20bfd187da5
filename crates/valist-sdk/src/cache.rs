use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use valist_types::{Cid, OrgId, Organization, Repository};

/// Read-through cache consulted by the client before the ledger and store.
///
/// Ledger records may go stale and are invalidated after confirmed
/// mutations. Metadata blobs are immutable per CID.
pub trait RecordCache: Send + Sync {
    fn organization(&self, org_id: &OrgId) -> Option<Organization>;
    fn put_organization(&self, org: Organization);
    fn invalidate_organization(&self, org_id: &OrgId);

    fn repository(&self, org_id: &OrgId, name: &str) -> Option<Repository>;
    fn put_repository(&self, repo: Repository);
    fn invalidate_repository(&self, org_id: &OrgId, name: &str);

    fn meta(&self, cid: &Cid) -> Option<Vec<u8>>;
    fn put_meta(&self, cid: Cid, bytes: Vec<u8>);
}

struct Entry<T> {
    value: T,
    inserted: Instant,
}

/// In-process [`RecordCache`] with a TTL on ledger records.
///
/// A poisoned lock is treated as a cache miss.
pub struct InMemoryRecordCache {
    ttl: Duration,
    orgs: RwLock<HashMap<OrgId, Entry<Organization>>>,
    repos: RwLock<HashMap<(OrgId, String), Entry<Repository>>>,
    metas: RwLock<HashMap<Cid, Vec<u8>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryRecordCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            orgs: RwLock::new(HashMap::new()),
            repos: RwLock::new(HashMap::new()),
            metas: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Organization and repository records held, expired ones included
    /// until a lookup evicts them.
    pub fn record_count(&self) -> usize {
        let orgs = self.orgs.read().map_or(0, |orgs| orgs.len());
        let repos = self.repos.read().map_or(0, |repos| repos.len());
        orgs + repos
    }

    /// Fresh value under `key`. An expired entry is evicted on the miss.
    fn lookup<K, T>(&self, map: &RwLock<HashMap<K, Entry<T>>>, key: &K) -> Option<T>
    where
        K: Eq + Hash,
        T: Clone,
    {
        let expired = {
            let entries = map.read().ok()?;
            match entries.get(key) {
                Some(entry) if entry.inserted.elapsed() < self.ttl => {
                    self.record(true);
                    return Some(entry.value.clone());
                }
                Some(_) => true,
                None => false,
            }
        };
        self.record(false);
        if expired {
            if let Ok(mut entries) = map.write() {
                // A put may have refreshed the entry between the two locks.
                if entries
                    .get(key)
                    .is_some_and(|entry| entry.inserted.elapsed() >= self.ttl)
                {
                    entries.remove(key);
                }
            }
        }
        None
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl RecordCache for InMemoryRecordCache {
    fn organization(&self, org_id: &OrgId) -> Option<Organization> {
        self.lookup(&self.orgs, org_id)
    }

    fn put_organization(&self, org: Organization) {
        if let Ok(mut orgs) = self.orgs.write() {
            orgs.insert(
                org.id,
                Entry {
                    value: org,
                    inserted: Instant::now(),
                },
            );
        }
    }

    fn invalidate_organization(&self, org_id: &OrgId) {
        if let Ok(mut orgs) = self.orgs.write() {
            orgs.remove(org_id);
        }
    }

    fn repository(&self, org_id: &OrgId, name: &str) -> Option<Repository> {
        self.lookup(&self.repos, &(*org_id, name.to_string()))
    }

    fn put_repository(&self, repo: Repository) {
        if let Ok(mut repos) = self.repos.write() {
            repos.insert(
                (repo.org_id, repo.name.clone()),
                Entry {
                    value: repo,
                    inserted: Instant::now(),
                },
            );
        }
    }

    fn invalidate_repository(&self, org_id: &OrgId, name: &str) {
        if let Ok(mut repos) = self.repos.write() {
            repos.remove(&(*org_id, name.to_string()));
        }
    }

    fn meta(&self, cid: &Cid) -> Option<Vec<u8>> {
        let metas = self.metas.read().ok()?;
        let bytes = metas.get(cid).cloned();
        self.record(bytes.is_some());
        bytes
    }

    fn put_meta(&self, cid: Cid, bytes: Vec<u8>) {
        if let Ok(mut metas) = self.metas.write() {
            metas.entry(cid).or_insert(bytes);
        }
    }
}

impl std::fmt::Debug for InMemoryRecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordCache")
            .field("ttl", &self.ttl)
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}
