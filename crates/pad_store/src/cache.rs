//! Two-tier pad cache.
//!
//! The in-memory map is authoritative for freshness checks and the single
//! point every read and write flows through. The durable tier is consulted on
//! miss (read-through) and written behind the caller's back on save
//! (fire-and-forget). A put whose durable write never lands is a documented
//! durability gap: the pad survives for the life of the process and is lost
//! on restart.
//!
//! Eviction is idempotent everywhere — a sweep and a read racing on the same
//! code both re-check expiry under the write lock before removing, so neither
//! can remove a freshly reissued code.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use pad_core::code::{generate_code, CODE_LEN};
use pad_core::Pad;

use crate::durable::DurableStore;
use crate::error::StoreError;

/// Outcome of a cache lookup. `Expired` and `Missing` stay distinct because
/// they imply different client messaging (410-class vs 404-class).
#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(Pad),
    Expired,
    Missing,
}

/// What one expiry sweep removed from each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted_from_memory: usize,
    pub deleted_from_durable: u64,
}

#[derive(Default)]
struct CacheState {
    pads: HashMap<String, Pad>,
    /// Account index: owner id → codes of resident owned pads. Covers the
    /// window where an owned pad's durable write has not landed yet.
    owners: HashMap<String, Vec<String>>,
}

impl CacheState {
    fn insert(&mut self, pad: Pad) {
        let code = pad.code.clone();
        let owner = pad.owner_id().map(str::to_string);
        if let Some(prev) = self.pads.insert(code.clone(), pad) {
            // Overwrite (e.g. code reuse after expiry): drop the stale index
            // entry before re-indexing.
            if let Some(prev_owner) = prev.owner_id().map(str::to_string) {
                self.unindex(&prev_owner, &code);
            }
        }
        if let Some(owner) = owner {
            self.owners.entry(owner).or_default().push(code);
        }
    }

    fn evict(&mut self, code: &str) {
        if let Some(prev) = self.pads.remove(code) {
            if let Some(owner) = prev.owner_id() {
                let owner = owner.to_string();
                self.unindex(&owner, code);
            }
        }
    }

    fn evict_if_expired(&mut self, code: &str, now: DateTime<Utc>) {
        let expired = self.pads.get(code).is_some_and(|p| p.is_expired(now));
        if expired {
            self.evict(code);
        }
    }

    fn unindex(&mut self, owner: &str, code: &str) {
        if let Some(codes) = self.owners.get_mut(owner) {
            codes.retain(|c| c != code);
            if codes.is_empty() {
                self.owners.remove(owner);
            }
        }
    }
}

/// In-process mapping from code to pad, backed by a [`DurableStore`].
pub struct PadCache {
    state: RwLock<CacheState>,
    durable: Arc<dyn DurableStore>,
    max_code_attempts: usize,
}

impl PadCache {
    pub fn new(durable: Arc<dyn DurableStore>, max_code_attempts: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            durable,
            max_code_attempts,
        }
    }

    /// Insert or overwrite the entry for `pad.code`, then persist it
    /// fire-and-forget. Must run inside a tokio runtime.
    pub fn put(&self, pad: Pad) {
        self.state.write().insert(pad.clone());
        self.persist(pad);
    }

    /// Mint a collision-free code and insert the pad built from it, as one
    /// atomic step under the map lock, then persist fire-and-forget.
    ///
    /// A candidate colliding with a *live* pad is retried; an expired
    /// occupant may have its code reused. Exhausting the retry cap is an
    /// internal error.
    pub fn insert_new<F>(&self, now: DateTime<Utc>, build: F) -> Result<Pad, StoreError>
    where
        F: FnOnce(String) -> Pad,
    {
        let pad = {
            let mut state = self.state.write();
            let mut minted = None;
            for _ in 0..self.max_code_attempts {
                let candidate = generate_code(CODE_LEN);
                let live = state
                    .pads
                    .get(&candidate)
                    .is_some_and(|p| !p.is_expired(now));
                if !live {
                    minted = Some(candidate);
                    break;
                }
            }
            let code = minted.ok_or(StoreError::CodeSpaceExhausted(self.max_code_attempts))?;
            let pad = build(code);
            state.insert(pad.clone());
            pad
        };
        self.persist(pad.clone());
        Ok(pad)
    }

    /// Resolve a code: memory first, then read-through to the durable tier.
    ///
    /// Reads never delete durable rows; an expired entry found in memory is
    /// evicted (memory only) and the durable tier then decides between
    /// `Expired` and `Missing`. Durable failures are logged and treated as a
    /// durable miss so anonymous reads keep working memory-only.
    pub async fn get(&self, code: &str, now: DateTime<Utc>) -> Lookup {
        let expired_in_memory = {
            let state = self.state.read();
            match state.pads.get(code) {
                Some(pad) if !pad.is_expired(now) => return Lookup::Hit(pad.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired_in_memory {
            self.state.write().evict_if_expired(code, now);
        }

        match self.durable.fetch_by_code(code).await {
            Ok(Some(pad)) if pad.is_expired(now) => Lookup::Expired,
            Ok(Some(pad)) => {
                debug!(code, "pad rehydrated from durable tier");
                self.state.write().insert(pad.clone());
                Lookup::Hit(pad)
            }
            Ok(None) => {
                // The code was issued if we just evicted it, even when its
                // durable write never landed.
                if expired_in_memory {
                    Lookup::Expired
                } else {
                    Lookup::Missing
                }
            }
            Err(err) => {
                warn!(code, error = %err, "durable fetch failed; serving memory tier only");
                if expired_in_memory {
                    Lookup::Expired
                } else {
                    Lookup::Missing
                }
            }
        }
    }

    /// Evict from memory. Idempotent; durable deletion is the sweep's job.
    pub fn delete(&self, code: &str) {
        self.state.write().evict(code);
    }

    /// Live pads owned by `owner_id`, straight from the memory tier.
    pub fn owned_by(&self, owner_id: &str, now: DateTime<Utc>) -> Vec<Pad> {
        let state = self.state.read();
        match state.owners.get(owner_id) {
            Some(codes) => codes
                .iter()
                .filter_map(|c| state.pads.get(c))
                .filter(|p| !p.is_expired(now))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().pads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().pads.is_empty()
    }

    /// Evict every expired entry from memory and bulk-delete expired durable
    /// rows. The only place durable deletion happens. Idempotent: a second
    /// run with no intervening writes removes nothing.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let evicted = {
            let mut state = self.state.write();
            let expired: Vec<String> = state
                .pads
                .values()
                .filter(|p| p.is_expired(now))
                .map(|p| p.code.clone())
                .collect();
            for code in &expired {
                state.evict(code);
            }
            expired.len()
        };

        let deleted = match self.durable.delete_expired(now).await {
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "durable expiry sweep failed");
                0
            }
        };

        if evicted > 0 || deleted > 0 {
            debug!(evicted, deleted, "expiry sweep removed entries");
        }
        SweepReport {
            evicted_from_memory: evicted,
            deleted_from_durable: deleted,
        }
    }

    fn persist(&self, pad: Pad) {
        let durable = Arc::clone(&self.durable);
        tokio::spawn(async move {
            if let Err(err) = durable.upsert_pad(&pad).await {
                warn!(
                    code = %pad.code,
                    error = %err,
                    "durable write failed; pad is memory-only until retried"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::Duration;
    use pad_core::PadGuard;
    use std::collections::HashSet;

    fn pad(code: &str, guard: PadGuard, expires_in: Duration) -> Pad {
        let now = Utc::now();
        Pad {
            code: code.into(),
            title: "title".into(),
            content: "content".into(),
            created_at: now,
            expires_at: now + expires_in,
            guard,
        }
    }

    fn cache_over(durable: Arc<MemoryStore>) -> PadCache {
        PadCache::new(durable, 32)
    }

    #[tokio::test]
    async fn fresh_entry_hits_from_memory() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        cache.put(pad("AAAA22", PadGuard::Open, Duration::hours(1)));

        match cache.get("AAAA22", Utc::now()).await {
            Lookup::Hit(p) => assert_eq!(p.content, "content"),
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_code_is_missing() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        assert!(matches!(cache.get("ZZZZ99", Utc::now()).await, Lookup::Missing));
    }

    #[tokio::test]
    async fn expired_memory_entry_is_evicted_and_reported_expired() {
        let durable = Arc::new(MemoryStore::new());
        let cache = cache_over(durable.clone());
        cache.put(pad("AAAA22", PadGuard::Open, Duration::hours(-1)));

        assert!(matches!(cache.get("AAAA22", Utc::now()).await, Lookup::Expired));
        assert_eq!(cache.len(), 0);
        // Reads never delete durable rows.
        // The fire-and-forget write may or may not have landed; either way no
        // read-path deletion happened, which delete_expired would confirm.
    }

    #[tokio::test]
    async fn miss_reads_through_and_populates_memory() {
        let durable = Arc::new(MemoryStore::new());
        durable
            .upsert_pad(&pad("AAAA22", PadGuard::Open, Duration::hours(1)))
            .await
            .unwrap();
        let cache = cache_over(durable);

        assert_eq!(cache.len(), 0);
        assert!(matches!(cache.get("AAAA22", Utc::now()).await, Lookup::Hit(_)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn durable_expired_row_is_expired_not_missing() {
        let durable = Arc::new(MemoryStore::new());
        durable
            .upsert_pad(&pad("AAAA22", PadGuard::Open, Duration::hours(-1)))
            .await
            .unwrap();
        let cache = cache_over(durable);

        assert!(matches!(cache.get("AAAA22", Utc::now()).await, Lookup::Expired));
        // Not populated into memory.
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn durable_failure_degrades_to_memory_only() {
        let durable = Arc::new(MemoryStore::new());
        let cache = cache_over(durable.clone());
        cache.put(pad("AAAA22", PadGuard::Open, Duration::hours(1)));

        durable.set_failing(true);
        // Memory hit still served.
        assert!(matches!(cache.get("AAAA22", Utc::now()).await, Lookup::Hit(_)));
        // Unknown code degrades to Missing instead of erroring.
        assert!(matches!(cache.get("BBBB33", Utc::now()).await, Lookup::Missing));
    }

    #[tokio::test]
    async fn minted_codes_are_unique_among_live_pads() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        let mut codes = HashSet::new();
        for _ in 0..100 {
            let pad = cache
                .insert_new(now, |code| Pad {
                    code,
                    title: "t".into(),
                    content: "c".into(),
                    created_at: now,
                    expires_at: now + Duration::hours(1),
                    guard: PadGuard::Open,
                })
                .unwrap();
            assert_eq!(pad.code.len(), CODE_LEN);
            assert!(codes.insert(pad.code));
        }
        assert_eq!(cache.len(), 100);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        cache.put(pad("AAAA22", PadGuard::Open, Duration::hours(1)));
        cache.delete("AAAA22");
        cache.delete("AAAA22");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn owner_index_tracks_inserts_and_evictions() {
        let cache = cache_over(Arc::new(MemoryStore::new()));
        let now = Utc::now();
        cache.put(pad(
            "AAAA22",
            PadGuard::Account { owner_id: "S12".into() },
            Duration::days(1),
        ));
        cache.put(pad(
            "BBBB33",
            PadGuard::Account { owner_id: "S12".into() },
            Duration::days(1),
        ));

        assert_eq!(cache.owned_by("S12", now).len(), 2);
        cache.delete("AAAA22");
        let remaining = cache.owned_by("S12", now);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].code, "BBBB33");
        assert!(cache.owned_by("S13", now).is_empty());
    }

    #[tokio::test]
    async fn sweep_clears_both_tiers_and_is_idempotent() {
        let durable = Arc::new(MemoryStore::new());
        durable
            .upsert_pad(&pad("CCCC44", PadGuard::Open, Duration::hours(-2)))
            .await
            .unwrap();
        let cache = cache_over(durable.clone());
        cache.state.write().insert(pad("AAAA22", PadGuard::Open, Duration::hours(-1)));
        cache.state.write().insert(pad("BBBB33", PadGuard::Open, Duration::hours(1)));

        let report = cache.sweep_once(Utc::now()).await;
        assert_eq!(report.evicted_from_memory, 1);
        assert_eq!(report.deleted_from_durable, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(durable.pad_count(), 0);

        let again = cache.sweep_once(Utc::now()).await;
        assert_eq!(again.evicted_from_memory, 0);
        assert_eq!(again.deleted_from_durable, 0);
        assert_eq!(cache.len(), 1);
    }
}
