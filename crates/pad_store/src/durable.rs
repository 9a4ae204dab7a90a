//! Contract between the cache and the crash-persistent tier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pad_core::{Account, Pad};

use crate::error::StoreError;

/// The durable tier behind the in-process cache.
///
/// Implementations must be safe to call concurrently and must fail
/// independently of in-memory state: a durable fault degrades durability,
/// never the memory path. Calls are expected to complete within a bounded
/// time (the SQLite implementation enforces a pool acquire timeout).
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Insert or overwrite the row for `pad.code`. Idempotent, so the
    /// fire-and-forget persistence path can retry safely.
    async fn upsert_pad(&self, pad: &Pad) -> Result<(), StoreError>;

    async fn fetch_by_code(&self, code: &str) -> Result<Option<Pad>, StoreError>;

    /// Pads owned by `owner_id`, most recently created first, at most
    /// `limit` rows. Expired rows may still be returned; callers filter.
    async fn fetch_by_owner(&self, owner_id: &str, limit: usize)
        -> Result<Vec<Pad>, StoreError>;

    /// Bulk-delete every row with `expires_at <= now`. Returns rows removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn fetch_account(&self, id_number: &str) -> Result<Option<Account>, StoreError>;

    async fn create_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Reachability probe for health reporting.
    async fn ping(&self) -> bool;
}
