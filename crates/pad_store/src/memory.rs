//! In-memory durable stub.
//!
//! Implements the full durable-tier contract in process memory so expiry,
//! uniqueness and access-gate tests run against the real cache logic without
//! a database file. Also serves as the degraded memory-only mode when no
//! database is configured. `set_failing` injects faults for the
//! store-unavailable paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use pad_core::{Account, Pad};

use crate::durable::DurableStore;
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    pads: RwLock<HashMap<String, Pad>>,
    accounts: RwLock<HashMap<String, Account>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, to exercise degraded paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Number of pad rows currently stored.
    pub fn pad_count(&self) -> usize {
        self.pads.read().len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn upsert_pad(&self, pad: &Pad) -> Result<(), StoreError> {
        self.check()?;
        self.pads.write().insert(pad.code.clone(), pad.clone());
        Ok(())
    }

    async fn fetch_by_code(&self, code: &str) -> Result<Option<Pad>, StoreError> {
        self.check()?;
        Ok(self.pads.read().get(code).cloned())
    }

    async fn fetch_by_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<Pad>, StoreError> {
        self.check()?;
        let mut pads: Vec<Pad> = self
            .pads
            .read()
            .values()
            .filter(|p| p.owner_id() == Some(owner_id))
            .cloned()
            .collect();
        pads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pads.truncate(limit);
        Ok(pads)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        self.check()?;
        let mut pads = self.pads.write();
        let before = pads.len();
        pads.retain(|_, p| !p.is_expired(now));
        Ok((before - pads.len()) as u64)
    }

    async fn fetch_account(&self, id_number: &str) -> Result<Option<Account>, StoreError> {
        self.check()?;
        Ok(self.accounts.read().get(id_number).cloned())
    }

    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        self.check()?;
        self.accounts
            .write()
            .insert(account.id_number.clone(), account.clone());
        Ok(())
    }

    async fn ping(&self) -> bool {
        !self.failing.load(Ordering::Relaxed)
    }
}
