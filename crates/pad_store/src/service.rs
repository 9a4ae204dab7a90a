//! The pad service facade — everything the (external) transport layer calls.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pad_core::code::normalize_code;
use pad_core::pad::effective_title;
use pad_core::{check_access, AccessDecision, Account, CredentialHash, Pad, PadGuard};

use crate::cache::{Lookup, PadCache};
use crate::durable::DurableStore;
use crate::error::StoreError;
use crate::sweep::{spawn_sweep, SweepHandle, DEFAULT_SWEEP_INTERVAL};

/// Store tunables. Defaults mirror production behavior.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Fallback TTL when the caller supplies none or a non-positive value.
    pub default_ttl: ChronoDuration,
    /// Far-future TTL for account-bound pads; finite so expiry stays uniform.
    pub permanent_ttl: ChronoDuration,
    /// Cap on code-generation retries before giving up.
    pub max_code_attempts: usize,
    /// Background sweep cadence.
    pub sweep_interval: Duration,
    /// Upper bound on pads returned per account listing.
    pub account_list_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: ChronoDuration::minutes(60),
            permanent_ttl: ChronoDuration::days(100 * 365),
            max_code_attempts: 32,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            account_list_limit: 100,
        }
    }
}

impl StoreConfig {
    pub fn with_default_ttl(mut self, ttl: ChronoDuration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_account_list_limit(mut self, limit: usize) -> Self {
        self.account_list_limit = limit;
        self
    }
}

/// Receipt for a quick save.
#[derive(Debug, Clone, Serialize)]
pub struct SavedPad {
    pub code: String,
    pub title: String,
    pub expires_at: DateTime<Utc>,
}

/// Receipt for a save into an account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountPad {
    pub code: String,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// One row of an account listing.
#[derive(Debug, Clone, Serialize)]
pub struct PadSummary {
    pub code: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a read, preserved end-to-end so the transport layer can map
/// each case to a distinct status signal (404 / 410 / prompt / reject).
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Allowed(Pad),
    NotFound,
    Expired,
    CredentialRequired,
    CredentialRejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub pads_in_memory: usize,
    pub durable_ok: bool,
    pub checked_at: DateTime<Utc>,
}

/// The pad store's external interface.
pub struct PadService {
    cache: Arc<PadCache>,
    durable: Arc<dyn DurableStore>,
    config: StoreConfig,
}

impl PadService {
    pub fn new(durable: Arc<dyn DurableStore>, config: StoreConfig) -> Self {
        let cache = Arc::new(PadCache::new(
            Arc::clone(&durable),
            config.max_code_attempts,
        ));
        Self {
            cache,
            durable,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<PadCache> {
        &self.cache
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Start the background expiry sweep at the configured interval.
    pub fn start_sweep(&self) -> (JoinHandle<()>, SweepHandle) {
        spawn_sweep(Arc::clone(&self.cache), self.config.sweep_interval)
    }

    /// Store an anonymous pad under a freshly minted code.
    ///
    /// Succeeds once the in-memory write lands; the durable write is
    /// fire-and-forget (a crash before it completes loses the pad).
    pub async fn quick_save(
        &self,
        title: Option<&str>,
        content: &str,
        ttl_minutes: Option<i64>,
        password: Option<&str>,
    ) -> Result<SavedPad, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::Validation("content is required"));
        }

        let now = Utc::now();
        let ttl = ttl_minutes
            .filter(|m| *m > 0)
            .and_then(ChronoDuration::try_minutes)
            .unwrap_or(self.config.default_ttl);
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let guard = match password.filter(|p| !p.trim().is_empty()) {
            Some(p) => PadGuard::Password {
                credential: CredentialHash::new(p)?,
            },
            None => PadGuard::Open,
        };

        let title = effective_title(title);
        let content = content.to_string();
        let pad = self.cache.insert_new(now, |code| Pad {
            code,
            title,
            content,
            created_at: now,
            expires_at,
            guard,
        })?;

        debug!(code = %pad.code, expires_at = %pad.expires_at, "pad saved");
        Ok(SavedPad {
            code: pad.code,
            title: pad.title,
            expires_at: pad.expires_at,
        })
    }

    /// Resolve a code (case-insensitive at this boundary), check expiry, then
    /// pass the access gate. Behaves identically whether the pad came from
    /// memory or was rehydrated from the durable tier.
    pub async fn load_by_code(
        &self,
        code: &str,
        password: Option<&str>,
    ) -> Result<LoadOutcome, StoreError> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Ok(LoadOutcome::NotFound);
        }

        let pad = match self.cache.get(&code, Utc::now()).await {
            Lookup::Hit(pad) => pad,
            Lookup::Expired => return Ok(LoadOutcome::Expired),
            Lookup::Missing => return Ok(LoadOutcome::NotFound),
        };

        Ok(match check_access(&pad, password)? {
            AccessDecision::Allowed => LoadOutcome::Allowed(pad),
            AccessDecision::CredentialRequired => LoadOutcome::CredentialRequired,
            AccessDecision::CredentialRejected => LoadOutcome::CredentialRejected,
        })
    }

    /// Store a permanent pad under an account, creating the account on first
    /// use (the first writer defines the password — trust on first use).
    ///
    /// Account operations need the durable tier: a failure there is
    /// `Unavailable` and nothing is written. A credential mismatch aborts
    /// with no side effects.
    pub async fn save_to_account(
        &self,
        id_number: &str,
        password: &str,
        title: Option<&str>,
        content: &str,
    ) -> Result<AccountPad, StoreError> {
        let id_number = id_number.trim();
        if id_number.is_empty() {
            return Err(StoreError::Validation("id number is required"));
        }
        if password.is_empty() {
            return Err(StoreError::Validation("password is required"));
        }
        if content.trim().is_empty() {
            return Err(StoreError::Validation("content is required"));
        }

        let account = self
            .durable
            .fetch_account(id_number)
            .await
            .map_err(StoreError::into_unavailable)?;

        match account {
            Some(account) => {
                if !account.credential.verify(password)? {
                    return Err(StoreError::CredentialRejected);
                }
            }
            None => {
                let account = Account {
                    id_number: id_number.to_string(),
                    credential: CredentialHash::new(password)?,
                    created_at: Utc::now(),
                };
                self.durable
                    .create_account(&account)
                    .await
                    .map_err(StoreError::into_unavailable)?;
                info!(id_number, "account created");
            }
        }

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.config.permanent_ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let title = effective_title(title);
        let content = content.to_string();
        let owner = id_number.to_string();
        let pad = self.cache.insert_new(now, |code| Pad {
            code,
            title,
            content,
            created_at: now,
            expires_at,
            guard: PadGuard::Account { owner_id: owner },
        })?;

        debug!(code = %pad.code, id_number, "account pad saved");
        Ok(AccountPad {
            code: pad.code,
            owner_id: id_number.to_string(),
            title: pad.title,
            created_at: pad.created_at,
        })
    }

    /// List an account's live pads, most recently created first, capped at
    /// the configured limit. Verifies the account credential first.
    pub async fn list_by_account(
        &self,
        id_number: &str,
        password: &str,
    ) -> Result<Vec<PadSummary>, StoreError> {
        let id_number = id_number.trim();
        let account = self
            .durable
            .fetch_account(id_number)
            .await
            .map_err(StoreError::into_unavailable)?
            .ok_or_else(|| StoreError::NoAccount(id_number.to_string()))?;
        if !account.credential.verify(password)? {
            return Err(StoreError::CredentialRejected);
        }

        let now = Utc::now();
        let limit = self.config.account_list_limit;

        // Durable rows first, then memory-resident pads whose fire-and-forget
        // write may not have landed yet; dedupe by code.
        let mut pads = match self.durable.fetch_by_owner(id_number, limit).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(id_number, error = %err, "durable owner fetch failed; listing memory tier only");
                Vec::new()
            }
        };
        let mut seen: HashSet<String> = pads.iter().map(|p| p.code.clone()).collect();
        for pad in self.cache.owned_by(id_number, now) {
            if seen.insert(pad.code.clone()) {
                pads.push(pad);
            }
        }

        pads.retain(|p| !p.is_expired(now));
        pads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pads.truncate(limit);

        Ok(pads
            .into_iter()
            .map(|p| PadSummary {
                code: p.code,
                title: p.title,
                created_at: p.created_at,
                expires_at: p.expires_at,
            })
            .collect())
    }

    pub async fn health(&self) -> Health {
        Health {
            pads_in_memory: self.cache.len(),
            durable_ok: self.durable.ping().await,
            checked_at: Utc::now(),
        }
    }
}
