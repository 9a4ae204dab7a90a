//! Pad and account models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::CredentialHash;

/// Title used when a save request supplies none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Access control attached to a pad.
///
/// Explicit variants instead of a bag of optional fields: the access gate
/// matches on this exhaustively, and an account-bound pad can never also
/// carry a pad-level password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PadGuard {
    /// Anyone holding the code may read.
    Open,
    /// A pad-level password gates every read.
    Password { credential: CredentialHash },
    /// Owned by an account; effectively permanent, no pad-level password.
    Account { owner_id: String },
}

/// A stored text blob reachable by a short code.
///
/// Pads are immutable once created. `expires_at` is always set, even for
/// account-bound pads (far-future instant), so expiry logic stays uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub code: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub guard: PadGuard,
}

impl Pad {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn owner_id(&self) -> Option<&str> {
        match &self.guard {
            PadGuard::Account { owner_id } => Some(owner_id),
            _ => None,
        }
    }

    pub fn credential_hash(&self) -> Option<&CredentialHash> {
        match &self.guard {
            PadGuard::Password { credential } => Some(credential),
            _ => None,
        }
    }
}

/// A durable identity that can own multiple permanent pads.
///
/// Created lazily: the first save under an unseen ID number defines the
/// account password (trust on first use).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id_number: String,
    pub credential: CredentialHash,
    pub created_at: DateTime<Utc>,
}

/// Resolve a caller-supplied title: trimmed, or "Untitled" when blank/absent.
pub fn effective_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_TITLE.to_string(),
    }
}
