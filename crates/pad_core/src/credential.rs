//! Argon2id credential hashing and the read access gate.
//!
//! The same primitive guards pad passwords and account passwords; only the
//! storage scope differs. Plaintext secrets are never stored or logged — a
//! secret enters this module, is hashed or verified, and is dropped.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::error::PadError;
use crate::pad::{Pad, PadGuard};

/// Argon2id parameters — tuned for per-request verification on a small
/// server rather than one-off vault unlocks.
fn argon2_params() -> Params {
    Params::new(
        19 * 1024, // m_cost: 19 MiB
        2,         // t_cost: 2 iterations
        1,         // p_cost: 1 thread
        Some(32),  // output len
    )
    .expect("static argon2 params are always valid")
}

fn argon2() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params())
}

/// One-way salted hash of a secret, stored as a PHC string so the salt and
/// parameters travel with the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Hash a secret with a fresh random salt.
    pub fn new(secret: &str) -> Result<Self, PadError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = argon2()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| PadError::Hash(e.to_string()))?;
        Ok(Self(hash.to_string()))
    }

    /// Rehydrate a hash read back from the durable tier.
    pub fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Verify a supplied secret against this hash.
    pub fn verify(&self, secret: &str) -> Result<bool, PadError> {
        let parsed =
            PasswordHash::new(&self.0).map_err(|e| PadError::MalformedHash(e.to_string()))?;
        match argon2().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PadError::Hash(e.to_string())),
        }
    }
}

/// Outcome of the access gate that sits in front of every pad read.
///
/// `CredentialRequired` and `CredentialRejected` stay distinct end-to-end:
/// the first means "nothing was tried" (prompt the client), the second means
/// "wrong answer".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    CredentialRequired,
    CredentialRejected,
}

/// Decide whether a read of `pad` with the supplied secret may proceed.
///
/// Account-bound pads carry no pad-level password; the account credential
/// gates account operations, not individual reads by code.
pub fn check_access(pad: &Pad, supplied: Option<&str>) -> Result<AccessDecision, PadError> {
    match &pad.guard {
        PadGuard::Open | PadGuard::Account { .. } => Ok(AccessDecision::Allowed),
        PadGuard::Password { credential } => match supplied {
            None => Ok(AccessDecision::CredentialRequired),
            Some(s) if s.is_empty() => Ok(AccessDecision::CredentialRequired),
            Some(s) => Ok(if credential.verify(s)? {
                AccessDecision::Allowed
            } else {
                AccessDecision::CredentialRejected
            }),
        },
    }
}
