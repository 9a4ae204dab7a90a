//! pad_core — SmartPad domain primitives
//!
//! # Module layout
//! - `pad`        — the pad and account models; the three pad cases
//!                  (open, password-protected, account-bound) are explicit
//!                  variants so access control branches exhaustively
//! - `code`       — short human-typeable codes + boundary normalization
//! - `credential` — Argon2id secret hashing and the read access gate
//! - `error`      — unified error type
//!
//! Uniqueness of codes is NOT guaranteed here: the generator is a dumb
//! randomness source and the pad store owns collision retry against its set
//! of live pads.

pub mod code;
pub mod credential;
pub mod error;
pub mod pad;

pub use credential::{check_access, AccessDecision, CredentialHash};
pub use error::PadError;
pub use pad::{Account, Pad, PadGuard};
