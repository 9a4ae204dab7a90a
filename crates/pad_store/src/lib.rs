//! pad_store — the SmartPad two-tier pad store.
//!
//! # Architecture
//! - [`PadCache`] holds the in-process map from code to pad. It is
//!   authoritative for freshness checks and the single path every read and
//!   write takes.
//! - A [`DurableStore`] collaborator survives restarts: [`SqliteStore`] in
//!   production, [`MemoryStore`] as the test stub and degraded mode. The
//!   cache reads through on miss and writes behind the caller's back on save.
//! - The periodic [`sweep`] is the only bulk deleter in the system; reads
//!   evict from memory but never touch durable rows.
//! - [`PadService`] is the facade the (external) transport layer calls.
//!
//! # Durability gap
//! The durable write behind a save is asynchronous and best-effort: a crash
//! in the window before it lands loses the pad. This is a deliberate latency
//! trade-off and is logged, not hidden. Persistence retries are safe because
//! the durable upsert is idempotent on the pad's code.

pub mod cache;
pub mod durable;
pub mod error;
pub mod memory;
pub mod service;
pub mod sqlite;
pub mod sweep;

pub use cache::{Lookup, PadCache, SweepReport};
pub use durable::DurableStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use service::{
    AccountPad, Health, LoadOutcome, PadService, PadSummary, SavedPad, StoreConfig,
};
pub use sqlite::SqliteStore;
pub use sweep::{spawn_sweep, SweepHandle, DEFAULT_SWEEP_INTERVAL};
