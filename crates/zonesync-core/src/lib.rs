//! zonesync-core - keeping unbound local-data consistent across a fleet.
//!
//! The master side owns the authoritative record store ([`store`]); agent
//! nodes pull deltas from it on a fixed interval ([`sync`]), regenerate
//! per-zone override files ([`zonefile`]) and nudge the local unbound
//! process to pick them up ([`reload`]).
//!
//! ```text
//! ┌────────────┐  GET /api/record?updated=N   ┌─────────────┐
//! │ RecordStore│◀─────────────────────────────│  SyncAgent  │
//! │  (SQLite)  │──────── records ────────────▶│  (per node) │
//! └────────────┘                              └──────┬──────┘
//!                                                    │ group by zone
//!                                                    ▼
//!                                        <local-data-dir>/<zone>.conf
//!                                                    │ SIGHUP
//!                                                    ▼
//!                                              unbound process
//! ```

pub mod reload;
pub mod store;
pub mod sync;
pub mod validator;
pub mod zonefile;

pub use reload::{ReloadOutcome, UnboundReloader};
pub use store::{RecordFilter, RecordStore};
pub use sync::{CycleReport, SyncAgent, SyncError, Watermark};
