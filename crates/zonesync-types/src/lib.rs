//! Shared types for the zonesync workspace: the DNS override record model,
//! daemon configuration, and the storage error taxonomy.

pub mod config;
pub mod error;
pub mod models;

pub use config::{AgentConfig, Config, LogConfig, MasterConfig};
pub use error::StoreError;
pub use models::{resource_within, NewRecord, Record, RecordPatch, RecordType, UnknownRecordType};
