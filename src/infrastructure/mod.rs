//! Infrastructure layer - Framework implementations
//!
//! This layer contains:
//! - Database connection and migrations (db)
//! - Persistent response cache (cache)
//! - Configuration loading (config)
//! - Wall-clock scheduling gates (gate)

pub mod cache;
pub mod config;
pub mod db;
pub mod gate;

pub use cache::SqliteResponseCache;
pub use config::{Config, ExecutorConfig};
pub use gate::{MaintenanceWindow, RecordingGate, WallClockGate};
