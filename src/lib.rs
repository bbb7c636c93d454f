//! TAPDECK - RFID tag scanner service library
//!
//! Re-exports all modules for use by the binary and integration tests.

// Core engine (registry, scan loop, actions, workers)
pub mod core;

// Reader adapters
pub mod device;

// Player backend
pub mod mopidy;

// HTTP registry API
pub mod server;

// App configuration
pub mod cli;
pub mod paths;
pub mod settings;

#[cfg(test)]
mod testing;

// Re-export commonly used types from core
pub use core::{ActionKind, LatestScan, Registry, ScanLoop, TagAction, TagUid};
pub use device::ScanSource;
pub use mopidy::MopidyClient;
pub use server::{ApiServer, ApiState};
