//! Core engine modules - registry, actions, scanner, feedback, workers
//!
//! These modules hold the scan-to-action pipeline, independent of HTTP and of
//! any concrete reader or player.

pub mod action;
pub mod debounce;
pub mod feedback;
pub mod latest;
pub mod player;
pub mod registry;
pub mod scanner;
pub mod store;
pub mod tag;
pub mod workers;

// Re-exports for convenience
pub use action::{ActionContext, ActionError, ActionKind, TagAction};
pub use debounce::ScanDebouncer;
pub use feedback::{CommandFeedback, Cue, Feedback, SilentFeedback};
pub use latest::LatestScan;
pub use player::{CoreError, PlayerCore};
pub use registry::{Registry, RegistryError};
pub use scanner::{ScanContext, ScanLoop, ScanOutcome, ScanState, ScanStatus, ScannerHandle};
pub use store::{Entries, JsonFileStore, MemoryStore, RegistryStore, StoreError};
pub use tag::{TagUid, TagUidError};
pub use workers::Workers;
