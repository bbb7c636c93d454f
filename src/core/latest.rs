//! Latest-scan slot - last resolved (or unknown) tag, polled by HTTP clients.

use super::action::TagAction;
use std::sync::{Arc, PoisonError, RwLock};

/// Single-value slot, written by the scanner and read by the API.
///
/// Values are swapped as a whole `Arc`, so a reader gets either the previous
/// or the new descriptor, never a mix.
#[derive(Debug, Default)]
pub struct LatestScan {
    slot: RwLock<Option<Arc<TagAction>>>,
}

impl LatestScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, action: TagAction) {
        let action = Arc::new(action);
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(action);
    }

    pub fn get(&self) -> Option<Arc<TagAction>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
