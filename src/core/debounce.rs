//! Scan debouncer - one physical tap, one trigger.
//!
//! Readers report a tag several times while it rests on the antenna. A scan is
//! processed only when it differs from the previously processed UID, or when
//! more than `threshold` has passed since that scan. Suppressed reads do not
//! move the bookkeeping, so a tag left on the reader re-triggers once per
//! threshold window rather than never.

use super::tag::TagUid;
use std::time::{Duration, Instant};

/// Default window for identical reads.
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ScanDebouncer {
    threshold: Duration,
    /// Last processed scan: (uid, time)
    previous: Option<(TagUid, Instant)>,
}

impl Default for ScanDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ScanDebouncer {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            previous: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Decide whether a scan of `uid` at `now` should be processed.
    /// Records it as the previous scan when it is.
    pub fn accept(&mut self, uid: &TagUid, now: Instant) -> bool {
        let process = match &self.previous {
            None => true,
            Some((prev_uid, prev_time)) => {
                prev_uid != uid || now.saturating_duration_since(*prev_time) > self.threshold
            }
        };

        if process {
            self.previous = Some((uid.clone(), now));
        } else {
            log::trace!("ScanDebouncer: suppressed repeat read of {}", uid);
        }
        process
    }

    /// Forget the previous scan
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
