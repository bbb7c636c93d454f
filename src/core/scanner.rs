//! Scan loop - dedicated thread turning tag reads into actions.
//!
//! # States
//!
//! ```text
//!        ┌──────────── suppressed / read error ───────────┐
//!        ▼                                                │
//!   ┌─────────┐  uid   ┌───────────┐  found  ┌────────────┐│
//!   │  Idle   │ ─────▶ │ Resolving │ ──────▶ │ Triggering ││
//!   │ (read)  │        └───────────┘         └────────────┘│
//!   └─────────┘              │ not found          │       │
//!        ▲                   └────────────────────┴───────┘
//!        │ stop flag checked here
//!        ▼
//!   ┌─────────┐
//!   │ Stopped │  source released, completion signalled
//!   └─────────┘
//! ```
//!
//! The device read is the only blocking point and has no timeout. A stop
//! request is noticed once the current read returns; `ScannerHandle::shutdown`
//! waits for that with a deadline instead of joining blindly.

use super::action::{ActionContext, TagAction};
use super::debounce::{DEFAULT_THRESHOLD, ScanDebouncer};
use super::feedback::{Cue, Feedback};
use super::latest::LatestScan;
use super::player::PlayerCore;
use super::registry::{Registry, RegistryError};
use super::tag::TagUid;
use crate::device::ScanSource;
use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Pause between consecutive failed reads.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Resolving,
    Triggering,
    Stopped,
}

impl ScanState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ScanState::Idle,
            1 => ScanState::Resolving,
            2 => ScanState::Triggering,
            _ => ScanState::Stopped,
        }
    }
}

/// Shared, lock-free view of the scanner state.
#[derive(Debug, Clone)]
pub struct ScanStatus(Arc<AtomicU8>);

impl Default for ScanStatus {
    fn default() -> Self {
        Self(Arc::new(AtomicU8::new(ScanState::Idle as u8)))
    }
}

impl ScanStatus {
    pub fn get(&self) -> ScanState {
        ScanState::from_u8(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, state: ScanState) {
        self.0.store(state as u8, Ordering::Relaxed);
    }
}

/// Everything a scan touches besides the device.
#[derive(Clone)]
pub struct ScanContext {
    pub registry: Arc<Registry>,
    pub latest: Arc<LatestScan>,
    pub core: Arc<dyn PlayerCore>,
    pub feedback: Arc<dyn Feedback>,
}

/// Result of handling one read.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Repeat read inside the debounce window
    Suppressed,
    /// Registered tag; action was invoked (published copy)
    Triggered(TagAction),
    /// Unknown tag; published as `Unknown`
    Unregistered(TagAction),
}

pub struct ScanLoop {
    source: Box<dyn ScanSource>,
    ctx: ScanContext,
    debouncer: ScanDebouncer,
    error_backoff: Duration,
    status: ScanStatus,
    stop: Arc<AtomicBool>,
}

impl ScanLoop {
    pub fn new(source: Box<dyn ScanSource>, ctx: ScanContext) -> Self {
        Self {
            source,
            ctx,
            debouncer: ScanDebouncer::new(DEFAULT_THRESHOLD),
            error_backoff: DEFAULT_ERROR_BACKOFF,
            status: ScanStatus::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_debounce(mut self, threshold: Duration) -> Self {
        self.debouncer = ScanDebouncer::new(threshold);
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn status(&self) -> ScanStatus {
        self.status.clone()
    }

    /// Run the loop on its own thread.
    pub fn spawn(self) -> io::Result<ScannerHandle> {
        let (done_tx, done_rx) = bounded(1);
        let stop = Arc::clone(&self.stop);
        let status = self.status.clone();

        let thread = thread::Builder::new()
            .name("tapdeck-scanner".to_string())
            .spawn(move || self.run(done_tx))?;

        Ok(ScannerHandle {
            stop,
            status,
            done: done_rx,
            thread: Some(thread),
        })
    }

    fn run(mut self, done: Sender<()>) {
        info!(
            "Scanner started (debounce {}ms)",
            self.debouncer.threshold().as_millis()
        );
        let mut failures: u32 = 0;

        while !self.stop.load(Ordering::SeqCst) {
            self.status.set(ScanState::Idle);
            trace!("Waiting for tag");

            match self.source.read_uid() {
                Ok(uid) if self.stop.load(Ordering::SeqCst) => {
                    debug!("Tag {} read after stop request, ignored", uid);
                }
                Ok(uid) => {
                    failures = 0;
                    self.process(uid);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    if failures == 1 {
                        warn!("Tag read failed: {}", e);
                    } else {
                        debug!("Tag read failed ({} in a row): {}", failures, e);
                        if !self.stop.load(Ordering::SeqCst) {
                            thread::sleep(self.error_backoff);
                        }
                    }
                }
            }
        }

        self.source.release();
        self.status.set(ScanState::Stopped);
        info!("Scanner stopped");
        let _ = done.send(());
    }

    /// Handle one read now.
    pub fn process(&mut self, uid: TagUid) -> ScanOutcome {
        self.process_at(uid, Instant::now())
    }

    /// Handle one read at `now` (debounce clock).
    pub fn process_at(&mut self, uid: TagUid, now: Instant) -> ScanOutcome {
        if !self.debouncer.accept(&uid, now) {
            return ScanOutcome::Suppressed;
        }

        info!("Tag {} read", uid);
        self.status.set(ScanState::Resolving);

        match self.ctx.registry.lookup(&uid) {
            Ok(action) => {
                info!("Triggering {} for tag {}", action.kind, uid);
                self.ctx.feedback.play(Cue::Success);
                self.status.set(ScanState::Triggering);

                let action_ctx = ActionContext {
                    core: self.ctx.core.as_ref(),
                };
                if let Err(e) = action.invoke(&action_ctx) {
                    error!("Action {} for tag {} failed: {}", action.kind, uid, e);
                }

                let scanned = action.scanned_at(Utc::now());
                self.ctx.latest.publish(scanned.clone());
                ScanOutcome::Triggered(scanned)
            }
            Err(e) => {
                match e {
                    RegistryError::NotFound(_) => info!("Tag {} is not registered", uid),
                    other => warn!("Lookup of {} failed: {}", uid, other),
                }
                self.ctx.feedback.play(Cue::Failure);

                let scanned = TagAction::unknown(uid).scanned_at(Utc::now());
                self.ctx.latest.publish(scanned.clone());
                ScanOutcome::Unregistered(scanned)
            }
        }
    }
}

/// Control handle for a spawned [`ScanLoop`].
pub struct ScannerHandle {
    stop: Arc<AtomicBool>,
    status: ScanStatus,
    done: Receiver<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ScannerHandle {
    /// Request a stop; takes effect once the current read returns.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn status(&self) -> ScanStatus {
        self.status.clone()
    }

    /// Stop and wait up to `timeout` for the loop to exit.
    ///
    /// Returns false when the thread is still blocked in a device read; it is
    /// then left to die with the process.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        self.stop();

        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    if thread.join().is_err() {
                        error!("Scanner thread panicked");
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Scanner still waiting for the reader after {}ms, not joining",
                    timeout.as_millis()
                );
                false
            }
        }
    }
}
