//! Test doubles shared by unit tests.

use crate::core::feedback::{Cue, Feedback};
use crate::core::player::{CoreError, PlayerCore};
use crate::core::tag::TagUid;
use crate::device::{DeviceError, ScanSource};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum CoreCall {
    PlayUri(String),
    TogglePause,
    Stop,
    Next,
    Previous,
    Shuffle,
    SetVolume(u8),
}

/// Player core that records calls.
#[derive(Default)]
pub struct RecordingCore {
    calls: Mutex<Vec<CoreCall>>,
    fail: bool,
}

impl RecordingCore {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::default(),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<CoreCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: CoreCall) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(CoreError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PlayerCore for RecordingCore {
    fn play_uri(&self, uri: &str) -> Result<(), CoreError> {
        self.record(CoreCall::PlayUri(uri.to_string()))
    }
    fn toggle_pause(&self) -> Result<(), CoreError> {
        self.record(CoreCall::TogglePause)
    }
    fn stop(&self) -> Result<(), CoreError> {
        self.record(CoreCall::Stop)
    }
    fn next(&self) -> Result<(), CoreError> {
        self.record(CoreCall::Next)
    }
    fn previous(&self) -> Result<(), CoreError> {
        self.record(CoreCall::Previous)
    }
    fn shuffle(&self) -> Result<(), CoreError> {
        self.record(CoreCall::Shuffle)
    }
    fn set_volume(&self, volume: u8) -> Result<(), CoreError> {
        self.record(CoreCall::SetVolume(volume))
    }
}

/// Feedback player that records cues.
#[derive(Default)]
pub struct RecordingFeedback {
    cues: Mutex<Vec<Cue>>,
}

impl RecordingFeedback {
    pub fn cues(&self) -> Vec<Cue> {
        self.cues.lock().unwrap().clone()
    }
}

impl Feedback for RecordingFeedback {
    fn play(&self, cue: Cue) {
        self.cues.lock().unwrap().push(cue);
    }
}

/// Scan source fed through a channel; blocks like a real reader.
pub struct ChannelSource {
    rx: Receiver<Result<TagUid, DeviceError>>,
    released: Arc<AtomicBool>,
}

impl ChannelSource {
    pub fn new() -> (Self, Sender<Result<TagUid, DeviceError>>, Arc<AtomicBool>) {
        let (tx, rx) = unbounded();
        let released = Arc::new(AtomicBool::new(false));
        let source = Self {
            rx,
            released: Arc::clone(&released),
        };
        (source, tx, released)
    }
}

impl ScanSource for ChannelSource {
    fn read_uid(&mut self) -> Result<TagUid, DeviceError> {
        self.rx.recv().unwrap_or(Err(DeviceError::Closed))
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
