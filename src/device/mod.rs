//! Scan sources - readers that deliver tag UIDs.
//!
//! The scanner only sees [`ScanSource::read_uid`]. How a reader encodes a UID
//! (keyboard scancodes, serial lines, SPI frames) stays inside its adapter.
//!
//! | Adapter                         | Device                                   |
//! |---------------------------------|------------------------------------------|
//! | [`keyboard::KeyboardWedge`]     | USB readers that type the UID + Enter    |
//! | [`lines::LineSource`]           | stdin, serial ttys, anything line-based  |

pub mod keyboard;
pub mod lines;

pub use keyboard::{KeyboardWedge, Keymap, find_event_device};
pub use lines::LineSource;

use crate::core::tag::{TagUid, TagUidError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Read failure. The scanner logs these and keeps going.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device IO error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed read: {0}")]
    Malformed(String),
    #[error("device closed")]
    Closed,
    #[error("no input device named \"{0}\"")]
    NotFound(String),
    #[error("device {0} is not readable")]
    Unreadable(PathBuf),
}

impl From<TagUidError> for DeviceError {
    fn from(e: TagUidError) -> Self {
        DeviceError::Malformed(e.to_string())
    }
}

/// Blocking source of scanned UIDs.
pub trait ScanSource: Send {
    /// Block until the next tag is read. No timeout.
    fn read_uid(&mut self) -> Result<TagUid, DeviceError>;

    /// Release the underlying device. Called once when the scanner exits.
    fn release(&mut self) {}
}
