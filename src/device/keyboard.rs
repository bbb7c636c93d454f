//! Keyboard-wedge readers (Linux evdev).
//!
//! Cheap USB RFID readers enumerate as a keyboard and "type" the UID followed
//! by Enter. We read raw `input_event` records from `/dev/input/eventN`,
//! translate key presses through a [`Keymap`], and return the UID when Enter
//! arrives.
//!
//! # Record layout
//!
//! ```text
//! struct input_event { struct timeval time; __u16 type; __u16 code; __s32 value; }
//! ```
//!
//! `timeval` is two C `long`s, so the record is 24 bytes on 64-bit targets
//! and 16 on 32-bit ones; `isize` matches `long` on Linux.

use super::{DeviceError, ScanSource};
use crate::core::tag::TagUid;
use bytemuck::{Pod, Zeroable};
use log::{debug, trace};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

const EV_KEY: u16 = 0x01;
const KEY_PRESSED: i32 = 1;

const KEY_ENTER: u16 = 28;
const KEY_KPENTER: u16 = 96;
const KEY_LEFTSHIFT: u16 = 42;
const KEY_RIGHTSHIFT: u16 = 54;

/// Longest key sequence accepted before Enter (stuck key, missing terminator)
pub const MAX_UID_KEYS: usize = 64;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct InputEvent {
    pub tv_sec: isize,
    pub tv_usec: isize,
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub const SIZE: usize = std::mem::size_of::<InputEvent>();

    pub fn key_press(code: u16) -> Self {
        Self {
            kind: EV_KEY,
            code,
            value: KEY_PRESSED,
            ..Self::default()
        }
    }
}

/// Scancode → character table for the keys a reader types.
#[derive(Debug, Clone)]
pub struct Keymap {
    keys: Vec<(u16, char)>,
}

impl Default for Keymap {
    fn default() -> Self {
        Self::hex()
    }
}

impl Keymap {
    /// Digits (top row and keypad) plus `a`-`f`. Identical on QWERTY and QWERTZ.
    pub fn hex() -> Self {
        let keys = vec![
            (2, '1'), (3, '2'), (4, '3'), (5, '4'), (6, '5'),
            (7, '6'), (8, '7'), (9, '8'), (10, '9'), (11, '0'),
            (79, '1'), (80, '2'), (81, '3'), (75, '4'), (76, '5'),
            (77, '6'), (71, '7'), (72, '8'), (73, '9'), (82, '0'),
            (30, 'a'), (48, 'b'), (46, 'c'), (32, 'd'), (18, 'e'), (33, 'f'),
        ];
        Self { keys }
    }

    pub fn from_pairs(keys: impl IntoIterator<Item = (u16, char)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn char_for(&self, code: u16) -> Option<char> {
        self.keys.iter().find(|(c, _)| *c == code).map(|(_, ch)| *ch)
    }
}

/// Keyboard-emulating reader over a raw event stream.
pub struct KeyboardWedge<R: Read + Send> {
    reader: Option<R>,
    keymap: Keymap,
}

impl KeyboardWedge<File> {
    /// Open an evdev node, e.g. `/dev/input/event3`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => DeviceError::Unreadable(path.to_path_buf()),
            _ => DeviceError::Io(e),
        })?;
        debug!("Opened keyboard reader {}", path.display());
        Ok(Self::new(file, Keymap::default()))
    }
}

impl<R: Read + Send> KeyboardWedge<R> {
    pub fn new(reader: R, keymap: Keymap) -> Self {
        Self {
            reader: Some(reader),
            keymap,
        }
    }

    fn next_event(&mut self) -> Result<InputEvent, DeviceError> {
        let reader = self.reader.as_mut().ok_or(DeviceError::Closed)?;
        let mut buf = [0u8; InputEvent::SIZE];
        match reader.read_exact(&mut buf) {
            Ok(()) => Ok(bytemuck::pod_read_unaligned(&buf)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(DeviceError::Closed),
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: Read + Send> ScanSource for KeyboardWedge<R> {
    fn read_uid(&mut self) -> Result<TagUid, DeviceError> {
        let mut typed = String::new();
        let mut unmapped = Vec::new();

        loop {
            let event = self.next_event()?;
            if event.kind != EV_KEY || event.value != KEY_PRESSED {
                continue;
            }

            match event.code {
                KEY_ENTER | KEY_KPENTER => break,
                KEY_LEFTSHIFT | KEY_RIGHTSHIFT => {}
                code => match self.keymap.char_for(code) {
                    Some(ch) => typed.push(ch),
                    None => unmapped.push(code),
                },
            }

            if typed.len() + unmapped.len() >= MAX_UID_KEYS {
                return Err(DeviceError::Malformed(format!(
                    "no Enter after {} keys",
                    MAX_UID_KEYS
                )));
            }
        }

        trace!("Keyboard reader typed {:?}", typed);

        if !unmapped.is_empty() {
            return Err(DeviceError::Malformed(format!(
                "unmapped key codes {:?} after {:?}",
                unmapped, typed
            )));
        }
        Ok(TagUid::parse(&typed)?)
    }

    fn release(&mut self) {
        if self.reader.take().is_some() {
            debug!("Keyboard reader released");
        }
    }
}

/// Find the evdev node whose device name is `name`.
pub fn find_event_device(name: &str) -> Result<PathBuf, DeviceError> {
    find_event_device_in(Path::new("/sys/class/input"), Path::new("/dev/input"), name)
}

fn find_event_device_in(sys_root: &Path, dev_root: &Path, name: &str) -> Result<PathBuf, DeviceError> {
    let pattern = format!(
        "{}/event*/device/name",
        glob::Pattern::escape(&sys_root.to_string_lossy())
    );
    let entries =
        glob::glob(&pattern).map_err(|e| DeviceError::Malformed(format!("bad glob: {}", e)))?;

    let mut seen = Vec::new();
    for name_file in entries.flatten() {
        let Ok(device_name) = fs::read_to_string(&name_file) else {
            continue;
        };
        let device_name = device_name.trim();

        let event_node = name_file
            .parent()
            .and_then(Path::parent)
            .and_then(Path::file_name);

        if let Some(event_node) = event_node {
            if device_name == name {
                let path = dev_root.join(event_node);
                debug!("Found \"{}\" at {}", name, path.display());
                return Ok(path);
            }
            seen.push(format!("{} ({})", event_node.to_string_lossy(), device_name));
        }
    }

    log::warn!("No input device named \"{}\", available: {:?}", name, seen);
    Err(DeviceError::NotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn stream(events: &[InputEvent]) -> Cursor<Vec<u8>> {
        let mut bytes = Vec::new();
        for event in events {
            bytes.extend_from_slice(bytemuck::bytes_of(event));
        }
        Cursor::new(bytes)
    }

    fn release_of(code: u16) -> InputEvent {
        InputEvent {
            value: 0,
            ..InputEvent::key_press(code)
        }
    }

    fn sync() -> InputEvent {
        InputEvent::default()
    }

    #[test]
    fn test_reads_uid_until_enter() {
        // "0a1b" + Enter, with key releases and sync reports in between
        let events = [
            InputEvent::key_press(11), release_of(11), sync(),
            InputEvent::key_press(30), release_of(30), sync(),
            InputEvent::key_press(2), release_of(2),
            InputEvent::key_press(48), release_of(48),
            InputEvent::key_press(KEY_ENTER), release_of(KEY_ENTER),
            InputEvent::key_press(5), InputEvent::key_press(KEY_KPENTER),
        ];
        let mut reader = KeyboardWedge::new(stream(&events), Keymap::hex());

        assert_eq!(reader.read_uid().unwrap().as_str(), "0A1B");
        assert_eq!(reader.read_uid().unwrap().as_str(), "4");
        assert!(matches!(reader.read_uid(), Err(DeviceError::Closed)));
    }

    #[test]
    fn test_shift_ignored() {
        let events = [
            InputEvent::key_press(KEY_LEFTSHIFT),
            InputEvent::key_press(33),
            InputEvent::key_press(KEY_ENTER),
        ];
        let mut reader = KeyboardWedge::new(stream(&events), Keymap::hex());
        assert_eq!(reader.read_uid().unwrap().as_str(), "F");
    }

    #[test]
    fn test_unmapped_key_is_malformed_and_reader_recovers() {
        // 'q' (16) is not a hex key
        let events = [
            InputEvent::key_press(2),
            InputEvent::key_press(16),
            InputEvent::key_press(KEY_ENTER),
            InputEvent::key_press(3),
            InputEvent::key_press(KEY_ENTER),
        ];
        let mut reader = KeyboardWedge::new(stream(&events), Keymap::hex());

        assert!(matches!(reader.read_uid(), Err(DeviceError::Malformed(_))));
        assert_eq!(reader.read_uid().unwrap().as_str(), "2");
    }

    #[test]
    fn test_missing_enter_is_capped() {
        // Stuck '1' key: many presses, no Enter
        let events = vec![InputEvent::key_press(2); MAX_UID_KEYS * 3];
        let mut reader = KeyboardWedge::new(stream(&events), Keymap::hex());

        match reader.read_uid() {
            Err(DeviceError::Malformed(msg)) => assert!(msg.contains("Enter")),
            other => panic!("unexpected read: {other:?}"),
        }
    }

    #[test]
    fn test_empty_read_is_malformed() {
        let events = [InputEvent::key_press(KEY_ENTER)];
        let mut reader = KeyboardWedge::new(stream(&events), Keymap::hex());
        assert!(matches!(reader.read_uid(), Err(DeviceError::Malformed(_))));
    }

    #[test]
    fn test_release_closes() {
        let events = [InputEvent::key_press(2), InputEvent::key_press(KEY_ENTER)];
        let mut reader = KeyboardWedge::new(stream(&events), Keymap::hex());
        reader.release();
        assert!(matches!(reader.read_uid(), Err(DeviceError::Closed)));
    }

    #[test]
    fn test_custom_keymap() {
        let keymap = Keymap::from_pairs([(16, '9')]);
        let events = [InputEvent::key_press(16), InputEvent::key_press(KEY_ENTER)];
        let mut reader = KeyboardWedge::new(stream(&events), keymap);
        assert_eq!(reader.read_uid().unwrap().as_str(), "9");
    }

    #[test]
    fn test_find_event_device() {
        let sys = TempDir::new().unwrap();
        for (node, name) in [("event0", "Power Button"), ("event4", "HXGCoLtd Keyboard")] {
            let dir = sys.path().join(node).join("device");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("name"), format!("{}\n", name)).unwrap();
        }

        let found = find_event_device_in(sys.path(), Path::new("/dev/input"), "HXGCoLtd Keyboard");
        assert_eq!(found.unwrap(), PathBuf::from("/dev/input/event4"));

        assert!(matches!(
            find_event_device_in(sys.path(), Path::new("/dev/input"), "Nope"),
            Err(DeviceError::NotFound(_))
        ));
    }
}
