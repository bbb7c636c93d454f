//! Line-oriented readers: one UID per line.
//!
//! Covers serial readers that print the UID over a tty, and `--stdin` for
//! driving the service by hand.

use super::{DeviceError, ScanSource};
use crate::core::tag::TagUid;
use std::fs::File;
use std::io::{BufRead, BufReader, Stdin};
use std::path::Path;

pub struct LineSource<R: BufRead + Send> {
    reader: Option<R>,
    line: String,
}

impl LineSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let file = File::open(path.as_ref())?;
        log::debug!("Opened line reader {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl LineSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()))
    }
}

impl<R: BufRead + Send> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            line: String::new(),
        }
    }
}

impl<R: BufRead + Send> ScanSource for LineSource<R> {
    fn read_uid(&mut self) -> Result<TagUid, DeviceError> {
        let reader = self.reader.as_mut().ok_or(DeviceError::Closed)?;

        loop {
            self.line.clear();
            if reader.read_line(&mut self.line)? == 0 {
                return Err(DeviceError::Closed);
            }
            if !self.line.trim().is_empty() {
                return Ok(TagUid::parse(&self.line)?);
            }
        }
    }

    fn release(&mut self) {
        self.reader = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines() {
        let mut source = LineSource::new(Cursor::new("0a1b2c3d\n\n  ff \r\nzz\n"));

        assert_eq!(source.read_uid().unwrap().as_str(), "0A1B2C3D");
        assert_eq!(source.read_uid().unwrap().as_str(), "FF");
        assert!(matches!(source.read_uid(), Err(DeviceError::Malformed(_))));
        assert!(matches!(source.read_uid(), Err(DeviceError::Closed)));
    }

    #[test]
    fn test_release() {
        let mut source = LineSource::new(Cursor::new("01\n"));
        source.release();
        assert!(matches!(source.read_uid(), Err(DeviceError::Closed)));
    }
}
