//! Replay of recorded landmark sessions.
//!
//! A recording is a JSON-lines file, one [`Frame`] per line. Blank lines
//! are ignored. Opening a missing or unreadable file is an initialization
//! failure; a malformed line stops the replay with `ReadFailed`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{Frame, LandmarkSource};
use crate::error::CaptureError;

pub struct RecordedSource<R: BufRead + Send> {
    reader: R,
    label: String,
    line_number: usize,
    line: String,
}

impl RecordedSource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| CaptureError::InitFailed {
            reason: format!("{}: {}", path.display(), err),
        })?;
        log::info!("[Capture] Replaying recording {}", path.display());
        Ok(Self::from_reader(
            BufReader::new(file),
            path.display().to_string(),
        ))
    }
}

impl<R: BufRead + Send> RecordedSource<R> {
    pub fn from_reader(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
            line_number: 0,
            line: String::new(),
        }
    }
}

impl<R: BufRead + Send> LandmarkSource for RecordedSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_str(trimmed)
                .map(Some)
                .map_err(|err| CaptureError::ReadFailed {
                    reason: format!("{} line {}: {}", self.label, self.line_number, err),
                });
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}
