//! In-memory landmark source for deterministic tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Frame, LandmarkSource};
use crate::error::CaptureError;

/// Serves a fixed list of frames (or errors), then reports exhaustion.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    items: VecDeque<Result<Frame, CaptureError>>,
    released: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            items: frames.into_iter().map(Ok).collect(),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn push_frame(&mut self, frame: Frame) -> &mut Self {
        self.items.push_back(Ok(frame));
        self
    }

    pub fn push_error(&mut self, err: CaptureError) -> &mut Self {
        self.items.push_back(Err(err));
        self
    }

    /// Flag flipped once the source has been released
    pub fn released_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl LandmarkSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        match self.items.pop_front() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
