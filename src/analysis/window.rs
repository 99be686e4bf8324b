//! Sliding window of normalized feature vectors
//!
//! Holds the most recent `capacity` frames in arrival order, evicting the
//! oldest first. The classifier only sees the window once it is full.

use std::collections::VecDeque;

use super::features::FeatureVector;

/// Fixed-capacity FIFO window feeding the classifier
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    frames: VecDeque<FeatureVector>,
    capacity: usize,
}

impl SlidingWindow {
    /// Create an empty window
    ///
    /// `capacity` is clamped to at least one frame.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest once capacity is exceeded
    pub fn push(&mut self, frame: FeatureVector) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// True iff the window holds exactly `capacity` frames
    pub fn is_ready(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Current contents, oldest first
    pub fn snapshot(&self) -> Vec<FeatureVector> {
        self.frames.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill level in percent, for telemetry gauges
    pub fn occupancy_percent(&self) -> f32 {
        self.frames.len() as f32 / self.capacity as f32 * 100.0
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
