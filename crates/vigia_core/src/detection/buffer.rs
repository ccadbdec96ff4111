//! Fixed-capacity ring buffer of recent magnitudes.

use std::collections::VecDeque;

/// Ring buffer of the most recent magnitude values.
///
/// # Invariants
/// - `len() <= capacity()`; inserting into a full buffer evicts the oldest
///   value.
/// - Capacity is fixed at construction and is at least 1.
#[derive(Debug, Clone)]
pub struct MagnitudeBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl MagnitudeBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, magnitude: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(magnitude);
    }

    /// Mean of the newest `window` values.
    ///
    /// Uses every buffered value when fewer than `window` are available.
    /// Returns `None` for an empty buffer or a zero window.
    pub fn recent_mean(&self, window: usize) -> Option<f64> {
        if window == 0 || self.values.is_empty() {
            return None;
        }
        let take = window.min(self.values.len());
        let sum: f64 = self.values.iter().rev().take(take).sum();
        Some(sum / take as f64)
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
