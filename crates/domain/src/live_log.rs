//! In-memory rolling window of raw readings.
//!
//! The live log is the source for 1-minute down-sampling: every raw reading
//! is prepended (newest first) and the tail is trimmed to the 24-hour window,
//! always keeping at least one entry so the latest reading stays queryable.

use std::collections::VecDeque;

use chrono::Duration;

use crate::time::Timestamp;

/// Entries stored in a [`LiveLog`] expose their creation time.
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

/// Insertion-ordered deque of raw readings, newest at the head.
#[derive(Debug, Clone)]
pub struct LiveLog<T> {
    entries: VecDeque<T>,
}

impl<T> Default for LiveLog<T> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<T: Timestamped> LiveLog<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a new entry and trim tail entries older than 24 hours,
    /// keeping at least one entry.
    pub fn prepend(&mut self, entry: T, now: Timestamp) {
        self.entries.push_front(entry);
        let horizon = now - Duration::days(1);
        while self.entries.len() > 1
            && self
                .entries
                .back()
                .is_some_and(|oldest| oldest.timestamp() < horizon)
        {
            self.entries.pop_back();
        }
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Time-weighted average of one channel over `[start, end]`.
    ///
    /// Each entry's value holds from its own timestamp until the next newer
    /// entry (or `end` for the newest). Entries older than `start` contribute
    /// only the part of their frame inside the window; iteration stops at the
    /// first such entry. An empty window yields 0.
    #[must_use]
    pub fn time_weighted_average<F>(&self, start: Timestamp, end: Timestamp, value: F) -> f64
    where
        F: Fn(&T) -> f64,
    {
        let window_ms = (end - start).num_milliseconds();
        if window_ms <= 0 {
            return 0.0;
        }

        let mut sum = 0.0;
        let mut frame_end = end;
        for entry in &self.entries {
            let frame_start = entry.timestamp().max(start);
            let duration_ms = (frame_end - frame_start).num_milliseconds().max(0);
            sum += value(entry) * duration_ms as f64;
            if entry.timestamp() < start {
                break;
            }
            frame_end = entry.timestamp();
        }

        sum / window_ms as f64
    }
}
