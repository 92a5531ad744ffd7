use std::collections::VecDeque;

/// Bounded window of event timestamps in milliseconds, oldest dropped first.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    timestamp: VecDeque<u64>,
    max_length: usize,
}

impl TimeSeries {
    pub fn new(max_length: usize) -> Self {
        let max_length = max_length.max(2);
        Self {
            timestamp: VecDeque::with_capacity(max_length),
            max_length,
        }
    }

    pub fn push(&mut self, timestamp: u64) {
        self.timestamp.push_back(timestamp);

        if self.timestamp.len() > self.max_length {
            self.timestamp.pop_front();
        }
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.timestamp.back().copied()
    }

    /// Events per second over the window, `None` until two events span a non-zero interval.
    pub fn get_rate(&self) -> Option<f32> {
        let (first, last) = (self.timestamp.front()?, self.timestamp.back()?);
        let span_ms = last.saturating_sub(*first);
        if span_ms == 0 {
            return None;
        }
        Some((self.timestamp.len() - 1) as f32 * 1000.0 / span_ms as f32)
    }

    pub fn clear(&mut self) {
        self.timestamp.clear();
    }
}
