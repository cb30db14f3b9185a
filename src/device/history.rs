use std::collections::VecDeque;

use crate::device::constants::HISTORY_CAPACITY;
use crate::device::types::Reading;

/// Bounded list of readings, newest first.
///
/// Not synchronized; the controller task is the only writer.
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl ReadingHistory {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ReadingHistory {
            readings: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push_front(reading);
        self.readings.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn snapshot(&self) -> Vec<Reading> {
        self.readings.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl Default for ReadingHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};
    use super::*;

    fn reading(value: f32) -> Reading {
        Reading::new(value, UNIX_EPOCH + Duration::from_secs(value as u64))
    }

    #[test]
    fn should_keep_newest_first() {
        let mut history = ReadingHistory::new();
        history.push(reading(1.0));
        history.push(reading(2.0));

        let values: Vec<f32> = history.iter().map(Reading::value).collect();
        assert_eq!(values, vec![2.0, 1.0]);
        assert_eq!(history.latest().map(Reading::value), Some(2.0));
    }

    #[test]
    fn should_cap_at_capacity() {
        let mut history = ReadingHistory::new();
        for i in 0..150 {
            history.push(reading(i as f32));
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), HISTORY_CAPACITY);
        assert_eq!(snapshot[0].value(), 149.0);
        assert_eq!(snapshot[HISTORY_CAPACITY - 1].value(), 50.0);
    }

    #[test]
    fn should_evict_only_the_oldest_entry() {
        let mut history = ReadingHistory::new();
        for i in 0..HISTORY_CAPACITY {
            history.push(reading(i as f32));
        }
        assert_eq!(history.snapshot().last().map(Reading::value), Some(0.0));

        history.push(reading(100.0));

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), HISTORY_CAPACITY);
        assert_eq!(snapshot.first().map(Reading::value), Some(100.0));
        assert_eq!(snapshot.last().map(Reading::value), Some(1.0));
    }

    #[test]
    fn should_empty_on_clear() {
        let mut history = ReadingHistory::with_capacity(3);
        for i in 0..5 {
            history.push(reading(i as f32));
        }
        assert_eq!(history.len(), 3);

        history.clear();
        assert!(history.is_empty());
        assert!(history.snapshot().is_empty());

        history.clear();
        assert!(history.snapshot().is_empty());
    }
}
