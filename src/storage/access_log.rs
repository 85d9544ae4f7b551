//! Bounded log of recent access instants.

use std::collections::VecDeque;
use std::time::Instant;

/// A fixed-capacity FIFO of access instants.
///
/// Once full, recording a new access drops the oldest one. A capacity of
/// zero keeps nothing.
#[derive(Debug, Clone)]
pub struct AccessLog {
    times: VecDeque<Instant>,
    capacity: usize,
}

impl AccessLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            times: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `at`, evicting the oldest entry if the log is full.
    pub fn record(&mut self, at: Instant) {
        if self.capacity == 0 {
            return;
        }
        if self.times.len() == self.capacity {
            self.times.pop_front();
        }
        self.times.push_back(at);
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Instant> {
        self.times.iter()
    }

    pub fn to_vec(&self) -> Vec<Instant> {
        self.times.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_in_order() {
        let base = Instant::now();
        let mut log = AccessLog::with_capacity(3);

        log.record(base);
        log.record(base + Duration::from_secs(1));

        assert_eq!(log.len(), 2);
        assert_eq!(log.to_vec(), vec![base, base + Duration::from_secs(1)]);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let base = Instant::now();
        let mut log = AccessLog::with_capacity(10);

        for i in 0..11 {
            log.record(base + Duration::from_secs(i));
        }

        assert_eq!(log.len(), 10);
        let times = log.to_vec();
        assert!(!times.contains(&base));
        assert_eq!(times.first(), Some(&(base + Duration::from_secs(1))));
        assert_eq!(times.last(), Some(&(base + Duration::from_secs(10))));
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut log = AccessLog::with_capacity(0);
        log.record(Instant::now());
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 0);
    }
}
