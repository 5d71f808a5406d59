//! Generic micro-batch accumulator, ported from the job queue's batcher:
//! flush when either the size threshold or the time window is reached,
//! whichever comes first.

use std::time::{Duration, Instant};

pub struct MicroBatcher<T> {
    buffer: Vec<T>,
    max_size: usize,
    max_wait: Duration,
    batch_started: Option<Instant>,
}

impl<T> MicroBatcher<T> {
    pub fn new(max_size: usize, max_wait: Duration) -> Self {
        Self { buffer: Vec::with_capacity(max_size), max_size, max_wait, batch_started: None }
    }

    pub fn push(&mut self, items: Vec<T>) {
        if self.batch_started.is_none() && !items.is_empty() {
            self.batch_started = Some(Instant::now());
        }
        self.buffer.extend(items);
    }

    pub fn should_flush(&self) -> bool {
        if self.buffer.is_empty() {
            return false;
        }
        if self.buffer.len() >= self.max_size {
            return true;
        }
        if let Some(started) = self.batch_started {
            if started.elapsed() >= self.max_wait {
                return true;
            }
        }
        false
    }

    pub fn flush(&mut self) -> Vec<T> {
        self.batch_started = None;
        std::mem::take(&mut self.buffer)
    }

    pub fn try_flush(&mut self) -> Option<Vec<T>> {
        if self.should_flush() { Some(self.flush()) } else { None }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flushes_on_size_threshold() {
        let mut batcher = MicroBatcher::new(3, Duration::from_secs(60));
        batcher.push(vec![1, 2, 3]);
        assert!(batcher.should_flush());
    }

    #[test]
    fn does_not_flush_below_size_or_time() {
        let mut batcher: MicroBatcher<i32> = MicroBatcher::new(5, Duration::from_secs(60));
        batcher.push(vec![1, 2]);
        assert!(!batcher.should_flush());
    }

    #[test]
    fn flushes_on_timeout() {
        let mut batcher = MicroBatcher::new(100, Duration::from_millis(10));
        batcher.push(vec![1]);
        std::thread::sleep(Duration::from_millis(20));
        assert!(batcher.should_flush());
    }

    #[test]
    fn flush_resets_state() {
        let mut batcher = MicroBatcher::new(2, Duration::from_secs(60));
        batcher.push(vec![1, 2, 3]);
        let flushed = batcher.flush();
        assert_eq!(flushed.len(), 3);
        assert!(batcher.is_empty());
        assert!(!batcher.should_flush());
    }

    #[test]
    fn empty_push_does_not_start_timer() {
        let mut batcher: MicroBatcher<i32> = MicroBatcher::new(5, Duration::from_millis(1));
        batcher.push(vec![]);
        std::thread::sleep(Duration::from_millis(5));
        assert!(!batcher.should_flush());
    }
}
