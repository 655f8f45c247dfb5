// src/handoff.rs

//! Single-slot mailbox between two pipeline stages.
//!
//! `publish` overwrites whatever is in the slot and wakes the consumer.
//! A consumer that falls behind only ever sees the newest value.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;

pub struct Handoff<T> {
    slot: Mutex<Option<T>>,
    signal: Condvar,
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    /// Stores `value`, discarding any unconsumed predecessor. Never blocks
    /// beyond the slot's critical section.
    pub fn publish(&self, value: T) {
        let mut slot = self.slot.lock();
        *slot = Some(value);
        self.signal.notify_one();
    }

    /// Returns the pending value if there is one, without waiting.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    /// Blocks until a published value is pending.
    ///
    /// Returns immediately if a publish happened before the call, so a
    /// consumer that starts late never misses the wake-up.
    pub fn await_signal(&self) {
        let mut slot = self.slot.lock();
        while slot.is_none() {
            self.signal.wait(&mut slot);
        }
    }

    /// Like `await_signal`, but gives up after `timeout`. Returns whether a
    /// value is pending.
    pub fn await_signal_timeout(&self, timeout: Duration) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            self.signal.wait_for(&mut slot, timeout);
        }
        slot.is_some()
    }

    /// Waits for the next value and takes it.
    pub fn recv(&self) -> T {
        loop {
            self.await_signal();
            // another taker may have won the race
            if let Some(value) = self.take() {
                return value;
            }
        }
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn last_write_wins() {
        let handoff = Handoff::new();
        handoff.publish(1);
        handoff.publish(2);
        assert_eq!(handoff.take(), Some(2));
        assert_eq!(handoff.take(), None);
    }

    #[test]
    fn take_on_empty_slot_returns_immediately() {
        let handoff: Handoff<u32> = Handoff::new();
        let start = Instant::now();
        assert_eq!(handoff.take(), None);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn publish_does_not_wait_for_a_consumer() {
        let handoff = Handoff::new();
        for i in 0..1000 {
            handoff.publish(i);
        }
        assert_eq!(handoff.take(), Some(999));
    }

    #[test]
    fn consumer_is_woken_by_publish() {
        let handoff = Arc::new(Handoff::new());
        let consumer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || handoff.recv())
        };
        thread::sleep(Duration::from_millis(50));
        handoff.publish("fresh");
        assert_eq!(consumer.join().unwrap(), "fresh");
    }

    #[test]
    fn signal_before_wait_is_not_lost() {
        let handoff = Handoff::new();
        handoff.publish(7);
        handoff.await_signal();
        assert_eq!(handoff.take(), Some(7));
    }

    #[test]
    fn timed_wait_reports_an_empty_slot() {
        let handoff: Handoff<()> = Handoff::new();
        assert!(!handoff.await_signal_timeout(Duration::from_millis(20)));
        handoff.publish(());
        assert!(handoff.await_signal_timeout(Duration::from_millis(20)));
    }
}
