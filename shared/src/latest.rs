//! Single-slot mailbox with latest-wins semantics
//!
//! The producer overwrites, the consumer takes. Anything published between
//! two takes except the newest value is dropped, so a slow consumer never
//! builds a backlog and never applies back-pressure to the producer.

use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
pub struct LatestSlot<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `value`, replacing anything not yet taken.
    ///
    /// Returns true if an untaken value was discarded.
    pub fn publish(&self, value: T) -> bool {
        self.lock().replace(value).is_some()
    }

    /// Remove and return the newest value, if any.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

impl<T: Clone> LatestSlot<T> {
    /// Copy of the newest value without consuming it
    pub fn peek(&self) -> Option<T> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_latest_wins() {
        let slot = LatestSlot::new();
        assert!(!slot.publish(1));
        assert!(slot.publish(2));
        assert!(slot.publish(3));

        assert_eq!(slot.take(), Some(3));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let slot = LatestSlot::new();
        slot.publish("a".to_string());
        assert_eq!(slot.peek().as_deref(), Some("a"));
        assert!(!slot.is_empty());
        assert_eq!(slot.take().as_deref(), Some("a"));
        assert!(slot.is_empty());
    }

    #[test]
    fn test_concurrent_publish() {
        let slot = Arc::new(LatestSlot::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let slot = Arc::clone(&slot);
                thread::spawn(move || {
                    for i in 0..100 {
                        slot.publish(t * 1000 + i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let last = slot.take().unwrap();
        assert_eq!(last % 1000, 99);
        assert!(slot.take().is_none());
    }
}
