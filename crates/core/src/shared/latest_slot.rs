use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Single-value holder with overwrite-on-write semantics.
///
/// Writers replace the held value wholesale by swapping one `Arc`; readers
/// get a clone of whatever `Arc` is current. The lock only guards the
/// pointer swap, so neither side ever waits for the other's work, and a
/// reader can never observe a value that is half old and half new.
pub struct LatestSlot<T> {
    value: Mutex<Option<Arc<T>>>,
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// Replaces the held value.
    pub fn publish(&self, value: T) {
        *self.lock() = Some(Arc::new(value));
    }

    /// Snapshot of the current value, if any has ever been published.
    pub fn latest(&self) -> Option<Arc<T>> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    // A writer that panicked mid-swap cannot leave a torn value behind, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_empty_until_first_publish() {
        let slot: LatestSlot<u32> = LatestSlot::new();
        assert!(slot.is_empty());
        assert!(slot.latest().is_none());
        slot.publish(7);
        assert!(!slot.is_empty());
        assert_eq!(*slot.latest().unwrap(), 7);
    }

    #[test]
    fn test_publish_overwrites_previous_value() {
        let slot = LatestSlot::new();
        slot.publish(vec![1, 2, 3]);
        slot.publish(vec![4]);
        assert_eq!(*slot.latest().unwrap(), vec![4]);
    }

    #[test]
    fn test_snapshot_survives_later_publish() {
        let slot = LatestSlot::new();
        slot.publish(String::from("first"));
        let snapshot = slot.latest().unwrap();
        slot.publish(String::from("second"));
        assert_eq!(*snapshot, "first");
        assert_eq!(*slot.latest().unwrap(), "second");
    }

    #[test]
    fn test_concurrent_writers_never_expose_mixed_values() {
        // Each value is a (tag, payload) pair whose payload is entirely `tag`;
        // a torn write would show a payload element that differs from the tag.
        let slot: Arc<LatestSlot<(usize, Vec<usize>)>> = Arc::new(LatestSlot::new());
        let done = Arc::new(AtomicBool::new(false));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let slot = slot.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let tag = w * 1000 + i;
                        slot.publish((tag, vec![tag; 64]));
                    }
                })
            })
            .collect();

        let reader = {
            let slot = slot.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::Relaxed) {
                    if let Some(value) = slot.latest() {
                        let (tag, payload) = &*value;
                        assert!(payload.iter().all(|p| p == tag));
                        reads += 1;
                    }
                }
                reads
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        reader.join().unwrap();

        let (tag, payload) = &*slot.latest().unwrap();
        assert_eq!(payload.len(), 64);
        assert!(payload.iter().all(|p| p == tag));
    }
}
