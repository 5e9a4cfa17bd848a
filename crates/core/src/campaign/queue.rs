//! Shared work queue of pending recipients.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::recipient::Recipient;

/// Thread-safe, depletable queue. Each enqueued recipient is handed to
/// exactly one caller of [`WorkQueue::try_dequeue`].
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<Recipient>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, recipient: Recipient) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(recipient);
    }

    /// Non-blocking. `None` means there is no more work.
    pub fn try_dequeue(&self) -> Option<Recipient> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn size(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl FromIterator<Recipient> for WorkQueue {
    fn from_iter<I: IntoIterator<Item = Recipient>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn recipients(n: usize) -> Vec<Recipient> {
        (0..n)
            .map(|i| Recipient::parse(&format!("555{:07}", i)).unwrap())
            .collect()
    }

    #[test]
    fn test_fifo_and_empty() {
        let queue = WorkQueue::new();
        assert!(queue.try_dequeue().is_none());

        for r in recipients(3) {
            queue.enqueue(r);
        }
        assert_eq!(queue.size(), 3);
        assert_eq!(queue.try_dequeue().unwrap().as_str(), "5550000000");
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn test_concurrent_dequeue_hands_out_each_item_once() {
        let input = recipients(1000);
        let queue: Arc<WorkQueue> = Arc::new(input.iter().cloned().collect());
        let successes = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let successes = Arc::clone(&successes);
                std::thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(r) = queue.try_dequeue() {
                        successes.fetch_add(1, Ordering::SeqCst);
                        taken.push(r);
                    }
                    taken
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for r in handle.join().unwrap() {
                assert!(seen.insert(r), "recipient handed out twice");
            }
        }

        assert_eq!(successes.load(Ordering::SeqCst), 1000);
        assert_eq!(seen.len(), 1000);
        assert!(queue.is_empty());
    }
}
