//! Bounded FIFO shared by one producer unit and one consumer unit.
//!
//! Capacity exhaustion is backpressure: `push` parks until there is room.
//! `pop` parks while the queue is empty and the process is running; once the
//! process stops, an empty queue yields `None` instead of parking forever.
//! Items already queued are still handed out after shutdown.

use crate::shutdown::ShutdownToken;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::Notify;

/// Blocking bounded queue.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    not_empty: Notify,
    not_full: Notify,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Maximum number of queued items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Enqueue without waiting; hands the item back when full.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        drop(items);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue without waiting.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.items.lock().pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Enqueue, waiting while the queue is full.
    ///
    /// Returns the item if the process stops before room appears.
    pub async fn push(&self, item: T, shutdown: &ShutdownToken) -> Result<(), T> {
        let mut item = item;
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            item = match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(item) => item,
            };
            if shutdown.is_cancelled() {
                return Err(item);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = shutdown.cancelled() => {}
            }
        }
    }

    /// Dequeue, waiting while the queue is empty and the process is running.
    pub async fn pop(&self, shutdown: &ShutdownToken) -> Option<T> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if shutdown.is_cancelled() {
                return None;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = shutdown.cancelled() => {}
            }
        }
    }
}

#[cfg(test)]
impl<T: Clone> BoundedQueue<T> {
    /// Copy of the queued items, front first.
    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownSignal;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_order() {
        let signal = ShutdownSignal::new();
        let token = signal.token();
        let queue = BoundedQueue::new(4);
        for i in 0..4 {
            queue.push(i, &token).await.unwrap();
        }
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.snapshot(), vec![0, 1, 2, 3]);
        for i in 0..4 {
            assert_eq!(queue.pop(&token).await, Some(i));
        }
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn full_queue_applies_backpressure() {
        let signal = ShutdownSignal::new();
        let queue = Arc::new(BoundedQueue::new(1));
        queue.try_push(1).unwrap();
        assert_eq!(queue.try_push(2), Err(2));

        let producer = tokio::spawn({
            let queue = queue.clone();
            let token = signal.token();
            async move { queue.push(2, &token).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!producer.is_finished());

        assert_eq!(queue.try_pop(), Some(1));
        producer.await.unwrap().unwrap();
        assert_eq!(queue.try_pop(), Some(2));
    }

    #[tokio::test]
    async fn empty_pop_wakes_on_push() {
        let signal = ShutdownSignal::new();
        let queue = Arc::new(BoundedQueue::new(2));
        let consumer = tokio::spawn({
            let queue = queue.clone();
            let token = signal.token();
            async move { queue.pop(&token).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push("m", &signal.token()).await.unwrap();
        assert_eq!(consumer.await.unwrap(), Some("m"));
    }

    #[tokio::test]
    async fn shutdown_releases_blocked_pop() {
        let signal = ShutdownSignal::new();
        let queue: Arc<BoundedQueue<u8>> = Arc::new(BoundedQueue::new(2));
        let consumer = tokio::spawn({
            let queue = queue.clone();
            let token = signal.token();
            async move { queue.pop(&token).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.trigger();
        assert_eq!(consumer.await.unwrap(), None);
    }

    #[tokio::test]
    async fn shutdown_releases_blocked_push() {
        let signal = ShutdownSignal::new();
        let queue = BoundedQueue::new(1);
        queue.try_push(1u8).unwrap();
        signal.trigger();
        assert_eq!(queue.push(2, &signal.token()).await, Err(2));
    }

    #[tokio::test]
    async fn queued_items_survive_shutdown() {
        let signal = ShutdownSignal::new();
        let queue = BoundedQueue::new(2);
        queue.try_push(7u8).unwrap();
        signal.trigger();
        let token = signal.token();
        assert_eq!(queue.pop(&token).await, Some(7));
        assert_eq!(queue.pop(&token).await, None);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let queue: BoundedQueue<u8> = BoundedQueue::new(0);
        assert_eq!(queue.capacity(), 1);
    }
}
