//! Message Queue protocol storage.

use std::collections::VecDeque;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

/// Unbounded FIFO shared by one or more producers and one consumer.
///
/// Every enqueued value is delivered exactly once, in enqueue order. The mutex
/// is held only for the duration of a single queue operation.
pub struct MessageQueueInstance<T> {
    queue: Mutex<VecDeque<T>>,
    fallback: T,
}

impl<T: Default> Default for MessageQueueInstance<T> {
    fn default() -> Self {
        Self::with_fallback(T::default())
    }
}

impl<T> MessageQueueInstance<T> {
    /// Creates an empty queue. `fallback` is what [`with_front`](Self::with_front)
    /// shows while the queue is empty.
    pub fn with_fallback(fallback: T) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
        }
    }

    /// Appends a value.
    pub fn enqueue(&self, value: T) {
        self.queue.lock().push_back(value);
    }

    /// Returns true if no values are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Number of pending values.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Borrows the oldest pending value without removing it.
    ///
    /// The queue stays locked while the guard lives; drop it before enqueueing
    /// from the same thread.
    pub fn front(&self) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.queue.lock(), VecDeque::front_mut).ok()
    }

    /// Visits the oldest pending value, or the configured default when empty.
    pub fn with_front<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let queue = self.queue.lock();
        f(queue.front().unwrap_or(&self.fallback))
    }

    /// Removes and returns the oldest pending value.
    pub fn pop(&self) -> Option<T> {
        self.queue.lock().pop_front()
    }

    /// Discards every pending value.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    /// Removes every pending value in order, handing each to `f`.
    ///
    /// Does not allocate. Returns the number of values drained.
    pub fn drain_with(&self, mut f: impl FnMut(T)) -> usize {
        let mut queue = self.queue.lock();
        let count = queue.len();
        for value in queue.drain(..) {
            f(value);
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order() {
        let queue = MessageQueueInstance::<u32>::default();
        assert!(queue.is_empty());
        for v in [1, 2, 3] {
            queue.enqueue(v);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(*queue.front().unwrap(), 1);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.pop(), None);
        assert!(queue.front().is_none());
    }

    #[test]
    fn with_front_falls_back_when_empty() {
        let queue = MessageQueueInstance::with_fallback(-1);
        assert_eq!(queue.with_front(|v| *v), -1);
        queue.enqueue(9);
        assert_eq!(queue.with_front(|v| *v), 9);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn front_can_modify_in_place() {
        let queue = MessageQueueInstance::<i32>::default();
        queue.enqueue(1);
        if let Some(mut front) = queue.front() {
            *front += 10;
        }
        assert_eq!(queue.pop(), Some(11));
    }

    #[test]
    fn drain_and_clear() {
        let queue = MessageQueueInstance::<u8>::default();
        for v in 0..5 {
            queue.enqueue(v);
        }
        let mut seen = Vec::new();
        assert_eq!(queue.drain_with(|v| seen.push(v)), 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());

        queue.enqueue(7);
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_producer_loses_nothing() {
        let queue = Arc::new(MessageQueueInstance::<usize>::default());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..1000 {
                    queue.enqueue(i);
                }
            })
        };

        let mut received = Vec::with_capacity(1000);
        while received.len() < 1000 {
            while let Some(v) = queue.pop() {
                received.push(v);
            }
            thread::yield_now();
        }
        producer.join().unwrap();
        assert_eq!(received, (0..1000).collect::<Vec<_>>());
    }
}
