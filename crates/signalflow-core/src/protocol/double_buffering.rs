//! Double Buffering protocol storage.
//!
//! The published value lives in an [`ArcSwap`] front slot. Producers fill a
//! back slot and publish it with a single pointer swap; the retired front slot
//! becomes the next back slot once no reader still holds it, so a producer
//! that publishes at a steady rate stops allocating after the first two
//! values.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;

/// Front/back slot pair. Readers never observe a partially written value.
pub struct DoubleBufferingInstance<T> {
    front: ArcSwap<T>,
    back: Mutex<Option<Arc<T>>>,
    changed: AtomicBool,
}

impl<T: Default> Default for DoubleBufferingInstance<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> DoubleBufferingInstance<T> {
    /// Creates the pair with `initial` published.
    pub fn new(initial: T) -> Self {
        Self {
            front: ArcSwap::from_pointee(initial),
            back: Mutex::new(None),
            changed: AtomicBool::new(false),
        }
    }

    /// The latest published value. Wait-free.
    pub fn data(&self) -> Guard<Arc<T>> {
        self.front.load()
    }

    /// Returns true if a value was published since the last
    /// [`reset_changed`](Self::reset_changed).
    pub fn changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Clears the changed flag.
    pub fn reset_changed(&self) {
        self.changed.store(false, Ordering::Release);
    }

    /// Returns the changed flag and clears it.
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    fn swap_in(&self, back: &mut Option<Arc<T>>, slot: Arc<T>) {
        let retired = self.front.swap(slot);
        *back = Some(retired);
        self.changed.store(true, Ordering::Release);
    }
}

impl<T: Clone> DoubleBufferingInstance<T> {
    /// Publishes `value`.
    pub fn publish(&self, value: T) {
        let mut back = self.back.lock();
        let slot = match back.take() {
            Some(mut recycled) => {
                if let Some(data) = Arc::get_mut(&mut recycled) {
                    *data = value;
                    recycled
                } else {
                    Arc::new(value)
                }
            }
            None => Arc::new(value),
        };
        self.swap_in(&mut back, slot);
    }

    /// Publishes a modified copy of the current value.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut back = self.back.lock();
        let current = self.front.load();
        let mut slot = match back.take() {
            Some(mut recycled) => {
                if let Some(data) = Arc::get_mut(&mut recycled) {
                    data.clone_from(&current);
                    recycled
                } else {
                    Arc::new(T::clone(&current))
                }
            }
            None => Arc::new(T::clone(&current)),
        };
        drop(current);
        f(Arc::make_mut(&mut slot));
        self.swap_in(&mut back, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn initial_value_visible() {
        let buffer = DoubleBufferingInstance::new(5_u32);
        assert_eq!(**buffer.data(), 5);
        assert!(!buffer.changed());
    }

    #[test]
    fn latest_value_wins() {
        let buffer = DoubleBufferingInstance::new(0_u32);
        buffer.publish(1);
        buffer.publish(2);
        buffer.publish(3);
        assert_eq!(**buffer.data(), 3);
    }

    #[test]
    fn changed_flag_lifecycle() {
        let buffer = DoubleBufferingInstance::new(0.0_f32);
        buffer.publish(0.5);
        assert!(buffer.changed());
        assert!(buffer.take_changed());
        assert!(!buffer.changed());
        buffer.publish(0.7);
        buffer.reset_changed();
        assert!(!buffer.changed());
    }

    #[test]
    fn update_starts_from_published_value() {
        let buffer = DoubleBufferingInstance::new(vec![1.0_f32, 2.0]);
        buffer.update(|v| v[1] = 5.0);
        buffer.update(|v| v[0] += 1.0);
        assert_eq!(**buffer.data(), vec![2.0, 5.0]);
    }

    #[test]
    fn retired_slot_is_recycled() {
        let buffer = DoubleBufferingInstance::new(vec![0_u8; 16]);
        buffer.publish(vec![1; 16]);
        buffer.publish(vec![2; 16]);
        let recycled = buffer.back.lock().as_ref().map(Arc::as_ptr);
        buffer.publish(vec![3; 16]);
        assert_eq!(Some(Arc::as_ptr(&buffer.front.load_full())), recycled);
    }

    #[test]
    fn held_reader_keeps_its_snapshot() {
        let buffer = DoubleBufferingInstance::new(1_u64);
        let snapshot = buffer.front.load_full();
        buffer.publish(2);
        buffer.publish(3);
        assert_eq!(*snapshot, 1);
        assert_eq!(**buffer.data(), 3);
    }

    #[test]
    fn concurrent_reader_never_sees_torn_value() {
        let buffer = Arc::new(DoubleBufferingInstance::new([0_u64; 8]));
        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 1..=2000_u64 {
                    buffer.publish([i; 8]);
                }
            })
        };

        let mut last = 0;
        while last < 2000 {
            let value = buffer.data();
            assert!(value.iter().all(|&x| x == value[0]), "torn read: {:?}", &**value);
            assert!(value[0] >= last, "went backwards");
            last = value[0];
        }
        writer.join().unwrap();
    }
}
