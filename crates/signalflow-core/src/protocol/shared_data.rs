//! Shared Data protocol storage.

use parking_lot::{Mutex, MutexGuard};

/// A single storage location written and read on the audio thread.
///
/// Ordering between producer and consumer comes from the schedule, so the
/// lock is never contended across threads. It is not reentrant: while a guard
/// from [`data`](Self::data) is alive, any other access to the same slot on the
/// same thread ([`set`](Self::set), [`update`](Self::update),
/// [`get`](Self::get) or a second `data`) deadlocks. Drop the guard first, or
/// use [`try_data`](Self::try_data).
pub struct SharedDataInstance<T> {
    value: Mutex<T>,
}

impl<T: Default> Default for SharedDataInstance<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> SharedDataInstance<T> {
    /// Creates the slot holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    /// Borrows the current value.
    ///
    /// Every other access to this slot blocks until the guard is dropped.
    pub fn data(&self) -> MutexGuard<'_, T> {
        self.value.lock()
    }

    /// Borrows the current value, or returns `None` while a guard from
    /// [`data`](Self::data) is still alive.
    pub fn try_data(&self) -> Option<MutexGuard<'_, T>> {
        self.value.try_lock()
    }

    /// Overwrites the value.
    pub fn set(&self, value: T) {
        *self.value.lock() = value;
    }

    /// Modifies the value in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.value.lock());
    }
}

impl<T: Clone> SharedDataInstance<T> {
    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.value.lock().clone()
    }
}
