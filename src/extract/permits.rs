//! Counting permits that each carry a resource.
//!
//! A [`PermitPool`] owns `n` resources (archive read handles during
//! extraction). [`PermitPool::acquire`] blocks until one is free; the returned
//! [`Permit`] gives exclusive access to it and puts it back when dropped, on
//! every exit path. At most `n` permits are ever out at the same time.

use std::sync::{Condvar, Mutex, MutexGuard};

pub struct PermitPool<T> {
    slots: Vec<Mutex<T>>,
    free: Mutex<Vec<usize>>,
    released: Condvar,
}

impl<T> PermitPool<T> {
    pub fn new(resources: Vec<T>) -> Self {
        let free = (0..resources.len()).rev().collect();
        Self {
            slots: resources.into_iter().map(Mutex::new).collect(),
            free: Mutex::new(free),
            released: Condvar::new(),
        }
    }

    /// Maximum number of simultaneously held permits.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Blocks until a permit is available. On an empty pool this never returns;
    /// check [`capacity`](Self::capacity) first.
    pub fn acquire(&self) -> Permit<'_, T> {
        debug_assert!(!self.slots.is_empty(), "acquire on an empty permit pool");
        let mut free = lock(&self.free);
        loop {
            if let Some(slot) = free.pop() {
                return Permit { pool: self, slot };
            }
            free = match self.released.wait(free) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    fn release(&self, slot: usize) {
        lock(&self.free).push(slot);
        self.released.notify_one();
    }
}

/// Exclusive access to one pooled resource.
pub struct Permit<'a, T> {
    pool: &'a PermitPool<T>,
    slot: usize,
}

impl<T> Permit<'_, T> {
    /// The resource guarded by this permit.
    pub fn resource(&self) -> MutexGuard<'_, T> {
        lock(&self.pool.slots[self.slot])
    }
}

impl<T> Drop for Permit<'_, T> {
    fn drop(&mut self) {
        self.pool.release(self.slot);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
