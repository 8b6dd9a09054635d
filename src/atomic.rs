//! Lock-free `f64` cell.
//!
//! Parameter values and dial cache fields are read from many worker threads during
//! an evaluation phase and written by a single writer between phases. Storing the
//! IEEE-754 bits in an `AtomicU64` gives data-race-free access without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.bits.load(order))
    }

    pub fn store(&self, value: f64, order: Ordering) {
        self.bits.store(value.to_bits(), order);
    }

    /// Store `value` and return the previous one.
    pub fn swap(&self, value: f64, order: Ordering) -> f64 {
        f64::from_bits(self.bits.swap(value.to_bits(), order))
    }

    /// Atomically replace the value with `f(current)` when `f` returns `Some`.
    pub fn fetch_update<F>(&self, mut f: F) -> f64
    where
        F: FnMut(f64) -> Option<f64>,
    {
        let prev = self.bits.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
            f(f64::from_bits(bits)).map(f64::to_bits)
        });
        match prev {
            Ok(bits) | Err(bits) => f64::from_bits(bits),
        }
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::new(0.0)
    }
}
