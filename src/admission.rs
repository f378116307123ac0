//! Lock-free admission control for the bounded buffer.
//!
//! ## Architecture
//!
//! ```text
//!   put(new key)
//!        │
//!        ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ AdmissionController { occupancy, capacity }  │
//!   │                                              │
//!   │   loop {                                     │
//!   │     cur = occupancy.load()                   │
//!   │     if cur >= capacity → denied              │
//!   │     CAS(cur → cur + 1) → granted / retry     │
//!   │   }                                          │
//!   └──────────────────────────────────────────────┘
//!        │ granted                 │ denied
//!        ▼                         ▼
//!    buffer.insert            delegate.put
//! ```
//!
//! A slot is reserved *before* the entry is written, so no number of racing
//! writers can push the buffer past its capacity. Losers learn immediately
//! that admission failed; nothing blocks or queues.
//!
//! Every granted slot must eventually be handed back with
//! [`release`](AdmissionController::release), either when its entry leaves
//! the buffer or when the reservation turns out to be unnecessary.
//!
//! ## Example Usage
//!
//! ```
//! use spillcache::admission::AdmissionController;
//!
//! let admission = AdmissionController::new(2);
//! assert!(admission.try_admit());
//! assert!(admission.try_admit());
//! assert!(!admission.try_admit());
//!
//! admission.release();
//! assert_eq!(admission.occupancy(), 1);
//! assert!(admission.try_admit());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

/// Atomic occupancy counter bounded by a fixed capacity.
#[derive(Debug)]
pub struct AdmissionController {
    occupancy: AtomicUsize,
    capacity: usize,
}

impl AdmissionController {
    /// Creates a controller with `capacity` slots, all free.
    pub fn new(capacity: usize) -> Self {
        Self {
            occupancy: AtomicUsize::new(0),
            capacity,
        }
    }

    /// Reserves one slot if any is free.
    ///
    /// Returns `true` iff the caller now owns a slot.
    #[inline]
    pub fn try_admit(&self) -> bool {
        let mut current = self.occupancy.load(Ordering::Relaxed);
        loop {
            if current >= self.capacity {
                return false;
            }
            match self.occupancy.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }

    /// Hands one previously granted slot back.
    ///
    /// Releasing more slots than were granted is a logic error. Debug builds
    /// panic; release builds leave the counter at zero.
    #[inline]
    pub fn release(&self) {
        let result = self
            .occupancy
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
        debug_assert!(result.is_ok(), "admission slot released without a grant");
    }

    /// Number of slots currently granted.
    #[inline]
    pub fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Acquire)
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots.
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.occupancy())
    }

    /// Returns `true` when no slot is free.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;

    #[test]
    fn admits_up_to_capacity() {
        let admission = AdmissionController::new(3);
        assert!(admission.try_admit());
        assert!(admission.try_admit());
        assert!(admission.try_admit());
        assert!(!admission.try_admit());
        assert_eq!(admission.occupancy(), 3);
        assert!(admission.is_full());
        assert_eq!(admission.available(), 0);
    }

    #[test]
    fn release_frees_a_slot() {
        let admission = AdmissionController::new(1);
        assert!(admission.try_admit());
        assert!(!admission.try_admit());
        admission.release();
        assert_eq!(admission.occupancy(), 0);
        assert_eq!(admission.available(), 1);
        assert!(admission.try_admit());
    }

    #[test]
    fn zero_capacity_never_admits() {
        let admission = AdmissionController::new(0);
        assert!(!admission.try_admit());
        assert!(admission.is_full());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn release_without_grant_saturates() {
        let admission = AdmissionController::new(2);
        admission.release();
        assert_eq!(admission.occupancy(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "released without a grant")]
    fn release_without_grant_panics_in_debug() {
        let admission = AdmissionController::new(2);
        admission.release();
    }

    #[test]
    fn concurrent_admission_is_exact() {
        let capacity = 50;
        let threads = 200;

        for _ in 0..50 {
            let admission = Arc::new(AdmissionController::new(capacity));
            let granted = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(threads));

            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let admission = Arc::clone(&admission);
                    let granted = Arc::clone(&granted);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        if admission.try_admit() {
                            granted.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(granted.load(Ordering::Relaxed), capacity);
            assert_eq!(admission.occupancy(), capacity);
        }
    }

    #[test]
    fn concurrent_admit_release_balances() {
        let admission = Arc::new(AdmissionController::new(8));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let admission = Arc::clone(&admission);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        if admission.try_admit() {
                            assert!(admission.occupancy() <= admission.capacity());
                            admission.release();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(admission.occupancy(), 0);
    }
}
