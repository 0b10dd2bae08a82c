// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Shared Handle
// ─────────────────────────────────────────────────────────────────────
//! Cloneable, thread-safe handle to one lattice.
//!
//! `propagate` is one critical section: the lock is held for every
//! epoch and the trailing decay. A second caller arriving while a
//! propagation runs (from another thread, or re-entering from a
//! collaborator callback) is rejected with
//! [`PropagationOutcome::AlreadyPropagating`] before it touches the lock.
//!
//! Collaborator callbacks run with the lock held. They may call
//! [`SharedLattice::propagate`] (and be rejected) but must not call any
//! other method on the same handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use lattice_types::{AdaptationReport, PropagationMode, PropagationOutcome};

use crate::lattice::Lattice;

/// Resets the propagation flag when dropped.
struct PropagatingGuard<'a>(&'a AtomicBool);

impl Drop for PropagatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct SharedLattice {
    inner: Arc<Mutex<Lattice>>,
    propagating: Arc<AtomicBool>,
}

impl SharedLattice {
    pub fn new(lattice: Lattice) -> Self {
        Self {
            inner: Arc::new(Mutex::new(lattice)),
            propagating: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Propagate under the lock, or reject if a propagation is running.
    pub fn propagate(&self, steps: usize, mode: PropagationMode) -> PropagationOutcome {
        if self
            .propagating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("shared propagate({steps}, {mode}) rejected: already propagating");
            return PropagationOutcome::AlreadyPropagating;
        }
        let _guard = PropagatingGuard(&self.propagating);
        self.inner.lock().propagate(steps, mode)
    }

    pub fn is_propagating(&self) -> bool {
        self.propagating.load(Ordering::SeqCst)
    }

    pub fn activate(&self, name: &str, amount: f64, source: Option<&str>) -> bool {
        self.inner.lock().activate(name, amount, source)
    }

    pub fn adapt(&self, adaptivity: f64) -> AdaptationReport {
        self.inner.lock().adapt(adaptivity)
    }

    /// Run `f` with shared access.
    pub fn read<R>(&self, f: impl FnOnce(&Lattice) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Run `f` with exclusive access.
    pub fn write<R>(&self, f: impl FnOnce(&mut Lattice) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Recover the lattice if this is the last handle.
    pub fn try_unwrap(self) -> Result<Lattice, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner()),
            Err(inner) => Err(Self {
                inner,
                propagating: self.propagating,
            }),
        }
    }
}

impl From<Lattice> for SharedLattice {
    fn from(lattice: Lattice) -> Self {
        Self::new(lattice)
    }
}
