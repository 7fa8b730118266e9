//! Process-wide admission gate for synthesis calls.
//!
//! One gate bounds how many external synthesis calls run at once across all
//! requests. Waiters suspend until a slot frees; there is no queue limit.

use crate::error::CadenceResult;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

#[derive(Debug)]
struct GateInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Counting gate shared by every request
///
/// Cloning is cheap and every clone refers to the same slots.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots; zero is treated as one
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Total number of slots
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Wait for a slot
    ///
    /// The permit is owned so it can move into the blocking job and free
    /// the slot exactly when that job ends.
    ///
    /// # Errors
    ///
    /// Returns a concurrency error if the gate was closed.
    pub async fn acquire(&self) -> CadenceResult<GatePermit> {
        let permit = Arc::clone(&self.inner.semaphore).acquire_owned().await?;
        Ok(self.admit(permit))
    }

    /// Take a slot only if one is free right now
    #[must_use]
    pub fn try_acquire(&self) -> Option<GatePermit> {
        Arc::clone(&self.inner.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        debug!("Admitted synthesis call ({}/{})", now, self.inner.capacity);
        GatePermit {
            inner: Arc::clone(&self.inner),
            _permit: permit,
        }
    }

    /// Snapshot of gate usage
    #[must_use]
    pub fn stats(&self) -> GateStats {
        GateStats {
            capacity: self.inner.capacity,
            available: self.inner.semaphore.available_permits(),
            in_flight: self.inner.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.inner.peak.load(Ordering::SeqCst),
        }
    }
}

/// Slot held for the duration of one synthesis call
#[derive(Debug)]
pub struct GatePermit {
    inner: Arc<GateInner>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let left = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!("Released synthesis slot ({}/{})", left, self.inner.capacity);
    }
}

/// Gate usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStats {
    /// Total slots
    pub capacity: usize,
    /// Slots free right now
    pub available: usize,
    /// Calls holding a slot
    pub in_flight: usize,
    /// Highest concurrent occupancy seen
    pub peak_in_flight: usize,
}

impl GateStats {
    /// Get the utilization (0.0 to 1.0)
    #[must_use]
    pub fn utilization(&self) -> f32 {
        if self.capacity == 0 {
            0.0
        } else {
            self.in_flight as f32 / self.capacity as f32
        }
    }

    /// Check if every slot is taken
    #[must_use]
    pub const fn is_saturated(&self) -> bool {
        self.available == 0
    }
}

impl std::fmt::Display for GateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Slots: {}/{} ({:.1}% utilization, peak {})",
            self.in_flight,
            self.capacity,
            self.utilization() * 100.0,
            self.peak_in_flight
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_zero_capacity_becomes_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.capacity(), 1);
    }

    #[tokio::test]
    async fn test_permit_release_on_drop() {
        let gate = AdmissionGate::new(2);
        let first = gate.acquire().await.unwrap();
        let _second = gate.acquire().await.unwrap();

        let stats = gate.stats();
        assert!(stats.is_saturated());
        assert_eq!(stats.in_flight, 2);
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert_eq!(gate.stats().available, 1);
        assert!(gate.try_acquire().is_some());
        assert_eq!(gate.stats().peak_in_flight, 2);
    }

    #[test]
    fn test_waiter_suspends_until_release() {
        let gate = AdmissionGate::new(1);
        let held = gate.try_acquire().unwrap();

        let mut waiter = task::spawn(gate.acquire());
        assert_pending!(waiter.poll());

        drop(held);
        assert!(waiter.is_woken());
        let permit = assert_ready!(waiter.poll()).unwrap();
        assert_eq!(gate.stats().in_flight, 1);
        drop(permit);
        assert_eq!(gate.stats().available, 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = GateStats {
            capacity: 4,
            available: 3,
            in_flight: 1,
            peak_in_flight: 2,
        };
        assert_eq!(stats.to_string(), "Slots: 1/4 (25.0% utilization, peak 2)");
    }
}
