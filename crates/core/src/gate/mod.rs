//! Process-wide bound on concurrent image generation calls.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::metrics::GATE_WAIT_DURATION;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Concurrency gate is closed")]
    Closed,
}

/// Snapshot of gate usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStatus {
    pub capacity: usize,
    pub active: usize,
    pub waiting: usize,
    pub total_admitted: u64,
    pub peak_active: usize,
}

#[derive(Debug, Default)]
struct GateStats {
    active: AtomicU64,
    waiting: AtomicU64,
    total_admitted: AtomicU64,
    peak_active: AtomicU64,
}

/// Counting gate backed by a tokio semaphore.
///
/// Cloning shares the same slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    stats: Arc<GateStats>,
    capacity: usize,
}

/// Held while a slot is in use. Dropping it frees the slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    stats: Arc<GateStats>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keeps `waiting` accurate when an acquire future is dropped early.
struct WaitingGuard<'a>(&'a GateStats);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ConcurrencyGate {
    /// `capacity` of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            stats: Arc::new(GateStats::default()),
            capacity,
        }
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let start = Instant::now();
        self.stats.waiting.fetch_add(1, Ordering::SeqCst);
        let permit = {
            let _waiting = WaitingGuard(&self.stats);
            Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| GateError::Closed)?
        };

        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_active.fetch_max(active, Ordering::SeqCst);
        self.stats.total_admitted.fetch_add(1, Ordering::SeqCst);

        let waited = start.elapsed();
        GATE_WAIT_DURATION.observe(waited.as_secs_f64());
        debug!(active, waited_ms = waited.as_millis() as u64, "Gate permit acquired");

        Ok(GatePermit {
            _permit: permit,
            stats: Arc::clone(&self.stats),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn status(&self) -> GateStatus {
        GateStatus {
            capacity: self.capacity,
            active: self.stats.active.load(Ordering::SeqCst) as usize,
            waiting: self.stats.waiting.load(Ordering::SeqCst) as usize,
            total_admitted: self.stats.total_admitted.load(Ordering::SeqCst),
            peak_active: self.stats.peak_active.load(Ordering::SeqCst) as usize,
        }
    }

    /// Stop admitting. Pending and future acquires fail with [`GateError::Closed`].
    pub fn close(&self) {
        self.semaphore.close();
    }
}
