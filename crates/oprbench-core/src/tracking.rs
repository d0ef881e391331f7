//! Allocation-tracking device wrapper.
//!
//! [`TrackingDevice`] forwards to an inner device while counting every
//! malloc, free and synchronization, so tests can assert that no buffer
//! outlives its owner. It can also refuse allocations after a budget of
//! successful ones to exercise error paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::device::{Device, DevicePtr, HostDevice, MemoryInfo};
use crate::error::{CoreError, Result};

/// Counters collected by a [`TrackingDevice`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingStats {
    /// Successful allocations.
    pub malloc_count: usize,
    /// Successful frees.
    pub free_count: usize,
    /// Allocations refused (injected or by the inner device).
    pub failed_mallocs: usize,
    /// Synchronization barriers issued.
    pub sync_count: usize,
    /// Bytes currently outstanding.
    pub outstanding_bytes: usize,
    /// Highest value `outstanding_bytes` has reached.
    pub peak_outstanding_bytes: usize,
    /// Largest single allocation seen.
    pub largest_allocation: usize,
}

#[derive(Debug, Default)]
struct TrackingState {
    stats: TrackingStats,
    outstanding: HashMap<DevicePtr, usize>,
    malloc_budget: Option<usize>,
}

/// Device wrapper that records allocation traffic.
#[derive(Debug)]
pub struct TrackingDevice {
    inner: Arc<dyn Device>,
    state: Mutex<TrackingState>,
}

impl Default for TrackingDevice {
    fn default() -> Self {
        Self::host()
    }
}

impl TrackingDevice {
    /// Track allocations made on `inner`.
    pub fn new(inner: Arc<dyn Device>) -> Self {
        Self {
            inner,
            state: Mutex::new(TrackingState::default()),
        }
    }

    /// Track a fresh [`HostDevice`].
    pub fn host() -> Self {
        Self::new(Arc::new(HostDevice::new()))
    }

    fn state(&self) -> MutexGuard<'_, TrackingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allow `n` more successful allocations, then refuse every request.
    pub fn fail_after(&self, n: usize) {
        self.state().malloc_budget = Some(n);
    }

    /// Remove any allocation budget.
    pub fn clear_failure(&self) {
        self.state().malloc_budget = None;
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> TrackingStats {
        self.state().stats.clone()
    }

    /// Number of allocations not yet freed.
    pub fn outstanding(&self) -> usize {
        self.state().outstanding.len()
    }

    /// Sizes of the allocations not yet freed, largest first.
    pub fn outstanding_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.state().outstanding.values().copied().collect();
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }
}

impl Device for TrackingDevice {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn malloc(&self, bytes: usize) -> Result<DevicePtr> {
        {
            let mut state = self.state();
            let budget = state.malloc_budget;
            match budget {
                Some(0) => {
                    state.stats.failed_mallocs += 1;
                    return Err(CoreError::Allocation {
                        device: self.inner.name().to_string(),
                        bytes,
                        reason: "allocation budget exhausted".to_string(),
                    });
                }
                Some(left) => state.malloc_budget = Some(left - 1),
                None => {}
            }
        }

        let ptr = match self.inner.malloc(bytes) {
            Ok(ptr) => ptr,
            Err(e) => {
                self.state().stats.failed_mallocs += 1;
                return Err(e);
            }
        };

        let mut state = self.state();
        state.outstanding.insert(ptr, bytes);
        let stats = &mut state.stats;
        stats.malloc_count += 1;
        stats.outstanding_bytes += bytes;
        stats.peak_outstanding_bytes = stats.peak_outstanding_bytes.max(stats.outstanding_bytes);
        stats.largest_allocation = stats.largest_allocation.max(bytes);
        Ok(ptr)
    }

    fn free(&self, ptr: DevicePtr) -> Result<()> {
        let bytes = self
            .state()
            .outstanding
            .remove(&ptr)
            .ok_or_else(|| CoreError::UnknownPointer {
                device: self.inner.name().to_string(),
                ptr,
            })?;
        self.inner.free(ptr)?;

        let mut state = self.state();
        state.stats.free_count += 1;
        state.stats.outstanding_bytes -= bytes;
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.state().stats.sync_count += 1;
        debug!(device = self.inner.name(), "synchronize");
        self.inner.synchronize()
    }

    fn memory_info(&self) -> MemoryInfo {
        self.inner.memory_info()
    }
}
