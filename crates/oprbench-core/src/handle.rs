//! Operator handle: device plus clock.

use std::sync::Arc;

use crate::device::{Device, DevicePtr, MemoryInfo};
use crate::error::Result;
use crate::timer::{Clock, SystemClock, Timer};

/// Device and stream context carried by every operator.
///
/// Cloning is cheap and shares the same device; the proxy only ever borrows
/// or clones handles, it never owns the device.
#[derive(Debug, Clone)]
pub struct Handle {
    device: Arc<dyn Device>,
    clock: Arc<dyn Clock>,
}

impl Handle {
    /// Create a handle timed by the system clock.
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self::with_clock(device, Arc::new(SystemClock::new()))
    }

    /// Create a handle with an explicit clock.
    pub fn with_clock(device: Arc<dyn Device>, clock: Arc<dyn Clock>) -> Self {
        Self { device, clock }
    }

    /// Underlying device.
    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Clock used for measurements on this handle.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Allocate device memory.
    pub fn malloc(&self, bytes: usize) -> Result<DevicePtr> {
        self.device.malloc(bytes)
    }

    /// Free device memory.
    pub fn free(&self, ptr: DevicePtr) -> Result<()> {
        self.device.free(ptr)
    }

    /// Wait for all issued device work.
    pub fn synchronize(&self) -> Result<()> {
        self.device.synchronize()
    }

    /// Memory usage of the underlying device.
    pub fn memory_info(&self) -> MemoryInfo {
        self.device.memory_info()
    }

    /// A stopped timer on this handle's clock.
    pub fn timer(&self) -> Timer {
        Timer::new(Arc::clone(&self.clock))
    }

    /// Whether both handles drive the same device.
    pub fn same_device(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.device, &other.device)
    }
}
