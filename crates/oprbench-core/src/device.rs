//! Device memory and synchronization primitives.
//!
//! The [`Device`] trait is the only path through which the proxy touches
//! device memory. [`HostDevice`] backs it with the process heap so the whole
//! proxy can run (and be tested) without an accelerator.

use std::alloc::{alloc, dealloc, Layout};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{CoreError, Result};

/// Alignment of every host allocation; also a cache line.
pub const HOST_ALIGNMENT: usize = 64;

/// Opaque device address.
///
/// Only the owning [`Device`] knows how to dereference it. Arithmetic is
/// wrapping so that element-0 pointers of negative-stride layouts, which sit
/// above their allocation base, round-trip exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevicePtr(usize);

impl DevicePtr {
    /// Wrap a raw address.
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// Raw address value.
    pub const fn addr(self) -> usize {
        self.0
    }

    /// Pointer displaced by `bytes` (may be negative).
    #[must_use]
    pub const fn offset(self, bytes: isize) -> Self {
        Self(self.0.wrapping_add_signed(bytes))
    }
}

impl fmt::Display for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Memory usage snapshot of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Bytes currently allocated.
    pub allocated_bytes: usize,
    /// Highest value `allocated_bytes` has reached.
    pub peak_bytes: usize,
    /// Number of allocations not yet freed.
    pub live_allocations: usize,
}

/// A compute device: blocking allocation, free and stream synchronization.
pub trait Device: Send + Sync + fmt::Debug {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Allocate `bytes` of device memory.
    fn malloc(&self, bytes: usize) -> Result<DevicePtr>;

    /// Release memory previously returned by [`Device::malloc`].
    fn free(&self, ptr: DevicePtr) -> Result<()>;

    /// Block until all work issued to the compute stream has retired.
    fn synchronize(&self) -> Result<()>;

    /// Current memory usage.
    fn memory_info(&self) -> MemoryInfo;
}

#[derive(Debug, Default)]
struct HostState {
    live: HashMap<DevicePtr, Layout>,
    allocated_bytes: usize,
    peak_bytes: usize,
}

/// Device backed by the process heap.
#[derive(Debug, Default)]
pub struct HostDevice {
    state: Mutex<HostState>,
}

impl HostDevice {
    /// Create a new host device.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocation_error(&self, bytes: usize, reason: impl Into<String>) -> CoreError {
        CoreError::Allocation {
            device: self.name().to_string(),
            bytes,
            reason: reason.into(),
        }
    }
}

impl Device for HostDevice {
    fn name(&self) -> &str {
        "host"
    }

    fn malloc(&self, bytes: usize) -> Result<DevicePtr> {
        // Zero-byte requests still get a real block so every malloc pairs with a free.
        let layout = Layout::from_size_align(bytes.max(1), HOST_ALIGNMENT)
            .map_err(|e| self.allocation_error(bytes, e.to_string()))?;

        #[allow(unsafe_code)]
        let raw = unsafe { alloc(layout) };
        if raw.is_null() {
            return Err(self.allocation_error(bytes, "heap exhausted"));
        }
        let ptr = DevicePtr::from_addr(raw as usize);

        let mut state = self.state();
        state.live.insert(ptr, layout);
        state.allocated_bytes += layout.size();
        state.peak_bytes = state.peak_bytes.max(state.allocated_bytes);
        drop(state);

        debug!(bytes, %ptr, "host malloc");
        Ok(ptr)
    }

    fn free(&self, ptr: DevicePtr) -> Result<()> {
        let mut state = self.state();
        let layout = state.live.remove(&ptr).ok_or_else(|| CoreError::UnknownPointer {
            device: self.name().to_string(),
            ptr,
        })?;
        state.allocated_bytes -= layout.size();
        drop(state);

        #[allow(unsafe_code)]
        unsafe {
            dealloc(ptr.addr() as *mut u8, layout);
        }

        debug!(bytes = layout.size(), %ptr, "host free");
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        // Host work is issued synchronously; nothing is ever in flight.
        Ok(())
    }

    fn memory_info(&self) -> MemoryInfo {
        let state = self.state();
        MemoryInfo {
            allocated_bytes: state.allocated_bytes,
            peak_bytes: state.peak_bytes,
            live_allocations: state.live.len(),
        }
    }
}

impl Drop for HostDevice {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.live.is_empty() {
            return;
        }
        warn!(
            leaked = state.live.len(),
            bytes = state.allocated_bytes,
            "host device dropped with live allocations"
        );
        for (ptr, layout) in state.live.drain() {
            #[allow(unsafe_code)]
            unsafe {
                dealloc(ptr.addr() as *mut u8, layout);
            }
        }
    }
}
