//! Workspace management.
//!
//! [`WorkspaceWrapper`] owns one contiguous device scratch buffer. It only
//! grows: [`update`](WorkspaceWrapper::update) reallocates when the request
//! exceeds the current capacity and leaves the buffer alone otherwise. The
//! buffer is returned to the device when the wrapper is dropped.

use anyhow::Result;
use oprbench_core::{DevicePtr, Handle};
use tracing::{debug, error};

/// Borrowed view of a workspace: pointer and usable size.
///
/// Valid until the owning wrapper is next updated or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Workspace {
    /// Start of the buffer, `None` when the size is zero.
    pub raw_ptr: Option<DevicePtr>,
    /// Usable size in bytes.
    pub size: usize,
}

impl Workspace {
    /// An empty workspace.
    pub const fn empty() -> Self {
        Self {
            raw_ptr: None,
            size: 0,
        }
    }
}

/// Owner of a grow-only device scratch buffer.
#[derive(Debug, Default)]
pub struct WorkspaceWrapper {
    handle: Option<Handle>,
    raw_ptr: Option<DevicePtr>,
    size: usize,
}

impl WorkspaceWrapper {
    /// A wrapper not yet bound to a device. [`valid`](Self::valid) is false.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Bind to `handle` and allocate `bytes` (nothing for zero).
    pub fn new(handle: &Handle, bytes: usize) -> Result<Self> {
        let mut wrapper = Self {
            handle: Some(handle.clone()),
            raw_ptr: None,
            size: 0,
        };
        wrapper.update(bytes)?;
        Ok(wrapper)
    }

    /// Whether the wrapper is bound to a device.
    pub const fn valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Current capacity in bytes.
    pub const fn capacity(&self) -> usize {
        self.size
    }

    /// Ensure capacity of at least `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is not bound to a device.
    pub fn update(&mut self, bytes: usize) -> Result<()> {
        let Some(handle) = self.handle.as_ref() else {
            panic!("workspace update on a wrapper with no device handle");
        };
        if bytes <= self.size {
            return Ok(());
        }

        if let Some(old) = self.raw_ptr.take() {
            let old_size = std::mem::take(&mut self.size);
            handle.free(old)?;
            debug!(from = old_size, to = bytes, "growing workspace");
        }
        self.raw_ptr = Some(handle.malloc(bytes)?);
        self.size = bytes;
        Ok(())
    }

    /// View of the current buffer.
    pub const fn workspace(&self) -> Workspace {
        Workspace {
            raw_ptr: self.raw_ptr,
            size: self.size,
        }
    }
}

impl Drop for WorkspaceWrapper {
    fn drop(&mut self) {
        if let (Some(handle), Some(ptr)) = (self.handle.as_ref(), self.raw_ptr.take()) {
            if let Err(e) = handle.free(ptr) {
                error!(%ptr, size = self.size, "failed to free workspace: {e}");
            }
        }
    }
}
