//! Tensor allocation for a list of layouts.
//!
//! [`alloc_tensors`] backs each layout with a fresh device buffer and returns
//! the set behind an [`Arc`]. The set owns its buffers: when the last
//! reference is dropped every buffer goes back to the device, in order.

use std::ops::Deref;
use std::sync::Arc;

use anyhow::Result;
use oprbench_core::{Handle, TensorLayout, TensorND};
use tracing::{debug, error};

/// Tensors whose device buffers are owned by this value.
#[derive(Debug)]
pub struct DeviceTensors {
    handle: Handle,
    tensors: Vec<TensorND>,
}

impl DeviceTensors {
    /// Allocate one buffer per layout.
    ///
    /// Each buffer spans the layout's full byte range; element 0 is placed
    /// past any bytes reachable through negative strides. If an allocation
    /// fails, buffers already obtained are released before the error is
    /// returned.
    pub fn alloc(handle: &Handle, layouts: &[TensorLayout]) -> Result<Self> {
        let mut owned = Self {
            handle: handle.clone(),
            tensors: Vec::with_capacity(layouts.len()),
        };
        for layout in layouts {
            let base = handle.malloc(layout.span().dist_byte())?;
            owned
                .tensors
                .push(TensorND::from_allocation(base, layout.clone()));
        }
        debug!(count = owned.tensors.len(), "allocated tensor set");
        Ok(owned)
    }

    /// The tensors, in layout order.
    pub fn tensors(&self) -> &[TensorND] {
        &self.tensors
    }

    /// Handle the buffers were allocated on.
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Deref for DeviceTensors {
    type Target = [TensorND];

    fn deref(&self) -> &Self::Target {
        &self.tensors
    }
}

impl Drop for DeviceTensors {
    fn drop(&mut self) {
        for tensor in &self.tensors {
            let base = tensor.allocation_base();
            if let Err(e) = self.handle.free(base) {
                error!(ptr = %base, layout = %tensor.layout, "failed to free tensor buffer: {e}");
            }
        }
    }
}

/// Allocate a shared tensor set for `layouts`.
pub fn alloc_tensors(handle: &Handle, layouts: &[TensorLayout]) -> Result<Arc<DeviceTensors>> {
    DeviceTensors::alloc(handle, layouts).map(Arc::new)
}
