//! Borrowed tensors: a device address plus a layout.

use crate::device::DevicePtr;
use crate::layout::TensorLayout;

/// Ordered list of tensors, one per operand.
pub type TensorNDArray = Vec<TensorND>;

/// A view of device memory through a layout.
///
/// The memory is owned elsewhere. `raw_ptr` addresses logical element 0;
/// for negative-stride layouts the backing allocation begins at
/// `raw_ptr + layout.span().low_byte`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorND {
    /// Address of logical element 0.
    pub raw_ptr: DevicePtr,
    /// How elements are addressed.
    pub layout: TensorLayout,
}

impl TensorND {
    /// Create a tensor view.
    pub const fn new(raw_ptr: DevicePtr, layout: TensorLayout) -> Self {
        Self { raw_ptr, layout }
    }

    /// View over an allocation starting at `base`, placing element 0 so the
    /// whole span fits.
    pub fn from_allocation(base: DevicePtr, layout: TensorLayout) -> Self {
        let raw_ptr = base.offset(-layout.span().low_byte);
        Self { raw_ptr, layout }
    }

    /// Start of the backing allocation.
    pub fn allocation_base(&self) -> DevicePtr {
        self.raw_ptr.offset(self.layout.span().low_byte)
    }
}

/// Layouts of a tensor list, in order.
pub fn layouts_of(tensors: &[TensorND]) -> Vec<TensorLayout> {
    tensors.iter().map(|t| t.layout.clone()).collect()
}
