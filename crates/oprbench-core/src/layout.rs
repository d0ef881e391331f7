//! Tensor layouts and their memory spans.
//!
//! A layout describes how logical elements map onto a buffer: shape, signed
//! strides (in elements) and element type. Strides may be negative, in which
//! case the lowest reachable address lies *before* the element-0 pointer; the
//! span records that offset so allocators can size and place buffers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::DataType;

/// Ordered list of layouts, one per operand.
pub type TensorLayoutArray = Vec<TensorLayout>;

/// Shape, strides and element type of a tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorLayout {
    /// Extent of each dimension.
    pub shape: Vec<usize>,
    /// Distance between neighbouring elements of each dimension, in elements.
    pub stride: Vec<isize>,
    /// Element type.
    pub dtype: DataType,
}

/// Reachable address range of a layout relative to its element-0 pointer.
///
/// `low_*` values are never positive; `high_*` values are one past the
/// highest reachable element. An empty layout has an all-zero span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutSpan {
    /// Lowest reachable element offset.
    pub low_elem: isize,
    /// Lowest reachable byte offset.
    pub low_byte: isize,
    /// One past the highest reachable element offset.
    pub high_elem: usize,
    /// One past the highest reachable byte offset.
    pub high_byte: usize,
}

impl LayoutSpan {
    /// Number of bytes a buffer must hold to back the layout.
    pub const fn dist_byte(&self) -> usize {
        (self.high_byte as isize - self.low_byte) as usize
    }

    /// Number of element slots between the lowest and highest reachable element.
    pub const fn dist_elem(&self) -> usize {
        (self.high_elem as isize - self.low_elem) as usize
    }
}

impl TensorLayout {
    /// Create a contiguous row-major layout.
    pub fn new(shape: Vec<usize>, dtype: DataType) -> Self {
        let stride = contiguous_strides(&shape);
        Self {
            shape,
            stride,
            dtype,
        }
    }

    /// Create a layout with explicit strides.
    pub fn with_stride(shape: Vec<usize>, stride: Vec<isize>, dtype: DataType) -> Result<Self> {
        if shape.len() != stride.len() {
            return Err(CoreError::InvalidLayout(format!(
                "shape has {} dims but stride has {}",
                shape.len(),
                stride.len()
            )));
        }
        Ok(Self {
            shape,
            stride,
            dtype,
        })
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of logical elements.
    pub fn total_nr_elems(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the layout addresses no element at all.
    pub fn is_empty(&self) -> bool {
        self.shape.iter().any(|&d| d == 0)
    }

    /// Whether strides are the row-major strides of the shape.
    pub fn is_contiguous(&self) -> bool {
        self.stride == contiguous_strides(&self.shape)
    }

    /// Whether two layouts have the same shape, ignoring strides and type.
    pub fn eq_shape(&self, other: &Self) -> bool {
        self.shape == other.shape
    }

    /// Compute the reachable span of this layout.
    pub fn span(&self) -> LayoutSpan {
        if self.is_empty() {
            return LayoutSpan::default();
        }

        let mut low_elem: isize = 0;
        let mut high_elem: isize = 0;
        for (&extent, &stride) in self.shape.iter().zip(&self.stride) {
            let reach = stride * (extent as isize - 1);
            if reach < 0 {
                low_elem += reach;
            } else {
                high_elem += reach;
            }
        }
        let high_elem = (high_elem + 1) as usize;
        let elem_size = self.dtype.size_in_bytes();

        LayoutSpan {
            low_elem,
            low_byte: low_elem * elem_size as isize,
            high_elem,
            high_byte: high_elem * elem_size,
        }
    }
}

impl fmt::Display for TensorLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:?}{:?}}}:{}", self.shape, self.stride, self.dtype)
    }
}

fn contiguous_strides(shape: &[usize]) -> Vec<isize> {
    let mut stride = vec![1isize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        stride[i] = stride[i + 1] * shape[i + 1].max(1) as isize;
    }
    stride
}
