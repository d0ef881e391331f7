//! oprbench core primitives
//!
//! This crate provides the device-facing building blocks used by the
//! operator proxy in `oprbench-proxy`: element types, tensor layouts and
//! their byte spans, borrowed tensors, the device abstraction with its
//! allocation and synchronization entry points, and timing.
//!
//! ## Architecture
//!
//! - **Types**: element data types and their sizes
//! - **Layout**: shape/stride metadata and span arithmetic (negative strides included)
//! - **Device**: allocate / free / synchronize, plus a host heap implementation
//! - **Tracking**: an allocation-counting device wrapper for leak checks
//! - **Handle**: the device + clock context operators carry
//! - **Timer**: measurement against the handle's clock
//!
//! ## Example
//!
//! ```rust
//! use oprbench_core::{DataType, Handle, HostDevice, TensorLayout};
//! use std::sync::Arc;
//!
//! let handle = Handle::new(Arc::new(HostDevice::new()));
//! let layout = TensorLayout::new(vec![2, 3], DataType::F32);
//! let ptr = handle.malloc(layout.span().dist_byte())?;
//! handle.free(ptr)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod device;
/// Error types for core operations
pub mod error;
pub mod handle;
pub mod layout;
pub mod logging;
pub mod tensor;
pub mod timer;
pub mod tracking;
pub mod types;

pub use device::{Device, DevicePtr, HostDevice, MemoryInfo, HOST_ALIGNMENT};
pub use error::{CoreError, Result};
pub use handle::Handle;
pub use layout::{LayoutSpan, TensorLayout, TensorLayoutArray};
pub use tensor::{layouts_of, TensorND, TensorNDArray};
pub use timer::{Clock, ManualClock, SystemClock, Timer};
pub use tracking::{TrackingDevice, TrackingStats};
pub use types::DataType;
