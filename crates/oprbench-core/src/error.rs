use thiserror::Error;

use crate::device::DevicePtr;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the device and layout layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The device could not provide the requested memory.
    #[error("device {device} failed to allocate {bytes} bytes: {reason}")]
    Allocation {
        /// Name of the device that refused the request.
        device: String,
        /// Requested size in bytes.
        bytes: usize,
        /// Device-specific detail.
        reason: String,
    },

    /// A pointer handed to `free` was never allocated here, or was already freed.
    #[error("device {device} has no live allocation at {ptr}")]
    UnknownPointer {
        /// Name of the device.
        device: String,
        /// Offending pointer.
        ptr: DevicePtr,
    },

    /// Waiting for outstanding device work failed.
    #[error("synchronization failed on device {device}: {reason}")]
    Synchronize {
        /// Name of the device.
        device: String,
        /// Device-specific detail.
        reason: String,
    },

    /// Shape and stride metadata do not describe a valid layout.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}
