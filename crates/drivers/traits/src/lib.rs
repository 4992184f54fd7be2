//! Block Device Traits for ramflash
//!
//! This crate defines the interface between a storage medium and the
//! filesystem engine that sits on top of it. Engines only ever see the
//! four flash primitives (read, program, erase, sync); the medium decides
//! how they map onto real memory.

#![no_std]

pub mod block;

pub use block::*;

/// Common error type for block device operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// Address range falls outside the device
    OutOfBounds,
    /// No backing storage is attached
    NoMedium,
    /// Device-specific error
    DeviceError(i32),
}

impl BlockError {
    /// Convert to errno-style error code
    pub fn to_errno(&self) -> i32 {
        match self {
            BlockError::OutOfBounds => -5, // EIO
            BlockError::NoMedium => -5,    // EIO
            BlockError::DeviceError(e) => *e,
        }
    }
}

impl core::fmt::Display for BlockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BlockError::OutOfBounds => f.write_str("block access out of bounds"),
            BlockError::NoMedium => f.write_str("no storage attached"),
            BlockError::DeviceError(e) => write!(f, "device error {}", e),
        }
    }
}

pub type BlockResult<T> = Result<T, BlockError>;
