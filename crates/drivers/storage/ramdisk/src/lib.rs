//! ramflash RAM Disk
//!
//! Emulates a NOR flash part in a flat heap buffer and implements the
//! BlockDevice trait on top of it.
//!
//! # Usage
//!
//! ```rust
//! use ramflash_ramdisk::RamDisk;
//! use ramflash_driver_traits::block::BlockDevice;
//!
//! let mut disk = RamDisk::new(512, 8).unwrap();
//! disk.program(1, 0, b"hello").unwrap();
//!
//! let mut buffer = [0u8; 5];
//! disk.read(1, 0, &mut buffer).unwrap();
//! assert_eq!(&buffer, b"hello");
//! ```

#![no_std]

extern crate alloc;

use alloc::vec::Vec;
use ramflash_driver_traits::block::{BlockDevice, BlockGeometry, ERASED_BYTE};
use ramflash_driver_traits::{BlockError, BlockResult};

/// Errors raised while creating the backing buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamDiskError {
    /// Zero-sized geometry, or a size that does not fit in memory
    InvalidGeometry,
    /// The allocator refused the buffer
    OutOfMemory,
}

impl core::fmt::Display for RamDiskError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RamDiskError::InvalidGeometry => f.write_str("invalid disk geometry"),
            RamDiskError::OutOfMemory => f.write_str("out of memory for disk buffer"),
        }
    }
}

/// RAM-backed flash device
///
/// The buffer is always exactly `block_size * block_count` bytes and is
/// never resized; a new geometry means a new `RamDisk`.
pub struct RamDisk {
    storage: Vec<u8>,
    geometry: BlockGeometry,
}

impl RamDisk {
    /// Create a fully erased device
    pub fn new(block_size: u32, block_count: u32) -> Result<Self, RamDiskError> {
        let geometry = BlockGeometry { block_size, block_count };
        let size = checked_size(&geometry)?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(size)
            .map_err(|_| RamDiskError::OutOfMemory)?;
        storage.resize(size, ERASED_BYTE);

        log::debug!("ramdisk: {} blocks x {} bytes", block_count, block_size);
        Ok(RamDisk { storage, geometry })
    }

    /// Create a device preloaded with `image`
    ///
    /// At most `block_size * block_count` bytes are copied; anything the
    /// image does not cover reads back as erased flash.
    pub fn from_image(image: &[u8], block_size: u32, block_count: u32) -> Result<Self, RamDiskError> {
        let mut disk = Self::new(block_size, block_count)?;
        let copy = image.len().min(disk.storage.len());
        disk.storage[..copy].copy_from_slice(&image[..copy]);

        if copy < image.len() {
            log::warn!("ramdisk: image truncated from {} to {} bytes", image.len(), copy);
        }
        Ok(disk)
    }

    /// Raw view of the whole device
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage
    }

    /// Device size in bytes
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

fn checked_size(geometry: &BlockGeometry) -> Result<usize, RamDiskError> {
    let size = geometry.size_bytes();
    if size == 0 {
        return Err(RamDiskError::InvalidGeometry);
    }
    usize::try_from(size).map_err(|_| RamDiskError::InvalidGeometry)
}

impl BlockDevice for RamDisk {
    fn geometry(&self) -> BlockGeometry {
        self.geometry
    }

    fn read(&mut self, block: u32, offset: u32, buf: &mut [u8]) -> BlockResult<()> {
        if self.storage.is_empty() {
            return Err(BlockError::NoMedium);
        }
        let addr = self.geometry.address(block, offset, buf.len())?;
        buf.copy_from_slice(&self.storage[addr..addr + buf.len()]);
        Ok(())
    }

    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> BlockResult<()> {
        if self.storage.is_empty() {
            return Err(BlockError::NoMedium);
        }
        let addr = self.geometry.address(block, offset, data.len())?;
        self.storage[addr..addr + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn erase(&mut self, block: u32) -> BlockResult<()> {
        if self.storage.is_empty() {
            return Err(BlockError::NoMedium);
        }
        let len = self.geometry.block_size as usize;
        let addr = self.geometry.address(block, 0, len)?;
        self.storage[addr..addr + len].fill(ERASED_BYTE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_new_is_erased() {
        let disk = RamDisk::new(256, 16).unwrap();
        assert_eq!(disk.len(), 256 * 16);
        assert!(disk.as_bytes().iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn test_zero_geometry_rejected() {
        assert_eq!(RamDisk::new(0, 16).err(), Some(RamDiskError::InvalidGeometry));
        assert_eq!(RamDisk::new(256, 0).err(), Some(RamDiskError::InvalidGeometry));
    }

    #[test]
    fn test_program_then_read() {
        let mut disk = RamDisk::new(64, 4).unwrap();
        disk.program(2, 10, b"flash").unwrap();

        let mut buf = [0u8; 5];
        disk.read(2, 10, &mut buf).unwrap();
        assert_eq!(&buf, b"flash");
        assert_eq!(&disk.as_bytes()[2 * 64 + 10..2 * 64 + 15], b"flash");
    }

    #[test]
    fn test_erase_restores_idle_value() {
        let mut disk = RamDisk::new(64, 4).unwrap();
        disk.program(1, 0, &[0u8; 64]).unwrap();
        disk.erase(1).unwrap();

        let mut buf = [0u8; 64];
        disk.read(1, 0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn test_erase_leaves_neighbours() {
        let mut disk = RamDisk::new(32, 3).unwrap();
        disk.program(0, 0, &[0x11; 32]).unwrap();
        disk.program(1, 0, &[0x22; 32]).unwrap();
        disk.program(2, 0, &[0x33; 32]).unwrap();
        disk.erase(1).unwrap();

        let bytes = disk.as_bytes();
        assert!(bytes[..32].iter().all(|&b| b == 0x11));
        assert!(bytes[32..64].iter().all(|&b| b == ERASED_BYTE));
        assert!(bytes[64..].iter().all(|&b| b == 0x33));
    }

    #[test]
    fn test_bounds_checked() {
        let mut disk = RamDisk::new(64, 4).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(disk.read(4, 0, &mut buf), Err(BlockError::OutOfBounds));
        assert_eq!(disk.read(3, 60, &mut buf), Err(BlockError::OutOfBounds));
        assert_eq!(disk.program(3, 57, &buf), Err(BlockError::OutOfBounds));
        assert_eq!(disk.erase(4), Err(BlockError::OutOfBounds));
        // Exactly up to the end is fine
        assert_eq!(disk.read(3, 56, &mut buf), Ok(()));
    }

    #[test]
    fn test_from_short_image_pads() {
        let image = vec![0xABu8; 100];
        let disk = RamDisk::from_image(&image, 64, 4).unwrap();
        assert_eq!(disk.len(), 256);
        assert!(disk.as_bytes()[..100].iter().all(|&b| b == 0xAB));
        assert!(disk.as_bytes()[100..].iter().all(|&b| b == ERASED_BYTE));
    }

    #[test]
    fn test_from_long_image_truncates() {
        let image: Vec<u8> = (0..=255u8).cycle().take(300).collect();
        let disk = RamDisk::from_image(&image, 64, 2).unwrap();
        assert_eq!(disk.as_bytes(), &image[..128]);
    }

    #[test]
    fn test_sync_is_noop() {
        let mut disk = RamDisk::new(64, 2).unwrap();
        let before = disk.as_bytes().to_vec();
        disk.sync().unwrap();
        assert_eq!(disk.as_bytes(), &before[..]);
    }
}
