//! Block Device Trait
//!
//! Implemented by storage media (RAM disk, file-backed images, ...)
//! Used by filesystem engines (littlefs bindings, ...)

use crate::{BlockError, BlockResult};

/// Byte value a NOR flash cell reads back as after erase (all bits set)
pub const ERASED_BYTE: u8 = 0xFF;

/// Block device geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    /// Erase unit size in bytes
    pub block_size: u32,
    /// Total number of erase units
    pub block_count: u32,
}

impl BlockGeometry {
    /// Total device size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.block_size as u64 * self.block_count as u64
    }

    /// Byte address of `offset` inside `block`, checked against the device
    /// extent for an access of `len` bytes.
    pub fn address(&self, block: u32, offset: u32, len: usize) -> BlockResult<usize> {
        let addr = block as u64 * self.block_size as u64 + offset as u64;
        let end = addr.checked_add(len as u64).ok_or(BlockError::OutOfBounds)?;
        if end > self.size_bytes() {
            return Err(BlockError::OutOfBounds);
        }
        Ok(addr as usize)
    }
}

/// Flash-style block device interface
pub trait BlockDevice {
    /// Get device geometry
    fn geometry(&self) -> BlockGeometry;

    /// Read `buf.len()` bytes starting at `offset` inside `block`
    fn read(&mut self, block: u32, offset: u32, buf: &mut [u8]) -> BlockResult<()>;

    /// Program `data` starting at `offset` inside `block`
    ///
    /// Flash semantics expect the target range to have been erased first;
    /// the device itself does not enforce it.
    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> BlockResult<()>;

    /// Erase a whole block back to [`ERASED_BYTE`]
    fn erase(&mut self, block: u32) -> BlockResult<()>;

    /// Flush any cached writes to the device
    fn sync(&mut self) -> BlockResult<()> {
        Ok(()) // Default: no caching
    }
}

/// Convenience methods for BlockDevice
pub trait BlockDeviceExt: BlockDevice {
    /// Get block size
    fn block_size(&self) -> u32 {
        self.geometry().block_size
    }

    /// Get total blocks
    fn block_count(&self) -> u32 {
        self.geometry().block_count
    }

    /// Get total device size in bytes
    fn size_bytes(&self) -> u64 {
        self.geometry().size_bytes()
    }

    /// Erase `count` consecutive blocks starting at `first`
    fn erase_range(&mut self, first: u32, count: u32) -> BlockResult<()> {
        for block in first..first.saturating_add(count) {
            self.erase(block)?;
        }
        Ok(())
    }

    /// Program a byte stream that may span several consecutive blocks
    fn program_span(&mut self, first: u32, data: &[u8]) -> BlockResult<()> {
        let block_size = self.block_size() as usize;
        if block_size == 0 {
            return Err(BlockError::OutOfBounds);
        }
        for (i, chunk) in data.chunks(block_size).enumerate() {
            let block = first.checked_add(i as u32).ok_or(BlockError::OutOfBounds)?;
            self.program(block, 0, chunk)?;
        }
        Ok(())
    }

    /// Read a byte stream that may span several consecutive blocks
    fn read_span(&mut self, first: u32, buf: &mut [u8]) -> BlockResult<()> {
        let block_size = self.block_size() as usize;
        if block_size == 0 {
            return Err(BlockError::OutOfBounds);
        }
        for (i, chunk) in buf.chunks_mut(block_size).enumerate() {
            let block = first.checked_add(i as u32).ok_or(BlockError::OutOfBounds)?;
            self.read(block, 0, chunk)?;
        }
        Ok(())
    }
}

// Auto-implement BlockDeviceExt for all BlockDevice implementors
impl<T: BlockDevice + ?Sized> BlockDeviceExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_in_range() {
        let geo = BlockGeometry { block_size: 512, block_count: 4 };
        assert_eq!(geo.size_bytes(), 2048);
        assert_eq!(geo.address(0, 0, 512), Ok(0));
        assert_eq!(geo.address(3, 0, 512), Ok(1536));
        assert_eq!(geo.address(1, 100, 10), Ok(612));
    }

    #[test]
    fn test_address_out_of_range() {
        let geo = BlockGeometry { block_size: 512, block_count: 4 };
        assert_eq!(geo.address(4, 0, 1), Err(BlockError::OutOfBounds));
        assert_eq!(geo.address(3, 1, 512), Err(BlockError::OutOfBounds));
        assert_eq!(geo.address(u32::MAX, u32::MAX, usize::MAX), Err(BlockError::OutOfBounds));
    }

    #[test]
    fn test_zero_length_at_end() {
        let geo = BlockGeometry { block_size: 16, block_count: 2 };
        // An empty access exactly at the end of the device is still in range
        assert_eq!(geo.address(2, 0, 0), Ok(32));
    }
}
