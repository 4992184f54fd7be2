//! Engine binding: the fixed configuration handed to an engine

use ramflash_driver_traits::block::BlockGeometry;

pub const DEFAULT_BLOCK_SIZE: u32 = 4096;
pub const DEFAULT_BLOCK_COUNT: u32 = 256; // 1 MiB
pub const DEFAULT_LOOKAHEAD: u32 = 32;
pub const DEFAULT_ERASE_CYCLES: u32 = 500;
pub const DEFAULT_NAME_MAX: u32 = 64;

/// Let the engine pick (format) or detect (mount) the on-disk version
pub const DISK_VERSION_AUTO: u32 = 0;
/// On-disk format revision 2.0
pub const DISK_VERSION_2_0: u32 = 0x0002_0000;
/// On-disk format revision 2.1
pub const DISK_VERSION_2_1: u32 = 0x0002_0001;

/// Major half of a packed disk version
pub const fn disk_version_major(version: u32) -> u16 {
    (version >> 16) as u16
}

/// Minor half of a packed disk version
pub const fn disk_version_minor(version: u32) -> u16 {
    (version & 0xFFFF) as u16
}

/// Device geometry plus engine tuning limits
///
/// Fixed for the lifetime of one storage buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Erase unit in bytes
    pub block_size: u32,
    /// Number of erase units
    pub block_count: u32,
    /// Minimum read granularity
    pub read_size: u32,
    /// Minimum program granularity
    pub prog_size: u32,
    /// Block allocator lookahead buffer in bytes
    pub lookahead_size: u32,
    /// Per-file / metadata cache in bytes
    pub cache_size: u32,
    /// Erase cycles before metadata is relocated
    pub erase_cycle_limit: u32,
    /// Longest accepted entry name
    pub name_max: u32,
    /// Disk version to write on format (0 = engine default)
    pub disk_version: u32,
}

impl Geometry {
    /// Geometry for `block_count` blocks of `block_size` bytes with the
    /// default tuning for everything else.
    pub fn new(block_size: u32, block_count: u32, lookahead_size: u32) -> Self {
        Geometry {
            block_size,
            block_count,
            read_size: 1,
            prog_size: 1,
            lookahead_size,
            cache_size: block_size,
            erase_cycle_limit: DEFAULT_ERASE_CYCLES,
            name_max: DEFAULT_NAME_MAX,
            disk_version: DISK_VERSION_AUTO,
        }
    }

    /// Same geometry with a pinned disk version
    pub fn with_disk_version(mut self, disk_version: u32) -> Self {
        self.disk_version = disk_version;
        self
    }

    /// The part of the geometry a block device cares about
    pub fn block_geometry(&self) -> BlockGeometry {
        BlockGeometry {
            block_size: self.block_size,
            block_count: self.block_count,
        }
    }

    /// Total device size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.block_geometry().size_bytes()
    }

    /// Longest path accepted by the session (including terminator)
    pub fn max_path(&self) -> usize {
        ramflash_path::max_path_for(self.name_max as usize)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE, DEFAULT_BLOCK_COUNT, DEFAULT_LOOKAHEAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let geo = Geometry::default();
        assert_eq!(geo.block_size, 4096);
        assert_eq!(geo.block_count, 256);
        assert_eq!(geo.cache_size, 4096);
        assert_eq!(geo.size_bytes(), 1024 * 1024);
        assert_eq!(geo.max_path(), 256);
        assert_eq!(geo.disk_version, DISK_VERSION_AUTO);
    }

    #[test]
    fn test_disk_version_parts() {
        assert_eq!(disk_version_major(DISK_VERSION_2_1), 2);
        assert_eq!(disk_version_minor(DISK_VERSION_2_1), 1);
        assert_eq!(disk_version_minor(DISK_VERSION_2_0), 0);
    }
}
