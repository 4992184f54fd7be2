//! Usage, metadata and image export

use ramflash_engine::{Engine, FsInfo};

use crate::session::{mounted_parts, Session};
use crate::Result;

/// Block usage of a mounted filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsUsage {
    pub blocks_used: u32,
    pub blocks_total: u32,
}

impl FsUsage {
    pub fn blocks_free(&self) -> u32 {
        self.blocks_total.saturating_sub(self.blocks_used)
    }
}

impl<E: Engine> Session<E> {
    pub fn fs_stat(&mut self) -> Result<FsUsage> {
        self.require_mounted()?;
        let blocks_total = self.geometry.block_count;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        let blocks_used = engine.fs_size(disk)?;
        Ok(FsUsage {
            blocks_used,
            blocks_total,
        })
    }

    /// Metadata of the mounted volume
    pub fn fs_info(&mut self) -> Result<FsInfo> {
        self.require_mounted()?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        Ok(engine.fs_info(disk)?)
    }

    /// On-disk version of the mounted volume
    pub fn fs_version(&mut self) -> Result<u32> {
        self.fs_info().map(|info| info.disk_version)
    }

    /// Raw storage bytes, valid until the next initialize or teardown
    pub fn image(&self) -> Option<&[u8]> {
        self.disk.as_ref().map(|disk| disk.as_bytes())
    }

    /// Storage size in bytes, 0 when uninitialized
    pub fn image_size(&self) -> usize {
        self.disk.as_ref().map_or(0, |disk| disk.len())
    }
}
