//! Session lifecycle
//!
//! ```text
//!                 initialize / initialize_from_image
//! Uninitialized ─────────────────────────────────────▶ Unmounted
//!       ▲                                              │  ▲   │ format
//!       │ teardown                              mount  │  │   └──┐
//!       │                                              ▼  │unmount│
//!       └──────────────────────────────────────────── Mounted ◀──┘
//! ```
//!
//! Re-initializing from any state discards the old buffer and every open
//! handle.

use ramflash_driver_traits::block::BlockDevice;
use ramflash_engine::{Engine, Geometry, DISK_VERSION_AUTO};
use ramflash_path as path;
use ramflash_ramdisk::RamDisk;

use crate::config::{DiskParams, SessionConfig};
use crate::handle::HandleTable;
use crate::{Error, Result};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No storage buffer
    Uninitialized,
    /// Storage buffer present, no engine mounted
    Unmounted,
    /// Engine mounted on the storage buffer
    Mounted,
}

/// One filesystem session: a storage buffer, an optional mounted engine
/// and the handle tables for its open cursors.
pub struct Session<E: Engine> {
    pub(crate) config: SessionConfig,
    pub(crate) disk: Option<RamDisk>,
    pub(crate) geometry: Geometry,
    pub(crate) engine: Option<E>,
    pub(crate) files: HandleTable<E::File>,
    pub(crate) dirs: HandleTable<E::Dir>,
    disk_version: u32,
}

/// Split-borrow the mounted engine and its device
pub(crate) fn mounted_parts<'a, E: Engine>(
    engine: &'a mut Option<E>,
    disk: &'a mut Option<RamDisk>,
) -> Result<(&'a mut E, &'a mut RamDisk)> {
    match (engine.as_mut(), disk.as_mut()) {
        (Some(engine), Some(disk)) => Ok((engine, disk)),
        _ => Err(Error::InvalidState),
    }
}

impl<E: Engine> Session<E> {
    /// Create an uninitialized session
    pub fn new(config: SessionConfig) -> Self {
        Session {
            config,
            disk: None,
            geometry: Geometry::default(),
            engine: None,
            files: HandleTable::new(config.max_files),
            dirs: HandleTable::new(config.max_dirs),
            disk_version: DISK_VERSION_AUTO,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match (&self.disk, &self.engine) {
            (None, _) => SessionState::Uninitialized,
            (Some(_), None) => SessionState::Unmounted,
            (Some(_), Some(_)) => SessionState::Mounted,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.state() == SessionState::Mounted
    }

    /// Geometry of the current storage buffer
    pub fn geometry(&self) -> Option<&Geometry> {
        self.disk.as_ref().map(|_| &self.geometry)
    }

    // ========== Storage ==========

    /// Allocate a fresh, fully erased storage buffer
    pub fn initialize(&mut self, params: DiskParams) -> Result<()> {
        self.release_storage();

        let geometry = params.geometry();
        let disk = RamDisk::new(geometry.block_size, geometry.block_count)?;
        self.install(disk, geometry);
        Ok(())
    }

    /// Allocate a storage buffer preloaded with `image`
    ///
    /// Without an explicit block count the image length decides it.
    pub fn initialize_from_image(&mut self, image: &[u8], params: DiskParams) -> Result<()> {
        self.release_storage();

        // Never zero, see DiskParams
        let block_size = params.block_size();
        let block_count = match params.block_count() {
            Some(count) => count,
            None => u32::try_from(image.len() / block_size as usize).map_err(|_| Error::InvalidArgument)?,
        };
        if block_count == 0 {
            return Err(Error::InvalidArgument);
        }

        let disk = RamDisk::from_image(image, block_size, block_count)?;
        self.install(disk, Geometry::new(block_size, block_count, params.lookahead()));
        Ok(())
    }

    fn install(&mut self, disk: RamDisk, geometry: Geometry) {
        log::debug!(
            "session: storage {} x {} bytes (lookahead {})",
            geometry.block_count,
            geometry.block_size,
            geometry.lookahead_size
        );
        self.files = HandleTable::new(self.config.max_files);
        self.dirs = HandleTable::new(self.config.max_dirs);
        self.geometry = geometry;
        self.disk = Some(disk);
    }

    /// Unmount (best effort) and drop the storage buffer
    fn release_storage(&mut self) {
        if let Err(err) = self.unmount() {
            log::warn!("session: unmount before release failed: {}", err);
        }
        self.disk = None;
        self.files = HandleTable::new(self.config.max_files);
        self.dirs = HandleTable::new(self.config.max_dirs);
    }

    /// Unmount if needed and release the storage buffer
    pub fn teardown(&mut self) {
        self.release_storage();
        log::debug!("session: torn down");
    }

    // ========== Mounting ==========

    /// Mount the engine on the storage buffer
    pub fn mount(&mut self) -> Result<()> {
        let disk = self.disk.as_mut().ok_or(Error::InvalidState)?;
        if self.engine.is_some() {
            return Ok(());
        }

        let geometry = self.geometry.with_disk_version(DISK_VERSION_AUTO);
        let engine = E::mount(disk, &geometry)?;
        log::debug!("session: mounted {}", engine.name());
        self.engine = Some(engine);
        Ok(())
    }

    /// Close every open handle and unmount the engine
    ///
    /// The session is unmounted afterwards even when the engine reports an
    /// error; the error is still returned.
    pub fn unmount(&mut self) -> Result<()> {
        let Some(mut engine) = self.engine.take() else {
            return Ok(());
        };
        let disk = self.disk.as_mut().ok_or(Error::InvalidState)?;

        for file in self.files.drain() {
            if let Err(err) = engine.file_close(disk, file) {
                log::warn!("session: closing file on unmount failed: {}", err);
            }
        }
        for dir in self.dirs.drain() {
            if let Err(err) = engine.dir_close(disk, dir) {
                log::warn!("session: closing directory on unmount failed: {}", err);
            }
        }

        engine.unmount(disk)?;
        log::debug!("session: unmounted");
        Ok(())
    }

    /// Write fresh filesystem metadata; the session stays unmounted
    pub fn format(&mut self) -> Result<()> {
        if self.disk.is_none() {
            return Err(Error::InvalidState);
        }
        if let Err(err) = self.unmount() {
            log::warn!("session: unmount before format failed: {}", err);
        }

        let geometry = self.geometry.with_disk_version(self.disk_version);
        let disk = self.disk.as_mut().ok_or(Error::InvalidState)?;
        E::format(disk, &geometry)?;
        log::debug!("session: formatted (disk version {:#x})", self.disk_version);
        Ok(())
    }

    // ========== Disk version policy ==========

    /// Pin the on-disk version used by future `format` calls (0 = default)
    pub fn set_disk_version(&mut self, version: u32) {
        self.disk_version = version;
    }

    pub fn disk_version(&self) -> u32 {
        self.disk_version
    }

    // ========== Helpers ==========

    pub(crate) fn check_path(&self, path: &str) -> Result<()> {
        path::validate(path, self.geometry.max_path())?;
        Ok(())
    }

    pub(crate) fn require_mounted(&self) -> Result<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    /// Raw access to the block device, for tools and diagnostics
    pub fn block_device(&mut self) -> Option<&mut dyn BlockDevice> {
        self.disk.as_mut().map(|disk| disk as &mut dyn BlockDevice)
    }
}

impl<E: Engine> Default for Session<E> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<E: Engine> Drop for Session<E> {
    fn drop(&mut self) {
        if self.engine.is_some() {
            self.teardown();
        }
    }
}
