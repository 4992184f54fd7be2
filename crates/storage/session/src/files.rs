//! Path operations and open handles
//!
//! Every operation here needs a mounted session. Paths are validated
//! against the geometry's path limit before they reach the engine.

use ramflash_engine::{Engine, EngineError, EntryInfo, OpenFlags};
use ramflash_path as path;
use ramflash_ramdisk::RamDisk;

use crate::config::AncestorPolicy;
use crate::handle::Handle;
use crate::session::{mounted_parts, Session};
use crate::{Error, Result};

/// Open `path` truncated, write all of `data` and close it
fn replace_contents<E: Engine>(engine: &mut E, disk: &mut RamDisk, path: &str, data: &[u8]) -> Result<()> {
    let mut file = engine.file_open(disk, path, OpenFlags::REPLACE)?;
    let written = match engine.file_write(disk, &mut file, data) {
        Ok(n) => n,
        Err(err) => {
            if let Err(close_err) = engine.file_close(disk, file) {
                log::warn!("session: close after failed write to {}: {}", path, close_err);
            }
            return Err(err.into());
        }
    };
    engine.file_close(disk, file)?;

    if written != data.len() {
        log::warn!("session: short write to {} ({} of {} bytes)", path, written, data.len());
        return Err(Error::Engine(EngineError::Io));
    }
    Ok(())
}

/// True for the self and parent entries engines report in listings
fn is_dot_entry(entry: &EntryInfo) -> bool {
    entry.name == "." || entry.name == ".."
}

impl<E: Engine> Session<E> {
    // ========== Path operations ==========

    pub fn mkdir(&mut self, path: &str) -> Result<()> {
        self.require_mounted()?;
        self.check_path(path)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        engine.mkdir(disk, path)?;
        Ok(())
    }

    /// Remove a file or an empty directory
    pub fn remove(&mut self, path: &str) -> Result<()> {
        self.require_mounted()?;
        self.check_path(path)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        engine.remove(disk, path)?;
        Ok(())
    }

    pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<()> {
        self.require_mounted()?;
        self.check_path(old_path)?;
        self.check_path(new_path)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        engine.rename(disk, old_path, new_path)?;
        Ok(())
    }

    pub fn stat(&mut self, path: &str) -> Result<EntryInfo> {
        self.require_mounted()?;
        self.check_path(path)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        Ok(engine.stat(disk, path)?)
    }

    /// Size in bytes of the entry at `path`
    pub fn file_size(&mut self, path: &str) -> Result<u32> {
        self.stat(path).map(|info| info.size)
    }

    /// Create every missing directory above `path`
    ///
    /// What happens to mkdir failures is decided by the session's
    /// [`AncestorPolicy`].
    pub fn create_ancestors(&mut self, path: &str) -> Result<()> {
        self.require_mounted()?;
        self.check_path(path)?;
        let policy = self.config.ancestor_policy;
        let path = path::normalize(path);
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;

        for dir in path::ancestors(&path) {
            match engine.mkdir(disk, dir) {
                Ok(()) | Err(EngineError::Exists) => {}
                Err(err) if policy == AncestorPolicy::SuppressAll => {
                    log::warn!("session: ignoring mkdir {} failure: {}", dir, err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    /// Replace the contents of `path` with `data`, creating parents
    ///
    /// Engines create the entry when it is opened, so a failed write to a
    /// new path removes the empty file again. An existing file keeps its
    /// previous contents.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<()> {
        self.create_ancestors(path)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;

        let is_new = matches!(engine.stat(disk, path), Err(EngineError::NotFound));
        let result = replace_contents(engine, disk, path, data);
        if result.is_err() && is_new {
            match engine.remove(disk, path) {
                Ok(()) | Err(EngineError::NotFound) => {}
                Err(err) => log::warn!("session: removing partial {} failed: {}", path, err),
            }
        }
        result
    }

    /// Read up to `buf.len()` bytes from the start of `path`
    pub fn read_file(&mut self, path: &str, buf: &mut [u8]) -> Result<usize> {
        self.require_mounted()?;
        self.check_path(path)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;

        let mut file = engine.file_open(disk, path, OpenFlags::READ)?;
        let mut total = 0;
        let result = loop {
            if total == buf.len() {
                break Ok(total);
            }
            match engine.file_read(disk, &mut file, &mut buf[total..]) {
                Ok(0) => break Ok(total),
                Ok(n) => total += n,
                Err(err) => break Err(err),
            }
        };

        let closed = engine.file_close(disk, file);
        let total = result?;
        closed?;
        Ok(total)
    }

    // ========== File handles ==========

    /// Open a file and bind it to a handle
    pub fn file_open(&mut self, path: &str, flags: OpenFlags) -> Result<Handle> {
        self.require_mounted()?;
        self.check_path(path)?;
        // Fail before the engine creates anything
        let handle = self.files.allocate()?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        let file = engine.file_open(disk, path, flags)?;
        self.files.bind(handle, file)?;
        Ok(handle)
    }

    pub fn file_read(&mut self, handle: Handle, buf: &mut [u8]) -> Result<usize> {
        self.require_mounted()?;
        let file = self.files.resolve(handle)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        Ok(engine.file_read(disk, file, buf)?)
    }

    pub fn file_write(&mut self, handle: Handle, data: &[u8]) -> Result<usize> {
        self.require_mounted()?;
        let file = self.files.resolve(handle)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        Ok(engine.file_write(disk, file, data)?)
    }

    /// Close a file handle; the slot is freed even if the engine fails
    pub fn file_close(&mut self, handle: Handle) -> Result<()> {
        self.require_mounted()?;
        let file = self.files.release(handle)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        engine.file_close(disk, file)?;
        Ok(())
    }

    // ========== Directory handles ==========

    pub fn dir_open(&mut self, path: &str) -> Result<Handle> {
        self.require_mounted()?;
        self.check_path(path)?;
        let handle = self.dirs.allocate()?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        let dir = engine.dir_open(disk, path)?;
        self.dirs.bind(handle, dir)?;
        Ok(handle)
    }

    /// Next real entry, skipping `.` and `..`; `None` at end of directory
    pub fn dir_read(&mut self, handle: Handle) -> Result<Option<EntryInfo>> {
        self.require_mounted()?;
        let dir = self.dirs.resolve(handle)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        loop {
            match engine.dir_read(disk, dir)? {
                Some(entry) if is_dot_entry(&entry) => continue,
                other => return Ok(other),
            }
        }
    }

    pub fn dir_close(&mut self, handle: Handle) -> Result<()> {
        self.require_mounted()?;
        let dir = self.dirs.release(handle)?;
        let (engine, disk) = mounted_parts(&mut self.engine, &mut self.disk)?;
        engine.dir_close(disk, dir)?;
        Ok(())
    }

    pub fn open_files(&self) -> usize {
        self.files.in_use()
    }

    pub fn open_dirs(&self) -> usize {
        self.dirs.in_use()
    }
}
