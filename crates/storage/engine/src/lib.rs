//! ramflash Engine Contract
//!
//! The session layer does not know how files and directories are laid out
//! on flash. It drives an engine through the [`Engine`] trait and hands it
//! a block device for every call.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │          Primitive callers           │
//! └──────────────────┬───────────────────┘
//!                    │ init/mount/write_file/...
//! ┌──────────────────▼───────────────────┐
//! │            Session Layer             │
//! │  - Lifecycle state machine           │
//! │  - File / directory handle tables    │
//! │  - Path validation                   │
//! └──────────────────┬───────────────────┘
//!                    │ Engine trait
//! ┌──────────────────▼───────────────────┐
//! │   Engine (littlefs, ...)             │
//! └──────────────────┬───────────────────┘
//!                    │ read/program/erase/sync
//! ┌──────────────────▼───────────────────┐
//! │             RAM disk                 │
//! └──────────────────────────────────────┘
//! ```

#![no_std]

extern crate alloc;

pub mod error;
pub mod file;
pub mod geometry;

pub use error::{EngineError, EngineResult};
pub use file::{EntryInfo, EntryType, FsInfo, OpenFlags};
pub use geometry::*;

use ramflash_driver_traits::block::BlockDevice;

/// Filesystem engine - the on-disk algorithm behind a session
///
/// A mounted engine is a value; unmounting consumes it. Every call gets the
/// block device explicitly, so the engine owns no storage of its own.
/// Errors are reported as [`EngineError`] and passed to callers verbatim.
pub trait Engine: Sized {
    /// Open-file cursor
    type File;
    /// Directory iteration cursor
    type Dir;

    /// Engine name for diagnostics
    fn name(&self) -> &'static str;

    /// Write fresh, empty filesystem metadata
    fn format(dev: &mut dyn BlockDevice, geometry: &Geometry) -> EngineResult<()>;

    /// Load metadata and produce a mounted instance
    fn mount(dev: &mut dyn BlockDevice, geometry: &Geometry) -> EngineResult<Self>;

    /// Flush and release the mounted instance
    fn unmount(self, dev: &mut dyn BlockDevice) -> EngineResult<()>;

    /// Look up a path
    fn stat(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<EntryInfo>;

    /// Remove a file or empty directory
    fn remove(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<()>;

    /// Rename/move a file or directory
    fn rename(&mut self, dev: &mut dyn BlockDevice, old_path: &str, new_path: &str) -> EngineResult<()>;

    /// Create a directory
    fn mkdir(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<()>;

    /// Open a file
    fn file_open(&mut self, dev: &mut dyn BlockDevice, path: &str, flags: OpenFlags) -> EngineResult<Self::File>;

    /// Read from the current position, returning the bytes read (0 at EOF)
    fn file_read(&mut self, dev: &mut dyn BlockDevice, file: &mut Self::File, buf: &mut [u8]) -> EngineResult<usize>;

    /// Write at the current position, returning the bytes accepted
    fn file_write(&mut self, dev: &mut dyn BlockDevice, file: &mut Self::File, data: &[u8]) -> EngineResult<usize>;

    /// Close a file, committing pending data
    fn file_close(&mut self, dev: &mut dyn BlockDevice, file: Self::File) -> EngineResult<()>;

    /// Open a directory for iteration
    fn dir_open(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<Self::Dir>;

    /// Next entry, or `None` at end of directory
    ///
    /// Engines are free to report `.` and `..` entries.
    fn dir_read(&mut self, dev: &mut dyn BlockDevice, dir: &mut Self::Dir) -> EngineResult<Option<EntryInfo>>;

    /// Close a directory cursor
    fn dir_close(&mut self, dev: &mut dyn BlockDevice, dir: Self::Dir) -> EngineResult<()>;

    /// Number of blocks currently in use
    fn fs_size(&mut self, dev: &mut dyn BlockDevice) -> EngineResult<u32>;

    /// Filesystem-level metadata of the mounted volume
    fn fs_info(&mut self, dev: &mut dyn BlockDevice) -> EngineResult<FsInfo>;
}
