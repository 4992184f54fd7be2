//! Entry metadata and open flags

use alloc::string::String;
use bitflags::bitflags;

/// Entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Regular file
    File,
    /// Directory
    Dir,
}

impl EntryType {
    /// Numeric tag used across primitive-typed boundaries (1 = file, 2 = dir)
    pub fn as_raw(&self) -> i32 {
        match self {
            EntryType::File => 1,
            EntryType::Dir => 2,
        }
    }
}

/// Information about one directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Entry name (last path component)
    pub name: String,
    /// Entry type
    pub entry_type: EntryType,
    /// Size in bytes (0 for directories)
    pub size: u32,
}

impl EntryInfo {
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Dir
    }
}

bitflags! {
    /// File open flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Open for reading
        const READ = 0x0001;
        /// Open for writing
        const WRITE = 0x0002;
        /// Create the file if it does not exist
        const CREATE = 0x0100;
        /// Fail if the file already exists (with CREATE)
        const EXCL = 0x0200;
        /// Truncate to zero length on open
        const TRUNC = 0x0400;
        /// Every write goes to the end of the file
        const APPEND = 0x0800;
    }
}

impl OpenFlags {
    /// Read-write access
    pub const READ_WRITE: OpenFlags = OpenFlags::READ.union(OpenFlags::WRITE);

    /// Write-only, create or truncate
    pub const REPLACE: OpenFlags = OpenFlags::WRITE
        .union(OpenFlags::CREATE)
        .union(OpenFlags::TRUNC);
}

/// Filesystem-level metadata of a mounted volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsInfo {
    /// On-disk format version of the mounted volume
    pub disk_version: u32,
    /// Block size recorded on disk
    pub block_size: u32,
    /// Block count recorded on disk
    pub block_count: u32,
    /// Longest accepted entry name
    pub name_max: u32,
}
