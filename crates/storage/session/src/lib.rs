//! ramflash Session Layer
//!
//! Owns the RAM storage buffer, the mounted engine and the tables that
//! turn engine cursors into small integer handles.
//!
//! # Usage
//!
//! ```ignore
//! let mut session: Session<LittleFs> = Session::default();
//! session.initialize(DiskParams::default())?;
//! session.format()?;
//! session.mount()?;
//! session.write_file("/etc/hostname", b"flash")?;
//! let image = session.image();
//! ```
//!
//! Sessions are plain values: several can live side by side, and callers
//! that need a process-wide instance wrap one in a lock.

#![no_std]

extern crate alloc;

pub mod config;
pub mod error;
mod files;
pub mod handle;
pub mod query;
pub mod session;

pub use config::{AncestorPolicy, DiskParams, SessionConfig, DEFAULT_MAX_DIRS, DEFAULT_MAX_FILES};
pub use error::{Error, Result};
pub use handle::{Handle, HandleTable};
pub use query::FsUsage;
pub use session::{Session, SessionState};

pub use ramflash_engine::{EntryInfo, EntryType, FsInfo, OpenFlags};
