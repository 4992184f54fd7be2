//! ramflash littlefs Engine
//!
//! Binds the littlefs C core (through `littlefs2-sys`) to the
//! [`Engine`] trait. Images written here are plain littlefs volumes, so
//! they mount on any littlefs host with the same block size, including
//! ESP-IDF (name_max 64).
//!
//! ## Ownership
//!
//! ```text
//! LittleFs ─┬─ Box<lfs_t> ──────────────┐ lfs->cfg
//!           └─ Box<RawConfig> ◀─────────┘
//!                 ├─ lfs_config (context = device during a call)
//!                 └─ read / prog / lookahead buffers
//! LfsFile  ─┬─ Box<lfs_file_t>  (linked into lfs->mlist while open)
//!           ├─ Box<lfs_file_config>
//!           └─ cache buffer
//! LfsDir   ─── Box<lfs_dir_t>   (linked into lfs->mlist while open)
//! ```
//!
//! Open files and directories must be closed through the engine before it
//! is unmounted; the session layer guarantees this.

#![no_std]

extern crate alloc;

mod config;

use alloc::boxed::Box;
use alloc::ffi::CString;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::ffi::{c_int, CStr};
use core::mem;

use littlefs2_sys as ll;
use ramflash_driver_traits::block::BlockDevice;
use ramflash_engine::{Engine, EngineError, EngineResult, EntryInfo, EntryType, FsInfo, Geometry, OpenFlags};

use config::RawConfig;

pub use config::{is_supported_version, DEFAULT_DISK_VERSION, MIN_BLOCK_COUNT, MIN_BLOCK_SIZE};

/// littlefs entry type tags
const LFS_TYPE_REG: u8 = 0x001;
const LFS_TYPE_DIR: u8 = 0x002;

/// Turn a littlefs return value into a result
fn check(rc: c_int) -> EngineResult<c_int> {
    if rc < 0 {
        Err(EngineError::from_code(rc))
    } else {
        Ok(rc)
    }
}

fn c_path(path: &str) -> EngineResult<CString> {
    CString::new(path).map_err(|_| EngineError::Invalid)
}

fn zeroed_box<T>() -> Box<T> {
    // SAFETY: only used for littlefs C structs, which are valid all-zero
    Box::new(unsafe { mem::zeroed() })
}

fn entry_info(info: &ll::lfs_info) -> EntryInfo {
    // SAFETY: littlefs always NUL-terminates names inside the array
    let name = unsafe { CStr::from_ptr(info.name.as_ptr()) };
    let entry_type = match info.type_ {
        LFS_TYPE_DIR => EntryType::Dir,
        LFS_TYPE_REG => EntryType::File,
        other => {
            log::warn!("littlefs: unexpected entry type {:#x}", other);
            EntryType::File
        }
    };
    EntryInfo {
        name: String::from_utf8_lossy(name.to_bytes()).into_owned(),
        entry_type,
        size: if entry_type == EntryType::Dir { 0 } else { info.size },
    }
}

/// Mounted littlefs volume
pub struct LittleFs {
    lfs: Box<ll::lfs_t>,
    config: Box<RawConfig>,
    geometry: Geometry,
}

/// Open littlefs file
pub struct LfsFile {
    raw: Box<ll::lfs_file_t>,
    _config: Box<ll::lfs_file_config>,
    _cache: Vec<u8>,
    flags: OpenFlags,
}

impl LfsFile {
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }
}

/// Open littlefs directory cursor
pub struct LfsDir {
    raw: Box<ll::lfs_dir_t>,
}

// SAFETY: the raw pointers inside only point into allocations owned by the
// same value (or, for files and directories, by the engine that opened
// them), and every access goes through `&mut self`.
unsafe impl Send for LittleFs {}
unsafe impl Send for LfsFile {}
unsafe impl Send for LfsDir {}

impl LittleFs {
    /// Run one littlefs call with `dev` bound to the callbacks
    fn call(&mut self, dev: &mut dyn BlockDevice, op: impl FnOnce(*mut ll::lfs_t) -> c_int) -> EngineResult<c_int> {
        let lfs: *mut ll::lfs_t = &mut *self.lfs;
        check(self.config.with_device(dev, |_| op(lfs)))
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

impl Engine for LittleFs {
    type File = LfsFile;
    type Dir = LfsDir;

    fn name(&self) -> &'static str {
        "littlefs"
    }

    fn format(dev: &mut dyn BlockDevice, geometry: &Geometry) -> EngineResult<()> {
        let mut config = RawConfig::new(geometry)?;
        let mut lfs = zeroed_box::<ll::lfs_t>();
        let lfs_ptr: *mut ll::lfs_t = &mut *lfs;

        // SAFETY: both structs are boxed and outlive the call
        let rc = config.with_device(dev, |cfg| unsafe { ll::lfs_format(lfs_ptr, cfg) });
        check(rc)?;

        log::debug!(
            "littlefs: formatted {} x {} bytes (disk version {:#x})",
            geometry.block_count,
            geometry.block_size,
            geometry.disk_version
        );
        Ok(())
    }

    fn mount(dev: &mut dyn BlockDevice, geometry: &Geometry) -> EngineResult<Self> {
        let mut config = RawConfig::new(geometry)?;
        let mut lfs = zeroed_box::<ll::lfs_t>();
        let lfs_ptr: *mut ll::lfs_t = &mut *lfs;

        // SAFETY: lfs keeps the config pointer; both stay boxed in `LittleFs`
        let rc = config.with_device(dev, |cfg| unsafe { ll::lfs_mount(lfs_ptr, cfg) });
        check(rc)?;

        log::debug!("littlefs: mounted {} blocks", geometry.block_count);
        Ok(LittleFs {
            lfs,
            config,
            geometry: *geometry,
        })
    }

    fn unmount(mut self, dev: &mut dyn BlockDevice) -> EngineResult<()> {
        // SAFETY: mounted instance
        self.call(dev, |lfs| unsafe { ll::lfs_unmount(lfs) })?;
        Ok(())
    }

    fn stat(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<EntryInfo> {
        let path = c_path(path)?;
        let mut info = zeroed_box::<ll::lfs_info>();
        let info_ptr: *mut ll::lfs_info = &mut *info;
        // SAFETY: path and info outlive the call
        self.call(dev, |lfs| unsafe { ll::lfs_stat(lfs, path.as_ptr(), info_ptr) })?;
        Ok(entry_info(&info))
    }

    fn remove(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<()> {
        let path = c_path(path)?;
        // SAFETY: path outlives the call
        self.call(dev, |lfs| unsafe { ll::lfs_remove(lfs, path.as_ptr()) })?;
        Ok(())
    }

    fn rename(&mut self, dev: &mut dyn BlockDevice, old_path: &str, new_path: &str) -> EngineResult<()> {
        let old_path = c_path(old_path)?;
        let new_path = c_path(new_path)?;
        // SAFETY: both paths outlive the call
        self.call(dev, |lfs| unsafe { ll::lfs_rename(lfs, old_path.as_ptr(), new_path.as_ptr()) })?;
        Ok(())
    }

    fn mkdir(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<()> {
        let path = c_path(path)?;
        // SAFETY: path outlives the call
        self.call(dev, |lfs| unsafe { ll::lfs_mkdir(lfs, path.as_ptr()) })?;
        Ok(())
    }

    fn file_open(&mut self, dev: &mut dyn BlockDevice, path: &str, flags: OpenFlags) -> EngineResult<LfsFile> {
        // littlefs only asserts the access mode
        if !flags.intersects(OpenFlags::READ_WRITE) {
            return Err(EngineError::Invalid);
        }
        let path = c_path(path)?;

        let mut cache = vec![0u8; self.geometry.cache_size as usize];
        let mut config = zeroed_box::<ll::lfs_file_config>();
        config.buffer = cache.as_mut_ptr().cast();
        let mut raw = zeroed_box::<ll::lfs_file_t>();

        let file_ptr: *mut ll::lfs_file_t = &mut *raw;
        let config_ptr: *const ll::lfs_file_config = &*config;
        let raw_flags = flags.bits() as c_int;
        // SAFETY: the file, its config and cache are boxed and move into
        // the returned LfsFile
        self.call(dev, |lfs| unsafe {
            ll::lfs_file_opencfg(lfs, file_ptr, path.as_ptr(), raw_flags, config_ptr)
        })?;

        Ok(LfsFile {
            raw,
            _config: config,
            _cache: cache,
            flags,
        })
    }

    fn file_read(&mut self, dev: &mut dyn BlockDevice, file: &mut LfsFile, buf: &mut [u8]) -> EngineResult<usize> {
        if !file.flags.contains(OpenFlags::READ) {
            return Err(EngineError::BadFile);
        }
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let file_ptr: *mut ll::lfs_file_t = &mut *file.raw;
        let buf_ptr = buf.as_mut_ptr();
        // SAFETY: at most `len` bytes land in `buf`
        let n = self.call(dev, |lfs| unsafe { ll::lfs_file_read(lfs, file_ptr, buf_ptr.cast(), len) })?;
        Ok(n as usize)
    }

    fn file_write(&mut self, dev: &mut dyn BlockDevice, file: &mut LfsFile, data: &[u8]) -> EngineResult<usize> {
        if !file.flags.contains(OpenFlags::WRITE) {
            return Err(EngineError::BadFile);
        }
        let len = u32::try_from(data.len()).map_err(|_| EngineError::FileTooBig)?;
        let file_ptr: *mut ll::lfs_file_t = &mut *file.raw;
        // SAFETY: littlefs reads exactly `len` bytes from `data`
        let n = self.call(dev, |lfs| unsafe { ll::lfs_file_write(lfs, file_ptr, data.as_ptr().cast(), len) })?;
        Ok(n as usize)
    }

    fn file_close(&mut self, dev: &mut dyn BlockDevice, mut file: LfsFile) -> EngineResult<()> {
        let file_ptr: *mut ll::lfs_file_t = &mut *file.raw;
        // SAFETY: unlinks the file from lfs before its boxes are dropped
        self.call(dev, |lfs| unsafe { ll::lfs_file_close(lfs, file_ptr) })?;
        Ok(())
    }

    fn dir_open(&mut self, dev: &mut dyn BlockDevice, path: &str) -> EngineResult<LfsDir> {
        let path = c_path(path)?;
        let mut raw = zeroed_box::<ll::lfs_dir_t>();
        let dir_ptr: *mut ll::lfs_dir_t = &mut *raw;
        // SAFETY: the directory is boxed and moves into the returned LfsDir
        self.call(dev, |lfs| unsafe { ll::lfs_dir_open(lfs, dir_ptr, path.as_ptr()) })?;
        Ok(LfsDir { raw })
    }

    fn dir_read(&mut self, dev: &mut dyn BlockDevice, dir: &mut LfsDir) -> EngineResult<Option<EntryInfo>> {
        let mut info = zeroed_box::<ll::lfs_info>();
        let info_ptr: *mut ll::lfs_info = &mut *info;
        let dir_ptr: *mut ll::lfs_dir_t = &mut *dir.raw;
        // SAFETY: open directory, info outlives the call
        let found = self.call(dev, |lfs| unsafe { ll::lfs_dir_read(lfs, dir_ptr, info_ptr) })?;
        Ok((found > 0).then(|| entry_info(&info)))
    }

    fn dir_close(&mut self, dev: &mut dyn BlockDevice, mut dir: LfsDir) -> EngineResult<()> {
        let dir_ptr: *mut ll::lfs_dir_t = &mut *dir.raw;
        // SAFETY: unlinks the directory from lfs before its box is dropped
        self.call(dev, |lfs| unsafe { ll::lfs_dir_close(lfs, dir_ptr) })?;
        Ok(())
    }

    fn fs_size(&mut self, dev: &mut dyn BlockDevice) -> EngineResult<u32> {
        // SAFETY: mounted instance
        let used = self.call(dev, |lfs| unsafe { ll::lfs_fs_size(lfs) })?;
        Ok(used as u32)
    }

    fn fs_info(&mut self, dev: &mut dyn BlockDevice) -> EngineResult<FsInfo> {
        let mut info = zeroed_box::<ll::lfs_fsinfo>();
        let info_ptr: *mut ll::lfs_fsinfo = &mut *info;
        // SAFETY: mounted instance, info outlives the call
        self.call(dev, |lfs| unsafe { ll::lfs_fs_stat(lfs, info_ptr) })?;
        Ok(FsInfo {
            disk_version: info.disk_version,
            block_size: self.geometry.block_size,
            block_count: self.geometry.block_count,
            name_max: self.geometry.name_max,
        })
    }
}

#[cfg(test)]
mod tests;
