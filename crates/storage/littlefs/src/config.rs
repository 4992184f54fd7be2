//! littlefs configuration and block device callbacks
//!
//! littlefs keeps a pointer to its `lfs_config` for as long as it is
//! mounted, and file structures point at their own cache. Everything here
//! therefore lives behind a `Box` or inside a `Vec` that is never resized.
//!
//! The block device is not owned by the engine. Before every littlefs call
//! the caller's device is stored in `context` and cleared again afterwards,
//! so the callbacks only ever see a device that is borrowed for the call.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::ffi::{c_int, c_void};
use core::{mem, ptr, slice};

use littlefs2_sys as ll;
use ramflash_driver_traits::block::BlockDevice;
use ramflash_driver_traits::BlockResult;
use ramflash_engine::{EngineError, EngineResult, Geometry, DISK_VERSION_2_0, DISK_VERSION_2_1, DISK_VERSION_AUTO};

/// Smallest block littlefs can lay metadata out in
pub const MIN_BLOCK_SIZE: u32 = 128;

/// A metadata pair needs two blocks
pub const MIN_BLOCK_COUNT: u32 = 2;

/// Newest on-disk version this build writes
pub const DEFAULT_DISK_VERSION: u32 = DISK_VERSION_2_1;

/// Check a disk version against what littlefs can write
pub fn is_supported_version(version: u32) -> bool {
    matches!(version, DISK_VERSION_AUTO | DISK_VERSION_2_0 | DISK_VERSION_2_1)
}

/// Lookahead buffer size in bytes, rounded up to whole 64-bit words
fn lookahead_bytes(requested: u32) -> u32 {
    requested.max(8).div_ceil(8) * 8
}

fn check_geometry(geometry: &Geometry) -> EngineResult<()> {
    if geometry.block_size < MIN_BLOCK_SIZE || geometry.block_count < MIN_BLOCK_COUNT {
        return Err(EngineError::Invalid);
    }
    if geometry.cache_size == 0 || geometry.block_size % geometry.cache_size != 0 {
        return Err(EngineError::Invalid);
    }
    if !is_supported_version(geometry.disk_version) {
        return Err(EngineError::Invalid);
    }
    Ok(())
}

/// `lfs_config` plus the buffers it points into
pub(crate) struct RawConfig {
    pub(crate) raw: ll::lfs_config,
    _read_buffer: Vec<u8>,
    _prog_buffer: Vec<u8>,
    _lookahead_buffer: Vec<u64>,
}

impl RawConfig {
    pub(crate) fn new(geometry: &Geometry) -> EngineResult<Box<Self>> {
        check_geometry(geometry)?;

        let cache_size = geometry.cache_size;
        let lookahead_size = lookahead_bytes(geometry.lookahead_size);
        let mut read_buffer = vec![0u8; cache_size as usize];
        let mut prog_buffer = vec![0u8; cache_size as usize];
        let mut lookahead_buffer = vec![0u64; lookahead_size as usize / 8];

        // SAFETY: lfs_config is a plain C struct; all-zero is "unset"
        let mut raw: ll::lfs_config = unsafe { mem::zeroed() };
        raw.context = ptr::null_mut();
        raw.read = Some(read_cb);
        raw.prog = Some(prog_cb);
        raw.erase = Some(erase_cb);
        raw.sync = Some(sync_cb);
        raw.read_size = geometry.read_size;
        raw.prog_size = geometry.prog_size;
        raw.block_size = geometry.block_size;
        raw.block_count = geometry.block_count;
        raw.block_cycles = i32::try_from(geometry.erase_cycle_limit).unwrap_or(-1);
        raw.cache_size = cache_size;
        raw.lookahead_size = lookahead_size;
        raw.read_buffer = read_buffer.as_mut_ptr().cast();
        raw.prog_buffer = prog_buffer.as_mut_ptr().cast();
        raw.lookahead_buffer = lookahead_buffer.as_mut_ptr().cast();
        raw.name_max = geometry.name_max;
        raw.disk_version = geometry.disk_version;

        Ok(Box::new(RawConfig {
            raw,
            _read_buffer: read_buffer,
            _prog_buffer: prog_buffer,
            _lookahead_buffer: lookahead_buffer,
        }))
    }

    /// Run `op` with `dev` reachable from the callbacks
    pub(crate) fn with_device<R>(&mut self, dev: &mut dyn BlockDevice, op: impl FnOnce(*const ll::lfs_config) -> R) -> R {
        let mut dev: &mut dyn BlockDevice = dev;
        self.raw.context = (&mut dev as *mut &mut dyn BlockDevice).cast::<c_void>();
        let result = op(&self.raw);
        self.raw.context = ptr::null_mut();
        result
    }
}

// ========== Callbacks ==========

/// Device bound by [`RawConfig::with_device`]
///
/// # Safety
///
/// `c` must be the config littlefs was handed, and the call must happen
/// inside `with_device`.
unsafe fn device<'a>(c: *const ll::lfs_config) -> Option<&'a mut dyn BlockDevice> {
    let slot = (*c).context as *mut &'a mut dyn BlockDevice;
    slot.as_mut().map(|dev| &mut **dev)
}

fn status(result: BlockResult<()>) -> c_int {
    match result {
        Ok(()) => 0,
        Err(err) => EngineError::from(err).code(),
    }
}

unsafe extern "C" fn read_cb(
    c: *const ll::lfs_config,
    block: ll::lfs_block_t,
    off: ll::lfs_off_t,
    buffer: *mut c_void,
    size: ll::lfs_size_t,
) -> c_int {
    let Some(dev) = device(c) else {
        return EngineError::Io.code();
    };
    let buf = slice::from_raw_parts_mut(buffer.cast::<u8>(), size as usize);
    status(dev.read(block, off, buf))
}

unsafe extern "C" fn prog_cb(
    c: *const ll::lfs_config,
    block: ll::lfs_block_t,
    off: ll::lfs_off_t,
    buffer: *const c_void,
    size: ll::lfs_size_t,
) -> c_int {
    let Some(dev) = device(c) else {
        return EngineError::Io.code();
    };
    let data = slice::from_raw_parts(buffer.cast::<u8>(), size as usize);
    status(dev.program(block, off, data))
}

unsafe extern "C" fn erase_cb(c: *const ll::lfs_config, block: ll::lfs_block_t) -> c_int {
    match device(c) {
        Some(dev) => status(dev.erase(block)),
        None => EngineError::Io.code(),
    }
}

unsafe extern "C" fn sync_cb(c: *const ll::lfs_config) -> c_int {
    match device(c) {
        Some(dev) => status(dev.sync()),
        None => EngineError::Io.code(),
    }
}
