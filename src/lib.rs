//! ramflash - RAM-backed flash filesystem
//!
//! Primitive-typed entry points over one process-wide filesystem session.
//! Every call takes the session lock, so callers on any thread see the
//! operations in some serial order.
//!
//! Conventions:
//! - `0` (or a non-negative count/handle) on success, a negative code on
//!   failure. Engine codes are passed through untouched.
//! - Geometry arguments of `0` select the defaults.
//! - Paths are NUL-terminated UTF-8.

use core::ffi::{c_char, CStr};
use core::{ptr, slice};

use spin::Mutex;

use ramflash_engine::{EngineError, OpenFlags};
use ramflash_littlefs::LittleFs;
use ramflash_session::{DiskParams, Error, Handle, Result, Session};

pub use ramflash_session as session;

/// The process-wide session, created on first use
static SESSION: Mutex<Option<Session<LittleFs>>> = Mutex::new(None);

/// Run `op` against the global session and flatten the result to a code
fn with_session<F>(op: F) -> i32
where
    F: FnOnce(&mut Session<LittleFs>) -> Result<i32>,
{
    let mut guard = SESSION.lock();
    let session = guard.get_or_insert_with(Session::default);
    match op(session) {
        Ok(value) => value,
        Err(err) => {
            log::debug!("ramflash: {}", err);
            err.code()
        }
    }
}

fn status(result: Result<()>) -> Result<i32> {
    result.map(|()| 0)
}

fn to_code(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::Engine(EngineError::FileTooBig))
}

fn handle_arg(handle: i32) -> Result<Handle> {
    Handle::try_from(handle).map_err(|_| Error::InvalidHandle)
}

/// Borrow a NUL-terminated path
///
/// # Safety
/// `path` must be null or point to a NUL-terminated string that stays
/// alive for `'a`.
unsafe fn path_arg<'a>(path: *const c_char) -> Result<&'a str> {
    if path.is_null() {
        return Err(Error::InvalidArgument);
    }
    CStr::from_ptr(path).to_str().map_err(|_| Error::InvalidArgument)
}

/// Borrow `len` bytes at `data`
///
/// # Safety
/// Unless `len` is 0, `data` must be valid for reads of `len` bytes.
unsafe fn bytes_arg<'a>(data: *const u8, len: u32) -> Result<&'a [u8]> {
    match (data.is_null(), len) {
        (_, 0) => Ok(&[]),
        (true, _) => Err(Error::InvalidArgument),
        (false, len) => Ok(slice::from_raw_parts(data, len as usize)),
    }
}

/// Borrow `len` writable bytes at `data`
///
/// # Safety
/// Unless `len` is 0, `data` must be valid for writes of `len` bytes.
unsafe fn buf_arg<'a>(data: *mut u8, len: u32) -> Result<&'a mut [u8]> {
    match (data.is_null(), len) {
        (_, 0) => Ok(&mut []),
        (true, _) => Err(Error::InvalidArgument),
        (false, len) => Ok(slice::from_raw_parts_mut(data, len as usize)),
    }
}

/// Store `value` through an optional out pointer
///
/// # Safety
/// `out` must be null or valid for a write of `T`.
unsafe fn put<T>(out: *mut T, value: T) {
    if !out.is_null() {
        out.write(value);
    }
}

// ========== Lifecycle ==========

/// Allocate a fresh erased storage buffer
#[no_mangle]
pub extern "C" fn ramflash_init(block_size: u32, block_count: u32, lookahead: u32) -> i32 {
    with_session(|s| status(s.initialize(DiskParams::from_raw(block_size, block_count, lookahead))))
}

/// Allocate a storage buffer preloaded with an image
///
/// A `block_count` of 0 derives the count from `image_size`.
///
/// # Safety
/// `image` must be valid for reads of `image_size` bytes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_init_from_image(
    image: *const u8,
    image_size: u32,
    block_size: u32,
    block_count: u32,
    lookahead: u32,
) -> i32 {
    with_session(|s| {
        let image = bytes_arg(image, image_size)?;
        status(s.initialize_from_image(image, DiskParams::from_raw(block_size, block_count, lookahead)))
    })
}

#[no_mangle]
pub extern "C" fn ramflash_mount() -> i32 {
    with_session(|s| status(s.mount()))
}

#[no_mangle]
pub extern "C" fn ramflash_unmount() -> i32 {
    with_session(|s| status(s.unmount()))
}

#[no_mangle]
pub extern "C" fn ramflash_format() -> i32 {
    with_session(|s| status(s.format()))
}

/// Unmount and free the storage buffer
///
/// The disk version setting survives; it only changes through
/// `ramflash_set_disk_version`.
#[no_mangle]
pub extern "C" fn ramflash_cleanup() {
    if let Some(session) = SESSION.lock().as_mut() {
        session.teardown();
    }
}

// ========== Disk version ==========

/// Pin the on-disk version for future formats (0 = engine default)
#[no_mangle]
pub extern "C" fn ramflash_set_disk_version(version: u32) {
    let mut guard = SESSION.lock();
    guard.get_or_insert_with(Session::default).set_disk_version(version);
}

#[no_mangle]
pub extern "C" fn ramflash_get_disk_version() -> u32 {
    SESSION.lock().as_ref().map_or(0, |s| s.disk_version())
}

/// Report the on-disk version of the mounted volume
///
/// # Safety
/// `version_out` must be null or valid for a `u32` write.
#[no_mangle]
pub unsafe extern "C" fn ramflash_get_fs_info(version_out: *mut u32) -> i32 {
    with_session(|s| {
        let version = s.fs_version()?;
        put(version_out, version);
        Ok(0)
    })
}

// ========== Paths ==========

/// # Safety
/// `path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ramflash_mkdir(path: *const c_char) -> i32 {
    with_session(|s| status(s.mkdir(path_arg(path)?)))
}

/// # Safety
/// `path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ramflash_remove(path: *const c_char) -> i32 {
    with_session(|s| status(s.remove(path_arg(path)?)))
}

/// # Safety
/// Both paths must be NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn ramflash_rename(old_path: *const c_char, new_path: *const c_char) -> i32 {
    with_session(|s| status(s.rename(path_arg(old_path)?, path_arg(new_path)?)))
}

/// Look up a path; type is 1 for files and 2 for directories
///
/// # Safety
/// `path` must be a NUL-terminated string; the out pointers must be null or
/// valid for writes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_stat(path: *const c_char, out_type: *mut i32, out_size: *mut u32) -> i32 {
    with_session(|s| {
        let info = s.stat(path_arg(path)?)?;
        put(out_type, info.entry_type.as_raw());
        put(out_size, info.size);
        Ok(0)
    })
}

/// # Safety
/// `path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ramflash_file_size(path: *const c_char) -> i32 {
    with_session(|s| to_code(s.file_size(path_arg(path)?)? as usize))
}

/// Replace a file's contents, creating missing parent directories
///
/// # Safety
/// `path` must be a NUL-terminated string and `data` valid for reads of
/// `size` bytes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_write_file(path: *const c_char, data: *const u8, size: u32) -> i32 {
    with_session(|s| status(s.write_file(path_arg(path)?, bytes_arg(data, size)?)))
}

/// Read up to `max_size` bytes from the start of a file
///
/// # Safety
/// `path` must be a NUL-terminated string and `out_data` valid for writes
/// of `max_size` bytes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_read_file(path: *const c_char, out_data: *mut u8, max_size: u32) -> i32 {
    with_session(|s| {
        let path = path_arg(path)?;
        let buf = buf_arg(out_data, max_size)?;
        to_code(s.read_file(path, buf)?)
    })
}

// ========== Directories ==========

/// # Safety
/// `path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ramflash_dir_open(path: *const c_char) -> i32 {
    with_session(|s| to_code(s.dir_open(path_arg(path)?)?))
}

/// Read the next entry: 1 for an entry, 0 at end of directory
///
/// The name is copied NUL-terminated and truncated to `out_name_len`.
///
/// # Safety
/// `out_name` must be valid for writes of `out_name_len` bytes; the other
/// out pointers must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_dir_read(
    handle: i32,
    out_name: *mut c_char,
    out_name_len: i32,
    out_type: *mut i32,
    out_size: *mut u32,
) -> i32 {
    with_session(|s| {
        let Some(entry) = s.dir_read(handle_arg(handle)?)? else {
            return Ok(0);
        };

        let capacity = usize::try_from(out_name_len).unwrap_or(0);
        if !out_name.is_null() && capacity > 0 {
            let name = entry.name.as_bytes();
            let n = name.len().min(capacity - 1);
            ptr::copy_nonoverlapping(name.as_ptr(), out_name.cast::<u8>(), n);
            out_name.add(n).write(0);
        }
        put(out_type, entry.entry_type.as_raw());
        put(out_size, entry.size);
        Ok(1)
    })
}

#[no_mangle]
pub extern "C" fn ramflash_dir_close(handle: i32) -> i32 {
    with_session(|s| status(s.dir_close(handle_arg(handle)?)))
}

// ========== File handles ==========

/// Open a file; `flags` uses the engine's open flag bits
///
/// # Safety
/// `path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ramflash_file_open(path: *const c_char, flags: u32) -> i32 {
    with_session(|s| {
        let flags = OpenFlags::from_bits(flags).ok_or(Error::InvalidArgument)?;
        to_code(s.file_open(path_arg(path)?, flags)?)
    })
}

/// # Safety
/// `out_data` must be valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_file_read(handle: i32, out_data: *mut u8, len: u32) -> i32 {
    with_session(|s| {
        let handle = handle_arg(handle)?;
        to_code(s.file_read(handle, buf_arg(out_data, len)?)?)
    })
}

/// # Safety
/// `data` must be valid for reads of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_file_write(handle: i32, data: *const u8, len: u32) -> i32 {
    with_session(|s| {
        let handle = handle_arg(handle)?;
        to_code(s.file_write(handle, bytes_arg(data, len)?)?)
    })
}

#[no_mangle]
pub extern "C" fn ramflash_file_close(handle: i32) -> i32 {
    with_session(|s| status(s.file_close(handle_arg(handle)?)))
}

// ========== Usage and image ==========

/// # Safety
/// The out pointers must be null or valid for `u32` writes.
#[no_mangle]
pub unsafe extern "C" fn ramflash_fs_stat(out_used: *mut u32, out_total: *mut u32) -> i32 {
    with_session(|s| {
        let usage = s.fs_stat()?;
        put(out_used, usage.blocks_used);
        put(out_total, usage.blocks_total);
        Ok(0)
    })
}

/// Raw storage bytes, or null before initialization
///
/// The pointer is invalidated by the next init or cleanup call.
#[no_mangle]
pub extern "C" fn ramflash_get_image() -> *const u8 {
    SESSION
        .lock()
        .as_ref()
        .and_then(|s| s.image())
        .map_or(ptr::null(), |image| image.as_ptr())
}

#[no_mangle]
pub extern "C" fn ramflash_get_image_size() -> u32 {
    let size = SESSION.lock().as_ref().map_or(0, |s| s.image_size());
    u32::try_from(size).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests;
