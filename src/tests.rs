//! Tests for the exported entry points
//!
//! They all share the global session, so each test holds `serial()`.

use super::*;
use std::ffi::CString;
use std::sync::{Mutex as StdMutex, MutexGuard};

static SERIAL: StdMutex<()> = StdMutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    ramflash_cleanup();
    ramflash_set_disk_version(0);
    guard
}

fn c(path: &str) -> CString {
    CString::new(path).unwrap()
}

fn fresh_volume() {
    assert_eq!(ramflash_init(512, 32, 0), 0);
    assert_eq!(ramflash_format(), 0);
    assert_eq!(ramflash_mount(), 0);
}

fn write(path: &str, data: &[u8]) -> i32 {
    unsafe { ramflash_write_file(c(path).as_ptr(), data.as_ptr(), data.len() as u32) }
}

fn read(path: &str, max: usize) -> std::result::Result<Vec<u8>, i32> {
    let mut buf = vec![0u8; max];
    let n = unsafe { ramflash_read_file(c(path).as_ptr(), buf.as_mut_ptr(), max as u32) };
    if n < 0 {
        return Err(n);
    }
    buf.truncate(n as usize);
    Ok(buf)
}

#[test]
fn test_init_defaults_and_image_size() {
    let _lock = serial();
    assert_eq!(ramflash_get_image_size(), 0);
    assert!(ramflash_get_image().is_null());

    assert_eq!(ramflash_init(0, 0, 0), 0);
    assert_eq!(ramflash_get_image_size(), 4096 * 256);

    assert_eq!(ramflash_init(512, 8, 16), 0);
    assert_eq!(ramflash_get_image_size(), 4096);
    let image = unsafe { slice::from_raw_parts(ramflash_get_image(), 4096) };
    assert!(image.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_write_read_stat() {
    let _lock = serial();
    fresh_volume();

    assert_eq!(write("/cfg/net/ip", b"10.0.0.2"), 0);
    assert_eq!(read("/cfg/net/ip", 64).unwrap(), b"10.0.0.2");
    assert_eq!(read("/cfg/net/ip", 2).unwrap(), b"10");
    assert_eq!(read("/nope", 8), Err(-2));

    let (mut kind, mut size) = (0i32, 0u32);
    assert_eq!(unsafe { ramflash_stat(c("/cfg/net").as_ptr(), &mut kind, &mut size) }, 0);
    assert_eq!(kind, 2);
    assert_eq!(unsafe { ramflash_stat(c("/cfg/net/ip").as_ptr(), &mut kind, &mut size) }, 0);
    assert_eq!((kind, size), (1, 8));
    assert_eq!(unsafe { ramflash_file_size(c("/cfg/net/ip").as_ptr()) }, 8);
}

#[test]
fn test_not_mounted_is_invalid_state() {
    let _lock = serial();
    assert_eq!(ramflash_init(512, 32, 0), 0);

    let mut used = 0u32;
    assert_eq!(unsafe { ramflash_fs_stat(&mut used, ptr::null_mut()) }, -19);
    assert_eq!(unsafe { ramflash_dir_open(c("/").as_ptr()) }, -19);
    assert_eq!(read("/x", 4), Err(-19));
    // Unformatted storage reports the engine's corruption code
    assert_eq!(ramflash_mount(), -84);
}

#[test]
fn test_directory_listing() {
    let _lock = serial();
    fresh_volume();
    assert_eq!(write("/d/one", b"1"), 0);
    assert_eq!(unsafe { ramflash_mkdir(c("/d/two").as_ptr()) }, 0);
    assert_eq!(unsafe { ramflash_mkdir(c("/d/two").as_ptr()) }, -17);

    let dir = unsafe { ramflash_dir_open(c("/d").as_ptr()) };
    assert!(dir >= 0);

    let mut name = [0 as c_char; 32];
    let (mut kind, mut size) = (0i32, 0u32);
    let mut seen = Vec::new();
    loop {
        let rc = unsafe { ramflash_dir_read(dir, name.as_mut_ptr(), 32, &mut kind, &mut size) };
        assert!(rc >= 0);
        if rc == 0 {
            break;
        }
        let entry = unsafe { CStr::from_ptr(name.as_ptr()) }.to_str().unwrap().to_owned();
        seen.push((entry, kind));
    }
    assert_eq!(seen, vec![("one".to_owned(), 1), ("two".to_owned(), 2)]);

    assert_eq!(ramflash_dir_close(dir), 0);
    assert_eq!(ramflash_dir_close(dir), -9);
    assert_eq!(ramflash_dir_close(-1), -9);
}

#[test]
fn test_dir_read_truncates_name() {
    let _lock = serial();
    fresh_volume();
    assert_eq!(write("/abcdefgh", b""), 0);

    let dir = unsafe { ramflash_dir_open(c("/").as_ptr()) };
    let mut name = [0x7F as c_char; 4];
    let rc = unsafe { ramflash_dir_read(dir, name.as_mut_ptr(), 4, ptr::null_mut(), ptr::null_mut()) };
    assert_eq!(rc, 1);
    assert_eq!(unsafe { CStr::from_ptr(name.as_ptr()) }.to_bytes(), b"abc");
    assert_eq!(ramflash_dir_close(dir), 0);
}

#[test]
fn test_file_handles() {
    let _lock = serial();
    fresh_volume();

    let h = unsafe { ramflash_file_open(c("/h").as_ptr(), OpenFlags::REPLACE.bits()) };
    assert!(h >= 0);
    let data = b"stream";
    assert_eq!(unsafe { ramflash_file_write(h, data.as_ptr(), data.len() as u32) }, 6);
    assert_eq!(ramflash_file_close(h), 0);

    let h = unsafe { ramflash_file_open(c("/h").as_ptr(), OpenFlags::READ.bits()) };
    let mut buf = [0u8; 16];
    assert_eq!(unsafe { ramflash_file_read(h, buf.as_mut_ptr(), 16) }, 6);
    assert_eq!(&buf[..6], b"stream");
    assert_eq!(ramflash_file_close(h), 0);

    assert_eq!(unsafe { ramflash_file_open(c("/h").as_ptr(), 0x8000_0000) }, -22);
}

#[test]
fn test_rename_remove() {
    let _lock = serial();
    fresh_volume();
    assert_eq!(write("/a/f", b"x"), 0);
    assert_eq!(unsafe { ramflash_remove(c("/a").as_ptr()) }, -39);
    assert_eq!(unsafe { ramflash_rename(c("/a").as_ptr(), c("/b").as_ptr()) }, 0);
    assert_eq!(read("/b/f", 4).unwrap(), b"x");
    assert_eq!(unsafe { ramflash_remove(c("/b/f").as_ptr()) }, 0);
    assert_eq!(unsafe { ramflash_remove(ptr::null()) }, -22);
}

#[test]
fn test_image_export_import() {
    let _lock = serial();
    fresh_volume();
    assert_eq!(write("/saved", b"persist me"), 0);
    assert_eq!(ramflash_unmount(), 0);

    let size = ramflash_get_image_size();
    let image = unsafe { slice::from_raw_parts(ramflash_get_image(), size as usize) }.to_vec();
    ramflash_cleanup();

    let rc = unsafe { ramflash_init_from_image(image.as_ptr(), size, 512, 0, 0) };
    assert_eq!(rc, 0);
    assert_eq!(ramflash_mount(), 0);
    assert_eq!(read("/saved", 32).unwrap(), b"persist me");

    assert_eq!(unsafe { ramflash_init_from_image(image.as_ptr(), 0, 512, 0, 0) }, -22);
}

#[test]
fn test_disk_version_and_usage() {
    let _lock = serial();
    assert_eq!(ramflash_get_disk_version(), 0);
    ramflash_set_disk_version(0x0002_0000);
    assert_eq!(ramflash_get_disk_version(), 0x0002_0000);

    fresh_volume();
    let mut version = 0u32;
    assert_eq!(unsafe { ramflash_get_fs_info(&mut version) }, 0);
    assert_eq!(version, 0x0002_0000);

    let (mut used, mut total) = (0u32, 0u32);
    assert_eq!(unsafe { ramflash_fs_stat(&mut used, &mut total) }, 0);
    assert_eq!(total, 32);
    assert!(used > 0 && used < total);

    // Cleanup frees storage but keeps the pinned version
    ramflash_cleanup();
    assert_eq!(ramflash_get_image_size(), 0);
    assert_eq!(ramflash_get_disk_version(), 0x0002_0000);

    fresh_volume();
    assert_eq!(unsafe { ramflash_get_fs_info(&mut version) }, 0);
    assert_eq!(version, 0x0002_0000);

    ramflash_set_disk_version(0);
    fresh_volume();
    assert_eq!(unsafe { ramflash_get_fs_info(&mut version) }, 0);
    assert_eq!(version, 0x0002_0001);
}
