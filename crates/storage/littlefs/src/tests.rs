//! Unit tests for the littlefs engine
//!
//! Run with: cargo test --package ramflash-littlefs

use super::*;
use alloc::vec;
use ramflash_engine::{DISK_VERSION_2_0, DISK_VERSION_2_1};
use ramflash_ramdisk::RamDisk;

// ============================================================================
// HELPERS
// ============================================================================

fn geometry() -> Geometry {
    Geometry::new(512, 16, 32)
}

fn fresh() -> (RamDisk, LittleFs) {
    let geo = geometry();
    let mut disk = RamDisk::new(geo.block_size, geo.block_count).unwrap();
    LittleFs::format(&mut disk, &geo).unwrap();
    let fs = LittleFs::mount(&mut disk, &geo).unwrap();
    (disk, fs)
}

fn write(fs: &mut LittleFs, disk: &mut RamDisk, path: &str, data: &[u8]) {
    let mut file = fs.file_open(disk, path, OpenFlags::REPLACE).unwrap();
    assert_eq!(fs.file_write(disk, &mut file, data).unwrap(), data.len());
    fs.file_close(disk, file).unwrap();
}

fn read(fs: &mut LittleFs, disk: &mut RamDisk, path: &str) -> Vec<u8> {
    let mut file = fs.file_open(disk, path, OpenFlags::READ).unwrap();
    let mut buf = vec![0u8; 4096];
    let n = fs.file_read(disk, &mut file, &mut buf).unwrap();
    fs.file_close(disk, file).unwrap();
    buf.truncate(n);
    buf
}

fn list(fs: &mut LittleFs, disk: &mut RamDisk, path: &str) -> Vec<String> {
    let mut dir = fs.dir_open(disk, path).unwrap();
    let mut names = Vec::new();
    while let Some(entry) = fs.dir_read(disk, &mut dir).unwrap() {
        names.push(entry.name);
    }
    fs.dir_close(disk, dir).unwrap();
    names
}

// ============================================================================
// FORMAT / MOUNT
// ============================================================================

#[test]
fn test_mount_erased_device_is_corrupt() {
    let geo = geometry();
    let mut disk = RamDisk::new(geo.block_size, geo.block_count).unwrap();
    assert_eq!(LittleFs::mount(&mut disk, &geo).err(), Some(EngineError::Corrupt));
}

#[test]
fn test_format_then_mount_is_empty() {
    let (mut disk, mut fs) = fresh();
    assert_eq!(list(&mut fs, &mut disk, "/"), vec![".", ".."]);
    // Just the root metadata pair
    assert_eq!(fs.fs_size(&mut disk).unwrap(), 2);

    let info = fs.fs_info(&mut disk).unwrap();
    assert_eq!(info.disk_version, DEFAULT_DISK_VERSION);
    assert_eq!(info.block_count, 16);
    assert_eq!(info.name_max, 64);
    assert_eq!(fs.name(), "littlefs");
}

#[test]
fn test_superblock_carries_littlefs_magic() {
    let (mut disk, fs) = fresh();
    fs.unmount(&mut disk).unwrap();

    // Revision count, tag, then the superblock name
    let image = disk.as_bytes();
    let magic_at = |block: usize| &image[block * 512 + 8..block * 512 + 16];
    assert!(magic_at(0) == b"littlefs" || magic_at(1) == b"littlefs");
}

#[test]
fn test_format_rejects_tiny_geometry() {
    let geo = Geometry::new(512, 1, 32);
    let mut disk = RamDisk::new(512, 1).unwrap();
    assert_eq!(LittleFs::format(&mut disk, &geo), Err(EngineError::Invalid));

    let geo = Geometry::new(64, 8, 32);
    let mut disk = RamDisk::new(64, 8).unwrap();
    assert_eq!(LittleFs::format(&mut disk, &geo), Err(EngineError::Invalid));
}

#[test]
fn test_pinned_disk_version() {
    let geo = geometry().with_disk_version(DISK_VERSION_2_0);
    let mut disk = RamDisk::new(geo.block_size, geo.block_count).unwrap();
    LittleFs::format(&mut disk, &geo).unwrap();

    let mut fs = LittleFs::mount(&mut disk, &geometry()).unwrap();
    assert_eq!(fs.fs_info(&mut disk).unwrap().disk_version, DISK_VERSION_2_0);
    fs.unmount(&mut disk).unwrap();

    LittleFs::format(&mut disk, &geometry()).unwrap();
    let mut fs = LittleFs::mount(&mut disk, &geometry()).unwrap();
    assert_eq!(fs.fs_info(&mut disk).unwrap().disk_version, DISK_VERSION_2_1);
    fs.unmount(&mut disk).unwrap();

    let unsupported = geometry().with_disk_version(0x0003_0000);
    assert_eq!(LittleFs::format(&mut disk, &unsupported), Err(EngineError::Invalid));
}

#[test]
fn test_block_count_mismatch_fails_mount() {
    let (mut disk, fs) = fresh();
    fs.unmount(&mut disk).unwrap();
    let other = Geometry::new(512, 12, 32);
    assert!(LittleFs::mount(&mut disk, &other).is_err());
}

#[test]
fn test_device_errors_surface_as_io() {
    let geo = geometry();
    // The device is smaller than the geometry claims
    let mut short = RamDisk::new(geo.block_size, 1).unwrap();
    assert_eq!(LittleFs::format(&mut short, &geo), Err(EngineError::Io));
}

// ============================================================================
// PERSISTENCE
// ============================================================================

#[test]
fn test_data_survives_remount() {
    let (mut disk, mut fs) = fresh();
    fs.mkdir(&mut disk, "/etc").unwrap();
    write(&mut fs, &mut disk, "/etc/motd", b"hello flash");
    fs.unmount(&mut disk).unwrap();

    let mut fs = LittleFs::mount(&mut disk, &geometry()).unwrap();
    assert_eq!(read(&mut fs, &mut disk, "/etc/motd"), b"hello flash");
    assert!(fs.stat(&mut disk, "/etc").unwrap().is_dir());
    assert_eq!(fs.stat(&mut disk, "/etc/motd").unwrap().size, 11);
}

#[test]
fn test_no_space_keeps_previous_content() {
    let (mut disk, mut fs) = fresh();
    write(&mut fs, &mut disk, "/keep", b"original");

    // More than the whole device
    let big = vec![0x5A; 16 * 512];
    let mut file = fs.file_open(&mut disk, "/keep", OpenFlags::REPLACE).unwrap();
    let wrote = fs.file_write(&mut disk, &mut file, &big);
    let closed = fs.file_close(&mut disk, file);
    assert!(wrote == Err(EngineError::NoSpace) || closed == Err(EngineError::NoSpace));

    assert_eq!(read(&mut fs, &mut disk, "/keep"), b"original");
    fs.unmount(&mut disk).unwrap();
    let mut fs = LittleFs::mount(&mut disk, &geometry()).unwrap();
    assert_eq!(read(&mut fs, &mut disk, "/keep"), b"original");
}

// ============================================================================
// FILES
// ============================================================================

#[test]
fn test_open_flags() {
    let (mut disk, mut fs) = fresh();
    assert_eq!(fs.file_open(&mut disk, "/nope", OpenFlags::READ).err(), Some(EngineError::NotFound));
    assert_eq!(fs.file_open(&mut disk, "/", OpenFlags::READ).err(), Some(EngineError::IsDir));
    assert_eq!(fs.file_open(&mut disk, "/f", OpenFlags::CREATE).err(), Some(EngineError::Invalid));

    write(&mut fs, &mut disk, "/f", b"x");
    let excl = OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::EXCL;
    assert_eq!(fs.file_open(&mut disk, "/f", excl).err(), Some(EngineError::Exists));

    let mut ro = fs.file_open(&mut disk, "/f", OpenFlags::READ).unwrap();
    assert_eq!(fs.file_write(&mut disk, &mut ro, b"y"), Err(EngineError::BadFile));
    fs.file_close(&mut disk, ro).unwrap();

    let mut wo = fs.file_open(&mut disk, "/f", OpenFlags::WRITE).unwrap();
    let mut buf = [0u8; 1];
    assert_eq!(fs.file_read(&mut disk, &mut wo, &mut buf), Err(EngineError::BadFile));
    fs.file_close(&mut disk, wo).unwrap();
}

#[test]
fn test_create_exists_before_close() {
    let (mut disk, mut fs) = fresh();
    let file = fs.file_open(&mut disk, "/new", OpenFlags::REPLACE).unwrap();
    assert_eq!(fs.stat(&mut disk, "/new").unwrap().size, 0);
    fs.file_close(&mut disk, file).unwrap();
}

#[test]
fn test_append_and_partial_reads() {
    let (mut disk, mut fs) = fresh();
    write(&mut fs, &mut disk, "/log", b"abc");

    let mut file = fs
        .file_open(&mut disk, "/log", OpenFlags::WRITE | OpenFlags::APPEND)
        .unwrap();
    fs.file_write(&mut disk, &mut file, b"def").unwrap();
    fs.file_close(&mut disk, file).unwrap();

    let mut file = fs.file_open(&mut disk, "/log", OpenFlags::READ).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(fs.file_read(&mut disk, &mut file, &mut buf).unwrap(), 4);
    assert_eq!(&buf, b"abcd");
    assert_eq!(fs.file_read(&mut disk, &mut file, &mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"ef");
    assert_eq!(fs.file_read(&mut disk, &mut file, &mut buf).unwrap(), 0);
    fs.file_close(&mut disk, file).unwrap();
}

#[test]
fn test_multi_block_file() {
    let (mut disk, mut fs) = fresh();
    let data: Vec<u8> = (0..3000u32).map(|i| (i % 253) as u8).collect();
    write(&mut fs, &mut disk, "/blob", &data);
    assert_eq!(read(&mut fs, &mut disk, "/blob"), data);
    assert!(fs.fs_size(&mut disk).unwrap() > 2);
}

#[test]
fn test_name_limit() {
    let (mut disk, mut fs) = fresh();
    let long = alloc::format!("/{}", "n".repeat(65));
    assert_eq!(fs.mkdir(&mut disk, &long), Err(EngineError::NameTooLong));
    let fits = alloc::format!("/{}", "n".repeat(64));
    fs.mkdir(&mut disk, &fits).unwrap();
}

// ============================================================================
// DIRECTORIES
// ============================================================================

#[test]
fn test_dir_listing_includes_dots_first() {
    let (mut disk, mut fs) = fresh();
    fs.mkdir(&mut disk, "/d").unwrap();
    write(&mut fs, &mut disk, "/d/b", b"1");
    write(&mut fs, &mut disk, "/d/a", b"22");
    assert_eq!(list(&mut fs, &mut disk, "/d"), vec![".", "..", "a", "b"]);

    write(&mut fs, &mut disk, "/file", b"");
    assert_eq!(fs.dir_open(&mut disk, "/file").err(), Some(EngineError::NotDir));
    assert_eq!(fs.dir_open(&mut disk, "/none").err(), Some(EngineError::NotFound));
}

#[test]
fn test_rename_and_remove() {
    let (mut disk, mut fs) = fresh();
    fs.mkdir(&mut disk, "/a").unwrap();
    write(&mut fs, &mut disk, "/a/f", b"data");
    assert_eq!(fs.remove(&mut disk, "/a"), Err(EngineError::NotEmpty));

    fs.rename(&mut disk, "/a", "/b").unwrap();
    assert_eq!(read(&mut fs, &mut disk, "/b/f"), b"data");
    assert_eq!(fs.stat(&mut disk, "/a").err(), Some(EngineError::NotFound));

    fs.remove(&mut disk, "/b/f").unwrap();
    fs.remove(&mut disk, "/b").unwrap();
    assert_eq!(list(&mut fs, &mut disk, "/"), vec![".", ".."]);
}
