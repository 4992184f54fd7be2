//! ramflash-img - Create, inspect and unpack ramflash disk images
//!
//! Images are raw littlefs volumes, byte for byte what the library
//! exports.
//!
//! Usage:
//!   ramflash-img create -o disk.img -d rootfs/      # 1 MiB image from a directory
//!   ramflash-img create -o disk.img -s 64K -b 512   # empty 64 KiB image
//!   ramflash-img ls disk.img                        # recursive listing
//!   ramflash-img extract disk.img -o out/           # copy every file out
//!   ramflash-img info disk.img                      # geometry and usage

use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ramflash_engine::{
    disk_version_major, disk_version_minor, EntryInfo, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE,
    DISK_VERSION_2_0, DISK_VERSION_2_1, DISK_VERSION_AUTO,
};
use ramflash_session::{DiskParams, Error, Session};
use ramflash_littlefs::LittleFs;

type Volume = Session<LittleFs>;

#[derive(Parser)]
#[command(name = "ramflash-img")]
#[command(about = "Create, inspect and unpack ramflash disk images")]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new image, optionally populated from a host directory
    Create(CreateArgs),
    /// List every entry in an image
    Ls(ImageArgs),
    /// Copy every file in an image to a host directory
    Extract {
        #[command(flatten)]
        image: ImageArgs,

        /// Destination directory
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show geometry, disk version and block usage
    Info(ImageArgs),
}

#[derive(Args)]
struct CreateArgs {
    /// Output image file
    #[arg(short, long)]
    output: PathBuf,

    /// Directory to copy files from
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Block size in bytes
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Number of blocks
    #[arg(short = 'c', long, default_value_t = DEFAULT_BLOCK_COUNT, conflicts_with = "size")]
    block_count: u32,

    /// Image size instead of a block count (e.g., 64K, 1M)
    #[arg(short, long)]
    size: Option<String>,

    /// On-disk version to write (2.0 or 2.1)
    #[arg(long, value_parser = parse_disk_version)]
    disk_version: Option<u32>,
}

#[derive(Args)]
struct ImageArgs {
    /// Image file
    image: PathBuf,

    /// Block size the image was created with
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,
}

// ========== Logging ==========

static LOGGER: StderrLogger = StderrLogger;

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

fn init_logger(verbose: bool) {
    if log::set_logger(&LOGGER).is_err() {
        eprintln!("warning: a logger is already installed, keeping it");
    }
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
}

// ========== Argument parsing ==========

fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_uppercase();
    let (num_str, mult) = if s.ends_with('M') || s.ends_with("MB") {
        (s.trim_end_matches("MB").trim_end_matches('M'), 1024 * 1024)
    } else if s.ends_with('K') || s.ends_with("KB") {
        (s.trim_end_matches("KB").trim_end_matches('K'), 1024)
    } else {
        (s.as_str(), 1)
    };

    num_str.parse::<u64>().ok().map(|n| n * mult)
}

fn parse_disk_version(s: &str) -> Result<u32, String> {
    match s.trim() {
        "2.0" => Ok(DISK_VERSION_2_0),
        "2.1" => Ok(DISK_VERSION_2_1),
        "auto" | "0" => Ok(DISK_VERSION_AUTO),
        other => Err(format!("unsupported disk version '{}' (expected 2.0 or 2.1)", other)),
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

fn fs_err(err: Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("filesystem error {}: {}", err.code(), err))
}

fn block_count_for(args: &CreateArgs) -> io::Result<u32> {
    let Some(size) = &args.size else {
        return Ok(args.block_count);
    };
    let bytes = parse_size(size).ok_or_else(|| invalid(format!("invalid size '{}'", size)))?;
    let count = bytes / args.block_size.max(1) as u64;
    u32::try_from(count)
        .ok()
        .filter(|&count| count > 0)
        .ok_or_else(|| invalid(format!("size '{}' does not fit the block size", size)))
}

// ========== Volume helpers ==========

/// Load an image file and mount it
fn open_image(path: &Path, block_size: u32) -> io::Result<Volume> {
    let image = fs::read(path)?;
    let mut volume = Volume::default();
    volume
        .initialize_from_image(&image, DiskParams::from_raw(block_size, 0, 0))
        .map_err(fs_err)?;
    volume.mount().map_err(fs_err)?;
    Ok(volume)
}

/// Entries of one directory, without holding its handle afterwards
fn list_dir(volume: &mut Volume, dir: &str) -> io::Result<Vec<EntryInfo>> {
    let handle = volume.dir_open(dir).map_err(fs_err)?;
    let mut entries = Vec::new();
    let result = loop {
        match volume.dir_read(handle) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };
    volume.dir_close(handle).map_err(fs_err)?;
    result.map_err(fs_err)?;
    Ok(entries)
}

fn child_path(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Visit every entry below `dir`, parents before children
fn walk<F>(volume: &mut Volume, dir: &str, visit: &mut F) -> io::Result<()>
where
    F: FnMut(&mut Volume, &str, &EntryInfo) -> io::Result<()>,
{
    for entry in list_dir(volume, dir)? {
        let path = child_path(dir, &entry.name);
        visit(volume, &path, &entry)?;
        if entry.is_dir() {
            walk(volume, &path, visit)?;
        }
    }
    Ok(())
}

fn read_whole(volume: &mut Volume, path: &str) -> io::Result<Vec<u8>> {
    let size = volume.file_size(path).map_err(fs_err)?;
    let mut data = vec![0u8; size as usize];
    let n = volume.read_file(path, &mut data).map_err(fs_err)?;
    data.truncate(n);
    Ok(data)
}

// ========== Commands ==========

#[derive(Debug, Default, PartialEq, Eq)]
struct PopulateStats {
    files: usize,
    dirs: usize,
    skipped: usize,
}

fn populate(volume: &mut Volume, source: &Path, dir: &str, stats: &mut PopulateStats) -> io::Result<()> {
    let mut entries = fs::read_dir(source)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            log::warn!("skipping non UTF-8 name {:?}", file_name);
            stats.skipped += 1;
            continue;
        };
        let path = child_path(dir, name);
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            if let Err(err) = volume.mkdir(&path) {
                log::warn!("failed to create directory {}: {}", path, err);
                stats.skipped += 1;
                continue;
            }
            log::debug!("DIR:  {}", path);
            stats.dirs += 1;
            populate(volume, &entry.path(), &path, stats)?;
        } else if metadata.is_file() {
            let data = fs::read(entry.path())?;
            if let Err(err) = volume.write_file(&path, &data) {
                log::warn!("failed to write {} ({} bytes): {}", path, data.len(), err);
                stats.skipped += 1;
                continue;
            }
            log::debug!("FILE: {} ({} bytes)", path, data.len());
            stats.files += 1;
        }
    }
    Ok(())
}

fn create(args: &CreateArgs) -> io::Result<PopulateStats> {
    let block_count = block_count_for(args)?;
    let mut volume = Volume::default();
    volume
        .initialize(DiskParams::from_raw(args.block_size, block_count, 0))
        .map_err(fs_err)?;
    if let Some(version) = args.disk_version {
        volume.set_disk_version(version);
    }
    volume.format().map_err(fs_err)?;
    volume.mount().map_err(fs_err)?;

    let mut stats = PopulateStats::default();
    if let Some(dir) = &args.dir {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Directory not found: {}", dir.display()),
            ));
        }
        populate(&mut volume, dir, "/", &mut stats)?;
    }

    volume.unmount().map_err(fs_err)?;
    let image = volume.image().ok_or_else(|| fs_err(Error::InvalidState))?;
    fs::write(&args.output, image)?;
    Ok(stats)
}

fn list(volume: &mut Volume) -> io::Result<Vec<String>> {
    let mut lines = Vec::new();
    walk(volume, "/", &mut |_: &mut Volume, path: &str, entry: &EntryInfo| {
        if entry.is_dir() {
            lines.push(format!("{}/", path));
        } else {
            lines.push(format!("{} ({} bytes)", path, entry.size));
        }
        Ok(())
    })?;
    Ok(lines)
}

fn extract(volume: &mut Volume, output: &Path) -> io::Result<usize> {
    fs::create_dir_all(output)?;
    let mut files = 0;
    walk(volume, "/", &mut |volume: &mut Volume, path: &str, entry: &EntryInfo| {
        let target = output.join(path.trim_start_matches('/'));
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::write(&target, read_whole(volume, path)?)?;
            log::debug!("extracted {}", path);
            files += 1;
        }
        Ok(())
    })?;
    Ok(files)
}

fn info(volume: &mut Volume) -> io::Result<Vec<String>> {
    let fs_info = volume.fs_info().map_err(fs_err)?;
    let usage = volume.fs_stat().map_err(fs_err)?;
    Ok(vec![
        format!("Block size:   {} bytes", fs_info.block_size),
        format!("Block count:  {}", fs_info.block_count),
        format!(
            "Disk version: {}.{}",
            disk_version_major(fs_info.disk_version),
            disk_version_minor(fs_info.disk_version)
        ),
        format!("Name max:     {}", fs_info.name_max),
        format!(
            "Blocks used:  {} of {} ({} free)",
            usage.blocks_used,
            usage.blocks_total,
            usage.blocks_free()
        ),
    ])
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Create(args) => {
            println!("Creating ramflash image: {}", args.output.display());
            let stats = create(&args)?;
            println!(
                "Done: {} files, {} directories, {} skipped",
                stats.files, stats.dirs, stats.skipped
            );
        }
        Command::Ls(args) => {
            let mut volume = open_image(&args.image, args.block_size)?;
            for line in list(&mut volume)? {
                println!("{}", line);
            }
        }
        Command::Extract { image, output } => {
            let mut volume = open_image(&image.image, image.block_size)?;
            let files = extract(&mut volume, &output)?;
            println!("Extracted {} files to {}", files, output.display());
        }
        Command::Info(args) => {
            let mut volume = open_image(&args.image, args.block_size)?;
            println!("Image: {}", args.image.display());
            for line in info(&mut volume)? {
                println!("  {}", line);
            }
        }
    }
    Ok(())
}
