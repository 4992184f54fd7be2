//! Engine error codes
//!
//! Engines report failures as negative errno-style integers. The common
//! ones get a name; anything else is carried through untouched.

use ramflash_driver_traits::BlockError;

/// Engine Result type
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// Error during device operation
    Io,
    /// Corrupted or unrecognized metadata
    Corrupt,
    /// No directory entry
    NotFound,
    /// Entry already exists
    Exists,
    /// Entry is not a directory
    NotDir,
    /// Entry is a directory
    IsDir,
    /// Directory is not empty
    NotEmpty,
    /// Bad file number (wrong mode for the request)
    BadFile,
    /// File too large
    FileTooBig,
    /// Invalid parameter
    Invalid,
    /// No space left on device
    NoSpace,
    /// No more memory available
    NoMemory,
    /// Filename too long
    NameTooLong,
    /// Any other engine-specific code
    Other(i32),
}

impl EngineError {
    /// Convert to errno-style error code
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Io => -5,           // EIO
            EngineError::Corrupt => -84,     // EILSEQ
            EngineError::NotFound => -2,     // ENOENT
            EngineError::Exists => -17,      // EEXIST
            EngineError::NotDir => -20,      // ENOTDIR
            EngineError::IsDir => -21,       // EISDIR
            EngineError::NotEmpty => -39,    // ENOTEMPTY
            EngineError::BadFile => -9,      // EBADF
            EngineError::FileTooBig => -27,  // EFBIG
            EngineError::Invalid => -22,     // EINVAL
            EngineError::NoSpace => -28,     // ENOSPC
            EngineError::NoMemory => -12,    // ENOMEM
            EngineError::NameTooLong => -36, // ENAMETOOLONG
            EngineError::Other(e) => *e,
        }
    }

    /// Name a raw engine code
    pub fn from_code(code: i32) -> Self {
        match code {
            -5 => EngineError::Io,
            -84 => EngineError::Corrupt,
            -2 => EngineError::NotFound,
            -17 => EngineError::Exists,
            -20 => EngineError::NotDir,
            -21 => EngineError::IsDir,
            -39 => EngineError::NotEmpty,
            -9 => EngineError::BadFile,
            -27 => EngineError::FileTooBig,
            -22 => EngineError::Invalid,
            -28 => EngineError::NoSpace,
            -12 => EngineError::NoMemory,
            -36 => EngineError::NameTooLong,
            other => EngineError::Other(other),
        }
    }
}

impl From<BlockError> for EngineError {
    fn from(err: BlockError) -> Self {
        match err {
            BlockError::OutOfBounds | BlockError::NoMedium => EngineError::Io,
            BlockError::DeviceError(code) => EngineError::from_code(code),
        }
    }
}

impl core::fmt::Display for EngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            EngineError::Io => "I/O error",
            EngineError::Corrupt => "corrupted filesystem",
            EngineError::NotFound => "no such file or directory",
            EngineError::Exists => "entry already exists",
            EngineError::NotDir => "not a directory",
            EngineError::IsDir => "is a directory",
            EngineError::NotEmpty => "directory not empty",
            EngineError::BadFile => "bad file handle",
            EngineError::FileTooBig => "file too large",
            EngineError::Invalid => "invalid argument",
            EngineError::NoSpace => "no space left on device",
            EngineError::NoMemory => "out of memory",
            EngineError::NameTooLong => "name too long",
            EngineError::Other(code) => return write!(f, "engine error {}", code),
        };
        f.write_str(text)
    }
}
