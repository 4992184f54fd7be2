//! Session error types

use ramflash_engine::EngineError;
use ramflash_path::PathError;
use ramflash_ramdisk::RamDiskError;

/// Session Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Session error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Operation needs an initialized or mounted session
    InvalidState,
    /// Bad geometry, empty image or malformed path
    InvalidArgument,
    /// Storage buffer could not be allocated
    NoMemory,
    /// Handle table is full
    NoCapacity,
    /// Handle out of range or not in use
    InvalidHandle,
    /// Path does not fit the path limit
    PathTooLong,
    /// Error reported by the engine, passed through untouched
    Engine(EngineError),
}

impl Error {
    /// Convert to the negative code used across primitive boundaries
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidState => -19,    // ENODEV
            Error::InvalidArgument => -22, // EINVAL
            Error::NoMemory => -12,        // ENOMEM
            Error::NoCapacity => -24,      // EMFILE
            Error::InvalidHandle => -9,    // EBADF
            Error::PathTooLong => -36,     // ENAMETOOLONG
            Error::Engine(e) => e.code(),
        }
    }

    /// The engine could not find the path
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Engine(EngineError::NotFound))
    }

    /// The engine refused to create an existing entry
    pub fn is_exists(&self) -> bool {
        matches!(self, Error::Engine(EngineError::Exists))
    }

    /// The engine refused to remove a non-empty directory
    pub fn is_not_empty(&self) -> bool {
        matches!(self, Error::Engine(EngineError::NotEmpty))
    }
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::Engine(err)
    }
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Self {
        match err {
            PathError::TooLong => Error::PathTooLong,
            PathError::Empty | PathError::InvalidChar => Error::InvalidArgument,
        }
    }
}

impl From<RamDiskError> for Error {
    fn from(err: RamDiskError) -> Self {
        match err {
            RamDiskError::InvalidGeometry => Error::InvalidArgument,
            RamDiskError::OutOfMemory => Error::NoMemory,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidState => f.write_str("filesystem not in the required state"),
            Error::InvalidArgument => f.write_str("invalid argument"),
            Error::NoMemory => f.write_str("out of memory"),
            Error::NoCapacity => f.write_str("too many open handles"),
            Error::InvalidHandle => f.write_str("invalid handle"),
            Error::PathTooLong => f.write_str("path too long"),
            Error::Engine(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            Error::InvalidState,
            Error::InvalidArgument,
            Error::NoMemory,
            Error::NoCapacity,
            Error::InvalidHandle,
            Error::PathTooLong,
        ];
        for (i, a) in errors.iter().enumerate() {
            for b in &errors[i + 1..] {
                assert_ne!(a.code(), b.code(), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_engine_codes_pass_through() {
        assert_eq!(Error::from(EngineError::Corrupt).code(), -84);
        assert_eq!(Error::from(EngineError::Other(-1000)).code(), -1000);
        assert!(Error::from(EngineError::NotFound).is_not_found());
        assert!(Error::from(EngineError::Exists).is_exists());
        assert!(Error::from(EngineError::NotEmpty).is_not_empty());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Error::from(PathError::TooLong), Error::PathTooLong);
        assert_eq!(Error::from(PathError::Empty), Error::InvalidArgument);
        assert_eq!(Error::from(RamDiskError::OutOfMemory), Error::NoMemory);
        assert_eq!(Error::from(RamDiskError::InvalidGeometry), Error::InvalidArgument);
    }
}
