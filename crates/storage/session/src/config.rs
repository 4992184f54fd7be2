//! Session configuration

use ramflash_engine::{Geometry, DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE, DEFAULT_LOOKAHEAD};

/// Default number of concurrently open files
pub const DEFAULT_MAX_FILES: usize = 16;

/// Default number of concurrently open directories
pub const DEFAULT_MAX_DIRS: usize = 8;

/// What `write_file` does with errors while creating missing parents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AncestorPolicy {
    /// Ignore every mkdir failure; a real problem shows up when the file
    /// itself cannot be opened. Suppressed errors are logged.
    SuppressAll,
    /// Ignore only "already exists"; any other failure aborts the write.
    Strict,
}

/// Session-wide policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// File handle table capacity
    pub max_files: usize,
    /// Directory handle table capacity
    pub max_dirs: usize,
    /// Ancestor creation policy for `write_file`
    pub ancestor_policy: AncestorPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_files: DEFAULT_MAX_FILES,
            max_dirs: DEFAULT_MAX_DIRS,
            ancestor_policy: AncestorPolicy::SuppressAll,
        }
    }
}

/// Requested geometry for a new storage buffer
///
/// `None` and `Some(0)` both pick the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskParams {
    pub block_size: Option<u32>,
    pub block_count: Option<u32>,
    pub lookahead: Option<u32>,
}

fn nonzero(value: Option<u32>) -> Option<u32> {
    value.filter(|&v| v > 0)
}

impl DiskParams {
    /// Parameters from raw integers where 0 means "default"
    pub fn from_raw(block_size: u32, block_count: u32, lookahead: u32) -> Self {
        DiskParams {
            block_size: nonzero(Some(block_size)),
            block_count: nonzero(Some(block_count)),
            lookahead: nonzero(Some(lookahead)),
        }
    }

    pub fn block_size(&self) -> u32 {
        nonzero(self.block_size).unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    /// Requested block count, if any
    pub fn block_count(&self) -> Option<u32> {
        nonzero(self.block_count)
    }

    pub fn lookahead(&self) -> u32 {
        nonzero(self.lookahead).unwrap_or(DEFAULT_LOOKAHEAD)
    }

    /// Geometry for an empty device
    pub fn geometry(&self) -> Geometry {
        Geometry::new(
            self.block_size(),
            self.block_count().unwrap_or(DEFAULT_BLOCK_COUNT),
            self.lookahead(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_zero_means_default() {
        let params = DiskParams::from_raw(0, 0, 0);
        assert_eq!(params, DiskParams::default());
        let geo = params.geometry();
        assert_eq!((geo.block_size, geo.block_count, geo.lookahead_size), (4096, 256, 32));

        let geo = DiskParams::from_raw(512, 64, 16).geometry();
        assert_eq!((geo.block_size, geo.block_count, geo.lookahead_size), (512, 64, 16));
    }

    #[test]
    fn test_explicit_zero_means_default() {
        let params = DiskParams {
            block_size: Some(0),
            block_count: Some(0),
            lookahead: Some(0),
        };
        assert_eq!(params.block_size(), 4096);
        assert_eq!(params.block_count(), None);
        assert_eq!(params.lookahead(), 32);
        assert_eq!(params.geometry(), DiskParams::default().geometry());
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.max_files, 16);
        assert_eq!(config.max_dirs, 8);
        assert_eq!(config.ancestor_policy, AncestorPolicy::SuppressAll);
    }
}
