//! ramflash Path Module
//!
//! Path normalization, splitting and validation shared by the session
//! layer and filesystem engines.
//!
//! Paths use `/` as separator and are always interpreted from the
//! filesystem root; a leading `/` is optional. Normalization is jailed:
//! `..` at the root stays at the root.

#![no_std]

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Path separator
pub const SEPARATOR: char = '/';

/// Default maximum filename length
pub const DEFAULT_NAME_MAX: usize = 64;

/// Path length limit derived from a filename limit (room for nesting)
pub const fn max_path_for(name_max: usize) -> usize {
    name_max * 4
}

/// Reasons a path is rejected before it reaches the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// Empty path
    Empty,
    /// Path does not fit the configured path limit
    TooLong,
    /// Embedded NUL byte
    InvalidChar,
}

impl core::fmt::Display for PathError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PathError::Empty => f.write_str("empty path"),
            PathError::TooLong => f.write_str("path too long"),
            PathError::InvalidChar => f.write_str("path contains NUL"),
        }
    }
}

/// Check a caller-supplied path against a length limit
///
/// `max_len` counts the terminator of a C string, so the longest accepted
/// path is `max_len - 1` bytes.
pub fn validate(path: &str, max_len: usize) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if path.contains('\0') {
        return Err(PathError::InvalidChar);
    }
    if path.len() >= max_len {
        return Err(PathError::TooLong);
    }
    Ok(())
}

/// Normalize a path to its rooted form
///
/// - Removes duplicate slashes
/// - Resolves . and ..
/// - Always starts with /
pub fn normalize(path: &str) -> String {
    let components = components(path);
    if components.is_empty() {
        String::from("/")
    } else {
        format!("/{}", components.join("/"))
    }
}

/// Resolved path components (`.` and `..` applied, jailed at the root)
pub fn components(path: &str) -> Vec<&str> {
    let mut components: Vec<&str> = Vec::new();

    for part in path.split(SEPARATOR) {
        match part {
            "" | "." => continue,
            ".." => {
                components.pop();
            }
            _ => components.push(part),
        }
    }

    components
}

/// Split a normalized path into parent directory and filename
pub fn split(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches(SEPARATOR);

    match trimmed.rfind(SEPARATOR) {
        Some(0) => ("/", &trimmed[1..]),
        Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
        None => ("/", trimmed),
    }
}

/// Get the filename component of a path
pub fn filename(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches(SEPARATOR);

    if trimmed.is_empty() {
        return None;
    }

    match trimmed.rfind(SEPARATOR) {
        Some(pos) => Some(&trimmed[pos + 1..]),
        None => Some(trimmed),
    }
}

/// Join a directory and a child name
pub fn join(base: &str, component: &str) -> String {
    if base.is_empty() || base == "/" {
        return format!("/{}", component.trim_start_matches(SEPARATOR));
    }

    if base.ends_with(SEPARATOR) {
        format!("{}{}", base, component)
    } else {
        format!("{}/{}", base, component)
    }
}

/// True if `path` equals `dir` or lies underneath it (both normalized)
pub fn is_within(path: &str, dir: &str) -> bool {
    if dir == "/" {
        return true;
    }
    path == dir
        || (path.starts_with(dir) && path.as_bytes().get(dir.len()) == Some(&b'/'))
}

/// Check if a path component is a valid entry name
pub fn is_valid_name(name: &str, name_max: usize) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(SEPARATOR)
        && !name.contains('\0')
        && name.len() <= name_max
}

/// Iterator over the ancestor prefixes of a path
///
/// Yields every `/`-delimited prefix strictly between the root and the
/// last component, shortest first. `"/a/b/c"` yields `"/a"` then `"/a/b"`.
pub struct Ancestors<'a> {
    path: &'a str,
    pos: usize,
}

/// Ancestor directories of `path`, shortest first
pub fn ancestors(path: &str) -> Ancestors<'_> {
    Ancestors { path, pos: 1 }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        while self.pos < self.path.len() {
            let rest = &self.path.as_bytes()[self.pos..];
            match rest.iter().position(|&b| b == b'/') {
                Some(offset) => {
                    let end = self.pos + offset;
                    self.pos = end + 1;
                    return Some(&self.path[..end]);
                }
                None => {
                    self.pos = self.path.len();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("a/b"), "/a/b");
        assert_eq!(normalize("//a///b/"), "/a/b");
        assert_eq!(normalize("/a/./b/../c"), "/a/c");
        assert_eq!(normalize("/../../a"), "/a");
    }

    #[test]
    fn test_split() {
        assert_eq!(split("/a/b/c"), ("/a/b", "c"));
        assert_eq!(split("/a"), ("/", "a"));
        assert_eq!(split("a"), ("/", "a"));
        assert_eq!(split("/a/b/"), ("/a", "b"));
    }

    #[test]
    fn test_filename_and_join() {
        assert_eq!(filename("/a/b.txt"), Some("b.txt"));
        assert_eq!(filename("/"), None);
        assert_eq!(join("/", "x"), "/x");
        assert_eq!(join("/a", "x"), "/a/x");
        assert_eq!(join("/a/", "x"), "/a/x");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("/a/b", "/a"));
        assert!(is_within("/a", "/a"));
        assert!(!is_within("/ab", "/a"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn test_ancestors() {
        let got: Vec<&str> = ancestors("/a/b/c").collect();
        assert_eq!(got, vec!["/a", "/a/b"]);

        let got: Vec<&str> = ancestors("a/b").collect();
        assert_eq!(got, vec!["a"]);

        assert_eq!(ancestors("/file").count(), 0);
        assert_eq!(ancestors("/").count(), 0);
        assert_eq!(ancestors("").count(), 0);
    }

    #[test]
    fn test_validate() {
        assert_eq!(validate("", 16), Err(PathError::Empty));
        assert_eq!(validate("/a\0b", 16), Err(PathError::InvalidChar));
        assert_eq!(validate("/abcdefghijklmn", 16), Ok(()));
        assert_eq!(validate("/abcdefghijklmno", 16), Err(PathError::TooLong));
        assert_eq!(max_path_for(DEFAULT_NAME_MAX), 256);
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("file.txt", 64));
        assert!(!is_valid_name("..", 64));
        assert!(!is_valid_name("a/b", 64));
        assert!(!is_valid_name("abcdef", 5));
    }
}
