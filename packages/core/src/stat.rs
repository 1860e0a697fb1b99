//! File metadata synthesis.
//!
//! The backing store records neither timestamps, permissions nor content
//! types, so everything except the name and size is fixed.

use std::fmt;
use std::time::SystemTime;

/// Unix-style mode bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileMode(u32);

impl FileMode {
    /// Directory type bit.
    pub const DIR: u32 = 0o040000;
    /// Regular file type bit.
    pub const REGULAR: u32 = 0o100000;

    /// Readable regular file.
    pub const FILE_DEFAULT: FileMode = FileMode(Self::REGULAR | 0o644);
    /// Listable directory.
    pub const DIR_DEFAULT: FileMode = FileMode(Self::DIR | 0o755);

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Permission bits only.
    pub fn perm(self) -> u32 {
        self.0 & 0o777
    }

    pub fn is_dir(self) -> bool {
        self.0 & Self::DIR != 0
    }

    pub fn is_file(self) -> bool {
        self.0 & Self::REGULAR != 0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { 'd' } else { '-' };
        let mut out = String::with_capacity(10);
        out.push(kind);
        for shift in [6, 3, 0] {
            let bits = (self.0 >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&out)
    }
}

/// Metadata for a file or directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mode: FileMode,
    /// Always `None`: the store keeps no timestamps.
    pub mod_time: Option<SystemTime>,
    pub is_dir: bool,
    /// Always `None`: the store has no content-type concept.
    pub content_type: Option<String>,
}

impl FileInfo {
    /// Metadata for a file holding `size` bytes.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mode: FileMode::FILE_DEFAULT,
            mod_time: None,
            is_dir: false,
            content_type: None,
        }
    }

    /// Metadata for a directory.
    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            mode: FileMode::DIR_DEFAULT,
            mod_time: None,
            is_dir: true,
            content_type: None,
        }
    }
}
