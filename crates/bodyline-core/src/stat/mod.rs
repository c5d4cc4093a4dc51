//! Platform stat providers.
//!
//! A provider turns a path into a normalized [`StatBundle`] without following
//! symbolic links. Each supported platform has one implementation, exported as
//! [`PlatformStatProvider`].

use std::fs::FileType;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::record::{Mode, Principal};

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use posix::PosixStatProvider as PlatformStatProvider;
#[cfg(windows)]
pub use windows::WindowsStatProvider as PlatformStatProvider;

/// Why a single entry could not be described.
#[derive(Debug, Error)]
pub enum EntryAccessError {
    /// The entry disappeared or is a dangling reference.
    #[error("not found: {0}")]
    NotFound(#[source] io::Error),

    /// The entry or one of its parents is not readable.
    #[error("access denied: {0}")]
    AccessDenied(#[source] io::Error),

    /// Any other I/O failure.
    #[error("{0}")]
    Other(#[source] io::Error),
}

impl From<io::Error> for EntryAccessError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(err),
            io::ErrorKind::PermissionDenied => Self::AccessDenied(err),
            _ => Self::Other(err),
        }
    }
}

impl From<walkdir::Error> for EntryAccessError {
    fn from(err: walkdir::Error) -> Self {
        io::Error::from(err).into()
    }
}

/// Kind of filesystem object, as seen without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl From<FileType> for EntryKind {
    fn from(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Normalized attributes of one entry. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatBundle {
    pub kind: EntryKind,
    pub identity_number: u64,
    pub mode: Mode,
    pub owner_id: Principal,
    pub group_id: Principal,
    pub size_bytes: i64,
    pub access_time: i64,
    pub modify_time: i64,
    pub change_time: i64,
    pub birth_time: i64,
}

/// Source of per-entry attributes.
pub trait StatProvider {
    /// Describes `path` with lstat semantics.
    fn stat(&self, path: &Path) -> Result<StatBundle, EntryAccessError>;
}

impl<P: StatProvider + ?Sized> StatProvider for &P {
    fn stat(&self, path: &Path) -> Result<StatBundle, EntryAccessError> {
        (**self).stat(path)
    }
}

/// Converts a system time to Unix seconds, flooring pre-epoch instants.
pub fn unix_seconds(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}
