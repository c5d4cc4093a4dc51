//! POSIX attributes from `lstat`.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use super::{EntryAccessError, EntryKind, StatBundle, StatProvider, unix_seconds};
use crate::record::{Mode, Principal};

/// Reads inode metadata through [`fs::symlink_metadata`].
///
/// `ctime` is the inode change time. Birth time comes from the filesystem when
/// it records one and otherwise falls back to `ctime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixStatProvider;

impl StatProvider for PosixStatProvider {
    fn stat(&self, path: &Path) -> Result<StatBundle, EntryAccessError> {
        let meta = fs::symlink_metadata(path)?;
        let birth_time = meta.created().map_or_else(|_| meta.ctime(), unix_seconds);

        Ok(StatBundle {
            kind: EntryKind::from(meta.file_type()),
            identity_number: meta.ino(),
            mode: Mode::Bits(meta.mode()),
            owner_id: Principal::Id(meta.uid()),
            group_id: Principal::Id(meta.gid()),
            size_bytes: i64::try_from(meta.size()).unwrap_or(i64::MAX),
            access_time: meta.atime(),
            modify_time: meta.mtime(),
            change_time: meta.ctime(),
            birth_time,
        })
    }
}
