//! Windows attributes from file metadata and the file's security descriptor.
//!
//! Windows has no inode change time: `change_time` mirrors the last write time
//! and `birth_time` is the creation time. The mode is the octal rendering of
//! the permission bits std exposes (read-only or read-write). The identity
//! number is the volume file index, and owner and group are string SIDs.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::windows::fs::{MetadataExt, OpenOptionsExt};
use std::path::Path;

use super::{EntryAccessError, EntryKind, StatBundle, StatProvider};
use crate::record::{Mode, Principal};

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_EPOCH_OFFSET: i64 = 11_644_473_600;

/// FILETIME ticks (100 ns) per second.
const FILETIME_TICKS_PER_SECOND: u64 = 10_000_000;

const READ_CONTROL: u32 = 0x0002_0000;
const FILE_READ_ATTRIBUTES: u32 = 0x0080;
/// Needed to open directories.
const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;
/// Opens a link itself instead of its target.
const FILE_FLAG_OPEN_REPARSE_POINT: u32 = 0x0020_0000;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsStatProvider;

impl StatProvider for WindowsStatProvider {
    fn stat(&self, path: &Path) -> Result<StatBundle, EntryAccessError> {
        let meta = fs::symlink_metadata(path)?;
        let kind = EntryKind::from(meta.file_type());
        let last_write = filetime_to_unix(meta.last_write_time());
        let identity = query_handle(&open_for_query(path)?)?;

        Ok(StatBundle {
            kind,
            identity_number: identity.file_index,
            mode: Mode::Text(octal_mode(
                meta.permissions().readonly(),
                kind == EntryKind::Directory,
            )),
            owner_id: Principal::Sid(identity.owner),
            group_id: Principal::Sid(identity.group),
            size_bytes: i64::try_from(meta.file_size()).unwrap_or(i64::MAX),
            access_time: filetime_to_unix(meta.last_access_time()),
            modify_time: last_write,
            change_time: last_write,
            birth_time: filetime_to_unix(meta.creation_time()),
        })
    }
}

/// Opens `path` for attribute and security queries only, without following links.
fn open_for_query(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .access_mode(READ_CONTROL | FILE_READ_ATTRIBUTES)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT)
        .open(path)
}

#[derive(Debug)]
struct HandleIdentity {
    file_index: u64,
    owner: String,
    group: String,
}

/// Reads the file index and the owner and group SIDs of an open handle.
#[allow(unsafe_code)]
fn query_handle(file: &File) -> io::Result<HandleIdentity> {
    use std::os::windows::io::AsRawHandle;

    use windows::Win32::Foundation::{HANDLE, HLOCAL, LocalFree, PSID};
    use windows::Win32::Security::Authorization::{
        ConvertSidToStringSidW, GetSecurityInfo, SE_FILE_OBJECT,
    };
    use windows::Win32::Security::{
        GROUP_SECURITY_INFORMATION, OWNER_SECURITY_INFORMATION, PSECURITY_DESCRIPTOR,
    };
    use windows::Win32::Storage::FileSystem::{
        BY_HANDLE_FILE_INFORMATION, GetFileInformationByHandle,
    };
    use windows::core::PWSTR;

    fn sid_string(sid: PSID) -> io::Result<String> {
        let mut text = PWSTR::null();
        // SAFETY: `sid` points into a live security descriptor.
        unsafe { ConvertSidToStringSidW(sid, &mut text) }?;
        // SAFETY: on success `text` is a NUL-terminated string allocated with LocalAlloc.
        let converted = unsafe { text.to_string() }
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
        // SAFETY: `text` is not used after this.
        let _ = unsafe { LocalFree(HLOCAL(text.0.cast())) };
        converted
    }

    let handle = HANDLE(file.as_raw_handle());

    let mut info = BY_HANDLE_FILE_INFORMATION::default();
    // SAFETY: `handle` stays open while `file` is borrowed; `info` is a valid out pointer.
    unsafe { GetFileInformationByHandle(handle, &mut info) }?;
    let file_index = (u64::from(info.nFileIndexHigh) << 32) | u64::from(info.nFileIndexLow);

    let mut owner = PSID::default();
    let mut group = PSID::default();
    let mut descriptor = PSECURITY_DESCRIPTOR::default();
    // SAFETY: all out pointers are valid. `owner` and `group` point into
    // `descriptor`, which is freed once both are converted.
    unsafe {
        GetSecurityInfo(
            handle,
            SE_FILE_OBJECT,
            OWNER_SECURITY_INFORMATION | GROUP_SECURITY_INFORMATION,
            Some(&raw mut owner),
            Some(&raw mut group),
            None,
            None,
            Some(&raw mut descriptor),
        )
    }
    .ok()?;

    let sids = sid_string(owner).and_then(|owner| Ok((owner, sid_string(group)?)));
    // SAFETY: `descriptor` came from GetSecurityInfo and nothing points into it anymore.
    let _ = unsafe { LocalFree(HLOCAL(descriptor.0)) };
    let (owner, group) = sids?;

    Ok(HandleIdentity {
        file_index,
        owner,
        group,
    })
}

fn filetime_to_unix(filetime: u64) -> i64 {
    let seconds = i64::try_from(filetime / FILETIME_TICKS_PER_SECOND).unwrap_or(i64::MAX);
    seconds - FILETIME_EPOCH_OFFSET
}

fn octal_mode(readonly: bool, directory: bool) -> String {
    let mut perm = if readonly { 0o444 } else { 0o666 };
    if directory {
        perm |= 0o111;
    }
    format!("{perm:04o}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filetime_epoch_maps_to_unix_epoch() {
        assert_eq!(filetime_to_unix(116_444_736_000_000_000), 0);
    }

    #[test]
    fn octal_mode_matches_permission_bits() {
        assert_eq!(octal_mode(false, false), "0666");
        assert_eq!(octal_mode(true, false), "0444");
        assert_eq!(octal_mode(false, true), "0777");
    }

    #[test]
    fn file_reports_index_and_sids() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.bin");
        fs::write(&path, [0u8; 42]).unwrap();

        let bundle = WindowsStatProvider.stat(&path).unwrap();

        assert_eq!(bundle.kind, EntryKind::File);
        assert_eq!(bundle.size_bytes, 42);
        assert_ne!(bundle.identity_number, 0);
        let Principal::Sid(owner) = &bundle.owner_id else {
            panic!("expected a SID owner, got {:?}", bundle.owner_id);
        };
        assert!(owner.starts_with("S-1-"));
        assert_ne!(owner, "S-1-0-0");
        assert!(matches!(&bundle.group_id, Principal::Sid(g) if g.starts_with("S-1-")));
    }

    #[test]
    fn hard_links_share_identity() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::write(&first, "x").unwrap();
        fs::hard_link(&first, &second).unwrap();
        fs::write(temp.path().join("other"), "y").unwrap();

        let a = WindowsStatProvider.stat(&first).unwrap().identity_number;
        let b = WindowsStatProvider.stat(&second).unwrap().identity_number;
        let c = WindowsStatProvider
            .stat(&temp.path().join("other"))
            .unwrap()
            .identity_number;

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn directory_can_be_queried() {
        let temp = tempfile::tempdir().unwrap();
        let bundle = WindowsStatProvider.stat(temp.path()).unwrap();
        assert_eq!(bundle.kind, EntryKind::Directory);
        assert_eq!(bundle.mode, Mode::Text("0777".into()));
    }
}
