//! Timeline record model shared by the producer and consumer paths.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Checksum placeholder; content hashing is not performed.
pub const CHECKSUM_PLACEHOLDER: &str = "0";

/// Errors raised while decoding a body file line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The line did not split into enough `|`-separated fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A numeric field could not be parsed.
    #[error("invalid {field} value: {value:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Permission and type information of an entry.
///
/// POSIX providers report the raw numeric `st_mode`; Windows providers report
/// an octal string such as `0666`. Consumers must handle both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Numeric mode value, rendered in decimal.
    Bits(u32),
    /// Textual rendering (octal string or any other tool-specific notation).
    Text(String),
}

impl Mode {
    /// Decodes the mode field of a body file line.
    ///
    /// Decimal values without a leading zero become [`Mode::Bits`]; anything
    /// else, including zero-padded octal strings, is kept verbatim.
    pub fn from_field(field: &str) -> Self {
        let zero_padded = field.len() > 1 && field.starts_with('0');
        match field.parse::<u32>() {
            Ok(bits) if !zero_padded => Self::Bits(bits),
            _ => Self::Text(field.to_string()),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits(bits) => write!(f, "{bits}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Owner or group of an entry: a numeric id or a security identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// POSIX uid or gid.
    Id(u32),
    /// Windows SID string, possibly shortened to its last component.
    Sid(String),
}

impl Principal {
    /// Decodes an owner or group field. Purely numeric text becomes an id.
    ///
    /// A short SID is numeric text as well, so it decodes as [`Principal::Id`]
    /// with the same wire rendering.
    pub fn from_field(field: &str) -> Self {
        field
            .parse::<u32>()
            .map_or_else(|_| Self::Sid(field.to_string()), Self::Id)
    }

    /// Returns this principal with a SID truncated to its final component.
    #[must_use]
    pub fn shortened(self) -> Self {
        match self {
            Self::Sid(sid) => Self::Sid(short_sid(&sid).to_string()),
            id @ Self::Id(_) => id,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Sid(sid) => f.write_str(sid),
        }
    }
}

/// Returns the final hyphen-delimited component of a SID (the RID).
pub fn short_sid(sid: &str) -> &str {
    sid.rsplit('-').next().unwrap_or(sid)
}

/// The four timestamp classes of a record, in MACB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampClass {
    Modified,
    Accessed,
    Changed,
    Born,
}

impl TimestampClass {
    /// All classes in MACB order.
    pub const ALL: [Self; 4] = [Self::Modified, Self::Accessed, Self::Changed, Self::Born];

    /// Single-letter MACB code.
    pub const fn letter(self) -> char {
        match self {
            Self::Modified => 'm',
            Self::Accessed => 'a',
            Self::Changed => 'c',
            Self::Born => 'b',
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Accessed => "accessed",
            Self::Changed => "changed",
            Self::Born => "born",
        }
    }

    /// The record's instant for this class, in Unix seconds.
    pub const fn time_of(self, record: &TimelineRecord) -> i64 {
        match self {
            Self::Modified => record.modify_time,
            Self::Accessed => record.access_time,
            Self::Changed => record.change_time,
            Self::Born => record.birth_time,
        }
    }
}

impl fmt::Display for TimestampClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path of a recorded entry, kept as the bytes the filesystem returned.
///
/// On Unix these are the raw name bytes, so names that are not UTF-8 survive
/// the body file unchanged. On Windows they are the WTF-8 encoding of the
/// wide-character path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RecordPath(Vec<u8>);

impl RecordPath {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lossy text form, for diagnostics.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&OsStr> for RecordPath {
    fn from(value: &OsStr) -> Self {
        Self(value.as_encoded_bytes().to_vec())
    }
}

impl From<&Path> for RecordPath {
    fn from(value: &Path) -> Self {
        Self::from(value.as_os_str())
    }
}

impl From<&str> for RecordPath {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<&[u8]> for RecordPath {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<u8>> for RecordPath {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for RecordPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for RecordPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Forensic metadata for one filesystem entry.
///
/// All times are Unix seconds. `path` is kept exactly as walked; `|` and
/// newlines inside it are not escaped when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRecord {
    pub checksum: String,
    pub path: RecordPath,
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

impl TimelineRecord {
    /// Distinct non-zero instants of this record, in MACB order of first
    /// appearance. A zero time means "not recorded".
    pub fn distinct_times(&self) -> Vec<i64> {
        let mut times = Vec::with_capacity(4);
        for class in TimestampClass::ALL {
            let time = class.time_of(self);
            if time != 0 && !times.contains(&time) {
                times.push(time);
            }
        }
        times
    }
}
