//! Body file codec (TSK 3.x layout).
//!
//! ```text
//! checksum|path|identity_number|mode|owner_id|group_id|size|atime|mtime|ctime|crtime
//! ```
//!
//! Times are decimal Unix seconds. Lines starting with `#` are comments.
//! Paths are written as raw bytes, so names that are not valid UTF-8 survive
//! a write and read unchanged. A path containing `|` or a newline produces a
//! line other tools may split differently. The reader tolerates extra `|`
//! inside the path field by anchoring the nine trailing fields from the right.

use std::borrow::Cow;
use std::io::{self, Write};

use crate::record::{Mode, Principal, RecordError, RecordPath, TimelineRecord};

/// Number of fields in a body file line.
pub const FIELD_COUNT: usize = 11;

/// Fields after the path.
const TRAILING_FIELDS: usize = 9;

/// Renders a record as a body file line, including the trailing newline.
///
/// The path is copied byte for byte; every other field is ASCII text.
pub fn serialize(record: &TimelineRecord) -> Vec<u8> {
    let path = record.path.as_bytes();
    let mut line = Vec::with_capacity(record.checksum.len() + path.len() + 96);
    line.extend_from_slice(record.checksum.as_bytes());
    line.push(b'|');
    line.extend_from_slice(path);
    line.extend_from_slice(
        format!(
            "|{}|{}|{}|{}|{}|{}|{}|{}|{}\n",
            record.identity_number,
            record.mode,
            record.owner_id,
            record.group_id,
            record.size_bytes,
            record.access_time,
            record.modify_time,
            record.change_time,
            record.birth_time,
        )
        .as_bytes(),
    );
    line
}

/// Appends one serialized record to `writer`.
pub fn write_record<W: Write>(writer: &mut W, record: &TimelineRecord) -> io::Result<()> {
    writer.write_all(&serialize(record))
}

/// Returns `true` for lines the reader skips (blank lines and `#` comments).
pub fn is_ignorable(line: &[u8]) -> bool {
    line.starts_with(b"#") || line.trim_ascii().is_empty()
}

/// Parses one body file line (without its newline) into a record.
pub fn parse_line(line: &[u8]) -> Result<TimelineRecord, RecordError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let fields: Vec<&[u8]> = line.split(|b| *b == b'|').collect();
    if fields.len() < FIELD_COUNT {
        return Err(RecordError::FieldCount {
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let tail_start = fields.len() - TRAILING_FIELDS;
    let path = fields[1..tail_start].join(&b'|');
    let tail: Vec<Cow<'_, str>> = fields[tail_start..]
        .iter()
        .map(|field| String::from_utf8_lossy(field))
        .collect();

    Ok(TimelineRecord {
        checksum: String::from_utf8_lossy(fields[0]).into_owned(),
        path: RecordPath::from(path),
        identity_number: number("identity number", &tail[0])?,
        mode: Mode::from_field(&tail[1]),
        owner_id: Principal::from_field(&tail[2]),
        group_id: Principal::from_field(&tail[3]),
        size_bytes: number("size", &tail[4])?,
        access_time: number("atime", &tail[5])?,
        modify_time: number("mtime", &tail[6])?,
        change_time: number("ctime", &tail[7])?,
        birth_time: number("crtime", &tail[8])?,
    })
}

fn number<T>(field: &'static str, value: &str) -> Result<T, RecordError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    value
        .trim()
        .parse()
        .map_err(|source| RecordError::InvalidNumber {
            field,
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CHECKSUM_PLACEHOLDER;

    fn sample() -> TimelineRecord {
        TimelineRecord {
            checksum: CHECKSUM_PLACEHOLDER.to_string(),
            path: "/evidence/notes.txt".into(),
            identity_number: 1_048_602,
            mode: Mode::Bits(33188),
            owner_id: Principal::Id(1000),
            group_id: Principal::Id(100),
            size_bytes: 42,
            access_time: 1_750_340_855,
            modify_time: 1_750_340_800,
            change_time: 1_750_340_801,
            birth_time: 1_750_000_000,
        }
    }

    #[test]
    fn serializes_fields_in_fixed_order() {
        assert_eq!(
            serialize(&sample()),
            b"0|/evidence/notes.txt|1048602|33188|1000|100|42|1750340855|1750340800|1750340801|1750000000\n"
        );
    }

    #[test]
    fn parses_what_it_serializes() {
        let record = sample();
        let line = serialize(&record);
        assert_eq!(parse_line(line.trim_ascii_end()).unwrap(), record);
    }

    #[test]
    fn boundary_values_survive_parse() {
        let record = TimelineRecord {
            identity_number: u64::MAX,
            size_bytes: 0,
            access_time: 0,
            modify_time: -1,
            change_time: i64::MIN,
            birth_time: i64::MAX,
            mode: Mode::Text("0666".into()),
            owner_id: Principal::Sid("S-1-5-21-1004336348-1177238915-682003330-512".into()),
            group_id: Principal::Sid("S-1-5-32-544".into()),
            ..sample()
        };
        let line = serialize(&record);
        assert_eq!(parse_line(line.trim_ascii_end()).unwrap(), record);
    }

    #[test]
    fn windows_line_is_read() {
        let record =
            parse_line(b"0|C:\\Users\\a.txt|281474976710700|0666|S-1-5-18|S-1-5-32-544|10|1|2|2|0\r")
                .unwrap();
        assert_eq!(record.path, "C:\\Users\\a.txt");
        assert_eq!(record.mode, Mode::Text("0666".into()));
        assert_eq!(record.owner_id, Principal::Sid("S-1-5-18".into()));
        assert_eq!(record.birth_time, 0);
    }

    #[test]
    fn pipe_in_path_is_kept_in_path() {
        let record = parse_line(b"0|/tmp/a|b|1|33188|0|0|0|1|2|3|4").unwrap();
        assert_eq!(record.path, "/tmp/a|b");
        assert_eq!(record.identity_number, 1);
        assert_eq!(record.birth_time, 4);
    }

    #[test]
    fn non_utf8_path_is_written_and_read_as_bytes() {
        let record = TimelineRecord {
            path: RecordPath::from(&b"/evidence/caf\xE9.txt"[..]),
            ..sample()
        };
        let line = serialize(&record);
        assert!(line.starts_with(b"0|/evidence/caf\xE9.txt|1048602|"));

        let parsed = parse_line(line.trim_ascii_end()).unwrap();
        assert_eq!(parsed.path.as_bytes(), b"/evidence/caf\xE9.txt");
        assert_eq!(parsed, record);
    }

    #[test]
    fn non_utf8_number_is_rejected() {
        let err = parse_line(b"0|/a|1|33188|0|0|\xFF|1|2|3|4").unwrap_err();
        assert!(matches!(err, RecordError::InvalidNumber { field: "size", .. }));
    }

    #[test]
    fn short_line_is_rejected() {
        let err = parse_line(b"0|/tmp/a|1|33188").unwrap_err();
        assert_eq!(
            err,
            RecordError::FieldCount {
                expected: 11,
                found: 4
            }
        );
    }

    #[test]
    fn non_numeric_time_is_rejected() {
        let err = parse_line(b"0|/a|1|33188|0|0|0|x|2|3|4").unwrap_err();
        assert!(matches!(err, RecordError::InvalidNumber { field: "atime", .. }));
    }

    #[test]
    fn comments_and_blank_lines_are_ignorable() {
        assert!(is_ignorable(b"# generated by bodyline"));
        assert!(is_ignorable(b"   "));
        assert!(!is_ignorable(b"0|/a|1|33188|0|0|0|1|2|3|4"));
    }

    #[test]
    fn write_record_appends_line() {
        let mut out = Vec::new();
        write_record(&mut out, &sample()).unwrap();
        write_record(&mut out, &sample()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}
