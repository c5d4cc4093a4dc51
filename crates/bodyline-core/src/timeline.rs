//! MACB timeline rendering.

use std::fmt::{self, Write as _};
use std::io::{self, Write};

use chrono::{DateTime, Duration, Utc};

use crate::record::TimestampClass;
use crate::stream::TimestampedEntry;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which timestamp classes of a record equal the rendered instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Macb([bool; 4]);

impl Macb {
    pub fn of(entry: &TimestampedEntry<'_>) -> Self {
        Self(TimestampClass::ALL.map(|class| entry.is(class)))
    }
}

impl fmt::Display for Macb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (class, hit) in TimestampClass::ALL.iter().zip(self.0) {
            f.write_char(if hit { class.letter() } else { '.' })?;
        }
        Ok(())
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC; out-of-range values fall back to the raw seconds.
pub fn format_instant(seconds: i64) -> String {
    DateTime::from_timestamp(seconds, 0).map_or_else(
        || seconds.to_string(),
        |dt| dt.format(TIME_FORMAT).to_string(),
    )
}

/// Writes `<instant> <macb> <path>\n`, copying the path bytes unchanged.
pub fn write_line<W: Write>(writer: &mut W, entry: &TimestampedEntry<'_>) -> io::Result<()> {
    write!(writer, "{} {} ", format_instant(entry.time), Macb::of(entry))?;
    writer.write_all(entry.record.path.as_bytes())?;
    writer.write_all(b"\n")
}

/// Writes timeline lines, optionally restricted to one timestamp class.
#[derive(Debug, Clone, Copy, Default)]
pub struct Emitter {
    scope: Option<TimestampClass>,
}

impl Emitter {
    pub const fn new(scope: Option<TimestampClass>) -> Self {
        Self { scope }
    }

    /// Emits one line per entry and returns how many were written.
    ///
    /// Entries are written in the order given. With a scope, entries where
    /// the scoped class does not equal the rendered instant are skipped.
    pub fn emit<'a, W, I>(&self, writer: &mut W, entries: I) -> io::Result<usize>
    where
        W: Write,
        I: IntoIterator<Item = TimestampedEntry<'a>>,
    {
        let mut written = 0;
        for entry in entries {
            if self.scope.is_some_and(|class| !entry.is(class)) {
                continue;
            }
            write_line(writer, &entry)?;
            written += 1;
        }
        Ok(written)
    }
}

/// Filter examples relative to `now`, shown in usage text.
pub fn filter_examples(now: DateTime<Utc>) -> String {
    let hour_ago = (now - Duration::hours(1)).format(TIME_FORMAT);
    format!(
        "\
Filter examples:
  --filter 'date > \"{hour_ago}\"'                  last hour
  --filter 'date >= \"2025-06-01\" && date < \"2025/07/01\"'
  --filter 'hour >= 9 && hour < 17 && weekday != \"Sunday\"'
  --modified 'year == 2025 && month == 6'
  --access '!(weekday == \"Saturday\" || weekday == \"Sunday\")'"
    )
}

/// Explains the filter language after a filter matched nothing.
pub fn filter_help(filter: &str, now: DateTime<Utc>) -> String {
    format!(
        "\
No timeline entries matched filter: {filter}

Fields are taken from each timestamp in UTC:
  date      Unix seconds; quoted literals \"YYYY-MM-DD[ HH:MM[:SS]]\" are converted
  year month day hour minute second
  weekday   \"Monday\", \"mon\", ... or 0-6 with Sunday = 0
Operators: == != < <= > >=, combined with && || ! and parentheses.

Note: clock fields are wall-clock values, not ages. 'hour < 1' selects
timestamps between midnight and 1 AM, not the last hour.

{}
",
        filter_examples(now)
    )
}
