//! Lazy body file reader with filtering and a chronological index.
//!
//! Iterating a [`RecordStream`] yields admitted records one line at a time.
//! [`RecordStream::materialize`] drains the remaining input once and builds
//! the timeline: one [`TimestampedEntry`] per distinct non-zero instant of
//! every admitted record, sorted by time.
//!
//! A record is admitted when at least one of its instants satisfies every
//! attached filter. With a scope set, only that class's instant is tested.
//! In strict mode, the timeline keeps only the instants that satisfy the
//! filters themselves; otherwise an admitted record contributes all of them.

use std::io::{self, BufRead};

use thiserror::Error;

use crate::body;
use crate::filter::FilterExpression;
use crate::record::{RecordError, TimelineRecord, TimestampClass};

/// Stream errors.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The underlying reader failed.
    #[error("failed to read line {line}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },

    /// A line could not be decoded as a record.
    #[error("malformed record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: RecordError,
    },

    /// `materialize` was called a second time.
    #[error("stream has already been materialized")]
    AlreadyMaterialized,

    /// The timeline was requested before `materialize`.
    #[error("stream has not been materialized")]
    NotMaterialized,
}

/// One instant of one record, as rendered on a timeline line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampedEntry<'a> {
    /// Unix seconds.
    pub time: i64,
    pub record: &'a TimelineRecord,
}

impl TimestampedEntry<'_> {
    /// Whether `class`'s instant of the record is the rendered instant.
    pub const fn is(&self, class: TimestampClass) -> bool {
        class.time_of(self.record) == self.time
    }
}

#[derive(Debug, Default)]
struct Timeline {
    records: Vec<TimelineRecord>,
    /// `(time, record index)`, sorted.
    events: Vec<(i64, usize)>,
}

/// Forward-only reader over body file records.
#[derive(Debug)]
pub struct RecordStream<R> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
    filters: Vec<FilterExpression>,
    scope: Option<TimestampClass>,
    strict: bool,
    timeline: Option<Timeline>,
}

impl<R: BufRead> RecordStream<R> {
    pub fn open(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line: 0,
            filters: Vec::new(),
            scope: None,
            strict: false,
            timeline: None,
        }
    }

    /// Attaches a filter. Multiple filters must all match.
    pub fn add_filter(&mut self, filter: FilterExpression) {
        tracing::debug!(filter = %filter, "filter attached");
        self.filters.push(filter);
    }

    /// Restricts filter evaluation to one timestamp class.
    pub const fn set_scope(&mut self, scope: Option<TimestampClass>) {
        self.scope = scope;
    }

    /// Drops timeline instants that do not satisfy the filters themselves.
    pub const fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub const fn is_filtered(&self) -> bool {
        !self.filters.is_empty()
    }

    fn passes(&self, instant: i64) -> bool {
        self.filters.iter().all(|f| f.matches(instant))
    }

    fn admits(&self, record: &TimelineRecord) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        match self.scope {
            Some(class) => self.passes(class.time_of(record)),
            None => record.distinct_times().into_iter().any(|t| self.passes(t)),
        }
    }

    fn keeps_instant(&self, record: &TimelineRecord, instant: i64) -> bool {
        if !self.strict || self.filters.is_empty() {
            return true;
        }
        match self.scope {
            Some(class) => class.time_of(record) == instant && self.passes(instant),
            None => self.passes(instant),
        }
    }

    /// Reads the rest of the input, indexes it, and returns the number of
    /// admitted records. Only one call per stream is allowed.
    pub fn materialize(&mut self) -> Result<usize, StreamError> {
        if self.timeline.is_some() {
            return Err(StreamError::AlreadyMaterialized);
        }

        let mut timeline = Timeline::default();
        while let Some(record) = self.next() {
            let record = record?;
            let index = timeline.records.len();
            for time in record.distinct_times() {
                if self.keeps_instant(&record, time) {
                    timeline.events.push((time, index));
                }
            }
            timeline.records.push(record);
        }
        timeline.events.sort_unstable();

        let count = timeline.records.len();
        tracing::debug!(
            records = count,
            events = timeline.events.len(),
            "stream materialized"
        );
        self.timeline = Some(timeline);
        Ok(count)
    }

    /// The materialized timeline in ascending time order; ties keep input order.
    pub fn entries(&self) -> Result<impl Iterator<Item = TimestampedEntry<'_>>, StreamError> {
        let timeline = self.timeline.as_ref().ok_or(StreamError::NotMaterialized)?;
        Ok(timeline
            .events
            .iter()
            .map(|&(time, index)| TimestampedEntry {
                time,
                record: &timeline.records[index],
            }))
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = Result<TimelineRecord, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'\n', &mut self.buf);
            self.line += 1;
            match read {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(StreamError::Read {
                        line: self.line,
                        source,
                    }));
                }
            }
            let line = self.buf.strip_suffix(b"\n").unwrap_or(self.buf.as_slice());
            if body::is_ignorable(line) {
                continue;
            }
            let record = match body::parse_line(line) {
                Ok(record) => record,
                Err(source) => {
                    return Some(Err(StreamError::Malformed {
                        line: self.line,
                        source,
                    }));
                }
            };
            if self.admits(&record) {
                return Some(Ok(record));
            }
        }
    }
}
