//! Sinks for entries skipped during collection.
//!
//! The side log lives next to the body file as `<output>.errors.log` and gets
//! one `[timestamp] path: error` line per skipped entry. It is opened once per
//! run, passed explicitly to the collector, and flushed when finished or
//! dropped.

use std::ffi::OsString;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::stat::EntryAccessError;

/// Receives per-entry failures.
pub trait ErrorSink {
    fn record(&mut self, path: &Path, error: &EntryAccessError);
}

/// A skipped entry kept in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub message: String,
}

impl ErrorSink for Vec<SkippedEntry> {
    fn record(&mut self, path: &Path, error: &EntryAccessError) {
        self.push(SkippedEntry {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }
}

/// Append-only diagnostic log for one producer run.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    entries: usize,
}

impl ErrorLog {
    /// Returns the side log path for a body file.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = OsString::from(output.as_os_str());
        name.push(".errors.log");
        PathBuf::from(name)
    }

    /// Opens (or creates) the side log for `output` in append mode.
    pub fn open(output: &Path) -> io::Result<Self> {
        let path = Self::path_for(output);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            entries: 0,
        })
    }

    /// A log that only counts entries.
    pub fn disabled() -> Self {
        Self {
            path: PathBuf::new(),
            writer: None,
            entries: 0,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.writer.as_ref().map(|_| self.path.as_path())
    }

    /// Writes entries that were collected before the log existed.
    pub fn replay(&mut self, skipped: &[SkippedEntry]) {
        for entry in skipped {
            self.append(&entry.path, &entry.message);
        }
    }

    /// Flushes and closes the log, returning the number of recorded entries.
    pub fn finish(mut self) -> io::Result<usize> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(self.entries)
    }
}

impl ErrorLog {
    fn append(&mut self, path: &Path, message: &dyn fmt::Display) {
        self.entries += 1;
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Err(e) = writeln!(writer, "[{timestamp}] {}: {message}", path.display()) {
            tracing::warn!(log = ?self.path, error = %e, "failed to write error log");
        }
    }
}

impl ErrorSink for ErrorLog {
    fn record(&mut self, path: &Path, error: &EntryAccessError) {
        self.append(path, error);
    }
}

impl Drop for ErrorLog {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> EntryAccessError {
        EntryAccessError::from(io::Error::from(io::ErrorKind::NotFound))
    }

    #[test]
    fn path_for_appends_suffix() {
        assert_eq!(
            ErrorLog::path_for(Path::new("/cases/host.body")),
            PathBuf::from("/cases/host.body.errors.log")
        );
    }

    #[test]
    fn writes_one_line_per_entry() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("out.body");

        let mut log = ErrorLog::open(&output).unwrap();
        log.record(Path::new("/a"), &not_found());
        log.record(Path::new("/b"), &not_found());
        assert_eq!(log.finish().unwrap(), 2);

        let content = std::fs::read_to_string(ErrorLog::path_for(&output)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].contains("] /a: not found"));
        assert!(lines[1].contains("] /b: "));
    }

    #[test]
    fn reopening_appends() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("out.body");

        for _ in 0..2 {
            let mut log = ErrorLog::open(&output).unwrap();
            log.record(Path::new("/a"), &not_found());
        }

        let content = std::fs::read_to_string(ErrorLog::path_for(&output)).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn disabled_log_only_counts() {
        let mut log = ErrorLog::disabled();
        log.record(Path::new("/a"), &not_found());
        assert!(log.path().is_none());
        assert_eq!(log.finish().unwrap(), 1);
    }

    #[test]
    fn replayed_entries_precede_new_ones() {
        let temp = tempfile::tempdir().unwrap();
        let output = temp.path().join("out.body");
        let mut early: Vec<SkippedEntry> = Vec::new();
        early.record(Path::new("/walk"), &not_found());

        let mut log = ErrorLog::open(&output).unwrap();
        log.replay(&early);
        log.record(Path::new("/stat"), &not_found());
        assert_eq!(log.finish().unwrap(), 2);

        let content = std::fs::read_to_string(ErrorLog::path_for(&output)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].contains("] /walk: not found"));
        assert!(lines[1].contains("] /stat: not found"));
    }
}
