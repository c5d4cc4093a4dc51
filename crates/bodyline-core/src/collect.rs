//! Directory walk producing one timeline record per entry.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errlog::ErrorSink;
use crate::record::{CHECKSUM_PLACEHOLDER, RecordPath, TimelineRecord};
use crate::stat::{EntryAccessError, StatBundle, StatProvider};

/// Paths discovered by the walk, split by kind in visit order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkPlan {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
}

impl WalkPlan {
    /// Files first, then directories.
    pub fn ordered(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .chain(self.directories.iter())
            .map(PathBuf::as_path)
    }
}

/// Walks a directory tree and describes every entry through a [`StatProvider`].
#[derive(Debug, Clone)]
pub struct Collector<P> {
    provider: P,
    short_sid: bool,
}

impl<P: StatProvider> Collector<P> {
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            short_sid: false,
        }
    }

    /// Truncate SID owners and groups to their last component.
    #[must_use]
    pub const fn short_sid(mut self, enabled: bool) -> Self {
        self.short_sid = enabled;
        self
    }

    /// Lists every entry under `root` (root included) without following links.
    ///
    /// Entries the walk cannot read are reported to `sink` and skipped.
    pub fn walk(&self, root: &Path, sink: &mut dyn ErrorSink) -> WalkPlan {
        let mut plan = WalkPlan::default();
        let walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    plan.directories.push(entry.into_path());
                }
                Ok(entry) => plan.files.push(entry.into_path()),
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    let err = EntryAccessError::from(err);
                    tracing::warn!(path = ?path, error = %err, "failed to access path");
                    sink.record(&path, &err);
                }
            }
        }

        tracing::debug!(
            files = plan.files.len(),
            directories = plan.directories.len(),
            "walk complete"
        );
        plan
    }

    /// Collects records for every entry under `root`: all files, then all
    /// directories.
    pub fn collect(&self, root: &Path, sink: &mut dyn ErrorSink) -> Vec<TimelineRecord> {
        let plan = self.walk(root, sink);
        self.describe_plan(&plan, sink)
    }

    /// Describes the entries of an earlier walk in [`WalkPlan::ordered`] order.
    ///
    /// Entries that vanished or became unreadable since the walk are reported
    /// to `sink` and skipped.
    pub fn describe_plan(&self, plan: &WalkPlan, sink: &mut dyn ErrorSink) -> Vec<TimelineRecord> {
        plan.ordered()
            .filter_map(|path| match self.describe(path) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(path = ?path, error = %err, "skipping entry");
                    sink.record(path, &err);
                    None
                }
            })
            .collect()
    }

    /// Builds the record for one path from a single provider call.
    pub fn describe(&self, path: &Path) -> Result<TimelineRecord, EntryAccessError> {
        let bundle = self.provider.stat(path)?;
        Ok(self.to_record(path, bundle))
    }

    fn to_record(&self, path: &Path, bundle: StatBundle) -> TimelineRecord {
        let (owner_id, group_id) = if self.short_sid {
            (bundle.owner_id.shortened(), bundle.group_id.shortened())
        } else {
            (bundle.owner_id, bundle.group_id)
        };

        TimelineRecord {
            checksum: CHECKSUM_PLACEHOLDER.to_string(),
            path: RecordPath::from(path),
            identity_number: bundle.identity_number,
            mode: bundle.mode,
            owner_id,
            group_id,
            size_bytes: bundle.size_bytes,
            access_time: bundle.access_time,
            modify_time: bundle.modify_time,
            change_time: bundle.change_time,
            birth_time: bundle.birth_time,
        }
    }
}
