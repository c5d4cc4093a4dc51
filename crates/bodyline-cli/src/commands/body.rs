//! `body`: walk a directory and write a body file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use bodyline_core::body::write_record;
use bodyline_core::{Collector, ErrorLog, PlatformStatProvider, SkippedEntry};
use fs2::FileExt;
use thiserror::Error;

use crate::Config;
use crate::cli::BodyArgs;
use crate::commands::prompt::confirm;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("directory does not exist: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("not overwriting {}", .0.display())]
    OverwriteDeclined(PathBuf),

    #[error("failed to open output {}", path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BodyError {
    /// Every producer failure is a precondition or output failure.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::MissingRoot(_)
            | Self::OverwriteDeclined(_)
            | Self::OutputOpen { .. }
            | Self::Write { .. } => 1,
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodySummary {
    pub records: usize,
    pub skipped: usize,
    pub error_log: Option<PathBuf>,
}

/// Collects `args.directory` into `args.output`.
///
/// An existing output is removed only after confirmation read from `input`
/// (or with `--force`); the question goes to `prompt`.
pub fn run<R: BufRead, W: Write>(
    args: &BodyArgs,
    config: &Config,
    input: &mut R,
    prompt: &mut W,
) -> Result<BodySummary, BodyError> {
    if !args.directory.exists() {
        return Err(BodyError::MissingRoot(args.directory.clone()));
    }

    if args.output.exists() {
        let question = format!("{} already exists. Delete it?", args.output.display());
        let accepted = args.force
            || confirm(input, prompt, &question).map_err(|source| BodyError::OutputOpen {
                path: args.output.clone(),
                source,
            })?;
        if !accepted {
            return Err(BodyError::OverwriteDeclined(args.output.clone()));
        }
        fs::remove_file(&args.output).map_err(|source| BodyError::OutputOpen {
            path: args.output.clone(),
            source,
        })?;
        tracing::debug!(path = ?args.output, "removed existing output");
    }

    // The output and its side log must not exist yet when the tree is walked.
    let collector = Collector::new(PlatformStatProvider).short_sid(args.sid || config.short_sid);
    let mut walk_errors: Vec<SkippedEntry> = Vec::new();
    let plan = collector.walk(&args.directory, &mut walk_errors);

    let file = open_output(&args.output)?;
    let mut log = if config.error_log {
        ErrorLog::open(&args.output).map_err(|source| BodyError::OutputOpen {
            path: ErrorLog::path_for(&args.output),
            source,
        })?
    } else {
        ErrorLog::disabled()
    };
    let error_log = log.path().map(Path::to_path_buf);
    log.replay(&walk_errors);

    let records = collector.describe_plan(&plan, &mut log);

    let write_err = |source| BodyError::Write {
        path: args.output.clone(),
        source,
    };
    let mut writer = BufWriter::new(&file);
    for record in &records {
        write_record(&mut writer, record).map_err(write_err)?;
    }
    writer.flush().map_err(write_err)?;

    let skipped = log.finish().map_err(|source| BodyError::Write {
        path: ErrorLog::path_for(&args.output),
        source,
    })?;

    tracing::debug!(records = records.len(), skipped, "body file written");
    Ok(BodySummary {
        records: records.len(),
        skipped,
        error_log: error_log.filter(|_| skipped > 0),
    })
}

/// Opens the body file for appending and takes an exclusive lock on it.
fn open_output(path: &Path) -> Result<File, BodyError> {
    let open_err = |source| BodyError::OutputOpen {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_err)?;
    file.lock_exclusive().map_err(open_err)?;
    Ok(file)
}

/// Prints a one-line summary of a run.
pub fn report<W: Write>(output: &mut W, args: &BodyArgs, summary: &BodySummary) -> io::Result<()> {
    write!(
        output,
        "Wrote {} records to {}",
        summary.records,
        args.output.display()
    )?;
    match &summary.error_log {
        Some(log) => writeln!(output, " ({} skipped, see {})", summary.skipped, log.display()),
        None if summary.skipped > 0 => writeln!(output, " ({} skipped)", summary.skipped),
        None => writeln!(output),
    }
}
