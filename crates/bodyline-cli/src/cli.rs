//! Command-line argument definitions.

use std::path::PathBuf;

use bodyline_core::TimestampClass;
use clap::{ArgGroup, Args, Parser, Subcommand};

/// Forensic filesystem timelines.
///
/// `body` walks a directory and writes one body file record per entry.
/// `process` reads body file records and prints a MACB timeline.
#[derive(Debug, Parser)]
#[command(name = "bodyline", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collect filesystem metadata into a body file.
    Body(BodyArgs),

    /// Render a MACB timeline from a body file.
    Process(ProcessArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BodyArgs {
    /// Directory to walk.
    #[arg(short, long)]
    pub directory: PathBuf,

    /// Body file to write.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Keep only the last component of owner and group SIDs.
    #[arg(long)]
    pub sid: bool,

    /// Overwrite an existing output file without asking.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Args)]
#[command(group(
    ArgGroup::new("selection")
        .args(["filter", "modified", "access", "ctime"])
        .multiple(false)
))]
pub struct ProcessArgs {
    /// Body file to read; `-` or omitted reads standard input.
    pub input: Option<PathBuf>,

    /// Only annotate timestamps that match the filter themselves.
    #[arg(long)]
    pub strict: bool,

    /// Filter applied to every timestamp of a record.
    #[arg(long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// Filter applied to modification times only.
    #[arg(long, value_name = "EXPR")]
    pub modified: Option<String>,

    /// Filter applied to access times only.
    #[arg(long, value_name = "EXPR")]
    pub access: Option<String>,

    /// Filter applied to change times only.
    #[arg(long, value_name = "EXPR")]
    pub ctime: Option<String>,
}

impl ProcessArgs {
    /// The selected filter and the timestamp class it is scoped to.
    pub fn selection(&self) -> Option<(&str, Option<TimestampClass>)> {
        let scoped = [
            (&self.modified, TimestampClass::Modified),
            (&self.access, TimestampClass::Accessed),
            (&self.ctime, TimestampClass::Changed),
        ];
        self.filter
            .as_deref()
            .map(|f| (f, None))
            .or_else(|| {
                scoped
                    .into_iter()
                    .find_map(|(expr, class)| expr.as_deref().map(|e| (e, Some(class))))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("bodyline").chain(args.iter().copied()))
    }

    fn process(args: &[&str]) -> ProcessArgs {
        match parse(args).unwrap().command {
            Some(Commands::Process(args)) => args,
            other => panic!("expected process, got {other:?}"),
        }
    }

    #[test]
    fn body_requires_directory_and_output() {
        assert!(parse(&["body", "--directory", "/tmp"]).is_err());
        let cli = parse(&["body", "-d", "/tmp", "-o", "out.body", "--sid"]).unwrap();
        let Some(Commands::Body(args)) = cli.command else {
            panic!("expected body");
        };
        assert_eq!(args.directory, PathBuf::from("/tmp"));
        assert!(args.sid);
        assert!(!args.force);
    }

    #[test]
    fn filters_are_mutually_exclusive() {
        let err = parse(&["process", "--filter", "hour > 1", "--ctime", "hour > 2"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn selection_reports_scope() {
        assert_eq!(process(&["process"]).selection(), None);
        assert_eq!(
            process(&["process", "--filter", "hour > 1"]).selection(),
            Some(("hour > 1", None))
        );
        assert_eq!(
            process(&["process", "--access", "day == 1", "in.body"]).selection(),
            Some(("day == 1", Some(TimestampClass::Accessed)))
        );
        assert_eq!(
            process(&["process", "--modified", "year == 2025"]).selection(),
            Some(("year == 2025", Some(TimestampClass::Modified)))
        );
    }
}
