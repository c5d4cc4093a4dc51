//! `process`: read a body file and print its MACB timeline.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use bodyline_core::filter::{self, FilterError, FilterExpression};
use bodyline_core::timeline::{Emitter, filter_help};
use bodyline_core::{RecordStream, StreamError};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::Config;
use crate::cli::ProcessArgs;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("no input: pass a body file or pipe one on standard input")]
    NoInput,

    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("failed to read body file")]
    Materialize(#[source] StreamError),

    #[error("failed to write timeline")]
    Emit(#[source] io::Error),
}

impl ProcessError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NoInput | Self::Open { .. } => 1,
            Self::Filter(_) => 2,
            Self::Materialize(_) => 3,
            Self::Emit(_) => 4,
        }
    }
}

/// Where records are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    /// A file argument wins; `-` means stdin; otherwise stdin is used only
    /// when it is not a terminal.
    pub fn select(arg: Option<&Path>, stdin_is_terminal: bool) -> Result<Self, ProcessError> {
        match arg {
            Some(path) if path == Path::new("-") => Ok(Self::Stdin),
            Some(path) => Ok(Self::File(path.to_path_buf())),
            None if stdin_is_terminal => Err(ProcessError::NoInput),
            None => Ok(Self::Stdin),
        }
    }

    pub fn open(&self) -> Result<Box<dyn BufRead>, ProcessError> {
        match self {
            Self::Stdin => Ok(Box::new(io::stdin().lock())),
            Self::File(path) => {
                let file = File::open(path).map_err(|source| ProcessError::Open {
                    path: path.clone(),
                    source,
                })?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

/// Renders the timeline of `reader` to `output` and returns the number of
/// lines written.
///
/// A filter that produces no lines is not an error: the filter help goes to
/// `diagnostics` instead.
pub fn run<R: BufRead, W: Write, E: Write>(
    args: &ProcessArgs,
    config: &Config,
    reader: R,
    output: &mut W,
    diagnostics: &mut E,
    now: DateTime<Utc>,
) -> Result<usize, ProcessError> {
    let mut stream = RecordStream::open(reader);
    stream.set_strict(args.strict || config.strict);

    let selection = args.selection();
    let scope = selection.and_then(|(_, scope)| scope);
    if let Some((raw, _)) = selection {
        let compiled = filter::compile(raw)?;
        tracing::debug!(raw, compiled, scope = ?scope, "filter compiled");
        stream.add_filter(FilterExpression::parse(&compiled)?);
        stream.set_scope(scope);
    }

    let records = stream.materialize().map_err(ProcessError::Materialize)?;
    let entries = stream.entries().map_err(ProcessError::Materialize)?;
    let lines = Emitter::new(scope)
        .emit(output, entries)
        .map_err(ProcessError::Emit)?;
    output.flush().map_err(ProcessError::Emit)?;
    tracing::debug!(records, lines, "timeline written");

    if lines == 0 {
        if let Some((raw, _)) = selection {
            write!(diagnostics, "{}", filter_help(raw, now)).map_err(ProcessError::Emit)?;
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::TimeZone;
    use insta::assert_snapshot;

    use super::*;

    const BODY: &str = "\
0|/srv/app.log|11|33188|0|0|42|1750340855|1750340855|1750340855|1750340855
0|/srv/old.txt|12|33188|0|0|7|1718711255|1718700000|1718700000|1718600000
0|/srv|10|16877|0|0|4096|1750300000|1750000000|1750000000|1718600000
";

    fn args() -> ProcessArgs {
        ProcessArgs {
            input: None,
            strict: false,
            filter: None,
            modified: None,
            access: None,
            ctime: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 19, 14, 0, 0).unwrap()
    }

    fn process(args: &ProcessArgs, input: &str) -> (Result<usize, ProcessError>, String, String) {
        let mut output = Vec::new();
        let mut diagnostics = Vec::new();
        let result = run(
            args,
            &Config::default(),
            Cursor::new(input),
            &mut output,
            &mut diagnostics,
            now(),
        );
        (
            result,
            String::from_utf8(output).unwrap(),
            String::from_utf8(diagnostics).unwrap(),
        )
    }

    #[test]
    fn unfiltered_timeline() {
        let (result, output, diagnostics) = process(&args(), BODY);
        assert_eq!(result.unwrap(), 7);
        assert!(diagnostics.is_empty());
        assert_snapshot!(output, @r"
        2024-06-17 04:53:20 ...b /srv/old.txt
        2024-06-17 04:53:20 ...b /srv
        2024-06-18 08:40:00 m.c. /srv/old.txt
        2024-06-18 11:47:35 .a.. /srv/old.txt
        2025-06-15 15:06:40 m.c. /srv
        2025-06-19 02:26:40 .a.. /srv
        2025-06-19 13:47:35 macb /srv/app.log
        ");
    }

    #[test]
    fn modified_scope_with_date_literal() {
        let mut args = args();
        args.modified = Some(r#"date >= "2025/06/01""#.to_string());
        let (result, output, _) = process(&args, BODY);
        assert_eq!(result.unwrap(), 2);
        assert_snapshot!(output, @r"
        2025-06-15 15:06:40 m.c. /srv
        2025-06-19 13:47:35 macb /srv/app.log
        ");
    }

    #[test]
    fn strict_hides_non_matching_instants() {
        let mut args = args();
        args.filter = Some(r#"date > "2025-06-19""#.to_string());
        args.strict = true;
        let (_, output, _) = process(&args, BODY);
        assert_snapshot!(output, @r"
        2025-06-19 02:26:40 .a.. /srv
        2025-06-19 13:47:35 macb /srv/app.log
        ");
    }

    #[test]
    fn no_match_prints_filter_help() {
        let mut args = args();
        args.modified = Some(r#"date > "2100-01-01""#.to_string());
        let (result, output, diagnostics) = process(&args, BODY);
        assert_eq!(result.unwrap(), 0);
        assert!(output.is_empty());
        assert!(diagnostics.contains(r#"date > "2100-01-01""#));
        assert!(diagnostics.contains("'hour < 1'"));
    }

    #[test]
    fn empty_input_without_filter_is_silent() {
        let (result, output, diagnostics) = process(&args(), "# nothing\n");
        assert_eq!(result.unwrap(), 0);
        assert!(output.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn invalid_date_exits_with_filter_code() {
        let mut args = args();
        args.filter = Some(r#"date > "2025-13-19""#.to_string());
        let (result, _, _) = process(&args, BODY);
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("2025-13-19"));
    }

    #[test]
    fn invalid_expression_exits_with_filter_code() {
        let mut args = args();
        args.filter = Some("size > 10".to_string());
        let (result, _, _) = process(&args, BODY);
        assert_eq!(result.unwrap_err().exit_code(), 2);
    }

    #[test]
    fn malformed_record_exits_with_stream_code() {
        let (result, _, _) = process(&args(), "0|/broken|1\n");
        assert_eq!(result.unwrap_err().exit_code(), 3);
    }

    /// A destination that rejects every write, like a closed pipe.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_write_exits_with_emit_code() {
        let mut diagnostics = Vec::new();
        let err = run(
            &args(),
            &Config::default(),
            Cursor::new(BODY),
            &mut ClosedPipe,
            &mut diagnostics,
            now(),
        )
        .unwrap_err();

        assert!(matches!(err, ProcessError::Emit(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn input_selection() {
        assert_eq!(
            Input::select(Some(Path::new("in.body")), true).unwrap(),
            Input::File(PathBuf::from("in.body"))
        );
        assert_eq!(Input::select(Some(Path::new("-")), true).unwrap(), Input::Stdin);
        assert_eq!(Input::select(None, false).unwrap(), Input::Stdin);
        assert!(matches!(Input::select(None, true), Err(ProcessError::NoInput)));
    }
}
