use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use bodyline_core::timeline::filter_examples;
use chrono::Utc;
use clap::{CommandFactory, FromArgMatches};
use tracing_subscriber::EnvFilter;

use bodyline_cli::commands::body::{self, BodyError};
use bodyline_cli::commands::process::{self, Input, ProcessError};
use bodyline_cli::{Cli, Commands, Config};

/// Parses arguments with the `process` examples computed for the current time.
fn parse_cli() -> Result<Cli, clap::Error> {
    let examples = filter_examples(Utc::now());
    let matches = Cli::command()
        .mut_subcommand("process", |cmd| cmd.after_help(examples))
        .try_get_matches()?;
    Cli::from_arg_matches(&matches)
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match &cli.command {
        Some(Commands::Body(args)) => {
            let summary = body::run(args, &config, &mut io::stdin().lock(), &mut io::stderr())?;
            body::report(&mut io::stderr(), args, &summary)?;
        }
        Some(Commands::Process(args)) => {
            let input = Input::select(args.input.as_deref(), io::stdin().is_terminal())
                .inspect_err(|_| {
                    let mut cmd = Cli::command();
                    if let Some(process) = cmd.find_subcommand_mut("process") {
                        eprintln!("{}", process.render_usage());
                    }
                })?;
            let reader = input.open()?;
            process::run(
                args,
                &config,
                reader,
                &mut io::stdout().lock(),
                &mut io::stderr(),
                Utc::now(),
            )?;
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

/// Maps a failure to its documented exit status.
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<ProcessError>() {
        err.exit_code()
    } else if let Some(err) = err.downcast_ref::<BodyError>() {
        err.exit_code()
    } else {
        1
    }
}

fn main() -> ExitCode {
    let cli = match parse_cli() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
