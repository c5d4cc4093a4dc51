//! CLI subcommand implementations.

pub mod body;
pub mod process;
pub mod prompt;
