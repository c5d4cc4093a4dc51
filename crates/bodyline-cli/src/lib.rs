//! bodyline CLI library.
//!
//! This crate provides the command-line interface for bodyline.

mod cli;
pub mod commands;
mod config;

pub use cli::{BodyArgs, Cli, Commands, ProcessArgs};
pub use config::Config;
