//! Temporal filters over timeline events.
//!
//! A raw filter goes through [`compile`], which turns human-readable date
//! literals into Unix timestamps, and then through [`FilterExpression::parse`],
//! which builds the predicate evaluated against each timestamp.

mod compile;
mod expr;

use thiserror::Error;

pub use compile::{compile, parse_date_literal};
pub use expr::{CmpOp, Field, FilterExpression};

/// Filter errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A `date` clause holds a literal that is not a supported date.
    #[error(
        "invalid date format in filter: unable to parse date: {literal} (use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)"
    )]
    InvalidDateFormat { literal: String },

    /// The expression does not follow the filter grammar.
    #[error("invalid filter at offset {offset}: {message}")]
    Compilation { offset: usize, message: String },
}
