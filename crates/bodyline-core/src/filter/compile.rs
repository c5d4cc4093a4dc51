//! Rewrites date literals in a filter into absolute Unix timestamps.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use super::FilterError;

/// `date <op> <literal>` where the literal is quoted (any text) or a bare
/// `YYYY-MM-DD[ HH:MM[:SS]]`.
static DATE_CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\bdate(\s*)(==|!=|<=|>=|<|>)(\s*)(?:"([^"]*)"|'([^']*)'|(\d{4}-\d{1,2}-\d{1,2}(?:\s+\d{1,2}:\d{1,2}(?::\d{1,2})?)?))"#,
    )
    .unwrap()
});

/// Accepted literal layouts, tried in order.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalizes a raw filter so every `date` clause compares against Unix seconds.
///
/// Slashes become dashes first, so `2025/06/19` and `2025-06-19` are
/// equivalent. Everything outside `date` clauses is left untouched.
pub fn compile(raw: &str) -> Result<String, FilterError> {
    let filter = raw.replace('/', "-");

    let mut rewrites = Vec::new();
    for caps in DATE_CLAUSE_RE.captures_iter(&filter) {
        let literal = caps
            .get(4)
            .or_else(|| caps.get(5))
            .or_else(|| caps.get(6))
            .map_or("", |m| m.as_str());
        let timestamp = parse_date_literal(literal)?;
        let replacement = format!("date{}{}{}{timestamp}", &caps[1], &caps[2], &caps[3]);
        let range = caps.get(0).map_or(0..0, |m| m.range());
        rewrites.push((range, replacement));
    }

    // Rewrite back to front so earlier offsets stay valid.
    let mut result = filter;
    for (range, replacement) in rewrites.into_iter().rev() {
        result.replace_range(range, &replacement);
    }
    Ok(result)
}

/// Parses `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD` as UTC.
pub fn parse_date_literal(literal: &str) -> Result<i64, FilterError> {
    let normalized = literal.split_whitespace().collect::<Vec<_>>().join(" ");

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, DATE_FORMAT) {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp());
    }

    Err(FilterError::InvalidDateFormat {
        literal: literal.to_string(),
    })
}
