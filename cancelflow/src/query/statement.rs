//! Parsing for the small raw-SQL dialect the in-memory executor understands.

use crate::errors::QueryError;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

#[allow(clippy::expect_used)]
static WAITFOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^waitfor\s+delay\s+'([^']*)'$").expect("waitfor pattern is valid")
});

#[allow(clippy::expect_used)]
static SELECT_ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^select\s+\*\s+from\s+\[?(\w+)\]?$").expect("select pattern is valid")
});

/// A single parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `waitfor delay 'hh:mm:ss[.fff]'`
    WaitForDelay(Duration),
    /// `select * from <table>`
    SelectAll {
        /// The table name as written.
        table: String,
    },
}

/// Splits a batch on `;` and parses every non-empty statement.
pub fn parse_batch(sql: &str) -> Result<Vec<Statement>, QueryError> {
    let statements = sql
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_statement)
        .collect::<Result<Vec<_>, _>>()?;

    if statements.is_empty() {
        return Err(QueryError::Empty);
    }
    Ok(statements)
}

fn parse_statement(text: &str) -> Result<Statement, QueryError> {
    if let Some(caps) = WAITFOR.captures(text) {
        return parse_delay(&caps[1]).map(Statement::WaitForDelay);
    }
    if let Some(caps) = SELECT_ALL.captures(text) {
        return Ok(Statement::SelectAll {
            table: caps[1].to_string(),
        });
    }
    Err(QueryError::Unsupported(text.to_string()))
}

/// Parses a `hh:mm:ss[.fff]` delay literal.
pub fn parse_delay(literal: &str) -> Result<Duration, QueryError> {
    let invalid = || QueryError::InvalidDelay(literal.to_string());

    let mut parts = literal.trim().split(':');
    let (Some(hours), Some(minutes), Some(seconds), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let (seconds, millis) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };

    let number = |s: &str| -> Result<u64, QueryError> {
        if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse().map_err(|_| invalid())
    };

    let hours = number(hours)?;
    let minutes = number(minutes)?;
    let seconds = number(seconds)?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(invalid());
    }

    let millis = match millis {
        None => 0,
        Some(f) if !f.is_empty() && f.len() <= 3 && f.bytes().all(|b| b.is_ascii_digit()) => {
            // ".5" is half a second, not five milliseconds
            format!("{f:0<3}").parse().map_err(|_| invalid())?
        }
        Some(_) => return Err(invalid()),
    };

    Ok(Duration::from_secs(hours * 3600 + minutes * 60 + seconds) + Duration::from_millis(millis))
}
