//! Structured error type for parsing cgroup accounting files.
//!
//! [`StatParseError`] reports parsing failures with the offending value and
//! line number. It converts into [`std::io::Error`] (kind `InvalidData`) so
//! the stat readers can keep plain `io::Result` signatures; tests can get
//! the structured error back with [`extract_stat_parse_error`].
//!
//! # Example
//!
//! ```rust
//! use std::io;
//! use dockmon::cgroup::stats::StatParseError;
//!
//! fn read_tick_count(raw: &str) -> io::Result<u64> {
//!     raw.parse::<u64>().map_err(|source| {
//!         io::Error::from(StatParseError::InvalidValue {
//!             value: raw.to_owned(),
//!             line: 1,
//!             source,
//!         })
//!     })
//! }
//!
//! assert!(read_tick_count("58127").is_ok());
//! read_tick_count("fifty-eight").unwrap_err();
//! ```

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field `{field}` at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for `{key}` at line {line}: `{value}`: {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid value at line {line}: `{value}`: {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },
}

impl From<StatParseError> for std::io::Error {
    fn from(err: StatParseError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

/// Returns the [`StatParseError`] wrapped inside an `InvalidData` I/O
/// error.
///
/// Panics when the error carries no `StatParseError`; meant for test
/// assertions only.
#[cfg(test)]
pub(super) fn extract_stat_parse_error(err: &std::io::Error) -> &StatParseError {
    err.get_ref()
        .and_then(|e| e.downcast_ref::<StatParseError>())
        .unwrap()
}
