//! Error taxonomy shared by the authority and its clients

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Longest slice of an offending field quoted back in an error message
const EXCERPT_LEN: usize = 32;

/// Shortens `value` so rejections stay small enough for one datagram
fn excerpt(value: &str) -> String {
    match value.char_indices().nth(EXCERPT_LEN) {
        Some((end, _)) => format!("{}... ({} bytes)", &value[..end], value.len()),
        None => value.to_string(),
    }
}

/// A wire record or reply-channel request that could not be decoded.
///
/// Always recoverable: the offending line or request is skipped and the
/// surrounding loop carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty record")]
    Empty,
    #[error("unknown record tag `{}`", excerpt(.0))]
    UnknownRecord(String),
    #[error("unknown event kind `{}`", excerpt(.0))]
    UnknownEventKind(String),
    #[error("{kind} record expects {expected} fields, found {found}")]
    Arity {
        kind: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("field `{field}` is not a finite number: `{}`", excerpt(.value))]
    InvalidNumber { field: &'static str, value: String },
    #[error("field `{field}` is not `true` or `false`: `{}`", excerpt(.value))]
    InvalidBool { field: &'static str, value: String },
    #[error("record carries an empty name")]
    EmptyName,
    #[error("name of {len} bytes exceeds the {max} byte limit", max = crate::MAX_NAME_LEN)]
    NameTooLong { len: usize },
}

/// Transport-level failure on either channel.
///
/// Bind failures are fatal at authority startup; everything else ends the
/// affected client session only.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("channel I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("request rejected by authority: {0}")]
    Rejected(String),
    #[error("channel closed")]
    Closed,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invalid level description or command-line value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read level file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse level file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(
        "invalid name `{}`: names must be 1 to {max} bytes with no commas or newlines",
        excerpt(.0),
        max = crate::MAX_NAME_LEN
    )]
    InvalidName(String),
    #[error("object name `{0}` is used more than once")]
    DuplicateName(String),
    #[error("tick interval must be strictly positive")]
    InvalidTick,
    #[error("{0} must be strictly positive")]
    InvalidTimeout(&'static str),
    #[error("object `{name}`: {reason}")]
    InvalidObject { name: String, reason: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_fields_are_shortened_in_messages() {
        let error = ParseError::InvalidNumber {
            field: "x",
            value: "9".repeat(60_000),
        };

        let message = error.to_string();
        assert!(message.len() < 128);
        assert!(message.ends_with("... (60000 bytes)`"));
    }

    #[test]
    fn test_short_fields_are_quoted_whole() {
        let error = ParseError::InvalidBool {
            field: "active",
            value: "maybe".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "field `active` is not `true` or `false`: `maybe`"
        );
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let value = "é".repeat(40);
        let shortened = excerpt(&value);
        assert!(shortened.starts_with(&"é".repeat(EXCERPT_LEN)));
        assert!(shortened.ends_with("(80 bytes)"));
    }
}
