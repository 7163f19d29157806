//! Centralized error types for mailsnatch.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsnatch library.
///
/// `Connection`, `SessionClosed` and `Config` are fatal for a run. `Fetch`,
/// `Resolution`, `Decode`, `Io` and `Mailbox` are normally scoped to one
/// message or one part: the extractor records them in its report and moves
/// on.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Opening the mailbox failed (TCP, TLS, login or mailbox selection).
    #[error("Could not connect to '{host}': {reason}")]
    Connection { host: String, reason: String },

    /// A structure or body fetch failed.
    #[error("Fetch failed for message {index}: {reason}")]
    Fetch { index: u32, reason: String },

    /// A file extension could not be derived for a part.
    #[error("Cannot name part {section}: {source}")]
    Resolution {
        section: String,
        source: ResolutionError,
    },

    /// The part body could not be decoded from its transfer encoding.
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error with the associated file path.
    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The session was closed; no further mailbox operations are possible.
    #[error("Mailbox session is closed")]
    SessionClosed,

    /// A flag store or expunge was rejected by the server.
    #[error("{operation} failed: {reason}")]
    Mailbox {
        operation: &'static str,
        reason: String,
    },

    /// Configuration is missing a required value or holds an invalid one.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Why an extension could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The subtype was too long to trust and there is no disposition parameter
    /// to take a filename extension from.
    #[error("subtype '{subtype}' needs a filename fallback but the part declares no disposition parameters")]
    MissingFilename { subtype: String },

    /// Nothing usable remained after sanitizing.
    #[error("resolved extension is empty")]
    EmptyExtension,

    /// The running section counter went past `u32::MAX`.
    #[error("running section counter is exhausted")]
    CounterExhausted,
}

/// Transfer decoding failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid base64 body: {0}")]
    Base64(String),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Fetch` variant for a message index.
    pub fn fetch(index: u32, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            index,
            reason: reason.to_string(),
        }
    }

    /// Create a `Mailbox` variant for a rejected store or expunge.
    pub fn mailbox(operation: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Mailbox {
            operation,
            reason: reason.to_string(),
        }
    }

    /// `true` if this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::SessionClosed | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let conn = ExtractError::Connection {
            host: "imap.example.com".into(),
            reason: "refused".into(),
        };
        assert!(conn.is_fatal());
        assert!(ExtractError::SessionClosed.is_fatal());
        assert!(!ExtractError::fetch(2, "timeout").is_fatal());
        assert!(!ExtractError::from(DecodeError::Base64("bad".into())).is_fatal());
        assert!(!ExtractError::mailbox("EXPUNGE", "NO read-only").is_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ExtractError::Resolution {
            section: "2".into(),
            source: ResolutionError::MissingFilename {
                subtype: "octet-stream".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("part 2"));
        let err = ExtractError::io(
            "/tmp/out/1-2.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out/1-2.jpg"));
    }
}
