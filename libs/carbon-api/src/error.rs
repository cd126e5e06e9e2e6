use std::fmt;
use std::num::ParseIntError;

/// Error kind for client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connect,
    Io,
    Protocol,
    Timeout,
}

/// Client error — returned by the queue and sink bindings.
#[derive(Debug)]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn connect(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Connect, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Io, message: msg.into() }
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Protocol, message: msg.into() }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Timeout, message: msg.into() }
    }

    /// Add context to the error, preserving the original ErrorKind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ClientError {}

/// Payload could not be turned into a [`MetricRecord`](crate::MetricRecord).
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed payload: expected at least 3 fields, got {tokens}")]
    MalformedPayload { tokens: usize },

    #[error("invalid timestamp '{token}': {source}")]
    InvalidTimestamp {
        token: String,
        #[source]
        source: ParseIntError,
    },
}
