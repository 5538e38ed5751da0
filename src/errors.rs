use std::{error, fmt, io};

/// Failures of the byte-level engine and the record encoder.
///
/// "Not found" (absent header, absent query parameter, missing query string)
/// is never an error: lookups return `None` for that. An `ErrorKind` means the
/// single buffer or message at hand is unusable and should be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The buffer contains no line terminator (`\n`) at all.
    MissingLineTerminator,
    /// The first line is empty or has no `SP`-separated target token.
    MissingRequestLine,
    /// `Meta` does not carry the three `Type ID Timestamp` tokens.
    InvalidMeta {
        /// Number of tokens actually found.
        tokens: usize,
    },
    /// The structured record could not be serialized.
    Encode(String),
}

impl error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingLineTerminator => write!(f, "buffer has no line terminator"),
            ErrorKind::MissingRequestLine => write!(f, "buffer has no request or status line"),
            ErrorKind::InvalidMeta { tokens } => {
                write!(f, "meta line has {} tokens, expected 3", tokens)
            }
            ErrorKind::Encode(msg) => write!(f, "failed to encode record: {}", msg),
        }
    }
}

impl From<serde_json::Error> for ErrorKind {
    fn from(err: serde_json::Error) -> Self {
        ErrorKind::Encode(err.to_string())
    }
}

/// Failures reported by a [`Transport`](crate::Transport) or by the sink
/// itself, always delivered out-of-band through
/// [`Sink::outcomes`](crate::Sink::outcomes).
#[derive(Debug, PartialEq)]
pub enum PublishError {
    Io(IoError),
    /// The transport did not finish within its timeout.
    Timeout,
    /// The downstream peer answered with a non-success status.
    Rejected(u16),
    /// The sink queue already held `max_pending` records.
    QueueFull,
    /// The sink was closed before the record could be handed over.
    Closed,
    Unexpected(String),
}

impl error::Error for PublishError {}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Io(e) => write!(f, "I/O error: {}", e.0),
            PublishError::Timeout => write!(f, "publish timed out"),
            PublishError::Rejected(status) => write!(f, "rejected with status {}", status),
            PublishError::QueueFull => write!(f, "sink queue is full"),
            PublishError::Closed => write!(f, "sink is closed"),
            PublishError::Unexpected(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<io::Error> for PublishError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => PublishError::Timeout,
            _ => PublishError::Io(IoError(err)),
        }
    }
}

impl From<ErrorKind> for PublishError {
    fn from(err: ErrorKind) -> Self {
        PublishError::Unexpected(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for PublishError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        PublishError::Timeout
    }
}

#[derive(Debug)]
pub struct IoError(pub io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}
