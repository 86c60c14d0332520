//! Error types for sqlwire operations.
//!
//! Every failure surfaced by this workspace is an [`Error`]: a kind
//! discriminant plus the shared fields (message, optional server error
//! code, optional source). Kinds group into three classes:
//!
//! - connection class: transient network-level failures, safe to retry
//!   after reconnecting
//! - client class: caller-caused failures (bad SQL, undecodable value),
//!   retrying the same input will fail again
//! - protocol class: unrecognized server codes and wire-level violations

use std::fmt;

/// The primary error type for all sqlwire operations.
#[derive(Debug)]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Server error code, when the failure originated in a server ERR
    /// packet. Client-originated failures carry no code.
    pub code: Option<u16>,
    /// Underlying cause, when the failure wraps an I/O or TLS error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Discriminant for [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Timed out connecting or waiting on a read/write.
    Timeout,
    /// Connection refused by the peer.
    ConnectionRefused,
    /// Connection reset by the peer.
    ConnectionReset,
    /// TLS negotiation or transport failure.
    Ssl,
    /// Connection already closed (or poisoned by an earlier failure).
    ConnectionClosed,
    /// Other network/access failure, including server codes that indicate
    /// connection-level problems.
    Connection,
    /// Invalid query as judged by the server (parse error etc.).
    Query,
    /// A value could not be decoded into the requested type.
    Cast,
    /// Unrecognized server error code or wire-protocol violation.
    Protocol,
}

/// Coarse grouping of [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient/network failures. Reconnect and retry.
    Connection,
    /// Caller-caused failures. Not retryable.
    Client,
    /// Protocol-level failures.
    Protocol,
}

impl ErrorKind {
    /// The class this kind belongs to.
    pub const fn class(self) -> ErrorClass {
        match self {
            ErrorKind::Timeout
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::Ssl
            | ErrorKind::ConnectionClosed
            | ErrorKind::Connection => ErrorClass::Connection,
            ErrorKind::Query | ErrorKind::Cast => ErrorClass::Client,
            ErrorKind::Protocol => ErrorClass::Protocol,
        }
    }

    /// Short name used in Display output.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionRefused => "connection refused",
            ErrorKind::ConnectionReset => "connection reset",
            ErrorKind::Ssl => "ssl",
            ErrorKind::ConnectionClosed => "connection closed",
            ErrorKind::Connection => "connection",
            ErrorKind::Query => "query",
            ErrorKind::Cast => "cast",
            ErrorKind::Protocol => "protocol",
        }
    }
}

impl Error {
    /// Create an error with a kind and message, no code.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Create an error carrying a server error code.
    pub fn with_code(kind: ErrorKind, message: impl Into<String>, code: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            code: Some(code),
            source: None,
        }
    }

    /// Attach an underlying cause.
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Timeout-kind error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Generic connection-kind error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    /// Connection-closed error.
    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionClosed, message)
    }

    /// TLS failure.
    pub fn ssl(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ssl, message)
    }

    /// Protocol violation or unrecognized server response.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Value decode failure.
    pub fn cast(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cast, message)
    }

    /// Classify a transport-level I/O error directly, bypassing the server
    /// code table: these failures never came with a server ERR packet.
    pub fn from_io(err: std::io::Error, context: &str) -> Self {
        use std::io::ErrorKind as Io;
        let kind = match err.kind() {
            Io::TimedOut | Io::WouldBlock => ErrorKind::Timeout,
            Io::ConnectionRefused => ErrorKind::ConnectionRefused,
            Io::ConnectionReset | Io::BrokenPipe | Io::ConnectionAborted => {
                ErrorKind::ConnectionReset
            }
            Io::UnexpectedEof | Io::NotConnected => ErrorKind::ConnectionClosed,
            _ => ErrorKind::Connection,
        };
        Self::new(kind, format!("{context}: {err}")).with_source(err)
    }

    /// The class of this error.
    pub const fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// True for transient/network failures that warrant a reconnect.
    pub const fn is_connection_error(&self) -> bool {
        matches!(self.class(), ErrorClass::Connection)
    }

    /// True for caller-caused failures that should not be retried.
    pub const fn is_client_error(&self) -> bool {
        matches!(self.class(), ErrorClass::Client)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} error {}: {}", self.kind.name(), code, self.message),
            None => write!(f, "{} error: {}", self.kind.name(), self.message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias for sqlwire operations.
pub type Result<T> = std::result::Result<T, Error>;
