//! Error types for certificate auditing.
//!
//! Every variant describes why a single input line produced no usable leaf
//! certificate. None of them abort an audit: the pipeline records them as a
//! failure and moves on to the next line.

use std::time::Duration;
use thiserror::Error;

/// Error type for a failed endpoint audit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// The input is not a syntactically valid URL
    #[error("\"{url}\": {details}")]
    Parse {
        /// The offending input line
        url: String,
        /// What the URL parser rejected
        details: String,
    },

    /// The URL parsed but its scheme is not https
    #[error("\"{url}\": url scheme not https")]
    Scheme {
        /// The offending input line
        url: String,
        /// The scheme found, empty when the input had none
        scheme: String,
    },

    /// No TCP connection could be established within the connect bound
    #[error("\"{endpoint}\": connect timed out after {}s", .timeout.as_secs_f64())]
    ConnectTimeout {
        /// The endpoint (host:port) being dialled
        endpoint: String,
        /// The bound that was exceeded
        timeout: Duration,
    },

    /// Connecting, negotiating TLS or validating the chain failed
    #[error("\"{endpoint}\": {details}")]
    Handshake {
        /// The endpoint (host:port) being dialled
        endpoint: String,
        /// The underlying cause
        details: String,
    },
}

impl AuditError {
    /// Short, stable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::Scheme { .. } => "scheme",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::Handshake { .. } => "handshake",
        }
    }

    pub(crate) fn handshake(endpoint: impl ToString, details: impl ToString) -> Self {
        Self::Handshake {
            endpoint: endpoint.to_string(),
            details: details.to_string(),
        }
    }
}

/// TLS plumbing errors, before they are attributed to an endpoint.
#[derive(Debug, Error)]
pub enum TlsError {
    /// OpenSSL rejected an operation
    #[error("{0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    /// The platform's trusted certificate authorities could not be loaded
    #[error("loading trusted certificates: {0}")]
    TrustStore(openssl::error::ErrorStack),

    /// The handshake failed, including chain or hostname verification
    #[error("{0}")]
    Handshake(String),

    /// The peer certificate is missing or unreadable
    #[error("{0}")]
    Certificate(String),
}

impl<S: std::fmt::Debug> From<openssl::ssl::HandshakeError<S>> for TlsError {
    fn from(e: openssl::ssl::HandshakeError<S>) -> Self {
        Self::Handshake(e.to_string())
    }
}
