//! Unified error type.

use std::net::AddrParseError;

/// The error type returned by whttp's fallible operations.
///
/// Application-level errors (404, 405, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// configuration and infrastructure failures: a route that cannot be
/// registered, an unparsable bind address, or a failing listener.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`")]
    Addr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    /// The external router refused the pattern, usually because an identical
    /// or overlapping pattern is already registered.
    #[error("invalid route `{pattern}`: {source}")]
    Route {
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("malformed pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: &'static str },
}
