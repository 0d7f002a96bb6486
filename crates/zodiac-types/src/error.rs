//! Error types for Zodiac.

use std::io;
use std::path::PathBuf;

/// Errors produced while resolving, fetching, or parsing a page.
///
/// Every variant's `Display` output is short enough to be shown to the
/// user as-is in a status line or an error page.
#[derive(Debug, thiserror::Error)]
pub enum ZodiacError {
    #[error("malformed response header: {0}")]
    MalformedHeader(String),

    #[error("server closed the connection without responding")]
    EmptyResponse,

    #[error("response cut short after {received} bytes")]
    IncompleteResponse { received: usize },

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("too many redirects (limit {0})")]
    TooManyRedirects(u8),

    #[error("redirect loop at {0}")]
    RedirectLoop(String),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("cannot read {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request timed out")]
    TimedOut,

    #[error("request cancelled")]
    Cancelled,

    #[error("response exceeds {0} bytes")]
    ResponseTooLarge(usize),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ZodiacError>;
