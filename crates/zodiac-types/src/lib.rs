//! Foundation types for Zodiac.
//!
//! Shared by every Zodiac crate: the error taxonomy, URL parsing and
//! resolution, configuration, the byte-stream trait the transport runs
//! over, and the cancellation token threaded through each fetch.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod url;

pub use cancel::CancelToken;
pub use error::{Result, ZodiacError};
pub use url::Url;
