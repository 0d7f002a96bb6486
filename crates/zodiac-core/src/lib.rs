//! Zodiac page loading core.
//!
//! Fetches `gemini://` and `file://` URLs behind one [`loader::Loader`]
//! contract. The Gemini side is a blocking TLS client that follows
//! redirects up to a bound; [`page_loader::PageLoader`] runs fetches on
//! worker threads and reports progress over a channel.

// Re-exports from zodiac-types (foundation types).
pub use zodiac_types::backend;
pub use zodiac_types::cancel;
pub use zodiac_types::config;
pub use zodiac_types::error;
pub use zodiac_types::url;

pub use zodiac_net as net;

pub mod gemini;
pub mod loader;
pub mod page_loader;

#[cfg(test)]
mod test_utils;

pub use loader::{FetchResult, Loader, LoaderRegistry};
pub use page_loader::{FetchHandle, LoaderEvent, PageLoader};
