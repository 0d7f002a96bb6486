//! Resource loading: the uniform fetch contract and scheme dispatch.

pub mod file;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::ZodiacConfig;
use crate::error::{Result, ZodiacError};
use crate::gemini::GeminiLoader;
use crate::net::{RustlsTlsProvider, TlsProvider};
use crate::url::Url;

pub use file::FileLoader;

/// MIME type for status and error text that must not be rendered as markup.
pub const STATUS_MIME: &str = "text/plain";

/// What every loader returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// MIME type of `content`. Empty means the caller should infer it.
    pub mimetype: String,
    pub content: String,
}

impl FetchResult {
    pub fn new(mimetype: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            mimetype: mimetype.into(),
            content: content.into(),
        }
    }

    /// Plain-text page describing `err`, for callers that show errors
    /// through the normal content path.
    pub fn error_page(err: &ZodiacError) -> Self {
        Self::new(STATUS_MIME, err.to_string())
    }
}

/// A fetch strategy for one URL scheme.
pub trait Loader: Send + Sync {
    /// The exact (lowercase) scheme this loader serves.
    fn scheme(&self) -> &str;

    fn fetch(&self, url: &Url, cancel: &CancelToken) -> Result<FetchResult>;
}

/// Maps schemes to loaders.
pub struct LoaderRegistry {
    loaders: HashMap<String, Box<dyn Loader>>,
}

impl LoaderRegistry {
    /// A registry with no loaders.
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register the `file` and `gemini` loaders, using rustls with the
    /// verification policy from `config.tls`.
    pub fn new(config: &ZodiacConfig) -> Result<Self> {
        config.validate()?;
        let tls = RustlsTlsProvider::from_config(&config.tls)?;
        Ok(Self::with_tls(config, Arc::new(tls)))
    }

    /// Register the `file` and `gemini` loaders over a caller-supplied
    /// TLS provider.
    pub fn with_tls(config: &ZodiacConfig, tls: Arc<dyn TlsProvider>) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(FileLoader::new()));
        registry.register(Box::new(GeminiLoader::new(tls, config.gemini.clone())));
        registry
    }

    /// Add a loader, returning any loader it replaces for the same scheme.
    pub fn register(&mut self, loader: Box<dyn Loader>) -> Option<Box<dyn Loader>> {
        let scheme = loader.scheme().to_ascii_lowercase();
        log::debug!("registering loader for {scheme}://");
        self.loaders.insert(scheme, loader)
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    pub fn fetch(&self, url: &str) -> Result<FetchResult> {
        self.fetch_with_cancel(url, &CancelToken::new())
    }

    /// Parse `url`, pick the loader for its scheme, and fetch.
    pub fn fetch_with_cancel(&self, url: &str, cancel: &CancelToken) -> Result<FetchResult> {
        let url = Url::parse(url)?;
        let loader = self
            .loaders
            .get(&url.scheme)
            .ok_or_else(|| ZodiacError::UnsupportedScheme(url.scheme.clone()))?;
        loader.fetch(&url, cancel)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
