//! Redirect-following Gemini client.
//!
//! Drives [`GeminiTransport`] one hop at a time. The target URL is
//! rebound on every redirect and the hop limit is checked before the
//! next request goes out, so at most `max_redirects + 1` requests are
//! made per load.

use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::GeminiConfig;
use crate::error::{Result, ZodiacError};
use crate::loader::{FetchResult, Loader, STATUS_MIME};
use crate::net::TlsProvider;
use crate::url::Url;

use super::{GEMINI_MIME, GeminiResponse, GeminiStatus, GeminiTransport};

/// The `gemini` scheme loader.
pub struct GeminiLoader {
    transport: GeminiTransport,
    max_redirects: u8,
    timeout: Duration,
}

impl GeminiLoader {
    pub fn new(tls: Arc<dyn TlsProvider>, config: GeminiConfig) -> Self {
        let max_redirects = config.max_redirects;
        let timeout = config.timeout();
        Self {
            transport: GeminiTransport::new(tls, config),
            max_redirects,
            timeout,
        }
    }

    /// Fetch `url`, following redirects.
    pub fn load(&self, url: &Url, cancel: &CancelToken) -> Result<FetchResult> {
        let mut state = RedirectState::new(url.clone());
        loop {
            log::debug!(
                "requesting {} (redirect {}/{})",
                state.current_url,
                state.attempts,
                self.max_redirects
            );
            let raw = self
                .transport
                .fetch_raw(&state.current_url, self.timeout, cancel)?;
            let response = GeminiResponse::parse(&raw)?;

            match response.status {
                GeminiStatus::Redirect => state.follow(&response.meta, self.max_redirects)?,
                GeminiStatus::Success => return Ok(success_result(response)),
                _ => return Ok(status_result(response)),
            }
        }
    }
}

impl Loader for GeminiLoader {
    fn scheme(&self) -> &str {
        "gemini"
    }

    fn fetch(&self, url: &Url, cancel: &CancelToken) -> Result<FetchResult> {
        self.load(url, cancel)
    }
}

/// Where one load currently points and how many hops it has taken.
#[derive(Debug)]
struct RedirectState {
    current_url: Url,
    attempts: u8,
}

impl RedirectState {
    fn new(url: Url) -> Self {
        Self {
            current_url: url,
            attempts: 0,
        }
    }

    /// Move to the redirect target, or fail if it would not advance or
    /// would exceed `max` hops.
    fn follow(&mut self, target: &str, max: u8) -> Result<()> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ZodiacError::RedirectLoop(self.current_url.to_string()));
        }

        let next = self.current_url.resolve(target)?;
        if next.same_resource(&self.current_url) {
            return Err(ZodiacError::RedirectLoop(next.to_string()));
        }
        if next.scheme != "gemini" {
            return Err(ZodiacError::UnsupportedScheme(next.scheme));
        }
        if self.attempts >= max {
            return Err(ZodiacError::TooManyRedirects(max));
        }

        log::info!("redirect {} -> {next}", self.current_url);
        self.attempts += 1;
        self.current_url = next;
        Ok(())
    }
}

/// Body as text; meta is the MIME type, `text/gemini` when absent.
fn success_result(response: GeminiResponse) -> FetchResult {
    let mimetype = if response.meta.is_empty() {
        GEMINI_MIME.to_string()
    } else {
        response.meta
    };
    let content = match String::from_utf8(response.body) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("response body is not valid UTF-8; decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        },
    };
    FetchResult { mimetype, content }
}

/// Input prompts and failures: the meta text, as plain text.
fn status_result(response: GeminiResponse) -> FetchResult {
    log::info!("status {} ({})", response.code, response.status);
    let content = if response.meta.is_empty() {
        format!("{} ({})", capitalize(&response.status.to_string()), response.code)
    } else {
        response.meta
    };
    FetchResult::new(STATUS_MIME, content)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
