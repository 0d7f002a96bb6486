//! Request coordinator.
//!
//! Holds the URL the user is about to load and runs each load on its own
//! worker thread. Progress and results are reported as [`LoaderEvent`]s
//! on a channel, so the front end needs no callbacks into its own state:
//!
//! 1. `Status("Loading <url>")`
//! 2. `Content(result)`, or an error page on failure
//! 3. `Status("Loaded <url>")`, or `Status("Error loading <url>: <error>")`
//!
//! Concurrent loads share only the immutable [`LoaderRegistry`].

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::loader::{FetchResult, LoaderRegistry};

/// Something the front end should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Short progress line for a status bar.
    Status(String),
    /// Content to render.
    Content(FetchResult),
}

/// Owns the current URL and starts loads.
pub struct PageLoader {
    registry: Arc<LoaderRegistry>,
    current_url: String,
    events: Sender<LoaderEvent>,
}

impl PageLoader {
    /// Create a coordinator and the receiving end of its event channel.
    pub fn new(registry: Arc<LoaderRegistry>) -> (Self, Receiver<LoaderEvent>) {
        let (events, rx) = mpsc::channel();
        let loader = Self {
            registry,
            current_url: String::new(),
            events,
        };
        (loader, rx)
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.current_url = url.into();
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Load the current URL on a new worker thread.
    pub fn load_url(&self) -> Result<FetchHandle> {
        let url = self.current_url.clone();
        let cancel = CancelToken::new();
        let registry = Arc::clone(&self.registry);
        let events = self.events.clone();
        let worker_url = url.clone();
        let worker_cancel = cancel.clone();

        let handle = std::thread::Builder::new()
            .name("zodiac-fetch".to_string())
            .spawn(move || run_load(&registry, &worker_url, &worker_cancel, &events))?;

        Ok(FetchHandle { url, cancel, handle })
    }

    /// Load the current URL on the calling thread, emitting the same
    /// events as [`PageLoader::load_url`].
    pub fn load_url_blocking(&self) -> Result<FetchResult> {
        run_load(
            &self.registry,
            &self.current_url,
            &CancelToken::new(),
            &self.events,
        )
    }
}

/// A load running on a worker thread.
pub struct FetchHandle {
    url: String,
    cancel: CancelToken,
    handle: JoinHandle<Result<FetchResult>>,
}

impl FetchHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask the worker to stop at its next read. The connection is closed
    /// when the worker returns.
    pub fn cancel(&self) {
        log::debug!("cancelling load of {}", self.url);
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker and return its result. A panic in the worker
    /// is resumed on the calling thread.
    pub fn join(self) -> Result<FetchResult> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn run_load(
    registry: &LoaderRegistry,
    url: &str,
    cancel: &CancelToken,
    events: &Sender<LoaderEvent>,
) -> Result<FetchResult> {
    // A dropped receiver only means nobody is listening any more.
    let emit = |event: LoaderEvent| {
        let _ = events.send(event);
    };

    emit(LoaderEvent::Status(format!("Loading {url}")));
    match registry.fetch_with_cancel(url, cancel) {
        Ok(result) => {
            log::info!("loaded {url} ({})", display_mime(&result.mimetype));
            emit(LoaderEvent::Content(result.clone()));
            emit(LoaderEvent::Status(format!("Loaded {url}")));
            Ok(result)
        },
        Err(e) => {
            log::info!("failed to load {url}: {e}");
            emit(LoaderEvent::Content(FetchResult::error_page(&e)));
            emit(LoaderEvent::Status(format!("Error loading {url}: {e}")));
            Err(e)
        },
    }
}

fn display_mime(mimetype: &str) -> &str {
    if mimetype.is_empty() { "unknown type" } else { mimetype }
}
