//! Gemini request transport.
//!
//! One call is one connection: resolve, connect, TLS handshake, write the
//! request line, read until the server closes. There is no length
//! framing, so end-of-stream is the only completion signal.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::NetworkStream;
use crate::cancel::CancelToken;
use crate::config::GeminiConfig;
use crate::error::{Result, ZodiacError};
use crate::net::{self, TlsProvider};
use crate::url::Url;

use super::{MAX_REQUEST_URL_LEN, build_request};

/// Upper bound on a single blocking read, so cancellation and the
/// deadline are noticed while a server is silent.
const READ_SLICE: Duration = Duration::from_millis(200);

/// Sends one request and collects the raw response.
pub struct GeminiTransport {
    tls: Arc<dyn TlsProvider>,
    config: GeminiConfig,
}

impl GeminiTransport {
    pub fn new(tls: Arc<dyn TlsProvider>, config: GeminiConfig) -> Self {
        Self { tls, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Fetch `url` and return the raw response (header line, CRLF, body).
    ///
    /// `timeout` bounds the whole exchange. The socket and TLS session
    /// are dropped on every return path, including cancellation.
    pub fn fetch_raw(&self, url: &Url, timeout: Duration, cancel: &CancelToken) -> Result<Vec<u8>> {
        if url.scheme != "gemini" {
            return Err(ZodiacError::UnsupportedScheme(url.scheme.clone()));
        }

        // Fragments are client-side only.
        let mut target = url.clone();
        target.fragment = None;
        let request_url = target.to_string();
        if request_url.len() > MAX_REQUEST_URL_LEN {
            return Err(ZodiacError::InvalidUrl(format!(
                "request URL longer than {MAX_REQUEST_URL_LEN} bytes"
            )));
        }

        let deadline = Instant::now() + timeout;
        check_cancelled(cancel)?;

        let port = url.port.unwrap_or(self.config.default_port);
        let connect_timeout = self.config.connect_timeout().min(remaining(deadline)?);
        log::debug!("connecting to {}:{port}", url.host);
        let tcp: Box<dyn NetworkStream> = Box::new(net::connect(
            &url.host,
            port,
            connect_timeout,
            self.config.prefer_ipv6,
        )?);
        check_cancelled(cancel)?;

        let mut stream = self.tls.connect_tls(tcp, &url.host, cancel, deadline)?;
        check_cancelled(cancel)?;

        send_request(&mut *stream, &request_url)?;
        let raw = read_to_close(
            &mut *stream,
            deadline,
            cancel,
            self.config.max_response_bytes,
        )?;
        log::debug!("received {} bytes from {}", raw.len(), url.host);
        Ok(raw)
    }
}

fn send_request(stream: &mut dyn NetworkStream, url: &str) -> Result<()> {
    stream
        .write_all(&build_request(url))
        .and_then(|()| stream.flush())
        .map_err(|e| ZodiacError::ConnectionFailed(format!("send request: {e}")))?;
    // Best effort: some servers have already started replying.
    if let Err(e) = stream.shutdown_write() {
        log::debug!("shutdown after request: {e}");
    }
    Ok(())
}

/// Read until the peer closes, the deadline passes, or `cancel` trips.
fn read_to_close(
    stream: &mut dyn NetworkStream,
    deadline: Instant,
    cancel: &CancelToken,
    max_bytes: usize,
) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];
    loop {
        check_cancelled(cancel)?;
        let left = match remaining(deadline) {
            Ok(left) => left,
            Err(_) if buf.is_empty() => return Err(ZodiacError::TimedOut),
            Err(_) => return Err(ZodiacError::IncompleteResponse { received: buf.len() }),
        };
        stream.set_read_timeout(Some(left.min(READ_SLICE)))?;

        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() + n > max_bytes {
                    return Err(ZodiacError::ResponseTooLarge(max_bytes));
                }
                buf.extend_from_slice(&chunk[..n]);
            },
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) => {},
            Err(e) if buf.is_empty() => {
                return Err(ZodiacError::ConnectionFailed(format!("read: {e}")));
            },
            Err(e) => {
                log::debug!("read failed after {} bytes: {e}", buf.len());
                return Err(ZodiacError::IncompleteResponse { received: buf.len() });
            },
        }
    }

    if buf.is_empty() {
        return Err(ZodiacError::EmptyResponse);
    }
    Ok(buf)
}

fn check_cancelled(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ZodiacError::Cancelled);
    }
    Ok(())
}

/// Time left before `deadline`, or `TimedOut` once it has passed.
fn remaining(deadline: Instant) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(ZodiacError::TimedOut);
    }
    Ok(left)
}
