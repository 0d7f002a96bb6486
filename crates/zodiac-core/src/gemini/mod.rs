//! Gemini protocol support.
//!
//! Gemini is a lightweight protocol with mandatory TLS and single-line
//! requests. A response is `<STATUS><SPACE><META>\r\n` followed by a body
//! that runs until the server closes the connection.

pub mod client;
pub mod transport;

use std::fmt;

use crate::error::{Result, ZodiacError};

pub use client::GeminiLoader;
pub use transport::GeminiTransport;

/// MIME type assumed for a success response with an empty meta.
pub const GEMINI_MIME: &str = "text/gemini";

/// Longest meta field a server may send.
pub const MAX_META_LEN: usize = 1024;

/// Longest request URL a server must accept.
pub const MAX_REQUEST_URL_LEN: usize = 1024;

/// Response category, taken from the first digit of the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeminiStatus {
    /// 1x: the server wants a line of user input.
    Input,
    /// 2x: body follows, meta is its MIME type.
    Success,
    /// 3x: meta is the new location.
    Redirect,
    /// 4x
    TemporaryFailure,
    /// 5x
    PermanentFailure,
    /// 6x: a client certificate is needed.
    ClientCertRequired,
}

impl GeminiStatus {
    /// Classify a two-digit status code by its leading digit.
    pub fn from_code(code: u8) -> Option<Self> {
        match code / 10 {
            1 => Some(GeminiStatus::Input),
            2 => Some(GeminiStatus::Success),
            3 => Some(GeminiStatus::Redirect),
            4 => Some(GeminiStatus::TemporaryFailure),
            5 => Some(GeminiStatus::PermanentFailure),
            6 => Some(GeminiStatus::ClientCertRequired),
            _ => None,
        }
    }

    /// The category digit (1 to 6).
    pub fn digit(self) -> u8 {
        match self {
            GeminiStatus::Input => 1,
            GeminiStatus::Success => 2,
            GeminiStatus::Redirect => 3,
            GeminiStatus::TemporaryFailure => 4,
            GeminiStatus::PermanentFailure => 5,
            GeminiStatus::ClientCertRequired => 6,
        }
    }

    pub fn is_success(self) -> bool {
        self == GeminiStatus::Success
    }

    pub fn is_redirect(self) -> bool {
        self == GeminiStatus::Redirect
    }
}

impl fmt::Display for GeminiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeminiStatus::Input => "input required",
            GeminiStatus::Success => "success",
            GeminiStatus::Redirect => "redirect",
            GeminiStatus::TemporaryFailure => "temporary failure",
            GeminiStatus::PermanentFailure => "permanent failure",
            GeminiStatus::ClientCertRequired => "client certificate required",
        };
        f.write_str(name)
    }
}

/// A parsed response header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: GeminiStatus,
    /// The exact two-digit code; routing only looks at `status`.
    pub code: u8,
    /// MIME type on success, prompt on input, target on redirect, error
    /// text on failure. May be empty.
    pub meta: String,
}

/// Parse a response header line: two digits, a whitespace run, then meta.
///
/// A trailing `\r\n` or `\n` is ignored. Meta may be empty, and the
/// whitespace may be omitted when it is.
pub fn parse_header(line: &[u8]) -> Result<ResponseHeader> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let text = std::str::from_utf8(line).map_err(|_| malformed("header is not UTF-8"))?;

    let status_end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let digits = &text[..status_end];
    if digits.len() != 2 {
        return Err(malformed(format!("expected a two-digit status in {text:?}")));
    }

    let rest = &text[status_end..];
    let meta = rest.trim_start();
    if !rest.is_empty() && meta.len() == rest.len() {
        return Err(malformed(format!("no space after status in {text:?}")));
    }
    if meta.len() > MAX_META_LEN {
        return Err(malformed(format!("meta longer than {MAX_META_LEN} bytes")));
    }

    let code: u8 = digits
        .parse()
        .map_err(|_| malformed(format!("bad status {digits:?}")))?;
    let status = GeminiStatus::from_code(code)
        .ok_or_else(|| malformed(format!("unknown status category {code}")))?;

    Ok(ResponseHeader {
        status,
        code,
        meta: meta.to_string(),
    })
}

/// Serialize a header line: `"<code> <meta>\r\n"`.
pub fn write_header(code: u8, meta: &str) -> Vec<u8> {
    format!("{code:02} {meta}\r\n").into_bytes()
}

/// Build a Gemini request (just the URL terminated by CRLF).
pub fn build_request(url: &str) -> Vec<u8> {
    format!("{url}\r\n").into_bytes()
}

fn malformed(reason: impl Into<String>) -> ZodiacError {
    ZodiacError::MalformedHeader(reason.into())
}

/// One complete response as read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiResponse {
    pub status: GeminiStatus,
    pub code: u8,
    pub meta: String,
    pub body: Vec<u8>,
}

impl GeminiResponse {
    /// Split raw bytes at the first line terminator and parse the header.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let end = raw
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| malformed("no line terminator"))?;
        let header = parse_header(&raw[..=end])?;
        Ok(Self {
            status: header.status,
            code: header.code,
            meta: header.meta,
            body: raw[end + 1..].to_vec(),
        })
    }

    /// Serialize back to wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = write_header(self.code, &self.meta);
        out.extend_from_slice(&self.body);
        out
    }
}
