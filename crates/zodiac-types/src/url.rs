//! URL parsing and resolution (simplified RFC 3986).
//!
//! Covers the two schemes the loader understands (`file`, `gemini`) and
//! the relative references a Gemini redirect may carry.

use std::fmt;

use crate::error::{Result, ZodiacError};

/// Default Gemini port.
pub const GEMINI_DEFAULT_PORT: u16 = 1965;

/// A parsed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// Scheme component, always lowercase (e.g. `"gemini"`, `"file"`).
    pub scheme: String,
    /// Host component. Empty for `file:///path`. IPv6 literals are
    /// stored without brackets.
    pub host: String,
    /// Optional explicit port number.
    pub port: Option<u16>,
    /// Path component starting with `/`.
    pub path: String,
    /// Optional query string (without the leading `?`).
    pub query: Option<String>,
    /// Optional fragment (without the leading `#`).
    pub fragment: Option<String>,
}

impl Url {
    /// Parse an absolute URL string (`scheme://authority/path?query#frag`).
    ///
    /// `gemini` URLs must name a host.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        let idx = url
            .find("://")
            .ok_or_else(|| ZodiacError::InvalidUrl(format!("missing scheme: {url}")))?;
        let scheme = &url[..idx];
        if !is_scheme(scheme) {
            return Err(ZodiacError::InvalidUrl(format!("bad scheme: {url}")));
        }

        let parsed = Self::parse_authority_and_path(scheme, &url[idx + 3..])?;
        if parsed.scheme == "gemini" && parsed.host.is_empty() {
            return Err(ZodiacError::InvalidUrl(format!("missing host: {url}")));
        }
        Ok(parsed)
    }

    /// Parse `host[:port]/path?query#fragment` after the scheme has been
    /// stripped.
    fn parse_authority_and_path(scheme: &str, rest: &str) -> Result<Url> {
        let (rest, query, fragment) = split_query_fragment(rest);

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = split_host_port(authority)?;
        let path = if path.is_empty() { "/" } else { path };

        Ok(Url {
            scheme: scheme.to_lowercase(),
            host: host.to_string(),
            port,
            path: path.to_string(),
            query,
            fragment,
        })
    }

    /// Resolve a reference against this base URL.
    ///
    /// Handles absolute URLs (parsed as-is), scheme-relative
    /// (`//host/path`), absolute paths (`/path`), relative paths
    /// (`path`, `../path`), query-only (`?q=x`), and fragment-only
    /// (`#frag`) references. An empty reference resolves to the base.
    pub fn resolve(&self, relative: &str) -> Result<Url> {
        let relative = relative.trim();
        if relative.is_empty() {
            return Ok(self.clone());
        }

        if has_scheme(relative) {
            return Url::parse(relative);
        }

        if relative.starts_with("//") {
            return Url::parse(&format!("{}:{}", self.scheme, relative));
        }

        if let Some(frag) = relative.strip_prefix('#') {
            let mut resolved = self.clone();
            resolved.fragment = Some(frag.to_string());
            return Ok(resolved);
        }

        if let Some(query) = relative.strip_prefix('?') {
            let mut resolved = self.clone();
            resolved.query = Some(query.to_string());
            resolved.fragment = None;
            return Ok(resolved);
        }

        let (rel_path, query, fragment) = split_query_fragment(relative);
        let path = if rel_path.starts_with('/') {
            resolve_path("/", rel_path)
        } else {
            resolve_path(self.directory(), rel_path)
        };
        Ok(Url {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path,
            query,
            fragment,
        })
    }

    /// Explicit port, or the scheme's default.
    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or(match self.scheme.as_str() {
            "gemini" => Some(GEMINI_DEFAULT_PORT),
            _ => None,
        })
    }

    /// Whether both URLs address the same resource: fragments are
    /// ignored, hosts compare case-insensitively, and an explicit
    /// default port equals an omitted one.
    pub fn same_resource(&self, other: &Url) -> bool {
        self.scheme == other.scheme
            && self.host.eq_ignore_ascii_case(&other.host)
            && self.port_or_default() == other.port_or_default()
            && self.path == other.path
            && self.query == other.query
    }

    /// Get the file extension from the path (without the dot).
    pub fn extension(&self) -> Option<&str> {
        let filename = self.path.rsplit('/').next()?;
        let dot_pos = filename.rfind('.')?;
        let ext = &filename[dot_pos + 1..];
        if ext.is_empty() { None } else { Some(ext) }
    }

    /// Get the directory portion of the path (everything up to and
    /// including the last `/`).
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(i) => &self.path[..=i],
            None => "/",
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            write!(f, "{}", self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(ref q) = self.query {
            write!(f, "?{q}")?;
        }
        if let Some(ref frag) = self.fragment {
            write!(f, "#{frag}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Url {
    type Err = ZodiacError;

    fn from_str(s: &str) -> Result<Self> {
        Url::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether a reference is absolute, i.e. begins with `scheme:`. A `://`
/// later in the path or query does not count.
fn has_scheme(reference: &str) -> bool {
    reference
        .split_once(':')
        .is_some_and(|(scheme, _)| is_scheme(scheme))
}

/// Split `rest` into `(before, query, fragment)`.
fn split_query_fragment(s: &str) -> (&str, Option<String>, Option<String>) {
    let (s, fragment) = match s.find('#') {
        Some(i) => (&s[..i], Some(s[i + 1..].to_string())),
        None => (s, None),
    };
    match s.find('?') {
        Some(i) => (&s[..i], Some(s[i + 1..].to_string()), fragment),
        None => (s, None, fragment),
    }
}

/// Split an authority into host and optional port. Bracketed IPv6
/// literals (`[::1]:1965`) keep their colons.
fn split_host_port(authority: &str) -> Result<(&str, Option<u16>)> {
    if let Some(rest) = authority.strip_prefix('[') {
        let end = rest
            .find(']')
            .ok_or_else(|| ZodiacError::InvalidUrl(format!("unclosed IPv6 literal: {authority}")))?;
        let host = &rest[..end];
        let after = &rest[end + 1..];
        let port = match after.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if after.is_empty() => None,
            None => return Err(ZodiacError::InvalidUrl(format!("bad authority: {authority}"))),
        };
        return Ok((host, port));
    }

    match authority.rfind(':') {
        Some(i) => Ok((&authority[..i], Some(parse_port(&authority[i + 1..])?))),
        None => Ok((authority, None)),
    }
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse::<u16>()
        .map_err(|_| ZodiacError::InvalidUrl(format!("bad port: {s}")))
}

/// Resolve a relative path against a base directory, handling `..` and
/// `.` segments. A trailing slash on the reference is kept.
fn resolve_path(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

    for seg in relative.split('/') {
        match seg {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }

    let mut path = format!("/{}", segments.join("/"));
    let trailing = relative.ends_with('/') || relative.ends_with("/.") || relative.ends_with("/..");
    if trailing && !path.ends_with('/') {
        path.push('/');
    }
    path
}
