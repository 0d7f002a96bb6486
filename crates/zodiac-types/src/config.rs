//! Loader configuration.
//!
//! Plain data with serde defaults. The core never reads files or the
//! environment itself; front ends build a [`ZodiacConfig`] (possibly from
//! TOML via [`ZodiacConfig::from_toml_str`]) and pass it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ZodiacError};
use crate::url::GEMINI_DEFAULT_PORT;

/// Maximum number of redirects followed after the first request.
pub const MAX_REDIRECTS: u8 = 5;

/// Upper bound accepted for `max_redirects` in configuration.
const MAX_REDIRECTS_LIMIT: u8 = 32;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZodiacConfig {
    pub gemini: GeminiConfig,
    pub tls: TlsConfig,
}

/// Gemini transport and redirect settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Port used when the URL does not name one.
    pub default_port: u16,
    /// Redirect hops followed after the first request.
    pub max_redirects: u8,
    /// Per-address TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Overall budget for one request (connect through read-to-close).
    pub timeout_ms: u64,
    /// Responses larger than this are rejected.
    pub max_response_bytes: usize,
    /// Try IPv6 addresses before IPv4 ones.
    pub prefer_ipv6: bool,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            default_port: GEMINI_DEFAULT_PORT,
            max_redirects: MAX_REDIRECTS,
            connect_timeout_ms: 10_000,
            timeout_ms: 30_000,
            max_response_bytes: 2 * 1024 * 1024,
            prefer_ipv6: false,
        }
    }
}

impl GeminiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// TLS policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Verify server certificates against the bundled web PKI roots.
    ///
    /// Off by default: Gemini capsules conventionally use self-signed
    /// certificates, so the default session skips chain and hostname
    /// checks. This leaves connections open to man-in-the-middle
    /// interception.
    pub verify_certificates: bool,
}

impl ZodiacConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ZodiacConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the transport cannot work with.
    pub fn validate(&self) -> Result<()> {
        let g = &self.gemini;
        if g.max_redirects > MAX_REDIRECTS_LIMIT {
            return Err(ZodiacError::Config(format!(
                "max_redirects {} exceeds {MAX_REDIRECTS_LIMIT}",
                g.max_redirects
            )));
        }
        if g.connect_timeout_ms == 0 || g.timeout_ms == 0 {
            return Err(ZodiacError::Config("timeouts must be non-zero".into()));
        }
        if g.default_port == 0 {
            return Err(ZodiacError::Config("default_port must be non-zero".into()));
        }
        if g.max_response_bytes == 0 {
            return Err(ZodiacError::Config(
                "max_response_bytes must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ZodiacConfig::default();
        assert_eq!(c.gemini.default_port, 1965);
        assert_eq!(c.gemini.max_redirects, 5);
        assert!(!c.tls.verify_certificates);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        let c = ZodiacConfig::from_toml_str("").unwrap();
        assert_eq!(c, ZodiacConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let c = ZodiacConfig::from_toml_str(
            r#"
            [gemini]
            max_redirects = 2
            prefer_ipv6 = true

            [tls]
            verify_certificates = true
            "#,
        )
        .unwrap();
        assert_eq!(c.gemini.max_redirects, 2);
        assert!(c.gemini.prefer_ipv6);
        assert_eq!(c.gemini.timeout_ms, 30_000);
        assert!(c.tls.verify_certificates);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ZodiacConfig::from_toml_str("[gemini]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ZodiacError::Config(_)));
    }

    #[test]
    fn rejects_excessive_redirects() {
        let err = ZodiacConfig::from_toml_str("[gemini]\nmax_redirects = 200\n").unwrap_err();
        assert!(matches!(err, ZodiacError::Config(_)));
    }

    #[test]
    fn rejects_invalid_toml() {
        let err = ZodiacConfig::from_toml_str("[gemini").unwrap_err();
        assert!(matches!(err, ZodiacError::TomlParse(_)));
    }

    #[test]
    fn durations() {
        let g = GeminiConfig::default();
        assert_eq!(g.connect_timeout(), Duration::from_secs(10));
        assert_eq!(g.timeout(), Duration::from_secs(30));
    }
}
