//! TLS provider abstraction.
//!
//! The Gemini transport wraps a plain TCP [`NetworkStream`] in a TLS
//! session through this trait, so it never depends on a concrete TLS
//! library and tests can substitute a passthrough.

use std::time::Instant;

use zodiac_types::backend::NetworkStream;
use zodiac_types::cancel::CancelToken;
use zodiac_types::error::Result;

/// Provides TLS client connections.
pub trait TlsProvider: Send + Sync {
    /// Wrap `stream` in a TLS client session, performing the handshake
    /// before returning.
    ///
    /// `server_name` is sent as SNI. Whether it is also checked against
    /// the certificate depends on the provider's verification policy.
    /// A failed handshake is reported as `ConnectionFailed`.
    ///
    /// The handshake gives up with `Cancelled` once `cancel` trips and
    /// with `TimedOut` once `deadline` passes.
    fn connect_tls(
        &self,
        stream: Box<dyn NetworkStream>,
        server_name: &str,
        cancel: &CancelToken,
        deadline: Instant,
    ) -> Result<Box<dyn NetworkStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use zodiac_types::error::ZodiacError;

    struct MockTlsProvider;

    impl TlsProvider for MockTlsProvider {
        fn connect_tls(
            &self,
            stream: Box<dyn NetworkStream>,
            server_name: &str,
            _cancel: &CancelToken,
            _deadline: Instant,
        ) -> Result<Box<dyn NetworkStream>> {
            if server_name == "bad.example.com" {
                return Err(ZodiacError::ConnectionFailed("mock TLS error".to_string()));
            }
            Ok(stream)
        }
    }

    #[test]
    fn trait_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockTlsProvider>();

        let provider = MockTlsProvider;
        let _: &dyn TlsProvider = &provider;
    }

    #[test]
    fn rustls_providers_are_constructible() {
        let verifying = crate::RustlsTlsProvider::new().unwrap();
        let _: &dyn TlsProvider = &verifying;
        let insecure = crate::RustlsTlsProvider::insecure().unwrap();
        assert!(!insecure.verifies_certificates());
    }
}
