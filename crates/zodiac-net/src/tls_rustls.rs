//! [`TlsProvider`] backed by rustls + ring.
//!
//! Two policies are available. [`RustlsTlsProvider::new`] trusts Mozilla's
//! root CA bundle and checks the hostname. [`RustlsTlsProvider::insecure`]
//! accepts any certificate for any name: Gemini capsules conventionally
//! serve self-signed certificates, so this is the loader's default. It
//! gives no protection against a man-in-the-middle.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme, StreamOwned};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

use zodiac_types::backend::NetworkStream;
use zodiac_types::cancel::CancelToken;
use zodiac_types::config::TlsConfig;
use zodiac_types::error::{Result, ZodiacError};

use super::tls::TlsProvider;

/// Longest a single handshake read may block before the cancel token and
/// deadline are checked again.
const HANDSHAKE_SLICE: Duration = Duration::from_millis(200);

/// Shared, reusable TLS client configuration (one per loader).
pub struct RustlsTlsProvider {
    config: Arc<ClientConfig>,
    verifies: bool,
}

impl RustlsTlsProvider {
    /// Build a provider that trusts Mozilla's root CA bundle.
    pub fn new() -> Result<Self> {
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .map_err(tls_config_error)?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(Self {
            config: Arc::new(config),
            verifies: true,
        })
    }

    /// Build a provider that skips certificate and hostname verification.
    pub fn insecure() -> Result<Self> {
        let provider = crypto_provider();
        let verifier = AcceptAnyCertificate {
            provider: Arc::clone(&provider),
        };

        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(tls_config_error)?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        log::warn!("TLS certificate verification disabled");
        Ok(Self {
            config: Arc::new(config),
            verifies: false,
        })
    }

    /// Pick the policy named by `config`.
    pub fn from_config(config: &TlsConfig) -> Result<Self> {
        if config.verify_certificates {
            Self::new()
        } else {
            Self::insecure()
        }
    }

    pub fn verifies_certificates(&self) -> bool {
        self.verifies
    }
}

impl TlsProvider for RustlsTlsProvider {
    fn connect_tls(
        &self,
        mut stream: Box<dyn NetworkStream>,
        server_name: &str,
        cancel: &CancelToken,
        deadline: Instant,
    ) -> Result<Box<dyn NetworkStream>> {
        let sni = ServerName::try_from(server_name.to_owned())
            .map_err(|e| ZodiacError::ConnectionFailed(format!("invalid server name: {e}")))?;

        let mut conn = ClientConnection::new(Arc::clone(&self.config), sni)
            .map_err(|e| ZodiacError::ConnectionFailed(format!("TLS init: {e}")))?;

        // rustls is lazy; pump I/O until the handshake completes so callers
        // get a ready stream and handshake failures surface here. Reads are
        // sliced so a silent server cannot outlast `cancel` or `deadline`.
        while conn.is_handshaking() {
            if cancel.is_cancelled() {
                return Err(ZodiacError::Cancelled);
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(ZodiacError::TimedOut);
            }
            stream.set_read_timeout(Some(left.min(HANDSHAKE_SLICE)))?;

            match conn.complete_io(&mut stream) {
                Ok((0, 0)) if conn.is_handshaking() => {
                    return Err(ZodiacError::ConnectionFailed(format!(
                        "TLS handshake with {server_name}: no progress"
                    )));
                },
                Ok(_) => {},
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {},
                Err(e) => {
                    return Err(ZodiacError::ConnectionFailed(format!(
                        "TLS handshake with {server_name}: {e}"
                    )));
                },
            }
        }
        log::debug!(
            "TLS established with {server_name} ({:?})",
            conn.protocol_version()
        );

        Ok(Box::new(RustlsStream {
            inner: StreamOwned::new(conn, stream),
        }))
    }
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn tls_config_error(e: rustls::Error) -> ZodiacError {
    ZodiacError::ConnectionFailed(format!("TLS config: {e}"))
}

// ---------------------------------------------------------------------------
// Stream adapter
// ---------------------------------------------------------------------------

/// A TLS session over an inner [`NetworkStream`].
struct RustlsStream {
    inner: StreamOwned<ClientConnection, Box<dyn NetworkStream>>,
}

impl Read for RustlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            // Many servers close the socket without sending close_notify.
            // The protocol has no length framing, so the TCP close is the
            // end of the response either way.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::debug!("peer closed without close_notify");
                Ok(0)
            },
            other => other,
        }
    }
}

impl Write for RustlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl NetworkStream for RustlsStream {
    /// Flushes pending records. No close_notify is sent: several servers
    /// treat it as a full close and drop the response. The CRLF already
    /// terminates the request.
    fn shutdown_write(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.inner.sock.set_read_timeout(timeout)
    }
}

// ---------------------------------------------------------------------------
// Verifier that accepts any certificate
// ---------------------------------------------------------------------------

/// Accepts every certificate chain and name. Handshake signatures are
/// still checked so the peer must hold the key for the certificate it
/// presents.
#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
