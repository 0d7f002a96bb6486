//! Networking: blocking TCP connect with resolver ordering and timeouts,
//! plus the TLS provider abstraction and its rustls implementation.

mod std_backend;
pub mod tls;
pub mod tls_rustls;

pub use std_backend::{StdNetworkStream, connect};
pub use tls::TlsProvider;
pub use tls_rustls::RustlsTlsProvider;
