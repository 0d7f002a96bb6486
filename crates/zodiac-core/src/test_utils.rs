//! Shared test helpers: a passthrough TLS provider and a scripted
//! plain-TCP Gemini server.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::backend::NetworkStream;
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::net::TlsProvider;

/// How long the server waits for the next connection before giving up.
const ACCEPT_WINDOW: Duration = Duration::from_millis(1500);

/// Hands the TCP stream back unchanged so the protocol can be tested
/// over plain sockets.
pub struct PassthroughTlsProvider;

impl TlsProvider for PassthroughTlsProvider {
    fn connect_tls(
        &self,
        stream: Box<dyn NetworkStream>,
        _server_name: &str,
        _cancel: &CancelToken,
        _deadline: Instant,
    ) -> Result<Box<dyn NetworkStream>> {
        Ok(stream)
    }
}

/// A local listener that answers each accepted connection with the next
/// scripted response.
pub struct TestServer {
    listener: TcpListener,
    pub port: u16,
}

impl TestServer {
    pub fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    pub fn url(&self, path: &str) -> String {
        format!("gemini://127.0.0.1:{}{path}", self.port)
    }

    /// Answer one connection per response, in order, then close each.
    /// Stops early when no client connects within the accept window.
    /// The handle yields the request lines received.
    pub fn serve(self, responses: Vec<Vec<u8>>) -> JoinHandle<Vec<String>> {
        std::thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let Some(mut stream) = accept_within(&self.listener, ACCEPT_WINDOW) else {
                    break;
                };
                requests.push(read_request(&mut stream));
                let _ = stream.write_all(&response);
                let _ = stream.flush();
            }
            requests
        })
    }

    /// Answer one connection with `prefix`, then hold it open for `hold`.
    pub fn serve_stalling(self, prefix: Vec<u8>, hold: Duration) -> JoinHandle<Vec<String>> {
        std::thread::spawn(move || {
            let Some(mut stream) = accept_within(&self.listener, ACCEPT_WINDOW) else {
                return Vec::new();
            };
            let request = read_request(&mut stream);
            let _ = stream.write_all(&prefix);
            let _ = stream.flush();
            std::thread::sleep(hold);
            vec![request]
        })
    }

    /// Answer one connection with `prefix`, then reset it. The request is
    /// left unread, so closing the socket sends RST instead of FIN.
    pub fn serve_resetting(self, prefix: Vec<u8>) -> JoinHandle<()> {
        std::thread::spawn(move || {
            let Some(mut stream) = accept_within(&self.listener, ACCEPT_WINDOW) else {
                return;
            };
            let _ = stream.write_all(&prefix);
            let _ = stream.flush();
            // Let the client take the prefix and its request arrive unread.
            std::thread::sleep(Duration::from_millis(300));
            drop(stream);
        })
    }
}

fn accept_within(listener: &TcpListener, window: Duration) -> Option<TcpStream> {
    listener.set_nonblocking(true).ok()?;
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).ok()?;
                return Some(stream);
            },
            Err(_) => std::thread::sleep(Duration::from_millis(10)),
        }
    }
    None
}

/// Read up to and including the request's CRLF.
fn read_request(stream: &mut TcpStream) -> String {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut request = Vec::new();
    let mut byte = [0u8; 1];
    while !request.ends_with(b"\r\n") {
        match stream.read(&mut byte) {
            Ok(1) => request.push(byte[0]),
            _ => break,
        }
    }
    String::from_utf8_lossy(&request).into_owned()
}
