//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves canned responses keyed by request path. Every connection is closed
//! after one response. A response may declare a longer `Content-Length` than
//! the body it sends, which simulates a connection dropped mid-download.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A response served for one path.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: u16,
    body: Vec<u8>,
    declared_length: usize,
}

impl CannedResponse {
    /// `200 OK` with `body`.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let declared_length = body.len();
        Self {
            status: 200,
            body,
            declared_length,
        }
    }

    /// An empty response with `status`.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            declared_length: 0,
        }
    }

    /// `200 OK` declaring `declared_length` bytes but sending only `body`.
    pub fn truncated(body: impl Into<Vec<u8>>, declared_length: usize) -> Self {
        Self {
            status: 200,
            body: body.into(),
            declared_length,
        }
    }
}

type Routes = Arc<Mutex<HashMap<String, CannedResponse>>>;

/// A running server. Threads live until the test process exits.
pub struct TestServer {
    base_url: String,
    routes: Routes,
    hits: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Bind an ephemeral loopback port and start accepting connections.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let port = listener.local_addr().expect("local addr").port();
        let routes: Routes = Arc::default();
        let hits: Arc<Mutex<Vec<String>>> = Arc::default();
        let (thread_routes, thread_hits) = (Arc::clone(&routes), Arc::clone(&hits));
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&thread_routes);
                let hits = Arc::clone(&thread_hits);
                thread::spawn(move || handle(stream, &routes, &hits));
            }
        });
        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            routes,
            hits,
        }
    }

    /// Serve `response` for GET requests to `path`.
    pub fn route(&self, path: &str, response: CannedResponse) {
        self.routes
            .lock()
            .expect("routes lock")
            .insert(path.to_owned(), response);
    }

    /// Absolute URL of `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Number of requests received for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .iter()
            .filter(|hit| *hit == path)
            .count()
    }
}

fn handle(mut stream: TcpStream, routes: &Routes, hits: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let Some(path) = read_request_path(&mut stream) else {
        return;
    };
    hits.lock().expect("hits lock").push(path.clone());
    let response = routes
        .lock()
        .expect("routes lock")
        .get(&path)
        .cloned()
        .unwrap_or_else(|| CannedResponse::status(404));

    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        response.status,
        reason_phrase(response.status),
        response.declared_length
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
    let _ = stream.shutdown(Shutdown::Both);
}

/// Read up to the end of the request head and return the request path.
fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);
    }
    let text = String::from_utf8_lossy(&request);
    let request_line = text.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    parts.next().map(str::to_owned)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}
