//! Minimal HTTP/1.1 server standing in for Drive in integration tests.
//!
//! Each request target is matched against the registered fragments in order and
//! answered with the first matching canned reply; the connection is then closed.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Reply {
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
    /// Content-Length to announce; larger than `body` simulates a dropped transfer.
    content_length: usize,
}

impl Reply {
    pub fn file(body: &[u8]) -> Self {
        Self {
            status: "200 OK",
            content_type: "application/octet-stream",
            body: body.to_vec(),
            content_length: body.len(),
        }
    }

    pub fn html(status: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.as_bytes().to_vec(),
            content_length: body.len(),
        }
    }

    pub fn cut_short(body: &[u8], promised: usize) -> Self {
        Self {
            content_length: promised,
            ..Self::file(body)
        }
    }
}

pub struct DriveServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl DriveServer {
    /// Request targets seen so far, e.g. `/uc?export=download&id=ABC`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Starts the server on an ephemeral port. It runs until the process exits.
pub fn start(routes: Vec<(&'static str, Reply)>) -> DriveServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let seen = Arc::clone(&seen);
            thread::spawn(move || handle(stream, &routes, &seen));
        }
    });
    DriveServer {
        base_url: format!("http://127.0.0.1:{port}"),
        requests,
    }
}

fn handle(mut stream: TcpStream, routes: &[(&'static str, Reply)], seen: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));

    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let request = String::from_utf8_lossy(&request);
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string();
    seen.lock().unwrap().push(target.clone());

    let reply = routes
        .iter()
        .find(|(fragment, _)| target.contains(fragment))
        .map(|(_, reply)| reply.clone())
        .unwrap_or_else(|| Reply::html("404 Not Found", "<html>missing</html>"));
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        reply.status, reply.content_type, reply.content_length
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&reply.body);
    let _ = stream.flush();
}
