//! Loopback HTTP server for client tests.
//!
//! Accepts one connection per canned response, records the request it
//! received and replies with `Connection: close`. Only what the client under
//! test sends is supported: a request line, headers, and a body delimited by
//! `Content-Length` or chunked encoding.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A request as seen by the server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

/// Server answering a fixed sequence of responses, then exiting.
pub struct ScriptedServer {
    base_url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl ScriptedServer {
    /// Start a server that answers each `(status, body)` pair once, in order.
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (stream, _) = listener.accept().expect("accept");
                seen.push(serve_one(stream, status, &body));
            }
            seen
        });
        ScriptedServer {
            base_url: format!("http://127.0.0.1:{}", port),
            handle,
        }
    }

    /// Start a server that answers a single request.
    pub fn once(status: u16, body: &str) -> Self {
        ScriptedServer::start(vec![(status, body.to_string())])
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Wait for every scripted response to be served and return the requests.
    pub fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().expect("server thread panicked")
    }
}

fn serve_one(stream: TcpStream, status: u16, body: &str) -> RecordedRequest {
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .expect("set timeout");
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

    let mut request_line = String::new();
    reader.read_line(&mut request_line).expect("request line");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("header line");
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let find = |name: &str| {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };
    let body_bytes = if find("transfer-encoding").is_some_and(|v| v.contains("chunked")) {
        read_chunked(&mut reader)
    } else {
        let len: usize = find("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).expect("request body");
        buf
    };

    let reason = match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let mut stream = stream;
    stream.write_all(response.as_bytes()).expect("write response");
    stream.flush().expect("flush response");

    RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8(body_bytes).expect("UTF-8 body"),
    }
}

fn read_chunked(reader: &mut impl BufRead) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader.read_line(&mut size_line).expect("chunk size");
        let size = usize::from_str_radix(size_line.trim(), 16).expect("hex chunk size");
        let mut chunk = vec![0u8; size + 2];
        reader.read_exact(&mut chunk).expect("chunk data");
        if size == 0 {
            return body;
        }
        body.extend_from_slice(&chunk[..size]);
    }
}
