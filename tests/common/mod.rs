//! In-process HTTP stub node for integration tests
//!
//! Speaks just enough HTTP/1.1 to answer `POST /remote/{operation}` with a
//! scripted reply. Every request is recorded.

#![allow(dead_code)]

use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use nodectl::Node;

/// How the stub answers one request
pub enum Reply {
    Json(u16, Value),
    Empty(u16),
    /// Hold the connection open without answering
    Hang(Duration),
    /// Send the status line, then close before the announced body arrives
    Truncated(u16),
}

/// One request as seen by the stub
#[derive(Debug, Clone)]
pub struct Request {
    pub operation: String,
    pub body: Value,
    pub authorization: Option<String>,
}

type Handler = dyn Fn(&str, &Value) -> Reply + Send + Sync;

pub struct StubNode {
    pub port: u16,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl StubNode {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Arc<Handler> = Arc::new(handler);

        let recorded = requests.clone();
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let handler = handler.clone();
                let recorded = recorded.clone();
                thread::spawn(move || serve(stream, handler, recorded));
            }
        });

        Self { port, requests }
    }

    /// Address of a port nothing listens on
    pub fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    pub fn host(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn node(&self, name: &str) -> Node {
        Node::new(name, self.host()).with_scheme("http")
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, operation: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.operation == operation)
            .collect()
    }
}

fn serve(stream: TcpStream, handler: Arc<Handler>, recorded: Arc<Mutex<Vec<Request>>>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let path = request_line.split_whitespace().nth(1).unwrap_or("").to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.to_string());
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let operation = path.trim_start_matches("/remote/").to_string();

    recorded.lock().unwrap().push(Request {
        operation: operation.clone(),
        body: body.clone(),
        authorization,
    });

    let (status, payload) = match handler(&operation, &body) {
        Reply::Json(status, value) => (status, value.to_string()),
        Reply::Empty(status) => (status, String::new()),
        Reply::Hang(duration) => {
            thread::sleep(duration);
            return;
        }
        Reply::Truncated(status) => {
            let mut stream = stream;
            let head = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: 64\r\nConnection: close\r\n\r\n{{\"partial\"",
                status
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.flush();
            return;
        }
    };

    let mut stream = stream;
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Named argument of a recorded request
pub fn kwarg<'a>(request: &'a Request, key: &str) -> Option<&'a Value> {
    request.body.get("kwargs").and_then(|kwargs| kwargs.get(key))
}
