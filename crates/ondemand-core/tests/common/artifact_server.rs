//! Minimal HTTP/1.1 server that serves canned artifact responses for integration tests.
//!
//! Each path maps to a `Route`. The server counts requests per path and keeps
//! the last `Authorization` header it saw, so tests can assert on traffic.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Route {
    /// 200 with `body`; optional Content-Disposition; 401 unless the bearer token matches.
    File {
        body: Vec<u8>,
        content_disposition: Option<String>,
        require_token: Option<String>,
    },
    /// 302 to another path on this server.
    Redirect(String),
    /// Bare status with an empty body.
    Status(u16),
    /// Advertises `claimed_len` bytes but sends only `body`, then closes.
    Truncated { body: Vec<u8>, claimed_len: usize },
    /// 200 with a JSON body.
    Json(String),
}

impl Route {
    pub fn file(body: impl Into<Vec<u8>>) -> Self {
        Route::File {
            body: body.into(),
            content_disposition: None,
            require_token: None,
        }
    }

    pub fn attachment(body: impl Into<Vec<u8>>, disposition: &str) -> Self {
        Route::File {
            body: body.into(),
            content_disposition: Some(disposition.to_string()),
            require_token: None,
        }
    }

    pub fn protected(body: impl Into<Vec<u8>>, token: &str) -> Self {
        Route::File {
            body: body.into(),
            content_disposition: None,
            require_token: Some(token.to_string()),
        }
    }
}

#[derive(Default)]
struct Traffic {
    hits: HashMap<String, usize>,
    last_authorization: Option<String>,
}

pub struct ArtifactServer {
    base: String,
    traffic: Arc<Mutex<Traffic>>,
}

impl ArtifactServer {
    /// Starts a server in a background thread. It runs until the process exits.
    pub fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(p, r)| (p.to_string(), r))
                .collect(),
        );
        let traffic = Arc::new(Mutex::new(Traffic::default()));
        let traffic_srv = Arc::clone(&traffic);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let routes = Arc::clone(&routes);
                let traffic = Arc::clone(&traffic_srv);
                thread::spawn(move || handle(stream, &routes, &traffic));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            traffic,
        }
    }

    /// Absolute URL for `path` (which starts with '/').
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Total requests received.
    pub fn hits(&self) -> usize {
        self.traffic.lock().unwrap().hits.values().sum()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.traffic
            .lock()
            .unwrap()
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.traffic.lock().unwrap().last_authorization.clone()
    }
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    while !data.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(data).ok()
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Route>, traffic: &Mutex<Traffic>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let request = match read_head(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let (path, authorization) = parse_request(&request);
    {
        let mut t = traffic.lock().unwrap();
        *t.hits.entry(path.clone()).or_default() += 1;
        t.last_authorization = authorization.clone();
    }

    let route = match routes.get(&path) {
        Some(r) => r,
        None => {
            respond(&mut stream, "404 Not Found", &[], b"not found");
            return;
        }
    };
    match route {
        Route::File {
            body,
            content_disposition,
            require_token,
        } => {
            if let Some(token) = require_token {
                if authorization.as_deref() != Some(format!("Bearer {}", token).as_str()) {
                    respond(&mut stream, "401 Unauthorized", &[], b"");
                    return;
                }
            }
            let headers: Vec<String> = content_disposition
                .iter()
                .map(|cd| format!("Content-Disposition: {}", cd))
                .collect();
            respond(&mut stream, "200 OK", &headers, body);
        }
        Route::Redirect(to) => {
            respond(&mut stream, "302 Found", &[format!("Location: {}", to)], b"");
        }
        Route::Status(code) => {
            respond(&mut stream, &format!("{} Status", code), &[], b"");
        }
        Route::Truncated { body, claimed_len } => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                claimed_len
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
        Route::Json(json) => {
            respond(
                &mut stream,
                "200 OK",
                &["Content-Type: application/json".to_string()],
                json.as_bytes(),
            );
        }
    }
}

fn respond(stream: &mut TcpStream, status: &str, headers: &[String], body: &[u8]) {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    for h in headers {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

/// Returns (path without query, Authorization header value).
fn parse_request(request: &str) -> (String, Option<String>) {
    let mut lines = request.lines();
    let target = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/");
    let path = target.split('?').next().unwrap_or("/").to_string();
    let mut authorization = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            }
        }
    }
    (path, authorization)
}
