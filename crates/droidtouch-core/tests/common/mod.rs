//! Shared test helpers for droidtouch-core integration tests.
//!
//! This module provides a scripted mock Appium server: a plain HTTP/1.1
//! listener that answers WebDriver routes with canned JSON and records every
//! request it receives.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use droidtouch_core::appium_driver::AppiumDriver;
use droidtouch_core::capabilities::Capabilities;
use droidtouch_core::driver::AutomationDriver;
use droidtouch_core::executor::ActionExecutor;

/// Session id handed out by the mock.
pub const MOCK_SESSION: &str = "mock-session";

/// Full path of a session-relative route.
pub fn session_path(suffix: &str) -> String {
    format!("/session/{MOCK_SESSION}{suffix}")
}

// ---------------------------------------------------------------------------
// Behaviors
// ---------------------------------------------------------------------------

/// What the mock does for one matching request.
#[derive(Clone)]
pub enum MockBehavior {
    /// Reply with an HTTP status and a JSON body.
    Json(u16, Value),
    /// Sleep, then reply.
    Delay(Duration, u16, Value),
    /// Close the connection without replying.
    Drop,
    /// Reply 200 with a body that is not JSON.
    Garbage,
}

impl MockBehavior {
    /// `{"value": value}` with status 200.
    pub fn ok(value: Value) -> Self {
        MockBehavior::Json(200, json!({ "value": value }))
    }

    /// A W3C error envelope.
    pub fn error(status: u16, error: &str, message: &str) -> Self {
        MockBehavior::Json(status, json!({ "value": { "error": error, "message": message } }))
    }
}

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

type RouteKey = (String, String);

/// Scripted responses. A route with several behaviors plays them in order
/// and then keeps repeating the last one.
#[derive(Default, Clone)]
pub struct MockScript {
    routes: HashMap<RouteKey, VecDeque<MockBehavior>>,
    defaults: HashSet<RouteKey>,
}

impl MockScript {
    /// A script that already answers session creation, deletion and status.
    pub fn new() -> Self {
        let mut script = Self::default()
            .on("GET", "/status", MockBehavior::ok(json!({ "ready": true })))
            .on(
                "POST",
                "/session",
                MockBehavior::ok(json!({ "sessionId": MOCK_SESSION, "capabilities": {} })),
            )
            .on("DELETE", &session_path(""), MockBehavior::ok(Value::Null));
        script.defaults = script.routes.keys().cloned().collect();
        script
    }

    /// Appends a behavior for `method path`. The first call for a route set
    /// up by [`MockScript::new`] replaces the default.
    pub fn on(mut self, method: &str, path: &str, behavior: MockBehavior) -> Self {
        let key = (method.to_string(), path.to_string());
        let replace = self.defaults.remove(&key);
        let queue = self.routes.entry(key).or_default();
        if replace {
            queue.clear();
        }
        queue.push_back(behavior);
        self
    }

    /// Shorthand for a session-relative route answering `{"value": value}`.
    pub fn on_session(self, method: &str, suffix: &str, value: Value) -> Self {
        self.on(method, &session_path(suffix), MockBehavior::ok(value))
    }

    fn next(&mut self, method: &str, path: &str) -> MockBehavior {
        let key = (method.to_string(), path.to_string());
        match self.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(MockBehavior::Drop),
            Some(queue) => queue.front().cloned().unwrap_or(MockBehavior::Drop),
            None if method == "POST" || method == "DELETE" => MockBehavior::ok(Value::Null),
            None => MockBehavior::error(404, "unknown command", &format!("{method} {path}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// A running mock Appium server.
pub struct MockAppium {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockAppium {
    /// Starts serving `script` on an ephemeral port.
    pub async fn start(script: MockScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(Mutex::new(script));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(serve_connection(stream, script.clone(), recorded.clone()));
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `METHOD path` lines of requests to session routes, without the
    /// session prefix (e.g. `POST /actions`).
    pub fn session_calls(&self) -> Vec<String> {
        let prefix = session_path("");
        self.requests()
            .into_iter()
            .filter_map(|r| {
                let rest = r.path.strip_prefix(&prefix)?;
                (!rest.is_empty()).then(|| format!("{} {}", r.method, rest))
            })
            .collect()
    }

    /// Body of the last request to `method path`.
    pub fn last_body(&self, method: &str, path: &str) -> Option<Value> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| r.body)
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    script: Arc<Mutex<MockScript>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut buf = Vec::new();
    loop {
        let Some((method, path, body)) = read_request(&mut stream, &mut buf).await else {
            return;
        };
        requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            body: serde_json::from_slice(&body).ok(),
        });

        let behavior = script.lock().unwrap().next(&method, &path);
        let (status, payload) = match behavior {
            MockBehavior::Json(status, value) => (status, value.to_string()),
            MockBehavior::Delay(duration, status, value) => {
                tokio::time::sleep(duration).await;
                (status, value.to_string())
            }
            MockBehavior::Drop => return,
            MockBehavior::Garbage => (200, "<html>not json</html>".to_string()),
        };

        let reply = format!(
            "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}",
            payload.len()
        );
        if stream.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// Reads one request from a keep-alive connection. `buf` carries bytes that
/// arrived past the end of the previous request.
async fn read_request(stream: &mut TcpStream, buf: &mut Vec<u8>) -> Option<(String, String, Vec<u8>)> {
    let mut chunk = [0u8; 8192];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = buf[body_start..body_start + content_length].to_vec();
    buf.drain(..body_start + content_length);
    Some((method, path, body))
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

/// A 1000x2000 window rect, the screen used throughout the tests.
pub fn window_rect() -> Value {
    json!({ "x": 0, "y": 0, "width": 1000, "height": 2000 })
}

/// Starts a mock, connects an [`AppiumDriver`] to it and wraps it in an
/// executor.
pub async fn connected_executor(script: MockScript) -> (MockAppium, ActionExecutor) {
    let mock = MockAppium::start(script).await;
    let mut driver = AppiumDriver::new(mock.url(), Capabilities::default());
    driver.connect().await.unwrap();
    let executor = ActionExecutor::new(Arc::new(driver));
    (mock, executor)
}

/// Generate a unique name for test isolation.
pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}
