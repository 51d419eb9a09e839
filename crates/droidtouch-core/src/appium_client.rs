//! Async HTTP client for the Appium server.
//!
//! This module provides [`AppiumClient`], the transport layer that sends
//! [`Command`]s to an Appium server and decodes the responses using
//! [`crate::protocol`]. It owns at most one remote session at a time.
//!
//! # Example
//!
//! ```no_run
//! use droidtouch_core::appium_client::AppiumClient;
//! use droidtouch_core::protocol::Command;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = AppiumClient::new("http://127.0.0.1:4723")?;
//!
//! client.status().await?;
//! client.new_session(&json!({"platformName": "Android"})).await?;
//! client.send(&Command::Back).await?;
//! client.delete_session().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, debug_span, trace, Instrument};

use crate::protocol::{decode_response, parse_session_id, Command, Method, ProtocolError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Timeout for establishing a TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for an ordinary command round trip.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Session creation may install helper apps on the device first.
const NEW_SESSION_TIMEOUT: Duration = Duration::from_secs(180);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the Appium server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Attempted to send a session command without an active session.
    #[error("no active session")]
    NotConnected,

    /// The server could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Any other HTTP-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response was not understood, or reported a WebDriver error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::ConnectionFailed(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AppiumClient
// ---------------------------------------------------------------------------

/// HTTP client bound to one Appium server URL.
pub struct AppiumClient {
    http: reqwest::Client,
    base_url: String,
    session_id: Option<String>,
}

impl AppiumClient {
    /// Create a client for the server at `base_url`
    /// (e.g. `http://127.0.0.1:4723`, or `.../wd/hub` for Appium 1).
    ///
    /// No request is made until a method is called.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_id: None,
        })
    }

    /// The server URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The id of the open session, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Returns `true` if a session is open.
    pub fn is_connected(&self) -> bool {
        self.session_id.is_some()
    }

    /// Query `GET /status`. Succeeds once the server accepts sessions.
    pub async fn status(&self) -> Result<Value, ClientError> {
        let (status, body) = self.request(Method::Get, "/status", None, None).await?;
        Ok(decode_response(status, &body)?)
    }

    /// Create a session with the given W3C `alwaysMatch` capabilities and
    /// return its id.
    pub async fn new_session(&mut self, capabilities: &Value) -> Result<String, ClientError> {
        let body = json!({
            "capabilities": { "alwaysMatch": capabilities, "firstMatch": [{}] },
        });
        let (status, raw) = self
            .request(Method::Post, "/session", Some(&body), Some(NEW_SESSION_TIMEOUT))
            .await?;
        decode_response(status, &raw)?;

        let envelope: Value = serde_json::from_slice(&raw)
            .map_err(|e| ProtocolError::InvalidPayload(e.to_string()))?;
        let session_id = parse_session_id(&envelope)?;
        debug!(session_id = %session_id, "session created");
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Delete the open session. Does nothing if there is none.
    ///
    /// The local session is forgotten even if the server call fails.
    pub async fn delete_session(&mut self) -> Result<(), ClientError> {
        let Some(session_id) = self.session_id.take() else {
            return Ok(());
        };
        let path = format!("/session/{session_id}");
        let (status, body) = self.request(Method::Delete, &path, None, None).await?;
        decode_response(status, &body)?;
        debug!(session_id = %session_id, "session deleted");
        Ok(())
    }

    /// Send a session command and return the response `value`.
    pub async fn send(&self, command: &Command) -> Result<Value, ClientError> {
        let session_id = self.session_id.as_deref().ok_or(ClientError::NotConnected)?;
        let span = debug_span!("appium_send", command = command.name());
        async {
            let path = format!("/session/{session_id}{}", command.path());
            let body = command.body();
            let (status, raw) = self.request(command.method(), &path, body.as_ref(), None).await?;
            Ok(decode_response(status, &raw)?)
        }
        .instrument(span)
        .await
    }

    // -----------------------------------------------------------------------
    // Internal HTTP I/O
    // -----------------------------------------------------------------------

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        timeout: Option<Duration>,
    ) -> Result<(u16, Vec<u8>), ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Delete => self.http.delete(&url),
        };
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        trace!(?method, %url, "sending request");
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        trace!(status, body_bytes = bytes.len(), "received response");
        Ok((status, bytes.to_vec()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
