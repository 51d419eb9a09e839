//! JSON wire protocol for the Appium server.
//!
//! Appium speaks W3C WebDriver plus a set of `/appium/...` extension routes,
//! all as JSON over HTTP. This module is the pure half of that conversation:
//! it maps [`Command`]s to an HTTP method, a session-relative path and a JSON
//! body, and decodes response envelopes. Nothing here performs I/O; see
//! [`crate::appium_client`] for the transport.
//!
//! # Response envelope
//!
//! ```text
//! 200 {"value": <result>}
//! 4xx/5xx {"value": {"error": "no such element", "message": "...", "stacktrace": "..."}}
//! ```
//!
//! Legacy JSON Wire Protocol responses (`{"status": 7, "value": {...}}`) are
//! also understood, since older Appium builds still emit them for some routes.
//!
//! # Example
//!
//! ```
//! use droidtouch_core::protocol::{Command, Method};
//!
//! let cmd = Command::PressKeycode(4);
//! assert_eq!(cmd.method(), Method::Post);
//! assert_eq!(cmd.path(), "/appium/device/press_keycode");
//! assert_eq!(cmd.body().unwrap()["keycode"], 4);
//! ```

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::element::{ElementId, ElementRect};
use crate::gesture::{FingerPath, TouchStep};

/// Key under which W3C servers return element references.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Key under which legacy JSON Wire Protocol servers return element references.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error reported by the remote end in a WebDriver error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebDriverError {
    /// The W3C error code, e.g. `"no such element"`.
    pub error: String,
    /// Human-readable detail.
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for WebDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.error)
        } else {
            write!(f, "{}: {}", self.error, self.message)
        }
    }
}

/// Errors that can occur while decoding server responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The body was not JSON, or lacked the fields this route returns.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The server reported a WebDriver error.
    #[error("{0}")]
    Remote(WebDriverError),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// Session-scoped commands understood by the Appium server.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    WindowRect,
    SetImplicitWait { ms: u64 },
    FindElement { using: &'static str, value: String },
    ElementRect(ElementId),
    ElementClick(ElementId),
    ElementClear(ElementId),
    ElementSendKeys(ElementId, String),
    /// W3C actions; `move_duration_ms` is the duration of every pointer move
    /// after the initial positioning.
    PerformActions { fingers: Vec<FingerPath>, move_duration_ms: u64 },
    ReleaseActions,
    Back,
    Source,
    Screenshot,
    GetNetworkConnection,
    SetNetworkConnection(u32),
    PressKeycode(u32),
    LongPressKeycode(u32),
    Shake,
    Lock(Option<u32>),
    Unlock,
    IsLocked,
    FingerPrint(u8),
    IsKeyboardShown,
    HideKeyboard,
    NetworkSpeed(&'static str),
    SendSms { phone: String, message: String },
    GsmCall { phone: String, action: &'static str },
    GsmSignal(u8),
    GsmVoice(&'static str),
    StartRecording,
    StopRecording,
}

impl Command {
    /// Returns a short, static name for this command suitable for tracing
    /// span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Command::WindowRect => "window_rect",
            Command::SetImplicitWait { .. } => "set_implicit_wait",
            Command::FindElement { .. } => "find_element",
            Command::ElementRect(_) => "element_rect",
            Command::ElementClick(_) => "element_click",
            Command::ElementClear(_) => "element_clear",
            Command::ElementSendKeys(..) => "element_send_keys",
            Command::PerformActions { .. } => "perform_actions",
            Command::ReleaseActions => "release_actions",
            Command::Back => "back",
            Command::Source => "source",
            Command::Screenshot => "screenshot",
            Command::GetNetworkConnection => "get_network_connection",
            Command::SetNetworkConnection(_) => "set_network_connection",
            Command::PressKeycode(_) => "press_keycode",
            Command::LongPressKeycode(_) => "long_press_keycode",
            Command::Shake => "shake",
            Command::Lock(_) => "lock",
            Command::Unlock => "unlock",
            Command::IsLocked => "is_locked",
            Command::FingerPrint(_) => "finger_print",
            Command::IsKeyboardShown => "is_keyboard_shown",
            Command::HideKeyboard => "hide_keyboard",
            Command::NetworkSpeed(_) => "network_speed",
            Command::SendSms { .. } => "send_sms",
            Command::GsmCall { .. } => "gsm_call",
            Command::GsmSignal(_) => "gsm_signal",
            Command::GsmVoice(_) => "gsm_voice",
            Command::StartRecording => "start_recording_screen",
            Command::StopRecording => "stop_recording_screen",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Command::WindowRect
            | Command::ElementRect(_)
            | Command::Source
            | Command::Screenshot
            | Command::GetNetworkConnection
            | Command::IsKeyboardShown => Method::Get,
            Command::ReleaseActions => Method::Delete,
            _ => Method::Post,
        }
    }

    /// Path relative to `/session/{id}`.
    pub fn path(&self) -> String {
        match self {
            Command::WindowRect => "/window/rect".into(),
            Command::SetImplicitWait { .. } => "/timeouts".into(),
            Command::FindElement { .. } => "/element".into(),
            Command::ElementRect(id) => format!("/element/{id}/rect"),
            Command::ElementClick(id) => format!("/element/{id}/click"),
            Command::ElementClear(id) => format!("/element/{id}/clear"),
            Command::ElementSendKeys(id, _) => format!("/element/{id}/value"),
            Command::PerformActions { .. } | Command::ReleaseActions => "/actions".into(),
            Command::Back => "/back".into(),
            Command::Source => "/source".into(),
            Command::Screenshot => "/screenshot".into(),
            Command::GetNetworkConnection | Command::SetNetworkConnection(_) => "/network_connection".into(),
            Command::PressKeycode(_) => "/appium/device/press_keycode".into(),
            Command::LongPressKeycode(_) => "/appium/device/long_press_keycode".into(),
            Command::Shake => "/appium/device/shake".into(),
            Command::Lock(_) => "/appium/device/lock".into(),
            Command::Unlock => "/appium/device/unlock".into(),
            Command::IsLocked => "/appium/device/is_locked".into(),
            Command::FingerPrint(_) => "/appium/device/finger_print".into(),
            Command::IsKeyboardShown => "/appium/device/is_keyboard_shown".into(),
            Command::HideKeyboard => "/appium/device/hide_keyboard".into(),
            Command::NetworkSpeed(_) => "/appium/device/network_speed".into(),
            Command::SendSms { .. } => "/appium/device/send_sms".into(),
            Command::GsmCall { .. } => "/appium/device/gsm_call".into(),
            Command::GsmSignal(_) => "/appium/device/gsm_signal".into(),
            Command::GsmVoice(_) => "/appium/device/gsm_voice".into(),
            Command::StartRecording => "/appium/start_recording_screen".into(),
            Command::StopRecording => "/appium/stop_recording_screen".into(),
        }
    }

    /// JSON body for POST routes. GET and DELETE routes have none.
    pub fn body(&self) -> Option<Value> {
        let body = match self {
            Command::WindowRect
            | Command::ElementRect(_)
            | Command::Source
            | Command::Screenshot
            | Command::GetNetworkConnection
            | Command::IsKeyboardShown
            | Command::ReleaseActions => return None,
            Command::SetImplicitWait { ms } => json!({ "implicit": ms }),
            Command::FindElement { using, value } => json!({ "using": using, "value": value }),
            Command::ElementSendKeys(_, text) => json!({
                "text": text,
                "value": text.chars().map(String::from).collect::<Vec<_>>(),
            }),
            Command::PerformActions { fingers, move_duration_ms } => {
                json!({ "actions": encode_actions(fingers, *move_duration_ms) })
            }
            Command::SetNetworkConnection(bitmask) => json!({ "parameters": { "type": bitmask } }),
            Command::PressKeycode(code) | Command::LongPressKeycode(code) => json!({ "keycode": code }),
            Command::Lock(Some(seconds)) => json!({ "seconds": seconds }),
            Command::FingerPrint(id) => json!({ "fingerprintId": id }),
            Command::NetworkSpeed(speed) => json!({ "netspeed": speed }),
            Command::SendSms { phone, message } => json!({ "phoneNumber": phone, "message": message }),
            Command::GsmCall { phone, action } => json!({ "phoneNumber": phone, "action": action }),
            // Older UiAutomator2 drivers read the misspelled key.
            Command::GsmSignal(level) => json!({ "signalStrength": level, "signalStrengh": level }),
            Command::GsmVoice(state) => json!({ "state": state }),
            Command::StartRecording => json!({ "options": {} }),
            Command::ElementClick(_)
            | Command::ElementClear(_)
            | Command::Back
            | Command::Shake
            | Command::Lock(None)
            | Command::Unlock
            | Command::IsLocked
            | Command::HideKeyboard
            | Command::StopRecording => json!({}),
        };
        Some(body)
    }
}

// ---------------------------------------------------------------------------
// W3C actions encoding
// ---------------------------------------------------------------------------

/// Encodes finger paths as W3C pointer input sources, one touch pointer per
/// finger (`finger1`, `finger2`, ...).
///
/// The press point is reached with a zero-duration move; every later move
/// takes `move_duration_ms`.
pub fn encode_actions(fingers: &[FingerPath], move_duration_ms: u64) -> Value {
    let sources: Vec<Value> = fingers
        .iter()
        .enumerate()
        .map(|(index, finger)| {
            let actions: Vec<Value> = finger
                .steps()
                .iter()
                .flat_map(|step| match step {
                    TouchStep::Press(p) => vec![
                        pointer_move(p.x, p.y, 0),
                        json!({ "type": "pointerDown", "button": 0 }),
                    ],
                    TouchStep::Wait { ms } => vec![json!({ "type": "pause", "duration": ms })],
                    TouchStep::MoveTo(p) => vec![pointer_move(p.x, p.y, move_duration_ms)],
                    TouchStep::Release => vec![json!({ "type": "pointerUp", "button": 0 })],
                })
                .collect();
            json!({
                "type": "pointer",
                "id": format!("finger{}", index + 1),
                "parameters": { "pointerType": "touch" },
                "actions": actions,
            })
        })
        .collect();
    Value::Array(sources)
}

fn pointer_move(x: i32, y: i32, duration: u64) -> Value {
    json!({ "type": "pointerMove", "duration": duration, "origin": "viewport", "x": x, "y": y })
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

/// Legacy JSON Wire Protocol status codes worth naming.
fn legacy_status_error(status: i64) -> &'static str {
    match status {
        6 => "invalid session id",
        7 => "no such element",
        21 => "timeout",
        33 => "session not created",
        _ => "unknown error",
    }
}

/// Decodes a response envelope and returns its `value`.
///
/// An HTTP error status or a legacy non-zero `status` field yields
/// [`ProtocolError::Remote`].
pub fn decode_response(http_status: u16, body: &[u8]) -> Result<Value, ProtocolError> {
    let envelope: Value = serde_json::from_slice(body).map_err(|e| {
        let preview: String = String::from_utf8_lossy(body).chars().take(120).collect();
        ProtocolError::InvalidPayload(format!("HTTP {http_status}: {e} (body: {preview})"))
    })?;

    let value = envelope.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value.get("message").and_then(Value::as_str).unwrap_or_default();
        return Err(ProtocolError::Remote(WebDriverError {
            error: error.to_string(),
            message: message.to_string(),
        }));
    }

    if let Some(status) = envelope.get("status").and_then(Value::as_i64) {
        if status != 0 {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Err(ProtocolError::Remote(WebDriverError {
                error: legacy_status_error(status).to_string(),
                message,
            }));
        }
    }

    if !(200..300).contains(&http_status) {
        return Err(ProtocolError::Remote(WebDriverError {
            error: "unknown error".to_string(),
            message: format!("HTTP {http_status}: {value}"),
        }));
    }

    Ok(if envelope.get("value").is_some() { value } else { envelope })
}

/// Extracts the session id from a new-session response.
///
/// `envelope` is the whole response body, since legacy servers put the id
/// next to `value` rather than inside it.
pub fn parse_session_id(envelope: &Value) -> Result<String, ProtocolError> {
    envelope
        .get("value")
        .and_then(|v| v.get("sessionId"))
        .or_else(|| envelope.get("sessionId"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::InvalidPayload("response has no sessionId".into()))
}

/// Extracts an element reference from a find-element result.
pub fn parse_element_id(value: &Value) -> Result<ElementId, ProtocolError> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(|id| ElementId(id.to_string()))
        .ok_or_else(|| ProtocolError::InvalidPayload(format!("not an element reference: {value}")))
}

/// Decodes a rectangle (`{x, y, width, height}`).
pub fn parse_rect(value: &Value) -> Result<ElementRect, ProtocolError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ProtocolError::InvalidPayload(format!("invalid rect {value}: {e}")))
}

/// Decodes a boolean result.
pub fn parse_bool(value: &Value) -> Result<bool, ProtocolError> {
    value
        .as_bool()
        .ok_or_else(|| ProtocolError::InvalidPayload(format!("expected a boolean, got {value}")))
}

/// Decodes the network connection bitmask.
pub fn parse_bitmask(value: &Value) -> Result<u32, ProtocolError> {
    value
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| ProtocolError::InvalidPayload(format!("expected a connection bitmask, got {value}")))
}

/// Decodes a base64 string result (screenshots, recordings).
///
/// Line breaks inside the payload are tolerated.
pub fn parse_base64(value: &Value) -> Result<Vec<u8>, ProtocolError> {
    let encoded = value
        .as_str()
        .ok_or_else(|| ProtocolError::InvalidPayload("expected a base64 string".into()))?;
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ProtocolError::InvalidPayload(format!("invalid base64: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
