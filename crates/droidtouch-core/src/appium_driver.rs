//! [`AutomationDriver`] implementation backed by an Appium server.
//!
//! This module provides [`AppiumDriver`], which implements the
//! [`AutomationDriver`] trait by opening a session on an Appium server and
//! translating each trait method into a [`Command`] sent through
//! [`AppiumClient`].
//!
//! # Example
//!
//! ```no_run
//! use droidtouch_core::appium_driver::AppiumDriver;
//! use droidtouch_core::capabilities::Capabilities;
//! use droidtouch_core::driver::AutomationDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let caps = Capabilities {
//!     device_name: Some("emulator-5554".into()),
//!     app_package: Some("com.android.settings".into()),
//!     app_activity: Some(".Settings".into()),
//!     ..Default::default()
//! };
//! let mut driver = AppiumDriver::new("http://127.0.0.1:4723", caps);
//! driver.connect().await?;
//! println!("screen is {}", driver.window_size().await?);
//! driver.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::appium_client::{AppiumClient, ClientError};
use crate::capabilities::Capabilities;
use crate::config::DroidtouchConfig;
use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementId, ElementRect};
use crate::geometry::ScreenSize;
use crate::gesture::FingerPath;
use crate::network::{GsmCallAction, GsmSignal, GsmVoiceState, NetworkSpeed, NetworkState, NetworkType};
use crate::protocol::{
    parse_base64, parse_bitmask, parse_bool, parse_element_id, parse_rect, Command, ProtocolError,
    WebDriverError,
};
use crate::target::Locator;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Maps a WebDriver error code to a [`DriverError`].
fn map_webdriver_error(err: WebDriverError) -> DriverError {
    match err.error.as_str() {
        "no such element" | "stale element reference" => DriverError::ElementNotFound(err.message),
        "session not created" => DriverError::SessionNotCreated(err.to_string()),
        "invalid session id" => DriverError::ConnectionLost(format!("session ended: {err}")),
        "timeout" | "script timeout" => DriverError::Timeout,
        _ => DriverError::CommandFailed(err.to_string()),
    }
}

/// Maps an [`ClientError`] to a [`DriverError`].
fn map_client_error(err: ClientError) -> DriverError {
    match err {
        ClientError::NotConnected => DriverError::NotConnected,
        ClientError::ConnectionFailed(msg) => DriverError::ConnectionLost(msg),
        ClientError::Timeout => DriverError::Timeout,
        ClientError::Http(msg) => DriverError::Http(msg),
        ClientError::Protocol(ProtocolError::InvalidPayload(msg)) => DriverError::JsonParse(msg),
        ClientError::Protocol(ProtocolError::Remote(err)) => map_webdriver_error(err),
    }
}

fn map_protocol_error(err: ProtocolError) -> DriverError {
    map_client_error(ClientError::Protocol(err))
}

// ---------------------------------------------------------------------------
// AppiumDriver
// ---------------------------------------------------------------------------

/// An [`AutomationDriver`] backed by an Appium session.
///
/// The client is wrapped in a [`tokio::sync::Mutex`] so that the `&self`
/// trait methods can be called from shared references while commands to the
/// single remote session stay strictly serialized.
pub struct AppiumDriver {
    server_url: String,
    capabilities: Capabilities,
    move_duration_ms: u64,
    client: Mutex<Option<AppiumClient>>,
}

impl AppiumDriver {
    /// Creates a driver for the given server and capabilities.
    ///
    /// No connection is established until [`connect`](AutomationDriver::connect) is called.
    pub fn new(server_url: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            server_url: server_url.into(),
            capabilities,
            move_duration_ms: 50,
            client: Mutex::new(None),
        }
    }

    /// Creates a driver from the persisted configuration.
    pub fn from_config(config: &DroidtouchConfig) -> Self {
        Self::new(config.server_url.clone(), config.capabilities.clone())
            .with_move_duration(config.move_duration_ms)
    }

    /// Sets the duration of each pointer move inside a gesture.
    pub fn with_move_duration(mut self, ms: u64) -> Self {
        self.move_duration_ms = ms;
        self
    }

    /// Returns the configured server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Returns the capabilities used for new sessions.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Creates a new [`AppiumClient`] and opens a session on it.
    async fn create_client(&self) -> Result<AppiumClient, DriverError> {
        let mut client = AppiumClient::new(self.server_url.clone()).map_err(map_client_error)?;
        client
            .new_session(&self.capabilities.to_w3c())
            .await
            .map_err(|e| match e {
                ClientError::ConnectionFailed(msg) => DriverError::ConnectionLost(format!(
                    "could not reach {} (is the Appium server running?): {msg}",
                    self.server_url
                )),
                ClientError::Protocol(ProtocolError::Remote(err)) => {
                    DriverError::SessionNotCreated(err.to_string())
                }
                other => map_client_error(other),
            })?;
        Ok(client)
    }

    /// Sends a command via the inner [`AppiumClient`], mapping errors to
    /// [`DriverError`].
    async fn send(&self, command: Command) -> Result<Value, DriverError> {
        let guard = self.client.lock().await;
        let client = guard.as_ref().ok_or(DriverError::NotConnected)?;
        client.send(&command).await.map_err(map_client_error)
    }

    /// Sends a command whose result value is irrelevant.
    async fn send_ok(&self, command: Command) -> Result<(), DriverError> {
        self.send(command).await.map(|_| ())
    }
}

#[async_trait]
impl AutomationDriver for AppiumDriver {
    #[instrument(skip(self), level = "debug")]
    async fn connect(&mut self) -> Result<(), DriverError> {
        let client = self.create_client().await?;
        info!(
            session_id = client.session_id().unwrap_or_default(),
            device = %self.capabilities.describe(),
            "session opened"
        );
        *self.client.lock().await = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client
            .try_lock()
            .map(|g| g.as_ref().is_some_and(AppiumClient::is_connected))
            .unwrap_or(false)
    }

    #[instrument(skip(self), level = "debug")]
    async fn disconnect(&self) -> Result<(), DriverError> {
        let Some(mut client) = self.client.lock().await.take() else {
            return Ok(());
        };
        client.delete_session().await.map_err(map_client_error)?;
        info!("session closed");
        Ok(())
    }

    async fn window_size(&self) -> Result<ScreenSize, DriverError> {
        let value = self.send(Command::WindowRect).await?;
        let rect = parse_rect(&value).map_err(map_protocol_error)?;
        let size = ScreenSize::from_reported(rect.width as i64, rect.height as i64)?;
        debug!(%size, "window size");
        Ok(size)
    }

    async fn set_implicit_wait(&self, timeout_ms: u64) -> Result<(), DriverError> {
        self.send_ok(Command::SetImplicitWait { ms: timeout_ms }).await
    }

    #[instrument(skip(self), level = "debug", fields(locator = %locator))]
    async fn find_element(&self, locator: &Locator) -> Result<ElementId, DriverError> {
        let value = self
            .send(Command::FindElement {
                using: locator.using(),
                value: locator.value().to_string(),
            })
            .await
            .map_err(|e| match e {
                DriverError::ElementNotFound(_) => DriverError::ElementNotFound(locator.to_string()),
                other => other,
            })?;
        parse_element_id(&value).map_err(map_protocol_error)
    }

    async fn element_rect(&self, element: &ElementId) -> Result<ElementRect, DriverError> {
        let value = self.send(Command::ElementRect(element.clone())).await?;
        parse_rect(&value).map_err(map_protocol_error)
    }

    async fn click_element(&self, element: &ElementId) -> Result<(), DriverError> {
        self.send_ok(Command::ElementClick(element.clone())).await
    }

    async fn clear_element(&self, element: &ElementId) -> Result<(), DriverError> {
        self.send_ok(Command::ElementClear(element.clone())).await
    }

    #[instrument(skip(self, text), level = "debug")]
    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError> {
        self.send_ok(Command::ElementSendKeys(element.clone(), text.to_string())).await
    }

    #[instrument(skip(self, fingers), level = "debug", fields(fingers = fingers.len()))]
    async fn perform_actions(&self, fingers: &[FingerPath]) -> Result<(), DriverError> {
        let performed = self
            .send_ok(Command::PerformActions {
                fingers: fingers.to_vec(),
                move_duration_ms: self.move_duration_ms,
            })
            .await;
        let released = self.send_ok(Command::ReleaseActions).await;
        performed?;
        released
    }

    async fn press_keycode(&self, code: u32) -> Result<(), DriverError> {
        self.send_ok(Command::PressKeycode(code)).await
    }

    async fn long_press_keycode(&self, code: u32) -> Result<(), DriverError> {
        self.send_ok(Command::LongPressKeycode(code)).await
    }

    async fn back(&self) -> Result<(), DriverError> {
        self.send_ok(Command::Back).await
    }

    async fn shake(&self) -> Result<(), DriverError> {
        self.send_ok(Command::Shake).await
    }

    async fn lock(&self, seconds: Option<u32>) -> Result<(), DriverError> {
        self.send_ok(Command::Lock(seconds)).await
    }

    async fn unlock(&self) -> Result<(), DriverError> {
        self.send_ok(Command::Unlock).await
    }

    async fn is_locked(&self) -> Result<bool, DriverError> {
        let value = self.send(Command::IsLocked).await?;
        parse_bool(&value).map_err(map_protocol_error)
    }

    async fn finger_print(&self, finger_id: u8) -> Result<(), DriverError> {
        self.send_ok(Command::FingerPrint(finger_id)).await
    }

    async fn is_keyboard_shown(&self) -> Result<bool, DriverError> {
        let value = self.send(Command::IsKeyboardShown).await?;
        parse_bool(&value).map_err(map_protocol_error)
    }

    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        self.send_ok(Command::HideKeyboard).await
    }

    async fn network_connection(&self) -> Result<NetworkState, DriverError> {
        let value = self.send(Command::GetNetworkConnection).await?;
        let bitmask = parse_bitmask(&value).map_err(map_protocol_error)?;
        Ok(NetworkState::from_bitmask(bitmask))
    }

    async fn set_network_connection(&self, network: NetworkType) -> Result<NetworkState, DriverError> {
        let value = self.send(Command::SetNetworkConnection(network.bitmask())).await?;
        // Some drivers answer null instead of echoing the new state.
        let bitmask = parse_bitmask(&value).unwrap_or_else(|_| network.bitmask());
        Ok(NetworkState::from_bitmask(bitmask))
    }

    async fn set_network_speed(&self, speed: NetworkSpeed) -> Result<(), DriverError> {
        self.send_ok(Command::NetworkSpeed(speed.as_str())).await
    }

    async fn send_sms(&self, phone: &str, message: &str) -> Result<(), DriverError> {
        self.send_ok(Command::SendSms {
            phone: phone.to_string(),
            message: message.to_string(),
        })
        .await
    }

    async fn gsm_call(&self, phone: &str, action: GsmCallAction) -> Result<(), DriverError> {
        self.send_ok(Command::GsmCall {
            phone: phone.to_string(),
            action: action.as_str(),
        })
        .await
    }

    async fn gsm_signal(&self, strength: GsmSignal) -> Result<(), DriverError> {
        self.send_ok(Command::GsmSignal(strength.level())).await
    }

    async fn gsm_voice(&self, state: GsmVoiceState) -> Result<(), DriverError> {
        self.send_ok(Command::GsmVoice(state.as_str())).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn page_source(&self) -> Result<String, DriverError> {
        let value = self.send(Command::Source).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::JsonParse("page source is not a string".to_string()))
    }

    #[instrument(skip(self), level = "debug")]
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let value = self.send(Command::Screenshot).await?;
        let data = parse_base64(&value).map_err(map_protocol_error)?;
        debug!(bytes = data.len(), "screenshot captured");
        Ok(data)
    }

    async fn start_recording(&self) -> Result<(), DriverError> {
        self.send_ok(Command::StartRecording).await
    }

    async fn stop_recording(&self) -> Result<Vec<u8>, DriverError> {
        let value = self.send(Command::StopRecording).await?;
        parse_base64(&value).map_err(map_protocol_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(code: &str) -> ClientError {
        ClientError::Protocol(ProtocolError::Remote(WebDriverError {
            error: code.to_string(),
            message: "detail".to_string(),
        }))
    }

    #[test]
    fn new_driver_is_disconnected() {
        let driver = AppiumDriver::new("http://127.0.0.1:4723", Capabilities::default());
        assert!(!driver.is_connected());
        assert_eq!(driver.server_url(), "http://127.0.0.1:4723");
    }

    #[test]
    fn from_config_copies_settings() {
        let mut config = DroidtouchConfig::default();
        config.server_url = "http://host:1234".into();
        config.move_duration_ms = 120;
        let driver = AppiumDriver::from_config(&config);
        assert_eq!(driver.server_url(), "http://host:1234");
        assert_eq!(driver.move_duration_ms, 120);
    }

    #[tokio::test]
    async fn commands_require_connection() {
        let driver = AppiumDriver::new("http://127.0.0.1:4723", Capabilities::default());
        assert!(matches!(driver.back().await, Err(DriverError::NotConnected)));
        // Disconnecting without a session is a no-op.
        driver.disconnect().await.unwrap();
    }

    #[test]
    fn webdriver_errors_map_to_kinds() {
        assert!(matches!(map_client_error(remote("no such element")), DriverError::ElementNotFound(_)));
        assert!(matches!(map_client_error(remote("session not created")), DriverError::SessionNotCreated(_)));
        assert!(matches!(map_client_error(remote("invalid session id")), DriverError::ConnectionLost(_)));
        assert!(matches!(map_client_error(remote("timeout")), DriverError::Timeout));
        match map_client_error(remote("unknown error")) {
            DriverError::CommandFailed(msg) => assert_eq!(msg, "unknown error: detail"),
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[test]
    fn transport_errors_map_to_kinds() {
        assert!(matches!(map_client_error(ClientError::NotConnected), DriverError::NotConnected));
        assert!(matches!(map_client_error(ClientError::Timeout), DriverError::Timeout));
        assert!(matches!(
            map_client_error(ClientError::ConnectionFailed("refused".into())),
            DriverError::ConnectionLost(_)
        ));
        assert!(matches!(
            map_client_error(ClientError::Protocol(ProtocolError::InvalidPayload("x".into()))),
            DriverError::JsonParse(_)
        ));
    }
}
