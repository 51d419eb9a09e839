//! Automation driver trait for backend-agnostic Android automation.
//!
//! This module defines the [`AutomationDriver`] trait, the seam between the
//! [`ActionExecutor`](crate::executor::ActionExecutor) and whatever actually
//! talks to the device. The production backend is
//! [`AppiumDriver`](crate::appium_driver::AppiumDriver); tests substitute
//! scripted in-memory drivers.
//!
//! Every device interaction is async. Gestures arrive already synthesized as
//! [`FingerPath`]s; the driver only has to deliver them.

use async_trait::async_trait;
use thiserror::Error;

use crate::element::{ElementId, ElementRect};
use crate::geometry::{Point, ScreenSize};
use crate::gesture::{FingerPath, GestureError};
use crate::network::{GsmCallAction, GsmSignal, GsmVoiceState, NetworkSpeed, NetworkState, NetworkType};
use crate::target::Locator;

/// Errors that can occur during automation driver operations.
///
/// Every remote failure maps to exactly one variant, so callers can branch on
/// the kind instead of parsing messages.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The server rejected or failed a command.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// No session has been created yet (or it was closed).
    #[error("Not connected to automation server")]
    NotConnected,

    /// The HTTP connection to the server broke.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// An operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// No element matched the locator within the implicit wait.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The server refused to create a session.
    #[error("Session not created: {0}")]
    SessionNotCreated(String),

    /// The server answered with something that is not a WebDriver response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Gesture parameters were rejected before anything was sent.
    #[error(transparent)]
    Gesture(#[from] GestureError),
}

impl DriverError {
    /// True for errors caused by the transport rather than the command.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DriverError::NotConnected | DriverError::ConnectionLost(_) | DriverError::Io(_)
        )
    }
}

/// Trait for backend-agnostic Android UI automation.
///
/// Implementors provide the primitive remote operations. Element lookup
/// helpers ([`locate`](AutomationDriver::locate)) have default
/// implementations built on the primitives.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Establish a session with the automation backend.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Check if a session is open.
    fn is_connected(&self) -> bool;

    /// Close the session. Closing an already closed session is a no-op.
    async fn disconnect(&self) -> Result<(), DriverError>;

    /// Current screen size in pixels.
    async fn window_size(&self) -> Result<ScreenSize, DriverError>;

    /// How long element lookups keep retrying before giving up.
    async fn set_implicit_wait(&self, timeout_ms: u64) -> Result<(), DriverError>;

    // -- elements ----------------------------------------------------------

    /// Find the first element matching `locator`.
    ///
    /// Returns [`DriverError::ElementNotFound`] when nothing matches within
    /// the implicit wait.
    async fn find_element(&self, locator: &Locator) -> Result<ElementId, DriverError>;

    /// The on-screen rectangle of an element.
    async fn element_rect(&self, element: &ElementId) -> Result<ElementRect, DriverError>;

    /// Click an element through the server's native click.
    async fn click_element(&self, element: &ElementId) -> Result<(), DriverError>;

    /// Clear a text field.
    async fn clear_element(&self, element: &ElementId) -> Result<(), DriverError>;

    /// Type text into an element.
    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError>;

    /// Find an element and return the center of its rectangle.
    async fn locate(&self, locator: &Locator) -> Result<Point, DriverError> {
        let element = self.find_element(locator).await?;
        let rect = self.element_rect(&element).await?;
        Ok(rect.center())
    }

    // -- touch -------------------------------------------------------------

    /// Perform all finger paths simultaneously as one multi-touch action,
    /// then release any pointer state left on the server.
    async fn perform_actions(&self, fingers: &[FingerPath]) -> Result<(), DriverError>;

    // -- keys and hardware -------------------------------------------------

    /// Send a key event by Android key code.
    async fn press_keycode(&self, code: u32) -> Result<(), DriverError>;

    /// Send a long key press by Android key code.
    async fn long_press_keycode(&self, code: u32) -> Result<(), DriverError>;

    /// Navigate back.
    async fn back(&self) -> Result<(), DriverError>;

    /// Simulate shaking the device.
    async fn shake(&self) -> Result<(), DriverError>;

    /// Lock the screen, optionally unlocking again after `seconds`.
    async fn lock(&self, seconds: Option<u32>) -> Result<(), DriverError>;

    /// Unlock the screen.
    async fn unlock(&self) -> Result<(), DriverError>;

    /// Whether the screen is locked.
    async fn is_locked(&self) -> Result<bool, DriverError>;

    /// Authenticate with an enrolled fingerprint (emulator only).
    async fn finger_print(&self, finger_id: u8) -> Result<(), DriverError>;

    /// Whether the soft keyboard is visible.
    async fn is_keyboard_shown(&self) -> Result<bool, DriverError>;

    /// Hide the soft keyboard.
    async fn hide_keyboard(&self) -> Result<(), DriverError>;

    // -- network and telephony ---------------------------------------------

    /// Current connectivity flags.
    async fn network_connection(&self) -> Result<NetworkState, DriverError>;

    /// Switch connectivity and return the state the device reports afterwards.
    async fn set_network_connection(&self, network: NetworkType) -> Result<NetworkState, DriverError>;

    /// Set the emulated network speed.
    async fn set_network_speed(&self, speed: NetworkSpeed) -> Result<(), DriverError>;

    /// Emulate an incoming SMS.
    async fn send_sms(&self, phone: &str, message: &str) -> Result<(), DriverError>;

    /// Emulate a GSM call event.
    async fn gsm_call(&self, phone: &str, action: GsmCallAction) -> Result<(), DriverError>;

    /// Set the emulated GSM signal strength.
    async fn gsm_signal(&self, strength: GsmSignal) -> Result<(), DriverError>;

    /// Set the emulated GSM voice state.
    async fn gsm_voice(&self, state: GsmVoiceState) -> Result<(), DriverError>;

    // -- capture -----------------------------------------------------------

    /// The current UI hierarchy (XML for native apps, HTML for web views).
    async fn page_source(&self) -> Result<String, DriverError>;

    /// Capture a screenshot.
    ///
    /// # Returns
    ///
    /// Raw PNG image bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Start recording the screen.
    async fn start_recording(&self) -> Result<(), DriverError>;

    /// Stop recording and return the MP4 bytes.
    async fn stop_recording(&self) -> Result<Vec<u8>, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::CommandFailed("tap failed".to_string());
        assert!(err.to_string().contains("tap failed"));

        let err = DriverError::NotConnected;
        assert!(err.to_string().contains("Not connected"));

        let err = DriverError::ElementNotFound("id=login".to_string());
        assert!(err.to_string().contains("id=login"));

        let err = DriverError::Timeout;
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_gesture_error_is_transparent() {
        let err: DriverError = GestureError::InvalidParameter("invalid degree 7".into()).into();
        assert_eq!(err.to_string(), "invalid parameter: invalid degree 7");
    }

    #[test]
    fn test_connection_error_classification() {
        assert!(DriverError::NotConnected.is_connection_error());
        assert!(DriverError::ConnectionLost("reset".into()).is_connection_error());
        assert!(!DriverError::ElementNotFound("x".into()).is_connection_error());
        assert!(!DriverError::Timeout.is_connection_error());
    }
}
