//! Scripted in-memory driver shared by unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementId, ElementRect};
use crate::geometry::ScreenSize;
use crate::gesture::FingerPath;
use crate::network::{GsmCallAction, GsmSignal, GsmVoiceState, NetworkSpeed, NetworkState, NetworkType};
use crate::target::Locator;

/// In-memory driver that records every call.
pub(crate) struct RecordingDriver {
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) gestures: Mutex<Vec<Vec<FingerPath>>>,
    pub(crate) locked: bool,
    pub(crate) keyboard_shown: bool,
}

impl RecordingDriver {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            gestures: Mutex::new(Vec::new()),
            locked: false,
            keyboard_shown: false,
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AutomationDriver for RecordingDriver {
    async fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
    fn is_connected(&self) -> bool {
        true
    }
    async fn disconnect(&self) -> Result<(), DriverError> {
        Ok(())
    }
    async fn window_size(&self) -> Result<ScreenSize, DriverError> {
        self.record("window_size");
        Ok(ScreenSize::new(1000, 2000)?)
    }
    async fn set_implicit_wait(&self, timeout_ms: u64) -> Result<(), DriverError> {
        self.record(format!("implicit_wait {timeout_ms}"));
        Ok(())
    }
    async fn find_element(&self, locator: &Locator) -> Result<ElementId, DriverError> {
        self.record(format!("find {locator}"));
        match locator.value() {
            "missing" => Err(DriverError::ElementNotFound(locator.to_string())),
            "gone" => Err(DriverError::ConnectionLost("session ended".into())),
            _ => Ok(ElementId("el-1".into())),
        }
    }
    async fn element_rect(&self, _element: &ElementId) -> Result<ElementRect, DriverError> {
        Ok(ElementRect { x: 100.0, y: 200.0, width: 50.0, height: 20.0 })
    }
    async fn click_element(&self, element: &ElementId) -> Result<(), DriverError> {
        self.record(format!("click {element}"));
        Ok(())
    }
    async fn clear_element(&self, element: &ElementId) -> Result<(), DriverError> {
        self.record(format!("clear {element}"));
        Ok(())
    }
    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError> {
        self.record(format!("send_keys {element} {text}"));
        Ok(())
    }
    async fn perform_actions(&self, fingers: &[FingerPath]) -> Result<(), DriverError> {
        self.record(format!("actions {}", fingers.len()));
        self.gestures.lock().unwrap().push(fingers.to_vec());
        Ok(())
    }
    async fn press_keycode(&self, code: u32) -> Result<(), DriverError> {
        self.record(format!("keycode {code}"));
        Ok(())
    }
    async fn long_press_keycode(&self, code: u32) -> Result<(), DriverError> {
        self.record(format!("long_keycode {code}"));
        Ok(())
    }
    async fn back(&self) -> Result<(), DriverError> {
        self.record("back");
        Ok(())
    }
    async fn shake(&self) -> Result<(), DriverError> {
        self.record("shake");
        Ok(())
    }
    async fn lock(&self, seconds: Option<u32>) -> Result<(), DriverError> {
        self.record(format!("lock {seconds:?}"));
        Ok(())
    }
    async fn unlock(&self) -> Result<(), DriverError> {
        self.record("unlock");
        Ok(())
    }
    async fn is_locked(&self) -> Result<bool, DriverError> {
        Ok(self.locked)
    }
    async fn finger_print(&self, finger_id: u8) -> Result<(), DriverError> {
        self.record(format!("finger {finger_id}"));
        Ok(())
    }
    async fn is_keyboard_shown(&self) -> Result<bool, DriverError> {
        Ok(self.keyboard_shown)
    }
    async fn hide_keyboard(&self) -> Result<(), DriverError> {
        self.record("hide_keyboard");
        Ok(())
    }
    async fn network_connection(&self) -> Result<NetworkState, DriverError> {
        Ok(NetworkState::from_bitmask(6))
    }
    async fn set_network_connection(&self, network: NetworkType) -> Result<NetworkState, DriverError> {
        self.record(format!("network {network}"));
        Ok(NetworkState::from_bitmask(network.bitmask()))
    }
    async fn set_network_speed(&self, speed: NetworkSpeed) -> Result<(), DriverError> {
        self.record(format!("speed {speed}"));
        Ok(())
    }
    async fn send_sms(&self, phone: &str, message: &str) -> Result<(), DriverError> {
        self.record(format!("sms {phone} {message}"));
        Ok(())
    }
    async fn gsm_call(&self, phone: &str, action: GsmCallAction) -> Result<(), DriverError> {
        self.record(format!("gsm_call {phone} {action}"));
        Ok(())
    }
    async fn gsm_signal(&self, strength: GsmSignal) -> Result<(), DriverError> {
        self.record(format!("gsm_signal {}", strength.level()));
        Ok(())
    }
    async fn gsm_voice(&self, state: GsmVoiceState) -> Result<(), DriverError> {
        self.record(format!("gsm_voice {state}"));
        Ok(())
    }
    async fn page_source(&self) -> Result<String, DriverError> {
        Ok("<hierarchy/>".into())
    }
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
    async fn start_recording(&self) -> Result<(), DriverError> {
        self.record("start_recording");
        Ok(())
    }
    async fn stop_recording(&self) -> Result<Vec<u8>, DriverError> {
        Ok(b"mp4".to_vec())
    }
}
