//! Action types and logging for automation operations.
//!
//! This module defines the actions that can be performed on an Android device,
//! along with the [`ActionLog`] type for recording executed actions.
//!
//! # Action Types
//!
//! Actions fall into several categories:
//!
//! - **Touch**: [`ActionType::Tap`], [`ActionType::DoubleTap`], [`ActionType::LongPress`]
//! - **Gestures**: [`ActionType::Scroll`], [`ActionType::Swipe`], [`ActionType::PinchIn`], [`ActionType::PinchOut`], [`ActionType::Rotate`]
//! - **Keys and hardware**: [`ActionType::PressKey`], [`ActionType::PressKeycode`], [`ActionType::PowerKey`], [`ActionType::Back`], [`ActionType::Shake`], [`ActionType::Lock`], [`ActionType::Unlock`], [`ActionType::Fingerprint`]
//! - **Text**: [`ActionType::EnterText`]
//! - **Network and telephony**: [`ActionType::GetNetwork`], [`ActionType::SetNetwork`], [`ActionType::SetNetworkSpeed`], [`ActionType::SendSms`], [`ActionType::GsmCall`], [`ActionType::GsmSignal`], [`ActionType::GsmVoice`]
//! - **Capture**: [`ActionType::DumpUi`], [`ActionType::Screenshot`], [`ActionType::StartRecording`], [`ActionType::StopRecording`]
//! - **Information**: [`ActionType::Find`], [`ActionType::WindowSize`]
//! - **Flow**: [`ActionType::Sleep`], [`ActionType::Comment`]
//!
//! Actions serialize as JSON objects with a `type` tag, which is also the
//! step format of scenario files.
//!
//! # Example
//!
//! ```
//! use droidtouch_core::action::{ActionType, ActionResult, ActionLog};
//! use droidtouch_core::gesture::RotationDirection;
//!
//! let action = ActionType::Rotate {
//!     degree: 90,
//!     direction: RotationDirection::Clockwise,
//!     times: 1,
//! };
//!
//! let log = ActionLog::new(action, ActionResult::Success, Some(420));
//! println!("Action {} at {}", log.id, log.timestamp);
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gesture::{RotationDirection, ScrollDirection, SwipeDirection, LONG_PRESS_MS};
use crate::keycode::{AndroidKey, PowerMode};
use crate::network::{GsmCallAction, GsmSignal, GsmVoiceState, NetworkSpeed, NetworkType};
use crate::target::{Locator, Target};

/// The result of executing an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionResult {
    /// The action completed successfully.
    Success,

    /// The action failed with the given error message.
    Failure(String),
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

fn long_press_ms() -> u64 {
    LONG_PRESS_MS
}

/// Types of actions that can be performed on a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionType {
    /// Tap an element (native click) or a screen position.
    Tap {
        target: Target,
    },

    /// Tap twice in quick succession.
    DoubleTap {
        target: Target,
    },

    /// Press and hold.
    LongPress {
        target: Target,
        /// How long to hold in milliseconds.
        #[serde(default = "long_press_ms")]
        duration_ms: u64,
    },

    /// Vertical single-finger gesture from mid-screen.
    Scroll {
        direction: ScrollDirection,
        #[serde(default = "one")]
        times: u32,
        /// Fixed x coordinate (defaults to mid-screen).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        x: Option<i32>,
    },

    /// Horizontal single-finger gesture from mid-screen.
    Swipe {
        direction: SwipeDirection,
        #[serde(default = "one")]
        times: u32,
        /// Fixed y coordinate (defaults to mid-screen).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        y: Option<i32>,
    },

    /// Two fingers moving towards the center.
    PinchIn {
        #[serde(default = "one")]
        times: u32,
    },

    /// Two fingers moving away from the center.
    PinchOut {
        #[serde(default = "one")]
        times: u32,
    },

    /// One finger orbiting a pivot finger at the center.
    Rotate {
        /// Degrees to rotate: 5 to 180, in steps of 5.
        degree: u32,
        direction: RotationDirection,
        #[serde(default = "one")]
        times: u32,
    },

    /// Press a named key.
    PressKey {
        key: AndroidKey,
    },

    /// Press a raw Android key code.
    PressKeycode {
        code: u32,
        /// Long-press instead of a short press.
        #[serde(default)]
        long: bool,
    },

    /// Operate the power button.
    PowerKey {
        mode: PowerMode,
    },

    /// Type into a text field.
    EnterText {
        locator: Locator,
        text: String,
        /// Clear the field first.
        #[serde(default = "yes")]
        clear: bool,
        /// Hide the soft keyboard afterwards if it is showing.
        #[serde(default = "yes")]
        hide_keyboard: bool,
    },

    /// Navigate back.
    Back,

    /// Shake the device.
    Shake,

    /// Lock the screen, optionally unlocking after a number of seconds.
    Lock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seconds: Option<u32>,
    },

    /// Unlock the screen if it is locked.
    Unlock,

    /// Authenticate with an enrolled fingerprint (1 to 10).
    Fingerprint {
        finger_id: u8,
    },

    /// Report the current connectivity flags.
    GetNetwork,

    /// Switch connectivity.
    SetNetwork {
        network: NetworkType,
    },

    /// Set the emulated network speed.
    SetNetworkSpeed {
        speed: NetworkSpeed,
    },

    /// Emulate an incoming SMS.
    SendSms {
        phone: String,
        message: String,
    },

    /// Emulate a GSM call event.
    GsmCall {
        phone: String,
        action: GsmCallAction,
    },

    /// Set the emulated GSM signal strength.
    GsmSignal {
        strength: GsmSignal,
    },

    /// Set the emulated GSM voice state.
    GsmVoice {
        state: GsmVoiceState,
    },

    /// Save the UI hierarchy and a screenshot into a directory.
    DumpUi {
        dir: PathBuf,
        /// Save the source as `.html` instead of `.xml`.
        #[serde(default)]
        web: bool,
    },

    /// Capture a screenshot, optionally saving it as a PNG file.
    ///
    /// Returns base64-encoded PNG data.
    Screenshot {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },

    /// Start recording the screen.
    StartRecording,

    /// Stop recording and save the video.
    StopRecording {
        /// A `.mp4` file path, or a directory to save a timestamped file in.
        path: PathBuf,
    },

    /// Check that an element exists and report its center.
    Find {
        locator: Locator,
    },

    /// Report the screen size.
    WindowSize,

    /// Do nothing for a while.
    Sleep {
        ms: u64,
    },

    /// Log a comment (for documentation purposes).
    Comment {
        message: String,
    },
}

impl ActionType {
    /// Returns a short, static name for this action type suitable for use in
    /// tracing span metadata. Avoids Debug-formatting large enum payloads.
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Tap { .. } => "tap",
            ActionType::DoubleTap { .. } => "double_tap",
            ActionType::LongPress { .. } => "long_press",
            ActionType::Scroll { .. } => "scroll",
            ActionType::Swipe { .. } => "swipe",
            ActionType::PinchIn { .. } => "pinch_in",
            ActionType::PinchOut { .. } => "pinch_out",
            ActionType::Rotate { .. } => "rotate",
            ActionType::PressKey { .. } => "press_key",
            ActionType::PressKeycode { .. } => "press_keycode",
            ActionType::PowerKey { .. } => "power_key",
            ActionType::EnterText { .. } => "enter_text",
            ActionType::Back => "back",
            ActionType::Shake => "shake",
            ActionType::Lock { .. } => "lock",
            ActionType::Unlock => "unlock",
            ActionType::Fingerprint { .. } => "fingerprint",
            ActionType::GetNetwork => "get_network",
            ActionType::SetNetwork { .. } => "set_network",
            ActionType::SetNetworkSpeed { .. } => "set_network_speed",
            ActionType::SendSms { .. } => "send_sms",
            ActionType::GsmCall { .. } => "gsm_call",
            ActionType::GsmSignal { .. } => "gsm_signal",
            ActionType::GsmVoice { .. } => "gsm_voice",
            ActionType::DumpUi { .. } => "dump_ui",
            ActionType::Screenshot { .. } => "screenshot",
            ActionType::StartRecording => "start_recording",
            ActionType::StopRecording { .. } => "stop_recording",
            ActionType::Find { .. } => "find",
            ActionType::WindowSize => "window_size",
            ActionType::Sleep { .. } => "sleep",
            ActionType::Comment { .. } => "comment",
        }
    }
}

/// A logged action with metadata.
///
/// Each executed action is logged with a unique identifier, timestamp, the
/// action details, result and duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    /// Unique identifier for this log entry.
    pub id: Uuid,

    /// When the action was executed.
    pub timestamp: DateTime<Utc>,

    /// The action that was performed.
    pub action: ActionType,

    /// The result of the action.
    pub result: ActionResult,

    /// How long the action took in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ActionLog {
    /// Creates a new action log entry.
    ///
    /// The entry is assigned a new UUID and timestamped with the current time.
    pub fn new(action: ActionType, result: ActionResult, duration_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            result,
            duration_ms,
        }
    }
}
