//! Action execution for Android automation.
//!
//! This module provides the [`ActionExecutor`] type, which turns
//! [`ActionType`]s into driver calls. Gestures are synthesized locally with
//! [`crate::gesture`] and submitted as multi-touch actions; everything else
//! maps onto one or two driver primitives.
//!
//! # Example
//!
//! ```no_run
//! use droidtouch_core::executor::ActionExecutor;
//! use droidtouch_core::action::ActionType;
//! use droidtouch_core::config::DroidtouchConfig;
//! use droidtouch_core::gesture::ScrollDirection;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DroidtouchConfig::load();
//!     let executor = ActionExecutor::from_config_connected(&config).await.unwrap();
//!
//!     let result = executor.execute(ActionType::Scroll {
//!         direction: ScrollDirection::Up,
//!         times: 3,
//!         x: None,
//!     }).await;
//!
//!     if result.success {
//!         println!("Scrolled");
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use serde_json::json;
use tracing::{debug, info_span, warn, Instrument};

use crate::action::ActionType;
use crate::appium_driver::AppiumDriver;
use crate::capture::{self, CaptureError};
use crate::config::DroidtouchConfig;
use crate::driver::{AutomationDriver, DriverError};
use crate::geometry::Point;
use crate::gesture::{
    compute_linear_gesture, compute_pinch, compute_rotate, double_tap_path, long_press_path, tap_path,
    validate_rotation_degree, GestureError, GesturePlan, LinearGesture, PinchDirection,
};
use crate::keycode::KeyPress;
use crate::target::{Locator, Target};

/// Default implicit wait for element lookups.
pub const DEFAULT_IMPLICIT_WAIT_MS: u64 = 1000;

/// Valid enrolled-fingerprint ids.
const FINGER_IDS: std::ops::RangeInclusive<u8> = 1..=10;

/// Result of executing an action.
///
/// Contains success/failure status along with optional data returned
/// by the action (screen size, network state, screenshot, etc.).
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Whether the action completed successfully.
    pub success: bool,
    /// Human-readable description of the result.
    pub message: String,
    /// Additional data returned by the action, as JSON or base64 text.
    pub data: Option<String>,
    /// The failure came from the transport, not from the command itself.
    pub connection_lost: bool,
}

impl ExecutionResult {
    /// Creates a successful result with a message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            connection_lost: false,
        }
    }

    /// Creates a failure result with an error message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            connection_lost: false,
        }
    }

    /// Creates a failure result from a driver error, keeping whether the
    /// session itself is gone.
    pub fn from_error(err: &DriverError) -> Self {
        Self {
            connection_lost: err.is_connection_error(),
            ..Self::failure(err.to_string())
        }
    }

    /// Adds data to the result.
    pub fn with_data(mut self, data: String) -> Self {
        self.data = Some(data);
        self
    }
}

/// Executes automation actions against a device.
///
/// The executor holds an [`AutomationDriver`] and dispatches every
/// [`ActionType`] to it. Element lookups apply the implicit wait once, on
/// first use.
pub struct ActionExecutor {
    driver: Arc<dyn AutomationDriver>,
    implicit_wait_ms: u64,
    repeat_pause: Duration,
    implicit_wait_applied: AtomicBool,
}

fn capture_to_driver(err: CaptureError) -> DriverError {
    match err {
        CaptureError::Driver(e) => e,
        CaptureError::Io { path, source } => DriverError::Io(std::io::Error::new(
            source.kind(),
            format!("{}: {}", path.display(), source),
        )),
    }
}

impl ActionExecutor {
    /// Creates a new executor with any [`AutomationDriver`] backend.
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self {
            driver,
            implicit_wait_ms: DEFAULT_IMPLICIT_WAIT_MS,
            repeat_pause: Duration::ZERO,
            implicit_wait_applied: AtomicBool::new(false),
        }
    }

    /// Sets how long element lookups retry before failing.
    pub fn with_implicit_wait(mut self, ms: u64) -> Self {
        self.implicit_wait_ms = ms;
        self
    }

    /// Sets the pause between repeated submissions of a gesture.
    pub fn with_repeat_pause(mut self, ms: u64) -> Self {
        self.repeat_pause = Duration::from_millis(ms);
        self
    }

    /// Connects an [`AppiumDriver`] built from `config` and wraps it.
    pub async fn from_config_connected(config: &DroidtouchConfig) -> Result<Self, DriverError> {
        let mut driver = AppiumDriver::from_config(config);
        driver.connect().await?;
        Ok(Self::new(Arc::new(driver))
            .with_implicit_wait(config.implicit_wait_ms)
            .with_repeat_pause(config.repeat_pause_ms))
    }

    /// Returns a reference to the underlying driver.
    pub fn driver(&self) -> &Arc<dyn AutomationDriver> {
        &self.driver
    }

    /// Executes an action and returns the result.
    ///
    /// Never panics and never returns early with an error: every failure is
    /// reported as an unsuccessful [`ExecutionResult`].
    pub async fn execute(&self, action: ActionType) -> ExecutionResult {
        let action_name = action.name();
        let span = info_span!("execute_action", action = action_name);
        async {
            let start = Instant::now();
            let result = match self.run(&action).await {
                Ok(result) => result,
                Err(e) => ExecutionResult::from_error(&e),
            };
            let elapsed = start.elapsed();
            debug!(elapsed_ms = elapsed.as_millis() as u64, success = result.success, "action complete");
            result
        }
        .instrument(span)
        .await
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn ensure_implicit_wait(&self) -> Result<(), DriverError> {
        if self.implicit_wait_applied.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.driver.set_implicit_wait(self.implicit_wait_ms).await {
            self.implicit_wait_applied.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    async fn locate(&self, locator: &Locator) -> Result<Point, DriverError> {
        self.ensure_implicit_wait().await?;
        self.driver.locate(locator).await
    }

    /// Resolves a target to the point a gesture should start from.
    async fn resolve(&self, target: &Target) -> Result<Point, DriverError> {
        match target {
            Target::ByLocator(locator) => self.locate(locator).await,
            Target::ByPosition(point) => {
                if point.x < 0 || point.y < 0 {
                    return Err(GestureError::InvalidParameter(format!(
                        "coordinates must be non-negative (got x={}, y={})",
                        point.x, point.y
                    ))
                    .into());
                }
                Ok(*point)
            }
        }
    }

    /// Submits a plan `repeat` times, pausing between submissions.
    async fn submit_plan(&self, plan: &GesturePlan) -> Result<String, DriverError> {
        for i in 0..plan.repeat {
            if i > 0 && !self.repeat_pause.is_zero() {
                tokio::time::sleep(self.repeat_pause).await;
            }
            self.driver.perform_actions(&plan.fingers).await?;
        }
        Ok(json!({ "fingers": plan.fingers.len(), "repeat": plan.repeat }).to_string())
    }

    async fn press(&self, press: KeyPress) -> Result<(), DriverError> {
        match press {
            KeyPress::Short(key) => self.driver.press_keycode(key.code()).await,
            KeyPress::Long(key) => self.driver.long_press_keycode(key.code()).await,
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    async fn run(&self, action: &ActionType) -> Result<ExecutionResult, DriverError> {
        let result = match action {
            ActionType::Tap { target } => match target {
                Target::ByLocator(locator) => {
                    self.ensure_implicit_wait().await?;
                    let element = self.driver.find_element(locator).await?;
                    self.driver.click_element(&element).await?;
                    ExecutionResult::success(format!("Tapped element '{}'", locator))
                }
                Target::ByPosition(_) => {
                    let point = self.resolve(target).await?;
                    self.driver.perform_actions(&[tap_path(point)]).await?;
                    ExecutionResult::success(format!("Tapped at {}", point))
                }
            },

            ActionType::DoubleTap { target } => {
                let point = self.resolve(target).await?;
                self.driver.perform_actions(&[double_tap_path(point)]).await?;
                ExecutionResult::success(format!("Double tapped '{}' at {}", target, point))
            }

            ActionType::LongPress { target, duration_ms } => {
                let point = self.resolve(target).await?;
                self.driver
                    .perform_actions(&[long_press_path(point, *duration_ms)])
                    .await?;
                ExecutionResult::success(format!(
                    "Long pressed '{}' at {} for {}ms",
                    target, point, duration_ms
                ))
            }

            ActionType::Scroll { direction, times, x } => {
                let screen = self.driver.window_size().await?;
                let plan = compute_linear_gesture(screen, LinearGesture::Scroll(*direction), *x, *times)?;
                let data = self.submit_plan(&plan).await?;
                ExecutionResult::success(format!("Scrolled {} x{}", direction, times)).with_data(data)
            }

            ActionType::Swipe { direction, times, y } => {
                let screen = self.driver.window_size().await?;
                let plan = compute_linear_gesture(screen, LinearGesture::Swipe(*direction), *y, *times)?;
                let data = self.submit_plan(&plan).await?;
                ExecutionResult::success(format!("Swiped {} x{}", direction, times)).with_data(data)
            }

            ActionType::PinchIn { times } => {
                let screen = self.driver.window_size().await?;
                let plan = compute_pinch(screen, PinchDirection::In, *times)?;
                let data = self.submit_plan(&plan).await?;
                ExecutionResult::success(format!("Pinched in x{}", times)).with_data(data)
            }

            ActionType::PinchOut { times } => {
                let screen = self.driver.window_size().await?;
                let plan = compute_pinch(screen, PinchDirection::Out, *times)?;
                let data = self.submit_plan(&plan).await?;
                ExecutionResult::success(format!("Pinched out x{}", times)).with_data(data)
            }

            ActionType::Rotate { degree, direction, times } => {
                // Reject a bad degree before asking the device anything.
                validate_rotation_degree(*degree)?;
                let screen = self.driver.window_size().await?;
                let plan = compute_rotate(screen, *degree, *direction, *times)?;
                let data = self.submit_plan(&plan).await?;
                ExecutionResult::success(format!("Rotated {}° {} x{}", degree, direction, times))
                    .with_data(data)
            }

            ActionType::PressKey { key } => {
                self.driver.press_keycode(key.code()).await?;
                ExecutionResult::success(format!("Pressed {} (keycode {})", key, key.code()))
            }

            ActionType::PressKeycode { code, long } => {
                if *long {
                    self.driver.long_press_keycode(*code).await?;
                    ExecutionResult::success(format!("Long pressed keycode {}", code))
                } else {
                    self.driver.press_keycode(*code).await?;
                    ExecutionResult::success(format!("Pressed keycode {}", code))
                }
            }

            ActionType::PowerKey { mode } => {
                if let Some(caveat) = mode.caveat() {
                    warn!(mode = %mode, "{}", caveat);
                }
                self.press(mode.key_press()).await?;
                ExecutionResult::success(format!("Power key: {}", mode))
            }

            ActionType::EnterText { locator, text, clear, hide_keyboard } => {
                self.ensure_implicit_wait().await?;
                let element = self.driver.find_element(locator).await?;
                if *clear {
                    self.driver.clear_element(&element).await?;
                }
                self.driver.send_keys(&element, text).await?;
                if *hide_keyboard && self.driver.is_keyboard_shown().await? {
                    self.driver.hide_keyboard().await?;
                }
                ExecutionResult::success(format!("Entered '{}' into '{}'", text, locator))
            }

            ActionType::Back => {
                self.driver.back().await?;
                ExecutionResult::success("Navigated back")
            }

            ActionType::Shake => {
                self.driver.shake().await?;
                ExecutionResult::success("Shook device")
            }

            ActionType::Lock { seconds } => {
                self.driver.lock(*seconds).await?;
                match seconds {
                    Some(s) => ExecutionResult::success(format!("Locked screen for {}s", s)),
                    None => ExecutionResult::success("Locked screen"),
                }
            }

            ActionType::Unlock => {
                if self.driver.is_locked().await? {
                    self.driver.unlock().await?;
                    ExecutionResult::success("Unlocked screen")
                } else {
                    ExecutionResult::success("Screen already unlocked")
                }
            }

            ActionType::Fingerprint { finger_id } => {
                if !FINGER_IDS.contains(finger_id) {
                    return Err(GestureError::InvalidParameter(format!(
                        "finger id {} must be from {} to {}",
                        finger_id,
                        FINGER_IDS.start(),
                        FINGER_IDS.end()
                    ))
                    .into());
                }
                self.driver.finger_print(*finger_id).await?;
                ExecutionResult::success(format!("Authenticated with finger {}", finger_id))
            }

            ActionType::GetNetwork => {
                let state = self.driver.network_connection().await?;
                let data = serde_json::to_string(&state).map_err(|e| DriverError::JsonParse(e.to_string()))?;
                ExecutionResult::success(format!("Network: {}", state)).with_data(data)
            }

            ActionType::SetNetwork { network } => {
                let state = self.driver.set_network_connection(*network).await?;
                let data = serde_json::to_string(&state).map_err(|e| DriverError::JsonParse(e.to_string()))?;
                ExecutionResult::success(format!("Network set to {}: {}", network, state)).with_data(data)
            }

            ActionType::SetNetworkSpeed { speed } => {
                self.driver.set_network_speed(*speed).await?;
                ExecutionResult::success(format!("Network speed set to {}", speed))
            }

            ActionType::SendSms { phone, message } => {
                self.driver.send_sms(phone, message).await?;
                ExecutionResult::success(format!("Sent SMS from {}", phone))
            }

            ActionType::GsmCall { phone, action } => {
                self.driver.gsm_call(phone, *action).await?;
                ExecutionResult::success(format!("GSM call {} from {}", action, phone))
            }

            ActionType::GsmSignal { strength } => {
                self.driver.gsm_signal(*strength).await?;
                ExecutionResult::success(format!("GSM signal set to {} ({})", strength, strength.level()))
            }

            ActionType::GsmVoice { state } => {
                self.driver.gsm_voice(*state).await?;
                ExecutionResult::success(format!("GSM voice state set to {}", state))
            }

            ActionType::DumpUi { dir, web } => {
                let paths = capture::dump_ui(self.driver.as_ref(), dir, *web)
                    .await
                    .map_err(capture_to_driver)?;
                let data = json!({
                    "source": paths.source.display().to_string(),
                    "screenshot": paths.screenshot.display().to_string(),
                });
                ExecutionResult::success(format!("Dumped UI to {}", paths.source.display()))
                    .with_data(data.to_string())
            }

            ActionType::Screenshot { path } => {
                let png = match path {
                    Some(path) => capture::save_screenshot(self.driver.as_ref(), path)
                        .await
                        .map_err(capture_to_driver)?,
                    None => self.driver.screenshot().await?,
                };
                let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
                let message = match path {
                    Some(path) => format!("Screenshot saved to {}", path.display()),
                    None => "Screenshot captured".to_string(),
                };
                ExecutionResult::success(message).with_data(b64)
            }

            ActionType::StartRecording => {
                self.driver.start_recording().await?;
                ExecutionResult::success("Recording started")
            }

            ActionType::StopRecording { path } => {
                let saved = capture::save_recording(self.driver.as_ref(), path)
                    .await
                    .map_err(capture_to_driver)?;
                ExecutionResult::success(format!("Recording saved to {}", saved.display()))
                    .with_data(json!({ "path": saved.display().to_string() }).to_string())
            }

            ActionType::Find { locator } => {
                let point = self.locate(locator).await?;
                ExecutionResult::success(format!("Found '{}' at {}", locator, point))
                    .with_data(json!({ "x": point.x, "y": point.y }).to_string())
            }

            ActionType::WindowSize => {
                let screen = self.driver.window_size().await?;
                let data = serde_json::to_string(&screen).map_err(|e| DriverError::JsonParse(e.to_string()))?;
                ExecutionResult::success(format!("Screen size {}", screen)).with_data(data)
            }

            ActionType::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                ExecutionResult::success(format!("Slept {}ms", ms))
            }

            ActionType::Comment { message } => ExecutionResult::success(format!("Logged: {}", message)),
        };
        Ok(result)
    }
}
