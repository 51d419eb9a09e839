//! Scenario files: sequences of actions replayed against a device.
//!
//! A scenario is a JSON document whose steps are [`ActionType`] objects,
//! optionally followed by a pause:
//!
//! ```json
//! {
//!   "name": "settings smoke test",
//!   "default_pause_ms": 500,
//!   "steps": [
//!     { "type": "Tap", "target": "xpath=//*[@text='Network & internet']" },
//!     { "type": "Scroll", "direction": "up", "times": 2, "pause_ms": 1000 },
//!     { "type": "PressKey", "key": "home" }
//!   ]
//! }
//! ```
//!
//! [`ScenarioRunner`] executes the steps strictly in order and stops at the
//! first failure unless the scenario sets `continue_on_error`.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::action::{ActionResult, ActionType};
use crate::executor::ActionExecutor;
use crate::gesture::{validate_rotation_degree, GestureError};
use crate::session::Session;

/// Errors loading or validating a scenario.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("step {step} ({action}): {source}")]
    InvalidStep {
        /// One-based step number.
        step: usize,
        action: &'static str,
        #[source]
        source: GestureError,
    },
}

/// One scenario step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    #[serde(flatten)]
    pub action: ActionType,

    /// Pause after this step, overriding the scenario default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_ms: Option<u64>,
}

impl From<ActionType> for ScenarioStep {
    fn from(action: ActionType) -> Self {
        Self { action, pause_ms: None }
    }
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Pause after every step that does not set its own.
    #[serde(default)]
    pub default_pause_ms: u64,

    /// Keep going after a failed step.
    #[serde(default)]
    pub continue_on_error: bool,

    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            default_pause_ms: 0,
            continue_on_error: false,
            steps: Vec::new(),
        }
    }

    /// Parses a scenario from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a scenario file.
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let json = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the parameters that can be checked without a device: repeat
    /// counts, rotation degrees and fingerprint ids.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (i, step) in self.steps.iter().enumerate() {
            check_step(&step.action).map_err(|source| ScenarioError::InvalidStep {
                step: i + 1,
                action: step.action.name(),
                source,
            })?;
        }
        Ok(())
    }

    fn pause_after(&self, step: &ScenarioStep) -> Duration {
        Duration::from_millis(step.pause_ms.unwrap_or(self.default_pause_ms))
    }
}

fn check_step(action: &ActionType) -> Result<(), GestureError> {
    let times = match action {
        ActionType::Scroll { times, .. }
        | ActionType::Swipe { times, .. }
        | ActionType::PinchIn { times }
        | ActionType::PinchOut { times } => *times,
        ActionType::Rotate { degree, times, .. } => {
            validate_rotation_degree(*degree)?;
            *times
        }
        ActionType::Fingerprint { finger_id } if !(1..=10).contains(finger_id) => {
            return Err(GestureError::InvalidParameter(format!(
                "finger id {finger_id} must be from 1 to 10"
            )));
        }
        _ => return Ok(()),
    };
    if times == 0 {
        return Err(GestureError::InvalidParameter("repeat count must be at least 1".to_string()));
    }
    Ok(())
}

/// The outcome of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// One-based step number.
    pub step: usize,
    pub action: &'static str,
    pub success: bool,
    pub message: String,
    pub duration_ms: u64,
    /// The step failed because the remote session went away.
    pub connection_lost: bool,
}

/// What happened when a scenario ran.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub outcomes: Vec<StepOutcome>,
    /// Steps never reached because an earlier step failed.
    pub skipped: usize,
}

impl ScenarioReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    /// True if any step lost the connection to the server.
    pub fn connection_lost(&self) -> bool {
        self.outcomes.iter().any(|o| o.connection_lost)
    }

    pub fn success(&self) -> bool {
        self.failed() == 0 && self.skipped == 0
    }
}

/// Runs scenarios through an [`ActionExecutor`], logging each step to an
/// optional [`Session`].
pub struct ScenarioRunner<'a> {
    executor: &'a ActionExecutor,
    session: Option<Arc<Session>>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(executor: &'a ActionExecutor) -> Self {
        Self { executor, session: None }
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Executes every step in order.
    ///
    /// Invalid parameters are rejected up front, before the first step runs.
    pub async fn run(&self, scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
        scenario.validate()?;

        let span = info_span!("scenario", name = %scenario.name);
        async {
            info!(steps = scenario.steps.len(), "running scenario");
            let mut outcomes = Vec::with_capacity(scenario.steps.len());
            let mut skipped = 0;

            for (i, step) in scenario.steps.iter().enumerate() {
                let start = Instant::now();
                let result = self.executor.execute(step.action.clone()).await;
                let duration_ms = start.elapsed().as_millis() as u64;

                if let Some(session) = &self.session {
                    let logged = if result.success {
                        ActionResult::Success
                    } else {
                        ActionResult::Failure(result.message.clone())
                    };
                    session.log_action(step.action.clone(), logged, Some(duration_ms)).await;
                }

                debug!(step = i + 1, success = result.success, "{}", result.message);
                outcomes.push(StepOutcome {
                    step: i + 1,
                    action: step.action.name(),
                    success: result.success,
                    message: result.message,
                    duration_ms,
                    connection_lost: result.connection_lost,
                });

                let last = i + 1 == scenario.steps.len();
                if !outcomes[i].success && !scenario.continue_on_error {
                    warn!(step = i + 1, "step failed, stopping scenario");
                    skipped = scenario.steps.len() - (i + 1);
                    break;
                }

                let pause = scenario.pause_after(step);
                if !last && !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }

            let report = ScenarioReport {
                name: scenario.name.clone(),
                outcomes,
                skipped,
            };
            info!(passed = report.passed(), failed = report.failed(), skipped, "scenario finished");
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::{RotationDirection, ScrollDirection};
    use crate::keycode::AndroidKey;
    use crate::target::Target;
    use crate::testing::RecordingDriver;

    fn scroll_step() -> ScenarioStep {
        ActionType::Scroll { direction: ScrollDirection::Up, times: 1, x: None }.into()
    }

    #[test]
    fn parses_steps_with_pauses() {
        let scenario = Scenario::from_json(
            r#"{
                "name": "smoke",
                "default_pause_ms": 250,
                "steps": [
                    { "type": "Back" },
                    { "type": "PressKey", "key": "home", "pause_ms": 1000 },
                    { "type": "Rotate", "degree": 90, "direction": "counterclockwise" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[0].action, ActionType::Back);
        assert_eq!(scenario.steps[1].pause_ms, Some(1000));
        assert_eq!(scenario.pause_after(&scenario.steps[0]), Duration::from_millis(250));
        assert_eq!(
            scenario.steps[2].action,
            ActionType::Rotate { degree: 90, direction: RotationDirection::CounterClockwise, times: 1 }
        );
        assert!(!scenario.continue_on_error);
    }

    #[test]
    fn serializes_flat_steps() {
        let mut scenario = Scenario::new("flat");
        scenario.steps.push(ScenarioStep { action: ActionType::Back, pause_ms: Some(10) });
        let json = scenario.to_json_pretty().unwrap();
        let reparsed = Scenario::from_json(&json).unwrap();
        assert_eq!(reparsed, scenario);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["steps"][0]["type"], "Back");
        assert_eq!(value["steps"][0]["pause_ms"], 10);
    }

    #[test]
    fn unknown_step_type_is_parse_error() {
        let err = Scenario::from_json(r#"{"name": "x", "steps": [{"type": "Teleport"}]}"#).unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[test]
    fn validate_reports_step_number() {
        let mut scenario = Scenario::new("bad");
        scenario.steps.push(scroll_step());
        scenario.steps.push(
            ActionType::Rotate { degree: 7, direction: RotationDirection::Clockwise, times: 1 }.into(),
        );
        let err = scenario.validate().unwrap_err();
        assert_eq!(err.to_string(), "step 2 (rotate): invalid parameter: invalid degree 7: must be from 5 to 180 and divisible by 5");

        let mut zero = Scenario::new("zero");
        zero.steps.push(ActionType::PinchIn { times: 0 }.into());
        assert!(zero.validate().is_err());
    }

    #[test]
    fn shipped_demos_are_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos");
        let mut count = 0;
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let scenario = Scenario::from_file(&path).unwrap();
            scenario.validate().unwrap();
            assert!(!scenario.steps.is_empty(), "{}", path.display());
            count += 1;
        }
        assert!(count >= 2);
    }

    #[tokio::test]
    async fn runs_steps_in_order_and_logs_them() {
        let driver = Arc::new(RecordingDriver::new());
        let executor = ActionExecutor::new(driver.clone());
        let dir = std::env::temp_dir().join(format!("droidtouch-scenario-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let session = Session::with_log_dir(None, "scenario", &dir);

        let mut scenario = Scenario::new("order");
        scenario.steps.push(ActionType::PressKey { key: AndroidKey::Home }.into());
        scenario.steps.push(ActionType::Comment { message: "between".into() }.into());
        scenario.steps.push(ActionType::Back.into());

        let report = ScenarioRunner::new(&executor)
            .with_session(session.clone())
            .run(&scenario)
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(report.passed(), 3);
        assert_eq!(driver.calls(), vec!["keycode 3", "back"]);
        assert_eq!(session.get_action_log().await.len(), 3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let driver = Arc::new(RecordingDriver::new());
        let executor = ActionExecutor::new(driver.clone());

        let mut scenario = Scenario::new("stop");
        scenario.steps.push(ActionType::Tap { target: "id=missing".parse::<Target>().unwrap() }.into());
        scenario.steps.push(ActionType::Back.into());

        let report = ScenarioRunner::new(&executor).run(&scenario).await.unwrap();
        assert!(!report.success());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.connection_lost());
        assert!(!driver.calls().contains(&"back".to_string()));
    }

    #[tokio::test]
    async fn lost_session_is_reported() {
        let driver = Arc::new(RecordingDriver::new());
        let executor = ActionExecutor::new(driver.clone());

        let mut scenario = Scenario::new("gone");
        scenario.steps.push(ActionType::Back.into());
        scenario.steps.push(ActionType::Find { locator: "id=gone".parse().unwrap() }.into());

        let report = ScenarioRunner::new(&executor).run(&scenario).await.unwrap();
        assert!(report.connection_lost());
        assert!(!report.outcomes[0].connection_lost);
        assert!(report.outcomes[1].connection_lost);
    }

    #[tokio::test]
    async fn continue_on_error_runs_everything() {
        let driver = Arc::new(RecordingDriver::new());
        let executor = ActionExecutor::new(driver.clone());

        let mut scenario = Scenario::new("continue");
        scenario.continue_on_error = true;
        scenario.steps.push(ActionType::Find { locator: "id=missing".parse().unwrap() }.into());
        scenario.steps.push(ActionType::Back.into());

        let report = ScenarioRunner::new(&executor).run(&scenario).await.unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.skipped, 0);
        assert!(!report.success());
    }

    #[tokio::test]
    async fn invalid_scenario_runs_nothing() {
        let driver = Arc::new(RecordingDriver::new());
        let executor = ActionExecutor::new(driver.clone());

        let mut scenario = Scenario::new("invalid");
        scenario.steps.push(ActionType::Back.into());
        scenario.steps.push(ActionType::Fingerprint { finger_id: 42 }.into());

        assert!(ScenarioRunner::new(&executor).run(&scenario).await.is_err());
        assert!(driver.calls().is_empty());
    }
}
