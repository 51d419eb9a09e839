use std::io::{self, Read};

use droidtouch_core::action::{ActionLog, ActionType};
use droidtouch_core::scenario::{Scenario, ScenarioStep};

/// Convert JSONL session logs back into replayable form: a [`Scenario`], or
/// a shell script of `droidtouch` commands.
pub struct LogConverter;

pub fn read_stdin() -> Result<String, io::Error> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

impl LogConverter {
    /// Builds a scenario with one step per logged action, in log order.
    ///
    /// Read-only queries (window size, network state, element lookups) are
    /// kept; they fail the replay the same way they failed the logged run.
    pub fn to_scenario(name: &str, content: &str) -> Result<Scenario, io::Error> {
        let mut scenario = Scenario::new(name);
        for log in Self::parse(content)? {
            scenario.steps.push(ScenarioStep::from(log.action));
        }
        Ok(scenario)
    }

    pub fn to_script(content: &str) -> Result<String, io::Error> {
        let mut lines = vec![
            "#!/usr/bin/env bash".to_string(),
            "set -euo pipefail".to_string(),
            String::new(),
        ];

        for log in Self::parse(content)? {
            lines.push(Self::action_to_command(&log.action));
        }

        Ok(lines.join("\n") + "\n")
    }

    fn parse(content: &str) -> Result<Vec<ActionLog>, io::Error> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("Invalid JSONL: {}", e))
                })
            })
            .collect()
    }

    fn action_to_command(action: &ActionType) -> String {
        match action {
            ActionType::Tap { target } => format!("droidtouch tap {}", shell_escape(&target.to_string())),
            ActionType::DoubleTap { target } => {
                format!("droidtouch double-tap {}", shell_escape(&target.to_string()))
            }
            ActionType::LongPress { target, duration_ms } => format!(
                "droidtouch long-press {} --duration {}",
                shell_escape(&target.to_string()),
                duration_ms
            ),
            ActionType::Scroll { direction, times, x } => {
                let mut cmd = format!("droidtouch scroll {} --times {}", direction, times);
                if let Some(x) = x {
                    cmd.push_str(&format!(" --x {}", x));
                }
                cmd
            }
            ActionType::Swipe { direction, times, y } => {
                let mut cmd = format!("droidtouch swipe {} --times {}", direction, times);
                if let Some(y) = y {
                    cmd.push_str(&format!(" --y {}", y));
                }
                cmd
            }
            ActionType::PinchIn { times } => format!("droidtouch pinch-in --times {}", times),
            ActionType::PinchOut { times } => format!("droidtouch pinch-out --times {}", times),
            ActionType::Rotate { degree, direction, times } => format!(
                "droidtouch rotate {} --direction {} --times {}",
                degree, direction, times
            ),
            ActionType::PressKey { key } => format!("droidtouch key {}", key),
            ActionType::PressKeycode { code, long } => {
                let mut cmd = format!("droidtouch keycode {}", code);
                if *long {
                    cmd.push_str(" --long");
                }
                cmd
            }
            ActionType::PowerKey { mode } => format!("droidtouch power {}", mode),
            ActionType::EnterText { locator, text, clear, hide_keyboard } => {
                let mut cmd = format!(
                    "droidtouch enter-text {} {}",
                    shell_escape(&locator.to_string()),
                    shell_escape(text)
                );
                if !clear {
                    cmd.push_str(" --no-clear");
                }
                if !hide_keyboard {
                    cmd.push_str(" --keep-keyboard");
                }
                cmd
            }
            ActionType::Back => "droidtouch back".to_string(),
            ActionType::Shake => "droidtouch shake".to_string(),
            ActionType::Lock { seconds: Some(s) } => format!("droidtouch lock --seconds {}", s),
            ActionType::Lock { seconds: None } => "droidtouch lock".to_string(),
            ActionType::Unlock => "droidtouch unlock".to_string(),
            ActionType::Fingerprint { finger_id } => format!("droidtouch fingerprint {}", finger_id),
            ActionType::GetNetwork => "droidtouch network".to_string(),
            ActionType::SetNetwork { network } => format!("droidtouch network {}", network),
            ActionType::SetNetworkSpeed { speed } => format!("droidtouch network-speed {}", speed),
            ActionType::SendSms { phone, message } => {
                format!("droidtouch sms {} {}", shell_escape(phone), shell_escape(message))
            }
            ActionType::GsmCall { phone, action } => {
                format!("droidtouch gsm-call {} {}", shell_escape(phone), action)
            }
            ActionType::GsmSignal { strength } => format!("droidtouch gsm-signal {}", strength),
            ActionType::GsmVoice { state } => format!("droidtouch gsm-voice {}", state),
            ActionType::DumpUi { dir, web } => {
                let mut cmd = format!("droidtouch dump {}", shell_escape(&dir.display().to_string()));
                if *web {
                    cmd.push_str(" --web");
                }
                cmd
            }
            ActionType::Screenshot { path: Some(path) } => {
                format!("droidtouch screenshot --output {}", shell_escape(&path.display().to_string()))
            }
            ActionType::Screenshot { path: None } => "droidtouch screenshot".to_string(),
            // The log does not keep the recording length.
            ActionType::StartRecording => "# recording started".to_string(),
            ActionType::StopRecording { path } => format!("# recording saved under {}", path.display()),
            ActionType::Find { locator } => format!("droidtouch find {}", shell_escape(&locator.to_string())),
            ActionType::WindowSize => "droidtouch window-size".to_string(),
            ActionType::Sleep { ms } => format!("sleep {}.{:03}", ms / 1000, ms % 1000),
            ActionType::Comment { message } => format!("# {}", message),
        }
    }
}

/// Shell-escape a string using single quotes. Internal single quotes become `'\''`.
fn shell_escape(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ',' | ':' | '='))
    {
        // Safe to use unquoted
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}
