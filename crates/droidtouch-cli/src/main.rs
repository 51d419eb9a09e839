//! Command-line driver for Android gesture automation through an Appium
//! server.
//!
//! Every device command opens a remote session, performs one action (or one
//! scenario run), logs it to `~/.droidtouch/logs/` and closes the session.
//!
//! # Usage
//!
//! ```bash
//! # Tap an element by resource id, or a screen position
//! droidtouch tap id=com.android.settings:id/search
//! droidtouch tap 540,1200
//!
//! # Multi-touch gestures
//! droidtouch pinch-out --times 2
//! droidtouch rotate 90 --direction counterclockwise
//!
//! # Scroll and swipe, optionally pinning the other coordinate
//! droidtouch scroll up --times 3
//! droidtouch swipe left --y 400
//!
//! # Keys, device controls and emulator telephony
//! droidtouch key home
//! droidtouch power off
//! droidtouch network airplane
//! droidtouch gsm-call 5551234 call
//!
//! # Capture
//! droidtouch dump ./dumps
//! droidtouch screenshot -o screen.png
//! droidtouch record ./videos --seconds 5
//!
//! # Print a gesture plan without touching a device
//! droidtouch plan --width 1080 --height 2400 rotate 45
//!
//! # Replay scenario files and convert session logs back into scenarios
//! droidtouch run 'demos/*.json'
//! droidtouch convert ~/.droidtouch/logs/cli_20240101_120000.jsonl
//!
//! # Use a specific device and let droidtouch start Appium
//! droidtouch --device emulator-5554 --launch-server back
//! ```

mod converter;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use droidtouch_core::action::{ActionResult, ActionType};
use droidtouch_core::config::{logs_dir, DroidtouchConfig};
use droidtouch_core::executor::{ActionExecutor, ExecutionResult};
use droidtouch_core::geometry::ScreenSize;
use droidtouch_core::gesture::{
    compute_linear_gesture, compute_pinch, compute_rotate, GesturePlan, LinearGesture,
    PinchDirection, RotationDirection, ScrollDirection, SwipeDirection,
};
use droidtouch_core::keycode::{AndroidKey, PowerMode};
use droidtouch_core::network::{GsmCallAction, GsmSignal, GsmVoiceState, NetworkSpeed, NetworkType};
use droidtouch_core::scenario::{Scenario, ScenarioReport, ScenarioRunner};
use droidtouch_core::server::{AppiumServer, AppiumServerConfig};
use droidtouch_core::session::Session;
use droidtouch_core::target::{Locator, Target};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Android gesture automation through an Appium server.
#[derive(Parser)]
#[command(name = "droidtouch")]
#[command(about = "Drive gestures, keys and device controls on Android through Appium")]
#[command(version)]
struct Cli {
    /// Appium server URL
    #[arg(long, global = true, env = "DROIDTOUCH_SERVER")]
    server: Option<String>,

    /// Device serial (udid) to open the session on
    #[arg(short, long, global = true, env = "DROIDTOUCH_DEVICE")]
    device: Option<String>,

    /// Application package to start
    #[arg(long, global = true, env = "DROIDTOUCH_APP_PACKAGE")]
    app_package: Option<String>,

    /// Activity to launch within the application package
    #[arg(long, global = true, env = "DROIDTOUCH_APP_ACTIVITY")]
    app_activity: Option<String>,

    /// Appium automation driver name (e.g. UiAutomator2)
    #[arg(long, global = true, env = "DROIDTOUCH_AUTOMATION_NAME")]
    automation_name: Option<String>,

    /// Start a local `appium` process if no server answers
    #[arg(long, global = true, env = "DROIDTOUCH_LAUNCH_SERVER")]
    launch_server: bool,

    /// Output format: text or json
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write logs to ~/.droidtouch/logs/droidtouch.log instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Tap an element (locator) or a screen position (x,y)
    Tap {
        /// `id=...`, `aid=...`, `xpath=...`, an XPath, or `x,y`
        target: Target,
    },

    /// Double tap an element or a screen position
    DoubleTap {
        target: Target,
    },

    /// Press and hold an element or a screen position
    LongPress {
        target: Target,
        /// Hold duration in milliseconds
        #[arg(short = 'D', long, default_value = "1000")]
        duration: u64,
    },

    /// Scroll the screen vertically
    Scroll {
        /// Direction: up or down
        direction: ScrollDirection,
        /// Number of times to repeat
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
        /// Fixed x coordinate (defaults to mid-screen)
        #[arg(long)]
        x: Option<i32>,
    },

    /// Swipe the screen horizontally
    Swipe {
        /// Direction: left or right
        direction: SwipeDirection,
        /// Number of times to repeat
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
        /// Fixed y coordinate (defaults to mid-screen)
        #[arg(long)]
        y: Option<i32>,
    },

    /// Two-finger pinch toward the center (zoom out)
    PinchIn {
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
    },

    /// Two-finger pinch away from the center (zoom in)
    PinchOut {
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
    },

    /// Two-finger rotation around the screen center
    Rotate {
        /// Arc in degrees: 5 to 180, a multiple of 5
        degree: u32,
        /// Direction: clockwise or counterclockwise
        #[arg(short = 'r', long, default_value = "clockwise")]
        direction: RotationDirection,
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
    },

    /// Press a named key (back, home, app_switch, volume_up, ...)
    Key {
        key: AndroidKey,
    },

    /// Press a raw Android keycode
    Keycode {
        code: u32,
        /// Long press instead of a short press
        #[arg(long)]
        long: bool,
    },

    /// Power key: on, off or sleep
    Power {
        mode: PowerMode,
    },

    /// Navigate back
    Back,

    /// Shake the device
    Shake,

    /// Lock the screen
    Lock {
        /// Unlock again after this many seconds
        #[arg(short, long)]
        seconds: Option<u32>,
    },

    /// Unlock the screen if it is locked
    Unlock,

    /// Authenticate with an emulator fingerprint (1-10)
    Fingerprint {
        finger_id: u8,
    },

    /// Type text into an element
    EnterText {
        /// `id=...`, `aid=...`, `xpath=...` or an XPath
        locator: Locator,
        /// Text to type
        text: String,
        /// Keep the element's existing text
        #[arg(long)]
        no_clear: bool,
        /// Leave the soft keyboard open afterwards
        #[arg(long)]
        keep_keyboard: bool,
    },

    /// Find an element and print its center
    Find {
        locator: Locator,
    },

    /// Show the network state, or set it (none, airplane, wifi, data, all)
    Network {
        network: Option<NetworkType>,
    },

    /// Emulate a network speed (gsm, gprs, edge, umts, lte, full, ...)
    NetworkSpeed {
        speed: NetworkSpeed,
    },

    /// Send an SMS to the emulator
    Sms {
        phone: String,
        message: String,
    },

    /// Emulate an incoming call: call, accept, cancel or hold
    GsmCall {
        phone: String,
        action: GsmCallAction,
    },

    /// Set the emulator signal strength (none, poor, moderate, good, great)
    GsmSignal {
        strength: GsmSignal,
    },

    /// Set the emulator voice state (home, roaming, off, on, ...)
    GsmVoice {
        state: GsmVoiceState,
    },

    /// Save the UI hierarchy and a screenshot into a directory
    Dump {
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Save the source as .html (web views)
        #[arg(long)]
        web: bool,
    },

    /// Capture a screenshot (prints base64 PNG unless --output is given)
    Screenshot {
        /// Write the PNG to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record the screen for a number of seconds
    Record {
        /// A `.mp4` file, or a directory for a timestamped recording
        path: PathBuf,
        #[arg(short, long, default_value = "10")]
        seconds: u64,
    },

    /// Print the device screen size
    WindowSize,

    /// Print a gesture plan as JSON without contacting a device
    Plan {
        /// Screen width in pixels
        #[arg(long)]
        width: u32,
        /// Screen height in pixels
        #[arg(long)]
        height: u32,
        #[command(subcommand)]
        gesture: PlanGesture,
    },

    /// Run scenario files (glob patterns allowed)
    Run {
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Keep going after a failed step
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Convert a JSONL session log into a scenario (or a shell script)
    Convert {
        /// Path to the JSONL log file (reads from stdin if omitted)
        log: Option<PathBuf>,
        /// Emit a bash script of droidtouch commands instead
        #[arg(long)]
        script: bool,
        /// Scenario name (defaults to the log file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Check whether the Appium server is reachable
    Status,

    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PlanGesture {
    PinchIn {
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
    },
    PinchOut {
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
    },
    Rotate {
        degree: u32,
        #[arg(short = 'r', long, default_value = "clockwise")]
        direction: RotationDirection,
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
    },
    Scroll {
        direction: ScrollDirection,
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
        #[arg(long)]
        x: Option<i32>,
    },
    Swipe {
        direction: SwipeDirection,
        #[arg(short = 'n', long, default_value = "1")]
        times: u32,
        #[arg(long)]
        y: Option<i32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

/// Installs the global subscriber. The returned guard flushes the log file
/// when dropped.
fn init_tracing(verbose: u8, log_file: bool) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    if log_file {
        let appender = tracing_appender::rolling::never(logs_dir(), "droidtouch.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

#[derive(Debug)]
enum CliError {
    Connection(String),
    ActionFailed(String),
    Protocol(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Connection(_) => ExitCode::from(2),
            CliError::ActionFailed(_) => ExitCode::from(1),
            CliError::Protocol(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::ActionFailed(msg) => write!(f, "Action failed: {}", msg),
            CliError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // Handle commands that don't need a device session
    match cli.command {
        Command::Plan { width, height, ref gesture } => return print_plan(width, height, gesture),
        Command::Convert { ref log, script, ref name } => {
            let output = convert_log(log.as_deref(), script, name.as_deref())?;
            print!("{}", output);
            return Ok(());
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "droidtouch", &mut std::io::stdout());
            return Ok(());
        }
        Command::Status => return get_status(&cli).await,
        _ => {} // Fall through to device commands
    }

    // Scenario files are checked before a session is opened.
    let scenarios = match cli.command {
        Command::Run { ref patterns, continue_on_error } => load_scenarios(patterns, continue_on_error)?,
        _ => Vec::new(),
    };

    let conn = Connection::open(&cli).await?;
    let outcome = run_device_command(&conn, &cli, &scenarios).await;
    conn.close().await;
    outcome
}

/// Maps a single-action subcommand to its [`ActionType`].
fn command_action(command: &Command) -> Option<ActionType> {
    let action = match command {
        Command::Tap { target } => ActionType::Tap { target: target.clone() },
        Command::DoubleTap { target } => ActionType::DoubleTap { target: target.clone() },
        Command::LongPress { target, duration } => ActionType::LongPress {
            target: target.clone(),
            duration_ms: *duration,
        },
        Command::Scroll { direction, times, x } => ActionType::Scroll {
            direction: *direction,
            times: *times,
            x: *x,
        },
        Command::Swipe { direction, times, y } => ActionType::Swipe {
            direction: *direction,
            times: *times,
            y: *y,
        },
        Command::PinchIn { times } => ActionType::PinchIn { times: *times },
        Command::PinchOut { times } => ActionType::PinchOut { times: *times },
        Command::Rotate { degree, direction, times } => ActionType::Rotate {
            degree: *degree,
            direction: *direction,
            times: *times,
        },
        Command::Key { key } => ActionType::PressKey { key: *key },
        Command::Keycode { code, long } => ActionType::PressKeycode { code: *code, long: *long },
        Command::Power { mode } => ActionType::PowerKey { mode: *mode },
        Command::Back => ActionType::Back,
        Command::Shake => ActionType::Shake,
        Command::Lock { seconds } => ActionType::Lock { seconds: *seconds },
        Command::Unlock => ActionType::Unlock,
        Command::Fingerprint { finger_id } => ActionType::Fingerprint { finger_id: *finger_id },
        Command::EnterText { locator, text, no_clear, keep_keyboard } => ActionType::EnterText {
            locator: locator.clone(),
            text: text.clone(),
            clear: !no_clear,
            hide_keyboard: !keep_keyboard,
        },
        Command::Find { locator } => ActionType::Find { locator: locator.clone() },
        Command::Network { network: Some(network) } => ActionType::SetNetwork { network: *network },
        Command::Network { network: None } => ActionType::GetNetwork,
        Command::NetworkSpeed { speed } => ActionType::SetNetworkSpeed { speed: *speed },
        Command::Sms { phone, message } => ActionType::SendSms {
            phone: phone.clone(),
            message: message.clone(),
        },
        Command::GsmCall { phone, action } => ActionType::GsmCall {
            phone: phone.clone(),
            action: *action,
        },
        Command::GsmSignal { strength } => ActionType::GsmSignal { strength: *strength },
        Command::GsmVoice { state } => ActionType::GsmVoice { state: *state },
        Command::Dump { dir, web } => ActionType::DumpUi { dir: dir.clone(), web: *web },
        Command::Screenshot { output } => ActionType::Screenshot { path: output.clone() },
        Command::WindowSize => ActionType::WindowSize,
        _ => return None,
    };
    Some(action)
}

async fn run_device_command(conn: &Connection, cli: &Cli, scenarios: &[Scenario]) -> Result<(), CliError> {
    if let Some(action) = command_action(&cli.command) {
        return execute_action(conn, action, cli).await;
    }

    match cli.command {
        Command::Record { ref path, seconds } => {
            execute_action(conn, ActionType::StartRecording, cli).await?;
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            execute_action(conn, ActionType::StopRecording { path: path.clone() }, cli).await
        }
        Command::Run { .. } => run_scenarios(conn, scenarios, cli).await,
        _ => Err(CliError::Protocol("command does not drive a device".to_string())),
    }
}

// ---------------------------------------------------------------------------
// Device connection
// ---------------------------------------------------------------------------

/// An open remote session plus everything that must be torn down with it.
struct Connection {
    executor: ActionExecutor,
    session: Arc<Session>,
    server: Option<AppiumServer>,
}

/// Loads the config file and applies command-line overrides.
fn effective_config(cli: &Cli) -> DroidtouchConfig {
    let mut config = DroidtouchConfig::load();
    if let Some(ref server) = cli.server {
        config.server_url = server.clone();
    }
    let caps = &mut config.capabilities;
    if let Some(ref device) = cli.device {
        caps.udid = Some(device.clone());
    }
    if let Some(ref package) = cli.app_package {
        caps.app_package = Some(package.clone());
    }
    if let Some(ref activity) = cli.app_activity {
        caps.app_activity = Some(activity.clone());
    }
    if let Some(ref name) = cli.automation_name {
        caps.automation_name = name.clone();
    }
    config.launch_server |= cli.launch_server;
    config
}

fn server_handle(config: &DroidtouchConfig) -> Result<AppiumServer, CliError> {
    let mut server_config =
        AppiumServerConfig::from_url(&config.server_url).map_err(|e| CliError::Protocol(e.to_string()))?;
    if let Some(ref binary) = config.appium_binary {
        server_config.binary = binary.clone();
    }
    Ok(AppiumServer::new(server_config))
}

impl Connection {
    async fn open(cli: &Cli) -> Result<Self, CliError> {
        let config = effective_config(cli);

        let server = if config.launch_server {
            let mut server = server_handle(&config)?;
            let launched = server
                .ensure_running()
                .await
                .map_err(|e| CliError::Connection(e.to_string()))?;
            if launched && !cli.quiet {
                eprintln!("Started Appium server at {}", server.url());
            }
            Some(server)
        } else {
            None
        };

        let executor = ActionExecutor::from_config_connected(&config)
            .await
            .map_err(|e| CliError::Connection(format!("{} ({})", e, config.server_url)))?;
        debug!(server = %config.server_url, caps = %config.capabilities.describe(), "session opened");

        let session = Session::new(config.capabilities.udid.clone(), "cli");
        Ok(Self { executor, session, server })
    }

    /// Ends the log, deletes the remote session and stops a launched server.
    async fn close(mut self) {
        self.session.end().await;
        if let Err(e) = self.executor.driver().disconnect().await {
            warn!(error = %e, "failed to delete remote session");
        }
        if let Some(ref mut server) = self.server {
            if let Err(e) = server.stop().await {
                warn!(error = %e, "failed to stop Appium server");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Actions whose data payload is the point of running them.
fn prints_data(action: &ActionType) -> bool {
    matches!(
        action,
        ActionType::Screenshot { path: None }
            | ActionType::Find { .. }
            | ActionType::WindowSize
            | ActionType::GetNetwork
            | ActionType::SetNetwork { .. }
    )
}

async fn execute_action(conn: &Connection, action: ActionType, cli: &Cli) -> Result<(), CliError> {
    let action_label = action.name();
    let shows_data = prints_data(&action);

    let start = Instant::now();
    let result = conn.executor.execute(action.clone()).await;
    let elapsed = start.elapsed();

    let logged = if result.success {
        ActionResult::Success
    } else {
        ActionResult::Failure(result.message.clone())
    };
    conn.session
        .log_action(action, logged, Some(elapsed.as_millis() as u64))
        .await;

    if cli.format == OutputFormat::Json {
        println!("{:#}", result_json(&result));
    } else if result.success {
        if shows_data {
            if let Some(ref d) = result.data {
                println!("{}", d);
            }
        }
        if !cli.quiet {
            let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ");
            eprintln!("|{}|{}|{}|{}ms|", now, action_label, result.message, elapsed.as_millis());
        }
    }

    if result.success {
        Ok(())
    } else if result.connection_lost {
        Err(CliError::Connection(result.message))
    } else {
        Err(CliError::ActionFailed(result.message))
    }
}

fn result_json(result: &ExecutionResult) -> serde_json::Value {
    // Structured payloads are embedded as JSON, base64 screenshots as strings.
    let data = result.data.as_ref().map(|d| {
        serde_json::from_str::<serde_json::Value>(d).unwrap_or_else(|_| serde_json::Value::String(d.clone()))
    });
    serde_json::json!({
        "success": result.success,
        "message": result.message,
        "data": data,
    })
}

// ---------------------------------------------------------------------------
// Offline commands
// ---------------------------------------------------------------------------

fn compute_plan(width: u32, height: u32, gesture: &PlanGesture) -> Result<GesturePlan, CliError> {
    let screen = ScreenSize::new(width, height).map_err(|e| CliError::Protocol(e.to_string()))?;
    let plan = match gesture {
        PlanGesture::PinchIn { times } => compute_pinch(screen, PinchDirection::In, *times),
        PlanGesture::PinchOut { times } => compute_pinch(screen, PinchDirection::Out, *times),
        PlanGesture::Rotate { degree, direction, times } => compute_rotate(screen, *degree, *direction, *times),
        PlanGesture::Scroll { direction, times, x } => {
            compute_linear_gesture(screen, LinearGesture::Scroll(*direction), *x, *times)
        }
        PlanGesture::Swipe { direction, times, y } => {
            compute_linear_gesture(screen, LinearGesture::Swipe(*direction), *y, *times)
        }
    };
    plan.map_err(|e| CliError::Protocol(e.to_string()))
}

fn print_plan(width: u32, height: u32, gesture: &PlanGesture) -> Result<(), CliError> {
    let plan = compute_plan(width, height, gesture)?;
    let json = serde_json::to_string_pretty(&plan).map_err(|e| CliError::Protocol(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn convert_log(log: Option<&Path>, script: bool, name: Option<&str>) -> Result<String, CliError> {
    let content = match log {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| CliError::ActionFailed(format!("Failed to read {}: {}", path.display(), e)))?,
        None => converter::read_stdin()
            .map_err(|e| CliError::ActionFailed(format!("Failed to read stdin: {}", e)))?,
    };

    if script {
        return converter::LogConverter::to_script(&content)
            .map_err(|e| CliError::ActionFailed(format!("Failed to convert log: {}", e)));
    }

    let name = name
        .map(String::from)
        .or_else(|| log.and_then(|p| p.file_stem()).map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "converted".to_string());
    let scenario = converter::LogConverter::to_scenario(&name, &content)
        .map_err(|e| CliError::ActionFailed(format!("Failed to convert log: {}", e)))?;
    let json = scenario.to_json_pretty().map_err(|e| CliError::Protocol(e.to_string()))?;
    Ok(json + "\n")
}

async fn get_status(cli: &Cli) -> Result<(), CliError> {
    let config = effective_config(cli);
    let server = server_handle(&config)?;
    let reachable = server.is_reachable().await;

    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "server": config.server_url,
            "reachable": reachable,
            "capabilities": config.capabilities.to_w3c(),
            "config": DroidtouchConfig::path().display().to_string(),
        });
        println!("{:#}", output);
    } else {
        println!("Server: {}", config.server_url);
        println!("Reachable: {}", reachable);
        println!("Capabilities: {}", config.capabilities.describe());
        println!("Config: {}", DroidtouchConfig::path().display());
    }

    if reachable {
        Ok(())
    } else {
        Err(CliError::Connection(format!(
            "no Appium server answering at {}",
            config.server_url
        )))
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Expands glob patterns into a sorted list of files. A pattern without
/// wildcards that matches nothing is kept, so the read error names it.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>, CliError> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = glob::glob(pattern)
            .map_err(|e| CliError::Protocol(format!("invalid pattern '{}': {}", pattern, e)))?
            .filter_map(Result::ok)
            .collect();
        if matches.is_empty() {
            files.push(PathBuf::from(pattern));
        } else {
            files.extend(matches);
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Reads and validates every scenario matched by `patterns`.
fn load_scenarios(patterns: &[String], continue_on_error: bool) -> Result<Vec<Scenario>, CliError> {
    let files = expand_patterns(patterns)?;
    let mut scenarios = Vec::with_capacity(files.len());
    for file in &files {
        let mut scenario = Scenario::from_file(file).map_err(|e| CliError::Protocol(e.to_string()))?;
        scenario
            .validate()
            .map_err(|e| CliError::Protocol(format!("{}: {}", file.display(), e)))?;
        scenario.continue_on_error |= continue_on_error;
        scenarios.push(scenario);
    }
    Ok(scenarios)
}

async fn run_scenarios(conn: &Connection, scenarios: &[Scenario], cli: &Cli) -> Result<(), CliError> {
    let runner = ScenarioRunner::new(&conn.executor).with_session(conn.session.clone());
    let mut reports = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let report = runner
            .run(scenario)
            .await
            .map_err(|e| CliError::Protocol(e.to_string()))?;
        if cli.format == OutputFormat::Text && !cli.quiet {
            print_report(&report);
        }
        reports.push(report);
    }

    if cli.format == OutputFormat::Json {
        let json = serde_json::to_string_pretty(&reports).map_err(|e| CliError::Protocol(e.to_string()))?;
        println!("{}", json);
    }

    if let Some(lost) = reports.iter().find(|r| r.connection_lost()) {
        return Err(CliError::Connection(format!("connection lost during scenario {}", lost.name)));
    }

    let failed: Vec<&str> = reports
        .iter()
        .filter(|r| !r.success())
        .map(|r| r.name.as_str())
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::ActionFailed(format!("scenario(s) failed: {}", failed.join(", "))))
    }
}

fn print_report(report: &ScenarioReport) {
    println!("{}", report.name);
    for outcome in &report.outcomes {
        let mark = if outcome.success { "ok" } else { "FAILED" };
        println!(
            "  {:>3}. {:<18} {:<6} {:>6}ms  {}",
            outcome.step, outcome.action, mark, outcome.duration_ms, outcome.message
        );
    }
    if report.skipped > 0 {
        println!("  {} step(s) skipped", report.skipped);
    }
    println!(
        "  {} passed, {} failed",
        report.passed(),
        report.failed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("droidtouch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_tap_parses_position_and_locator() {
        let cli = parse(&["tap", "540,1200"]);
        assert_eq!(
            command_action(&cli.command),
            Some(ActionType::Tap { target: Target::position(540, 1200) })
        );

        let cli = parse(&["tap", "id=com.android.settings:id/search"]);
        match command_action(&cli.command) {
            Some(ActionType::Tap { target: Target::ByLocator(Locator::Id(id)) }) => {
                assert_eq!(id, "com.android.settings:id/search");
            }
            _ => panic!("expected a locator tap"),
        }
    }

    #[test]
    fn test_bad_tokens_are_rejected_by_the_parser() {
        let argv = |args: &[&'static str]| std::iter::once("droidtouch").chain(args.iter().copied()).collect::<Vec<_>>();
        assert!(Cli::try_parse_from(argv(&["scroll", "sideways"])).is_err());
        assert!(Cli::try_parse_from(argv(&["key", "teleport"])).is_err());
        assert!(Cli::try_parse_from(argv(&["network", "5g"])).is_err());
        assert!(Cli::try_parse_from(argv(&["tap", "login-button"])).is_err());
    }

    #[test]
    fn test_token_case_is_ignored() {
        let cli = parse(&["rotate", "90", "--direction", "CounterClockwise"]);
        assert_eq!(
            command_action(&cli.command),
            Some(ActionType::Rotate { degree: 90, direction: RotationDirection::CounterClockwise, times: 1 })
        );
    }

    #[test]
    fn test_network_without_argument_reads_state() {
        assert_eq!(command_action(&parse(&["network"]).command), Some(ActionType::GetNetwork));
        assert_eq!(
            command_action(&parse(&["network", "airplane"]).command),
            Some(ActionType::SetNetwork { network: NetworkType::Airplane })
        );
    }

    #[test]
    fn test_enter_text_flags_invert_defaults() {
        let cli = parse(&["enter-text", "id=search", "hello", "--no-clear"]);
        match command_action(&cli.command) {
            Some(ActionType::EnterText { clear, hide_keyboard, text, .. }) => {
                assert!(!clear);
                assert!(hide_keyboard);
                assert_eq!(text, "hello");
            }
            _ => panic!("expected EnterText"),
        }
    }

    #[test]
    fn test_offline_commands_have_no_action() {
        let cases: [&[&str]; 4] = [&["status"], &["convert"], &["completions", "bash"], &["run", "a.json"]];
        for args in cases {
            assert!(command_action(&parse(args).command).is_none());
        }
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = parse(&[
            "--server",
            "http://10.0.0.2:4724",
            "--device",
            "emulator-5556",
            "--app-package",
            "com.android.settings",
            "back",
        ]);
        let config = effective_config(&cli);
        assert_eq!(config.server_url, "http://10.0.0.2:4724");
        assert_eq!(config.capabilities.udid.as_deref(), Some("emulator-5556"));
        assert_eq!(config.capabilities.app_package.as_deref(), Some("com.android.settings"));
    }

    #[test]
    fn test_plan_matches_core_synthesis() {
        let plan = compute_plan(
            1000,
            2000,
            &PlanGesture::Swipe { direction: SwipeDirection::Left, times: 1, y: None },
        )
        .unwrap();
        assert_eq!(plan.fingers.len(), 1);
        assert_eq!(plan.fingers[0].start().x, 500);
        assert_eq!(plan.fingers[0].end().x, 250);
    }

    #[test]
    fn test_plan_rejects_invalid_degree() {
        let err = compute_plan(
            1000,
            2000,
            &PlanGesture::Rotate { degree: 7, direction: RotationDirection::Clockwise, times: 1 },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Protocol(_)));
        assert!(err.to_string().contains("invalid degree 7"));
    }

    #[test]
    fn test_result_json_embeds_structured_data() {
        let result = ExecutionResult::success("Screen size 1000x2000")
            .with_data(r#"{"width":1000,"height":2000}"#.to_string());
        let json = result_json(&result);
        assert_eq!(json["data"]["width"], 1000);

        let result = ExecutionResult::success("Screenshot captured").with_data("iVBORw0KGgo=".to_string());
        assert_eq!(result_json(&result)["data"], "iVBORw0KGgo=");
    }

    #[test]
    fn test_expand_patterns_keeps_literal_misses() {
        let files = expand_patterns(&["does/not/exist.json".to_string()]).unwrap();
        assert_eq!(files, vec![PathBuf::from("does/not/exist.json")]);
    }
}
