//! Lifecycle management for a local Appium server process.
//!
//! Most setups run Appium separately. When asked to, droidtouch can start
//! the `appium` executable itself, wait until it answers `GET /status`, and
//! stop it again when done.
//!
//! # Overview
//!
//! [`AppiumServer::ensure_running`] performs the startup sequence:
//!
//! 1. **Probe** the configured URL; an already running server is reused
//! 2. **Spawn** `appium --address <host> --port <port>`
//! 3. **Wait for ready** by polling `GET /status` every 500 ms
//!
//! A spawned process is killed by [`AppiumServer::stop`], or when the
//! [`AppiumServer`] is dropped.
//!
//! # Example
//!
//! ```no_run
//! use droidtouch_core::server::{AppiumServer, AppiumServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppiumServerConfig::from_url("http://127.0.0.1:4723")?;
//! let mut server = AppiumServer::new(config);
//! server.ensure_running().await?;
//! // ... drive the device ...
//! server.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::appium_client::AppiumClient;

/// Interval between readiness probes.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a locally launched Appium server.
#[derive(Debug, Clone)]
pub struct AppiumServerConfig {
    /// The `appium` executable. Looked up on `PATH` when relative.
    pub binary: PathBuf,
    /// Address the server binds to.
    pub host: String,
    /// Port the server listens on.
    pub port: u16,
    /// Maximum time to wait for the server to become ready.
    pub startup_timeout: Duration,
}

impl Default for AppiumServerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("appium"),
            host: "127.0.0.1".to_string(),
            port: 4723,
            startup_timeout: Duration::from_secs(30),
        }
    }
}

impl AppiumServerConfig {
    /// Takes host and port from a server URL such as `http://127.0.0.1:4723`.
    pub fn from_url(url: &str) -> Result<Self, ServerError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| ServerError::InvalidUrl(format!("{url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ServerError::InvalidUrl(format!("{url}: missing host")))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| ServerError::InvalidUrl(format!("{url}: missing port")))?;
        Ok(Self {
            host: host.to_string(),
            port,
            ..Default::default()
        })
    }

    /// The base URL the server answers on.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors specific to server lifecycle operations.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The server URL could not be parsed.
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// The `appium` executable could not be started.
    #[error("Failed to launch {binary}: {source}")]
    LaunchFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited before it became ready.
    #[error("Appium server exited early ({0})")]
    ExitedEarly(String),

    /// The server did not answer `/status` within the startup timeout.
    #[error("Appium server failed to become ready within {0:?}")]
    StartupTimeout(Duration),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// AppiumServer
// ---------------------------------------------------------------------------

/// A handle on a (possibly self-launched) Appium server.
pub struct AppiumServer {
    config: AppiumServerConfig,
    child: Option<Child>,
}

impl AppiumServer {
    /// Create a handle. Nothing is started until
    /// [`ensure_running`](Self::ensure_running).
    pub fn new(config: AppiumServerConfig) -> Self {
        Self { config, child: None }
    }

    /// The server's base URL.
    pub fn url(&self) -> String {
        self.config.url()
    }

    /// Whether this handle spawned the process it manages.
    pub fn is_launched(&self) -> bool {
        self.child.is_some()
    }

    /// Returns `true` if `GET /status` succeeds within 2 seconds.
    pub async fn is_reachable(&self) -> bool {
        let Ok(client) = AppiumClient::new(self.url()) else {
            return false;
        };
        tokio::time::timeout(Duration::from_secs(2), client.status())
            .await
            .is_ok_and(|status| status.is_ok())
    }

    /// Spawn the `appium` process without waiting for it.
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.child.is_some() {
            return Ok(());
        }
        let child = Command::new(&self.config.binary)
            .arg("--address")
            .arg(&self.config.host)
            .arg("--port")
            .arg(self.config.port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ServerError::LaunchFailed {
                binary: self.config.binary.display().to_string(),
                source,
            })?;
        info!(pid = ?child.id(), url = %self.url(), "appium server launched");
        self.child = Some(child);
        Ok(())
    }

    /// Poll `GET /status` until the server answers or the startup timeout
    /// passes.
    ///
    /// # Errors
    ///
    /// - [`ServerError::ExitedEarly`] if the launched process terminates first
    /// - [`ServerError::StartupTimeout`] if nothing answers in time
    pub async fn wait_for_ready(&mut self) -> Result<(), ServerError> {
        let deadline = tokio::time::Instant::now() + self.config.startup_timeout;

        loop {
            if self.is_reachable().await {
                debug!(url = %self.url(), "appium server ready");
                return Ok(());
            }

            if let Some(child) = self.child.as_mut() {
                if let Some(status) = child.try_wait()? {
                    self.child = None;
                    return Err(ServerError::ExitedEarly(status.to_string()));
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ServerError::StartupTimeout(self.config.startup_timeout));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Reuse a running server, or launch one and wait until it is ready.
    ///
    /// Returns `true` if a process was launched.
    pub async fn ensure_running(&mut self) -> Result<bool, ServerError> {
        if self.is_reachable().await {
            debug!(url = %self.url(), "reusing running appium server");
            return Ok(false);
        }
        self.start()?;
        if let Err(e) = self.wait_for_ready().await {
            let _ = self.stop().await;
            return Err(e);
        }
        Ok(true)
    }

    /// Kill the launched process, if any. A server this handle did not start
    /// is left alone.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to kill appium server");
            return Err(e.into());
        }
        info!("appium server stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
