//! Session state management for Android automation.
//!
//! This module provides the [`Session`] type, which records every action
//! executed against a device.
//!
//! # Architecture
//!
//! - Executed actions are logged to the session as [`ActionLog`] entries
//! - The action log is maintained as a ring buffer to limit memory usage
//! - Actions are persisted to JSON Lines files in `~/.droidtouch/logs/`
//!
//! A persisted log can be turned back into a replayable scenario with
//! `droidtouch convert`.
//!
//! # Example
//!
//! ```no_run
//! use droidtouch_core::session::Session;
//! use droidtouch_core::action::{ActionType, ActionResult};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Session::new(Some("emulator-5554".to_string()), "default");
//!
//!     session.log_action(ActionType::Back, ActionResult::Success, Some(35)).await;
//!     session.end().await;
//! }
//! ```

use std::collections::VecDeque;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::action::{ActionLog, ActionResult, ActionType};
use crate::config::logs_dir;

/// Maximum number of action log entries to retain in the ring buffer.
const MAX_ACTION_LOG_SIZE: usize = 1000;

/// Shared state for one automation run.
///
/// The session maintains:
/// - A unique identifier and creation timestamp
/// - The device serial it targets (if known)
/// - A ring buffer of recent actions (up to 1000 entries)
/// - A persistent log file
///
/// Sessions are created via [`Session::new`], which returns an `Arc<Session>`
/// for safe sharing across async tasks.
pub struct Session {
    /// The unique identifier for this session.
    pub id: Uuid,

    /// When this session was created.
    pub created_at: DateTime<Utc>,

    /// The device serial (udid) the session drives, if any.
    pub device: Option<String>,

    action_log: RwLock<VecDeque<ActionLog>>,

    log_path: Option<PathBuf>,

    log_writer: Mutex<Option<BufWriter<std::fs::File>>>,
}

impl Session {
    /// Creates a new session logging to `~/.droidtouch/logs/{session_name}_{timestamp}.jsonl`.
    pub fn new(device: Option<String>, session_name: &str) -> Arc<Self> {
        Self::with_log_dir(device, session_name, &logs_dir())
    }

    /// Creates a new session logging into `dir`.
    ///
    /// A log file that cannot be created is reported once and the session
    /// continues with in-memory logging only.
    pub fn with_log_dir(device: Option<String>, session_name: &str, dir: &Path) -> Arc<Self> {
        let created_at = Utc::now();

        let timestamp = created_at.format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{}_{}.jsonl", session_name, timestamp));
        let (log_path, log_writer) = match std::fs::File::create(&path) {
            Ok(file) => (Some(path), Some(BufWriter::new(file))),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not create session log");
                (None, None)
            }
        };

        Arc::new(Self {
            id: Uuid::new_v4(),
            created_at,
            device,
            action_log: RwLock::new(VecDeque::with_capacity(MAX_ACTION_LOG_SIZE)),
            log_path,
            log_writer: Mutex::new(log_writer),
        })
    }

    /// Path of the persistent JSON Lines log, if one is being written.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Logs an action.
    ///
    /// The entry is appended to the ring buffer (dropping the oldest entry
    /// when full) and written as one line to the persistent log.
    pub async fn log_action(&self, action: ActionType, result: ActionResult, duration_ms: Option<u64>) -> ActionLog {
        let log = ActionLog::new(action, result, duration_ms);

        {
            let mut action_log = self.action_log.write().await;
            if action_log.len() >= MAX_ACTION_LOG_SIZE {
                action_log.pop_front();
            }
            action_log.push_back(log.clone());
        }

        {
            let mut writer_guard = self.log_writer.lock().await;
            if let Some(ref mut writer) = *writer_guard {
                if let Ok(json) = serde_json::to_string(&log) {
                    let _ = writeln!(writer, "{}", json);
                    let _ = writer.flush();
                }
            }
        }

        log
    }

    /// Returns all action log entries in chronological order.
    pub async fn get_action_log(&self) -> Vec<ActionLog> {
        self.action_log.read().await.iter().cloned().collect()
    }

    /// Flushes the log file.
    pub async fn end(&self) {
        if let Some(ref mut writer) = *self.log_writer.lock().await {
            let _ = writer.flush();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("device", &self.device)
            .field("log_path", &self.log_path)
            .field("action_log", &"<RwLock<VecDeque<ActionLog>>>")
            .finish()
    }
}
