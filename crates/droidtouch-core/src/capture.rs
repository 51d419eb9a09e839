//! Saving page sources, screenshots and screen recordings to disk.
//!
//! File names are local-time stamps (`YYYYmmdd_HHMMSS`), so a UI dump
//! produces a matching pair such as `20240501_142233.xml` and
//! `20240501_142233.png`.

use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info};

use crate::driver::{AutomationDriver, DriverError};

/// Errors from capture operations.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Current local time formatted for file names.
pub fn capture_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Where a UI dump writes its two files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPaths {
    pub source: PathBuf,
    pub screenshot: PathBuf,
}

/// Builds the file names of a UI dump in `dir`.
pub fn dump_paths(dir: &Path, stamp: &str, web: bool) -> DumpPaths {
    let extension = if web { "html" } else { "xml" };
    DumpPaths {
        source: dir.join(format!("{stamp}.{extension}")),
        screenshot: dir.join(format!("{stamp}.png")),
    }
}

/// Resolves where a recording is saved.
///
/// A path ending in `.mp4` is used as is; anything else is treated as a
/// directory that receives `<stamp>.mp4`.
pub fn recording_path(path: &Path, stamp: &str) -> PathBuf {
    let is_mp4 = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
    if is_mp4 {
        path.to_path_buf()
    } else {
        path.join(format!("{stamp}.mp4"))
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), CaptureError> {
    let io_err = |source| CaptureError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, contents).await.map_err(io_err)?;
    debug!(path = %path.display(), bytes = contents.len(), "wrote capture file");
    Ok(())
}

/// Writes the page source and a screenshot into `dir`.
pub async fn dump_ui(
    driver: &dyn AutomationDriver,
    dir: &Path,
    web: bool,
) -> Result<DumpPaths, CaptureError> {
    let paths = dump_paths(dir, &capture_stamp(), web);

    let source = driver.page_source().await?;
    write_file(&paths.source, source.as_bytes()).await?;

    let png = driver.screenshot().await?;
    write_file(&paths.screenshot, &png).await?;

    info!(source = %paths.source.display(), "UI dumped");
    Ok(paths)
}

/// Captures a screenshot and writes it to `path`. Returns the PNG bytes.
pub async fn save_screenshot(driver: &dyn AutomationDriver, path: &Path) -> Result<Vec<u8>, CaptureError> {
    let png = driver.screenshot().await?;
    write_file(path, &png).await?;
    Ok(png)
}

/// Stops the running recording and saves it. Returns the file written.
pub async fn save_recording(driver: &dyn AutomationDriver, path: &Path) -> Result<PathBuf, CaptureError> {
    let video = driver.stop_recording().await?;
    let target = recording_path(path, &capture_stamp());
    write_file(&target, &video).await?;
    info!(path = %target.display(), bytes = video.len(), "recording saved");
    Ok(target)
}
