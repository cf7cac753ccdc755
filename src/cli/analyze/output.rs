//! File output for the analyze command
//!
//! This module contains:
//! - Atomic writes of rendered reports
//! - Copying HTML/PNG artifacts to the publish directory
//! - Opening a report with the system viewer

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions copied by `--publish-dir`
const PUBLISHED_EXTENSIONS: [&str; 2] = ["html", "png"];

/// Write `content` to `path` through a temp file in the same directory
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".schoolstat-")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Copy the HTML and PNG files among `files` into `dir`
pub(crate) fn publish(files: &[PathBuf], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create publish directory {}", dir.display()))?;

    let mut copied = Vec::new();
    for file in files.iter().filter(|f| is_published(f)) {
        let Some(name) = file.file_name() else {
            continue;
        };
        let dest = dir.join(name);
        std::fs::copy(file, &dest).with_context(|| {
            format!("Failed to copy {} to {}", file.display(), dest.display())
        })?;
        copied.push(dest);
    }
    Ok(copied)
}

fn is_published(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PUBLISHED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Open `path` with the platform viewer. Failure only warns.
pub(crate) fn open_in_viewer(path: &Path) {
    let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(&target).spawn();
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd")
        .args(["/C", "start", ""])
        .arg(&target)
        .spawn();
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = std::process::Command::new("xdg-open").arg(&target).spawn();

    match result {
        Ok(_) => debug!("Opened {}", target.display()),
        Err(e) => warn!(
            "Could not open {} automatically ({}); open it manually",
            target.display(),
            e
        ),
    }
}
