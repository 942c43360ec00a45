//! Export-archive and progress-record cleanup.
//!
//! Archives are cheap to rebuild and only exist to serve a download, so
//! they get a 24-hour retention, independent of the job's. The same
//! loop reaps stale download progress records.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use veridex_core::job::ARCHIVE_TTL_HOURS;
use veridex_store::layout::ARCHIVE_SUFFIX;
use veridex_store::DataLayout;

use crate::progress::ProgressStore;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the archive sweep loop until `cancel` is triggered.
pub async fn run(layout: DataLayout, progress: Arc<ProgressStore>, cancel: CancellationToken) {
    let ttl = Duration::from_secs(ARCHIVE_TTL_HOURS as u64 * 3600);
    tracing::info!(
        ttl_hours = ARCHIVE_TTL_HOURS,
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Archive sweep started"
    );

    sweep_and_log(&layout, ttl);
    progress.reap_stale(Utc::now());

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Archive sweep stopping");
                break;
            }
            _ = interval.tick() => {
                sweep_and_log(&layout, ttl);
                progress.reap_stale(Utc::now());
            }
        }
    }
}

fn sweep_and_log(layout: &DataLayout, ttl: Duration) {
    match sweep_archives(layout, ttl) {
        Ok(0) => tracing::debug!("Archive sweep: nothing to remove"),
        Ok(removed) => tracing::info!(removed, "Archive sweep: removed old archives"),
        Err(err) => tracing::error!(error = %err, "Archive sweep failed"),
    }
}

/// Remove every export archive older than `ttl`. Returns the number
/// removed.
pub fn sweep_archives(layout: &DataLayout, ttl: Duration) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(layout.root()) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !is_archive(&path) {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| now.duration_since(mtime).ok());
        let Some(age) = age else { continue };
        if age <= ttl {
            continue;
        }
        if let Err(err) = std::fs::remove_file(&path) {
            tracing::error!(path = %path.display(), error = %err, "Could not remove old archive");
            continue;
        }
        tracing::info!(path = %path.display(), "Removed old archive");
        removed += 1;
    }
    Ok(removed)
}

fn is_archive(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(ARCHIVE_SUFFIX))
}
