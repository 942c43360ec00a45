//! In-memory store of download progress records.
//!
//! Records live only in process memory; a restart forgets in-flight
//! downloads, which is acceptable because the archive itself is
//! rebuilt idempotently. Terminal records linger for a short grace
//! period so late pollers still see the outcome, then get reaped.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;
use veridex_core::progress::{DownloadProgress, DownloadStatus};

/// Thread-safe map of download id to progress record.
#[derive(Default)]
pub struct ProgressStore {
    records: RwLock<HashMap<Uuid, DownloadProgress>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh record for a download of `job_code`.
    pub fn init(&self, job_code: &str) -> DownloadProgress {
        let record = DownloadProgress::new(Uuid::new_v4(), job_code, Utc::now());
        self.records
            .write()
            .expect("progress store lock poisoned")
            .insert(record.download_id, record.clone());
        record
    }

    pub fn get(&self, id: Uuid) -> Option<DownloadProgress> {
        self.records
            .read()
            .expect("progress store lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Move a record to `status` at `progress` percent.
    pub fn update(&self, id: Uuid, status: DownloadStatus, progress: u8, phase: &str) {
        let mut records = self.records.write().expect("progress store lock poisoned");
        if let Some(record) = records.get_mut(&id) {
            record.status = status;
            record.progress = progress.min(100);
            record.phase = phase.to_string();
        }
    }

    /// Mark a record failed with an error message.
    pub fn fail(&self, id: Uuid, error: &str) {
        let mut records = self.records.write().expect("progress store lock poisoned");
        if let Some(record) = records.get_mut(&id) {
            record.status = DownloadStatus::Failed;
            record.phase = "Download failed".to_string();
            record.error = Some(error.to_string());
        }
    }

    /// Read a record for polling. A terminal record past its grace
    /// period is removed and reported as absent.
    pub fn poll(&self, id: Uuid, now: DateTime<Utc>) -> Option<DownloadProgress> {
        let mut records = self.records.write().expect("progress store lock poisoned");
        match records.get(&id) {
            Some(record) if record.is_reapable(now) => {
                records.remove(&id);
                None
            }
            Some(record) => Some(record.clone()),
            None => None,
        }
    }

    /// Drop every terminal record past its grace period.
    pub fn reap_stale(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().expect("progress store lock poisoned");
        let before = records.len();
        records.retain(|_, record| !record.is_reapable(now));
        let reaped = before - records.len();
        if reaped > 0 {
            debug!(reaped, "Reaped stale download progress records");
        }
        reaped
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .expect("progress store lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
