//! Download progress records and archive progress arithmetic.
//!
//! A progress record is created when a download is initiated, mutated as
//! the archive is built and sent, and garbage-collected a few minutes
//! after it reaches a terminal state.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Terminal records are reaped once they are this old.
pub const TERMINAL_RECORD_TTL_SECS: i64 = 300;

/// Share of the progress bar reserved for setup before compression starts.
pub const PROGRESS_SETUP_PCT: f64 = 15.0;
/// Share of the progress bar driven by compressed bytes.
pub const PROGRESS_COMPRESS_PCT: f64 = 80.0;
/// Highest value the builder itself reports; 100 is set by the caller
/// once the download has fully completed.
pub const PROGRESS_BUILDER_CAP: u8 = 99;

/// State of a download operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Initialized,
    Validating,
    Checking,
    Creating,
    Sending,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

/// One download operation's observable progress.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadProgress {
    pub download_id: Uuid,
    pub job_code: String,
    pub status: DownloadStatus,
    /// 0..=100.
    pub progress: u8,
    /// Human-readable description of the current phase.
    pub phase: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadProgress {
    pub fn new(download_id: Uuid, job_code: &str, now: DateTime<Utc>) -> Self {
        Self {
            download_id,
            job_code: job_code.to_string(),
            status: DownloadStatus::Initialized,
            progress: 0,
            phase: "Download initialized".to_string(),
            started_at: now,
            error: None,
        }
    }

    /// Whether the record is eligible for garbage collection.
    pub fn is_reapable(&self, now: DateTime<Utc>) -> bool {
        self.status.is_terminal()
            && now - self.started_at > Duration::seconds(TERMINAL_RECORD_TTL_SECS)
    }
}

/// Progress value for `processed` of `total` compressed bytes.
///
/// Maps the byte fraction onto the 15..=95 band (setup below, teardown
/// above), clamped to [`PROGRESS_BUILDER_CAP`] so only the caller ever
/// reports 100.
pub fn archive_progress(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return PROGRESS_SETUP_PCT as u8;
    }
    let fraction = (processed as f64 / total as f64).clamp(0.0, 1.0);
    let pct = (PROGRESS_SETUP_PCT + PROGRESS_COMPRESS_PCT * fraction).floor() as u8;
    pct.min(PROGRESS_BUILDER_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_progress_band() {
        assert_eq!(archive_progress(0, 100), 15);
        assert_eq!(archive_progress(50, 100), 55);
        assert_eq!(archive_progress(100, 100), 95);
    }

    #[test]
    fn archive_progress_handles_empty_and_overflow() {
        assert_eq!(archive_progress(0, 0), 15);
        // Processed beyond total clamps rather than exceeding the band.
        assert_eq!(archive_progress(200, 100), 95);
    }

    #[test]
    fn fresh_record_is_not_reapable() {
        let now = Utc::now();
        let record = DownloadProgress::new(Uuid::new_v4(), "abc123", now);
        assert!(!record.is_reapable(now));
    }

    #[test]
    fn terminal_record_reapable_after_ttl() {
        let now = Utc::now();
        let mut record = DownloadProgress::new(Uuid::new_v4(), "abc123", now);
        record.status = DownloadStatus::Completed;

        assert!(!record.is_reapable(now + Duration::seconds(TERMINAL_RECORD_TTL_SECS - 1)));
        assert!(record.is_reapable(now + Duration::seconds(TERMINAL_RECORD_TTL_SECS + 1)));
    }

    #[test]
    fn non_terminal_record_never_reapable() {
        let now = Utc::now();
        let mut record = DownloadProgress::new(Uuid::new_v4(), "abc123", now);
        record.status = DownloadStatus::Creating;
        assert!(!record.is_reapable(now + Duration::hours(2)));
    }
}
