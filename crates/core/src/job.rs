//! Fine-tuning job records and training configuration.
//!
//! A [`Job`] is the single source of truth for one training run. Its
//! status only ever moves `training -> completed` or `training -> failed`
//! and is terminal afterwards; the record itself is destroyed by the
//! expiry sweep once `expires_at` passes, regardless of status.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::{CoreError, CoreResult};

/// Job directories are retained this many days after creation.
pub const JOB_RETENTION_DAYS: i64 = 7;
/// Export archives are retained this many hours after their own creation.
pub const ARCHIVE_TTL_HOURS: i64 = 24;

/// Maximum length of a job display name.
pub const MAX_NAME_LEN: usize = 100;
/// Allowed epoch range.
pub const EPOCH_RANGE: (u32, u32) = (1, 10);
/// Allowed batch-size range.
pub const BATCH_SIZE_RANGE: (u32, u32) = (4, 32);
/// Allowed learning-rate range.
pub const LEARNING_RATE_RANGE: (f64, f64) = (1e-6, 1e-2);
/// Allowed validation-split range (0 is additionally allowed and means
/// "no evaluation").
pub const VALIDATION_SPLIT_RANGE: (f64, f64) = (0.1, 0.3);

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Training,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and failed jobs never change state again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Caller-supplied training configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    pub base_model: String,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,
}

fn default_epochs() -> u32 {
    3
}

fn default_batch_size() -> u32 {
    16
}

fn default_learning_rate() -> f64 {
    2e-5
}

fn default_validation_split() -> f64 {
    0.2
}

impl TrainingConfig {
    /// Validate all parameter ranges and the base-model identifier.
    pub fn validate(&self) -> CoreResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("Model name is required".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "Model name too long (max {MAX_NAME_LEN} characters)"
            )));
        }

        if !catalog::is_supported_base_model(&self.base_model) {
            return Err(CoreError::Validation(format!(
                "Invalid base model. Must be one of: {}",
                catalog::BASE_MODELS
                    .iter()
                    .map(|(key, _)| *key)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        if self.epochs < EPOCH_RANGE.0 || self.epochs > EPOCH_RANGE.1 {
            return Err(CoreError::Validation(format!(
                "Epochs must be between {} and {}",
                EPOCH_RANGE.0, EPOCH_RANGE.1
            )));
        }
        if self.batch_size < BATCH_SIZE_RANGE.0 || self.batch_size > BATCH_SIZE_RANGE.1 {
            return Err(CoreError::Validation(format!(
                "Batch size must be between {} and {}",
                BATCH_SIZE_RANGE.0, BATCH_SIZE_RANGE.1
            )));
        }
        if self.learning_rate < LEARNING_RATE_RANGE.0 || self.learning_rate > LEARNING_RATE_RANGE.1
        {
            return Err(CoreError::Validation(
                "Learning rate must be between 1e-6 (0.000001) and 1e-2 (0.01)".to_string(),
            ));
        }

        // 0 is an explicit "train on everything, skip evaluation".
        let split_ok = self.validation_split == 0.0
            || (self.validation_split >= VALIDATION_SPLIT_RANGE.0
                && self.validation_split <= VALIDATION_SPLIT_RANGE.1);
        if !split_ok {
            return Err(CoreError::Validation(format!(
                "Validation split must be 0 or between {} and {}",
                VALIDATION_SPLIT_RANGE.0, VALIDATION_SPLIT_RANGE.1
            )));
        }

        Ok(())
    }
}

/// The persisted job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub code: String,
    pub base_model: String,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: JobStatus,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub train_size: usize,
    pub val_size: usize,
    pub accuracy: Option<f64>,
    pub training_time_secs: Option<f64>,
    pub error: Option<String>,
}

impl Job {
    /// Build a fresh record in `training` state with the standard
    /// retention window.
    pub fn new(code: String, config: &TrainingConfig, now: DateTime<Utc>) -> Self {
        Self {
            code,
            base_model: config.base_model.clone(),
            name: config.name.trim().to_string(),
            notes: config.notes.clone(),
            created_at: now,
            expires_at: now + Duration::days(JOB_RETENTION_DAYS),
            status: JobStatus::Training,
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            validation_split: config.validation_split,
            train_size: 0,
            val_size: 0,
            accuracy: None,
            training_time_secs: None,
            error: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Human-readable time until expiry: "N days, M hours", "N hours",
    /// "N minutes", or "Expired".
    pub fn remaining_time(&self, now: DateTime<Utc>) -> String {
        if self.is_expired(now) {
            return "Expired".to_string();
        }
        let remaining = self.expires_at - now;
        let days = remaining.num_days();
        let hours = (remaining - Duration::days(days)).num_hours();
        if days > 0 {
            format!("{days} days, {hours} hours")
        } else if hours > 0 {
            format!("{hours} hours")
        } else {
            format!("{} minutes", remaining.num_minutes())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrainingConfig {
        TrainingConfig {
            base_model: "bert-base-uncased".to_string(),
            name: "hotel reviews".to_string(),
            notes: String::new(),
            epochs: 3,
            batch_size: 16,
            learning_rate: 2e-5,
            validation_split: 0.2,
        }
    }

    #[test]
    fn new_job_gets_seven_day_retention() {
        let now = Utc::now();
        let job = Job::new("abc123".to_string(), &config(), now);
        assert_eq!(job.status, JobStatus::Training);
        assert_eq!(job.expires_at - job.created_at, Duration::days(7));
        assert!(!job.is_expired(now));
        assert!(job.is_expired(now + Duration::days(8)));
    }

    #[test]
    fn defaults_fill_missing_config_fields() {
        let cfg: TrainingConfig = serde_json::from_str(
            r#"{"base_model": "roberta-base", "name": "minimal"}"#,
        )
        .unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.learning_rate, 2e-5);
        assert_eq!(cfg.validation_split, 0.2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn out_of_range_parameters_rejected() {
        let mut cfg = config();
        cfg.epochs = 11;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.batch_size = 2;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.learning_rate = 0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = config();
        cfg.validation_split = 0.05;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_validation_split_is_allowed() {
        let mut cfg = config();
        cfg.validation_split = 0.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_base_model_rejected() {
        let mut cfg = config();
        cfg.base_model = "not-a-model".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn remaining_time_formats() {
        let now = Utc::now();
        let mut job = Job::new("abc123".to_string(), &config(), now);

        job.expires_at = now + Duration::days(2) + Duration::hours(3);
        assert_eq!(job.remaining_time(now), "2 days, 3 hours");

        job.expires_at = now + Duration::hours(5) + Duration::minutes(10);
        assert_eq!(job.remaining_time(now), "5 hours");

        job.expires_at = now + Duration::minutes(42);
        assert_eq!(job.remaining_time(now), "42 minutes");

        job.expires_at = now - Duration::seconds(1);
        assert_eq!(job.remaining_time(now), "Expired");
    }

    #[test]
    fn status_terminality() {
        assert!(!JobStatus::Training.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn record_round_trips_through_json() {
        let job = Job::new("xyz789".to_string(), &config(), Utc::now());
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, "xyz789");
        assert_eq!(back.status, JobStatus::Training);
        assert!(back.accuracy.is_none());
    }
}
