//! Job record persistence.
//!
//! Records are plain JSON files so an operator can inspect or repair a
//! job with nothing but a text editor. Updates go through a temp file
//! and rename so a crash mid-write never leaves a truncated record.

use std::fs;
use std::io::Write;

use tracing::warn;
use veridex_core::codes::CODE_LEN;
use veridex_core::error::{CoreError, CoreResult};
use veridex_core::job::Job;

use crate::layout::DataLayout;

/// Reads and writes job records under the data layout.
#[derive(Debug, Clone)]
pub struct JobStore {
    layout: DataLayout,
}

impl JobStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Whether a job directory exists for `code`, whatever its state.
    pub fn exists(&self, code: &str) -> bool {
        self.layout.job_dir(code).is_dir()
    }

    /// Create the job directory and write the initial record.
    pub fn create(&self, job: &Job) -> CoreResult<()> {
        fs::create_dir_all(self.layout.job_dir(&job.code))?;
        self.write_record(job)
    }

    /// Read a record, mapping a missing directory or file to `NotFound`.
    pub fn read(&self, code: &str) -> CoreResult<Job> {
        let path = self.layout.metadata_path(code);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::NotFound {
                    entity: "job",
                    code: code.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map_err(|err| {
            CoreError::Internal(format!("corrupt job record for {code}: {err}"))
        })
    }

    /// Read a record, treating both a missing and an unreadable record
    /// as absent. Used by sweeps, which must not stall on one bad entry.
    pub fn try_read(&self, code: &str) -> Option<Job> {
        match self.read(code) {
            Ok(job) => Some(job),
            Err(CoreError::NotFound { .. }) => None,
            Err(err) => {
                warn!(code, %err, "skipping unreadable job record");
                None
            }
        }
    }

    /// Replace the record atomically.
    pub fn update(&self, job: &Job) -> CoreResult<()> {
        if !self.exists(&job.code) {
            return Err(CoreError::NotFound {
                entity: "job",
                code: job.code.clone(),
            });
        }
        self.write_record(job)
    }

    /// Remove the whole job directory, model artifact included.
    pub fn delete(&self, code: &str) -> CoreResult<()> {
        let dir = self.layout.job_dir(code);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(CoreError::NotFound {
                entity: "job",
                code: code.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Drop the completion marker. Written last, after the model has
    /// been saved, so readers can trust `model/` whenever it is present.
    pub fn mark_completed(&self, code: &str) -> CoreResult<()> {
        fs::write(self.layout.marker_path(code), b"")?;
        Ok(())
    }

    pub fn is_completed(&self, code: &str) -> bool {
        self.layout.marker_path(code).is_file()
    }

    /// Codes of all job directories, skipping anything that does not
    /// look like a generated code.
    pub fn list_codes(&self) -> CoreResult<Vec<String>> {
        let mut codes = Vec::new();
        let entries = match fs::read_dir(self.layout.jobs_dir()) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(codes),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.len() == CODE_LEN
                && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            {
                codes.push(name.to_string());
            }
        }
        codes.sort();
        Ok(codes)
    }

    fn write_record(&self, job: &Job) -> CoreResult<()> {
        let path = self.layout.metadata_path(&job.code);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(job)
            .map_err(|err| CoreError::Internal(format!("serialize job record: {err}")))?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
