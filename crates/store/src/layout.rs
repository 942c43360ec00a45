//! Filesystem layout of the data directory.
//!
//! ```text
//! <root>/
//!   jobs/<code>/metadata.json      job record
//!   jobs/<code>/.completed         completion marker (success only)
//!   jobs/<code>/model/             trained artifact
//!   <code>_model.zip               export archive (sibling of jobs/)
//!   base_models/<id>/              resolver cache for base models
//!   models/<key>/                  pretrained models served directly
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// File name of the serialized job record inside a job directory.
pub const METADATA_FILE: &str = "metadata.json";
/// Completion marker, written only after the model is durably saved.
pub const COMPLETION_MARKER: &str = ".completed";
/// Subdirectory holding the fine-tuned model artifact.
pub const MODEL_SUBDIR: &str = "model";
/// Suffix of export archives.
pub const ARCHIVE_SUFFIX: &str = "_model.zip";

/// Resolves every path the service touches from one data root.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directories the service expects at startup.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.jobs_dir())?;
        std::fs::create_dir_all(self.base_models_dir())?;
        std::fs::create_dir_all(self.pretrained_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn base_models_dir(&self) -> PathBuf {
        self.root.join("base_models")
    }

    pub fn pretrained_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn job_dir(&self, code: &str) -> PathBuf {
        self.jobs_dir().join(code)
    }

    pub fn metadata_path(&self, code: &str) -> PathBuf {
        self.job_dir(code).join(METADATA_FILE)
    }

    pub fn marker_path(&self, code: &str) -> PathBuf {
        self.job_dir(code).join(COMPLETION_MARKER)
    }

    pub fn model_dir(&self, code: &str) -> PathBuf {
        self.job_dir(code).join(MODEL_SUBDIR)
    }

    /// Archives deliberately live outside the job directory so the two
    /// retention clocks stay independent.
    pub fn archive_path(&self, code: &str) -> PathBuf {
        self.root.join(format!("{code}{ARCHIVE_SUFFIX}"))
    }
}
