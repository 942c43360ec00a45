//! Detached training worker.
//!
//! Submission returns immediately; the actual run happens on a blocking
//! worker thread and communicates only through the job record. Any
//! error, at any phase, lands the job in `failed` with the message
//! preserved, so the record always explains what happened.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use veridex_core::dataset::{self, Example};
use veridex_core::error::{CoreError, CoreResult};
use veridex_core::job::{Job, JobStatus};
use veridex_engine::backend::FitParams;
use veridex_engine::device::DEFAULT_MODEL_MEMORY_MB;
use veridex_engine::{BaseModelResolver, ClassifierBackend, Device};
use veridex_store::JobStore;

/// Spawn the training run for an already-created job.
///
/// The returned handle is for tests; production callers detach it.
pub fn spawn_training(
    store: JobStore,
    backend: Arc<dyn ClassifierBackend>,
    resolver: Arc<dyn BaseModelResolver>,
    job: Job,
    examples: Vec<Example>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let code = job.code.clone();
        info!(code, base_model = %job.base_model, "Training started");
        if let Err(err) = run_training(&store, backend.as_ref(), resolver.as_ref(), job, examples) {
            error!(code, error = %err, "Training failed");
            record_failure(&store, &code, &err);
        }
    })
}

fn run_training(
    store: &JobStore,
    backend: &dyn ClassifierBackend,
    resolver: &dyn BaseModelResolver,
    mut job: Job,
    examples: Vec<Example>,
) -> CoreResult<()> {
    let started = Instant::now();
    let code = job.code.clone();

    // Phase 1: split.
    let (train, val) = dataset::stratified_split(&examples, job.validation_split, dataset::SPLIT_SEED);
    info!(code, train = train.len(), val = val.len(), "Dataset split");

    // Phase 2: record split sizes so status polls show them mid-run.
    job.train_size = train.len();
    job.val_size = val.len();
    store.update(&job)?;

    // Phase 3: resolve the base model. A corrupt cached copy gets one
    // fresh fetch; an unavailable base model does not sink the job, the
    // run just starts from freshly initialized weights.
    let base_dir = match resolver.resolve(&job.base_model) {
        Ok(dir) => Some(dir),
        Err(first_err) => match resolver.resolve_fresh(&job.base_model) {
            Ok(dir) => Some(dir),
            Err(err) => {
                warn!(
                    code,
                    base_model = %job.base_model,
                    first_error = %first_err,
                    error = %err,
                    "Base model unavailable, training from fresh weights"
                );
                None
            }
        },
    };

    // Phase 4: create the model.
    let device = Device::for_build(DEFAULT_MODEL_MEMORY_MB);
    let mut model = backend.create(base_dir.as_deref(), device)?;

    // Phase 5: fit.
    let metrics = model.fit(&train, &val, &FitParams::from_job(&job))?;

    // Phase 6: persist the artifact.
    model.save(&store.layout().model_dir(&code))?;

    // Phase 7: finalize the record; the marker goes last, after the
    // model is durably on disk.
    job.status = JobStatus::Completed;
    job.accuracy = metrics.accuracy;
    job.training_time_secs = Some(started.elapsed().as_secs_f64());
    store.update(&job)?;
    store.mark_completed(&code)?;

    info!(
        code,
        accuracy = ?metrics.accuracy,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Training completed"
    );
    Ok(())
}

fn record_failure(store: &JobStore, code: &str, err: &CoreError) {
    let Some(mut job) = store.try_read(code) else {
        // The record itself is gone (or unreadable); nothing to update.
        return;
    };
    job.status = JobStatus::Failed;
    job.error = Some(err.to_string());
    if let Err(update_err) = store.update(&job) {
        error!(code, error = %update_err, "Could not record training failure");
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use veridex_core::job::TrainingConfig;
    use veridex_engine::resolver::{sanitize_id, LocalRegistryResolver};
    use veridex_engine::LinearBackend;
    use veridex_store::DataLayout;

    use super::*;

    fn setup(base_model: &str) -> (tempfile::TempDir, JobStore, Arc<LocalRegistryResolver>) {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path().join("data"));
        layout.ensure().unwrap();

        let registry = dir.path().join("registry");
        std::fs::create_dir_all(registry.join(sanitize_id(base_model))).unwrap();
        std::fs::write(
            registry.join(sanitize_id(base_model)).join("config.json"),
            b"{}",
        )
        .unwrap();

        let cache_dir = layout.base_models_dir();
        let resolver = Arc::new(LocalRegistryResolver::new(registry, cache_dir));
        (dir, JobStore::new(layout), resolver)
    }

    fn examples() -> Vec<Example> {
        let mut out = Vec::new();
        for i in 0..10 {
            out.push(Example {
                text: format!("an honest genuine statement number {i}"),
                label: 1,
            });
            out.push(Example {
                text: format!("a fake fraudulent statement number {i}"),
                label: 0,
            });
        }
        out
    }

    fn job(store: &JobStore, base_model: &str) -> Job {
        let config = TrainingConfig {
            base_model: base_model.to_string(),
            name: "trainer test".to_string(),
            notes: String::new(),
            epochs: 3,
            batch_size: 8,
            learning_rate: 2e-5,
            validation_split: 0.2,
        };
        let job = Job::new("abc123".to_string(), &config, Utc::now());
        store.create(&job).unwrap();
        job
    }

    #[tokio::test]
    async fn successful_run_completes_the_job() {
        let (_dir, store, resolver) = setup("bert-base-uncased");
        let job = job(&store, "bert-base-uncased");

        spawn_training(
            store.clone(),
            Arc::new(LinearBackend),
            resolver,
            job,
            examples(),
        )
        .await
        .unwrap();

        let done = store.read("abc123").unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.train_size, 16);
        assert_eq!(done.val_size, 4);
        assert!(done.accuracy.is_some());
        assert!(done.training_time_secs.is_some());
        assert!(store.is_completed("abc123"));
        assert!(store.layout().model_dir("abc123").join("model.json").is_file());
    }

    #[tokio::test]
    async fn missing_base_model_trains_from_fresh_weights() {
        let (_dir, store, resolver) = setup("bert-base-uncased");
        let job = job(&store, "bert-base-uncased");
        let mut orphan = job.clone();
        orphan.base_model = "no-such-model".to_string();
        store.update(&orphan).unwrap();

        spawn_training(
            store.clone(),
            Arc::new(LinearBackend),
            resolver,
            orphan,
            examples(),
        )
        .await
        .unwrap();

        let done = store.read("abc123").unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.error.is_none());
        assert!(store.is_completed("abc123"));
    }

    #[tokio::test]
    async fn empty_dataset_fails_the_job() {
        let (_dir, store, resolver) = setup("bert-base-uncased");
        let record = job(&store, "bert-base-uncased");

        spawn_training(
            store.clone(),
            Arc::new(LinearBackend),
            resolver,
            record,
            Vec::new(),
        )
        .await
        .unwrap();

        let failed = store.read("abc123").unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert!(failed.error.is_some());
        assert!(!store.is_completed("abc123"));
    }

    #[tokio::test]
    async fn zero_split_trains_without_accuracy() {
        let (_dir, store, resolver) = setup("bert-base-uncased");
        let mut record = job(&store, "bert-base-uncased");
        record.validation_split = 0.0;
        store.update(&record).unwrap();

        spawn_training(
            store.clone(),
            Arc::new(LinearBackend),
            resolver,
            record,
            examples(),
        )
        .await
        .unwrap();

        let done = store.read("abc123").unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.train_size, 20);
        assert_eq!(done.val_size, 0);
        assert!(done.accuracy.is_none());
    }
}
