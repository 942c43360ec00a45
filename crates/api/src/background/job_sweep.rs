//! Expired-job cleanup.
//!
//! Jobs are retained for seven days, then their directory and any
//! export archive are removed. The sweep runs at startup, every six
//! hours, and once a day at 02:00 UTC for a predictable low-traffic
//! pass.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio_util::sync::CancellationToken;
use veridex_store::JobStore;

use crate::archive;

/// How often the periodic sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// Hour (UTC) of the daily sweep.
const DAILY_SWEEP_HOUR: u32 = 2;

/// Run the expired-job sweep loop until `cancel` is triggered.
pub async fn run(store: JobStore, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        daily_hour_utc = DAILY_SWEEP_HOUR,
        "Job sweep started"
    );

    // Startup pass: a long-stopped server may be sitting on a backlog.
    sweep_and_log(&store, Utc::now());

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.tick().await; // the first tick fires immediately

    loop {
        let until_daily = duration_until_daily(Utc::now());
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job sweep stopping");
                break;
            }
            _ = interval.tick() => {
                sweep_and_log(&store, Utc::now());
            }
            _ = tokio::time::sleep(until_daily) => {
                tracing::info!("Daily job sweep");
                sweep_and_log(&store, Utc::now());
            }
        }
    }
}

fn sweep_and_log(store: &JobStore, now: DateTime<Utc>) {
    match sweep_jobs(store, now) {
        Ok(0) => tracing::debug!("Job sweep: nothing to remove"),
        Ok(removed) => tracing::info!(removed, "Job sweep: removed expired jobs"),
        Err(err) => tracing::error!(error = %err, "Job sweep failed"),
    }
}

/// Remove every job whose retention window has passed, together with
/// its archive. Returns the number of jobs removed.
pub fn sweep_jobs(store: &JobStore, now: DateTime<Utc>) -> std::io::Result<usize> {
    let codes = match store.list_codes() {
        Ok(codes) => codes,
        Err(err) => {
            tracing::error!(error = %err, "Job sweep could not list jobs");
            return Ok(0);
        }
    };

    let mut removed = 0;
    for code in codes {
        let Some(job) = store.try_read(&code) else {
            continue;
        };
        if !job.is_expired(now) {
            continue;
        }
        if let Err(err) = store.delete(&code) {
            tracing::error!(code, error = %err, "Could not remove expired job");
            continue;
        }
        if let Err(err) = archive::remove_archive(store.layout(), &code) {
            tracing::error!(code, error = %err, "Could not remove expired job's archive");
        }
        tracing::info!(code, "Removed expired job");
        removed += 1;
    }
    Ok(removed)
}

/// Time until the next `DAILY_SWEEP_HOUR:00:00` UTC.
fn duration_until_daily(now: DateTime<Utc>) -> Duration {
    let target_time = NaiveTime::from_hms_opt(DAILY_SWEEP_HOUR, 0, 0)
        .expect("valid daily sweep time");
    let today = now.date_naive().and_time(target_time).and_utc();
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}
