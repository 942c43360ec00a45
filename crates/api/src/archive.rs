//! Zip archive builder for trained models.
//!
//! Builds `<code>_model.zip` next to the jobs directory from the job's
//! on-disk contents. The build is blocking (run it under
//! `spawn_blocking`), reports progress through a callback, and writes
//! to a temp file that is renamed into place only on success, so a
//! crash never leaves a half-written archive behind.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use veridex_core::error::{CoreError, CoreResult};
use veridex_core::progress::archive_progress;
use veridex_store::layout::COMPLETION_MARKER;
use veridex_store::DataLayout;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Build the export archive for a completed job.
///
/// Any pre-existing archive at the target path is replaced by the
/// rename, so every download serves a freshly built zip and the
/// archive's expiry clock restarts.
///
/// `report` receives progress percentages in the builder band while
/// compression runs. Returns the path of the finished archive.
pub fn build_archive(
    layout: &DataLayout,
    code: &str,
    report: &dyn Fn(u8),
) -> CoreResult<PathBuf> {
    let archive_path = layout.archive_path(code);
    let job_dir = layout.job_dir(code);
    if !layout.marker_path(code).is_file() {
        return Err(CoreError::Validation(format!(
            "Job {code} has no completed model to export"
        )));
    }

    let files = collect_files(&job_dir)?;
    let total_bytes: u64 = files.iter().map(|(_, size)| size).sum();
    report(archive_progress(0, total_bytes));

    let tmp_path = archive_path.with_extension("zip.tmp");
    let result = write_zip(&job_dir, &files, total_bytes, &tmp_path, report);
    if let Err(err) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }
    std::fs::rename(&tmp_path, &archive_path)?;

    info!(code, total_bytes, path = %archive_path.display(), "Archive built");
    Ok(archive_path)
}

/// Files to archive, as `(relative path, size)`, skipping the
/// completion marker and any leftover temp files.
fn collect_files(job_dir: &Path) -> CoreResult<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    walk(job_dir, job_dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, u64)>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(root, &path, files)?;
            continue;
        }
        let name = entry.file_name();
        if name == COMPLETION_MARKER {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "tmp") {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .map_err(|_| CoreError::Internal("file escaped the job directory".to_string()))?
            .to_path_buf();
        files.push((relative, entry.metadata()?.len()));
    }
    Ok(())
}

fn write_zip(
    job_dir: &Path,
    files: &[(PathBuf, u64)],
    total_bytes: u64,
    out_path: &Path,
    report: &dyn Fn(u8),
) -> CoreResult<()> {
    let out = File::create(out_path)?;
    let mut writer = zip::ZipWriter::new(out);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut processed: u64 = 0;
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    for (relative, _) in files {
        let entry_name = relative
            .to_str()
            .ok_or_else(|| CoreError::Internal("non-utf8 file name in job directory".to_string()))?
            .replace('\\', "/");
        writer
            .start_file(entry_name, options)
            .map_err(zip_error)?;

        let mut source = File::open(job_dir.join(relative))?;
        loop {
            let n = source.read(&mut buf)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n])?;
            processed += n as u64;
            report(archive_progress(processed, total_bytes));
        }
    }

    writer.finish().map_err(zip_error)?;
    Ok(())
}

fn zip_error(err: zip::result::ZipError) -> CoreError {
    match err {
        zip::result::ZipError::Io(io_err) => CoreError::Io(io_err),
        other => CoreError::Internal(format!("zip error: {other}")),
    }
}

/// Remove a job's archive, if present. Returns whether one existed.
pub fn remove_archive(layout: &DataLayout, code: &str) -> io::Result<bool> {
    match std::fs::remove_file(layout.archive_path(code)) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}
