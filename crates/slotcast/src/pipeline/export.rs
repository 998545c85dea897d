//! Materialization of a finished forecast export.
//!
//! The service writes an export as several partition files, each with its own
//! header line. They are concatenated in part order under a single header.

use std::path::Path as FsPath;
use std::sync::LazyLock;

use bytes::Bytes;
use object_store::path::Path;
use regex::Regex;
use snafu::{OptionExt, ResultExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use slotcast_core::StorageProvider;

use crate::error::{ExportEncodingSnafu, PipelineError, StorageSnafu, WriteExportSnafu};

static PART_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_part(\d+)").expect("valid regex"));

/// Export files under `prefix` that belong to `job_name`, in part order.
pub async fn list_export_files(
    storage: &StorageProvider,
    prefix: &str,
    job_name: &str,
) -> Result<Vec<Path>, PipelineError> {
    let mut files: Vec<(Option<u64>, String, Path)> = storage
        .list_with_prefix(prefix)
        .await
        .context(StorageSnafu)?
        .into_iter()
        .filter_map(|path| {
            let filename = path.filename()?;
            if !filename.ends_with(".csv") || !filename.starts_with(job_name) {
                return None;
            }
            let part = PART_INDEX
                .captures(filename)
                .and_then(|caps| caps[1].parse().ok());
            Some((part, path.to_string(), path))
        })
        .collect();

    // Listing order is backend-specific.
    files.sort_by(|(a_part, a_key, _), (b_part, b_key, _)| {
        a_part.cmp(b_part).then_with(|| a_key.cmp(b_key))
    });
    Ok(files.into_iter().map(|(_, _, path)| path).collect())
}

/// Append the data lines of one partition file (header stripped, blank lines dropped).
fn append_rows(out: &mut String, contents: &str) -> usize {
    let mut rows = 0;
    for line in contents.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        rows += 1;
    }
    rows
}

/// Concatenate every export file of `job_name` into `output`, which must not exist yet.
///
/// Returns the number of data rows written.
pub async fn materialize(
    storage: &StorageProvider,
    prefix: &str,
    job_name: &str,
    header: &str,
    output: &FsPath,
) -> Result<usize, PipelineError> {
    let files = list_export_files(storage, prefix, job_name).await?;
    debug!(prefix, files = files.len(), "Listed export files");

    let mut contents = String::new();
    contents.push_str(header.trim_end());
    contents.push('\n');

    let mut rows = 0;
    for path in &files {
        let bytes: Bytes = storage.get(path).await.context(StorageSnafu)?;
        let text = std::str::from_utf8(&bytes).ok().context(ExportEncodingSnafu {
            path: path.to_string(),
        })?;
        rows += append_rows(&mut contents, text);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .context(WriteExportSnafu { path: output })?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .await
        .context(WriteExportSnafu { path: output })?;
    file.write_all(contents.as_bytes())
        .await
        .context(WriteExportSnafu { path: output })?;
    file.flush()
        .await
        .context(WriteExportSnafu { path: output })?;

    info!(
        output = %output.display(),
        files = files.len(),
        rows,
        "Materialized export"
    );
    Ok(rows)
}
