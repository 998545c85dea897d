//! Error types for the slotcast pipeline.

use std::path::PathBuf;
use std::time::Duration;

use snafu::prelude::*;

use crate::job::JobKind;
use crate::pipeline::Stage;
use slotcast_core::JobStatus;

// Re-export common errors
pub use slotcast_core::error::{ConfigError, StorageError};

/// Errors raised while reshaping a raw input file.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReshapeError {
    /// The input could not be read as delimited text.
    #[snafu(display("Malformed input on line {line}: {source}"))]
    Csv { line: u64, source: csv::Error },

    /// A row does not have one column per metric plus the key columns.
    #[snafu(display("Line {line} has {found} columns, expected {expected}"))]
    ColumnCount {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The hour column of an hourly row is not in 0..=23.
    #[snafu(display("Line {line} has invalid hour '{value}'"))]
    InvalidHour { line: u64, value: String },
}

/// Failures of the forecasting service binding itself.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ServiceError {
    /// The service rejected or failed the call.
    #[snafu(display("{operation} failed: {message}"))]
    Request {
        operation: &'static str,
        message: String,
    },

    /// The request could not be built from the given parameters.
    #[snafu(display("Invalid {operation} request: {message}"))]
    InvalidRequest {
        operation: &'static str,
        message: String,
    },
}

/// Errors that abort one pipeline run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// The service accepted the call but returned no identifier.
    #[snafu(display("Submitting {kind} '{name}' returned no identifier"))]
    SubmissionFailed { kind: JobKind, name: String },

    /// The remote job reached a failure status. `service_status` is the raw
    /// status reported by the service, for example `CREATE_STOPPED`.
    #[snafu(display("{kind} job {arn} failed with status {service_status}"))]
    JobFailed {
        kind: JobKind,
        arn: String,
        service_status: String,
    },

    /// The remote job did not finish within the poll budget.
    #[snafu(display(
        "{kind} job {arn} still {last} after {elapsed:?} ({attempts} status checks)"
    ))]
    JobTimedOut {
        kind: JobKind,
        arn: String,
        elapsed: Duration,
        attempts: u32,
        last: JobStatus,
    },

    /// Shutdown was requested while waiting on a remote job.
    #[snafu(display("Cancelled while waiting on {kind} job {arn}"))]
    Cancelled { kind: JobKind, arn: String },

    /// Shutdown was requested before a stage submitted any remote work.
    #[snafu(display("Shutdown requested before {stage}"))]
    Interrupted { stage: Stage },

    /// A service call failed.
    #[snafu(display("Service error during {kind}: {source}"))]
    Service { kind: JobKind, source: ServiceError },

    /// Object storage failure.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// The raw input file is malformed.
    #[snafu(display("Failed to reshape {}: {source}", path.display()))]
    Reshape { path: PathBuf, source: ReshapeError },

    /// Failed to read the raw input file.
    #[snafu(display("Failed to read input {}: {source}", path.display()))]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the export artifact.
    #[snafu(display("Failed to write export {}: {source}", path.display()))]
    WriteExport {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An exported partition is not valid UTF-8.
    #[snafu(display("Export file {path} is not valid UTF-8"))]
    ExportEncoding { path: String },

    /// A run context field was written twice.
    #[snafu(display("Run context field '{field}' is already set"))]
    ContextAlreadySet { field: &'static str },

    /// A stage read a run context field no earlier stage produced.
    #[snafu(display("Run context field '{field}' has not been set"))]
    ContextMissing { field: &'static str },
}
