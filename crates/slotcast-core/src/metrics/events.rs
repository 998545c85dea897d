//! Internal events for metrics emission.
//!
//! Every event carries a `pipeline` label so daily and hourly runs can be
//! told apart on the same endpoint.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    fn emit(self);
}

// ============================================================================
// Remote job lifecycle
// ============================================================================

/// A remote job was accepted by the forecasting service.
pub struct JobSubmitted {
    pub kind: &'static str,
    pub pipeline: String,
}

impl InternalEvent for JobSubmitted {
    fn emit(self) {
        trace!(kind = self.kind, pipeline = %self.pipeline, "Job submitted");
        counter!(
            "slotcast_jobs_submitted_total",
            "kind" => self.kind,
            "pipeline" => self.pipeline
        )
        .increment(1);
    }
}

/// One status probe of a remote job.
pub struct JobPolled {
    pub status: &'static str,
    pub pipeline: String,
}

impl InternalEvent for JobPolled {
    fn emit(self) {
        trace!(status = self.status, pipeline = %self.pipeline, "Job polled");
        counter!(
            "slotcast_job_polls_total",
            "status" => self.status,
            "pipeline" => self.pipeline
        )
        .increment(1);
    }
}

/// How a wait on a remote job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed => "failed",
            JobOutcome::TimedOut => "timed_out",
            JobOutcome::Cancelled => "cancelled",
        }
    }
}

/// A wait on a remote job finished.
pub struct JobCompleted {
    pub kind: &'static str,
    pub outcome: JobOutcome,
    pub duration: Duration,
    pub pipeline: String,
}

impl InternalEvent for JobCompleted {
    fn emit(self) {
        trace!(
            kind = self.kind,
            outcome = self.outcome.as_str(),
            duration_ms = self.duration.as_millis(),
            pipeline = %self.pipeline,
            "Job completed"
        );
        counter!(
            "slotcast_jobs_completed_total",
            "kind" => self.kind,
            "outcome" => self.outcome.as_str(),
            "pipeline" => self.pipeline.clone()
        )
        .increment(1);
        histogram!(
            "slotcast_job_duration_seconds",
            "kind" => self.kind,
            "pipeline" => self.pipeline
        )
        .record(self.duration.as_secs_f64());
    }
}

// ============================================================================
// Pipeline runs
// ============================================================================

/// A pipeline run reached a terminal state.
pub struct RunCompleted {
    pub success: bool,
    pub duration: Duration,
    pub pipeline: String,
}

impl InternalEvent for RunCompleted {
    fn emit(self) {
        let status = if self.success { "materialized" } else { "aborted" };
        trace!(status, pipeline = %self.pipeline, "Run completed");
        counter!(
            "slotcast_runs_total",
            "status" => status,
            "pipeline" => self.pipeline.clone()
        )
        .increment(1);
        histogram!("slotcast_run_duration_seconds", "pipeline" => self.pipeline)
            .record(self.duration.as_secs_f64());
    }
}

/// Bytes uploaded as reshaped forecast input.
pub struct InputBytesUploaded {
    pub bytes: u64,
    pub pipeline: String,
}

impl InternalEvent for InputBytesUploaded {
    fn emit(self) {
        trace!(bytes = self.bytes, pipeline = %self.pipeline, "Input bytes uploaded");
        counter!("slotcast_input_bytes_uploaded_total", "pipeline" => self.pipeline)
            .increment(self.bytes);
    }
}

/// Rows written to a materialized export artifact.
pub struct ExportRowsMaterialized {
    pub rows: u64,
    pub pipeline: String,
}

impl InternalEvent for ExportRowsMaterialized {
    fn emit(self) {
        trace!(rows = self.rows, pipeline = %self.pipeline, "Export rows materialized");
        counter!("slotcast_export_rows_total", "pipeline" => self.pipeline).increment(self.rows);
    }
}

// ============================================================================
// Storage operation events
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
    List,
}

impl StorageOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::List => "list",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }

    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }
}

/// A storage request finished.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
    pub duration: Duration,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request"
        );
        counter!(
            "slotcast_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
        histogram!(
            "slotcast_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}
