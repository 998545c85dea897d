//! Remote job model and waiting.
//!
//! A [`JobHandle`] is produced by every submit call. [`JobWaiter`] blocks the
//! calling flow until the job behind a handle is terminal, using the bounded
//! polling loop from slotcast-core.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use slotcast_core::emit;
use slotcast_core::metrics::events::{JobCompleted, JobOutcome};
use slotcast_core::{JobStatus, PollOutcome, PollPolicy, StatusProbe, poll_until_terminal};

use crate::error::{PipelineError, ServiceError};
use crate::service::{ForecastService, ForecastServiceRef};

/// Kind of asynchronous job the forecasting service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    DatasetImport,
    PredictorTraining,
    ForecastGeneration,
    ForecastExport,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DatasetImport => "dataset_import",
            JobKind::PredictorTraining => "predictor_training",
            JobKind::ForecastGeneration => "forecast_generation",
            JobKind::ForecastExport => "forecast_export",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted job. Two handles are equal when they carry the same identifier.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub kind: JobKind,
    pub arn: String,
    pub name: String,
    pub submitted_at: DateTime<Utc>,
}

impl JobHandle {
    pub fn new(kind: JobKind, arn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            arn: arn.into(),
            name: name.into(),
            submitted_at: Utc::now(),
        }
    }
}

impl PartialEq for JobHandle {
    fn eq(&self, other: &Self) -> bool {
        self.arn == other.arn
    }
}

impl Eq for JobHandle {}

impl Hash for JobHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arn.hash(state);
    }
}

/// Unique token of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// A fresh random run id (UUID v4, simple form).
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run-scoped names of every remote resource one run creates.
#[derive(Debug, Clone)]
pub struct RunNames {
    variant: String,
    run: RunId,
}

impl RunNames {
    pub fn new(variant: impl Into<String>, run: RunId) -> Self {
        Self {
            variant: variant.into(),
            run,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run
    }

    fn scoped(&self, prefix: &str) -> String {
        format!("{prefix}_{}_{}", self.variant, self.run)
    }

    pub fn dataset(&self) -> String {
        self.scoped("data_set")
    }

    pub fn dataset_group(&self) -> String {
        self.scoped("data_set_group")
    }

    pub fn import_job(&self) -> String {
        self.scoped("import_job")
    }

    pub fn predictor(&self) -> String {
        self.scoped("predictor")
    }

    pub fn forecast(&self) -> String {
        self.scoped("forecast")
    }

    pub fn forecast_export(&self) -> String {
        self.scoped("forecast_export")
    }
}

/// Reads job status through the matching describe call.
struct ServiceProbe<'a> {
    service: &'a dyn ForecastService,
    handle: &'a JobHandle,
    // Raw status of the latest describe call, as the service console shows it.
    last_seen: Mutex<String>,
}

impl<'a> ServiceProbe<'a> {
    fn new(service: &'a dyn ForecastService, handle: &'a JobHandle) -> Self {
        Self {
            service,
            handle,
            last_seen: Mutex::new(String::new()),
        }
    }

    fn last_seen(&self) -> String {
        self.last_seen
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StatusProbe for ServiceProbe<'_> {
    type Error = ServiceError;

    async fn probe(&self) -> Result<JobStatus, ServiceError> {
        let raw = self
            .service
            .describe_job(self.handle.kind, &self.handle.arn)
            .await?;
        let status = JobStatus::from_service_status(&raw);
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = raw;
        }
        Ok(status)
    }
}

/// Blocks until a submitted job is terminal.
#[derive(Clone)]
pub struct JobWaiter {
    service: ForecastServiceRef,
    shutdown: CancellationToken,
    target: String,
}

impl JobWaiter {
    /// `target` names the pipeline in logs and metrics.
    pub fn new(
        service: ForecastServiceRef,
        shutdown: CancellationToken,
        target: impl Into<String>,
    ) -> Self {
        Self {
            service,
            shutdown,
            target: target.into(),
        }
    }

    /// Wait until `handle` reports success.
    ///
    /// Failure, an exhausted budget and shutdown each end the wait with an error.
    pub async fn wait(&self, handle: &JobHandle, policy: &PollPolicy) -> Result<(), PipelineError> {
        info!(
            target = %self.target,
            kind = %handle.kind,
            arn = %handle.arn,
            interval_secs = policy.interval.as_secs(),
            "Waiting for job"
        );

        let probe = ServiceProbe::new(self.service.as_ref(), handle);
        let start = Instant::now();
        let outcome = poll_until_terminal(&probe, policy, &self.shutdown, &self.target).await;

        let (job_outcome, result) = match outcome {
            Ok(PollOutcome::Succeeded { attempts, elapsed }) => {
                info!(
                    target = %self.target,
                    kind = %handle.kind,
                    arn = %handle.arn,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Job active"
                );
                (JobOutcome::Succeeded, Ok(()))
            }
            Ok(PollOutcome::Failed { .. }) => {
                let service_status = probe.last_seen();
                error!(
                    target = %self.target,
                    kind = %handle.kind,
                    arn = %handle.arn,
                    status = %service_status,
                    "Job failed"
                );
                (
                    JobOutcome::Failed,
                    Err(PipelineError::JobFailed {
                        kind: handle.kind,
                        arn: handle.arn.clone(),
                        service_status,
                    }),
                )
            }
            Ok(PollOutcome::TimedOut {
                last,
                attempts,
                elapsed,
            }) => {
                warn!(
                    target = %self.target,
                    kind = %handle.kind,
                    arn = %handle.arn,
                    attempts,
                    "Gave up waiting for job"
                );
                (
                    JobOutcome::TimedOut,
                    Err(PipelineError::JobTimedOut {
                        kind: handle.kind,
                        arn: handle.arn.clone(),
                        elapsed,
                        attempts,
                        last,
                    }),
                )
            }
            Ok(PollOutcome::Cancelled { .. }) => (
                JobOutcome::Cancelled,
                Err(PipelineError::Cancelled {
                    kind: handle.kind,
                    arn: handle.arn.clone(),
                }),
            ),
            Err(source) => (
                JobOutcome::Failed,
                Err(PipelineError::Service {
                    kind: handle.kind,
                    source,
                }),
            ),
        };

        emit!(JobCompleted {
            kind: handle.kind.as_str(),
            outcome: job_outcome,
            duration: start.elapsed(),
            pipeline: self.target.clone(),
        });
        result
    }
}

/// Build the poll policy for a job kind from its interval and the run budgets.
pub fn policy_for(
    interval: Duration,
    max_wait: Option<Duration>,
    max_attempts: Option<u32>,
) -> PollPolicy {
    let mut policy = PollPolicy::every(interval);
    if let Some(max_wait) = max_wait {
        policy = policy.with_max_wait(max_wait);
    }
    if let Some(max_attempts) = max_attempts {
        policy = policy.with_max_attempts(max_attempts);
    }
    policy
}
