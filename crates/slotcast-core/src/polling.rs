//! Bounded polling of asynchronous remote jobs.
//!
//! A remote job is observed through a [`StatusProbe`]. [`poll_until_terminal`]
//! probes once, suspends for the policy interval, and repeats until the job
//! reaches a terminal status, the wait budget is spent, or shutdown is requested.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::emit;
use crate::metrics::events::JobPolled;

/// Status of a remote job as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Map a managed-service status string.
    ///
    /// `ACTIVE` is success; `*_FAILED` and `CREATE_STOPPED` are failures;
    /// `*_PENDING` and an empty status mean the job has not started yet.
    pub fn from_service_status(status: &str) -> Self {
        match status {
            "ACTIVE" => JobStatus::Succeeded,
            "CREATE_STOPPED" => JobStatus::Failed,
            s if s.ends_with("_FAILED") => JobStatus::Failed,
            "" => JobStatus::Pending,
            s if s.ends_with("_PENDING") => JobStatus::Pending,
            _ => JobStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often to probe and how long to keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Option<Duration>,
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// Probe every `interval` with no budget.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: None,
            max_attempts: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.max_wait.is_some_and(|max| elapsed >= max)
    }

    /// Time to sleep before the next probe. Never sleeps past the deadline,
    /// so the last probe happens when the budget runs out.
    fn next_delay(&self, elapsed: Duration) -> Duration {
        match self.max_wait {
            Some(max) => self.interval.min(max.saturating_sub(elapsed)),
            None => self.interval,
        }
    }
}

/// Reads the current status of one remote job.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    type Error: std::error::Error + Send;

    async fn probe(&self) -> Result<JobStatus, Self::Error>;
}

/// How a call to [`poll_until_terminal`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded { attempts: u32, elapsed: Duration },
    Failed { attempts: u32, elapsed: Duration },
    /// The budget ran out; `last` is the last status observed.
    TimedOut {
        last: JobStatus,
        attempts: u32,
        elapsed: Duration,
    },
    Cancelled { attempts: u32, elapsed: Duration },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            PollOutcome::Succeeded { attempts, .. }
            | PollOutcome::Failed { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. }
            | PollOutcome::Cancelled { attempts, .. } => attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match *self {
            PollOutcome::Succeeded { elapsed, .. }
            | PollOutcome::Failed { elapsed, .. }
            | PollOutcome::TimedOut { elapsed, .. }
            | PollOutcome::Cancelled { elapsed, .. } => elapsed,
        }
    }
}

/// Poll `probe` until the job is terminal, the policy budget is spent, or
/// `shutdown` is cancelled.
///
/// Exactly one probe call is made per iteration and no call is made after a
/// terminal status is observed. Probe errors are returned as-is; they are not
/// retried here.
///
/// `target` names the pipeline in log messages and metrics.
pub async fn poll_until_terminal<P>(
    probe: &P,
    policy: &PollPolicy,
    shutdown: &CancellationToken,
    target: &str,
) -> Result<PollOutcome, P::Error>
where
    P: StatusProbe + ?Sized,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        let status = tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!(target = target, "Shutdown requested while probing job status");
                return Ok(PollOutcome::Cancelled { attempts, elapsed: start.elapsed() });
            }

            result = probe.probe() => result?,
        };
        attempts += 1;
        emit!(JobPolled {
            status: status.as_str(),
            pipeline: target.to_string(),
        });

        let elapsed = start.elapsed();
        match status {
            JobStatus::Succeeded => return Ok(PollOutcome::Succeeded { attempts, elapsed }),
            JobStatus::Failed => return Ok(PollOutcome::Failed { attempts, elapsed }),
            JobStatus::Pending | JobStatus::InProgress => {}
        }

        if policy.exhausted(attempts, elapsed) {
            return Ok(PollOutcome::TimedOut {
                last: status,
                attempts,
                elapsed,
            });
        }

        let delay = policy.next_delay(elapsed);
        debug!(
            target = target,
            %status,
            attempts,
            "Job not finished, waiting {}s before next poll",
            delay.as_secs()
        );

        if shutdown
            .run_until_cancelled(tokio::time::sleep(delay))
            .await
            .is_none()
        {
            info!(target = target, "Shutdown requested during poll wait");
            return Ok(PollOutcome::Cancelled {
                attempts,
                elapsed: start.elapsed(),
            });
        }
    }
}
