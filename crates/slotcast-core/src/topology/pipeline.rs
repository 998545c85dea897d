//! Pipeline runner.
//!
//! Each configured pipeline is spawned as its own task. A global semaphore
//! caps how many run at once; with the default of one permit the pipelines
//! run one after another in configuration order.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use snafu::ResultExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::GlobalConfig;
use crate::error::{AddressParseSnafu, MetricsSnafu, PipelineSetupError};
use crate::signal::shutdown_signal;

/// Shared resources handed to every pipeline.
#[derive(Clone)]
pub struct RuntimeContext {
    /// Cancellation token for graceful shutdown.
    pub shutdown: CancellationToken,
}

impl RuntimeContext {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }
}

/// A self-contained unit of work the runner can execute.
pub trait Pipeline: Send + 'static {
    type Key: Clone + Display + Send + 'static;
    type Error: std::error::Error + Send + 'static;

    fn key(&self) -> &Self::Key;

    fn run(self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Counts of finished pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Pipelines that never started because shutdown came first.
    pub skipped: usize,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Orchestrates several pipeline executions with shared shutdown handling.
pub struct PipelineRunner<P: Pipeline> {
    pipelines: Vec<P>,
    shutdown: CancellationToken,
    permits: Arc<Semaphore>,
    typetag: &'static str,
}

impl<P: Pipeline> PipelineRunner<P> {
    pub fn new(
        pipelines: Vec<P>,
        shutdown: CancellationToken,
        total_concurrency: usize,
        typetag: &'static str,
    ) -> Self {
        Self {
            pipelines,
            shutdown,
            permits: Arc::new(Semaphore::new(total_concurrency.max(1))),
            typetag,
        }
    }

    /// Cancel the shared token when a shutdown signal arrives.
    pub fn spawn_shutdown_handler(&self) {
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.cancel();
        });
    }

    /// Run all pipelines to completion.
    pub async fn run(self) -> RunSummary {
        let mut handles: JoinSet<(P::Key, Option<Result<(), P::Error>>)> = JoinSet::new();
        let typetag = self.typetag;

        // Permits are acquired in spawn order so sequential runs keep config order.
        for pipeline in self.pipelines {
            let key = pipeline.key().clone();
            let permit = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => None,
                permit = self.permits.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                info!(target = %key, "Shutdown requested before {} start", typetag);
                handles.spawn(async move { (key, None) });
                continue;
            };

            info!(target = %key, "Starting {}", typetag);
            handles.spawn(async move {
                let result = pipeline.run().await;
                drop(permit);
                (key, Some(result))
            });
        }

        let mut summary = RunSummary::default();
        while let Some(result) = handles.join_next().await {
            match result {
                Ok((key, Some(Ok(())))) => {
                    summary.succeeded += 1;
                    info!(target = %key, "{} completed", typetag);
                }
                Ok((key, Some(Err(e)))) => {
                    summary.failed += 1;
                    error!(target = %key, error = %e, "{} failed", typetag);
                }
                Ok((_, None)) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(error = %e, "{} task panicked", typetag);
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "All {}s finished", typetag
        );
        summary
    }
}

/// Initialize metrics, install the shutdown handler, and run the pipelines
/// produced by `create_pipelines`.
pub async fn run_pipelines<P, F>(
    metrics_address: &str,
    global: &GlobalConfig,
    typetag: &'static str,
    create_pipelines: F,
) -> Result<RunSummary, PipelineSetupError>
where
    P: Pipeline,
    F: FnOnce(RuntimeContext) -> Vec<P>,
{
    let addr = metrics_address.parse().context(AddressParseSnafu)?;
    crate::metrics::init_global(addr).context(MetricsSnafu)?;

    let shutdown = CancellationToken::new();
    let pipelines = create_pipelines(RuntimeContext::new(shutdown.clone()));

    let runner = PipelineRunner::new(pipelines, shutdown, global.total_concurrency, typetag);
    runner.spawn_shutdown_handler();
    Ok(runner.run().await)
}
