//! Pipeline orchestration.
//!
//! A run reshapes the raw input, uploads every metric partition, then chains
//! dataset import, predictor training, forecast generation and export. Each
//! stage consumes identifiers produced by the one before it, so stage N is
//! never submitted before stage N-1 is active. Once shutdown is requested no
//! further upload or remote resource is started.

pub mod export;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures::future::try_join_all;
use object_store::path::Path;
use snafu::{OptionExt, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use slotcast_core::emit;
use slotcast_core::metrics::events::{ExportRowsMaterialized, InputBytesUploaded, RunCompleted};
use slotcast_core::{Pipeline, RuntimeContext, StorageProvider, StorageProviderRef};

use crate::config::{ComponentKey, Config, PipelineConfig, StorageConfig};
use crate::error::{
    InterruptedSnafu, PipelineError, ReadInputSnafu, ReshapeSnafu, StorageSnafu,
};
use crate::job::{JobKind, RunId, RunNames};
use crate::metric::Metric;
use crate::reshape::reshape;
use crate::service::ForecastServiceRef;
use crate::stage::{Completion, StageRunner, StageSettings};

/// Identifiers produced by the stages of one run. Each is written once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineContext {
    dataset_arn: Option<String>,
    dataset_group_arn: Option<String>,
    predictor_arn: Option<String>,
    forecast_arn: Option<String>,
    export_job_arn: Option<String>,
}

fn write_once(
    slot: &mut Option<String>,
    field: &'static str,
    value: String,
) -> Result<(), PipelineError> {
    if slot.is_some() {
        return Err(PipelineError::ContextAlreadySet { field });
    }
    *slot = Some(value);
    Ok(())
}

fn read<'a>(slot: &'a Option<String>, field: &'static str) -> Result<&'a str, PipelineError> {
    slot.as_deref()
        .ok_or(PipelineError::ContextMissing { field })
}

impl PipelineContext {
    pub fn dataset_arn(&self) -> Option<&str> {
        self.dataset_arn.as_deref()
    }

    pub fn dataset_group_arn(&self) -> Option<&str> {
        self.dataset_group_arn.as_deref()
    }

    pub fn predictor_arn(&self) -> Option<&str> {
        self.predictor_arn.as_deref()
    }

    pub fn forecast_arn(&self) -> Option<&str> {
        self.forecast_arn.as_deref()
    }

    pub fn export_job_arn(&self) -> Option<&str> {
        self.export_job_arn.as_deref()
    }

    pub fn set_dataset_arn(&mut self, arn: String) -> Result<(), PipelineError> {
        write_once(&mut self.dataset_arn, "dataset_arn", arn)
    }

    pub fn set_dataset_group_arn(&mut self, arn: String) -> Result<(), PipelineError> {
        write_once(&mut self.dataset_group_arn, "dataset_group_arn", arn)
    }

    pub fn set_predictor_arn(&mut self, arn: String) -> Result<(), PipelineError> {
        write_once(&mut self.predictor_arn, "predictor_arn", arn)
    }

    pub fn set_forecast_arn(&mut self, arn: String) -> Result<(), PipelineError> {
        write_once(&mut self.forecast_arn, "forecast_arn", arn)
    }

    pub fn set_export_job_arn(&mut self, arn: String) -> Result<(), PipelineError> {
        write_once(&mut self.export_job_arn, "export_job_arn", arn)
    }
}

/// Part of a run that was executing when it aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Reading, reshaping and uploading the input.
    Prepare,
    Job(JobKind),
    /// Writing the local export file.
    Materialize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Prepare => f.write_str("prepare"),
            Stage::Job(kind) => write!(f, "{kind}"),
            Stage::Materialize => f.write_str("materialize"),
        }
    }
}

/// Progress of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    DatasetImportSubmitted,
    DatasetImportActive,
    PredictorSubmitted,
    PredictorActive,
    ForecastSubmitted,
    ForecastActive,
    ExportSubmitted,
    ExportActive,
    ExportMaterialized,
    Aborted { stage: Stage },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::ExportMaterialized | PipelineState::Aborted { .. }
        )
    }
}

/// Drives one run of one pipeline through every stage.
pub struct PipelineOrchestrator {
    key: ComponentKey,
    config: PipelineConfig,
    storage: StorageProviderRef,
    stages: StageRunner,
    shutdown: CancellationToken,
    context: PipelineContext,
    state: PipelineState,
    // Stage in progress; reported when the run aborts.
    current: Stage,
}

impl PipelineOrchestrator {
    pub fn new(
        key: ComponentKey,
        config: PipelineConfig,
        settings: StageSettings,
        storage: StorageProviderRef,
        service: ForecastServiceRef,
        shutdown: CancellationToken,
        run: RunId,
    ) -> Self {
        let names = RunNames::new(config.granularity.as_str(), run);
        let stages = StageRunner::new(service, shutdown.clone(), names, settings, key.id());
        Self {
            key,
            config,
            storage,
            stages,
            shutdown,
            context: PipelineContext::default(),
            state: PipelineState::Start,
            current: Stage::Prepare,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run_id(&self) -> &RunId {
        self.stages.names().run_id()
    }

    /// Object key of one uploaded metric partition.
    pub fn input_key(&self, metric: Metric) -> Path {
        Path::from(format!(
            "input/{}/{}/{}.csv",
            self.run_id(),
            self.config.granularity.input_dir(),
            metric
        ))
    }

    /// Prefix the export job writes under.
    pub fn export_prefix(&self) -> String {
        format!("exports/{}", self.run_id())
    }

    /// Local path of the materialized export.
    pub fn output_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(format!("export_{}.csv", self.run_id()))
    }

    /// Run every stage. Returns the path of the materialized export.
    ///
    /// Any failure moves the run to [`PipelineState::Aborted`]; remote resources
    /// created so far are not deleted and stay recorded in the context.
    pub async fn run(&mut self) -> Result<PathBuf, PipelineError> {
        let start = Instant::now();
        info!(target = %self.key, run = %self.run_id(), "Starting run");

        let result = self.execute().await;
        if let Err(e) = &result {
            let stage = self.current;
            self.state = PipelineState::Aborted { stage };
            error!(target = %self.key, run = %self.run_id(), stage = %stage, error = %e, "Run aborted");
        }

        emit!(RunCompleted {
            success: result.is_ok(),
            duration: start.elapsed(),
            pipeline: self.key.to_string(),
        });
        result
    }

    fn advance(&mut self, state: PipelineState) {
        info!(target = %self.key, from = ?self.state, to = ?state, "Run state changed");
        self.state = state;
    }

    async fn execute(&mut self) -> Result<PathBuf, PipelineError> {
        let source = self.prepare().await?;
        self.current = Stage::Job(JobKind::DatasetImport);

        let import_policy = self.config.polling.import_policy();
        let job_policy = self.config.polling.job_policy();

        let import = self
            .stages
            .submit_dataset_import(&source, &mut self.context)
            .await?;
        self.advance(PipelineState::DatasetImportSubmitted);
        self.stages
            .complete(&import.import_job, &import_policy, Completion::Wait)
            .await?;
        self.advance(PipelineState::DatasetImportActive);

        self.current = Stage::Job(JobKind::PredictorTraining);

        let predictor = self
            .stages
            .submit_predictor(read(&self.context.dataset_group_arn, "dataset_group_arn")?)
            .await?;
        self.context.set_predictor_arn(predictor.arn.clone())?;
        self.advance(PipelineState::PredictorSubmitted);
        self.stages
            .complete(&predictor, &job_policy, Completion::Wait)
            .await?;
        self.advance(PipelineState::PredictorActive);

        self.current = Stage::Job(JobKind::ForecastGeneration);

        let forecast = self
            .stages
            .submit_forecast(read(&self.context.predictor_arn, "predictor_arn")?)
            .await?;
        self.context.set_forecast_arn(forecast.arn.clone())?;
        self.advance(PipelineState::ForecastSubmitted);
        self.stages
            .complete(&forecast, &job_policy, Completion::Wait)
            .await?;
        self.advance(PipelineState::ForecastActive);

        self.current = Stage::Job(JobKind::ForecastExport);

        let prefix = self.export_prefix();
        let destination = self.storage.url_for(&Path::from(prefix.as_str()));
        let export_job = self
            .stages
            .submit_export(read(&self.context.forecast_arn, "forecast_arn")?, &destination)
            .await?;
        self.context.set_export_job_arn(export_job.arn.clone())?;
        self.advance(PipelineState::ExportSubmitted);
        self.stages
            .complete(&export_job, &job_policy, Completion::Wait)
            .await?;
        self.advance(PipelineState::ExportActive);

        self.current = Stage::Materialize;

        let output = self.output_path();
        let rows = export::materialize(
            &self.storage,
            &prefix,
            &export_job.name,
            &self.config.export.header,
            &output,
        )
        .await?;
        emit!(ExportRowsMaterialized {
            rows: rows as u64,
            pipeline: self.key.to_string(),
        });
        self.advance(PipelineState::ExportMaterialized);

        info!(target = %self.key, output = %output.display(), rows, "Run complete");
        Ok(output)
    }

    /// Reshape the input, upload every metric partition, and return the URL
    /// of the partition that is forecast.
    async fn prepare(&self) -> Result<String, PipelineError> {
        if self.shutdown.is_cancelled() {
            return InterruptedSnafu {
                stage: Stage::Prepare,
            }
            .fail();
        }

        let path = &self.config.input_path;
        let raw = tokio::fs::read_to_string(path)
            .await
            .context(ReadInputSnafu { path })?;
        let partitions =
            reshape(&raw, self.config.granularity).context(ReshapeSnafu { path })?;
        info!(
            target = %self.key,
            input = %path.display(),
            rows = partitions.rows(),
            "Reshaped input"
        );

        let storage = &self.storage;
        let uploads = partitions.iter().map(|(metric, contents)| {
            let key = self.input_key(metric);
            let bytes = Bytes::from(contents.to_string());
            async move {
                let size = bytes.len();
                storage.put(&key, bytes).await.map(|()| size)
            }
        });
        let sizes = self
            .shutdown
            .run_until_cancelled(try_join_all(uploads))
            .await
            .context(InterruptedSnafu {
                stage: Stage::Prepare,
            })?
            .context(StorageSnafu)?;
        emit!(InputBytesUploaded {
            bytes: sizes.iter().map(|size| *size as u64).sum(),
            pipeline: self.key.to_string(),
        });

        Ok(self.storage.url_for(&self.input_key(self.config.metric)))
    }
}

/// One configured pipeline, runnable by the core pipeline runner.
pub struct SlotcastPipeline {
    key: ComponentKey,
    config: PipelineConfig,
    storage: StorageConfig,
    settings: StageSettings,
    service: ForecastServiceRef,
    shutdown: CancellationToken,
}

impl SlotcastPipeline {
    /// Create one pipeline per configured entry.
    pub fn from_config(
        config: &Config,
        service: ForecastServiceRef,
        context: RuntimeContext,
    ) -> Vec<Self> {
        config
            .pipelines()
            .map(|(key, pipeline)| Self {
                key: key.clone(),
                config: pipeline.clone(),
                storage: config.storage.clone(),
                settings: StageSettings::new(pipeline, &config.service),
                service: service.clone(),
                shutdown: context.shutdown.clone(),
            })
            .collect()
    }
}

impl Pipeline for SlotcastPipeline {
    type Key = ComponentKey;
    type Error = PipelineError;

    fn key(&self) -> &ComponentKey {
        &self.key
    }

    async fn run(self) -> Result<(), PipelineError> {
        let storage = StorageProvider::for_url_with_options(
            &self.storage.url,
            self.storage.storage_options.clone(),
        )
        .await
        .context(StorageSnafu)?;

        let mut orchestrator = PipelineOrchestrator::new(
            self.key,
            self.config,
            self.settings,
            Arc::new(storage),
            self.service,
            self.shutdown,
            RunId::new(),
        );
        orchestrator.run().await.map(|_| ())
    }
}
