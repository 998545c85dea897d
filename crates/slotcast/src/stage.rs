//! One pipeline stage: submit a remote job, then optionally wait for it.

use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use slotcast_core::PollPolicy;
use slotcast_core::emit;
use slotcast_core::metrics::events::JobSubmitted;

use crate::config::{PipelineConfig, PredictorConfig, ServiceConfig};
use crate::error::{
    InterruptedSnafu, PipelineError, ServiceError, ServiceSnafu, SubmissionFailedSnafu,
};
use crate::job::{JobHandle, JobKind, JobWaiter, RunNames};
use crate::pipeline::{PipelineContext, Stage};
use crate::service::{
    DATASET_TYPE, DOMAIN, DatasetGroupRequest, DatasetImportRequest, DatasetRequest,
    ExportRequest, FILE_FORMAT, ForecastRequest, ForecastServiceRef, IMPORT_MODE,
    PredictorRequest, metric_schema,
};

/// What to do after a job was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Block until the job is terminal.
    Wait,
    /// Return right after submission.
    Detached,
}

/// Resources created by the dataset import stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetImport {
    pub dataset_arn: String,
    pub dataset_group_arn: String,
    pub import_job: JobHandle,
}

/// Per-pipeline parameters of the submitted requests.
#[derive(Debug, Clone)]
pub struct StageSettings {
    pub data_frequency: String,
    pub timestamp_format: String,
    pub role_arn: String,
    pub predictor: PredictorConfig,
}

impl StageSettings {
    pub fn new(pipeline: &PipelineConfig, service: &ServiceConfig) -> Self {
        Self {
            data_frequency: pipeline.granularity.data_frequency().to_string(),
            timestamp_format: pipeline.granularity.timestamp_format().to_string(),
            role_arn: service.role_arn.clone(),
            predictor: pipeline.predictor.clone(),
        }
    }
}

/// Submits the jobs of one run with uniform naming and error handling.
pub struct StageRunner {
    service: ForecastServiceRef,
    shutdown: CancellationToken,
    waiter: JobWaiter,
    names: RunNames,
    settings: StageSettings,
    target: String,
}

impl StageRunner {
    pub fn new(
        service: ForecastServiceRef,
        shutdown: CancellationToken,
        names: RunNames,
        settings: StageSettings,
        target: impl Into<String>,
    ) -> Self {
        let target = target.into();
        Self {
            waiter: JobWaiter::new(service.clone(), shutdown.clone(), target.clone()),
            service,
            shutdown,
            names,
            settings,
            target,
        }
    }

    pub fn names(&self) -> &RunNames {
        &self.names
    }

    /// Refuse to create remote resources once shutdown was requested.
    fn ensure_running(&self, kind: JobKind) -> Result<(), PipelineError> {
        if self.shutdown.is_cancelled() {
            info!(target = %self.target, kind = %kind, "Shutdown requested, not submitting");
            return InterruptedSnafu {
                stage: Stage::Job(kind),
            }
            .fail();
        }
        Ok(())
    }

    /// Turn a create response into an identifier.
    fn accept(
        &self,
        kind: JobKind,
        name: String,
        response: Result<Option<String>, ServiceError>,
    ) -> Result<String, PipelineError> {
        match response.context(ServiceSnafu { kind })? {
            Some(arn) if !arn.is_empty() => {
                info!(target = %self.target, kind = %kind, name = %name, arn = %arn, "Created");
                Ok(arn)
            }
            _ => SubmissionFailedSnafu { kind, name }.fail(),
        }
    }

    fn submitted(&self, kind: JobKind, name: String, arn: String) -> JobHandle {
        emit!(JobSubmitted {
            kind: kind.as_str(),
            pipeline: self.target.clone(),
        });
        JobHandle::new(kind, arn, name)
    }

    /// Create the dataset and its group, then submit the import of `source_path`.
    ///
    /// Identifiers are recorded in `context` as soon as they exist, so a later
    /// failure still leaves them visible.
    pub async fn submit_dataset_import(
        &self,
        source_path: &str,
        context: &mut PipelineContext,
    ) -> Result<DatasetImport, PipelineError> {
        let kind = JobKind::DatasetImport;

        self.ensure_running(kind)?;
        let name = self.names.dataset();
        let response = self
            .service
            .create_dataset(DatasetRequest {
                name: name.clone(),
                domain: DOMAIN.to_string(),
                dataset_type: DATASET_TYPE.to_string(),
                data_frequency: self.settings.data_frequency.clone(),
                schema: metric_schema(),
            })
            .await;
        let dataset_arn = self.accept(kind, name, response)?;
        context.set_dataset_arn(dataset_arn.clone())?;

        self.ensure_running(kind)?;
        let name = self.names.dataset_group();
        let response = self
            .service
            .create_dataset_group(DatasetGroupRequest {
                name: name.clone(),
                domain: DOMAIN.to_string(),
                dataset_arns: vec![dataset_arn.clone()],
            })
            .await;
        let dataset_group_arn = self.accept(kind, name, response)?;
        context.set_dataset_group_arn(dataset_group_arn.clone())?;

        self.ensure_running(kind)?;
        let name = self.names.import_job();
        let response = self
            .service
            .create_dataset_import_job(DatasetImportRequest {
                name: name.clone(),
                dataset_arn: dataset_arn.clone(),
                source_path: source_path.to_string(),
                role_arn: self.settings.role_arn.clone(),
                timestamp_format: self.settings.timestamp_format.clone(),
                format: FILE_FORMAT.to_string(),
                import_mode: IMPORT_MODE.to_string(),
            })
            .await;
        let arn = self.accept(kind, name.clone(), response)?;

        Ok(DatasetImport {
            dataset_arn,
            dataset_group_arn,
            import_job: self.submitted(kind, name, arn),
        })
    }

    /// Submit auto predictor training on a dataset group.
    pub async fn submit_predictor(&self, dataset_group_arn: &str) -> Result<JobHandle, PipelineError> {
        let kind = JobKind::PredictorTraining;
        self.ensure_running(kind)?;
        let name = self.names.predictor();
        let predictor = &self.settings.predictor;
        let response = self
            .service
            .create_auto_predictor(PredictorRequest {
                name: name.clone(),
                dataset_group_arn: dataset_group_arn.to_string(),
                forecast_frequency: predictor.forecast_frequency.clone(),
                forecast_horizon: predictor.forecast_horizon,
                holiday_country: predictor.holiday_country.clone(),
            })
            .await;
        let arn = self.accept(kind, name.clone(), response)?;
        Ok(self.submitted(kind, name, arn))
    }

    /// Submit forecast generation from a trained predictor.
    pub async fn submit_forecast(&self, predictor_arn: &str) -> Result<JobHandle, PipelineError> {
        let kind = JobKind::ForecastGeneration;
        self.ensure_running(kind)?;
        let name = self.names.forecast();
        let response = self
            .service
            .create_forecast(ForecastRequest {
                name: name.clone(),
                predictor_arn: predictor_arn.to_string(),
            })
            .await;
        let arn = self.accept(kind, name.clone(), response)?;
        Ok(self.submitted(kind, name, arn))
    }

    /// Submit the export of a forecast to `destination_path`.
    pub async fn submit_export(
        &self,
        forecast_arn: &str,
        destination_path: &str,
    ) -> Result<JobHandle, PipelineError> {
        let kind = JobKind::ForecastExport;
        self.ensure_running(kind)?;
        let name = self.names.forecast_export();
        let response = self
            .service
            .create_forecast_export_job(ExportRequest {
                name: name.clone(),
                forecast_arn: forecast_arn.to_string(),
                destination_path: destination_path.to_string(),
                role_arn: self.settings.role_arn.clone(),
                format: FILE_FORMAT.to_string(),
            })
            .await;
        let arn = self.accept(kind, name.clone(), response)?;
        Ok(self.submitted(kind, name, arn))
    }

    /// Wait for `handle` unless the stage is detached.
    pub async fn complete(
        &self,
        handle: &JobHandle,
        policy: &PollPolicy,
        completion: Completion,
    ) -> Result<(), PipelineError> {
        match completion {
            Completion::Wait => self.waiter.wait(handle, policy).await,
            Completion::Detached => {
                info!(target = %self.target, kind = %handle.kind, arn = %handle.arn, "Not waiting for job");
                Ok(())
            }
        }
    }
}
