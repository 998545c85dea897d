//! Shared fixtures: a scripted forecasting service and local storage.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use slotcast::config::{
    ComponentKey, ExportConfig, Granularity, PipelineConfig, PollingConfig, PredictorConfig,
    ServiceConfig,
};
use slotcast::error::ServiceError;
use slotcast::metric::Metric;
use slotcast::service::{
    DatasetGroupRequest, DatasetImportRequest, DatasetRequest, ExportRequest, ForecastRequest,
    ForecastService, ForecastServiceRef, PredictorRequest,
};
use slotcast::stage::StageSettings;
use slotcast::{JobKind, JobStatus, PipelineOrchestrator, RunId, StorageProvider, StorageProviderRef};

pub const ROLE_ARN: &str = "arn:aws:iam::000000000000:role/forecast";

/// A call received by [`ScriptedService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDataset(DatasetRequest),
    CreateDatasetGroup(DatasetGroupRequest),
    CreateImport(DatasetImportRequest),
    CreatePredictor(PredictorRequest),
    CreateForecast(ForecastRequest),
    CreateExport(ExportRequest),
    Describe(JobKind, String),
}

impl Call {
    pub fn is_create(&self, kind: JobKind) -> bool {
        matches!(
            (self, kind),
            (Call::CreateImport(_), JobKind::DatasetImport)
                | (Call::CreatePredictor(_), JobKind::PredictorTraining)
                | (Call::CreateForecast(_), JobKind::ForecastGeneration)
                | (Call::CreateExport(_), JobKind::ForecastExport)
        )
    }

    pub fn is_describe(&self, kind: JobKind) -> bool {
        matches!(self, Call::Describe(k, _) if *k == kind)
    }
}

/// In-memory forecasting service that answers from a script.
///
/// Each describe call pops the next scripted status for its job kind; the last
/// status repeats once the script is exhausted. Unscripted kinds succeed on
/// the first check.
#[derive(Default)]
pub struct ScriptedService {
    calls: Mutex<Vec<Call>>,
    statuses: Mutex<HashMap<JobKind, VecDeque<String>>>,
    without_arn: HashSet<&'static str>,
    export: Option<(StorageProviderRef, Vec<String>)>,
    shutdown_after: Option<(JobKind, CancellationToken)>,
}

/// Service status string reported for a job in `status`.
pub fn service_status(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "CREATE_PENDING",
        JobStatus::InProgress => "CREATE_IN_PROGRESS",
        JobStatus::Succeeded => "ACTIVE",
        JobStatus::Failed => "CREATE_FAILED",
    }
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(self, kind: JobKind, statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        self.with_service_statuses(kind, statuses.into_iter().map(service_status))
    }

    /// Script raw service status strings, such as `CREATE_STOPPED`.
    pub fn with_service_statuses(
        self,
        kind: JobKind,
        statuses: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(kind, statuses.into_iter().map(str::to_string).collect());
        self
    }

    /// Cancel `shutdown` as soon as a job of `kind` is reported active.
    pub fn with_shutdown_after(mut self, kind: JobKind, shutdown: CancellationToken) -> Self {
        self.shutdown_after = Some((kind, shutdown));
        self
    }

    /// Make the named create operation answer without an identifier.
    pub fn without_arn(mut self, operation: &'static str) -> Self {
        self.without_arn.insert(operation);
        self
    }

    /// Write `parts` as export partition files when an export job is created.
    pub fn with_export(mut self, storage: StorageProviderRef, parts: &[&str]) -> Self {
        self.export = Some((storage, parts.iter().map(|p| p.to_string()).collect()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Describe(..)))
            .count()
    }

    pub fn describe_count(&self, kind: JobKind) -> usize {
        self.calls().iter().filter(|c| c.is_describe(kind)).count()
    }

    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls().iter().position(predicate)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn created(&self, operation: &'static str, resource: &str, name: &str) -> Option<String> {
        if self.without_arn.contains(operation) {
            return None;
        }
        Some(format!(
            "arn:aws:forecast:eu-west-1:000000000000:{resource}/{name}"
        ))
    }

    fn status(&self, kind: JobKind, arn: &str) -> String {
        self.record(Call::Describe(kind, arn.to_string()));
        let status = {
            let mut statuses = self.statuses.lock().unwrap();
            match statuses.get_mut(&kind) {
                Some(script) if script.len() > 1 => script.pop_front().unwrap(),
                Some(script) => script
                    .front()
                    .cloned()
                    .unwrap_or_else(|| service_status(JobStatus::Succeeded).to_string()),
                None => service_status(JobStatus::Succeeded).to_string(),
            }
        };
        if let Some((after, shutdown)) = &self.shutdown_after {
            if *after == kind && status == service_status(JobStatus::Succeeded) {
                shutdown.cancel();
            }
        }
        status
    }
}

#[async_trait]
impl ForecastService for ScriptedService {
    async fn create_dataset(&self, request: DatasetRequest) -> Result<Option<String>, ServiceError> {
        let arn = self.created("create_dataset", "dataset", &request.name);
        self.record(Call::CreateDataset(request));
        Ok(arn)
    }

    async fn create_dataset_group(
        &self,
        request: DatasetGroupRequest,
    ) -> Result<Option<String>, ServiceError> {
        let arn = self.created("create_dataset_group", "dataset-group", &request.name);
        self.record(Call::CreateDatasetGroup(request));
        Ok(arn)
    }

    async fn create_dataset_import_job(
        &self,
        request: DatasetImportRequest,
    ) -> Result<Option<String>, ServiceError> {
        let arn = self.created("create_dataset_import_job", "dataset-import-job", &request.name);
        self.record(Call::CreateImport(request));
        Ok(arn)
    }

    async fn describe_dataset_import_job(&self, arn: &str) -> Result<String, ServiceError> {
        Ok(self.status(JobKind::DatasetImport, arn))
    }

    async fn create_auto_predictor(
        &self,
        request: PredictorRequest,
    ) -> Result<Option<String>, ServiceError> {
        let arn = self.created("create_auto_predictor", "predictor", &request.name);
        self.record(Call::CreatePredictor(request));
        Ok(arn)
    }

    async fn describe_auto_predictor(&self, arn: &str) -> Result<String, ServiceError> {
        Ok(self.status(JobKind::PredictorTraining, arn))
    }

    async fn create_forecast(
        &self,
        request: ForecastRequest,
    ) -> Result<Option<String>, ServiceError> {
        let arn = self.created("create_forecast", "forecast", &request.name);
        self.record(Call::CreateForecast(request));
        Ok(arn)
    }

    async fn describe_forecast(&self, arn: &str) -> Result<String, ServiceError> {
        Ok(self.status(JobKind::ForecastGeneration, arn))
    }

    async fn create_forecast_export_job(
        &self,
        request: ExportRequest,
    ) -> Result<Option<String>, ServiceError> {
        let arn = self.created("create_forecast_export_job", "forecast-export-job", &request.name);

        if let Some((storage, parts)) = &self.export {
            let base = format!("{}/", storage.url_for(&Path::default()));
            let prefix = request
                .destination_path
                .strip_prefix(&base)
                .unwrap_or(&request.destination_path)
                .to_string();
            // Written last part first; materialization must not rely on listing order.
            for (i, body) in parts.iter().enumerate().rev() {
                let key = format!("{prefix}/{}_2021-03-15T00-00-00Z_part{i}.csv", request.name);
                storage
                    .put(&Path::from(key), Bytes::from(body.clone()))
                    .await
                    .unwrap();
            }
        }

        self.record(Call::CreateExport(request));
        Ok(arn)
    }

    async fn describe_forecast_export_job(&self, arn: &str) -> Result<String, ServiceError> {
        Ok(self.status(JobKind::ForecastExport, arn))
    }
}

/// One daily input row: `IT,{area},{day},v1..v14` with `v1 = first`.
pub fn daily_row(area: &str, day: &str, first: &str) -> String {
    let mut values = vec![first.to_string()];
    values.extend((2..=14).map(|v| v.to_string()));
    format!("IT,{area},{day},{}", values.join(","))
}

/// One hourly input row: `IT|{area}|{day}|{hour}|v1..v14`.
pub fn hourly_row(area: &str, day: &str, hour: u8) -> String {
    let values: Vec<String> = (1..=14).map(|v| v.to_string()).collect();
    format!("IT|{area}|{day}|{hour}|{}", values.join("|"))
}

/// Temporary workspace with a local bucket, input files and an output dir.
pub struct Workspace {
    pub dir: TempDir,
    pub storage: StorageProviderRef,
}

impl Workspace {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let url = dir.path().join("bucket");
        let storage = StorageProvider::for_url_with_options(url.to_str().unwrap(), HashMap::new())
            .await
            .unwrap();
        Self {
            dir,
            storage: Arc::new(storage),
        }
    }

    pub fn write_input(&self, name: &str, rows: &[String]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("{}\n", rows.join("\n"))).unwrap();
        path
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn pipeline_config(&self, granularity: Granularity, input_path: PathBuf) -> PipelineConfig {
        PipelineConfig {
            granularity,
            input_path,
            metric: Metric::default(),
            output_dir: self.output_dir(),
            predictor: PredictorConfig::default(),
            polling: PollingConfig {
                import_interval_secs: 10,
                job_interval_secs: 5,
                max_wait_secs: Some(3600),
                max_attempts: None,
            },
            export: ExportConfig::default(),
        }
    }

    pub fn orchestrator(
        &self,
        key: &str,
        config: PipelineConfig,
        service: Arc<ScriptedService>,
        shutdown: CancellationToken,
    ) -> PipelineOrchestrator {
        let settings = StageSettings::new(
            &config,
            &ServiceConfig {
                role_arn: ROLE_ARN.to_string(),
                region: None,
            },
        );
        let service: ForecastServiceRef = service;
        PipelineOrchestrator::new(
            ComponentKey::new(key),
            config,
            settings,
            self.storage.clone(),
            service,
            shutdown,
            RunId::new(),
        )
    }
}
