//! The managed forecasting service as seen by the pipeline.
//!
//! Every `create_*` call returns the identifier of the created resource, or
//! `None` when the service answered without one. Every `describe_*` call
//! returns the raw service status, such as `CREATE_IN_PROGRESS` or `ACTIVE`;
//! the waiter maps it onto [`slotcast_core::JobStatus`].

#[cfg(feature = "aws")]
pub mod aws;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::job::JobKind;

/// Dataset domain used for every dataset and dataset group.
pub const DOMAIN: &str = "METRICS";
/// Dataset type of the imported metric series.
pub const DATASET_TYPE: &str = "TARGET_TIME_SERIES";
/// Format of imported and exported files.
pub const FILE_FORMAT: &str = "CSV";
/// Imports replace any existing data.
pub const IMPORT_MODE: &str = "FULL";
/// Name of the built-in holiday featurization dataset.
pub const HOLIDAY_DATASET: &str = "holiday";

/// One column of a dataset schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaAttribute {
    pub name: String,
    pub attribute_type: String,
}

impl SchemaAttribute {
    pub fn new(name: &str, attribute_type: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: attribute_type.to_string(),
        }
    }
}

/// Schema of the reshaped metric files: `timestamp,metric_name,metric_value`.
pub fn metric_schema() -> Vec<SchemaAttribute> {
    vec![
        SchemaAttribute::new("timestamp", "timestamp"),
        SchemaAttribute::new("metric_name", "string"),
        SchemaAttribute::new("metric_value", "integer"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRequest {
    pub name: String,
    pub domain: String,
    pub dataset_type: String,
    /// Data frequency, `D` or `H`.
    pub data_frequency: String,
    pub schema: Vec<SchemaAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetGroupRequest {
    pub name: String,
    pub domain: String,
    pub dataset_arns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetImportRequest {
    pub name: String,
    pub dataset_arn: String,
    /// `s3://` URL of the file to import.
    pub source_path: String,
    pub role_arn: String,
    pub timestamp_format: String,
    pub format: String,
    pub import_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictorRequest {
    pub name: String,
    pub dataset_group_arn: String,
    pub forecast_frequency: String,
    pub forecast_horizon: u32,
    /// Country code for the holiday featurization, if any.
    pub holiday_country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    pub name: String,
    pub predictor_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub name: String,
    pub forecast_arn: String,
    /// `s3://` URL prefix the export files are written under.
    pub destination_path: String,
    pub role_arn: String,
    pub format: String,
}

/// Capability the pipeline needs from the forecasting service.
#[async_trait]
pub trait ForecastService: Send + Sync {
    async fn create_dataset(&self, request: DatasetRequest) -> Result<Option<String>, ServiceError>;

    async fn create_dataset_group(
        &self,
        request: DatasetGroupRequest,
    ) -> Result<Option<String>, ServiceError>;

    async fn create_dataset_import_job(
        &self,
        request: DatasetImportRequest,
    ) -> Result<Option<String>, ServiceError>;

    async fn describe_dataset_import_job(&self, arn: &str) -> Result<String, ServiceError>;

    async fn create_auto_predictor(
        &self,
        request: PredictorRequest,
    ) -> Result<Option<String>, ServiceError>;

    async fn describe_auto_predictor(&self, arn: &str) -> Result<String, ServiceError>;

    async fn create_forecast(&self, request: ForecastRequest)
    -> Result<Option<String>, ServiceError>;

    async fn describe_forecast(&self, arn: &str) -> Result<String, ServiceError>;

    async fn create_forecast_export_job(
        &self,
        request: ExportRequest,
    ) -> Result<Option<String>, ServiceError>;

    async fn describe_forecast_export_job(&self, arn: &str) -> Result<String, ServiceError>;

    /// Raw status of any job, dispatched on its kind.
    async fn describe_job(&self, kind: JobKind, arn: &str) -> Result<String, ServiceError> {
        match kind {
            JobKind::DatasetImport => self.describe_dataset_import_job(arn).await,
            JobKind::PredictorTraining => self.describe_auto_predictor(arn).await,
            JobKind::ForecastGeneration => self.describe_forecast(arn).await,
            JobKind::ForecastExport => self.describe_forecast_export_job(arn).await,
        }
    }
}

/// A shared forecasting service handle.
pub type ForecastServiceRef = Arc<dyn ForecastService>;
