//! AWS Forecast binding.

use std::fmt::Display;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_forecast::Client;
use aws_sdk_forecast::error::DisplayErrorContext;
use aws_sdk_forecast::types::{
    AdditionalDataset, AttributeType, DataConfig, DataDestination, DataSource, DatasetType,
    Domain, ImportMode, S3Config, Schema, SchemaAttribute as SdkSchemaAttribute,
};
use tracing::debug;

use super::{
    DatasetGroupRequest, DatasetImportRequest, DatasetRequest, ExportRequest, ForecastRequest,
    ForecastService, PredictorRequest, SchemaAttribute,
};
use crate::error::ServiceError;

/// [`ForecastService`] backed by the AWS Forecast API.
#[derive(Debug, Clone)]
pub struct AwsForecastService {
    client: Client,
}

impl AwsForecastService {
    /// Build a client from the ambient AWS configuration.
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self {
            client: Client::new(&sdk_config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn request_failed<E>(operation: &'static str) -> impl FnOnce(E) -> ServiceError
where
    E: std::error::Error,
{
    move |e| ServiceError::Request {
        operation,
        message: DisplayErrorContext(e).to_string(),
    }
}

fn invalid_request<E: Display>(operation: &'static str) -> impl FnOnce(E) -> ServiceError {
    move |e| ServiceError::InvalidRequest {
        operation,
        message: e.to_string(),
    }
}

fn status_of(operation: &'static str, arn: &str, status: Option<&str>) -> String {
    let status = status.unwrap_or_default();
    debug!(operation, arn, status, "Described job");
    status.to_string()
}

fn s3_config(
    operation: &'static str,
    path: &str,
    role_arn: &str,
) -> Result<S3Config, ServiceError> {
    S3Config::builder()
        .path(path)
        .role_arn(role_arn)
        .build()
        .map_err(invalid_request(operation))
}

fn schema(attributes: &[SchemaAttribute]) -> Schema {
    attributes
        .iter()
        .fold(Schema::builder(), |builder, attribute| {
            builder.attributes(
                SdkSchemaAttribute::builder()
                    .attribute_name(&attribute.name)
                    .attribute_type(AttributeType::from(attribute.attribute_type.as_str()))
                    .build(),
            )
        })
        .build()
}

#[async_trait]
impl ForecastService for AwsForecastService {
    async fn create_dataset(&self, request: DatasetRequest) -> Result<Option<String>, ServiceError> {
        let output = self
            .client
            .create_dataset()
            .dataset_name(request.name)
            .domain(Domain::from(request.domain.as_str()))
            .dataset_type(DatasetType::from(request.dataset_type.as_str()))
            .data_frequency(request.data_frequency)
            .schema(schema(&request.schema))
            .send()
            .await
            .map_err(request_failed("CreateDataset"))?;
        Ok(output.dataset_arn().map(str::to_string))
    }

    async fn create_dataset_group(
        &self,
        request: DatasetGroupRequest,
    ) -> Result<Option<String>, ServiceError> {
        let output = self
            .client
            .create_dataset_group()
            .dataset_group_name(request.name)
            .domain(Domain::from(request.domain.as_str()))
            .set_dataset_arns(Some(request.dataset_arns))
            .send()
            .await
            .map_err(request_failed("CreateDatasetGroup"))?;
        Ok(output.dataset_group_arn().map(str::to_string))
    }

    async fn create_dataset_import_job(
        &self,
        request: DatasetImportRequest,
    ) -> Result<Option<String>, ServiceError> {
        const OPERATION: &str = "CreateDatasetImportJob";
        let source = DataSource::builder()
            .s3_config(s3_config(OPERATION, &request.source_path, &request.role_arn)?)
            .build();

        let output = self
            .client
            .create_dataset_import_job()
            .dataset_import_job_name(request.name)
            .dataset_arn(request.dataset_arn)
            .data_source(source)
            .timestamp_format(request.timestamp_format)
            .format(request.format)
            .import_mode(ImportMode::from(request.import_mode.as_str()))
            .send()
            .await
            .map_err(request_failed(OPERATION))?;
        Ok(output.dataset_import_job_arn().map(str::to_string))
    }

    async fn describe_dataset_import_job(&self, arn: &str) -> Result<String, ServiceError> {
        let output = self
            .client
            .describe_dataset_import_job()
            .dataset_import_job_arn(arn)
            .send()
            .await
            .map_err(request_failed("DescribeDatasetImportJob"))?;
        Ok(status_of("DescribeDatasetImportJob", arn, output.status()))
    }

    async fn create_auto_predictor(
        &self,
        request: PredictorRequest,
    ) -> Result<Option<String>, ServiceError> {
        const OPERATION: &str = "CreateAutoPredictor";
        let mut data_config = DataConfig::builder().dataset_group_arn(request.dataset_group_arn);
        if let Some(country) = request.holiday_country {
            data_config = data_config.additional_datasets(
                AdditionalDataset::builder()
                    .name(super::HOLIDAY_DATASET)
                    .configuration("CountryCode", vec![country])
                    .build()
                    .map_err(invalid_request(OPERATION))?,
            );
        }
        let data_config = data_config.build().map_err(invalid_request(OPERATION))?;
        let horizon = i32::try_from(request.forecast_horizon).map_err(invalid_request(OPERATION))?;

        let output = self
            .client
            .create_auto_predictor()
            .predictor_name(request.name)
            .data_config(data_config)
            .forecast_frequency(request.forecast_frequency)
            .forecast_horizon(horizon)
            .send()
            .await
            .map_err(request_failed(OPERATION))?;
        Ok(output.predictor_arn().map(str::to_string))
    }

    async fn describe_auto_predictor(&self, arn: &str) -> Result<String, ServiceError> {
        let output = self
            .client
            .describe_auto_predictor()
            .predictor_arn(arn)
            .send()
            .await
            .map_err(request_failed("DescribeAutoPredictor"))?;
        Ok(status_of("DescribeAutoPredictor", arn, output.status()))
    }

    async fn create_forecast(
        &self,
        request: ForecastRequest,
    ) -> Result<Option<String>, ServiceError> {
        let output = self
            .client
            .create_forecast()
            .forecast_name(request.name)
            .predictor_arn(request.predictor_arn)
            .send()
            .await
            .map_err(request_failed("CreateForecast"))?;
        Ok(output.forecast_arn().map(str::to_string))
    }

    async fn describe_forecast(&self, arn: &str) -> Result<String, ServiceError> {
        let output = self
            .client
            .describe_forecast()
            .forecast_arn(arn)
            .send()
            .await
            .map_err(request_failed("DescribeForecast"))?;
        Ok(status_of("DescribeForecast", arn, output.status()))
    }

    async fn create_forecast_export_job(
        &self,
        request: ExportRequest,
    ) -> Result<Option<String>, ServiceError> {
        const OPERATION: &str = "CreateForecastExportJob";
        let destination = DataDestination::builder()
            .s3_config(s3_config(OPERATION, &request.destination_path, &request.role_arn)?)
            .build();

        let output = self
            .client
            .create_forecast_export_job()
            .forecast_export_job_name(request.name)
            .forecast_arn(request.forecast_arn)
            .destination(destination)
            .format(request.format)
            .send()
            .await
            .map_err(request_failed(OPERATION))?;
        Ok(output.forecast_export_job_arn().map(str::to_string))
    }

    async fn describe_forecast_export_job(&self, arn: &str) -> Result<String, ServiceError> {
        let output = self
            .client
            .describe_forecast_export_job()
            .forecast_export_job_arn(arn)
            .send()
            .await
            .map_err(request_failed("DescribeForecastExportJob"))?;
        Ok(status_of("DescribeForecastExportJob", arn, output.status()))
    }
}
