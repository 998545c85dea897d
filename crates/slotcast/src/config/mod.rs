//! Configuration for the slotcast pipeline driver.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use slotcast_core::config::{
    ComponentKey, ConfigPath, GlobalConfig, InterpolationResult, Mergeable, MetricsConfig,
    interpolate, load_from_paths,
};
use slotcast_core::error::ConfigError;
use slotcast_core::PollPolicy;

use crate::job::policy_for;
use crate::metric::Metric;

/// Header of the materialized export file.
pub const DEFAULT_EXPORT_HEADER: &str = "metric_name,date,p10,p50,p90";

/// Resolution of the raw input and of the imported dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// `country,area,day,<metrics>`, comma-separated.
    Daily,
    /// `country|area|day|hour|<metrics>`, pipe-separated.
    Hourly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Hourly => "hourly",
        }
    }

    pub fn delimiter(&self) -> u8 {
        match self {
            Granularity::Daily => b',',
            Granularity::Hourly => b'|',
        }
    }

    /// Number of leading key columns before the metric columns.
    pub fn key_columns(&self) -> usize {
        match self {
            Granularity::Daily => 3,
            Granularity::Hourly => 4,
        }
    }

    /// Dataset data frequency.
    pub fn data_frequency(&self) -> &'static str {
        match self {
            Granularity::Daily => "D",
            Granularity::Hourly => "H",
        }
    }

    /// Timestamp format of the reshaped files, in the service's notation.
    pub fn timestamp_format(&self) -> &'static str {
        match self {
            Granularity::Daily => "yyyy-MM-dd",
            Granularity::Hourly => "yyyy-MM-dd HH:mm:ss",
        }
    }

    /// Directory the reshaped partitions are uploaded under.
    pub fn input_dir(&self) -> &'static str {
        match self {
            Granularity::Daily => "days",
            Granularity::Hourly => "hours",
        }
    }
}

/// Object storage shared by every pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL; inputs go to `{url}/input`, exports to `{url}/exports`.
    #[serde(default)]
    pub url: String,
    /// Storage options (credentials, region, endpoint, etc.).
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

/// Forecasting service settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// IAM role the service assumes to read inputs and write exports.
    #[serde(default)]
    pub role_arn: String,
    /// Region override; the ambient AWS configuration is used when unset.
    #[serde(default)]
    pub region: Option<String>,
}

/// Predictor training parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_forecast_frequency")]
    pub forecast_frequency: String,
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: u32,
    /// Country for the holiday featurization; `null` disables it.
    #[serde(default = "default_holiday_country")]
    pub holiday_country: Option<String>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            forecast_frequency: default_forecast_frequency(),
            forecast_horizon: default_forecast_horizon(),
            holiday_country: default_holiday_country(),
        }
    }
}

fn default_forecast_frequency() -> String {
    "D".to_string()
}

fn default_forecast_horizon() -> u32 {
    14
}

fn default_holiday_country() -> Option<String> {
    Some("IT".to_string())
}

/// How remote jobs are polled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval between dataset import status checks.
    #[serde(default = "default_import_interval")]
    pub import_interval_secs: u64,
    /// Interval between predictor, forecast and export status checks.
    #[serde(default = "default_job_interval")]
    pub job_interval_secs: u64,
    /// Budget for each wait; `null` waits indefinitely.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: Option<u64>,
    /// Cap on status checks per wait; unset means only `max_wait_secs` applies.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            import_interval_secs: default_import_interval(),
            job_interval_secs: default_job_interval(),
            max_wait_secs: default_max_wait(),
            max_attempts: None,
        }
    }
}

impl PollingConfig {
    fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }

    /// Policy for the dataset import job.
    pub fn import_policy(&self) -> PollPolicy {
        policy_for(
            Duration::from_secs(self.import_interval_secs),
            self.max_wait(),
            self.max_attempts,
        )
    }

    /// Policy for predictor, forecast and export jobs.
    pub fn job_policy(&self) -> PollPolicy {
        policy_for(
            Duration::from_secs(self.job_interval_secs),
            self.max_wait(),
            self.max_attempts,
        )
    }
}

fn default_import_interval() -> u64 {
    10
}

fn default_job_interval() -> u64 {
    5
}

fn default_max_wait() -> Option<u64> {
    Some(24 * 60 * 60)
}

/// Export materialization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Header line written once at the top of the export file.
    #[serde(default = "default_export_header")]
    pub header: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            header: default_export_header(),
        }
    }
}

fn default_export_header() -> String {
    DEFAULT_EXPORT_HEADER.to_string()
}

/// Configuration of one pipeline (one input file driven through every stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub granularity: Granularity,
    /// Raw slot-availability export on the local filesystem.
    pub input_path: PathBuf,
    /// The metric that is imported and forecast.
    #[serde(default)]
    pub metric: Metric,
    /// Directory the export file is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

/// Main configuration for slotcast.
///
/// # Example
///
/// ```yaml
/// storage:
///   url: s3://${FORECAST_BUCKET}/forecast
/// service:
///   role_arn: ${FORECAST_ROLE}
/// pipelines:
///   daily:
///     granularity: daily
///     input_path: data/dm_delivery_slot_availability.csv
///   hourly:
///     granularity: hourly
///     input_path: data/dm_delivery_slot_availability_hours.csv
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named pipeline configurations.
    #[serde(default)]
    pub pipelines: IndexMap<ComponentKey, PipelineConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    /// Global configuration options.
    #[serde(default)]
    pub global: GlobalConfig,
    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Mergeable for Config {
    type Key = ComponentKey;
    type Component = PipelineConfig;

    fn components_mut(&mut self) -> &mut IndexMap<Self::Key, Self::Component> {
        &mut self.pipelines
    }

    fn global_mut(&mut self) -> &mut GlobalConfig {
        &mut self.global
    }

    fn metrics_mut(&mut self) -> &mut MetricsConfig {
        &mut self.metrics
    }

    fn parse_yaml(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|source| ConfigError::YamlParse { source })
    }

    fn merge_sections(&mut self, other: &mut Self) {
        if !other.storage.url.is_empty() {
            self.storage = std::mem::take(&mut other.storage);
        }
        if !other.service.role_arn.is_empty() {
            self.service = std::mem::take(&mut other.service);
        }
    }
}

impl Config {
    /// Load configuration from multiple paths (files or directories).
    pub fn from_paths(paths: &[ConfigPath]) -> Result<Self, ConfigError> {
        let config: Self = load_from_paths(paths)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        let config = Self::parse_yaml(&result.text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipelines.is_empty() {
            return Err(ConfigError::NoPipelines);
        }
        if self.storage.url.is_empty() {
            return Err(ConfigError::EmptyField {
                field: "storage.url".to_string(),
            });
        }
        if self.service.role_arn.is_empty() {
            return Err(ConfigError::EmptyField {
                field: "service.role_arn".to_string(),
            });
        }

        for (key, pipeline) in &self.pipelines {
            let empty = |field: &str| ConfigError::EmptyFieldForPipeline {
                pipeline: key.id().to_string(),
                field: field.to_string(),
            };
            let invalid = |field: &str, message: &str| ConfigError::InvalidValue {
                pipeline: key.id().to_string(),
                field: field.to_string(),
                message: message.to_string(),
            };

            if pipeline.input_path.as_os_str().is_empty() {
                return Err(empty("input_path"));
            }
            if pipeline.predictor.forecast_frequency.is_empty() {
                return Err(empty("predictor.forecast_frequency"));
            }
            if pipeline.export.header.trim().is_empty() {
                return Err(empty("export.header"));
            }
            if pipeline.predictor.forecast_horizon == 0 {
                return Err(invalid("predictor.forecast_horizon", "must be positive"));
            }
            if pipeline.polling.import_interval_secs == 0 {
                return Err(invalid("polling.import_interval_secs", "must be positive"));
            }
            if pipeline.polling.job_interval_secs == 0 {
                return Err(invalid("polling.job_interval_secs", "must be positive"));
            }
            if pipeline.polling.max_wait_secs == Some(0) {
                return Err(invalid("polling.max_wait_secs", "must be positive"));
            }
            if pipeline.polling.max_attempts == Some(0) {
                return Err(invalid("polling.max_attempts", "must be positive"));
            }
        }

        Ok(())
    }

    /// Keep only the named pipelines. An empty selection keeps all of them.
    pub fn select_pipelines(&mut self, names: &[String]) -> Result<(), ConfigError> {
        if names.is_empty() {
            return Ok(());
        }

        let unknown: Vec<String> = names
            .iter()
            .filter(|name| !self.pipelines.contains_key(&ComponentKey::new(name.as_str())))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownPipelines { keys: unknown });
        }

        self.pipelines
            .retain(|key, _| names.iter().any(|name| name == key.id()));
        Ok(())
    }

    /// Iterate over all pipelines with their keys.
    pub fn pipelines(&self) -> impl Iterator<Item = (&ComponentKey, &PipelineConfig)> {
        self.pipelines.iter()
    }

    /// Get the number of pipelines in the configuration.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
storage:
  url: s3://bucket/forecast
service:
  role_arn: arn:aws:iam::123456789012:role/forecast
"#;

    fn parse(pipelines: &str) -> Result<Config, ConfigError> {
        Config::parse(&format!("{BASE}{pipelines}"))
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
"#,
        )
        .unwrap();

        assert_eq!(config.pipeline_count(), 1);
        assert_eq!(config.global.total_concurrency, 1);
        assert_eq!(config.metrics.address, "0.0.0.0:9090");
        assert!(config.service.region.is_none());

        let (key, pipeline) = config.pipelines().next().unwrap();
        assert_eq!(key.id(), "daily");
        assert_eq!(pipeline.metric, Metric::SamedayOneHourAvailable);
        assert_eq!(pipeline.output_dir, PathBuf::from("out"));
        assert_eq!(pipeline.predictor.forecast_frequency, "D");
        assert_eq!(pipeline.predictor.forecast_horizon, 14);
        assert_eq!(pipeline.predictor.holiday_country.as_deref(), Some("IT"));
        assert_eq!(pipeline.export.header, DEFAULT_EXPORT_HEADER);

        let import = pipeline.polling.import_policy();
        assert_eq!(import.interval, Duration::from_secs(10));
        let job = pipeline.polling.job_policy();
        assert_eq!(job.interval, Duration::from_secs(5));
        assert_eq!(job.max_wait, Some(Duration::from_secs(86400)));
        assert_eq!(job.max_attempts, None);
    }

    #[test]
    fn test_max_attempts_reaches_both_policies() {
        let config = parse(
            r#"
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
    polling:
      max_attempts: 30
"#,
        )
        .unwrap();

        let (_, pipeline) = config.pipelines().next().unwrap();
        assert_eq!(pipeline.polling.import_policy().max_attempts, Some(30));
        assert_eq!(pipeline.polling.job_policy().max_attempts, Some(30));
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let err = parse(
            r#"
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
    polling:
      max_attempts: 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("polling.max_attempts"));
    }

    #[test]
    fn test_two_variants_in_order() {
        let config = parse(
            r#"
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
  hourly:
    granularity: hourly
    input_path: data/hours.csv
    metric: nextday_4h_theoretical_slots_number
    predictor:
      holiday_country: null
    polling:
      max_wait_secs: null
"#,
        )
        .unwrap();

        let pipelines: Vec<_> = config.pipelines().collect();
        assert_eq!(pipelines[0].0.id(), "daily");
        assert_eq!(pipelines[1].0.id(), "hourly");

        let hourly = pipelines[1].1;
        assert_eq!(hourly.granularity, Granularity::Hourly);
        assert_eq!(hourly.metric, Metric::NextdayFourHourTheoretical);
        assert!(hourly.predictor.holiday_country.is_none());
        assert!(hourly.polling.job_policy().max_wait.is_none());
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let err = parse(
            r#"
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
    metric: sameday_2h_available_slots_number
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown metric"));
    }

    #[test]
    fn test_missing_role_rejected() {
        let err = Config::parse(
            r#"
storage:
  url: s3://bucket/forecast
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("service.role_arn"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = parse(
            r#"
pipelines:
  hourly:
    granularity: hourly
    input_path: data/hours.csv
    polling:
      job_interval_secs: 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("hourly"));
        assert!(err.to_string().contains("job_interval_secs"));
    }

    #[test]
    fn test_no_pipelines_rejected() {
        assert!(matches!(parse(""), Err(ConfigError::NoPipelines)));
    }

    #[test]
    fn test_select_pipelines() {
        let mut config = parse(
            r#"
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
  hourly:
    granularity: hourly
    input_path: data/hours.csv
"#,
        )
        .unwrap();

        let err = config
            .select_pipelines(&["weekly".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("weekly"));

        config.select_pipelines(&["hourly".to_string()]).unwrap();
        assert_eq!(config.pipeline_count(), 1);
        assert_eq!(config.pipelines().next().unwrap().0.id(), "hourly");
    }

    #[test]
    fn test_shared_sections_merge_across_files() {
        let mut base: Config = Config::parse_yaml(BASE).unwrap();
        let pipelines: Config = Config::parse_yaml(
            r#"
pipelines:
  daily:
    granularity: daily
    input_path: data/days.csv
"#,
        )
        .unwrap();

        base.merge(pipelines).unwrap();
        base.validate().unwrap();
        assert_eq!(base.storage.url, "s3://bucket/forecast");
        assert_eq!(base.pipeline_count(), 1);
    }

    #[test]
    fn test_granularity_formats() {
        assert_eq!(Granularity::Daily.data_frequency(), "D");
        assert_eq!(Granularity::Hourly.data_frequency(), "H");
        assert_eq!(Granularity::Daily.timestamp_format(), "yyyy-MM-dd");
        assert_eq!(Granularity::Hourly.timestamp_format(), "yyyy-MM-dd HH:mm:ss");
        assert_eq!(Granularity::Hourly.input_dir(), "hours");
    }
}
