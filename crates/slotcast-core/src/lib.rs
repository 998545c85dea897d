//! slotcast-core: shared components for the slotcast forecasting pipeline.
//!
//! - `storage/` - Object storage abstraction (S3 and local filesystem)
//! - `polling` - Bounded polling loop for asynchronous remote jobs
//! - `config/` - Config loading, environment variable interpolation, CLI paths
//! - `metrics/` - Prometheus metrics infrastructure
//! - `topology/` - Running several pipeline runs with shared shutdown handling
//! - `signal` - Signal handling for graceful shutdown
//! - `error` - Common error types

pub mod config;
pub mod error;
pub mod metrics;
pub mod polling;
pub mod signal;
pub mod storage;
pub mod topology;
pub mod tracing;

pub use config::{CliArgs, ComponentKey, ConfigPath, GlobalConfig, MetricsConfig};
pub use error::{ConfigError, MetricsError, PipelineSetupError, StorageError};
pub use metrics::{
    DEFAULT_METRICS_ADDR, MetricsController, init_global as init_metrics,
    init_test as init_metrics_test,
};
pub use polling::{JobStatus, PollOutcome, PollPolicy, StatusProbe, poll_until_terminal};
pub use signal::shutdown_signal;
pub use storage::{StorageProvider, StorageProviderRef};
pub use topology::{Pipeline, PipelineRunner, RunSummary, RuntimeContext, run_pipelines};
pub use tracing::init_tracing;
