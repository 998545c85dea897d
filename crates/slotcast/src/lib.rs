//! slotcast: drives a managed forecasting service over delivery-slot data.
//!
//! This crate handles:
//! - Reshaping raw daily/hourly slot-availability exports into one file per metric
//! - Uploading the reshaped partitions to object storage
//! - Chaining dataset import, predictor training, forecast generation and export jobs
//! - Materializing the exported predictions into one local CSV file

pub mod config;
pub mod error;
pub mod job;
pub mod metric;
pub mod pipeline;
pub mod reshape;
pub mod service;
pub mod stage;

/// Re-export storage module from slotcast-core for convenience
pub mod storage {
    pub use slotcast_core::storage::*;
}

// Re-export commonly used items
pub use config::{Config, Granularity, PipelineConfig};
pub use error::PipelineError;
pub use job::{JobHandle, JobKind, RunId, RunNames};
pub use pipeline::{PipelineContext, PipelineOrchestrator, PipelineState, SlotcastPipeline};
pub use service::{ForecastService, ForecastServiceRef};

// Re-export from slotcast-core
pub use slotcast_core::{
    CliArgs, JobStatus, PollPolicy, StorageProvider, StorageProviderRef, init_tracing,
    run_pipelines, shutdown_signal,
};
