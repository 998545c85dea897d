//! Running several pipelines with shared shutdown handling.

mod pipeline;

pub use pipeline::{Pipeline, PipelineRunner, RunSummary, RuntimeContext, run_pipelines};
