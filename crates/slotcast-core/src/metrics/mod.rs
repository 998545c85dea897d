//! Metrics and observability infrastructure.
//!
//! - `events`: internal event types and the `InternalEvent` trait
//! - `server`: Prometheus recorder and HTTP endpoint

pub mod events;
pub mod server;

pub use server::{DEFAULT_METRICS_ADDR, MetricsController, init_global, init_test};

/// Emit a metric event.
///
/// ```ignore
/// use slotcast_core::emit;
/// use slotcast_core::metrics::events::JobSubmitted;
///
/// emit!(JobSubmitted { kind: "dataset_import", pipeline: "daily".to_string() });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}

pub use emit;
