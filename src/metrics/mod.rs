//! Metrics module - API call history, host resource samples, derived statistics and CSV export

pub mod csv;
pub mod recorder;
pub mod system;

pub use recorder::{
    Alert, AlertLevel, ApiCallSample, CallAnnotation, EndpointStats, MetricsRecorder,
    MetricsSummary,
};
pub use system::{spawn_system_sampler, SystemSample, SystemSampler};
