//! Observability: run counters, the metrics sink boundary, and progress
//! reporting.
//!
//! Pipelines never touch counter state directly; instrumentation flows
//! through `MetricsEvent` and `MetricsSink`.

pub(crate) mod metrics;
pub(crate) mod progress;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, PipelineCounters};
pub use progress::{NoProgress, ProgressLog, ProgressSink};
pub use sink::{MetricsEvent, MetricsSink, PipelineKind, metrics_report, metrics_reset_all};
