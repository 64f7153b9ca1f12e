//! Metrics sink boundary.
//!
//! Pipeline logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the thread-local metrics state.
use crate::obs::metrics::{self, EventReport};
use derive_more::Display;
use serde::Serialize;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = const { RefCell::new(None) };
}

///
/// PipelineKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    #[display("aggregate")]
    Aggregate,
    #[display("refactor")]
    Refactor,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    RunStart { kind: PipelineKind },
    RunFailed { kind: PipelineKind },
    FeaturesRead { kind: PipelineKind, count: u64 },
    GroupsCreated { count: u64 },
    FeaturesWritten { kind: PipelineKind, count: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::RunStart { kind } => {
                m.ops.runs = m.ops.runs.saturating_add(1);
                let entry = m.pipelines.entry(kind.to_string()).or_default();
                entry.runs = entry.runs.saturating_add(1);
            }
            MetricsEvent::RunFailed { kind } => {
                m.ops.runs_failed = m.ops.runs_failed.saturating_add(1);
                let entry = m.pipelines.entry(kind.to_string()).or_default();
                entry.runs_failed = entry.runs_failed.saturating_add(1);
            }
            MetricsEvent::FeaturesRead { kind, count } => {
                m.ops.features_read = m.ops.features_read.saturating_add(count);
                let entry = m.pipelines.entry(kind.to_string()).or_default();
                entry.features_read = entry.features_read.saturating_add(count);
            }
            MetricsEvent::GroupsCreated { count } => {
                m.ops.groups_created = m.ops.groups_created.saturating_add(count);
            }
            MetricsEvent::FeaturesWritten { kind, count } => {
                m.ops.features_written = m.ops.features_written.saturating_add(count);
                let entry = m.pipelines.entry(kind.to_string()).or_default();
                entry.features_written = entry.features_written.saturating_add(count);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`,
        //   which restores the previous slot on every exit (including unwind).
        // - `record` is synchronous and never stores `ptr` beyond this call.
        // - Only a shared reference is materialized.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all metrics counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope; `Guard` restores
    //   the previous slot on all exits, including panic.
    // - `record` dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

/// RunSpan
/// RAII guard that records the start of one pipeline run and records a
/// failure unless the run is marked successful before it drops.

pub(crate) struct RunSpan {
    kind: PipelineKind,
    succeeded: bool,
}

impl RunSpan {
    #[must_use]
    pub(crate) fn new(kind: PipelineKind) -> Self {
        record(MetricsEvent::RunStart { kind });

        Self {
            kind,
            succeeded: false,
        }
    }

    pub(crate) fn succeed(mut self) {
        self.succeeded = true;
    }
}

impl Drop for RunSpan {
    fn drop(&mut self) {
        if !self.succeeded {
            record(MetricsEvent::RunFailed { kind: self.kind });
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        panic::{AssertUnwindSafe, catch_unwind},
        sync::atomic::{AtomicUsize, Ordering},
    };

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        with_metrics_sink(&outer, || {
            record(MetricsEvent::GroupsCreated { count: 1 });
            with_metrics_sink(&inner, || {
                record(MetricsEvent::GroupsCreated { count: 1 });
            });
            record(MetricsEvent::GroupsCreated { count: 1 });
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(MetricsEvent::GroupsCreated { count: 1 });
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();

        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn run_span_records_failure_unless_marked_successful() {
        metrics_reset_all();

        RunSpan::new(PipelineKind::Aggregate).succeed();
        drop(RunSpan::new(PipelineKind::Refactor));

        let report = metrics_report();
        assert_eq!(report.ops.runs, 2);
        assert_eq!(report.ops.runs_failed, 1);
        assert_eq!(report.pipelines["refactor"].runs_failed, 1);
        assert_eq!(report.pipelines["aggregate"].runs_failed, 0);
    }
}
