use serde::Serialize;
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory run counters.
///

#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct EventState {
    pub ops: EventOps,
    pub pipelines: BTreeMap<String, PipelineCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Pipeline entrypoints
    pub runs: u64,
    pub runs_failed: u64,

    // Features touched
    pub features_read: u64,
    pub groups_created: u64,
    pub features_written: u64,
}

///
/// PipelineCounters
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PipelineCounters {
    pub runs: u64,
    pub runs_failed: u64,
    pub features_read: u64,
    pub features_written: u64,
}

///
/// EventReport
/// Point-in-time snapshot of the counters.
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub pipelines: BTreeMap<String, PipelineCounters>,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Snapshot the current counters.
#[must_use]
pub(crate) fn report() -> EventReport {
    with_state(|m| EventReport {
        ops: m.ops.clone(),
        pipelines: m.pipelines.clone(),
    })
}
