// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event store: per-node lifecycle facts recorded while a test plan executes.

use crate::{
    events::{ExecutionRecord, ReportEntry, TestOutcome},
    plan::NodeId,
};
use chrono::{DateTime, FixedOffset, Local, TimeDelta, Utc};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tracing::debug;

/// A source of the current time.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Converts an instant to the local time zone used in reports.
    fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset>;
}

/// The system clock, reporting in the system's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&Local).fixed_offset()
    }
}

/// A clock that only moves when told to, reporting in a fixed offset.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl ManualClock {
    /// Creates a new clock starting at `now`.
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now: Mutex::new(now),
            offset,
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        // Saturates at the latest representable instant.
        *now = TimeDelta::from_std(by)
            .ok()
            .and_then(|by| now.checked_add_signed(by))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }
}

#[derive(Clone, Debug, Default)]
struct NodeRecord {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    skip_reason: Option<String>,
    records: Vec<ExecutionRecord>,
    entries: Vec<ReportEntry>,
}

/// Lifecycle facts for every node of a running test plan.
///
/// Every operation takes `&self` and may be called from any thread. A node is initialized on
/// first write; none of the operations fail.
#[derive(Debug)]
pub struct ReportData {
    nodes: Mutex<HashMap<NodeId, NodeRecord>>,
    clock: Arc<dyn Clock>,
}

impl ReportData {
    /// Creates an empty store.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// The clock used to timestamp events.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Records the current time as the start of the node. A second call overwrites the first.
    pub fn mark_started(&self, id: &NodeId) {
        let now = self.clock.now();
        self.with_node(id, |record| record.start = Some(now));
    }

    /// Marks the node as skipped. An absent reason is stored as the empty string.
    pub fn mark_skipped(&self, id: &NodeId, reason: Option<String>) {
        self.with_node(id, |record| {
            record.skip_reason = Some(reason.unwrap_or_default());
        });
    }

    /// Records the end of the node's execution.
    ///
    /// An aborted execution marks the node as skipped instead of being recorded.
    pub fn mark_finished(&self, id: &NodeId, outcome: TestOutcome) {
        let now = self.clock.now();
        self.with_node(id, |record| {
            record.end = Some(now);
            match outcome {
                TestOutcome::Aborted(throwable) => {
                    let reason = throwable
                        .as_ref()
                        .map(|throwable| throwable.skip_reason())
                        .unwrap_or_default();
                    debug!("execution of {id} aborted, recording as skipped");
                    record.skip_reason = Some(reason);
                }
                outcome => {
                    record.records.extend(ExecutionRecord::from_outcome(outcome));
                }
            }
        });
    }

    /// Appends a report entry for the node.
    pub fn add_report_entry(&self, id: &NodeId, entry: ReportEntry) {
        self.with_node(id, |record| record.entries.push(entry));
    }

    /// The start instant, or the Unix epoch if the node never started.
    pub fn start_instant(&self, id: &NodeId) -> DateTime<Utc> {
        self.read_node(id, |record| record.and_then(|record| record.start))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// The end instant, or the start instant if the node never finished.
    pub fn end_instant(&self, id: &NodeId) -> DateTime<Utc> {
        self.read_node(id, |record| record.and_then(|record| record.end))
            .unwrap_or_else(|| self.start_instant(id))
    }

    /// The time between start and end. Never negative.
    pub fn duration(&self, id: &NodeId) -> Duration {
        (self.end_instant(id) - self.start_instant(id))
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// The skip reason recorded for this node itself, if it was skipped.
    pub fn own_skip_reason(&self, id: &NodeId) -> Option<String> {
        self.read_node(id, |record| record.and_then(|record| record.skip_reason.clone()))
    }

    /// The executions recorded for this node itself, in order.
    pub fn own_records(&self, id: &NodeId) -> Vec<ExecutionRecord> {
        self.read_node(id, |record| {
            record.map(|record| record.records.clone()).unwrap_or_default()
        })
    }

    /// The report entries published by this node, in publish order.
    pub fn report_entries(&self, id: &NodeId) -> Vec<ReportEntry> {
        self.read_node(id, |record| {
            record.map(|record| record.entries.clone()).unwrap_or_default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NodeId, NodeRecord>> {
        // The map is only ever mutated through simple assignments and pushes, so its state is
        // consistent even if a holder panicked.
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_node(&self, id: &NodeId, f: impl FnOnce(&mut NodeRecord)) {
        let mut nodes = self.lock();
        f(nodes.entry(id.clone()).or_default());
    }

    fn read_node<T>(&self, id: &NodeId, f: impl FnOnce(Option<&NodeRecord>) -> T) -> T {
        let nodes = self.lock();
        f(nodes.get(id))
    }
}
