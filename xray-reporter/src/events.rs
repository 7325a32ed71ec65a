// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test lifecycle events delivered by the host test framework.

use crate::plan::{NodeId, TestNode};
use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;

/// A lifecycle event for a test plan.
#[derive(Clone, Debug)]
pub enum TestEvent {
    /// A test was registered while the plan was executing.
    DynamicTestRegistered(TestNode),

    /// A node started executing.
    ExecutionStarted(NodeId),

    /// A node was skipped without being started.
    ExecutionSkipped {
        /// The skipped node.
        id: NodeId,

        /// Why the node was skipped.
        reason: Option<String>,
    },

    /// A node finished executing.
    ExecutionFinished {
        /// The node that finished.
        id: NodeId,

        /// The outcome of the execution.
        outcome: TestOutcome,
    },

    /// A node published a report entry.
    ReportingEntryPublished {
        /// The publishing node.
        id: NodeId,

        /// The entry.
        entry: ReportEntry,
    },

    /// Every root of the plan has finished.
    PlanFinished,
}

/// The outcome of a single execution, classified once when the event is received.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestOutcome {
    /// The execution succeeded.
    Success,

    /// An assertion failed.
    AssertionFailure(Throwable),

    /// The execution failed for any other reason.
    Error(Option<Throwable>),

    /// The execution was aborted, e.g. because an assumption did not hold.
    ///
    /// Aborted executions are reported as skipped.
    Aborted(Option<Throwable>),
}

/// A description of an error raised by a test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Throwable {
    /// The fully qualified name of the error type.
    pub type_name: String,

    /// The error message, if any.
    pub message: Option<String>,

    /// The rendered stack trace.
    pub stack_trace: String,
}

impl Throwable {
    /// Creates a new `Throwable` without a stack trace.
    pub fn new(type_name: impl Into<String>, message: Option<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message,
            stack_trace: String::new(),
        }
    }

    /// Sets the stack trace.
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = stack_trace.into();
        self
    }

    /// The text used when an aborted execution is turned into a skip: the stack trace if
    /// present, the message otherwise.
    pub(crate) fn skip_reason(&self) -> String {
        if !self.stack_trace.is_empty() {
            self.stack_trace.clone()
        } else {
            self.message.clone().unwrap_or_default()
        }
    }
}

/// The classification of a recorded execution.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum RecordKind {
    /// The execution succeeded.
    Success,

    /// An assertion failed.
    Failure,

    /// The execution failed for another reason.
    Error,
}

/// One recorded, non-aborted execution of a node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionRecord {
    /// How the execution ended.
    pub kind: RecordKind,

    /// The error raised, if any.
    pub throwable: Option<Throwable>,
}

impl ExecutionRecord {
    /// Converts an outcome into a record. Returns `None` for aborted executions.
    pub fn from_outcome(outcome: TestOutcome) -> Option<Self> {
        let (kind, throwable) = match outcome {
            TestOutcome::Success => (RecordKind::Success, None),
            TestOutcome::AssertionFailure(throwable) => (RecordKind::Failure, Some(throwable)),
            TestOutcome::Error(throwable) => (RecordKind::Error, throwable),
            TestOutcome::Aborted(_) => return None,
        };
        Some(Self { kind, throwable })
    }
}

/// A timestamped, ordered set of key/value pairs published by a test.
///
/// Entries are immutable once created.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportEntry {
    timestamp: NaiveDateTime,
    pairs: IndexMap<String, String>,
}

impl ReportEntry {
    /// Creates a new entry with the given local timestamp.
    pub fn new(
        timestamp: NaiveDateTime,
        pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        Self {
            timestamp,
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Creates a new entry timestamped with the current local time.
    pub fn now(pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self::new(Local::now().naive_local(), pairs)
    }

    /// Creates a new entry with a single pair, timestamped with the current local time.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::now([(key.into(), value.into())])
    }

    /// The local time at which the entry was published.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// The pairs of this entry, in publish order.
    pub fn pairs(&self) -> &IndexMap<String, String> {
        &self.pairs
    }

    /// Returns the value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }
}
