// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reduction of the execution records of a node to a single result.

use crate::events::{ExecutionRecord, RecordKind, Throwable};
use std::fmt;

/// The aggregated result of a node, ordered by severity.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ResultKind {
    /// Every execution succeeded, or nothing was recorded.
    Success,

    /// The node or one of its ancestors was skipped.
    Skipped,

    /// At least one assertion failed.
    Failure,

    /// At least one execution failed with an error other than an assertion failure.
    Error,
}

impl From<RecordKind> for ResultKind {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Success => ResultKind::Success,
            RecordKind::Failure => ResultKind::Failure,
            RecordKind::Error => ResultKind::Error,
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResultKind::Success => "success",
            ResultKind::Skipped => "skipped",
            ResultKind::Failure => "failure",
            ResultKind::Error => "error",
        };
        f.write_str(s)
    }
}

/// The result of a node across every recorded execution of it and its ancestors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregatedTestResult {
    kind: ResultKind,
    records: Vec<ExecutionRecord>,
}

impl AggregatedTestResult {
    /// A skipped result. Skips dominate any recorded executions.
    pub fn skipped() -> Self {
        Self {
            kind: ResultKind::Skipped,
            records: vec![],
        }
    }

    /// The most severe of the given records, or success if there are none.
    pub fn non_skipped(records: Vec<ExecutionRecord>) -> Self {
        let kind = records
            .iter()
            .map(|record| ResultKind::from(record.kind))
            .max()
            .unwrap_or(ResultKind::Success);
        Self { kind, records }
    }

    /// The aggregated kind.
    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    /// The throwables of records of the given kind, in record order. Records without a
    /// throwable are included as `None`.
    pub fn throwables_by_kind(&self, kind: RecordKind) -> Vec<Option<&Throwable>> {
        self.records
            .iter()
            .filter(|record| record.kind == kind)
            .map(|record| record.throwable.as_ref())
            .collect()
    }

    /// Every failure then every error, each in record order.
    pub fn failures(&self) -> impl Iterator<Item = (RecordKind, Option<&Throwable>)> + '_ {
        [RecordKind::Failure, RecordKind::Error]
            .into_iter()
            .flat_map(move |kind| {
                self.throwables_by_kind(kind)
                    .into_iter()
                    .map(move |throwable| (kind, throwable))
            })
    }
}

/// Per-kind counts for a set of results.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ResultCounts {
    /// The total number of results.
    pub tests: usize,

    /// The number of skipped results.
    pub skipped: usize,

    /// The number of failed results.
    pub failures: usize,

    /// The number of errored results.
    pub errors: usize,
}

impl ResultCounts {
    /// Adds a result.
    pub fn add(&mut self, kind: ResultKind) {
        self.tests += 1;
        match kind {
            ResultKind::Success => {}
            ResultKind::Skipped => self.skipped += 1,
            ResultKind::Failure => self.failures += 1,
            ResultKind::Error => self.errors += 1,
        }
    }
}

impl<'a> FromIterator<&'a AggregatedTestResult> for ResultCounts {
    fn from_iter<T: IntoIterator<Item = &'a AggregatedTestResult>>(iter: T) -> Self {
        let mut counts = Self::default();
        for result in iter {
            counts.add(result.kind());
        }
        counts
    }
}
