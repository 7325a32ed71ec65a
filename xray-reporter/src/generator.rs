// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The entry point for hosts: turns lifecycle events into report files.

use crate::{
    config::{ReportConfig, ReportFormat},
    errors::{DisplayErrorChain, WriteReportError},
    events::{ReportEntry, TestEvent},
    helpers::non_empty_setting,
    metadata::TestMetadataReader,
    plan::{NodeId, TestNode, TestPlan},
    side_channel::{EntryPublisher, TestRunReporter},
    store::{Clock, ReportData},
    writer::{LegacyXmlWriter, ReportInput, XrayJsonWriter},
};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use std::{
    fs::File,
    io::{BufWriter, Write},
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use swrite::{SWrite, swrite};
use tracing::{debug, error};

/// Records lifecycle events for a test plan and writes a report whenever a report root is done.
///
/// A report root is a node without a parent. With
/// [`reports_per_class`](ReportConfig::reports_per_class) set, it is instead a node whose
/// parent has no parent, typically a test class below an engine.
///
/// Every method takes `&self`, so a generator can be shared between the threads that deliver
/// events. Failures to write a report are logged and never surface to the caller.
#[derive(Debug)]
pub struct ReportGenerator {
    config: ReportConfig,
    plan: RwLock<TestPlan>,
    data: ReportData,
    reader: Arc<dyn TestMetadataReader>,
    xml_writer: LegacyXmlWriter,
    json_writer: XrayJsonWriter,
    plan_started: DateTime<Utc>,
    plan_finished: Mutex<Option<DateTime<Utc>>>,
}

impl ReportGenerator {
    /// Creates a generator for the given plan. The plan is considered started at this point.
    pub fn new(
        config: ReportConfig,
        plan: TestPlan,
        reader: Arc<dyn TestMetadataReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let plan_started = clock.now();
        debug!(
            "reporting on {} root(s) to {}",
            plan.roots().count(),
            config.report_directory,
        );
        let json_writer = XrayJsonWriter::new(config.xray.clone());
        Self {
            config,
            plan: RwLock::new(plan),
            data: ReportData::new(clock),
            reader,
            xml_writer: LegacyXmlWriter::new(),
            json_writer,
            plan_started,
            plan_finished: Mutex::new(None),
        }
    }

    /// Replaces the writer used for legacy XML reports, e.g. to set the host name.
    pub fn with_xml_writer(mut self, xml_writer: LegacyXmlWriter) -> Self {
        self.xml_writer = xml_writer;
        self
    }

    /// The configuration of this generator.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// The events recorded so far.
    pub fn data(&self) -> &ReportData {
        &self.data
    }

    /// Returns a reporter that publishes test run data for the given node.
    pub fn reporter_for(&self, id: impl Into<NodeId>) -> TestRunReporter<NodePublisher<'_>> {
        TestRunReporter::new(NodePublisher {
            generator: self,
            id: id.into(),
        })
    }

    /// Records an event. If the event completes a report root, the report for that root is
    /// written before returning.
    pub fn write_event(&self, event: TestEvent) {
        match event {
            TestEvent::DynamicTestRegistered(node) => {
                debug!("dynamic test registered: {}", node.id);
                if let Err(err) = self.plan_mut().add(node) {
                    error!(
                        "failed to register dynamic test: {}",
                        DisplayErrorChain::new(err)
                    );
                }
            }
            TestEvent::ExecutionStarted(id) => {
                debug!("execution started: {id}");
                self.data.mark_started(&id);
            }
            TestEvent::ExecutionSkipped { id, reason } => {
                debug!("execution skipped: {id}");
                self.data.mark_skipped(&id, reason);
                self.report_if_root(&id);
            }
            TestEvent::ExecutionFinished { id, outcome } => {
                debug!("execution finished: {id}");
                self.data.mark_finished(&id, outcome);
                self.report_if_root(&id);
            }
            TestEvent::ReportingEntryPublished { id, entry } => {
                debug!("report entry published: {id}");
                self.data.add_report_entry(&id, entry);
            }
            TestEvent::PlanFinished => {
                let now = self.data.clock().now();
                *self
                    .plan_finished
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(now);
            }
        }
    }

    /// Returns true if a report is written when the given node is done.
    pub fn is_report_root(&self, node: &TestNode) -> bool {
        is_report_root(&self.plan(), node, self.config.reports_per_class)
    }

    /// The file name of the report for `root`, generated at `now`.
    pub fn report_file_name(&self, root: &TestNode, now: DateTime<Utc>) -> String {
        let mut name = match non_empty_setting(&self.config.report_filename) {
            Some(report_filename) => report_filename,
            None => {
                let root_name = if self.config.reports_per_class {
                    root.legacy_reporting_name.as_str()
                } else {
                    root.id.root_name()
                };
                format!("TEST-{root_name}")
            }
        };
        if self.config.add_timestamp_to_report_filename {
            let local = self.data.clock().to_local(now);
            swrite!(name, "-{}", local.format("%Y_%m_%d-%H_%M_%S_%3f"));
        }
        format!("{name}.{}", self.config.format.extension())
    }

    fn report_if_root(&self, id: &NodeId) {
        let plan = self.plan();
        let Some(node) = plan.get(id) else {
            debug!("ignoring event for unknown node {id}");
            return;
        };
        if !is_report_root(&plan, node, self.config.reports_per_class) {
            return;
        }

        match self.write_report(&plan, node) {
            Ok(path) => debug!("wrote report for {id} to {path}"),
            Err(err) => error!(
                "failed to write report for {id}: {}",
                DisplayErrorChain::new(err)
            ),
        }
    }

    fn write_report(
        &self,
        plan: &TestPlan,
        root: &TestNode,
    ) -> Result<Utf8PathBuf, WriteReportError> {
        let now = self.data.clock().now();
        let input = ReportInput {
            plan,
            data: &self.data,
            reader: &*self.reader,
            report_only_annotated_tests: self.config.report_only_annotated_tests,
        };
        let report_dir = &self.config.report_directory;
        std::fs::create_dir_all(report_dir).map_err(|error| WriteReportError::Fs {
            file: report_dir.clone(),
            error,
        })?;

        let report_path = report_dir.join(self.report_file_name(root, now));
        let f = File::create(&report_path).map_err(|error| WriteReportError::Fs {
            file: report_path.clone(),
            error,
        })?;
        let mut writer = BufWriter::new(f);

        match self.config.format {
            ReportFormat::LegacyXml => self
                .xml_writer
                .write(&input, root, now, &mut writer)
                .map_err(|error| WriteReportError::Xml {
                    file: report_path.clone(),
                    error,
                })?,
            ReportFormat::XrayJson => {
                let finished = self
                    .plan_finished
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .unwrap_or(now);
                self.json_writer
                    .write(&input, root, self.plan_started, finished, &mut writer)
                    .map_err(|error| WriteReportError::Json {
                        file: report_path.clone(),
                        error,
                    })?
            }
        }

        writer.flush().map_err(|error| WriteReportError::Fs {
            file: report_path.clone(),
            error,
        })?;
        Ok(report_path)
    }

    fn plan(&self) -> RwLockReadGuard<'_, TestPlan> {
        self.plan.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn plan_mut(&self) -> RwLockWriteGuard<'_, TestPlan> {
        self.plan.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_report_root(plan: &TestPlan, node: &TestNode, reports_per_class: bool) -> bool {
    match (&node.parent, reports_per_class) {
        (None, false) => true,
        (Some(parent), true) => plan.is_root(parent),
        _ => false,
    }
}

/// Publishes report entries for one node of a [`ReportGenerator`].
#[derive(Clone, Debug)]
pub struct NodePublisher<'a> {
    generator: &'a ReportGenerator,
    id: NodeId,
}

impl EntryPublisher for NodePublisher<'_> {
    fn publish(&self, entry: ReportEntry) {
        self.generator.write_event(TestEvent::ReportingEntryPublished {
            id: self.id.clone(),
            entry,
        });
    }
}
