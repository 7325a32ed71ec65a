// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{IncludedTest, ReportInput};
use crate::{
    aggregate::ResultKind,
    config::XrayConfig,
    helpers::non_empty_setting,
    metadata,
    plan::{TestNode, TestSource},
    side_channel,
};
use chrono::{DateTime, Utc};
use std::io;
use xray_import::{
    CustomField, Evidence, ExecutionInfo, GENERIC_TEST_TYPE, TestInfo, TestRunStatus,
    XrayReport, XrayTestRun,
};

/// Writes reports in the Xray JSON import format.
#[derive(Clone, Debug)]
pub struct XrayJsonWriter {
    config: XrayConfig,
}

impl XrayJsonWriter {
    /// Creates a new writer with the given Xray settings.
    pub fn new(config: XrayConfig) -> Self {
        Self { config }
    }

    /// Builds the import document for `root`.
    ///
    /// `started` and `finished` are the bounds of the test execution as a whole.
    pub fn build_report(
        &self,
        input: &ReportInput<'_>,
        root: &TestNode,
        started: DateTime<Utc>,
        finished: DateTime<Utc>,
    ) -> XrayReport {
        let clock = input.data.clock();
        let config = &self.config;

        let mut info = ExecutionInfo::new(clock.to_local(started), clock.to_local(finished));
        info.user = non_empty_setting(&config.user);
        info.summary = non_empty_setting(&config.summary);
        info.description = non_empty_setting(&config.description);
        info.project = non_empty_setting(&config.project_key);
        info.version = non_empty_setting(&config.version);
        info.revision = non_empty_setting(&config.revision);
        info.test_plan_key = non_empty_setting(&config.test_plan_key);
        info.test_environments = config
            .test_environments
            .iter()
            .filter(|environment| !environment.is_empty())
            .cloned()
            .collect();

        let mut report = XrayReport::new(info);
        report.test_execution_key = non_empty_setting(&config.test_execution_key);
        report.tests = input
            .included_tests(&root.id)
            .iter()
            .map(|test| self.test_run(input, test))
            .collect();
        report
    }

    /// Builds the import document for `root` and serializes it to `writer`.
    pub fn write(
        &self,
        input: &ReportInput<'_>,
        root: &TestNode,
        started: DateTime<Utc>,
        finished: DateTime<Utc>,
        writer: impl io::Write,
    ) -> serde_json::Result<()> {
        self.build_report(input, root, started, finished)
            .to_writer(writer)
    }

    fn test_run(&self, input: &ReportInput<'_>, test: &IncludedTest<'_>) -> XrayTestRun {
        let IncludedTest { node, result } = test;
        let data = input.data;
        let clock = data.clock();
        let reader = input.reader;

        let test_key = reader.key(node);
        let test_info = match test_key {
            Some(_) => None,
            None => Some(self.test_info(input, node)),
        };

        let status = match result.kind() {
            ResultKind::Success => TestRunStatus::Passed,
            ResultKind::Failure | ResultKind::Error => TestRunStatus::Failed,
            ResultKind::Skipped => TestRunStatus::Todo,
        };

        let entries = data.report_entries(&node.id);
        let skip_reason = input.hierarchy().skip_reason(&node.id);

        XrayTestRun {
            test_key,
            test_info,
            defects: reader.defects(node),
            status: status.as_str(self.config.flavor()).to_owned(),
            start: clock.to_local(data.start_instant(&node.id)),
            finish: clock.to_local(data.end_instant(&node.id)),
            comment: side_channel::comment_with_outcome(&entries, result, skip_reason.as_deref()),
            evidence: side_channel::evidence(&entries)
                .into_iter()
                .map(|file| Evidence {
                    data: file.data,
                    filename: file.file_name,
                    content_type: file.content_type.to_owned(),
                })
                .collect(),
            custom_fields: side_channel::custom_fields(&entries)
                .into_iter()
                .map(|(name, value)| CustomField { name, value })
                .collect(),
        }
    }

    fn test_info(&self, input: &ReportInput<'_>, node: &TestNode) -> TestInfo {
        let reader = input.reader;
        let summary = reader
            .summary(node)
            .or_else(|| reader.description(node))
            .unwrap_or_else(|| metadata::name(node).to_owned());
        let definition = match &node.source {
            Some(TestSource::Method {
                class_name,
                method_name,
            }) => format!("{class_name}.{method_name}"),
            _ => node.id.to_string(),
        };

        TestInfo {
            project_key: non_empty_setting(&self.config.project_key),
            summary: Some(summary),
            ty: GENERIC_TEST_TYPE.to_owned(),
            definition,
            requirement_keys: reader.requirements(node),
            labels: metadata::tags(node)
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}
