// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{IncludedTest, ReportInput};
use crate::{
    aggregate::ResultKind,
    events::{RecordKind, ReportEntry},
    metadata,
    plan::TestNode,
    side_channel,
};
use chrono::{DateTime, Timelike, Utc};
use std::io;
use xray_junit::{
    NonSuccess, NonSuccessKind, Property, PropertyItem, SerializeError, TestCase, TestCaseStatus,
    TestSuite,
};

/// Used when the host name can't be determined.
const UNKNOWN_HOST: &str = "<unknown host>";

/// Writes Ant-style JUnit XML reports with Xray properties.
#[derive(Clone, Debug)]
pub struct LegacyXmlWriter {
    hostname: String,
    properties: Vec<(String, String)>,
}

impl Default for LegacyXmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyXmlWriter {
    /// Creates a writer for the current host.
    ///
    /// The suite-level properties describe the platform the tests ran on.
    pub fn new() -> Self {
        let properties = [
            ("os.arch", std::env::consts::ARCH),
            ("os.family", std::env::consts::FAMILY),
            ("os.name", std::env::consts::OS),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect();

        Self {
            hostname: whoami::hostname()
                .ok()
                .unwrap_or_else(|| UNKNOWN_HOST.to_owned()),
            properties,
        }
    }

    /// Overrides the host name.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Replaces the suite-level properties. They are written sorted by name.
    pub fn with_properties(
        mut self,
        properties: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.properties = properties
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self
    }

    /// Builds the test suite for `root`, generated at `now`.
    pub fn build_suite(
        &self,
        input: &ReportInput<'_>,
        root: &TestNode,
        now: DateTime<Utc>,
    ) -> TestSuite {
        let tests = input.included_tests(&root.id);

        let mut suite = TestSuite::new(root.display_name.clone());
        let mut properties = self.properties.clone();
        properties.sort();
        let timestamp = input.data.clock().to_local(now).naive_local();
        suite
            .set_time(input.data.duration(&root.id))
            .set_hostname(self.hostname.clone())
            .set_timestamp(timestamp.with_nanosecond(0).unwrap_or(timestamp))
            .add_properties(properties)
            .add_test_cases(tests.iter().map(|test| build_test_case(input, test)))
            .set_system_out(non_standard_attributes(root));
        suite
    }

    /// Builds the test suite for `root` and serializes it to `writer`.
    pub fn write(
        &self,
        input: &ReportInput<'_>,
        root: &TestNode,
        now: DateTime<Utc>,
        writer: impl io::Write,
    ) -> Result<(), SerializeError> {
        self.build_suite(input, root, now).serialize(writer)
    }
}

fn build_test_case(input: &ReportInput<'_>, test: &IncludedTest<'_>) -> TestCase {
    let IncludedTest { node, result } = test;
    let data = input.data;

    let status = match result.kind() {
        ResultKind::Success => TestCaseStatus::success(),
        ResultKind::Skipped => TestCaseStatus::skipped(input.hierarchy().skip_reason(&node.id)),
        ResultKind::Failure | ResultKind::Error => {
            TestCaseStatus::non_success(result.failures().map(|(kind, throwable)| {
                let kind = match kind {
                    RecordKind::Error => NonSuccessKind::Error,
                    RecordKind::Failure | RecordKind::Success => NonSuccessKind::Failure,
                };
                let mut non_success = NonSuccess::new(kind);
                if let Some(throwable) = throwable {
                    if let Some(message) = &throwable.message {
                        non_success.set_message(message.clone());
                    }
                    non_success
                        .set_type(throwable.type_name.clone())
                        .set_description(throwable.stack_trace.clone());
                }
                non_success
            }))
        }
    };

    let mut test_case = TestCase::new(metadata::name(node), status);
    test_case
        .set_classname(metadata::class_name(input.plan, node))
        .set_time(data.duration(&node.id))
        .set_started_finished(
            data.start_instant(&node.id).naive_utc(),
            data.end_instant(&node.id).naive_utc(),
        );

    let entries = data.report_entries(&node.id);
    let captured = side_channel::captured_output(&entries);
    test_case.add_system_out(non_standard_attributes(node));
    if let Some(report_entries) = captured.report_entries {
        test_case.add_system_out(report_entries);
    }
    for stdout in captured.stdout {
        test_case.add_system_out(stdout);
    }
    for stderr in captured.stderr {
        test_case.add_system_err(stderr);
    }

    for property in test_properties(input, node, &entries) {
        test_case.add_property(property);
    }
    test_case
}

fn test_properties(
    input: &ReportInput<'_>,
    node: &TestNode,
    entries: &[ReportEntry],
) -> Vec<Property> {
    let reader = input.reader;
    let mut properties = vec![];

    let comment = side_channel::comments(entries);
    if !comment.is_empty() {
        properties.push(Property::cdata("testrun_comment", comment));
    }

    let requirements = reader.requirements(node);
    if !requirements.is_empty() {
        properties.push(Property::simple("requirements", requirements.join(",")));
    }
    if let Some(key) = reader.key(node) {
        properties.push(Property::simple("test_key", key));
    }
    if let Some(id) = reader.id(node) {
        properties.push(Property::simple("test_id", id));
    }
    if let Some(description) = reader.description(node) {
        properties.push(Property::cdata("test_description", description));
    }
    if let Some(summary) = reader.summary(node) {
        properties.push(Property::simple("test_summary", summary));
    }

    let tags = metadata::tags(node);
    if !tags.is_empty() {
        properties.push(Property::simple("tags", tags.join(",")));
    }

    let custom_fields = side_channel::custom_fields(entries);
    if !custom_fields.is_empty() {
        properties.push(Property::items(
            "testrun_customfields",
            custom_fields
                .into_iter()
                .map(|(name, value)| PropertyItem::cdata(name, value)),
        ));
    }

    let evidence = side_channel::evidence(entries);
    if !evidence.is_empty() {
        properties.push(Property::items(
            "testrun_evidence",
            evidence
                .into_iter()
                .map(|file| PropertyItem::text(file.file_name, file.data)),
        ));
    }

    properties
}

fn non_standard_attributes(node: &TestNode) -> String {
    format!(
        "unique-id: {}\ndisplay-name: {}",
        node.id, node.display_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::{TestOutcome, Throwable},
        metadata::DefaultTestMetadataReader,
        plan::{TestAnnotations, TestPlan, TestSource, XrayTestAnnotation},
        store::{Clock, ManualClock, ReportData},
    };
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::{sync::Arc, time::Duration};

    const ENGINE: &str = "[engine:junit-jupiter]";
    const CLASS: &str = "[engine:junit-jupiter]/[class:com.example.CalcTest]";
    const ADD: &str = "[engine:junit-jupiter]/[class:com.example.CalcTest]/[method:add(int, int)]";
    const DIVIDE: &str = "[engine:junit-jupiter]/[class:com.example.CalcTest]/[method:divide()]";

    fn plan() -> TestPlan {
        TestPlan::from_nodes([
            TestNode::container(ENGINE, "JUnit Jupiter"),
            TestNode::container(CLASS, "CalcTest")
                .with_parent(ENGINE)
                .with_legacy_reporting_name("com.example.CalcTest")
                .with_source(TestSource::Class {
                    class_name: "com.example.CalcTest".to_owned(),
                }),
            TestNode::test(ADD, "add(int, int)")
                .with_parent(CLASS)
                .with_tags(["smoke", " math "])
                .with_source(TestSource::Method {
                    class_name: "com.example.CalcTest".to_owned(),
                    method_name: "add".to_owned(),
                })
                .with_annotations(TestAnnotations {
                    xray_test: Some(XrayTestAnnotation {
                        key: "CALC-2".to_owned(),
                        summary: "adds numbers".to_owned(),
                        description: "checks addition".to_owned(),
                        ..Default::default()
                    }),
                    requirements: vec!["CALC-1".to_owned(), "CALC-7".to_owned()],
                    ..Default::default()
                }),
            TestNode::test(DIVIDE, "divide()").with_parent(CLASS),
        ])
        .expect("plan is valid")
    }

    #[test]
    fn suite_for_engine_root() {
        let plan = plan();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2021, 3, 24, 12, 0, 0).unwrap(),
            FixedOffset::east_opt(3600).unwrap(),
        ));
        let data = ReportData::new(clock.clone());
        let timestamp = NaiveDate::from_ymd_opt(2021, 3, 24)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap();

        data.mark_started(&ENGINE.into());
        data.mark_started(&ADD.into());
        data.add_report_entry(
            &ADD.into(),
            ReportEntry::new(
                timestamp,
                [
                    (side_channel::TESTRUN_COMMENT, "computed twice"),
                    ("xray:testrun_customfield:Browser", "Firefox"),
                    ("seed", "42"),
                ],
            ),
        );
        data.add_report_entry(&ADD.into(), ReportEntry::new(timestamp, [("stdout", "1 + 1")]));
        clock.advance(Duration::from_millis(250));
        data.mark_finished(&ADD.into(), TestOutcome::Success);
        data.mark_started(&DIVIDE.into());
        clock.advance(Duration::from_millis(1000));
        data.mark_finished(
            &DIVIDE.into(),
            TestOutcome::Error(Some(
                Throwable::new("java.lang.ArithmeticException", Some("/ by zero".to_owned()))
                    .with_stack_trace("java.lang.ArithmeticException: / by zero"),
            )),
        );
        data.mark_finished(&ENGINE.into(), TestOutcome::Success);

        let input = ReportInput {
            plan: &plan,
            data: &data,
            reader: &DefaultTestMetadataReader,
            report_only_annotated_tests: false,
        };
        let writer = LegacyXmlWriter::new()
            .with_hostname("build-01")
            .with_properties([("os.name", "linux"), ("file.encoding", "UTF-8")]);
        let root = plan.get(&ENGINE.into()).unwrap();
        let suite = writer.build_suite(&input, root, clock.now());
        let xml = suite.to_string().unwrap();

        assert_eq!(
            xml,
            indoc! {r#"
                <?xml version="1.0" encoding="UTF-8"?>
                <testsuite name="JUnit Jupiter" tests="2" skipped="0" failures="0" errors="1" time="1.25" hostname="build-01" timestamp="2021-03-24T13:00:01">
                <properties>
                <property name="file.encoding" value="UTF-8"/>
                <property name="os.name" value="linux"/>
                </properties>
                <testcase name="add" classname="com.example.CalcTest" time="0.25" started-at="2021-03-24T12:00:00" finished-at="2021-03-24T12:00:00.25">
                <system-out><![CDATA[
                unique-id: [engine:junit-jupiter]/[class:com.example.CalcTest]/[method:add(int, int)]
                display-name: add(int, int)
                ]]></system-out>
                <system-out><![CDATA[
                Report Entry #1 (timestamp: 2021-03-24T13:00:00)
                	- seed: 42
                ]]></system-out>
                <system-out><![CDATA[
                1 + 1
                ]]></system-out>
                <properties>
                <property name="testrun_comment"><![CDATA[computed twice]]></property>
                <property name="requirements" value="CALC-1,CALC-7"/>
                <property name="test_key" value="CALC-2"/>
                <property name="test_description"><![CDATA[checks addition]]></property>
                <property name="test_summary" value="adds numbers"/>
                <property name="tags" value="smoke,math"/>
                <property name="testrun_customfields">
                <item name="Browser"><![CDATA[Firefox]]></item>
                </property>
                <property name="_dummy_" value=""/>
                </properties>
                </testcase>
                <testcase name="divide" classname="com.example.CalcTest" time="1" started-at="2021-03-24T12:00:00.25" finished-at="2021-03-24T12:00:01.25">
                <error message="/ by zero" type="java.lang.ArithmeticException"><![CDATA[java.lang.ArithmeticException: / by zero]]></error>
                <system-out><![CDATA[
                unique-id: [engine:junit-jupiter]/[class:com.example.CalcTest]/[method:divide()]
                display-name: divide()
                ]]></system-out>
                <properties>
                <property name="_dummy_" value=""/>
                </properties>
                </testcase>
                <system-out><![CDATA[
                unique-id: [engine:junit-jupiter]
                display-name: JUnit Jupiter
                ]]></system-out>
                </testsuite>
            "#}
        );
    }
}
