// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino_tempfile::Utf8TempDir;
use chrono::{FixedOffset, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::{sync::Arc, thread, time::Duration};
use xray_import::{TestRunStatus, XrayReport};
use xray_reporter::{
    config::{ReportConfig, ReportFormat, XrayConfig},
    events::{TestEvent, TestOutcome, Throwable},
    generator::ReportGenerator,
    metadata::{DefaultTestMetadataReader, XrayUri},
    plan::{TestAnnotations, TestNode, TestPlan, TestSource, XrayTestAnnotation},
    store::{ManualClock, SystemClock},
    writer::LegacyXmlWriter,
};

const ENGINE: &str = "[engine:junit-jupiter]";
const CALC: &str = "[engine:junit-jupiter]/[class:com.example.CalcTest]";
const ADD: &str = "[engine:junit-jupiter]/[class:com.example.CalcTest]/[method:add()]";
const DIVIDE: &str = "[engine:junit-jupiter]/[class:com.example.CalcTest]/[method:divide()]";
const LEGACY: &str = "[engine:junit-jupiter]/[class:com.example.LegacyTest]";
const OLD: &str = "[engine:junit-jupiter]/[class:com.example.LegacyTest]/[method:old()]";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn class(id: &str, name: &str) -> TestNode {
    TestNode::container(id, name.rsplit('.').next().unwrap_or(name))
        .with_parent(ENGINE)
        .with_legacy_reporting_name(name)
        .with_source(TestSource::Class {
            class_name: name.to_owned(),
        })
}

fn method(id: &str, parent: &str, class_name: &str, method_name: &str) -> TestNode {
    TestNode::test(id, format!("{method_name}()"))
        .with_parent(parent)
        .with_source(TestSource::Method {
            class_name: class_name.to_owned(),
            method_name: method_name.to_owned(),
        })
}

fn plan() -> TestPlan {
    TestPlan::from_nodes([
        TestNode::container(ENGINE, "JUnit Jupiter"),
        class(CALC, "com.example.CalcTest"),
        method(ADD, CALC, "com.example.CalcTest", "add").with_annotations(TestAnnotations {
            xray_test: Some(XrayTestAnnotation {
                key: "CALC-2".to_owned(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        method(DIVIDE, CALC, "com.example.CalcTest", "divide"),
        class(LEGACY, "com.example.LegacyTest"),
        method(OLD, LEGACY, "com.example.LegacyTest", "old"),
    ])
    .expect("plan is valid")
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2021, 3, 24, 12, 0, 0).unwrap(),
        FixedOffset::east_opt(0).unwrap(),
    ))
}

fn run_plan(generator: &ReportGenerator, clock: &ManualClock) {
    generator.write_event(TestEvent::ExecutionStarted(ENGINE.into()));

    generator.write_event(TestEvent::ExecutionStarted(CALC.into()));
    generator.write_event(TestEvent::ExecutionStarted(ADD.into()));
    clock.advance(Duration::from_secs(1));
    generator.write_event(TestEvent::ExecutionFinished {
        id: ADD.into(),
        outcome: TestOutcome::Success,
    });
    generator.write_event(TestEvent::ExecutionStarted(DIVIDE.into()));
    let reporter = generator.reporter_for(DIVIDE);
    reporter.add_comment("dividing by zero");
    reporter.set_custom_field_values("Cities", &["P;orto;", "Lis\\bon\\"]);
    clock.advance(Duration::from_secs(1));
    generator.write_event(TestEvent::ExecutionFinished {
        id: DIVIDE.into(),
        outcome: TestOutcome::AssertionFailure(
            Throwable::new("java.lang.AssertionError", Some("expected 0".to_owned()))
                .with_stack_trace("java.lang.AssertionError: expected 0"),
        ),
    });
    generator.write_event(TestEvent::ExecutionFinished {
        id: CALC.into(),
        outcome: TestOutcome::Success,
    });

    generator.write_event(TestEvent::ExecutionSkipped {
        id: LEGACY.into(),
        reason: Some("disabled".to_owned()),
    });

    generator.write_event(TestEvent::PlanFinished);
    generator.write_event(TestEvent::ExecutionFinished {
        id: ENGINE.into(),
        outcome: TestOutcome::Success,
    });
}

#[test]
fn legacy_xml_per_class() {
    init_logging();
    let dir = Utf8TempDir::new().expect("created temp dir");
    let clock = clock();
    let generator = ReportGenerator::new(
        ReportConfig {
            report_directory: dir.path().to_owned(),
            reports_per_class: true,
            ..Default::default()
        },
        plan(),
        Arc::new(DefaultTestMetadataReader),
        clock.clone(),
    )
    .with_xml_writer(LegacyXmlWriter::new().with_hostname("build-01"));

    run_plan(&generator, &clock);

    let mut files: Vec<_> = dir
        .path()
        .read_dir_utf8()
        .expect("read report dir")
        .map(|entry| entry.expect("read dir entry").file_name().to_owned())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "TEST-com.example.CalcTest.xml",
            "TEST-com.example.LegacyTest.xml",
        ]
    );

    let calc = std::fs::read_to_string(dir.path().join("TEST-com.example.CalcTest.xml"))
        .expect("read report");
    assert!(calc.contains(
        r#"<testsuite name="CalcTest" tests="2" skipped="0" failures="1" errors="0" time="2" hostname="build-01""#
    ));
    assert!(calc.contains(
        r#"<failure message="expected 0" type="java.lang.AssertionError"><![CDATA[java.lang.AssertionError: expected 0]]></failure>"#
    ));
    assert!(calc.contains(r#"<property name="test_key" value="CALC-2"/>"#));
    assert!(calc.contains(
        r#"<property name="testrun_comment"><![CDATA[dividing by zero]]></property>"#
    ));
    assert!(calc.contains(r#"<item name="Cities"><![CDATA[P\;orto\;;Lis\\bon\\]]></item>"#));

    let legacy = std::fs::read_to_string(dir.path().join("TEST-com.example.LegacyTest.xml"))
        .expect("read report");
    assert!(legacy.contains(r#"tests="1" skipped="1""#));
    assert!(legacy.contains("<skipped><![CDATA[parent was skipped: 'disabled']]></skipped>"));
}

#[test]
fn xray_json_with_evidence() {
    init_logging();
    let dir = Utf8TempDir::new().expect("created temp dir");
    let evidence = dir.path().join("output.log");
    std::fs::write(&evidence, "all good\n").expect("wrote evidence");

    let clock = clock();
    let generator = ReportGenerator::new(
        ReportConfig {
            format: ReportFormat::XrayJson,
            report_directory: dir.path().join("reports"),
            report_filename: Some("xray-results".to_owned()),
            xray: XrayConfig {
                cloud: false,
                project_key: Some("CALC".to_owned()),
                ..Default::default()
            },
            ..Default::default()
        },
        plan(),
        Arc::new(DefaultTestMetadataReader),
        clock.clone(),
    );
    generator.reporter_for(ADD).add_evidence(&evidence);
    generator.reporter_for(ADD).add_evidence(dir.path().join("missing.png"));

    run_plan(&generator, &clock);

    let json = std::fs::read_to_string(dir.path().join("reports/xray-results.json"))
        .expect("read report");
    let report = XrayReport::parse(&json).expect("report is valid");

    assert_eq!(report.info.project.as_deref(), Some("CALC"));
    assert_eq!(
        report.info.finish_date.to_rfc3339(),
        "2021-03-24T12:00:02+00:00"
    );
    let statuses: Vec<_> = report
        .tests
        .iter()
        .map(|test| TestRunStatus::parse(&test.status).expect("valid status"))
        .collect();
    assert_eq!(
        statuses,
        vec![
            TestRunStatus::Passed,
            TestRunStatus::Failed,
            TestRunStatus::Todo,
        ]
    );
    assert_eq!(report.tests[0].status, "PASS");

    let add = &report.tests[0];
    assert_eq!(add.test_key.as_deref(), Some("CALC-2"));
    assert_eq!(add.test_info, None);
    assert_eq!(add.evidence.len(), 1, "unreadable evidence is left out");
    assert_eq!(add.evidence[0].filename, "output.log");
    assert_eq!(add.evidence[0].content_type, "text/plain");
    assert_eq!(add.evidence[0].data, "YWxsIGdvb2QK");

    let divide = &report.tests[1];
    let test_info = divide.test_info.as_ref().expect("divide is provisioned");
    assert_eq!(test_info.definition, "com.example.CalcTest.divide");
    assert_eq!(
        divide.comment,
        "dividing by zero\nexpected 0\njava.lang.AssertionError: expected 0"
    );

    assert_eq!(report.tests[2].comment, "parent was skipped: 'disabled'");
}

#[test]
fn dynamic_tests_with_uri_metadata() {
    init_logging();
    let dir = Utf8TempDir::new().expect("created temp dir");
    let factory = format!("{CALC}/[test-factory:cases()]");
    let dynamic = format!("{factory}/[dynamic-test:#1]");
    let generator = ReportGenerator::new(
        ReportConfig {
            format: ReportFormat::XrayJson,
            report_directory: dir.path().to_owned(),
            ..Default::default()
        },
        TestPlan::from_nodes([
            TestNode::container(ENGINE, "JUnit Jupiter"),
            class(CALC, "com.example.CalcTest"),
            TestNode::container(factory.as_str(), "cases()").with_parent(CALC),
        ])
        .expect("plan is valid"),
        Arc::new(DefaultTestMetadataReader),
        Arc::new(SystemClock),
    );

    generator.write_event(TestEvent::DynamicTestRegistered(
        TestNode::test(dynamic.as_str(), "1 + 1 = 2")
            .with_parent(factory.as_str())
            .with_source(TestSource::Uri(
                XrayUri::builder()
                    .key("CALC-5")
                    .summary("adds one & one")
                    .build("com.example.CalcTest"),
            )),
    ));
    generator.write_event(TestEvent::ExecutionStarted(dynamic.as_str().into()));
    generator.write_event(TestEvent::ExecutionFinished {
        id: dynamic.as_str().into(),
        outcome: TestOutcome::Success,
    });
    generator.write_event(TestEvent::ExecutionFinished {
        id: ENGINE.into(),
        outcome: TestOutcome::Success,
    });

    let json = std::fs::read_to_string(dir.path().join("TEST-junit-jupiter.json"))
        .expect("read report");
    let report = XrayReport::parse(&json).expect("report is valid");
    assert_eq!(report.tests.len(), 1);
    assert_eq!(report.tests[0].test_key.as_deref(), Some("CALC-5"));
    assert_eq!(report.tests[0].status, "PASSED");
}

#[test]
fn write_failures_are_contained() {
    init_logging();
    let dir = Utf8TempDir::new().expect("created temp dir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").expect("wrote file");

    let generator = ReportGenerator::new(
        ReportConfig {
            report_directory: blocker.join("reports"),
            ..Default::default()
        },
        plan(),
        Arc::new(DefaultTestMetadataReader),
        Arc::new(SystemClock),
    );
    generator.write_event(TestEvent::ExecutionFinished {
        id: ENGINE.into(),
        outcome: TestOutcome::Success,
    });

    assert!(!blocker.join("reports").exists());
}

#[test]
fn events_from_many_threads() {
    init_logging();
    let dir = Utf8TempDir::new().expect("created temp dir");
    let mut nodes = vec![
        TestNode::container(ENGINE, "JUnit Jupiter"),
        class(CALC, "com.example.CalcTest"),
    ];
    let ids: Vec<String> = (0..16)
        .map(|i| format!("{CALC}/[method:case{i}()]"))
        .collect();
    nodes.extend(
        ids.iter()
            .enumerate()
            .map(|(i, id)| method(id, CALC, "com.example.CalcTest", &format!("case{i}"))),
    );
    let generator = ReportGenerator::new(
        ReportConfig {
            report_directory: dir.path().to_owned(),
            ..Default::default()
        },
        TestPlan::from_nodes(nodes).expect("plan is valid"),
        Arc::new(DefaultTestMetadataReader),
        Arc::new(SystemClock),
    );

    thread::scope(|s| {
        for (i, id) in ids.iter().enumerate() {
            let generator = &generator;
            s.spawn(move || {
                generator.write_event(TestEvent::ExecutionStarted(id.as_str().into()));
                generator.reporter_for(id.as_str()).add_comment(format!("case {i}"));
                let outcome = if i % 4 == 0 {
                    TestOutcome::Error(None)
                } else {
                    TestOutcome::Success
                };
                generator.write_event(TestEvent::ExecutionFinished {
                    id: id.as_str().into(),
                    outcome,
                });
            });
        }
    });
    generator.write_event(TestEvent::ExecutionFinished {
        id: ENGINE.into(),
        outcome: TestOutcome::Success,
    });

    let xml = std::fs::read_to_string(dir.path().join("TEST-junit-jupiter.xml"))
        .expect("read report");
    assert!(xml.contains(r#"tests="16" skipped="0" failures="0" errors="4""#), "{xml}");
    for i in 0..16 {
        assert!(xml.contains(&format!("<![CDATA[case {i}]]>")), "missing comment {i}");
    }
}
