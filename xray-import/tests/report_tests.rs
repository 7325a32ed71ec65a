// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::DateTime;
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;
use xray_import::{
    CustomField, Evidence, ExecutionInfo, GENERIC_TEST_TYPE, TestInfo, XrayReport, XrayTestRun,
};

#[test]
fn optional_fields_are_omitted() {
    let start = DateTime::parse_from_rfc3339("2021-03-24T12:01:02+01:00").unwrap();
    let finish = DateTime::parse_from_rfc3339("2021-03-24T12:05:00+01:00").unwrap();

    let mut report = XrayReport::new(ExecutionInfo::new(start, finish));
    report.tests.push(XrayTestRun {
        test_key: Some("CALC-1".to_owned()),
        test_info: None,
        defects: vec![],
        status: "PASSED".to_owned(),
        start,
        finish,
        comment: String::new(),
        evidence: vec![],
        custom_fields: vec![],
    });

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        json!({
            "info": {
                "startDate": "2021-03-24T12:01:02+01:00",
                "finishDate": "2021-03-24T12:05:00+01:00",
            },
            "tests": [{
                "testKey": "CALC-1",
                "status": "PASSED",
                "start": "2021-03-24T12:01:02+01:00",
                "finish": "2021-03-24T12:05:00+01:00",
                "comment": "",
            }],
        })
    );
}

#[test]
fn provisioned_test_round_trips() {
    let json = indoc! {r#"
        {
            "testExecutionKey": "CALC-100",
            "info": {
                "summary": "test automation results",
                "project": "CALC",
                "testEnvironments": ["chrome", "linux"],
                "startDate": "2021-03-24T12:01:02Z",
                "finishDate": "2021-03-24T12:05:00Z"
            },
            "tests": [
                {
                    "testInfo": {
                        "projectKey": "CALC",
                        "summary": "adds two numbers",
                        "type": "Generic",
                        "definition": "com.example.CalcTest.add",
                        "requirementKeys": ["CALC-2"],
                        "labels": ["core"]
                    },
                    "defects": ["CALC-3"],
                    "status": "FAILED",
                    "start": "2021-03-24T12:01:02Z",
                    "finish": "2021-03-24T12:01:03Z",
                    "comment": "expected: <3> but was: <4>",
                    "evidence": [
                        {"data": "aGVsbG8=", "filename": "hello.txt", "contentType": "text/plain"}
                    ],
                    "customFields": [{"name": "cf1", "value": "Porto\\;Lisbon"}]
                }
            ]
        }
    "#};

    let report = XrayReport::parse(json).expect("parsing succeeds");
    assert_eq!(report.test_execution_key.as_deref(), Some("CALC-100"));
    assert_eq!(report.info.test_environments, vec!["chrome", "linux"]);

    let run = &report.tests[0];
    assert_eq!(
        run.test_info,
        Some(TestInfo {
            project_key: Some("CALC".to_owned()),
            summary: Some("adds two numbers".to_owned()),
            ty: GENERIC_TEST_TYPE.to_owned(),
            definition: "com.example.CalcTest.add".to_owned(),
            requirement_keys: vec!["CALC-2".to_owned()],
            labels: vec!["core".to_owned()],
        })
    );
    assert_eq!(
        run.evidence,
        vec![Evidence {
            data: "aGVsbG8=".to_owned(),
            filename: "hello.txt".to_owned(),
            content_type: "text/plain".to_owned(),
        }]
    );
    assert_eq!(
        run.custom_fields,
        vec![CustomField {
            name: "cf1".to_owned(),
            value: r"Porto\;Lisbon".to_owned(),
        }]
    );

    // UTC offsets are written numerically.
    let mut buf = vec![];
    report.to_writer(&mut buf).expect("serializing succeeds");
    let written = String::from_utf8(buf).unwrap();
    assert!(written.contains(r#""startDate":"2021-03-24T12:01:02+00:00""#), "{written}");

    let reparsed = XrayReport::parse(&written).expect("reparsing succeeds");
    assert_eq!(reparsed, report);
}
