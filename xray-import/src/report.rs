// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, io};

/// A complete Xray test execution import document.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct XrayReport {
    /// The key of an existing Test Execution issue to update, if any.
    ///
    /// When absent, Xray creates a new Test Execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_execution_key: Option<String>,

    /// Metadata about the test execution.
    pub info: ExecutionInfo,

    /// The test runs in this execution.
    #[serde(default)]
    pub tests: Vec<XrayTestRun>,
}

impl XrayReport {
    /// Creates a new report with no test runs.
    pub fn new(info: ExecutionInfo) -> Self {
        Self {
            test_execution_key: None,
            info,
            tests: vec![],
        }
    }

    /// Serializes this report as JSON to the given writer.
    pub fn to_writer(&self, writer: impl io::Write) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    /// Parses a report from a JSON string.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The `info` header of an import document.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    /// The user id of the Test Execution's assignee or reporter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// The summary of the Test Execution issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// The description of the Test Execution issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The project key the Test Execution is created in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// The version the execution is associated with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// The source revision that was tested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// The Test Plan the execution is linked to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_plan_key: Option<String>,

    /// The test environments the execution ran in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_environments: Vec<String>,

    /// When the execution started.
    #[serde(with = "crate::date_format")]
    pub start_date: DateTime<FixedOffset>,

    /// When the execution finished.
    #[serde(with = "crate::date_format")]
    pub finish_date: DateTime<FixedOffset>,
}

impl ExecutionInfo {
    /// Creates a header with only the start and finish dates set.
    pub fn new(start_date: DateTime<FixedOffset>, finish_date: DateTime<FixedOffset>) -> Self {
        Self {
            user: None,
            summary: None,
            description: None,
            project: None,
            version: None,
            revision: None,
            test_plan_key: None,
            test_environments: vec![],
            start_date,
            finish_date,
        }
    }
}

/// A single test run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct XrayTestRun {
    /// The key of the test issue this run belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_key: Option<String>,

    /// The definition of a test to provision, used when no test key is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_info: Option<TestInfo>,

    /// Defect issue keys linked to this run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defects: Vec<String>,

    /// The status of the run, in the vocabulary of the target [`XrayFlavor`].
    pub status: String,

    /// When the run started.
    #[serde(with = "crate::date_format")]
    pub start: DateTime<FixedOffset>,

    /// When the run finished.
    #[serde(with = "crate::date_format")]
    pub finish: DateTime<FixedOffset>,

    /// The run comment.
    #[serde(default)]
    pub comment: String,

    /// Files attached to the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,

    /// Test run custom field values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
}

/// The definition of a test that Xray creates (or finds by definition) on import.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    /// The project the test issue belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,

    /// The summary of the test issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// The test type. Automated tests are reported as `Generic`.
    #[serde(rename = "type")]
    pub ty: String,

    /// The generic definition, used by Xray to match runs to existing tests.
    pub definition: String,

    /// Requirement issue keys covered by the test.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirement_keys: Vec<String>,

    /// Labels for the test issue.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// The test type used for auto-provisioned tests.
pub const GENERIC_TEST_TYPE: &str = "Generic";

/// A file attached to a test run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// The base64-encoded file contents.
    pub data: String,

    /// The file name shown in Xray.
    pub filename: String,

    /// The MIME type of the file.
    pub content_type: String,
}

/// A test run custom field value.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CustomField {
    /// The name of the custom field.
    pub name: String,

    /// The value. Multi-value fields are `;`-separated with `\` as the escape character.
    pub value: String,
}

/// The Xray product an import document is targeted at.
#[derive(Copy, Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum XrayFlavor {
    /// Xray Cloud.
    #[default]
    Cloud,

    /// Xray Server and Data Center.
    Server,
}

/// The status of a test run, independent of the target flavor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TestRunStatus {
    /// The test passed.
    Passed,

    /// The test failed or errored.
    Failed,

    /// The test did not run.
    Todo,
}

impl TestRunStatus {
    /// Returns the status name used by the given flavor.
    pub fn as_str(self, flavor: XrayFlavor) -> &'static str {
        match (self, flavor) {
            (TestRunStatus::Passed, XrayFlavor::Cloud) => "PASSED",
            (TestRunStatus::Failed, XrayFlavor::Cloud) => "FAILED",
            (TestRunStatus::Passed, XrayFlavor::Server) => "PASS",
            (TestRunStatus::Failed, XrayFlavor::Server) => "FAIL",
            (TestRunStatus::Todo, _) => "TODO",
        }
    }

    /// Parses a status name in either flavor's vocabulary.
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "PASSED" | "PASS" => Some(TestRunStatus::Passed),
            "FAILED" | "FAIL" => Some(TestRunStatus::Failed),
            "TODO" | "TO DO" => Some(TestRunStatus::Todo),
            _ => None,
        }
    }
}

impl fmt::Display for XrayFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XrayFlavor::Cloud => write!(f, "cloud"),
            XrayFlavor::Server => write!(f, "server"),
        }
    }
}
