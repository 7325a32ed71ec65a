// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{SerializeError, serialize::serialize_test_suite};
use chrono::NaiveDateTime;
use std::{io, time::Duration};

/// The root element of a legacy JUnit report: a single test suite.
///
/// Unlike the multi-suite `<testsuites>` format, the Ant layout writes one suite per file.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestSuite {
    /// The name of this test suite, usually the display name of the reported root.
    pub name: String,

    /// The total number of test cases in this suite.
    pub tests: usize,

    /// The number of skipped test cases.
    pub skipped: usize,

    /// The number of test cases whose worst outcome was an assertion failure.
    pub failures: usize,

    /// The number of test cases whose worst outcome was an unexpected error.
    pub errors: usize,

    /// The time taken by the root of the suite. Serialized as the number of seconds.
    pub time: Duration,

    /// The host the suite ran on.
    pub hostname: String,

    /// The local date and time at which the report was generated.
    pub timestamp: Option<NaiveDateTime>,

    /// Environment properties, written as `<property name value/>` elements in the order given.
    pub properties: Vec<Property>,

    /// The test cases that form this suite.
    pub test_cases: Vec<TestCase>,

    /// Text written to the trailing `<system-out>` element of the suite.
    pub system_out: Option<String>,
}

impl TestSuite {
    /// Creates a new, empty `TestSuite`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: 0,
            skipped: 0,
            failures: 0,
            errors: 0,
            time: Duration::ZERO,
            hostname: String::new(),
            timestamp: None,
            properties: vec![],
            test_cases: vec![],
            system_out: None,
        }
    }

    /// Sets the time taken for the suite.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }

    /// Sets the host name.
    pub fn set_hostname(&mut self, hostname: impl Into<String>) -> &mut Self {
        self.hostname = hostname.into();
        self
    }

    /// Sets the generation timestamp.
    pub fn set_timestamp(&mut self, timestamp: NaiveDateTime) -> &mut Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Adds an environment property.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }

    pub fn add_properties(
        &mut self,
        properties: impl IntoIterator<Item = impl Into<Property>>,
    ) -> &mut Self {
        for property in properties {
            self.add_property(property);
        }
        self
    }

    /// Adds a test case to this suite and updates the counts.
    ///
    /// When generating a new report, use of this method is recommended over adding to
    /// `self.test_cases` directly.
    pub fn add_test_case(&mut self, test_case: TestCase) -> &mut Self {
        self.tests += 1;
        match &test_case.status {
            TestCaseStatus::Success => {}
            TestCaseStatus::Skipped { .. } => self.skipped += 1,
            TestCaseStatus::NonSuccess { .. } => match test_case.status.worst_kind() {
                Some(NonSuccessKind::Failure) => self.failures += 1,
                Some(NonSuccessKind::Error) => self.errors += 1,
                None => {}
            },
        }
        self.test_cases.push(test_case);
        self
    }

    pub fn add_test_cases(&mut self, test_cases: impl IntoIterator<Item = TestCase>) -> &mut Self {
        for test_case in test_cases {
            self.add_test_case(test_case);
        }
        self
    }

    /// Sets the trailing standard output block.
    pub fn set_system_out(&mut self, system_out: impl Into<String>) -> &mut Self {
        self.system_out = Some(system_out.into());
        self
    }

    /// Serialize this suite to the given writer.
    pub fn serialize(&self, writer: impl io::Write) -> Result<(), SerializeError> {
        serialize_test_suite(self, writer)?;
        Ok(())
    }

    /// Serialize this suite to a string.
    pub fn to_string(&self) -> Result<String, SerializeError> {
        let mut buf: Vec<u8> = vec![];
        self.serialize(&mut buf)?;
        String::from_utf8(buf).map_err(|utf8_err| {
            quick_xml::Error::NonDecodable(Some(utf8_err.utf8_error())).into()
        })
    }
}

/// Represents a single test case.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct TestCase {
    /// The name of the test case, without any parameter suffix.
    pub name: String,

    /// The class this test case belongs to.
    pub classname: Option<String>,

    /// The time taken by this test case.
    pub time: Duration,

    /// The UTC instant at which this test case started.
    pub started_at: Option<NaiveDateTime>,

    /// The UTC instant at which this test case finished.
    pub finished_at: Option<NaiveDateTime>,

    /// The status of this test case.
    pub status: TestCaseStatus,

    /// `<system-out>` blocks, written in order.
    pub system_out: Vec<String>,

    /// `<system-err>` blocks, written in order.
    pub system_err: Vec<String>,

    /// Test case properties.
    ///
    /// A `_dummy_` property with an empty value is always written after these, so the
    /// `<properties>` element is never empty.
    pub properties: Vec<Property>,
}

impl TestCase {
    /// Creates a new test case.
    pub fn new(name: impl Into<String>, status: TestCaseStatus) -> Self {
        Self {
            name: name.into(),
            classname: None,
            time: Duration::ZERO,
            started_at: None,
            finished_at: None,
            status,
            system_out: vec![],
            system_err: vec![],
            properties: vec![],
        }
    }

    /// Sets the classname of the test.
    pub fn set_classname(&mut self, classname: impl Into<String>) -> &mut Self {
        self.classname = Some(classname.into());
        self
    }

    /// Sets the time taken for the test case.
    pub fn set_time(&mut self, time: Duration) -> &mut Self {
        self.time = time;
        self
    }

    /// Sets the UTC start and finish instants.
    pub fn set_started_finished(
        &mut self,
        started_at: NaiveDateTime,
        finished_at: NaiveDateTime,
    ) -> &mut Self {
        self.started_at = Some(started_at);
        self.finished_at = Some(finished_at);
        self
    }

    /// Appends a `<system-out>` block.
    pub fn add_system_out(&mut self, system_out: impl Into<String>) -> &mut Self {
        self.system_out.push(system_out.into());
        self
    }

    /// Appends a `<system-err>` block.
    pub fn add_system_err(&mut self, system_err: impl Into<String>) -> &mut Self {
        self.system_err.push(system_err.into());
        self
    }

    /// Adds a property to this test case.
    pub fn add_property(&mut self, property: impl Into<Property>) -> &mut Self {
        self.properties.push(property.into());
        self
    }
}

/// Represents the outcome of a test case.
#[derive(Clone, Debug)]
pub enum TestCaseStatus {
    /// All executions of this test case passed.
    Success,

    /// One or more executions failed.
    ///
    /// Every failure is written as its own `<failure>` or `<error>` element, in order.
    NonSuccess {
        /// The individual failures.
        failures: Vec<NonSuccess>,
    },

    /// The test case was skipped, either directly or because an ancestor was.
    Skipped {
        /// The reason, written as the CDATA body of `<skipped>`.
        reason: Option<String>,
    },
}

impl TestCaseStatus {
    /// Creates a new `TestCaseStatus` that represents a successful test.
    pub fn success() -> Self {
        TestCaseStatus::Success
    }

    /// Creates a new `TestCaseStatus` for the given failures.
    pub fn non_success(failures: impl IntoIterator<Item = NonSuccess>) -> Self {
        TestCaseStatus::NonSuccess {
            failures: failures.into_iter().collect(),
        }
    }

    /// Creates a new `TestCaseStatus` that represents a skipped test.
    pub fn skipped(reason: Option<String>) -> Self {
        TestCaseStatus::Skipped { reason }
    }

    /// Returns the most severe failure kind, if any.
    pub fn worst_kind(&self) -> Option<NonSuccessKind> {
        match self {
            TestCaseStatus::NonSuccess { failures } => failures.iter().map(|f| f.kind).max(),
            TestCaseStatus::Success | TestCaseStatus::Skipped { .. } => None,
        }
    }
}

/// A single `<failure>` or `<error>` element.
#[derive(Clone, Debug)]
pub struct NonSuccess {
    /// Which element to write.
    pub kind: NonSuccessKind,

    /// The failure message.
    pub message: Option<String>,

    /// The type of the failure, typically the name of the error type.
    pub ty: Option<String>,

    /// The CDATA body, typically a stack trace.
    pub description: Option<String>,
}

impl NonSuccess {
    /// Creates a new, empty `NonSuccess` of the given kind.
    pub fn new(kind: NonSuccessKind) -> Self {
        Self {
            kind,
            message: None,
            ty: None,
            description: None,
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn set_type(&mut self, ty: impl Into<String>) -> &mut Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }
}

/// The kind of failure that occurred. Ordered by severity.
#[derive(Copy, Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum NonSuccessKind {
    /// An assertion failed.
    Failure,

    /// Any other error.
    Error,
}

/// A named property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    /// The name of the property.
    pub name: String,

    /// How the property value is written.
    pub value: PropertyValue,
}

impl Property {
    /// A property written as `<property name="" value=""/>`.
    pub fn simple(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::Attribute(value.into()),
        }
    }

    /// A property whose value is written as a CDATA body. Used for multi-line values.
    pub fn cdata(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::CData(value.into()),
        }
    }

    /// A property holding nested `<item name="">` elements.
    pub fn items(name: impl Into<String>, items: impl IntoIterator<Item = PropertyItem>) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::Items(items.into_iter().collect()),
        }
    }
}

impl<T> From<(T, T)> for Property
where
    T: Into<String>,
{
    fn from((k, v): (T, T)) -> Self {
        Property::simple(k, v)
    }
}

/// The value of a [`Property`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    /// Written as the `value` attribute.
    Attribute(String),

    /// Written as a CDATA body.
    CData(String),

    /// Written as nested `<item>` elements.
    Items(Vec<PropertyItem>),
}

/// A nested `<item name="">` element within a property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyItem {
    pub name: String,
    pub content: ItemContent,
}

impl PropertyItem {
    /// An item whose content is written as escaped text.
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: ItemContent::Text(content.into()),
        }
    }

    /// An item whose content is written as CDATA.
    pub fn cdata(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: ItemContent::CData(content.into()),
        }
    }
}

/// The body of a [`PropertyItem`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemContent {
    Text(String),
    CData(String),
}
