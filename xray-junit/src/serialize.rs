// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialize a `TestSuite`.

use crate::{
    ItemContent, NonSuccess, NonSuccessKind, Property, PropertyItem, PropertyValue, TestCase,
    TestCaseStatus, TestSuite,
};
use chrono::{NaiveDateTime, Timelike};
use quick_xml::{
    Writer,
    events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::{borrow::Cow, io, time::Duration};

static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static PROPERTIES_TAG: &str = "properties";
static PROPERTY_TAG: &str = "property";
static ITEM_TAG: &str = "item";
static FAILURE_TAG: &str = "failure";
static ERROR_TAG: &str = "error";
static SKIPPED_TAG: &str = "skipped";
static SYSTEM_OUT_TAG: &str = "system-out";
static SYSTEM_ERR_TAG: &str = "system-err";

/// Appended to every test case's properties; some importers reject an empty `<properties>`.
static DUMMY_PROPERTY: &str = "_dummy_";

pub(crate) fn serialize_test_suite(
    test_suite: &TestSuite,
    writer: impl io::Write,
) -> quick_xml::Result<()> {
    let mut writer = Writer::new(writer);

    let decl = BytesDecl::new("1.0", Some("UTF-8"), None);
    writer.write_event(Event::Decl(decl))?;
    newline(&mut writer)?;

    serialize_test_suite_impl(test_suite, &mut writer)?;
    writer.write_event(Event::Eof)
}

fn serialize_test_suite_impl(
    test_suite: &TestSuite,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    // Use the destructuring syntax to ensure that all fields are handled.
    let TestSuite {
        name,
        tests,
        skipped,
        failures,
        errors,
        time,
        hostname,
        timestamp,
        properties,
        test_cases,
        system_out,
    } = test_suite;

    let mut test_suite_tag = BytesStart::new(TESTSUITE_TAG);
    push_attribute(&mut test_suite_tag, "name", name);
    push_attribute(&mut test_suite_tag, "tests", &tests.to_string());
    push_attribute(&mut test_suite_tag, "skipped", &skipped.to_string());
    push_attribute(&mut test_suite_tag, "failures", &failures.to_string());
    push_attribute(&mut test_suite_tag, "errors", &errors.to_string());
    push_attribute(&mut test_suite_tag, "time", &format_seconds(*time));
    push_attribute(&mut test_suite_tag, "hostname", hostname);
    if let Some(timestamp) = timestamp {
        push_attribute(
            &mut test_suite_tag,
            "timestamp",
            &format_local_date_time(timestamp),
        );
    }
    writer.write_event(Event::Start(test_suite_tag))?;
    newline(writer)?;

    serialize_start_tag(PROPERTIES_TAG, writer)?;
    newline(writer)?;
    for property in properties {
        serialize_property(property, writer)?;
    }
    serialize_end_tag(PROPERTIES_TAG, writer)?;
    newline(writer)?;

    for test_case in test_cases {
        serialize_test_case(test_case, writer)?;
    }

    if let Some(system_out) = system_out {
        serialize_output(system_out, SYSTEM_OUT_TAG, writer)?;
    }

    serialize_end_tag(TESTSUITE_TAG, writer)?;
    newline(writer)
}

fn serialize_test_case(
    test_case: &TestCase,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let TestCase {
        name,
        classname,
        time,
        started_at,
        finished_at,
        status,
        system_out,
        system_err,
        properties,
    } = test_case;

    let mut test_case_tag = BytesStart::new(TESTCASE_TAG);
    push_attribute(&mut test_case_tag, "name", name);
    if let Some(classname) = classname {
        push_attribute(&mut test_case_tag, "classname", classname);
    }
    push_attribute(&mut test_case_tag, "time", &format_seconds(*time));
    if let Some(started_at) = started_at {
        push_attribute(
            &mut test_case_tag,
            "started-at",
            &format_local_date_time(started_at),
        );
    }
    if let Some(finished_at) = finished_at {
        push_attribute(
            &mut test_case_tag,
            "finished-at",
            &format_local_date_time(finished_at),
        );
    }
    writer.write_event(Event::Start(test_case_tag))?;
    newline(writer)?;

    match status {
        TestCaseStatus::Success => {}
        TestCaseStatus::NonSuccess { failures } => {
            for failure in failures {
                serialize_non_success(failure, writer)?;
            }
        }
        TestCaseStatus::Skipped { reason } => {
            match reason.as_deref().filter(|reason| !reason.trim().is_empty()) {
                Some(reason) => {
                    serialize_start_tag(SKIPPED_TAG, writer)?;
                    serialize_cdata(reason, writer)?;
                    serialize_end_tag(SKIPPED_TAG, writer)?;
                }
                None => {
                    writer.write_event(Event::Empty(BytesStart::new(SKIPPED_TAG)))?;
                }
            }
            newline(writer)?;
        }
    }

    for output in system_out {
        serialize_output(output, SYSTEM_OUT_TAG, writer)?;
    }
    for output in system_err {
        serialize_output(output, SYSTEM_ERR_TAG, writer)?;
    }

    serialize_start_tag(PROPERTIES_TAG, writer)?;
    newline(writer)?;
    for property in properties {
        serialize_property(property, writer)?;
    }
    serialize_property(&Property::simple(DUMMY_PROPERTY, ""), writer)?;
    serialize_end_tag(PROPERTIES_TAG, writer)?;
    newline(writer)?;

    serialize_end_tag(TESTCASE_TAG, writer)?;
    newline(writer)
}

fn serialize_non_success(
    non_success: &NonSuccess,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let NonSuccess {
        kind,
        message,
        ty,
        description,
    } = non_success;

    let tag_name = match kind {
        NonSuccessKind::Failure => FAILURE_TAG,
        NonSuccessKind::Error => ERROR_TAG,
    };
    let mut tag = BytesStart::new(tag_name);
    if let Some(message) = message {
        push_attribute(&mut tag, "message", message);
    }
    if let Some(ty) = ty {
        push_attribute(&mut tag, "type", ty);
    }

    match description {
        Some(description) => {
            writer.write_event(Event::Start(tag))?;
            serialize_cdata(description, writer)?;
            serialize_end_tag(tag_name, writer)?;
        }
        None => {
            writer.write_event(Event::Empty(tag))?;
        }
    }
    newline(writer)
}

fn serialize_property(
    property: &Property,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    let mut property_tag = BytesStart::new(PROPERTY_TAG);
    push_attribute(&mut property_tag, "name", &property.name);

    match &property.value {
        PropertyValue::Attribute(value) => {
            push_attribute(&mut property_tag, "value", value);
            writer.write_event(Event::Empty(property_tag))?;
        }
        PropertyValue::CData(value) => {
            writer.write_event(Event::Start(property_tag))?;
            serialize_cdata(value, writer)?;
            serialize_end_tag(PROPERTY_TAG, writer)?;
        }
        PropertyValue::Items(items) => {
            writer.write_event(Event::Start(property_tag))?;
            newline(writer)?;
            for item in items {
                serialize_item(item, writer)?;
            }
            serialize_end_tag(PROPERTY_TAG, writer)?;
        }
    }
    newline(writer)
}

fn serialize_item(item: &PropertyItem, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let mut item_tag = BytesStart::new(ITEM_TAG);
    push_attribute(&mut item_tag, "name", &item.name);
    writer.write_event(Event::Start(item_tag))?;
    match &item.content {
        ItemContent::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(&escape_illegal_chars(text))))?;
        }
        ItemContent::CData(text) => serialize_cdata(text, writer)?,
    }
    serialize_end_tag(ITEM_TAG, writer)?;
    newline(writer)
}

fn serialize_output(
    output: &str,
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    serialize_start_tag(tag_name, writer)?;
    serialize_cdata(&format!("\n{output}\n"), writer)?;
    serialize_end_tag(tag_name, writer)?;
    newline(writer)
}

/// Writes `data` as one or more CDATA sections.
///
/// A CDATA section cannot contain `]]>`, so the text is split between `]]` and `>`.
fn serialize_cdata(data: &str, writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    let data = escape_illegal_chars(data);
    for part in split_cdata(&data) {
        writer.write_event(Event::CData(BytesCData::new(part)))?;
    }
    Ok(())
}

fn split_cdata(data: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut rest = data;
    while let Some(pos) = rest.find("]]>") {
        let (head, tail) = rest.split_at(pos + 2);
        parts.push(head);
        rest = tail;
    }
    parts.push(rest);
    parts
}

fn push_attribute(tag: &mut BytesStart<'_>, name: &str, value: &str) {
    let value = escape_illegal_chars(value);
    tag.push_attribute((name, &*value));
}

fn serialize_start_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag_name)))
}

fn serialize_end_tag(
    tag_name: &'static str,
    writer: &mut Writer<impl io::Write>,
) -> quick_xml::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(tag_name)))
}

fn newline(writer: &mut Writer<impl io::Write>) -> quick_xml::Result<()> {
    writer.write_event(Event::Text(BytesText::new("\n")))
}

/// Replaces characters outside the XML 1.0 character set with numeric character references.
pub fn escape_illegal_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_allowed_xml_char) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if is_allowed_xml_char(c) {
            escaped.push(c);
        } else {
            escaped.push_str("&#");
            escaped.push_str(&(c as u32).to_string());
            escaped.push(';');
        }
    }
    Cow::Owned(escaped)
}

fn is_allowed_xml_char(c: char) -> bool {
    // https://www.w3.org/TR/xml/#charsets
    matches!(
        c as u32,
        0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

/// Formats a duration as seconds, truncated to milliseconds, using US number formatting: `,`
/// as the grouping separator and at most three fraction digits.
pub fn format_seconds(time: Duration) -> String {
    let millis = time.as_millis();
    let whole = (millis / 1000).to_string();
    let fraction = millis % 1000;

    let mut out = String::with_capacity(whole.len() + whole.len() / 3 + 4);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if fraction != 0 {
        out.push('.');
        out.push_str(format!("{fraction:03}").trim_end_matches('0'));
    }
    out
}

/// Formats a date-time as an ISO-8601 local date-time.
///
/// Seconds are always written. The fraction of the second is only written when non-zero, and
/// without trailing zeros.
pub fn format_local_date_time(date_time: &NaiveDateTime) -> String {
    let mut out = date_time.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = date_time.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        out.push('.');
        out.push_str(format!("{nanos:09}").trim_end_matches('0'));
    }
    out
}
