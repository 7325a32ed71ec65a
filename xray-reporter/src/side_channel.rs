// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured data passed from tests to the report through report entries.
//!
//! Tests publish [`ReportEntry`]s with reserved keys:
//!
//! | key                               | meaning                          |
//! |-----------------------------------|----------------------------------|
//! | `xray:comment`                    | a comment for the test run       |
//! | `xray:testrun_customfield:<name>` | the value of custom field `name` |
//! | `xray:evidence`                   | the path of an evidence file     |
//! | `stdout`, `stderr`                | captured standard streams        |
//!
//! Every key starting with `xray:` is reserved. The functions in this module extract these
//! values without modifying the entries. [`TestRunReporter`] publishes them from within a test.

use crate::{
    aggregate::{AggregatedTestResult, ResultKind},
    events::ReportEntry,
};
use base64::Engine;
use camino::Utf8Path;
use indexmap::IndexMap;
use swrite::{SWrite, swrite};
use tracing::error;

/// The prefix shared by every reserved key.
pub const XRAY_PREFIX: &str = "xray:";

/// The key of test run comments.
pub const TESTRUN_COMMENT: &str = "xray:comment";

/// The key of evidence file paths.
pub const TESTRUN_EVIDENCE: &str = "xray:evidence";

/// The key prefix of test run custom fields.
pub const TESTRUN_CUSTOMFIELD_PREFIX: &str = "xray:testrun_customfield:";

/// The key of captured standard output.
pub const STDOUT_KEY: &str = "stdout";

/// The key of captured standard error.
pub const STDERR_KEY: &str = "stderr";

fn values_for<'a>(entries: &'a [ReportEntry], key: &'a str) -> impl Iterator<Item = &'a str> {
    entries.iter().filter_map(move |entry| entry.get(key))
}

/// Concatenates every comment, trimmed and followed by a newline, in publish order. The result
/// is trimmed.
pub fn comments(entries: &[ReportEntry]) -> String {
    comment_lines(entries).trim().to_owned()
}

fn comment_lines(entries: &[ReportEntry]) -> String {
    let mut out = String::new();
    for comment in values_for(entries, TESTRUN_COMMENT) {
        out.push_str(comment.trim());
        out.push('\n');
    }
    out
}

/// Like [`comments`], followed by a narrative of the outcome for skipped and failed tests.
///
/// For skipped tests the narrative is the skip reason. For failed tests it is the message and
/// stack trace of every failure, then of every error.
pub fn comment_with_outcome(
    entries: &[ReportEntry],
    result: &AggregatedTestResult,
    skip_reason: Option<&str>,
) -> String {
    let mut out = comment_lines(entries);
    match result.kind() {
        ResultKind::Success => {}
        ResultKind::Skipped => {
            out.push_str(skip_reason.unwrap_or_default());
            out.push('\n');
        }
        ResultKind::Failure | ResultKind::Error => {
            for throwable in result.failures().filter_map(|(_, throwable)| throwable) {
                if let Some(message) = &throwable.message {
                    out.push_str(message);
                    out.push('\n');
                }
                out.push_str(&throwable.stack_trace);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
    out.trim().to_owned()
}

/// Merges every custom field into one map, with the prefix stripped from the names.
///
/// A field published more than once takes the value published last, and keeps the position of
/// its first publication.
pub fn custom_fields(entries: &[ReportEntry]) -> IndexMap<String, String> {
    let mut fields = IndexMap::new();
    for entry in entries {
        for (key, value) in entry.pairs() {
            if let Some(name) = key.strip_prefix(TESTRUN_CUSTOMFIELD_PREFIX) {
                fields.insert(name.to_owned(), value.clone());
            }
        }
    }
    fields
}

/// Encodes the values of a multi-valued custom field into a single string.
///
/// Each `\` becomes `\\` and then each `;` becomes `\;`; the results are joined with `;`.
pub fn encode_custom_field_values<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|value| value.as_ref().replace('\\', "\\\\").replace(';', "\\;"))
        .collect::<Vec<_>>()
        .join(";")
}

/// An evidence file, read and encoded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EvidenceFile {
    /// The base name of the file.
    pub file_name: String,

    /// The MIME type guessed from the extension.
    pub content_type: &'static str,

    /// The contents, base64 encoded.
    pub data: String,
}

/// Reads every evidence file, in publish order.
///
/// Files that can't be read are logged and left out.
pub fn evidence(entries: &[ReportEntry]) -> Vec<EvidenceFile> {
    values_for(entries, TESTRUN_EVIDENCE)
        .filter_map(|path| {
            let path = Utf8Path::new(path);
            match std::fs::read(path) {
                Ok(contents) => Some(EvidenceFile {
                    file_name: path.file_name().unwrap_or(path.as_str()).to_owned(),
                    content_type: content_type(path),
                    data: base64::engine::general_purpose::STANDARD.encode(contents),
                }),
                Err(err) => {
                    error!("error encoding evidence {path}: {err}");
                    None
                }
            }
        })
        .collect()
}

/// Guesses the MIME type of a file from its extension.
pub fn content_type(path: &Utf8Path) -> &'static str {
    match path.extension() {
        Some("png") => "image/png",
        Some("jpeg" | "jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("txt" | "log") => "text/plain",
        Some("zip") => "application/zip",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Captured output and the remaining pairs of a node's report entries.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CapturedOutput {
    /// Non-reserved pairs rendered per entry. `None` if the node published no entries.
    pub report_entries: Option<String>,

    /// Captured standard output, in publish order.
    pub stdout: Vec<String>,

    /// Captured standard error, in publish order.
    pub stderr: Vec<String>,
}

/// Separates captured output from the other pairs of the entries, and renders the pairs that
/// are not reserved.
///
/// Each entry with such pairs is rendered as `Report Entry #<n> (timestamp: <local time>)`,
/// followed by a `\t- key: value` line per pair, where `n` counts every entry from 1.
pub fn captured_output(entries: &[ReportEntry]) -> CapturedOutput {
    if entries.is_empty() {
        return CapturedOutput::default();
    }

    let mut output = CapturedOutput::default();
    let mut rendered = String::new();
    for (index, entry) in entries.iter().enumerate() {
        let mut pairs = entry.pairs().clone();
        if let Some(stdout) = pairs.shift_remove(STDOUT_KEY) {
            output.stdout.push(stdout);
        }
        if let Some(stderr) = pairs.shift_remove(STDERR_KEY) {
            output.stderr.push(stderr);
        }
        pairs.retain(|key, _| !key.starts_with(XRAY_PREFIX));
        if pairs.is_empty() {
            continue;
        }

        swrite!(
            rendered,
            "Report Entry #{} (timestamp: {})\n",
            index + 1,
            xray_junit::format_local_date_time(&entry.timestamp()),
        );
        for (key, value) in &pairs {
            swrite!(rendered, "\t- {key}: {value}\n");
        }
    }
    output.report_entries = Some(rendered.trim().to_owned());
    output
}

/// Publishes a report entry for the currently running test.
pub trait EntryPublisher {
    /// Publishes the entry.
    fn publish(&self, entry: ReportEntry);
}

impl<F: Fn(ReportEntry)> EntryPublisher for F {
    fn publish(&self, entry: ReportEntry) {
        self(entry)
    }
}

/// Lets a running test add Xray data to its test run.
#[derive(Clone, Debug)]
pub struct TestRunReporter<P> {
    publisher: P,
}

impl<P: EntryPublisher> TestRunReporter<P> {
    /// Creates a new reporter that publishes through `publisher`.
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// Adds a comment to the test run.
    pub fn add_comment(&self, comment: impl Into<String>) {
        self.publish(TESTRUN_COMMENT.to_owned(), comment.into());
    }

    /// Sets the value of a test run custom field.
    pub fn set_custom_field(&self, field: &str, value: impl Into<String>) {
        self.publish(format!("{TESTRUN_CUSTOMFIELD_PREFIX}{field}"), value.into());
    }

    /// Sets the values of a multi-valued test run custom field.
    pub fn set_custom_field_values<S: AsRef<str>>(&self, field: &str, values: &[S]) {
        self.set_custom_field(field, encode_custom_field_values(values));
    }

    /// Attaches a file to the test run as evidence. The file is read when the report is written.
    pub fn add_evidence(&self, path: impl AsRef<Utf8Path>) {
        self.publish(TESTRUN_EVIDENCE.to_owned(), path.as_ref().to_string());
    }

    fn publish(&self, key: String, value: String) {
        self.publisher.publish(ReportEntry::single(key, value));
    }
}
