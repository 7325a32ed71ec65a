// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Xray metadata for test nodes.
//!
//! The host selects a [`TestMetadataReader`] when it creates the
//! [`ReportGenerator`](crate::generator::ReportGenerator). [`DefaultTestMetadataReader`] reads
//! the annotations the host resolved for a node, falling back to the query of an `xray://` URI
//! source for dynamic tests. URIs of that form are built with [`XrayUri`].

use crate::{
    helpers::non_empty,
    plan::{TestNode, TestPlan, TestSource, XrayTestAnnotation},
};
use std::{borrow::Cow, fmt};

/// Reads the Xray metadata of a test node.
///
/// Implementations must treat empty strings as absent.
pub trait TestMetadataReader: fmt::Debug + Send + Sync {
    /// The Xray test id.
    fn id(&self, node: &TestNode) -> Option<String>;

    /// The Xray test issue key.
    fn key(&self, node: &TestNode) -> Option<String>;

    /// The test summary.
    fn summary(&self, node: &TestNode) -> Option<String>;

    /// The test description.
    fn description(&self, node: &TestNode) -> Option<String>;

    /// Requirement issue keys covered by the test, in declaration order.
    fn requirements(&self, node: &TestNode) -> Vec<String>;

    /// Defect issue keys linked to the test, in declaration order.
    fn defects(&self, node: &TestNode) -> Vec<String> {
        node.annotations.defects.clone()
    }
}

/// The reader used unless the host supplies its own.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTestMetadataReader;

impl DefaultTestMetadataReader {
    fn annotation_value(
        node: &TestNode,
        field: impl FnOnce(&XrayTestAnnotation) -> &str,
    ) -> Option<String> {
        node.annotations
            .xray_test
            .as_ref()
            .and_then(|annotation| non_empty(field(annotation)))
            .map(str::to_owned)
    }

    fn uri_value(node: &TestNode, key: &str) -> Option<String> {
        match &node.source {
            Some(TestSource::Uri(uri)) => read_query_value(uri, key),
            _ => None,
        }
    }
}

impl TestMetadataReader for DefaultTestMetadataReader {
    fn id(&self, node: &TestNode) -> Option<String> {
        Self::annotation_value(node, |annotation| &annotation.id)
            .or_else(|| Self::uri_value(node, XrayUri::QUERY_ID))
    }

    fn key(&self, node: &TestNode) -> Option<String> {
        Self::annotation_value(node, |annotation| &annotation.key)
            .or_else(|| Self::uri_value(node, XrayUri::QUERY_KEY))
    }

    fn summary(&self, node: &TestNode) -> Option<String> {
        if let Some(summary) = Self::annotation_value(node, |annotation| &annotation.summary) {
            return Some(summary);
        }
        if let Some(display_name) = &node.annotations.display_name {
            return Some(display_name.clone());
        }
        if node.annotations.test_factory || node.annotations.display_name_generator {
            return Some(node.display_name.clone());
        }
        Self::uri_value(node, XrayUri::QUERY_SUMMARY)
    }

    fn description(&self, node: &TestNode) -> Option<String> {
        Self::annotation_value(node, |annotation| &annotation.description)
            .or_else(|| Self::uri_value(node, XrayUri::QUERY_DESCRIPTION))
    }

    fn requirements(&self, node: &TestNode) -> Vec<String> {
        node.annotations.requirements.clone()
    }
}

/// The name of a node in legacy reports: the legacy reporting name up to the first `(`.
pub fn name(node: &TestNode) -> &str {
    let legacy = node.legacy_reporting_name.as_str();
    match legacy.find('(') {
        Some(pos) if pos > 0 => &legacy[..pos],
        _ => legacy,
    }
}

/// The class a node is reported under.
///
/// This is the class of the nearest class source, starting with the node itself, or else the
/// legacy reporting name of the parent.
pub fn class_name<'a>(plan: &'a TestPlan, node: &'a TestNode) -> &'a str {
    let class_source = std::iter::once(node)
        .chain(plan.ancestors(&node.id))
        .find_map(|node| match &node.source {
            Some(TestSource::Class { class_name }) => Some(class_name.as_str()),
            _ => None,
        });
    match class_source {
        Some(class_name) => class_name,
        None => plan
            .parent(&node.id)
            .map_or("<unrooted>", |parent| parent.legacy_reporting_name.as_str()),
    }
}

/// The trimmed tags of a node, in declaration order.
pub fn tags(node: &TestNode) -> Vec<&str> {
    node.tags.iter().map(|tag| tag.trim()).collect()
}

/// Returns true if the node carries Xray metadata: an Xray test annotation or requirements.
pub fn is_annotated(node: &TestNode) -> bool {
    node.annotations.xray_test.is_some() || !node.annotations.requirements.is_empty()
}

/// Builds `xray://` URIs that carry Xray metadata for tests without a method source, such as
/// dynamic tests.
///
/// ```
/// use xray_reporter::metadata::XrayUri;
///
/// let uri = XrayUri::builder()
///     .key("CALC-1")
///     .summary("adds two numbers")
///     .build("com.example.CalcTest");
/// assert_eq!(uri, "xray://com.example.CalcTest?key=CALC-1&summary=adds%20two%20numbers");
/// ```
#[derive(Clone, Debug, Default)]
pub struct XrayUri {
    id: Option<String>,
    key: Option<String>,
    summary: Option<String>,
    description: Option<String>,
}

impl XrayUri {
    /// The URI scheme.
    pub const SCHEME: &'static str = "xray";

    const QUERY_ID: &'static str = "id";
    const QUERY_KEY: &'static str = "key";
    const QUERY_SUMMARY: &'static str = "summary";
    const QUERY_DESCRIPTION: &'static str = "description";

    /// Creates an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the test id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the test issue key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builds the URI for a test declared in the given class.
    pub fn build(&self, class_name: &str) -> String {
        let query: Vec<String> = [
            (Self::QUERY_ID, &self.id),
            (Self::QUERY_KEY, &self.key),
            (Self::QUERY_SUMMARY, &self.summary),
            (Self::QUERY_DESCRIPTION, &self.description),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .map(|value| format!("{name}={}", urlencoding::encode(value)))
        })
        .collect();
        format!("{}://{class_name}?{}", Self::SCHEME, query.join("&"))
    }
}

/// Reads and decodes the first value of `key` in the query of `uri`.
///
/// Both `+` and `%20` decode to a space. Values that are not valid UTF-8 once decoded are
/// treated as absent.
pub fn read_query_value(uri: &str, key: &str) -> Option<String> {
    let (_, query) = uri.split_once('?')?;
    let query = query.split_once('#').map_or(query, |(query, _)| query);
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(key)?.strip_prefix('='))
        .and_then(|value| {
            let value: Cow<'_, str> = if value.contains('+') {
                Cow::Owned(value.replace('+', " "))
            } else {
                Cow::Borrowed(value)
            };
            urlencoding::decode(&value).ok().map(Cow::into_owned)
        })
}
