// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report writers.
//!
//! Both writers render the subtree of a report root. They select the nodes to report with
//! [`ReportInput::included_tests`], and read metadata and side-channel data for each of them.

mod legacy_xml;
mod xray_json;

pub use legacy_xml::LegacyXmlWriter;
pub use xray_json::XrayJsonWriter;

use crate::{
    aggregate::{AggregatedTestResult, ResultCounts},
    hierarchy::Hierarchy,
    metadata::{self, TestMetadataReader},
    plan::{NodeId, TestNode, TestPlan},
    store::ReportData,
};
use tracing::debug;

/// The data a writer renders.
#[derive(Clone, Copy, Debug)]
pub struct ReportInput<'a> {
    /// The test plan.
    pub plan: &'a TestPlan,

    /// The recorded events.
    pub data: &'a ReportData,

    /// Reads Xray metadata for nodes.
    pub reader: &'a dyn TestMetadataReader,

    /// Whether to only report nodes that carry Xray metadata.
    pub report_only_annotated_tests: bool,
}

/// A node selected for a report, along with its aggregated result.
#[derive(Clone, Debug)]
pub struct IncludedTest<'a> {
    /// The node.
    pub node: &'a TestNode,

    /// The result of the node, given the root being reported.
    pub result: AggregatedTestResult,
}

impl<'a> ReportInput<'a> {
    /// Returns a hierarchy view over the plan and the recorded events.
    pub fn hierarchy(&self) -> Hierarchy<'a> {
        Hierarchy::new(self.plan, self.data)
    }

    /// Returns the nodes below `root` to report, in pre-order, with their results.
    ///
    /// A node is reported if it is a test or has no children, and if it carries Xray metadata
    /// when only annotated tests are reported.
    pub fn included_tests(&self, root: &NodeId) -> Vec<IncludedTest<'a>> {
        let hierarchy = self.hierarchy();
        let tests: Vec<_> = self
            .plan
            .descendants(root)
            .into_iter()
            .filter(|node| self.should_include(node))
            .map(|node| {
                let result = if hierarchy.was_skipped(&node.id) {
                    AggregatedTestResult::skipped()
                } else {
                    AggregatedTestResult::non_skipped(
                        hierarchy.execution_records_for(&node.id, root),
                    )
                };
                IncludedTest { node, result }
            })
            .collect();

        let counts = count_results(&tests);
        debug!(
            "reporting {} tests below {root} ({} skipped, {} failures, {} errors)",
            counts.tests, counts.skipped, counts.failures, counts.errors,
        );
        tests
    }

    fn should_include(&self, node: &TestNode) -> bool {
        let included = node.kind.is_test() || self.plan.is_leaf(&node.id);
        included && (!self.report_only_annotated_tests || metadata::is_annotated(node))
    }
}

/// Counts the results of the given tests.
pub fn count_results(tests: &[IncludedTest<'_>]) -> ResultCounts {
    tests.iter().map(|test| &test.result).collect()
}
