// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tree of test nodes supplied by the host test framework.
//!
//! A [`TestPlan`] is built before execution starts. Nodes are identified by [`NodeId`]s, which
//! follow the JUnit Platform unique id syntax: a `/`-separated list of `[type:value]` segments,
//! the first of which names the test engine.

use crate::errors::PlanError;
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::{collections::HashMap, fmt};

/// The unique identifier of a test node, e.g.
/// `[engine:junit-jupiter]/[class:com.example.CalcTest]/[method:add()]`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(SmolStr);

impl NodeId {
    /// Creates a new `NodeId`.
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `[type:value]` segments of this identifier.
    ///
    /// An identifier that doesn't use the segment syntax is returned as a single segment with
    /// an empty type.
    pub fn segments(&self) -> Vec<UniqueIdSegment<'_>> {
        let id = self.as_str();
        let Some(inner) = id
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        else {
            return vec![UniqueIdSegment { ty: "", value: id }];
        };

        inner
            .split("]/[")
            .map(|segment| match segment.split_once(':') {
                Some((ty, value)) => UniqueIdSegment { ty, value },
                None => UniqueIdSegment {
                    ty: "",
                    value: segment,
                },
            })
            .collect()
    }

    /// Returns the value of the first segment, typically the name of the test engine.
    pub fn root_name(&self) -> &str {
        self.segments()
            .first()
            .map_or(self.as_str(), |segment| segment.value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A single `[type:value]` segment of a [`NodeId`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UniqueIdSegment<'a> {
    /// The segment type, e.g. `engine`, `class` or `method`.
    pub ty: &'a str,

    /// The segment value.
    pub value: &'a str,
}

/// Whether a node contains other nodes, is a test, or both.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// A node that only groups other nodes, such as an engine or a class.
    Container,

    /// A test.
    Test,

    /// A test that also contains tests, such as a test factory.
    ContainerAndTest,
}

impl NodeKind {
    /// Returns true if this node is a test.
    pub fn is_test(self) -> bool {
        matches!(self, NodeKind::Test | NodeKind::ContainerAndTest)
    }
}

/// Where a node was declared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TestSource {
    /// A test method.
    Method {
        /// The fully qualified name of the declaring class.
        class_name: String,

        /// The method name.
        method_name: String,
    },

    /// A test class.
    Class {
        /// The fully qualified class name.
        class_name: String,
    },

    /// A URI, such as an `xray://` URI carrying metadata for a dynamic test.
    Uri(String),
}

/// Xray test metadata declared on a test method.
///
/// Empty strings mean "not set".
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct XrayTestAnnotation {
    /// The Xray test id.
    pub id: String,

    /// The Xray test issue key.
    pub key: String,

    /// The test summary.
    pub summary: String,

    /// The test description.
    pub description: String,
}

/// Metadata the host framework resolved from annotations on a node's source.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestAnnotations {
    /// Xray test metadata, if the method is annotated with it.
    pub xray_test: Option<XrayTestAnnotation>,

    /// Requirement issue keys the test covers.
    pub requirements: Vec<String>,

    /// Defect issue keys linked to the test.
    pub defects: Vec<String>,

    /// An explicit display name declared on the method.
    pub display_name: Option<String>,

    /// Whether the method is a test factory producing dynamic tests.
    pub test_factory: bool,

    /// Whether the declaring class generates display names for its tests.
    pub display_name_generator: bool,
}

/// A node in the test plan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestNode {
    /// The unique identifier of this node.
    pub id: NodeId,

    /// The parent of this node, if any.
    pub parent: Option<NodeId>,

    /// The display name.
    pub display_name: String,

    /// The name used by legacy reports. For methods, this includes the parameter list, e.g.
    /// `add(int, int)`.
    pub legacy_reporting_name: String,

    /// Whether this node is a test, a container, or both.
    pub kind: NodeKind,

    /// Tags attached to this node, in declaration order.
    pub tags: Vec<String>,

    /// Where this node was declared.
    pub source: Option<TestSource>,

    /// Metadata resolved from annotations.
    pub annotations: TestAnnotations,
}

impl TestNode {
    /// Creates a new node without a parent. The legacy reporting name defaults to the display
    /// name.
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            id: id.into(),
            parent: None,
            legacy_reporting_name: display_name.clone(),
            display_name,
            kind,
            tags: vec![],
            source: None,
            annotations: TestAnnotations::default(),
        }
    }

    /// Creates a new test node.
    pub fn test(id: impl Into<NodeId>, display_name: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Test, display_name)
    }

    /// Creates a new container node.
    pub fn container(id: impl Into<NodeId>, display_name: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Container, display_name)
    }

    /// Sets the parent.
    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the legacy reporting name.
    pub fn with_legacy_reporting_name(mut self, name: impl Into<String>) -> Self {
        self.legacy_reporting_name = name.into();
        self
    }

    /// Sets the tags.
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the source.
    pub fn with_source(mut self, source: TestSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the annotations.
    pub fn with_annotations(mut self, annotations: TestAnnotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// The tree of test nodes, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct TestPlan {
    nodes: IndexMap<NodeId, TestNode>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl TestPlan {
    /// Creates an empty test plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a test plan from nodes given parent-first.
    pub fn from_nodes(nodes: impl IntoIterator<Item = TestNode>) -> Result<Self, PlanError> {
        let mut plan = Self::new();
        for node in nodes {
            plan.add(node)?;
        }
        Ok(plan)
    }

    /// Adds a node to the plan. Its parent, if any, must already be present.
    ///
    /// This is also how dynamically registered tests join the plan during execution.
    pub fn add(&mut self, node: TestNode) -> Result<(), PlanError> {
        if self.nodes.contains_key(&node.id) {
            return Err(PlanError::DuplicateNode { id: node.id });
        }
        if let Some(parent) = &node.parent {
            if !self.nodes.contains_key(parent) {
                return Err(PlanError::UnknownParent {
                    id: node.id,
                    parent: parent.clone(),
                });
            }
            self.children
                .entry(parent.clone())
                .or_default()
                .push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Returns the node with the given identifier.
    pub fn get(&self, id: &NodeId) -> Option<&TestNode> {
        self.nodes.get(id)
    }

    /// Returns all nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &TestNode> + '_ {
        self.nodes.values().filter(|node| node.parent.is_none())
    }

    /// Returns true if the node has no parent.
    pub fn is_root(&self, id: &NodeId) -> bool {
        self.get(id).is_some_and(|node| node.parent.is_none())
    }

    /// Returns the parent of the given node.
    pub fn parent(&self, id: &NodeId) -> Option<&TestNode> {
        self.get(id)
            .and_then(|node| node.parent.as_ref())
            .and_then(|parent| self.get(parent))
    }

    /// Returns the direct children of the given node, in insertion order.
    pub fn children(&self, id: &NodeId) -> impl Iterator<Item = &TestNode> + '_ {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.get(child))
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self, id: &NodeId) -> bool {
        self.children.get(id).is_none_or(|children| children.is_empty())
    }

    /// Returns every node below the given node, depth-first in pre-order. The node itself is
    /// not included.
    pub fn descendants(&self, id: &NodeId) -> Vec<&TestNode> {
        let mut out = vec![];
        let mut stack: Vec<&TestNode> = self.children(id).collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children: Vec<_> = self.children(&node.id).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Returns the ancestors of the given node, nearest first.
    pub fn ancestors(&self, id: &NodeId) -> impl Iterator<Item = &TestNode> + '_ {
        std::iter::successors(self.parent(id), |node| self.parent(&node.id))
    }

    /// Returns the number of nodes in the plan.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the plan has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan() -> TestPlan {
        TestPlan::from_nodes([
            TestNode::container("[engine:e]", "E"),
            TestNode::container("[engine:e]/[class:A]", "A").with_parent("[engine:e]"),
            TestNode::test("[engine:e]/[class:A]/[method:a1()]", "a1()")
                .with_parent("[engine:e]/[class:A]"),
            TestNode::test("[engine:e]/[class:A]/[method:a2()]", "a2()")
                .with_parent("[engine:e]/[class:A]"),
            TestNode::container("[engine:e]/[class:B]", "B").with_parent("[engine:e]"),
        ])
        .expect("plan is valid")
    }

    #[test]
    fn descendants_are_pre_order() {
        let plan = plan();
        let names: Vec<_> = plan
            .descendants(&"[engine:e]".into())
            .into_iter()
            .map(|node| node.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "a1()", "a2()", "B"]);
    }

    #[test]
    fn ancestors_nearest_first() {
        let plan = plan();
        let names: Vec<_> = plan
            .ancestors(&"[engine:e]/[class:A]/[method:a1()]".into())
            .map(|node| node.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "E"]);
        assert!(plan.is_leaf(&"[engine:e]/[class:B]".into()));
        assert!(!plan.is_leaf(&"[engine:e]/[class:A]".into()));
    }

    #[test]
    fn roots_have_no_parent() {
        let mut plan = plan();
        plan.add(TestNode::container("[engine:other]", "Other"))
            .expect("node is valid");
        let roots: Vec<_> = plan.roots().map(|node| node.display_name.as_str()).collect();
        assert_eq!(roots, vec!["E", "Other"]);
        assert!(plan.is_root(&"[engine:other]".into()));
        assert!(!plan.is_root(&"[engine:e]/[class:B]".into()));
        assert!(!plan.is_root(&"[engine:missing]".into()));
    }

    #[test]
    fn invalid_nodes_are_rejected() {
        let mut plan = plan();
        assert_eq!(
            plan.add(TestNode::container("[engine:e]", "E")),
            Err(PlanError::DuplicateNode {
                id: "[engine:e]".into()
            })
        );
        assert_eq!(
            plan.add(TestNode::test("x", "x").with_parent("missing")),
            Err(PlanError::UnknownParent {
                id: "x".into(),
                parent: "missing".into(),
            })
        );
    }

    #[test]
    fn unique_id_segments() {
        let id = NodeId::new("[engine:junit-jupiter]/[class:com.example.CalcTest]/[method:add(int, int)]");
        assert_eq!(
            id.segments(),
            vec![
                UniqueIdSegment {
                    ty: "engine",
                    value: "junit-jupiter"
                },
                UniqueIdSegment {
                    ty: "class",
                    value: "com.example.CalcTest"
                },
                UniqueIdSegment {
                    ty: "method",
                    value: "add(int, int)"
                },
            ]
        );
        assert_eq!(id.root_name(), "junit-jupiter");
        assert_eq!(NodeId::new("plain").root_name(), "plain");
    }
}
