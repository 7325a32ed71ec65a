// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of inherited state by walking a node's parent chain.

use crate::{
    events::ExecutionRecord,
    plan::{NodeId, TestPlan},
    store::ReportData,
};

/// A view of the event store that understands the shape of the test plan.
#[derive(Clone, Copy, Debug)]
pub struct Hierarchy<'a> {
    plan: &'a TestPlan,
    data: &'a ReportData,
}

impl<'a> Hierarchy<'a> {
    /// Creates a new `Hierarchy`.
    pub fn new(plan: &'a TestPlan, data: &'a ReportData) -> Self {
        Self { plan, data }
    }

    /// Returns the nearest node, starting with `id` itself, that was marked as skipped.
    pub fn find_skipped_ancestor(&self, id: &NodeId) -> Option<&'a NodeId> {
        let node = self.plan.get(id)?;
        std::iter::once(node)
            .chain(self.plan.ancestors(id))
            .map(|node| &node.id)
            .find(|id| self.data.own_skip_reason(id).is_some())
    }

    /// Returns true if the node or any of its ancestors was skipped.
    pub fn was_skipped(&self, id: &NodeId) -> bool {
        self.find_skipped_ancestor(id).is_some()
    }

    /// Returns the reason the node was skipped.
    ///
    /// Reasons inherited from an ancestor read `parent was skipped: '<reason>'`.
    pub fn skip_reason(&self, id: &NodeId) -> Option<String> {
        let skipped = self.find_skipped_ancestor(id)?;
        let reason = self.data.own_skip_reason(skipped).unwrap_or_default();
        if skipped == id {
            Some(reason)
        } else {
            Some(format!("parent was skipped: '{reason}'"))
        }
    }

    /// Returns the records of the node, then its parent, and so on up to and including `root`.
    ///
    /// If `root` is not an ancestor of the node, the walk continues to the top of the plan.
    pub fn execution_records_for(&self, id: &NodeId, root: &NodeId) -> Vec<ExecutionRecord> {
        let mut records = self.data.own_records(id);
        if id == root {
            return records;
        }
        for ancestor in self.plan.ancestors(id) {
            records.extend(self.data.own_records(&ancestor.id));
            if &ancestor.id == root {
                break;
            }
        }
        records
    }
}
