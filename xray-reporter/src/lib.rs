// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Test reporting for Xray.
//!
//! A host test framework feeds lifecycle events for a [`TestPlan`](plan::TestPlan) into a
//! [`ReportGenerator`](generator::ReportGenerator). The generator records them in a
//! thread-safe event store, and as soon as a report root finishes it aggregates the results of
//! every test below that root and writes either an Ant-style JUnit XML report enhanced with Xray
//! properties, or an Xray JSON import document.
//!
//! Besides the standard outcome of each test, tests can pass extra data to the report through
//! report entries with reserved keys: run comments, test run custom fields and evidence files.
//! See [`side_channel`] for the keys and [`side_channel::TestRunReporter`] for a producer-side
//! helper.

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod events;
pub mod generator;
mod helpers;
pub mod hierarchy;
pub mod metadata;
pub mod plan;
pub mod side_channel;
pub mod store;
pub mod writer;
