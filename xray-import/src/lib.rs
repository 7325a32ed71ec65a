// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! This crate contains the data model for the Xray JSON import format.
//!
//! The format describes one test execution: an `info` header with the execution's metadata,
//! and a list of test runs. A test run either references an existing test by its issue key,
//! or carries a `testInfo` object from which Xray provisions the test on import.

mod date_format;
mod report;

pub use report::*;
