// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generate Ant-style JUnit XML reports carrying Xray test properties.
//!
//! The format follows the legacy report layout popularized by the Ant build system: one
//! `<testsuite>` per file, with a `<properties>` block at the suite level and another one per
//! `<testcase>`. Test case properties hold the Xray-specific metadata (`test_key`,
//! `requirements`, `testrun_comment`, custom fields and evidence).

mod errors;
mod report;
mod serialize;

pub use errors::*;
pub use report::*;
pub use serialize::{escape_illegal_chars, format_local_date_time, format_seconds};
