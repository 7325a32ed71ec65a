// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the Xray reporter.

use crate::plan::NodeId;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the report configuration.
#[derive(Debug, Error)]
#[error("failed to parse report config at `{config_file}`")]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An error that occurred while adding a node to a [`TestPlan`](crate::plan::TestPlan).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// A node with the same identifier was already added.
    #[error("test node `{id}` was already added to the test plan")]
    DuplicateNode {
        /// The identifier of the node.
        id: NodeId,
    },

    /// The node's parent is not part of the plan.
    #[error("parent `{parent}` of test node `{id}` is not part of the test plan")]
    UnknownParent {
        /// The identifier of the node.
        id: NodeId,

        /// The identifier of the missing parent.
        parent: NodeId,
    },
}

/// An error that occurred while writing a report to disk.
///
/// These errors never reach the host test run: the
/// [`ReportGenerator`](crate::generator::ReportGenerator) logs them and moves on to the next
/// report root.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteReportError {
    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit XML report to {file}")]
    Xml {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: xray_junit::SerializeError,
    },

    /// An error occurred while producing Xray JSON.
    #[error("error writing Xray JSON report to {file}")]
    Json {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// Displays an error along with the chain of errors that caused it.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(cause) = source {
            write!(f, "\n  caused by: {cause}")?;
            source = cause.source();
        }
        Ok(())
    }
}
