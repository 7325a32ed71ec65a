// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report configuration.
//!
//! A [`ReportConfig`] is built once by the host, usually through
//! [`ReportConfig::from_file_or_default`], and handed to the
//! [`ReportGenerator`](crate::generator::ReportGenerator).

use crate::errors::{ConfigParseError, DisplayErrorChain};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, fmt};
use tracing::warn;
use xray_import::XrayFlavor;

/// The format reports are written in.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// Ant-style JUnit XML with Xray properties.
    #[default]
    LegacyXml,

    /// The Xray JSON import format.
    XrayJson,
}

impl ReportFormat {
    /// The extension of report files, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::LegacyXml => "xml",
            ReportFormat::XrayJson => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::LegacyXml => write!(f, "legacy-xml"),
            ReportFormat::XrayJson => write!(f, "xray-json"),
        }
    }
}

/// Configuration for the report generator.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ReportConfig {
    /// The report format.
    pub format: ReportFormat,

    /// The directory reports are written to.
    pub report_directory: Utf8PathBuf,

    /// Overrides the base name of report files.
    #[serde(default)]
    pub report_filename: Option<String>,

    /// Whether to append the generation time to report file names.
    pub add_timestamp_to_report_filename: bool,

    /// Whether to only report tests that carry Xray metadata.
    pub report_only_annotated_tests: bool,

    /// Whether to write one report per class instead of one per engine.
    pub reports_per_class: bool,

    /// Xray-specific settings.
    pub xray: XrayConfig,
}

/// Settings for the Xray JSON format.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct XrayConfig {
    /// Whether to target Xray Cloud rather than Xray Server.
    pub cloud: bool,

    /// The user who executed the tests.
    #[serde(default)]
    pub user: Option<String>,

    /// The summary of the Test Execution.
    #[serde(default)]
    pub summary: Option<String>,

    /// The description of the Test Execution.
    #[serde(default)]
    pub description: Option<String>,

    /// The project key. Also used for provisioned test definitions.
    #[serde(default)]
    pub project_key: Option<String>,

    /// The version the tests ran against.
    #[serde(default)]
    pub version: Option<String>,

    /// The source code revision the tests ran against.
    #[serde(default)]
    pub revision: Option<String>,

    /// An existing Test Execution to report into.
    #[serde(default)]
    pub test_execution_key: Option<String>,

    /// The Test Plan the execution belongs to.
    #[serde(default)]
    pub test_plan_key: Option<String>,

    /// The test environments.
    #[serde(default)]
    pub test_environments: Vec<String>,
}

impl XrayConfig {
    /// The Xray flavor, which determines the status vocabulary.
    pub fn flavor(&self) -> XrayFlavor {
        if self.cloud {
            XrayFlavor::Cloud
        } else {
            XrayFlavor::Server
        }
    }
}

impl Default for XrayConfig {
    fn default() -> Self {
        Self {
            cloud: true,
            user: None,
            summary: Some("test automation results".to_owned()),
            description: None,
            project_key: None,
            version: None,
            revision: None,
            test_execution_key: None,
            test_plan_key: None,
            test_environments: vec![],
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::LegacyXml,
            report_directory: Utf8PathBuf::from("target"),
            report_filename: None,
            add_timestamp_to_report_filename: false,
            report_only_annotated_tests: false,
            reports_per_class: false,
            xray: XrayConfig::default(),
        }
    }
}

impl ReportConfig {
    /// The default configuration, shipped with this crate.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the configuration from the given file, layered over the default configuration.
    ///
    /// Unknown keys are logged and ignored.
    pub fn from_file(config_file: &Utf8Path) -> Result<Self, ConfigParseError> {
        Self::from_file_impl(config_file, |config_file, unknown| {
            warn_unknown_keys(config_file, unknown)
        })
    }

    /// Reads the configuration from the given file if there is one. On failure, logs a warning
    /// and returns the default configuration.
    pub fn from_file_or_default(config_file: Option<&Utf8Path>) -> Self {
        let Some(config_file) = config_file else {
            return Self::default();
        };
        match Self::from_file(config_file) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    "using default report config: {}",
                    DisplayErrorChain::new(err)
                );
                Self::default()
            }
        }
    }

    // A custom unknown_callback can be passed in while testing.
    fn from_file_impl(
        config_file: &Utf8Path,
        mut unknown_callback: impl FnMut(&Utf8Path, &BTreeSet<String>),
    ) -> Result<Self, ConfigParseError> {
        let builder = Self::make_default_config()
            .add_source(File::new(config_file.as_str(), FileFormat::Toml));
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|err| ConfigParseError::new(config_file, err))?;
        if !unknown.is_empty() {
            unknown_callback(config_file, &unknown);
        }
        Ok(config)
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(Self, BTreeSet<String>), ConfigError> {
        let config = builder.build_cloned()?;
        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let config: Self = serde_ignored::deserialize(config, &mut cb)?;
        Ok((config, ignored))
    }
}

fn warn_unknown_keys(config_file: &Utf8Path, unknown: &BTreeSet<String>) {
    let mut unknown_str = String::new();
    if unknown.len() == 1 {
        // Print this on the same line.
        unknown_str.push_str("key: ");
        unknown_str.extend(unknown.iter().map(String::as_str));
    } else {
        unknown_str.push_str("keys:\n");
        for ignored_key in unknown {
            unknown_str.push('\n');
            unknown_str.push_str("  - ");
            unknown_str.push_str(ignored_key);
        }
    }

    warn!("in report config file {config_file}, ignoring unknown configuration {unknown_str}");
}
