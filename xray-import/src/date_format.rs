// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Xray dates are ISO-8601 date-times with second precision and an explicit offset.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serializer, de::Error};

pub(crate) const XRAY_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

pub(crate) fn serialize<S>(date: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&date.format(XRAY_DATE_FORMAT))
}

pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s).map_err(D::Error::custom)
}
