// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Returns `None` for an empty string.
pub(crate) fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Clones a configured value, treating an empty string as unset.
pub(crate) fn non_empty_setting(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty).map(str::to_owned)
}
