// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier normalization.

use std::fmt::Write;

/// Normalizes a meter id into a readable, lower-case label.
///
/// The result is lower-case and every character outside `[a-z0-9]` is
/// replaced by `_`. Distinct inputs may share a label, so use
/// [`encode_id`] wherever the result must be unique.
///
/// # Examples
///
/// ```
/// use eyeonwater::types::normalize_id;
///
/// assert_eq!(normalize_id("ABC-123.4"), "abc_123_4");
/// assert_eq!(normalize_id("5215777958325016766"), "5215777958325016766");
/// ```
#[must_use]
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Encodes a meter UUID into a unique key made of `[a-z0-9_]`.
///
/// Bytes in `[a-z0-9]` are kept. Every other byte of the UTF-8 input,
/// upper-case letters and `_` included, is written as `_` followed by two
/// lower-case hex digits. Distinct inputs always give distinct keys, and
/// all-numeric UUIDs come out unchanged.
///
/// # Examples
///
/// ```
/// use eyeonwater::types::encode_id;
///
/// assert_eq!(encode_id("5215777958325016766"), "5215777958325016766");
/// assert_eq!(encode_id("ab-12"), "ab_2d12");
/// assert_ne!(encode_id("Ab-12"), encode_id("ab_12"));
/// ```
#[must_use]
pub fn encode_id(id: &str) -> String {
    let mut key = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() {
            key.push(char::from(byte));
        } else {
            // Writing to a String never fails
            let _ = write!(key, "_{byte:02x}");
        }
    }
    key
}
