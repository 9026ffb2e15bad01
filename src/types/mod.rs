// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the crate.
//!
//! - [`DataPoint`], [`sort_and_dedup`]: timestamped historical readings
//! - [`RawUnit`], [`VolumeUnit`], [`Reading`]: unit normalization
//! - [`normalize_id`], [`encode_id`]: labels and unique keys from meter identifiers
//! - [`parse_timestamp`]: API timestamp parsing

mod data_point;
mod id;
mod timestamp;
mod unit;

pub use data_point::{DataPoint, sort_and_dedup};
pub use id::{encode_id, normalize_id};
pub use timestamp::parse_timestamp;
pub use unit::{RawUnit, Reading, VolumeUnit, normalize_reading};
