// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Historical usage samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical usage sample of a meter.
///
/// Data points are ordered by timestamp. Two points with the same
/// timestamp describe the same sample.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use eyeonwater::types::DataPoint;
///
/// let point = DataPoint::new(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(), 1234.5);
/// assert_eq!(point.reading(), 1234.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    timestamp: DateTime<Utc>,
    reading: f64,
}

impl DataPoint {
    /// Creates a data point.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, reading: f64) -> Self {
        Self { timestamp, reading }
    }

    /// Returns the time of the sample.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the cumulative meter reading at [`timestamp`](Self::timestamp).
    #[must_use]
    pub const fn reading(&self) -> f64 {
        self.reading
    }
}

/// Sorts points by timestamp and drops repeated timestamps, keeping the
/// last reading reported for each.
pub fn sort_and_dedup(points: &mut Vec<DataPoint>) {
    points.sort_by_key(DataPoint::timestamp);
    let mut deduped: Vec<DataPoint> = Vec::with_capacity(points.len());
    for point in points.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => deduped.push(point),
        }
    }
    *points = deduped;
}
