// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Selection of not-yet-imported data points.

use chrono::{DateTime, Utc};

use crate::types::DataPoint;

/// Returns the points strictly newer than `cutoff`, in input order.
///
/// With no cutoff (nothing was ever imported) every point is returned.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use eyeonwater::statistics::filter_newer;
/// use eyeonwater::types::DataPoint;
///
/// let at = |h| Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap();
/// let points = vec![DataPoint::new(at(1), 1.0), DataPoint::new(at(2), 2.0)];
///
/// assert_eq!(filter_newer(&points, None), points);
/// assert_eq!(filter_newer(&points, Some(at(1))), vec![DataPoint::new(at(2), 2.0)]);
/// ```
#[must_use]
pub fn filter_newer(points: &[DataPoint], cutoff: Option<DateTime<Utc>>) -> Vec<DataPoint> {
    match cutoff {
        None => points.to_vec(),
        Some(cutoff) => points
            .iter()
            .filter(|point| point.timestamp() > cutoff)
            .copied()
            .collect(),
    }
}
