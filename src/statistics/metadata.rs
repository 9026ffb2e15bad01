// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Long-term statistics stream identity.

use serde::{Deserialize, Serialize};

use crate::config::WATER_METER_NAME;
use crate::error::Error;
use crate::meter::MeterIdentity;
use crate::types::{RawUnit, VolumeUnit};

/// Source tag of imported statistics.
pub const STATISTICS_SOURCE: &str = "recorder";

/// Prefix of every statistic id.
const STATISTIC_ID_PREFIX: &str = "sensor.water_meter_";

/// Identity of one statistics stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatisticMetadata {
    /// Stable id of the stream.
    pub statistic_id: String,
    /// Display name.
    pub name: String,
    /// Unit symbol of the values.
    pub unit: String,
    /// Source tag.
    pub source: String,
    /// Whether rows carry a cumulative sum.
    pub has_sum: bool,
    /// Whether rows carry a mean.
    pub has_mean: bool,
}

/// Returns the statistic id of a meter.
///
/// It depends only on the meter UUID, so a renamed meter keeps its stream.
///
/// # Examples
///
/// ```
/// use eyeonwater::meter::MeterIdentity;
/// use eyeonwater::statistics::statistic_id_for;
///
/// let identity = MeterIdentity::new("60439875", "5215777958325016766");
/// assert_eq!(statistic_id_for(&identity), "sensor.water_meter_5215777958325016766");
/// ```
#[must_use]
pub fn statistic_id_for(identity: &MeterIdentity) -> String {
    format!("{STATISTIC_ID_PREFIX}{}", identity.uuid_key())
}

/// Builds the statistics metadata of a meter from its raw unit.
///
/// # Errors
///
/// Returns [`Error::UnknownUnit`] if `unit` is not a recognized volume unit.
pub fn build_metadata(identity: &MeterIdentity, unit: &str) -> Result<StatisticMetadata, Error> {
    let unit = unit.parse::<RawUnit>()?;
    Ok(metadata_for_unit(identity, unit.base()))
}

/// Builds the statistics metadata of a meter for an already parsed unit.
#[must_use]
pub fn metadata_for_unit(identity: &MeterIdentity, unit: VolumeUnit) -> StatisticMetadata {
    StatisticMetadata {
        statistic_id: statistic_id_for(identity),
        name: format!("{WATER_METER_NAME} {} Statistic", identity.normalized_id()),
        unit: unit.symbol().to_string(),
        source: STATISTICS_SOURCE.to_string(),
        has_sum: true,
        has_mean: false,
    }
}
