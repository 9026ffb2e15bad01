// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device registry information shared by all entities of a meter.

use serde::Serialize;

use crate::config::{DOMAIN, WATER_METER_NAME};
use crate::meter::{MeterIdentity, MeterInfo};

/// Describes the physical meter all of its entities belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// `(domain, meter UUID key)`.
    pub identifiers: (String, String),
    /// `Water Meter <normalized meter id>`.
    pub name: String,
    /// Meter model.
    pub model: Option<String>,
    /// The utility operating the meter.
    pub manufacturer: Option<String>,
    /// Endpoint hardware version.
    pub hw_version: Option<String>,
    /// Endpoint firmware version.
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    /// Builds the device information of a meter.
    ///
    /// # Examples
    ///
    /// ```
    /// use eyeonwater::entity::DeviceInfo;
    /// use eyeonwater::meter::{MeterIdentity, MeterInfo};
    ///
    /// let device = DeviceInfo::for_meter(
    ///     &MeterIdentity::new("60439875", "5215777958325016766"),
    ///     &MeterInfo::default(),
    /// );
    /// assert_eq!(device.name, "Water Meter 60439875");
    /// assert_eq!(device.identifiers.1, "5215777958325016766");
    /// ```
    #[must_use]
    pub fn for_meter(identity: &MeterIdentity, info: &MeterInfo) -> Self {
        let reading = &info.reading;
        Self {
            identifiers: (DOMAIN.to_string(), identity.uuid_key()),
            name: format!("{WATER_METER_NAME} {}", identity.normalized_id()),
            model: reading.model.clone(),
            manufacturer: reading.customer_name.clone(),
            hw_version: reading.hardware_version.clone(),
            sw_version: reading.firmware_version.clone(),
        }
    }
}
