// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Meter information snapshot as returned by the search endpoint.

use serde::{Deserialize, Serialize};

use super::MeterFlags;
use crate::error::Error;
use crate::types::{RawUnit, Reading};

/// Latest information about a meter.
///
/// # Examples
///
/// ```
/// use eyeonwater::meter::MeterInfo;
///
/// let json = r#"{
///     "register_0": {
///         "model": "MACH 10",
///         "customer_name": "Springfield Water",
///         "flags": {"Leak": false},
///         "latest_read": {"full_read": 123.4, "units": "CF"}
///     }
/// }"#;
/// let info: MeterInfo = serde_json::from_str(json).unwrap();
/// assert_eq!(info.reading.model.as_deref(), Some("MACH 10"));
/// assert_eq!(info.normalized_reading().unwrap().value(), 123.4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterInfo {
    /// Register data of the meter.
    #[serde(rename = "register_0")]
    pub reading: RegisterReading,

    /// Optional endpoint sensors.
    #[serde(default)]
    pub sensors: Option<Sensors>,
}

impl MeterInfo {
    /// Returns the latest read converted into a base volume unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownUnit`] if the register unit is not recognized.
    pub fn normalized_reading(&self) -> Result<Reading, Error> {
        let latest = &self.reading.latest_read;
        Ok(latest.units.parse::<RawUnit>()?.normalize(latest.full_read))
    }

    /// Returns the endpoint temperature sensor data, if the meter has one.
    #[must_use]
    pub fn endpoint_temperature(&self) -> Option<&EndpointTemperature> {
        self.sensors
            .as_ref()
            .and_then(|s| s.endpoint_temperature.as_ref())
    }
}

/// Register data: device details, flags and the latest read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterReading {
    /// Meter model.
    #[serde(default)]
    pub model: Option<String>,

    /// Utility the meter belongs to.
    #[serde(default)]
    pub customer_name: Option<String>,

    /// Endpoint hardware version.
    #[serde(default)]
    pub hardware_version: Option<String>,

    /// Endpoint firmware version.
    #[serde(default)]
    pub firmware_version: Option<String>,

    /// Status flags.
    #[serde(default)]
    pub flags: MeterFlags,

    /// Latest cumulative read.
    #[serde(default)]
    pub latest_read: LatestRead,
}

/// The latest cumulative read of a register.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestRead {
    /// Cumulative reading in [`units`](Self::units).
    #[serde(default)]
    pub full_read: f64,

    /// Raw unit of the reading, e.g. `"GAL"` or `"100 CF"`.
    #[serde(default)]
    pub units: String,

    /// When the read was taken.
    #[serde(default)]
    pub read_time: Option<String>,
}

/// Endpoint sensors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensors {
    /// Endpoint temperature, in °C.
    #[serde(default)]
    pub endpoint_temperature: Option<EndpointTemperature>,
}

/// Endpoint temperature statistics, in °C.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointTemperature {
    /// Minimum over the last seven days.
    #[serde(default)]
    pub seven_day_min: Option<f64>,
    /// Average over the last seven days.
    #[serde(default)]
    pub seven_day_average: Option<f64>,
    /// Maximum over the last seven days.
    #[serde(default)]
    pub seven_day_max: Option<f64>,
    /// Latest average.
    #[serde(default)]
    pub latest_average: Option<f64>,
}
