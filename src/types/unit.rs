// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume units and reading normalization.
//!
//! EyeOnWater reports readings in the unit configured for the meter
//! register, which is not always a base unit (`"100 GAL"`, `"CCF"`, ...).
//! Sensors and the statistics store only accept gallons, cubic feet or
//! cubic meters, so every raw reading goes through [`RawUnit`] first.
//!
//! # Examples
//!
//! ```
//! use eyeonwater::types::{RawUnit, VolumeUnit};
//!
//! let unit: RawUnit = "100 gal".parse().unwrap();
//! assert_eq!(unit.base(), VolumeUnit::Gallons);
//!
//! let reading = unit.normalize(12.34);
//! assert_eq!(reading.value(), 1234.0);
//! assert_eq!(reading.unit().symbol(), "gal");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of decimals kept in normalized readings.
const READING_PRECISION: i32 = 4;

/// Volume units accepted by sensors and the statistics store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeUnit {
    /// US gallons.
    Gallons,
    /// Cubic feet.
    CubicFeet,
    /// Cubic meters.
    CubicMeters,
}

impl VolumeUnit {
    /// Returns the unit symbol used for sensor states and statistics.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Gallons => "gal",
            Self::CubicFeet => "ft³",
            Self::CubicMeters => "m³",
        }
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A unit as reported by the API: a base volume unit and a multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawUnit {
    base: VolumeUnit,
    multiplier: f64,
}

impl RawUnit {
    /// Creates a raw unit from its base unit and multiplier.
    #[must_use]
    pub const fn new(base: VolumeUnit, multiplier: f64) -> Self {
        Self { base, multiplier }
    }

    /// Returns the base volume unit.
    #[must_use]
    pub const fn base(&self) -> VolumeUnit {
        self.base
    }

    /// Returns the factor that converts a raw reading into the base unit.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Converts a raw reading into the base unit.
    #[must_use]
    pub fn normalize(&self, raw: f64) -> Reading {
        Reading::new(round(raw * self.multiplier), self.base)
    }
}

impl FromStr for RawUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_uppercase)
            .collect();

        let unit = match key.as_str() {
            "GAL" | "GALLON" | "GALLONS" => Self::new(VolumeUnit::Gallons, 1.0),
            "10GAL" => Self::new(VolumeUnit::Gallons, 10.0),
            "100GAL" => Self::new(VolumeUnit::Gallons, 100.0),
            "KGAL" | "1000GAL" => Self::new(VolumeUnit::Gallons, 1000.0),
            "CF" | "FT3" | "FT³" | "CUBICFOOT" | "CUBICFEET" => {
                Self::new(VolumeUnit::CubicFeet, 1.0)
            }
            "10CF" => Self::new(VolumeUnit::CubicFeet, 10.0),
            "CCF" | "100CF" => Self::new(VolumeUnit::CubicFeet, 100.0),
            "CM" | "M3" | "M³" | "CUBICMETER" | "CUBICMETERS" => {
                Self::new(VolumeUnit::CubicMeters, 1.0)
            }
            "10CM" => Self::new(VolumeUnit::CubicMeters, 10.0),
            _ => return Err(Error::UnknownUnit(s.to_string())),
        };

        Ok(unit)
    }
}

/// A reading normalized into a base volume unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    value: f64,
    unit: VolumeUnit,
}

impl Reading {
    /// Creates a reading.
    #[must_use]
    pub const fn new(value: f64, unit: VolumeUnit) -> Self {
        Self { value, unit }
    }

    /// Returns the value in [`unit`](Self::unit).
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Returns the volume unit.
    #[must_use]
    pub const fn unit(&self) -> VolumeUnit {
        self.unit
    }
}

/// Parses a raw unit and converts a raw reading in one step.
///
/// # Errors
///
/// Returns [`Error::UnknownUnit`] if the unit is not recognized.
pub fn normalize_reading(raw: f64, unit: &str) -> Result<Reading, Error> {
    Ok(unit.parse::<RawUnit>()?.normalize(raw))
}

fn round(value: f64) -> f64 {
    let factor = 10f64.powi(READING_PRECISION);
    (value * factor).round() / factor
}
