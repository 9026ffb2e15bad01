// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Meter status flags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status flags reported with the latest meter read.
///
/// Unknown flags in the payload are ignored and missing ones default to
/// `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeterFlags {
    /// Continuous flow detected.
    pub leak: bool,
    /// The pipe at the meter is empty.
    pub empty_pipe: bool,
    /// The meter was tampered with.
    pub tamper: bool,
    /// The meter cover was removed.
    pub cover_removed: bool,
    /// Water is flowing backwards through the meter.
    pub reverse_flow: bool,
    /// The endpoint battery is low.
    pub low_battery: bool,
    /// The endpoint battery is charging.
    pub battery_charging: bool,
}

impl MeterFlags {
    /// Returns the value of one flag.
    #[must_use]
    pub const fn get(&self, kind: FlagKind) -> bool {
        match kind {
            FlagKind::Leak => self.leak,
            FlagKind::EmptyPipe => self.empty_pipe,
            FlagKind::Tamper => self.tamper,
            FlagKind::CoverRemoved => self.cover_removed,
            FlagKind::ReverseFlow => self.reverse_flow,
            FlagKind::LowBattery => self.low_battery,
            FlagKind::BatteryCharging => self.battery_charging,
        }
    }

    /// Returns the flags that are currently raised.
    #[must_use]
    pub fn active(&self) -> Vec<FlagKind> {
        FlagKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind))
            .collect()
    }
}

/// Device class of a flag sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagDeviceClass {
    /// Wet/dry.
    Moisture,
    /// Problem/OK.
    Problem,
    /// Tampering detected/clear.
    Tamper,
    /// Battery low/normal.
    Battery,
    /// Battery charging/not charging.
    BatteryCharging,
}

/// One kind of meter flag, exposed as its own binary sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKind {
    /// See [`MeterFlags::leak`].
    Leak,
    /// See [`MeterFlags::empty_pipe`].
    EmptyPipe,
    /// See [`MeterFlags::tamper`].
    Tamper,
    /// See [`MeterFlags::cover_removed`].
    CoverRemoved,
    /// See [`MeterFlags::reverse_flow`].
    ReverseFlow,
    /// See [`MeterFlags::low_battery`].
    LowBattery,
    /// See [`MeterFlags::battery_charging`].
    BatteryCharging,
}

impl FlagKind {
    /// Every flag, in sensor creation order.
    pub const ALL: [Self; 7] = [
        Self::Leak,
        Self::EmptyPipe,
        Self::Tamper,
        Self::CoverRemoved,
        Self::ReverseFlow,
        Self::LowBattery,
        Self::BatteryCharging,
    ];

    /// Returns the key used in unique ids.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Leak => "leak",
            Self::EmptyPipe => "empty_pipe",
            Self::Tamper => "tamper",
            Self::CoverRemoved => "cover_removed",
            Self::ReverseFlow => "reverse_flow",
            Self::LowBattery => "low_battery",
            Self::BatteryCharging => "battery_charging",
        }
    }

    /// Returns the translation key, if the flag has its own name.
    ///
    /// Battery flags are named by their device class instead.
    #[must_use]
    pub const fn translation_key(self) -> Option<&'static str> {
        match self {
            Self::Leak => Some("leak"),
            Self::EmptyPipe => Some("emptypipe"),
            Self::Tamper => Some("tamper"),
            Self::CoverRemoved => Some("coverremoved"),
            Self::ReverseFlow => Some("reverseflow"),
            Self::LowBattery | Self::BatteryCharging => None,
        }
    }

    /// Returns the device class of the flag sensor.
    #[must_use]
    pub const fn device_class(self) -> FlagDeviceClass {
        match self {
            Self::Leak => FlagDeviceClass::Moisture,
            Self::EmptyPipe | Self::ReverseFlow => FlagDeviceClass::Problem,
            Self::Tamper | Self::CoverRemoved => FlagDeviceClass::Tamper,
            Self::LowBattery => FlagDeviceClass::Battery,
            Self::BatteryCharging => FlagDeviceClass::BatteryCharging,
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_pascal_case_with_defaults() {
        let flags: MeterFlags =
            serde_json::from_str(r#"{"Leak": true, "CoverRemoved": true, "Unknown": true}"#)
                .unwrap();
        assert!(flags.leak);
        assert!(flags.cover_removed);
        assert!(!flags.tamper);
        assert!(!flags.battery_charging);
    }

    #[test]
    fn get_matches_fields() {
        let flags = MeterFlags {
            reverse_flow: true,
            low_battery: true,
            ..MeterFlags::default()
        };
        assert!(flags.get(FlagKind::ReverseFlow));
        assert!(flags.get(FlagKind::LowBattery));
        assert!(!flags.get(FlagKind::Leak));
        assert_eq!(
            flags.active(),
            vec![FlagKind::ReverseFlow, FlagKind::LowBattery]
        );
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = FlagKind::ALL.iter().map(|k| k.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), FlagKind::ALL.len());
    }

    #[test]
    fn device_classes() {
        assert_eq!(FlagKind::Leak.device_class(), FlagDeviceClass::Moisture);
        assert_eq!(FlagKind::CoverRemoved.device_class(), FlagDeviceClass::Tamper);
        assert_eq!(FlagKind::LowBattery.translation_key(), None);
        assert_eq!(FlagKind::EmptyPipe.translation_key(), Some("emptypipe"));
    }
}
