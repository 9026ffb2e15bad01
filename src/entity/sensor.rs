// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Numeric sensors of a meter.

use parking_lot::RwLock;

use super::{Binding, DeviceInfo};
use crate::config::WATER_METER_NAME;
use crate::statistics::statistic_id_for;
use crate::types::VolumeUnit;

/// Device class of a numeric sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorDeviceClass {
    /// Water volume.
    Water,
    /// Temperature.
    Temperature,
}

/// How a host should aggregate a sensor's states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateClass {
    /// A cumulative total that only resets when the meter does.
    TotalIncreasing,
    /// A point-in-time measurement.
    Measurement,
}

/// Unit symbol of temperature sensors.
pub const CELSIUS: &str = "°C";

/// Display precision suggested for volume sensors.
pub const VOLUME_DISPLAY_PRECISION: u8 = 0;

/// Value restored from a previous run, used until the first cycle succeeds.
#[derive(Debug, Default)]
struct Restored(RwLock<Option<f64>>);

impl Restored {
    fn set(&self, value: f64) {
        *self.0.write() = Some(value);
    }

    fn get(&self) -> Option<f64> {
        *self.0.read()
    }
}

/// Latest normalized reading of [`Binding`], or the restored value before
/// the first successful cycle.
fn reading_value(binding: &Binding, restored: &Restored) -> Option<f64> {
    if !binding.has_succeeded() {
        return restored.get();
    }
    binding
        .meter
        .with_snapshot(|s| s.info.normalized_reading().ok())
        .map(|reading| reading.value())
}

fn reading_unit(binding: &Binding) -> Option<VolumeUnit> {
    binding
        .meter
        .with_snapshot(|s| s.info.normalized_reading().ok())
        .map(|reading| reading.unit())
}

fn reading_available(binding: &Binding, restored: &Restored) -> bool {
    binding.live() || (!binding.has_succeeded() && restored.get().is_some())
}

// ============================================================================
// WaterSensor
// ============================================================================

/// Cumulative water consumption of a meter.
#[derive(Debug)]
pub struct WaterSensor {
    binding: Binding,
    restored: Restored,
}

impl WaterSensor {
    pub(crate) fn new(binding: Binding) -> Self {
        Self {
            binding,
            restored: Restored::default(),
        }
    }

    /// Returns the unique id: the meter's UUID key.
    #[must_use]
    pub fn unique_id(&self) -> String {
        self.binding.meter.identity().uuid_key()
    }

    /// Returns the device the sensor belongs to.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.binding.device
    }

    /// Returns the device class.
    #[must_use]
    pub fn device_class(&self) -> SensorDeviceClass {
        SensorDeviceClass::Water
    }

    /// Returns the state class.
    #[must_use]
    pub fn state_class(&self) -> Option<StateClass> {
        Some(StateClass::TotalIncreasing)
    }

    /// Returns the unit of the value, if the register unit is known.
    #[must_use]
    pub fn unit(&self) -> Option<VolumeUnit> {
        reading_unit(&self.binding)
    }

    /// Returns the latest normalized reading.
    #[must_use]
    pub fn native_value(&self) -> Option<f64> {
        reading_value(&self.binding, &self.restored)
    }

    /// Returns `true` if the value is current or restored.
    #[must_use]
    pub fn available(&self) -> bool {
        reading_available(&self.binding, &self.restored)
    }

    /// Returns the register reading as JSON attributes.
    #[must_use]
    pub fn attributes(&self) -> serde_json::Value {
        self.binding
            .meter
            .with_snapshot(|s| serde_json::to_value(&s.info.reading))
            .unwrap_or(serde_json::Value::Null)
    }

    /// Seeds the value shown until the first cycle succeeds.
    pub fn restore(&self, value: f64) {
        self.restored.set(value);
    }
}

// ============================================================================
// StatisticSensor
// ============================================================================

/// The sensor the imported long-term statistics are attached to.
#[derive(Debug)]
pub struct StatisticSensor {
    binding: Binding,
    restored: Restored,
}

impl StatisticSensor {
    pub(crate) fn new(binding: Binding) -> Self {
        Self {
            binding,
            restored: Restored::default(),
        }
    }

    /// Returns the unique id: `<uuid key>_statistic`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("{}_statistic", self.binding.meter.identity().uuid_key())
    }

    /// Returns `Water Meter <normalized id> Statistic`.
    #[must_use]
    pub fn name(&self) -> String {
        format!(
            "{WATER_METER_NAME} {} Statistic",
            self.binding.meter.identity().normalized_id()
        )
    }

    /// Returns the id of the statistics stream fed by the coordinator.
    #[must_use]
    pub fn statistic_id(&self) -> String {
        statistic_id_for(self.binding.meter.identity())
    }

    /// Returns the device the sensor belongs to.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.binding.device
    }

    /// Returns the device class.
    #[must_use]
    pub fn device_class(&self) -> SensorDeviceClass {
        SensorDeviceClass::Water
    }

    /// Returns the unit of the value, if the register unit is known.
    #[must_use]
    pub fn unit(&self) -> Option<VolumeUnit> {
        reading_unit(&self.binding)
    }

    /// Returns the latest normalized reading.
    #[must_use]
    pub fn native_value(&self) -> Option<f64> {
        reading_value(&self.binding, &self.restored)
    }

    /// Returns `true` if the value is current or restored.
    #[must_use]
    pub fn available(&self) -> bool {
        reading_available(&self.binding, &self.restored)
    }

    /// Seeds the value shown until the first cycle succeeds.
    pub fn restore(&self, value: f64) {
        self.restored.set(value);
    }
}

// ============================================================================
// TemperatureSensor
// ============================================================================

/// Seven-day minimum of the endpoint temperature.
#[derive(Debug)]
pub struct TemperatureSensor {
    binding: Binding,
}

impl TemperatureSensor {
    pub(crate) fn new(binding: Binding) -> Self {
        Self { binding }
    }

    /// Returns the unique id: `<uuid key>_temperature`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!("{}_temperature", self.binding.meter.identity().uuid_key())
    }

    /// Returns the device the sensor belongs to.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.binding.device
    }

    /// Returns the device class.
    #[must_use]
    pub fn device_class(&self) -> SensorDeviceClass {
        SensorDeviceClass::Temperature
    }

    /// Returns the unit symbol.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        CELSIUS
    }

    /// Returns the seven-day minimum temperature.
    #[must_use]
    pub fn native_value(&self) -> Option<f64> {
        self.binding
            .meter
            .with_snapshot(|s| s.info.endpoint_temperature().and_then(|t| t.seven_day_min))
    }

    /// Returns `true` if the last cycle succeeded.
    #[must_use]
    pub fn available(&self) -> bool {
        self.binding.live()
    }
}
