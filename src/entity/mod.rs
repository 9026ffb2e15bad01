// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-facing entities of the meters of an account.
//!
//! Every meter gets a [`WaterSensor`], a [`StatisticSensor`], one
//! [`FlagSensor`] per [`FlagKind`] and, if the meter reported an endpoint
//! temperature at setup, a [`TemperatureSensor`]. Entities read the shared
//! [`MeterHandle`] of their meter and report unavailable while the last
//! cycle of the coordinator failed.
//!
//! # Examples
//!
//! ```no_run
//! use eyeonwater::entity::{self, Entity};
//! # use eyeonwater::{Integration, IntegrationConfig};
//! # use eyeonwater::statistics::MemoryStatisticsStore;
//!
//! # async fn example() -> eyeonwater::Result<()> {
//! # let config = IntegrationConfig::new("user", "secret");
//! let integration = Integration::connect(config, MemoryStatisticsStore::new()).await?;
//! for entity in entity::sensors(integration.context()) {
//!     println!("{} = {:?}", entity.unique_id(), entity.state());
//! }
//! # Ok(())
//! # }
//! ```

mod binary_sensor;
mod device_info;
mod sensor;

pub use binary_sensor::FlagSensor;
pub use device_info::DeviceInfo;
pub use sensor::{
    CELSIUS, SensorDeviceClass, StateClass, StatisticSensor, TemperatureSensor,
    VOLUME_DISPLAY_PRECISION, WaterSensor,
};

use tokio::sync::watch;

use crate::api::MeterApi;
use crate::coordinator::UpdateStatus;
use crate::integration::EntryContext;
use crate::meter::{FlagKind, MeterHandle};
use crate::statistics::StatisticsStore;

/// What links an entity to its meter and to the coordinator's status.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    meter: MeterHandle,
    status: watch::Receiver<UpdateStatus>,
    device: DeviceInfo,
}

impl Binding {
    fn new(meter: &MeterHandle, status: &watch::Receiver<UpdateStatus>) -> Self {
        let device = meter.with_snapshot(|s| DeviceInfo::for_meter(meter.identity(), &s.info));
        Self {
            meter: meter.clone(),
            status: status.clone(),
            device,
        }
    }

    /// `true` if the last finished cycle succeeded.
    fn live(&self) -> bool {
        self.status.borrow().last_update_success
    }

    fn has_succeeded(&self) -> bool {
        self.status.borrow().has_succeeded()
    }
}

/// Host platform of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Numeric sensors.
    Sensor,
    /// On/off sensors.
    BinarySensor,
}

/// Current state of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityState {
    /// The coordinator's last cycle failed.
    Unavailable,
    /// Available, but there is no value.
    Unknown,
    /// A numeric value.
    Value(f64),
    /// A binary value.
    Flag(bool),
}

/// Any entity of a meter.
#[derive(Debug)]
pub enum Entity {
    /// Cumulative consumption.
    Water(WaterSensor),
    /// Long-term statistics anchor.
    Statistic(StatisticSensor),
    /// Endpoint temperature.
    Temperature(TemperatureSensor),
    /// Status flag.
    Flag(FlagSensor),
}

impl Entity {
    /// Returns the unique id of the entity.
    #[must_use]
    pub fn unique_id(&self) -> String {
        match self {
            Self::Water(s) => s.unique_id(),
            Self::Statistic(s) => s.unique_id(),
            Self::Temperature(s) => s.unique_id(),
            Self::Flag(s) => s.unique_id(),
        }
    }

    /// Returns the device the entity belongs to.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        match self {
            Self::Water(s) => s.device_info(),
            Self::Statistic(s) => s.device_info(),
            Self::Temperature(s) => s.device_info(),
            Self::Flag(s) => s.device_info(),
        }
    }

    /// Returns the platform the entity is registered on.
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            Self::Flag(_) => Platform::BinarySensor,
            _ => Platform::Sensor,
        }
    }

    /// Returns `true` if the entity has a current or restored state.
    #[must_use]
    pub fn available(&self) -> bool {
        match self {
            Self::Water(s) => s.available(),
            Self::Statistic(s) => s.available(),
            Self::Temperature(s) => s.available(),
            Self::Flag(s) => s.available(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        if !self.available() {
            return EntityState::Unavailable;
        }
        let value = match self {
            Self::Water(s) => s.native_value(),
            Self::Statistic(s) => s.native_value(),
            Self::Temperature(s) => s.native_value(),
            Self::Flag(s) => return EntityState::Flag(s.is_on()),
        };
        value.map_or(EntityState::Unknown, EntityState::Value)
    }
}

/// Creates the sensors of every meter of an account.
#[must_use]
pub fn sensors<A: MeterApi, S: StatisticsStore>(context: &EntryContext<A, S>) -> Vec<Entity> {
    let coordinator = context.coordinator();
    sensor_entities(coordinator.meters(), &coordinator.watch_status())
}

/// Creates the flag sensors of every meter of an account.
#[must_use]
pub fn binary_sensors<A: MeterApi, S: StatisticsStore>(
    context: &EntryContext<A, S>,
) -> Vec<Entity> {
    let coordinator = context.coordinator();
    flag_entities(coordinator.meters(), &coordinator.watch_status())
}

fn sensor_entities(meters: &[MeterHandle], status: &watch::Receiver<UpdateStatus>) -> Vec<Entity> {
    let mut entities = Vec::with_capacity(meters.len() * 3);
    for meter in meters {
        let binding = Binding::new(meter, status);
        let has_temperature = meter.with_snapshot(|s| s.info.endpoint_temperature().is_some());

        entities.push(Entity::Statistic(StatisticSensor::new(binding.clone())));
        entities.push(Entity::Water(WaterSensor::new(binding.clone())));
        if has_temperature {
            entities.push(Entity::Temperature(TemperatureSensor::new(binding)));
        }
    }
    entities
}

fn flag_entities(meters: &[MeterHandle], status: &watch::Receiver<UpdateStatus>) -> Vec<Entity> {
    meters
        .iter()
        .flat_map(|meter| {
            let binding = Binding::new(meter, status);
            FlagKind::ALL
                .into_iter()
                .map(move |kind| Entity::Flag(FlagSensor::new(binding.clone(), kind)))
        })
        .collect()
}
