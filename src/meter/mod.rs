// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Water meters and their shared state.
//!
//! A [`Meter`] is what discovery returns: an identity plus the first
//! [`MeterInfo`]. The coordinator turns each one into a [`MeterHandle`],
//! which all entities of the meter share. Every successful cycle replaces
//! the handle's [`MeterSnapshot`] as a whole, so readers always observe a
//! complete snapshot from either before or after the cycle.

mod flags;
mod info;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

pub use flags::{FlagDeviceClass, FlagKind, MeterFlags};
pub use info::{EndpointTemperature, LatestRead, MeterInfo, RegisterReading, Sensors};

use crate::types::{DataPoint, encode_id, normalize_id};

/// Identifiers of a meter.
///
/// The `meter_uuid` is stable for the lifetime of the physical meter and
/// is used for every unique key. The `meter_id` is the human-facing
/// number printed on the meter and may be reused or renamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeterIdentity {
    meter_id: String,
    meter_uuid: String,
}

impl MeterIdentity {
    /// Creates a meter identity from the raw API identifiers.
    #[must_use]
    pub fn new(meter_id: impl Into<String>, meter_uuid: impl Into<String>) -> Self {
        Self {
            meter_id: meter_id.into(),
            meter_uuid: meter_uuid.into(),
        }
    }

    /// Returns the raw meter id.
    #[must_use]
    pub fn meter_id(&self) -> &str {
        &self.meter_id
    }

    /// Returns the raw meter UUID.
    #[must_use]
    pub fn meter_uuid(&self) -> &str {
        &self.meter_uuid
    }

    /// Returns the normalized meter id.
    #[must_use]
    pub fn normalized_id(&self) -> String {
        normalize_id(&self.meter_id)
    }

    /// Returns the unique key derived from the meter UUID.
    ///
    /// Distinct UUIDs always give distinct keys. See [`encode_id`].
    #[must_use]
    pub fn uuid_key(&self) -> String {
        encode_id(&self.meter_uuid)
    }
}

/// A discovered meter.
#[derive(Debug, Clone, PartialEq)]
pub struct Meter {
    /// Identifiers of the meter.
    pub identity: MeterIdentity,
    /// Information fetched during discovery.
    pub info: MeterInfo,
}

impl Meter {
    /// Creates a meter.
    #[must_use]
    pub fn new(identity: MeterIdentity, info: MeterInfo) -> Self {
        Self { identity, info }
    }
}

/// The state of a meter as of its last successful refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterSnapshot {
    /// Latest meter information.
    pub info: MeterInfo,
    /// Historical data points fetched in the last cycle, oldest first.
    pub history: Vec<DataPoint>,
    /// When the snapshot was taken. `None` until the first cycle succeeds.
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Shared handle to a meter.
///
/// Cloning the handle is cheap; all clones observe the same state.
///
/// # Examples
///
/// ```
/// use eyeonwater::meter::{Meter, MeterHandle, MeterIdentity, MeterInfo};
///
/// let meter = Meter::new(MeterIdentity::new("60439875", "5215777958325016766"), MeterInfo::default());
/// let handle = MeterHandle::new(meter);
/// assert_eq!(handle.identity().meter_id(), "60439875");
/// assert!(handle.snapshot().history.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MeterHandle {
    identity: Arc<MeterIdentity>,
    state: Arc<watch::Sender<MeterSnapshot>>,
}

impl MeterHandle {
    /// Creates a handle for a discovered meter.
    #[must_use]
    pub fn new(meter: Meter) -> Self {
        let snapshot = MeterSnapshot {
            info: meter.info,
            ..MeterSnapshot::default()
        };
        let (state, _) = watch::channel(snapshot);

        Self {
            identity: Arc::new(meter.identity),
            state: Arc::new(state),
        }
    }

    /// Returns the identifiers of the meter.
    #[must_use]
    pub fn identity(&self) -> &MeterIdentity {
        &self.identity
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MeterSnapshot {
        self.state.borrow().clone()
    }

    /// Reads the current snapshot without cloning it.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&MeterSnapshot) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Creates a receiver notified whenever the snapshot is replaced.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<MeterSnapshot> {
        self.state.subscribe()
    }

    /// Replaces the snapshot and notifies watchers.
    pub(crate) fn replace(&self, snapshot: MeterSnapshot) {
        self.state.send_replace(snapshot);
    }
}
