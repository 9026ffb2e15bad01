// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary sensors exposing meter status flags.

use parking_lot::RwLock;

use super::{Binding, DeviceInfo};
use crate::meter::{FlagDeviceClass, FlagKind};

/// One status flag of a meter.
#[derive(Debug)]
pub struct FlagSensor {
    binding: Binding,
    kind: FlagKind,
    restored: RwLock<Option<bool>>,
}

impl FlagSensor {
    pub(crate) fn new(binding: Binding, kind: FlagKind) -> Self {
        Self {
            binding,
            kind,
            restored: RwLock::new(None),
        }
    }

    /// Returns the flag this sensor exposes.
    #[must_use]
    pub fn kind(&self) -> FlagKind {
        self.kind
    }

    /// Returns the unique id: `<flag key>_<uuid key>`.
    #[must_use]
    pub fn unique_id(&self) -> String {
        format!(
            "{}_{}",
            self.kind.key(),
            self.binding.meter.identity().uuid_key()
        )
    }

    /// Returns the device the sensor belongs to.
    #[must_use]
    pub fn device_info(&self) -> &DeviceInfo {
        &self.binding.device
    }

    /// Returns the device class.
    #[must_use]
    pub fn device_class(&self) -> FlagDeviceClass {
        self.kind.device_class()
    }

    /// Returns the translation key, if the flag has one.
    #[must_use]
    pub fn translation_key(&self) -> Option<&'static str> {
        self.kind.translation_key()
    }

    /// Returns whether the flag is raised.
    ///
    /// Before the first successful cycle this is the restored state, or
    /// `false` if none was restored.
    #[must_use]
    pub fn is_on(&self) -> bool {
        if !self.binding.has_succeeded() {
            return self.restored.read().unwrap_or(false);
        }
        self.binding
            .meter
            .with_snapshot(|s| s.info.reading.flags.get(self.kind))
    }

    /// Returns `true` if the state is current or restored.
    #[must_use]
    pub fn available(&self) -> bool {
        self.binding.live() || (!self.binding.has_succeeded() && self.restored.read().is_some())
    }

    /// Seeds the state shown until the first cycle succeeds.
    pub fn restore(&self, is_on: bool) {
        *self.restored.write() = Some(is_on);
    }
}
