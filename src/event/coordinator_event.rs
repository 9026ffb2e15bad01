// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinator event types.

use chrono::{DateTime, Utc};

use super::EntryId;

/// Events emitted by the update coordinator.
///
/// # Examples
///
/// ```
/// use eyeonwater::event::{CoordinatorEvent, EntryId};
///
/// let entry_id = EntryId::new();
/// let event = CoordinatorEvent::CycleSucceeded { entry_id, meters: 2 };
/// assert_eq!(event.entry_id(), entry_id);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// A cycle started fetching.
    CycleStarted {
        /// The account of the coordinator.
        entry_id: EntryId,
    },

    /// A meter's snapshot was replaced.
    MeterUpdated {
        /// The account of the coordinator.
        entry_id: EntryId,
        /// Raw UUID of the meter.
        meter_uuid: String,
    },

    /// New points were imported into a statistics stream.
    StatisticsImported {
        /// The account of the coordinator.
        entry_id: EntryId,
        /// The statistics stream.
        statistic_id: String,
        /// Number of imported points.
        count: usize,
        /// The watermark after the import.
        watermark: DateTime<Utc>,
    },

    /// A cycle completed successfully.
    CycleSucceeded {
        /// The account of the coordinator.
        entry_id: EntryId,
        /// Number of refreshed meters.
        meters: usize,
    },

    /// A cycle failed. Entities report unavailable until the next success.
    CycleFailed {
        /// The account of the coordinator.
        entry_id: EntryId,
        /// Description of the failure.
        error: String,
    },
}

impl CoordinatorEvent {
    /// Returns the entry ID associated with this event.
    #[must_use]
    pub fn entry_id(&self) -> EntryId {
        match self {
            Self::CycleStarted { entry_id }
            | Self::MeterUpdated { entry_id, .. }
            | Self::StatisticsImported { entry_id, .. }
            | Self::CycleSucceeded { entry_id, .. }
            | Self::CycleFailed { entry_id, .. } => *entry_id,
        }
    }

    /// Returns `true` if this event ends a cycle.
    #[must_use]
    pub fn is_cycle_end(&self) -> bool {
        matches!(self, Self::CycleSucceeded { .. } | Self::CycleFailed { .. })
    }
}
