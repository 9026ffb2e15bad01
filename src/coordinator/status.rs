// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outcome of update cycles.

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::meter::MeterIdentity;
use crate::statistics::ReconcileOutcome;

/// Health of the coordinator, as of the last finished cycle.
///
/// Entities derive their availability from
/// [`last_update_success`](Self::last_update_success).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStatus {
    /// Whether the last finished cycle succeeded. `false` before the first cycle.
    pub last_update_success: bool,
    /// Error of the last cycle, if it failed.
    pub last_error: Option<String>,
    /// When the last successful cycle finished.
    pub last_success_at: Option<DateTime<Utc>>,
    /// Number of finished cycles.
    pub cycles: u64,
}

impl UpdateStatus {
    /// Returns `true` once any cycle has succeeded.
    #[must_use]
    pub fn has_succeeded(&self) -> bool {
        self.last_success_at.is_some()
    }

    pub(crate) fn record_success(&mut self, at: DateTime<Utc>) {
        self.last_update_success = true;
        self.last_error = None;
        self.last_success_at = Some(at);
        self.cycles += 1;
    }

    pub(crate) fn record_failure(&mut self, error: &Error) {
        self.last_update_success = false;
        self.last_error = Some(error.to_string());
        self.cycles += 1;
    }
}

/// Result of [`try_run_cycle`](super::UpdateCoordinator::try_run_cycle).
#[derive(Debug)]
pub enum CycleOutcome {
    /// The cycle refreshed this many meters.
    Completed(usize),
    /// The cycle failed.
    Failed(Error),
    /// Another cycle or backfill was running; nothing was done.
    Skipped,
}

impl CycleOutcome {
    /// Returns `true` if the cycle ran and succeeded.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Per-meter results of a backfill.
#[derive(Debug, Default)]
pub struct BackfillReport {
    /// One entry per meter, in coordinator order.
    pub meters: Vec<(MeterIdentity, Result<ReconcileOutcome, Error>)>,
}

impl BackfillReport {
    /// Returns the total number of imported points.
    #[must_use]
    pub fn imported(&self) -> usize {
        self.meters
            .iter()
            .map(|(_, result)| match result {
                Ok(ReconcileOutcome::Imported { count, .. }) => *count,
                _ => 0,
            })
            .sum()
    }

    /// Returns the meters whose backfill failed.
    pub fn failures(&self) -> impl Iterator<Item = (&MeterIdentity, &Error)> {
        self.meters
            .iter()
            .filter_map(|(identity, result)| result.as_ref().err().map(|e| (identity, e)))
    }

    /// Returns `true` if every meter was backfilled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}
