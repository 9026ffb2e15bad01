// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Update coordinator: periodic refresh of every meter of an account.
//!
//! A cycle has two phases:
//!
//! 1. **Fetch**: latest info and recent history of every meter are read
//!    concurrently. If any read fails, no meter changes and the cycle fails.
//! 2. **Reconcile**: each meter's history is filtered against its
//!    watermark and the unseen points are imported into the statistics
//!    store.
//!
//! Only one cycle (or backfill) runs at a time. The [`Scheduler`] drives
//! cycles on an interval and serves debounced manual refreshes.

mod scheduler;
mod status;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tokio::sync::{Mutex, broadcast, watch};

pub use scheduler::{Scheduler, SchedulerHandle};
pub use status::{BackfillReport, CycleOutcome, UpdateStatus};

use crate::api::MeterApi;
use crate::config::IntegrationConfig;
use crate::error::{ApiError, Error, Result};
use crate::event::{CoordinatorEvent, EntryEvents, EntryId, EventBus};
use crate::meter::{MeterHandle, MeterIdentity, MeterSnapshot};
use crate::statistics::{ReconcileOutcome, Reconciler, StatisticsStore, statistic_id_for};

/// Coordinates refreshes and statistics imports for the meters of one account.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use eyeonwater::api::HttpConfig;
/// use eyeonwater::coordinator::UpdateCoordinator;
/// use eyeonwater::event::EntryId;
/// use eyeonwater::meter::MeterHandle;
/// use eyeonwater::api::MeterApi;
/// use eyeonwater::statistics::MemoryStatisticsStore;
///
/// # async fn example() -> eyeonwater::Result<()> {
/// let api = HttpConfig::new("https://eyeonwater.com", "user", "secret").into_client()?;
/// api.authenticate().await?;
/// let meters = api
///     .fetch_meters()
///     .await?
///     .into_iter()
///     .map(|meter| (MeterHandle::new(meter), None))
///     .collect();
///
/// let coordinator = UpdateCoordinator::new(
///     EntryId::new(),
///     Arc::new(api),
///     Arc::new(MemoryStatisticsStore::new()),
///     meters,
/// );
/// coordinator.run_cycle().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct UpdateCoordinator<A, S> {
    entry_id: EntryId,
    api: Arc<A>,
    store: Arc<S>,
    meters: Vec<MeterHandle>,
    /// One reconciler per meter, in `meters` order. The lock is the
    /// single-flight guard of cycles and backfills.
    reconcilers: Mutex<Vec<Reconciler>>,
    status: watch::Sender<UpdateStatus>,
    event_bus: EventBus,
    days_to_load: u32,
    fetch_timeout: Option<Duration>,
}

impl<A: MeterApi, S: StatisticsStore> UpdateCoordinator<A, S> {
    /// Creates a coordinator for `meters`, each with the watermark of its
    /// statistics stream.
    #[must_use]
    pub fn new(
        entry_id: EntryId,
        api: Arc<A>,
        store: Arc<S>,
        meters: Vec<(MeterHandle, Option<DateTime<Utc>>)>,
    ) -> Self {
        let (meters, reconcilers): (Vec<_>, Vec<_>) = meters
            .into_iter()
            .map(|(handle, watermark)| {
                let reconciler = Reconciler::new(handle.identity().clone(), watermark);
                (handle, reconciler)
            })
            .unzip();
        let (status, _) = watch::channel(UpdateStatus::default());

        Self {
            entry_id,
            api,
            store,
            meters,
            reconcilers: Mutex::new(reconcilers),
            status,
            event_bus: EventBus::new(),
            days_to_load: IntegrationConfig::DEFAULT_DAYS_TO_LOAD,
            fetch_timeout: None,
        }
    }

    /// Sets how many days of history a regular cycle reads.
    #[must_use]
    pub fn with_days_to_load(mut self, days: u32) -> Self {
        self.days_to_load = days;
        self
    }

    /// Publishes events on `bus` instead of a bus of its own, so several
    /// accounts can share one.
    #[must_use]
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    /// Bounds every meter read of a cycle or backfill.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the account this coordinator belongs to.
    #[must_use]
    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    /// Returns the coordinated meters.
    #[must_use]
    pub fn meters(&self) -> &[MeterHandle] {
        &self.meters
    }

    /// Returns the status of the last finished cycle.
    #[must_use]
    pub fn status(&self) -> UpdateStatus {
        self.status.borrow().clone()
    }

    /// Creates a receiver notified after every finished cycle.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<UpdateStatus> {
        self.status.subscribe()
    }

    /// Subscribes to every event on the coordinator's bus.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.event_bus.subscribe()
    }

    /// Subscribes to the events of this coordinator only.
    #[must_use]
    pub fn events(&self) -> EntryEvents {
        self.event_bus.subscribe_entry(self.entry_id)
    }

    /// Returns the watermark of a meter's statistics stream.
    ///
    /// Waits for a running cycle to finish. Returns `None` for unknown
    /// meters and for streams nothing was imported into yet.
    pub async fn watermark(&self, meter_uuid: &str) -> Option<DateTime<Utc>> {
        self.reconcilers
            .lock()
            .await
            .iter()
            .find(|r| r.identity().meter_uuid() == meter_uuid)
            .and_then(Reconciler::watermark)
    }

    // =========================================================================
    // Cycles
    // =========================================================================

    /// Runs one update cycle.
    ///
    /// Returns the refreshed meter handles.
    ///
    /// # Errors
    ///
    /// - [`Error::CycleInProgress`] if a cycle or backfill is running
    /// - [`Error::Api`] if any meter read failed; no snapshot was replaced
    /// - [`Error::NoData`] or [`Error::Statistics`] if a meter could not be
    ///   reconciled; snapshots were replaced and other meters reconciled
    pub async fn run_cycle(&self) -> Result<Vec<MeterHandle>> {
        let Ok(mut reconcilers) = self.reconcilers.try_lock() else {
            return Err(Error::CycleInProgress);
        };

        self.event_bus.publish(CoordinatorEvent::CycleStarted {
            entry_id: self.entry_id,
        });
        tracing::debug!(entry = %self.entry_id, meters = self.meters.len(), "Starting update cycle");

        let result = self.cycle(&mut reconcilers).await;

        match &result {
            Ok(meters) => {
                self.status.send_modify(|s| s.record_success(Utc::now()));
                self.event_bus.publish(CoordinatorEvent::CycleSucceeded {
                    entry_id: self.entry_id,
                    meters: meters.len(),
                });
                tracing::debug!(entry = %self.entry_id, "Update cycle finished");
            }
            Err(e) => {
                self.status.send_modify(|s| s.record_failure(e));
                self.event_bus.publish(CoordinatorEvent::CycleFailed {
                    entry_id: self.entry_id,
                    error: e.to_string(),
                });
                tracing::warn!(entry = %self.entry_id, error = %e, "Update cycle failed");
            }
        }

        result
    }

    /// Runs one update cycle unless one is already running.
    pub async fn try_run_cycle(&self) -> CycleOutcome {
        match self.run_cycle().await {
            Ok(meters) => CycleOutcome::Completed(meters.len()),
            Err(Error::CycleInProgress) => {
                tracing::debug!(entry = %self.entry_id, "Update cycle already running, skipping");
                CycleOutcome::Skipped
            }
            Err(e) => CycleOutcome::Failed(e),
        }
    }

    async fn cycle(&self, reconcilers: &mut [Reconciler]) -> Result<Vec<MeterHandle>> {
        let fetches: Vec<_> = self.meters.iter().map(|m| self.fetch(m.identity())).collect();
        let snapshots = try_join_all(fetches).await?;

        for (handle, snapshot) in self.meters.iter().zip(snapshots) {
            handle.replace(snapshot);
            self.event_bus.publish(CoordinatorEvent::MeterUpdated {
                entry_id: self.entry_id,
                meter_uuid: handle.identity().meter_uuid().to_string(),
            });
        }

        let mut first_error = None;
        for (handle, reconciler) in self.meters.iter().zip(reconcilers.iter_mut()) {
            let snapshot = handle.snapshot();
            match reconciler.reconcile(&snapshot, self.store.as_ref()).await {
                Ok(outcome) => self.publish_import(handle.identity(), outcome),
                Err(e) if e.is_meter_scoped() => {
                    tracing::warn!(
                        meter = %handle.identity().meter_id(),
                        error = %e,
                        "Skipping statistics import"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        meter = %handle.identity().meter_id(),
                        error = %e,
                        "Statistics import failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(self.meters.clone()),
        }
    }

    async fn fetch(&self, identity: &MeterIdentity) -> std::result::Result<MeterSnapshot, ApiError> {
        let (info, history) = futures::try_join!(
            self.bounded(self.api.read_meter_info(identity)),
            self.bounded(self.api.read_historical_data(identity, self.days_to_load)),
        )?;

        Ok(MeterSnapshot {
            info,
            history,
            refreshed_at: Some(Utc::now()),
        })
    }

    /// Applies the fetch timeout, if one is set.
    async fn bounded<T>(
        &self,
        read: impl Future<Output = std::result::Result<T, ApiError>>,
    ) -> std::result::Result<T, ApiError> {
        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
                ApiError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
            })?,
            None => read.await,
        }
    }

    fn publish_import(&self, identity: &MeterIdentity, outcome: ReconcileOutcome) {
        if let ReconcileOutcome::Imported { count, watermark } = outcome {
            self.event_bus.publish(CoordinatorEvent::StatisticsImported {
                entry_id: self.entry_id,
                statistic_id: statistic_id_for(identity),
                count,
                watermark,
            });
        }
    }

    // =========================================================================
    // Backfill
    // =========================================================================

    /// Imports the last `days` days of history of every meter, regardless
    /// of the watermarks.
    ///
    /// Failures are reported per meter and do not stop the other meters.
    /// Watermarks only move forward.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleInProgress`] if a cycle or backfill is running.
    pub async fn import_historical_data(&self, days: u32) -> Result<BackfillReport> {
        let Ok(mut reconcilers) = self.reconcilers.try_lock() else {
            return Err(Error::CycleInProgress);
        };

        tracing::info!(entry = %self.entry_id, days, "Importing historical data");

        let mut report = BackfillReport::default();
        for (handle, reconciler) in self.meters.iter().zip(reconcilers.iter_mut()) {
            let identity = handle.identity();
            let result = self.backfill(handle, reconciler, days).await;

            match &result {
                Ok(outcome) => self.publish_import(identity, *outcome),
                Err(e) => {
                    tracing::warn!(meter = %identity.meter_id(), error = %e, "Backfill failed");
                }
            }
            report.meters.push((identity.clone(), result));
        }

        tracing::info!(
            entry = %self.entry_id,
            imported = report.imported(),
            "Historical data import finished"
        );
        Ok(report)
    }

    async fn backfill(
        &self,
        handle: &MeterHandle,
        reconciler: &mut Reconciler,
        days: u32,
    ) -> Result<ReconcileOutcome> {
        let points = self
            .bounded(self.api.read_historical_data(handle.identity(), days))
            .await?;
        let unit = handle.with_snapshot(|s| s.info.reading.latest_read.units.clone());

        reconciler
            .backfill(&points, &unit, self.store.as_ref())
            .await
    }
}
