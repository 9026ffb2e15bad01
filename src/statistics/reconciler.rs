// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-meter historical import.

use chrono::{DateTime, Utc};

use super::{StatisticsStore, build_metadata, convert_statistic_data, filter_newer};
use crate::error::Error;
use crate::meter::{MeterIdentity, MeterSnapshot};
use crate::types::{DataPoint, RawUnit};

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing newer than the watermark was fetched.
    UpToDate,
    /// New points were imported and the watermark advanced.
    Imported {
        /// Number of imported points.
        count: usize,
        /// The new watermark.
        watermark: DateTime<Utc>,
    },
}

/// Imports the unseen part of a meter's history into a statistics store.
///
/// Invariant: every fetched point at or before [`watermark`](Self::watermark)
/// was accepted by the store. The watermark is loaded from the store once
/// at setup and then only moves forward, after a successful import.
#[derive(Debug, Clone)]
pub struct Reconciler {
    identity: MeterIdentity,
    watermark: Option<DateTime<Utc>>,
}

impl Reconciler {
    /// Creates a reconciler starting from a known watermark.
    #[must_use]
    pub fn new(identity: MeterIdentity, watermark: Option<DateTime<Utc>>) -> Self {
        Self {
            identity,
            watermark,
        }
    }

    /// Returns the meter this reconciler imports for.
    #[must_use]
    pub fn identity(&self) -> &MeterIdentity {
        &self.identity
    }

    /// Returns the timestamp of the last imported point.
    #[must_use]
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    /// Imports the points of `snapshot` newer than the watermark.
    ///
    /// # Errors
    ///
    /// - [`Error::NoData`] if the snapshot has no history
    /// - [`Error::UnknownUnit`] if the register unit is not recognized
    /// - [`Error::Statistics`] if the store rejected the batch
    ///
    /// The watermark is unchanged whenever an error is returned.
    pub async fn reconcile<S: StatisticsStore>(
        &mut self,
        snapshot: &MeterSnapshot,
        store: &S,
    ) -> Result<ReconcileOutcome, Error> {
        if snapshot.history.is_empty() {
            return Err(Error::NoData {
                meter_id: self.identity.normalized_id(),
            });
        }

        let new_points = filter_newer(&snapshot.history, self.watermark);
        if new_points.is_empty() {
            tracing::debug!(meter = %self.identity.meter_id(), "There is no new historical data");
            return Ok(ReconcileOutcome::UpToDate);
        }

        let unit = &snapshot.info.reading.latest_read.units;
        self.submit(&new_points, unit, store).await
    }

    /// Imports every point of `points`, regardless of the watermark.
    ///
    /// Used for backfills reaching further back than the regular lookback.
    /// The watermark moves to the last point only if that is newer.
    ///
    /// # Errors
    ///
    /// Same as [`reconcile`](Self::reconcile).
    pub async fn backfill<S: StatisticsStore>(
        &mut self,
        points: &[DataPoint],
        unit: &str,
        store: &S,
    ) -> Result<ReconcileOutcome, Error> {
        if points.is_empty() {
            return Err(Error::NoData {
                meter_id: self.identity.normalized_id(),
            });
        }

        self.submit(points, unit, store).await
    }

    async fn submit<S: StatisticsStore>(
        &mut self,
        points: &[DataPoint],
        unit: &str,
        store: &S,
    ) -> Result<ReconcileOutcome, Error> {
        let metadata = build_metadata(&self.identity, unit)?;
        let raw_unit: RawUnit = unit.parse()?;
        let rows = convert_statistic_data(points, &raw_unit);

        tracing::info!(
            meter = %self.identity.meter_id(),
            count = rows.len(),
            "Data points will be imported"
        );
        store.import_statistics(&metadata, &rows).await?;

        let last = points
            .iter()
            .map(DataPoint::timestamp)
            .max()
            .ok_or_else(|| Error::NoData {
                meter_id: self.identity.normalized_id(),
            })?;
        let watermark = self.watermark.map_or(last, |current| current.max(last));
        self.watermark = Some(watermark);

        Ok(ReconcileOutcome::Imported {
            count: rows.len(),
            watermark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatisticsError;
    use crate::meter::{LatestRead, MeterInfo, RegisterReading};
    use crate::statistics::{MemoryStatisticsStore, StatisticMetadata, StatisticPoint};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn identity() -> MeterIdentity {
        MeterIdentity::new("60439875", "5215777958325016766")
    }

    fn snapshot(points: Vec<DataPoint>) -> MeterSnapshot {
        MeterSnapshot {
            info: MeterInfo {
                reading: RegisterReading {
                    latest_read: LatestRead {
                        full_read: 190.0,
                        units: "GAL".to_string(),
                        read_time: None,
                    },
                    ..RegisterReading::default()
                },
                sensors: None,
            },
            history: points,
            refreshed_at: None,
        }
    }

    fn history() -> Vec<DataPoint> {
        vec![
            DataPoint::new(at(1, 9), 100.0),
            DataPoint::new(at(2, 12), 150.0),
            DataPoint::new(at(3, 9), 170.0),
            DataPoint::new(at(3, 18), 190.0),
        ]
    }

    /// Store that can be told to fail and counts calls.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStatisticsStore,
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl StatisticsStore for FlakyStore {
        async fn get_last_imported_time(
            &self,
            statistic_id: &str,
        ) -> Result<Option<DateTime<Utc>>, StatisticsError> {
            self.inner.get_last_imported_time(statistic_id).await
        }

        async fn import_statistics(
            &self,
            metadata: &StatisticMetadata,
            points: &[StatisticPoint],
        ) -> Result<(), StatisticsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StatisticsError::Unavailable("disk full".to_string()));
            }
            self.inner.import_statistics(metadata, points).await
        }
    }

    #[tokio::test]
    async fn imports_only_points_after_watermark() {
        let store = MemoryStatisticsStore::new();
        let mut reconciler = Reconciler::new(identity(), Some(at(2, 12)));

        let outcome = reconciler
            .reconcile(&snapshot(history()), &store)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Imported {
                count: 2,
                watermark: at(3, 18)
            }
        );
        assert_eq!(reconciler.watermark(), Some(at(3, 18)));

        let rows = store.rows("sensor.water_meter_5215777958325016766");
        let starts: Vec<_> = rows.iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![at(3, 9), at(3, 18)]);
    }

    #[tokio::test]
    async fn first_import_takes_everything() {
        let store = MemoryStatisticsStore::new();
        let mut reconciler = Reconciler::new(identity(), None);

        reconciler
            .reconcile(&snapshot(history()), &store)
            .await
            .unwrap();

        assert_eq!(store.rows("sensor.water_meter_5215777958325016766").len(), 4);
        assert_eq!(reconciler.watermark(), Some(at(3, 18)));
    }

    #[tokio::test]
    async fn second_run_without_new_data_is_noop() {
        let store = FlakyStore::default();
        let mut reconciler = Reconciler::new(identity(), None);
        let snapshot = snapshot(history());

        reconciler.reconcile(&snapshot, &store).await.unwrap();
        let watermark = reconciler.watermark();

        let outcome = reconciler.reconcile(&snapshot, &store).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::UpToDate);
        assert_eq!(reconciler.watermark(), watermark);
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_history_is_no_data() {
        let store = FlakyStore::default();
        let mut reconciler = Reconciler::new(identity(), Some(at(2, 12)));

        let err = reconciler
            .reconcile(&snapshot(Vec::new()), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoData { ref meter_id } if meter_id == "60439875"));
        assert_eq!(reconciler.watermark(), Some(at(2, 12)));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_import_keeps_watermark_and_retries_same_points() {
        let store = FlakyStore::default();
        store.fail.store(true, Ordering::SeqCst);
        let mut reconciler = Reconciler::new(identity(), Some(at(2, 12)));
        let snapshot = snapshot(history());

        let err = reconciler.reconcile(&snapshot, &store).await.unwrap_err();
        assert!(matches!(err, Error::Statistics(_)));
        assert_eq!(reconciler.watermark(), Some(at(2, 12)));

        store.fail.store(false, Ordering::SeqCst);
        let outcome = reconciler.reconcile(&snapshot, &store).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Imported {
                count: 2,
                watermark: at(3, 18)
            }
        );
        let rows = store.inner.rows("sensor.water_meter_5215777958325016766");
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn unknown_unit_keeps_watermark() {
        let store = FlakyStore::default();
        let mut reconciler = Reconciler::new(identity(), None);
        let mut snapshot = snapshot(history());
        snapshot.info.reading.latest_read.units = "HOGSHEAD".to_string();

        let err = reconciler.reconcile(&snapshot, &store).await.unwrap_err();
        assert!(matches!(err, Error::UnknownUnit(_)));
        assert_eq!(reconciler.watermark(), None);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backfill_never_moves_watermark_back() {
        let store = MemoryStatisticsStore::new();
        let mut reconciler = Reconciler::new(identity(), Some(at(3, 18)));

        let outcome = reconciler
            .backfill(&history()[..2], "GAL", &store)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome::Imported {
                count: 2,
                watermark: at(3, 18)
            }
        );
        assert_eq!(reconciler.watermark(), Some(at(3, 18)));
    }

    #[tokio::test]
    async fn backfill_of_nothing_is_no_data() {
        let store = MemoryStatisticsStore::new();
        let mut reconciler = Reconciler::new(identity(), None);
        let err = reconciler.backfill(&[], "GAL", &store).await.unwrap_err();
        assert!(matches!(err, Error::NoData { .. }));
    }
}
