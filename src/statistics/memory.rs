// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-process statistics store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{StatisticMetadata, StatisticPoint, StatisticsStore};
use crate::error::StatisticsError;

#[derive(Debug, Default)]
struct Stream {
    metadata: Option<StatisticMetadata>,
    rows: BTreeMap<DateTime<Utc>, StatisticPoint>,
}

/// A statistics store kept in memory.
///
/// Rows are keyed by `start`, so re-importing a row overwrites it. Clones
/// share the same streams.
///
/// # Examples
///
/// ```
/// use eyeonwater::statistics::MemoryStatisticsStore;
///
/// let store = MemoryStatisticsStore::new();
/// assert_eq!(store.import_count(), 0);
/// assert!(store.rows("sensor.water_meter_1").is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStatisticsStore {
    streams: Arc<RwLock<HashMap<String, Stream>>>,
    imports: Arc<AtomicUsize>,
}

impl MemoryStatisticsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rows of a stream, oldest first.
    #[must_use]
    pub fn rows(&self, statistic_id: &str) -> Vec<StatisticPoint> {
        self.streams
            .read()
            .get(statistic_id)
            .map(|stream| stream.rows.values().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the metadata of the last import into a stream.
    #[must_use]
    pub fn metadata(&self, statistic_id: &str) -> Option<StatisticMetadata> {
        self.streams
            .read()
            .get(statistic_id)
            .and_then(|stream| stream.metadata.clone())
    }

    /// Returns the number of accepted import calls.
    #[must_use]
    pub fn import_count(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }
}

impl StatisticsStore for MemoryStatisticsStore {
    async fn get_last_imported_time(
        &self,
        statistic_id: &str,
    ) -> Result<Option<DateTime<Utc>>, StatisticsError> {
        Ok(self
            .streams
            .read()
            .get(statistic_id)
            .and_then(|stream| stream.rows.keys().next_back().copied()))
    }

    async fn import_statistics(
        &self,
        metadata: &StatisticMetadata,
        points: &[StatisticPoint],
    ) -> Result<(), StatisticsError> {
        {
            let mut streams = self.streams.write();
            let stream = streams.entry(metadata.statistic_id.clone()).or_default();
            stream.metadata = Some(metadata.clone());
            for point in points {
                stream.rows.insert(point.start, *point);
            }
        }
        self.imports.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            statistic_id = %metadata.statistic_id,
            rows = points.len(),
            "Imported statistics"
        );
        Ok(())
    }
}
