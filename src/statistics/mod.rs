// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Long-term statistics import.
//!
//! Historical usage is imported incrementally: each meter keeps a
//! watermark (the timestamp of the last imported point) and only points
//! strictly newer than it are submitted. The watermark advances only after
//! the store accepted a batch, so a failed import is retried with the same
//! points on the next cycle.
//!
//! # Components
//!
//! - [`filter_newer`]: selects the unseen slice of a history
//! - [`build_metadata`]: derives the stream identity of a meter
//! - [`Reconciler`]: per-meter watermark and submission
//! - [`StatisticsStore`]: the ingestion contract of the external store
//! - [`MemoryStatisticsStore`]: an in-process store

mod filter;
mod memory;
mod metadata;
mod reconciler;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use filter::filter_newer;
pub use memory::MemoryStatisticsStore;
pub use metadata::{
    STATISTICS_SOURCE, StatisticMetadata, build_metadata, metadata_for_unit, statistic_id_for,
};
pub use reconciler::{ReconcileOutcome, Reconciler};

use crate::error::StatisticsError;
use crate::types::{DataPoint, RawUnit};

/// One row of a statistics stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint {
    /// Start of the period the row describes.
    pub start: DateTime<Utc>,
    /// Meter reading at `start`.
    pub state: f64,
    /// Cumulative sum at `start`.
    pub sum: f64,
}

impl StatisticPoint {
    /// Converts a historical data point, normalizing its reading.
    #[must_use]
    pub fn from_data_point(point: &DataPoint, unit: &RawUnit) -> Self {
        let value = unit.normalize(point.reading()).value();
        Self {
            start: point.timestamp(),
            state: value,
            sum: value,
        }
    }
}

/// Converts historical data points into statistics rows.
#[must_use]
pub fn convert_statistic_data(points: &[DataPoint], unit: &RawUnit) -> Vec<StatisticPoint> {
    points
        .iter()
        .map(|point| StatisticPoint::from_data_point(point, unit))
        .collect()
}

/// Ingestion contract of a long-term statistics store.
///
/// Imports must be idempotent: submitting a row whose `start` already
/// exists in the stream overwrites it.
pub trait StatisticsStore: Send + Sync {
    /// Returns the `start` of the newest row of a stream, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StatisticsError`] if the store cannot be queried.
    fn get_last_imported_time(
        &self,
        statistic_id: &str,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, StatisticsError>> + Send;

    /// Imports a batch of rows into a stream.
    ///
    /// # Errors
    ///
    /// Returns [`StatisticsError`] if the batch was not stored.
    fn import_statistics(
        &self,
        metadata: &StatisticMetadata,
        points: &[StatisticPoint],
    ) -> impl Future<Output = Result<(), StatisticsError>> + Send;
}
