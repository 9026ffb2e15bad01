// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `eyeonwater` - A Rust library bridging EyeOnWater water meters to home
//! automation sensors and long-term statistics.
//!
//! The library polls the EyeOnWater cloud API for the meters of an account,
//! exposes each meter as a set of entities, and imports the hourly
//! consumption history into a statistics store without ever submitting the
//! same point twice.
//!
//! # Supported Features
//!
//! - **Polling**: Interval refresh with a debounced manual refresh
//! - **Statistics**: Watermark-based import of historical data, plus bulk backfill
//! - **Entities**: Consumption, statistic anchor, endpoint temperature and status flags
//! - **Units**: Gallons, cubic feet and cubic meters, including scaled register units
//!
//! # Quick Start
//!
//! ```no_run
//! use eyeonwater::{Integration, IntegrationConfig};
//! use eyeonwater::statistics::MemoryStatisticsStore;
//!
//! #[tokio::main]
//! async fn main() -> eyeonwater::Result<()> {
//!     let config = IntegrationConfig::new("user@example.com", "secret")
//!         .with_hostname("eyeonwater.com");
//!     let integration = Integration::connect(config, MemoryStatisticsStore::new()).await?;
//!
//!     // Wait for the first cycle
//!     let mut status = integration.watch_status();
//!     status.changed().await.ok();
//!
//!     for entity in integration.entities() {
//!         println!("{} = {:?}", entity.unique_id(), entity.state());
//!     }
//!
//!     // Re-import the last 30 days
//!     let report = integration.import_historical_data(30).await?;
//!     println!("imported {} points", report.imported());
//!
//!     integration.unload();
//!     Ok(())
//! }
//! ```
//!
//! ## Custom API or Store
//!
//! [`MeterApi`] and [`StatisticsStore`] are the seams to the outside
//! world. [`Integration::setup`] accepts any implementation of both.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod event;
mod integration;
pub mod meter;
pub mod statistics;
pub mod types;

pub use api::MeterApi;
#[cfg(feature = "http")]
pub use api::{HttpClient, HttpConfig};
pub use config::IntegrationConfig;
pub use coordinator::{
    BackfillReport, CycleOutcome, Scheduler, SchedulerHandle, UpdateCoordinator, UpdateStatus,
};
pub use error::{
    ApiError, ConfigError, Error, ParseError, Result, SetupError, StatisticsError,
};
pub use integration::{EntryContext, Integration};
pub use meter::{Meter, MeterHandle, MeterIdentity, MeterInfo, MeterSnapshot};
pub use statistics::{
    MemoryStatisticsStore, ReconcileOutcome, Reconciler, StatisticMetadata, StatisticPoint,
    StatisticsStore,
};
pub use types::{DataPoint, Reading, VolumeUnit};
