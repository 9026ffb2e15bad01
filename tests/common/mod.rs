// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use eyeonwater::meter::{LatestRead, RegisterReading};
use eyeonwater::{
    ApiError, DataPoint, MemoryStatisticsStore, Meter, MeterApi, MeterIdentity, MeterInfo,
    StatisticMetadata, StatisticPoint, StatisticsError, StatisticsStore,
};

pub const METER_A: &str = "5215777958325016766";
pub const METER_B: &str = "7777777777777777777";

/// `2024-03-<day> <hour>:00:00 UTC`.
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn statistic_id(uuid: &str) -> String {
    format!("sensor.water_meter_{uuid}")
}

pub fn info(full_read: f64, units: &str) -> MeterInfo {
    MeterInfo {
        reading: RegisterReading {
            model: Some("MACH 10".to_string()),
            customer_name: Some("Springfield Water".to_string()),
            latest_read: LatestRead {
                full_read,
                units: units.to_string(),
                read_time: None,
            },
            ..RegisterReading::default()
        },
        sensors: None,
    }
}

/// Three days of readings, the second day ending at 12:00.
pub fn history() -> Vec<DataPoint> {
    vec![
        DataPoint::new(at(1, 9), 100.0),
        DataPoint::new(at(2, 12), 150.0),
        DataPoint::new(at(3, 9), 170.0),
        DataPoint::new(at(3, 18), 190.0),
    ]
}

#[derive(Debug, Default)]
struct State {
    meters: Vec<(MeterIdentity, MeterInfo)>,
    histories: HashMap<String, Vec<DataPoint>>,
    failing: HashSet<String>,
    reject_credentials: bool,
    discovery_error: bool,
    delay: Option<Duration>,
}

/// Account API serving canned meters.
#[derive(Debug, Default)]
pub struct MockApi {
    state: Mutex<State>,
    info_reads: AtomicUsize,
    history_reads: AtomicUsize,
    last_days: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meter(self, uuid: &str, info: MeterInfo, history: Vec<DataPoint>) -> Self {
        {
            let mut state = self.state.lock();
            state
                .meters
                .push((MeterIdentity::new(format!("ID-{uuid}"), uuid), info));
            state.histories.insert(uuid.to_string(), history);
        }
        self
    }

    pub fn set_history(&self, uuid: &str, history: Vec<DataPoint>) {
        self.state.lock().histories.insert(uuid.to_string(), history);
    }

    pub fn set_info(&self, uuid: &str, info: MeterInfo) {
        let mut state = self.state.lock();
        if let Some((_, current)) = state.meters.iter_mut().find(|(id, _)| id.meter_uuid() == uuid) {
            *current = info;
        }
    }

    pub fn fail_meter(&self, uuid: &str) {
        self.state.lock().failing.insert(uuid.to_string());
    }

    pub fn heal_meter(&self, uuid: &str) {
        self.state.lock().failing.remove(uuid);
    }

    pub fn reject_credentials(&self) {
        self.state.lock().reject_credentials = true;
    }

    pub fn fail_discovery(&self) {
        self.state.lock().discovery_error = true;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    pub fn info_reads(&self) -> usize {
        self.info_reads.load(Ordering::SeqCst)
    }

    pub fn history_reads(&self) -> usize {
        self.history_reads.load(Ordering::SeqCst)
    }

    pub fn last_days(&self) -> usize {
        self.last_days.load(Ordering::SeqCst)
    }

    fn check(&self, meter: &MeterIdentity) -> Result<(), ApiError> {
        if self.state.lock().failing.contains(meter.meter_uuid()) {
            return Err(ApiError::ConnectionFailed("connection reset".to_string()));
        }
        Ok(())
    }

    async fn pause(&self) {
        let delay = self.state.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl MeterApi for MockApi {
    async fn authenticate(&self) -> Result<(), ApiError> {
        if self.state.lock().reject_credentials {
            return Err(ApiError::Authentication);
        }
        Ok(())
    }

    async fn fetch_meters(&self) -> Result<Vec<Meter>, ApiError> {
        let state = self.state.lock();
        if state.discovery_error {
            return Err(ApiError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(state
            .meters
            .iter()
            .map(|(identity, info)| Meter::new(identity.clone(), info.clone()))
            .collect())
    }

    async fn read_meter_info(&self, meter: &MeterIdentity) -> Result<MeterInfo, ApiError> {
        self.pause().await;
        self.info_reads.fetch_add(1, Ordering::SeqCst);
        self.check(meter)?;

        let state = self.state.lock();
        state
            .meters
            .iter()
            .find(|(identity, _)| identity == meter)
            .map(|(_, info)| info.clone())
            .ok_or(ApiError::Api {
                status: 404,
                message: "Not Found".to_string(),
            })
    }

    async fn read_historical_data(
        &self,
        meter: &MeterIdentity,
        days_to_load: u32,
    ) -> Result<Vec<DataPoint>, ApiError> {
        self.pause().await;
        self.history_reads.fetch_add(1, Ordering::SeqCst);
        self.last_days
            .store(days_to_load as usize, Ordering::SeqCst);
        self.check(meter)?;

        Ok(self
            .state
            .lock()
            .histories
            .get(meter.meter_uuid())
            .cloned()
            .unwrap_or_default())
    }
}

/// Memory store that can be told to reject imports.
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStatisticsStore,
    fail: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
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
        if self.fail.load(Ordering::SeqCst) {
            return Err(StatisticsError::Unavailable("recorder is shutting down".to_string()));
        }
        self.inner.import_statistics(metadata, points).await
    }
}
