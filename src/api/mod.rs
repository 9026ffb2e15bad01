// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Account API access.
//!
//! [`MeterApi`] is the seam between the coordinator and the utility's
//! cloud API. [`HttpClient`] implements it against the EyeOnWater web API;
//! tests and embedders can provide their own implementation.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpClient, HttpConfig};

use std::future::Future;
use std::sync::Arc;

use crate::error::ApiError;
use crate::meter::{Meter, MeterIdentity, MeterInfo};
use crate::types::DataPoint;

/// Operations the integration needs from the account API.
///
/// Historical readings are expected in the same raw unit as the meter's
/// `latest_read.units`, sorted by timestamp, without repeated timestamps.
pub trait MeterApi: Send + Sync {
    /// Logs in to the account.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Authentication`] if the credentials are rejected,
    /// [`ApiError::Timeout`] or a transport error if the API is unreachable.
    fn authenticate(&self) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Discovers the meters of the account, with their current information.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if discovery fails.
    fn fetch_meters(&self) -> impl Future<Output = Result<Vec<Meter>, ApiError>> + Send;

    /// Reads the latest information of one meter.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    fn read_meter_info(
        &self,
        meter: &MeterIdentity,
    ) -> impl Future<Output = Result<MeterInfo, ApiError>> + Send;

    /// Reads the hourly history of one meter for the last `days_to_load` days.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if the request fails.
    fn read_historical_data(
        &self,
        meter: &MeterIdentity,
        days_to_load: u32,
    ) -> impl Future<Output = Result<Vec<DataPoint>, ApiError>> + Send;
}

impl<A: MeterApi> MeterApi for Arc<A> {
    fn authenticate(&self) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).authenticate()
    }

    fn fetch_meters(&self) -> impl Future<Output = Result<Vec<Meter>, ApiError>> + Send {
        (**self).fetch_meters()
    }

    fn read_meter_info(
        &self,
        meter: &MeterIdentity,
    ) -> impl Future<Output = Result<MeterInfo, ApiError>> + Send {
        (**self).read_meter_info(meter)
    }

    fn read_historical_data(
        &self,
        meter: &MeterIdentity,
        days_to_load: u32,
    ) -> impl Future<Output = Result<Vec<DataPoint>, ApiError>> + Send {
        (**self).read_historical_data(meter, days_to_load)
    }
}
