// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `eyeonwater` library.
//!
//! The hierarchy follows the failure domains of a polling cycle: talking to
//! the account API, parsing its payloads, writing to the statistics store,
//! and setting the integration up.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The account API failed (authentication, transport or remote error).
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A response could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The statistics store rejected a query or an import.
    #[error("statistics error: {0}")]
    Statistics(#[from] StatisticsError),

    /// Setting the integration up failed.
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A meter returned no historical data.
    #[error("meter {meter_id} doesn't have recent readings")]
    NoData {
        /// Normalized id of the meter.
        meter_id: String,
    },

    /// A unit of measurement could not be mapped to a volume unit.
    #[error("unknown unit of measurement: {0}")]
    UnknownUnit(String),

    /// Another cycle or backfill is already running.
    #[error("an update cycle is already in progress")]
    CycleInProgress,
}

impl Error {
    /// Returns `true` if the error only affects the statistics stream of a
    /// single meter and must not fail the whole cycle.
    #[must_use]
    pub fn is_meter_scoped(&self) -> bool {
        matches!(self, Self::UnknownUnit(_))
    }

    /// Returns `true` if the error is an authentication failure.
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Api(ApiError::Authentication))
    }
}

/// Errors raised by the account API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Username or password was not accepted.
    #[error("username or password was not accepted")]
    Authentication,

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Connection to the API failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The API answered with an error status.
    #[error("API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Reason phrase or error payload.
        message: String,
    },

    /// The API answered with a payload that could not be understood.
    #[error("invalid API response: {0}")]
    Parse(#[from] ParseError),
}

impl ApiError {
    /// Returns `true` if the failure is expected to go away on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Self::Http(_) => true,
            Self::Timeout(_) | Self::ConnectionFailed(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Authentication | Self::Parse(_) => false,
        }
    }
}

/// Errors related to parsing API payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// Failed to parse a specific value.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },
}

/// Errors reported by a statistics store.
#[derive(Debug, Error)]
pub enum StatisticsError {
    /// The store could not be reached or refused the write.
    #[error("statistics store unavailable: {0}")]
    Unavailable(String),

    /// The submitted batch was rejected.
    #[error("import of {statistic_id} rejected: {reason}")]
    Rejected {
        /// Stream the batch was submitted to.
        statistic_id: String,
        /// Why the store rejected it.
        reason: String,
    },
}

/// Errors raised while setting the integration up.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Credentials were rejected. Retrying without reconfiguration is pointless.
    #[error("username or password was not accepted")]
    InvalidCredentials,

    /// The account could not be reached yet; setup may be retried later.
    #[error("integration not ready: {0}")]
    NotReady(#[source] ApiError),
}

impl SetupError {
    /// Returns `true` if setup may succeed when retried unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }
}

/// Errors related to configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A duration or count is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The hostname is not a supported EyeOnWater host.
    #[error("invalid hostname: {0}")]
    InvalidHostname(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
