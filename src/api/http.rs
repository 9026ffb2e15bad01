// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP client for the EyeOnWater web API.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{Days, FixedOffset, Offset, Utc};
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::MeterApi;
use crate::config::IntegrationConfig;
use crate::error::{ApiError, ParseError};
use crate::meter::{Meter, MeterIdentity, MeterInfo};
use crate::types::{DataPoint, parse_timestamp, sort_and_dedup};

const AUTH_ENDPOINT: &str = "/account/signin";
const DASHBOARD_ENDPOINT: &str = "/dashboard/";
const SEARCH_ENDPOINT: &str = "/api/2/residential/new_search";
const CONSUMPTION_ENDPOINT: &str = "/api/2/residential/consumption?eow=True";

/// Marker of the meter list embedded in the dashboard page.
const METER_LIST_MARKER: &str = "AQ.Views.MeterPicker.meters = ";

/// Text of the sign-in page when credentials are rejected.
const INVALID_CREDENTIALS_TEXT: &str = "Invalid username or password";

// ============================================================================
// HttpConfig
// ============================================================================

/// Configuration of an [`HttpClient`].
///
/// # Examples
///
/// ```
/// use eyeonwater::api::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("https://eyeonwater.com", "user", "secret")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "https://eyeonwater.com");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
    utc_offset: FixedOffset,
}

impl HttpConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = IntegrationConfig::DEFAULT_REQUEST_TIMEOUT;

    /// Creates a configuration for the given base URL and credentials.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            timeout: Self::DEFAULT_TIMEOUT,
            utc_offset: Utc.fix(),
        }
    }

    /// Creates a configuration from the integration settings.
    #[must_use]
    pub fn from_integration(config: &IntegrationConfig) -> Self {
        Self::new(config.base_url(), config.username(), config.password())
            .with_timeout(config.request_timeout())
            .with_utc_offset(config.utc_offset())
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the fixed UTC offset applied to timestamps without one.
    ///
    /// Daylight saving time is not followed. See
    /// [`IntegrationConfig::with_utc_offset`].
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates an `HttpClient` from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be created.
    pub fn into_client(self) -> Result<HttpClient, ApiError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .build()?;

        Ok(HttpClient {
            config: self,
            client,
            native_units: RwLock::new(HashMap::new()),
        })
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// [`MeterApi`] implementation talking to the EyeOnWater web API.
///
/// The session is kept in a cookie store. When an API call is rejected
/// with 401/403 the client signs in again and retries that call once.
///
/// # Examples
///
/// ```no_run
/// use eyeonwater::api::{HttpConfig, MeterApi};
///
/// # async fn example() -> eyeonwater::Result<()> {
/// let client = HttpConfig::new("https://eyeonwater.com", "user", "secret").into_client()?;
/// client.authenticate().await?;
/// let meters = client.fetch_meters().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpClient {
    config: HttpConfig,
    client: Client,
    /// Raw register unit per meter UUID, learned from meter info.
    native_units: RwLock<HashMap<String, String>>,
}

impl HttpClient {
    /// Returns the base URL of the API.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            let millis = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
            ApiError::Timeout(millis)
        } else {
            ApiError::Http(err)
        }
    }

    /// Sends a request built by `build`, signing in again once on 401/403.
    async fn execute(&self, build: impl Fn() -> RequestBuilder + Send) -> Result<String, ApiError> {
        let mut reauthenticated = false;

        loop {
            let response = build()
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                if reauthenticated {
                    return Err(ApiError::Authentication);
                }
                tracing::debug!(status = status.as_u16(), "Session rejected, signing in again");
                self.authenticate().await?;
                reauthenticated = true;
                continue;
            }

            if !status.is_success() {
                return Err(ApiError::Api {
                    status: status.as_u16(),
                    message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                });
            }

            return response.text().await.map_err(|e| self.transport_error(e));
        }
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!(url = %url, "Sending API request");

        let text = self.execute(|| self.client.post(&url).json(body)).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(ParseError::Json(e)))
    }

    fn native_unit(&self, meter: &MeterIdentity) -> Option<String> {
        self.native_units.read().get(meter.meter_uuid()).cloned()
    }

    async fn read_day(
        &self,
        meter: &MeterIdentity,
        date: &str,
        units: Option<&str>,
    ) -> Result<Vec<DataPoint>, ApiError> {
        let mut params = serde_json::json!({
            "source": "barnacle",
            "aggregate": "hourly",
            "combine": "true",
            "perspective": "billing",
            "display_minutes": true,
            "display_hours": true,
            "display_days": true,
            "display_weeks": true,
            "furthest_zoom": "hr",
            "date": date,
        });
        if let Some(units) = units {
            params["units"] = serde_json::Value::from(units);
        }
        let body = serde_json::json!({
            "params": params,
            "query": search_query(meter),
        });

        let response: ConsumptionResponse = self.post_json(CONSUMPTION_ENDPOINT, &body).await?;
        response.into_points(meter.meter_uuid(), self.config.utc_offset)
    }
}

impl MeterApi for HttpClient {
    async fn authenticate(&self) -> Result<(), ApiError> {
        let url = self.url(AUTH_ENDPOINT);
        let form = format!(
            "username={}&password={}",
            urlencoding::encode(&self.config.username),
            urlencoding::encode(&self.config.password)
        );

        tracing::debug!(url = %url, "Signing in");

        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(ApiError::Authentication);
        }
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if body.contains(INVALID_CREDENTIALS_TEXT) {
            return Err(ApiError::Authentication);
        }

        tracing::info!("Signed in to EyeOnWater");
        Ok(())
    }

    async fn fetch_meters(&self) -> Result<Vec<Meter>, ApiError> {
        let url = self.url(&format!(
            "{DASHBOARD_ENDPOINT}{}",
            urlencoding::encode(&self.config.username)
        ));
        let html = self.execute(|| self.client.get(&url)).await?;
        let identities = parse_dashboard(&html)?;

        tracing::debug!(count = identities.len(), "Discovered meter(s)");

        let mut meters = Vec::with_capacity(identities.len());
        for identity in identities {
            let info = self.read_meter_info(&identity).await?;
            meters.push(Meter::new(identity, info));
        }
        Ok(meters)
    }

    async fn read_meter_info(&self, meter: &MeterIdentity) -> Result<MeterInfo, ApiError> {
        let body = serde_json::json!({ "query": search_query(meter) });
        let response: SearchResponse = self.post_json(SEARCH_ENDPOINT, &body).await?;

        let info = response
            .elastic_results
            .hits
            .hits
            .into_iter()
            .next()
            .map(|hit| hit.source)
            .ok_or_else(|| {
                ParseError::MissingField(format!("search hit for meter {}", meter.meter_id()))
            })?;

        self.native_units.write().insert(
            meter.meter_uuid().to_string(),
            info.reading.latest_read.units.clone(),
        );
        Ok(info)
    }

    async fn read_historical_data(
        &self,
        meter: &MeterIdentity,
        days_to_load: u32,
    ) -> Result<Vec<DataPoint>, ApiError> {
        let units = self.native_unit(meter);
        let today = Utc::now().with_timezone(&self.config.utc_offset).date_naive();

        let mut points = Vec::new();
        for offset in (0..days_to_load).rev() {
            let Some(day) = today.checked_sub_days(Days::new(u64::from(offset))) else {
                continue;
            };
            let date = day.format("%m/%d/%Y").to_string();
            points.extend(self.read_day(meter, &date, units.as_deref()).await?);
        }
        sort_and_dedup(&mut points);

        tracing::debug!(
            meter = %meter.meter_id(),
            count = points.len(),
            "Read historical data"
        );
        Ok(points)
    }
}

// ============================================================================
// Payloads
// ============================================================================

fn search_query(meter: &MeterIdentity) -> serde_json::Value {
    serde_json::json!({
        "query": {
            "terms": {
                "meter.meter_uuid": [meter.meter_uuid()]
            }
        }
    })
}

/// Extracts meter identities from the dashboard page.
fn parse_dashboard(html: &str) -> Result<Vec<MeterIdentity>, ParseError> {
    let start = html
        .find(METER_LIST_MARKER)
        .map(|i| i + METER_LIST_MARKER.len())
        .ok_or_else(|| ParseError::MissingField("meter list".to_string()))?;

    let line = html[start..].lines().next().unwrap_or_default();
    let json = line.trim().trim_end_matches(';');
    let entries: Vec<serde_json::Value> = serde_json::from_str(json)?;

    entries
        .iter()
        .map(|entry| {
            let meter_uuid = json_string(entry, "meter_uuid")?;
            let meter_id = json_string(entry, "meter_id")?;
            Ok(MeterIdentity::new(meter_id, meter_uuid))
        })
        .collect()
}

/// Reads a field that the API sends either as a string or as a number.
fn json_string(entry: &serde_json::Value, field: &str) -> Result<String, ParseError> {
    match entry.get(field) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ParseError::MissingField(field.to_string())),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    elastic_results: ElasticResults,
}

#[derive(Debug, Deserialize)]
struct ElasticResults {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source")]
    source: MeterInfo,
}

#[derive(Debug, Deserialize)]
struct ConsumptionResponse {
    #[serde(default)]
    timeseries: HashMap<String, Timeseries>,
}

#[derive(Debug, Deserialize)]
struct Timeseries {
    #[serde(default)]
    series: Vec<SeriesPoint>,
}

#[derive(Debug, Deserialize)]
struct SeriesPoint {
    date: String,
    #[serde(default)]
    bill_read: Option<f64>,
}

impl ConsumptionResponse {
    fn into_points(
        mut self,
        meter_uuid: &str,
        offset: FixedOffset,
    ) -> Result<Vec<DataPoint>, ApiError> {
        let Some(timeseries) = self.timeseries.remove(meter_uuid) else {
            return Ok(Vec::new());
        };

        timeseries
            .series
            .into_iter()
            .filter_map(|point| point.bill_read.map(|read| (point.date, read)))
            .map(|(date, read)| Ok(DataPoint::new(parse_timestamp(&date, offset)?, read)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn config_trims_trailing_slash() {
        let config = HttpConfig::new("https://eyeonwater.com/", "u", "p");
        assert_eq!(config.base_url(), "https://eyeonwater.com");
    }

    #[test]
    fn config_from_integration() {
        let integration = IntegrationConfig::new("u", "p")
            .with_hostname("eyeonwater.ca")
            .with_request_timeout(Duration::from_secs(7));
        let config = HttpConfig::from_integration(&integration);
        assert_eq!(config.base_url(), "https://eyeonwater.ca");
        assert_eq!(config.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn parse_dashboard_meter_list() {
        let html = r#"<html><script>
            var x = 1;
            AQ.Views.MeterPicker.meters = [{"display_address": "1 Main St", "meter_uuid": "5215777958325016766", "meter_id": 60439875}];
            AQ.Views.MeterPicker.render();
        </script></html>"#;

        let identities = parse_dashboard(html).unwrap();
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].meter_uuid(), "5215777958325016766");
        assert_eq!(identities[0].meter_id(), "60439875");
    }

    #[test]
    fn parse_dashboard_without_meters() {
        let err = parse_dashboard("<html></html>").unwrap_err();
        assert!(matches!(err, ParseError::MissingField(_)));
    }

    #[test]
    fn consumption_points() {
        let json = serde_json::json!({
            "timeseries": {
                "42": {"series": [
                    {"date": "2024-01-15T10:00:00", "bill_read": 100.5, "display_unit": "GAL"},
                    {"date": "2024-01-15T11:00:00", "bill_read": null},
                    {"date": "2024-01-15T12:00:00", "bill_read": 101.0}
                ]}
            }
        });
        let response: ConsumptionResponse = serde_json::from_value(json).unwrap();
        let points = response.into_points("42", Utc.fix()).unwrap();

        assert_eq!(
            points,
            vec![
                DataPoint::new(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(), 100.5),
                DataPoint::new(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(), 101.0),
            ]
        );
    }

    #[test]
    fn consumption_for_other_meter_is_empty() {
        let json = serde_json::json!({"timeseries": {"1": {"series": []}}});
        let response: ConsumptionResponse = serde_json::from_value(json).unwrap();
        assert!(response.into_points("2", Utc.fix()).unwrap().is_empty());
    }

    #[test]
    fn consumption_with_bad_date() {
        let json = serde_json::json!({
            "timeseries": {"1": {"series": [{"date": "yesterday", "bill_read": 1.0}]}}
        });
        let response: ConsumptionResponse = serde_json::from_value(json).unwrap();
        assert!(matches!(
            response.into_points("1", Utc.fix()),
            Err(ApiError::Parse(ParseError::InvalidValue { .. }))
        ));
    }
}
