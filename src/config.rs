// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration configuration.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::error::ConfigError;

/// Integration domain, used in device identifiers.
pub const DOMAIN: &str = "eyeonwater";

/// Prefix of device and entity names.
pub const WATER_METER_NAME: &str = "Water Meter";

/// EyeOnWater hosts by country.
pub const SUPPORTED_HOSTNAMES: [&str; 2] = ["eyeonwater.com", "eyeonwater.ca"];

/// Configuration of one EyeOnWater account.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use eyeonwater::config::IntegrationConfig;
///
/// let config = IntegrationConfig::new("user@example.com", "secret")
///     .with_hostname("eyeonwater.ca")
///     .with_scan_interval(Duration::from_secs(30 * 60))
///     .with_days_to_load(5);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.base_url(), "https://eyeonwater.ca");
/// ```
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    username: String,
    password: String,
    hostname: String,
    base_url: Option<String>,
    scan_interval: Duration,
    debounce_cooldown: Duration,
    days_to_load: u32,
    request_timeout: Duration,
    fetch_timeout: Option<Duration>,
    utc_offset: FixedOffset,
}

impl IntegrationConfig {
    /// Default polling interval.
    pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60 * 60);
    /// Default cooldown between manual refreshes.
    pub const DEFAULT_DEBOUNCE_COOLDOWN: Duration = Duration::from_secs(1800);
    /// Default historical lookback of a regular cycle, in days.
    pub const DEFAULT_DAYS_TO_LOAD: u32 = 3;
    /// Default HTTP request timeout.
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default host.
    pub const DEFAULT_HOSTNAME: &'static str = "eyeonwater.com";

    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            hostname: Self::DEFAULT_HOSTNAME.to_string(),
            base_url: None,
            scan_interval: Self::DEFAULT_SCAN_INTERVAL,
            debounce_cooldown: Self::DEFAULT_DEBOUNCE_COOLDOWN,
            days_to_load: Self::DEFAULT_DAYS_TO_LOAD,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            fetch_timeout: None,
            utc_offset: Utc.fix(),
        }
    }

    /// Sets the EyeOnWater host (`eyeonwater.com` or `eyeonwater.ca`).
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Overrides the base URL, e.g. to point at a test server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Sets the cooldown between manual refreshes.
    #[must_use]
    pub fn with_debounce_cooldown(mut self, cooldown: Duration) -> Self {
        self.debounce_cooldown = cooldown;
        self
    }

    /// Sets the historical lookback of a regular cycle, in days.
    #[must_use]
    pub fn with_days_to_load(mut self, days: u32) -> Self {
        self.days_to_load = days;
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Bounds every individual meter fetch of a cycle.
    ///
    /// Off by default: a hanging fetch then holds the whole cycle until the
    /// HTTP request timeout fires.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Sets the UTC offset applied to API timestamps that carry none.
    ///
    /// The offset is fixed. Accounts in a zone with daylight saving time
    /// only get correct naive timestamps for the part of the year the
    /// offset matches; outside of it their readings are shifted by the
    /// DST difference, typically one hour. Timestamps with their own
    /// offset and Unix epochs are not affected.
    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Returns the account username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the account password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the EyeOnWater host.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Returns the base URL of the API.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.hostname))
    }

    /// Returns the polling interval.
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    /// Returns the cooldown between manual refreshes.
    #[must_use]
    pub fn debounce_cooldown(&self) -> Duration {
        self.debounce_cooldown
    }

    /// Returns the historical lookback of a regular cycle, in days.
    #[must_use]
    pub fn days_to_load(&self) -> u32 {
        self.days_to_load
    }

    /// Returns the HTTP request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the per-fetch timeout, if enabled.
    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    /// Returns the fixed UTC offset used for naive API timestamps.
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Checks the configuration for values that can never work.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::Empty("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Empty("password"));
        }
        if self.base_url.is_none() && !SUPPORTED_HOSTNAMES.contains(&self.hostname.as_str()) {
            return Err(ConfigError::InvalidHostname(self.hostname.clone()));
        }
        if self.scan_interval.is_zero() {
            return Err(ConfigError::Zero("scan interval"));
        }
        if self.days_to_load == 0 {
            return Err(ConfigError::Zero("days to load"));
        }
        if self.fetch_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Zero("fetch timeout"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IntegrationConfig::new("user", "pass");
        assert_eq!(config.scan_interval(), Duration::from_secs(3600));
        assert_eq!(config.debounce_cooldown(), Duration::from_secs(1800));
        assert_eq!(config.days_to_load(), 3);
        assert_eq!(config.fetch_timeout(), None);
        assert_eq!(config.hostname(), "eyeonwater.com");
        assert_eq!(config.base_url(), "https://eyeonwater.com");
        assert_eq!(config.utc_offset().local_minus_utc(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn base_url_override() {
        let config = IntegrationConfig::new("user", "pass").with_base_url("http://127.0.0.1:8080");
        assert_eq!(config.base_url(), "http://127.0.0.1:8080");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_empty_credentials() {
        assert_eq!(
            IntegrationConfig::new(" ", "pass").validate(),
            Err(ConfigError::Empty("username"))
        );
        assert_eq!(
            IntegrationConfig::new("user", "").validate(),
            Err(ConfigError::Empty("password"))
        );
    }

    #[test]
    fn rejects_unknown_host() {
        let config = IntegrationConfig::new("user", "pass").with_hostname("example.com");
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidHostname("example.com".to_string()))
        );
    }

    #[test]
    fn rejects_zero_values() {
        let config = IntegrationConfig::new("user", "pass").with_days_to_load(0);
        assert_eq!(config.validate(), Err(ConfigError::Zero("days to load")));

        let config = IntegrationConfig::new("user", "pass").with_scan_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::Zero("scan interval")));

        let config = IntegrationConfig::new("user", "pass").with_fetch_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::Zero("fetch timeout")));
    }
}
