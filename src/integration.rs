// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Setup and lifetime of one configured account.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::api::MeterApi;
use crate::config::IntegrationConfig;
use crate::coordinator::{
    BackfillReport, Scheduler, SchedulerHandle, UpdateCoordinator, UpdateStatus,
};
use crate::entity::{self, Entity};
use crate::error::{ApiError, Result, SetupError};
use crate::event::{CoordinatorEvent, EntryEvents, EntryId};
use crate::meter::MeterHandle;
use crate::statistics::{StatisticsStore, statistic_id_for};

/// Everything entity factories need to know about an account.
#[derive(Debug)]
pub struct EntryContext<A, S> {
    entry_id: EntryId,
    config: IntegrationConfig,
    coordinator: Arc<UpdateCoordinator<A, S>>,
}

impl<A, S> EntryContext<A, S> {
    /// Returns the id of the account.
    #[must_use]
    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    /// Returns the configuration the account was set up with.
    #[must_use]
    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Returns the coordinator of the account.
    #[must_use]
    pub fn coordinator(&self) -> &Arc<UpdateCoordinator<A, S>> {
        &self.coordinator
    }
}

/// A running account: coordinator, scheduler and entities.
///
/// # Examples
///
/// ```no_run
/// use eyeonwater::{Integration, IntegrationConfig};
/// use eyeonwater::statistics::MemoryStatisticsStore;
///
/// # async fn example() -> eyeonwater::Result<()> {
/// let config = IntegrationConfig::new("user@example.com", "secret");
/// let integration = Integration::connect(config, MemoryStatisticsStore::new()).await?;
///
/// for entity in integration.entities() {
///     println!("{}: {:?}", entity.unique_id(), entity.state());
/// }
///
/// integration.refresh();
/// integration.unload();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Integration<A, S> {
    context: EntryContext<A, S>,
    scheduler: SchedulerHandle,
}

impl<A, S> Integration<A, S>
where
    A: MeterApi + 'static,
    S: StatisticsStore + 'static,
{
    /// Sets the account up and starts polling.
    ///
    /// Logs in, discovers the meters once and loads the watermark of each
    /// meter's statistics stream. The first cycle starts right away.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the configuration is invalid
    /// - [`SetupError::InvalidCredentials`] if the login is rejected
    /// - [`SetupError::NotReady`] if the API cannot be reached; retry later
    /// - [`Error::Statistics`](crate::Error::Statistics) if the store cannot be queried
    pub async fn setup(config: IntegrationConfig, api: A, store: S) -> Result<Self> {
        config.validate()?;

        api.authenticate().await.map_err(setup_error)?;
        let meters = api.fetch_meters().await.map_err(setup_error)?;
        tracing::info!(count = meters.len(), "Discovered EyeOnWater meters");

        let mut coordinated = Vec::with_capacity(meters.len());
        for meter in meters {
            let statistic_id = statistic_id_for(&meter.identity);
            let watermark = store.get_last_imported_time(&statistic_id).await?;
            tracing::debug!(
                statistic_id = %statistic_id,
                watermark = ?watermark,
                "Loaded statistics watermark"
            );
            coordinated.push((MeterHandle::new(meter), watermark));
        }

        let entry_id = EntryId::new();
        let coordinator = Arc::new(
            UpdateCoordinator::new(entry_id, Arc::new(api), Arc::new(store), coordinated)
                .with_days_to_load(config.days_to_load())
                .with_fetch_timeout(config.fetch_timeout()),
        );

        let job = Arc::clone(&coordinator);
        let scheduler = Scheduler::spawn(
            config.scan_interval(),
            config.debounce_cooldown(),
            move || {
                let coordinator = Arc::clone(&job);
                async move {
                    coordinator.try_run_cycle().await;
                }
            },
        );

        Ok(Self {
            context: EntryContext {
                entry_id,
                config,
                coordinator,
            },
            scheduler,
        })
    }

    /// Returns the account context handed to entity factories.
    #[must_use]
    pub fn context(&self) -> &EntryContext<A, S> {
        &self.context
    }

    /// Returns the meters of the account.
    #[must_use]
    pub fn meters(&self) -> &[MeterHandle] {
        self.context.coordinator.meters()
    }

    /// Creates all entities of the account.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities = entity::sensors(&self.context);
        entities.extend(entity::binary_sensors(&self.context));
        entities
    }

    /// Returns the status of the last finished cycle.
    #[must_use]
    pub fn status(&self) -> UpdateStatus {
        self.context.coordinator.status()
    }

    /// Creates a receiver notified after every finished cycle.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<UpdateStatus> {
        self.context.coordinator.watch_status()
    }

    /// Subscribes to coordinator events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.context.coordinator.subscribe()
    }

    /// Subscribes to the events of this account only.
    #[must_use]
    pub fn events(&self) -> EntryEvents {
        self.context.coordinator.events()
    }

    /// Requests a refresh, debounced by the configured cooldown.
    pub fn refresh(&self) {
        self.scheduler.request_refresh();
    }

    /// Runs a cycle now, bypassing the cooldown.
    ///
    /// # Errors
    ///
    /// See [`UpdateCoordinator::run_cycle`].
    pub async fn refresh_now(&self) -> Result<Vec<MeterHandle>> {
        self.context.coordinator.run_cycle().await
    }

    /// Imports the last `days` days of history of every meter.
    ///
    /// # Errors
    ///
    /// See [`UpdateCoordinator::import_historical_data`].
    pub async fn import_historical_data(&self, days: u32) -> Result<BackfillReport> {
        self.context.coordinator.import_historical_data(days).await
    }

    /// Stops polling and releases the account.
    pub fn unload(self) {
        self.scheduler.shutdown();
        tracing::info!(entry = %self.context.entry_id, "Unloaded EyeOnWater account");
    }
}

#[cfg(feature = "http")]
impl<S: StatisticsStore + 'static> Integration<crate::api::HttpClient, S> {
    /// Sets an account up against the EyeOnWater web API.
    ///
    /// # Errors
    ///
    /// See [`setup`](Self::setup).
    pub async fn connect(config: IntegrationConfig, store: S) -> Result<Self> {
        config.validate()?;
        let api = crate::api::HttpConfig::from_integration(&config).into_client()?;
        Self::setup(config, api, store).await
    }
}

fn setup_error(err: ApiError) -> SetupError {
    match err {
        ApiError::Authentication => SetupError::InvalidCredentials,
        other => {
            tracing::warn!(error = %other, "EyeOnWater is not reachable yet");
            SetupError::NotReady(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_is_not_retryable() {
        let err = setup_error(ApiError::Authentication);
        assert!(matches!(err, SetupError::InvalidCredentials));
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_errors_are_retryable() {
        for err in [
            ApiError::Timeout(30_000),
            ApiError::ConnectionFailed("refused".to_string()),
            ApiError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            },
        ] {
            assert!(setup_error(err).is_retryable());
        }
    }
}
