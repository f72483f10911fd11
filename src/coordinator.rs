//! Poll cycles over one device.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use clap::ValueEnum;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::{
    device::DeviceClient,
    modbus::{Connector, DeviceError},
    prelude::*,
    sunspec::ModelWrapper,
};

/// Published models by model id.
pub type PollingResult = BTreeMap<u16, ModelWrapper>;

/// What to do with the transport after a successful cycle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ClosePolicy {
    /// Close the transport, the next cycle reopens it without rescanning.
    #[default]
    AfterCycle,

    /// Keep the transport open between cycles.
    KeepAlive,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum State {
    #[default]
    Idle,
    FetchingModels,
    FetchingData,
}

/// Cycle failure, the device error is kept as the source.
#[derive(Debug, thiserror::Error)]
#[error("update failed")]
pub struct UpdateFailed(#[source] pub DeviceError);

pub struct UpdateCoordinator<C: Connector> {
    client: DeviceClient<C>,
    enabled_models: BTreeSet<u16>,
    close_policy: ClosePolicy,
    state: State,
    data: Option<Arc<PollingResult>>,
}

impl<C: Connector> UpdateCoordinator<C> {
    pub const fn new(
        client: DeviceClient<C>,
        enabled_models: BTreeSet<u16>,
        close_policy: ClosePolicy,
    ) -> Self {
        Self { client, enabled_models, close_policy, state: State::Idle, data: None }
    }

    #[cfg(test)]
    pub const fn state(&self) -> State {
        self.state
    }

    /// Last successfully published result.
    #[must_use]
    pub fn data(&self) -> Option<Arc<PollingResult>> {
        self.data.clone()
    }

    /// Run one poll cycle and publish its result.
    ///
    /// Nothing is published on failure: the previous result stays and the cached
    /// connection is dropped.
    #[instrument(skip_all, fields(endpoint = %self.client.endpoint()))]
    pub async fn refresh(&mut self) -> Result<Arc<PollingResult>, UpdateFailed> {
        let result = self.fetch().await;
        self.transition(State::Idle);
        match result {
            Ok(data) => {
                if self.close_policy == ClosePolicy::AfterCycle {
                    self.client.close().await;
                }
                let data = Arc::new(data);
                self.data = Some(data.clone());
                info!(n_models = data.len(), "updated");
                Ok(data)
            }
            Err(error) => {
                warn!("poll cycle failed: {error}");
                self.client.reconnect().await;
                Err(UpdateFailed(error))
            }
        }
    }

    async fn fetch(&mut self) -> Result<PollingResult, DeviceError> {
        self.transition(State::FetchingModels);
        let advertised: BTreeSet<u16> = self.client.list_models().await?.into_iter().collect();
        let ids = advertised.intersection(&self.enabled_models).copied().collect::<Vec<_>>();
        debug!(?ids, "fetching…");

        self.transition(State::FetchingData);
        let mut data = PollingResult::new();
        for id in ids {
            data.insert(id, self.client.read_model(id).await?);
        }
        Ok(data)
    }

    fn transition(&mut self, state: State) {
        trace!(from = ?self.state, to = ?state, "transition");
        self.state = state;
    }

    /// Refresh on the fixed interval starting one period from now, calling back after every
    /// successful cycle.
    ///
    /// Cycles never overlap: a tick missed by a slow cycle is delayed.
    pub async fn run<F>(&mut self, period: Duration, mut on_update: F) -> Result
    where
        F: FnMut(&PollingResult) -> Result,
    {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match self.refresh().await {
                Ok(data) => on_update(data.as_ref())?,
                Err(error) => {
                    error!("{error:#}");
                    if let Some(data) = self.data() {
                        debug!(n_models = data.len(), "keeping the previous result");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::ClientSettings,
        modbus::{
            Endpoint,
            fake::{Failure, FakeDevice, RegisterImage, Words},
        },
        sunspec::{Catalog, Value},
    };

    fn device() -> FakeDevice {
        let mut image = RegisterImage::default()
            .model(1, Words::default().zeros(66))
            .model(103, Words::default().zeros(12).i16(1500).zeros(37))
            .model(160, Words::default().zeros(8))
            .model(304, Words::default().zeros(6));
        for id in 701..=712 {
            image = image.model(id, Words::default().zeros(4));
        }
        image.build()
    }

    fn coordinator(
        device: &FakeDevice,
        enabled_models: impl IntoIterator<Item = u16>,
        close_policy: ClosePolicy,
    ) -> Result<UpdateCoordinator<FakeDevice>> {
        let client = DeviceClient::builder()
            .endpoint(Endpoint::try_new("localhost", 502, 1)?)
            .connector(device.clone())
            .catalog(Arc::new(Catalog::bundled()?))
            .settings(ClientSettings::builder().read_delay(Duration::ZERO).build())
            .build();
        Ok(UpdateCoordinator::new(client, enabled_models.into_iter().collect(), close_policy))
    }

    #[tokio::test]
    async fn intersection_ok() -> Result {
        let device = device();
        let mut coordinator = coordinator(&device, [103, 160, 701, 999], ClosePolicy::AfterCycle)?;
        let data = coordinator.refresh().await?;
        assert_eq!(data.keys().copied().collect::<Vec<_>>(), [103, 160, 701]);
        assert_eq!(data[&103].value("W", 0)?, Some(Value::Integer(1500)));
        assert_eq!(coordinator.state(), State::Idle);
        assert_eq!(device.n_live(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn keep_alive_ok() -> Result {
        let device = device();
        let mut coordinator = coordinator(&device, [103], ClosePolicy::KeepAlive)?;
        coordinator.refresh().await?;
        coordinator.refresh().await?;
        assert_eq!(device.n_live(), 1);
        assert_eq!(device.n_connects(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn after_cycle_reopens_ok() -> Result {
        let device = device();
        let mut coordinator = coordinator(&device, [103], ClosePolicy::AfterCycle)?;
        coordinator.refresh().await?;
        coordinator.refresh().await?;
        assert_eq!(device.n_live(), 0);
        assert_eq!(device.n_connects(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn failure_keeps_previous_data_ok() -> Result {
        let device = device();
        let mut coordinator = coordinator(&device, [1, 103], ClosePolicy::KeepAlive)?;
        let published = coordinator.refresh().await?;

        device.set_register(40002 + 68 + 2 + 12, 1200);
        device.fail_next_read(Failure::Connection);
        let error = coordinator.refresh().await.unwrap_err();
        assert!(matches!(error.0, DeviceError::Connection(_)));
        assert_eq!(coordinator.state(), State::Idle);
        assert!(Arc::ptr_eq(&coordinator.data().unwrap(), &published));
        assert_eq!(device.n_live(), 0);

        let data = coordinator.refresh().await?;
        assert_eq!(data[&103].value("W", 0)?, Some(Value::Integer(1200)));
        assert_eq!(device.n_connects(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn never_reachable_ok() -> Result {
        let device = device();
        device.set_unreachable(true);
        let mut coordinator = coordinator(&device, [103], ClosePolicy::AfterCycle)?;
        assert!(coordinator.refresh().await.is_err());
        assert!(coordinator.data().is_none());
        Ok(())
    }
}
