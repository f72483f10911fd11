//! SunSpec device client on top of the connection cache.

use std::{sync::Arc, time::Duration};

use bon::Builder;

use crate::{
    modbus::{ConnectionCache, Connector, DeviceError, Endpoint, Shared, Transport},
    prelude::*,
    sunspec::{COMMON_MODEL_ID, Catalog, ModelWrapper, Models, Value, scan},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_READ_DELAY: Duration = Duration::from_millis(600);

/// Transport and the models scanned over it.
///
/// The transport may be closed between cycles, the models stay.
pub struct Connection<T> {
    transport: Option<T>,
    models: Models,
}

#[must_use]
#[derive(Copy, Clone, Debug, Builder)]
pub struct ClientSettings {
    /// Modbus connect and read timeout.
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,

    /// Pause before reading each model instance.
    #[builder(default = DEFAULT_READ_DELAY)]
    pub read_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Identification from the common model.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    fn from_common(common: &ModelWrapper) -> Self {
        let text = |key| match common.value(key, 0) {
            Ok(Some(Value::Text(text))) => Some(text),
            _ => None,
        };
        Self {
            manufacturer: text("Mn"),
            model: text("Md"),
            version: text("Vr"),
            serial_number: text("SN"),
        }
    }
}

#[derive(Builder)]
pub struct DeviceClient<C: Connector> {
    endpoint: Endpoint,
    connector: C,
    catalog: Arc<Catalog>,

    #[builder(default)]
    cache: Arc<ConnectionCache<Connection<C::Transport>>>,

    #[builder(default)]
    settings: ClientSettings,
}

impl<C: Connector> DeviceClient<C> {
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Open a new connection and scan the device models.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn connect(&self) -> Result<Connection<C::Transport>, DeviceError> {
        let mut transport = self.connector.connect(&self.endpoint, self.settings.timeout).await?;
        let models = scan(&mut transport, &self.catalog).await?;
        Ok(Connection { transport: Some(transport), models })
    }

    async fn connection(&self) -> Result<Shared<Connection<C::Transport>>, DeviceError> {
        self.cache.get_or_try_insert_with(&self.endpoint, async || self.connect().await).await
    }

    /// Advertised model ids, ascending.
    pub async fn list_models(&self) -> Result<Vec<u16>, DeviceError> {
        let connection = self.connection().await?;
        let ids = connection.lock().await.models.keys().copied().collect();
        Ok(ids)
    }

    /// Read every instance of the model from the device.
    #[instrument(skip_all, fields(endpoint = %self.endpoint, model_id = id))]
    pub async fn read_model(&self, id: u16) -> Result<ModelWrapper, DeviceError> {
        let connection = self.connection().await?;
        let mut connection = connection.lock().await;
        let Connection { transport, models } = &mut *connection;
        let instances = models.get_mut(&id).ok_or(DeviceError::ModelNotFound(id))?;
        let definition =
            instances.first().ok_or(DeviceError::ModelNotFound(id))?.definition.clone();
        let transport = self.reopen(transport).await?;
        for instance in instances.iter_mut() {
            tokio::time::sleep(self.settings.read_delay).await;
            instance.read(transport).await?;
        }
        debug!(n_instances = instances.len(), "read");
        Ok(ModelWrapper::new(definition, instances.clone()))
    }

    pub async fn read_device_info(&self) -> Result<DeviceInfo, DeviceError> {
        let common = self.read_model(COMMON_MODEL_ID).await?;
        Ok(DeviceInfo::from_common(&common))
    }

    /// Close the cached transport, keeping the scanned models.
    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn close(&self) {
        let Some(connection) = self.cache.get(&self.endpoint).await else {
            return;
        };
        let transport = connection.lock().await.transport.take();
        if let Some(mut transport) = transport {
            transport.close().await;
        }
    }

    /// Drop the cached connection, the next access connects and rescans.
    pub async fn reconnect(&self) {
        self.cache.invalidate(&self.endpoint).await;
    }

    async fn reopen<'t>(
        &self,
        transport: &'t mut Option<C::Transport>,
    ) -> Result<&'t mut C::Transport, DeviceError> {
        if !transport.as_ref().is_some_and(|transport| transport.is_connected()) {
            debug!("reopening the transport…");
            *transport = Some(self.connector.connect(&self.endpoint, self.settings.timeout).await?);
        }
        transport.as_mut().ok_or_else(|| DeviceError::connection("transport is closed"))
    }
}
