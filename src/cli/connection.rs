//! Device connection arguments.

use std::{collections::BTreeSet, path::PathBuf, sync::Arc};

use clap::Parser;
use tokio_modbus::SlaveId;

use crate::{
    device::{ClientSettings, DeviceClient},
    modbus::{Endpoint, TcpConnector},
    prelude::*,
    sunspec::Catalog,
};

/// Models enabled unless configured otherwise.
pub const DEFAULT_ENABLED_MODELS: [u16; 25] = [
    101, 102, 103, 201, 202, 203, 204, 307, 308, 401, 402, 403, 404, 501, 502, 601, 701, 801,
    802, 803, 804, 805, 806, 808, 809,
];

#[must_use]
#[derive(Parser)]
pub struct ConnectionArgs {
    /// Device host name or IP address.
    #[clap(long, env = "SUNSPEC_HOST")]
    pub host: String,

    #[clap(long, env = "SUNSPEC_PORT", default_value_t = Endpoint::DEFAULT_PORT)]
    pub port: u16,

    /// Modbus unit (slave) identifier.
    #[clap(long, alias = "slave-id", env = "SUNSPEC_UNIT_ID", default_value = "1")]
    pub unit_id: SlaveId,

    /// Modbus connect and read timeout.
    #[clap(long, env = "SUNSPEC_TIMEOUT", default_value = "120s")]
    pub timeout: humantime::Duration,

    /// Pause before reading each model instance.
    #[clap(long, env = "SUNSPEC_READ_DELAY", default_value = "600ms")]
    pub read_delay: humantime::Duration,

    /// Directory with extra SunSpec model definitions in JSON.
    #[clap(long = "definitions", env = "SUNSPEC_DEFINITIONS")]
    pub definitions_path: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::try_new(&self.host, self.port, self.unit_id)
    }

    pub fn catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::bundled().context("failed to load the bundled definitions")?;
        if let Some(path) = &self.definitions_path {
            catalog.load_dir(path).with_context(|| {
                format!("failed to load the definitions from `{}`", path.display())
            })?;
        }
        debug!(n_definitions = catalog.len(), "loaded the catalog");
        Ok(catalog)
    }

    pub fn client(&self) -> Result<DeviceClient<TcpConnector>> {
        self.client_with(Arc::new(self.catalog()?))
    }

    pub fn client_with(&self, catalog: Arc<Catalog>) -> Result<DeviceClient<TcpConnector>> {
        let settings = ClientSettings::builder()
            .timeout(self.timeout.into())
            .read_delay(self.read_delay.into())
            .build();
        Ok(DeviceClient::builder()
            .endpoint(self.endpoint()?)
            .connector(TcpConnector::default())
            .catalog(catalog)
            .settings(settings)
            .build())
    }
}

#[must_use]
#[derive(Parser)]
pub struct EnabledModelsArgs {
    /// Comma-separated model ids to poll.
    #[clap(
        long = "models",
        env = "SUNSPEC_MODELS",
        value_delimiter = ',',
        default_values_t = DEFAULT_ENABLED_MODELS,
    )]
    pub models: Vec<u16>,
}

impl EnabledModelsArgs {
    pub fn enabled_models(&self) -> BTreeSet<u16> {
        self.models.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_models_bundled_ok() -> Result {
        let catalog = Catalog::bundled()?;
        // Flow battery models are only available through `--definitions`.
        let missing: Vec<u16> = DEFAULT_ENABLED_MODELS
            .into_iter()
            .filter(|id| catalog.get(*id).is_none())
            .collect();
        assert_eq!(missing, [806, 808, 809]);
        Ok(())
    }
}
