use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    cache::Cache,
    cli::connection::{ConnectionArgs, EnabledModelsArgs},
    coordinator::{ClosePolicy, PollingResult, UpdateCoordinator},
    entity::Sensor,
    prelude::*,
    tables::build_sensors_table,
};

#[derive(Parser)]
pub struct PollArgs {
    #[clap(flatten)]
    connection: ConnectionArgs,

    #[clap(flatten)]
    enabled_models: EnabledModelsArgs,

    /// Poll interval in seconds.
    #[clap(
        long,
        env = "SUNSPEC_SCAN_INTERVAL",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    scan_interval: u64,

    /// Sensor name prefix.
    #[clap(long, env = "SUNSPEC_PREFIX", default_value = "")]
    prefix: String,

    /// Entity id prefix, defaults to the device serial number.
    #[clap(long, env = "SUNSPEC_ENTRY_ID")]
    entry_id: Option<String>,

    #[clap(
        long,
        env = "SUNSPEC_CLOSE_POLICY",
        value_enum,
        default_value_t = ClosePolicy::default()
    )]
    close_policy: ClosePolicy,

    /// TOML file to keep the last known energy readings in.
    #[clap(long, env = "SUNSPEC_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Run a single poll cycle and exit.
    #[clap(long)]
    once: bool,
}

impl PollArgs {
    pub async fn run(self) -> Result {
        let client = self.connection.client()?;
        let info = client.read_device_info().await.context("failed to read the device info")?;
        info!(
            manufacturer = ?info.manufacturer,
            model = ?info.model,
            serial_number = ?info.serial_number,
            "identified"
        );
        let entry_id = self
            .entry_id
            .or(info.serial_number)
            .unwrap_or_else(|| client.endpoint().title());

        let mut coordinator = UpdateCoordinator::new(
            client,
            self.enabled_models.enabled_models(),
            self.close_policy,
        );
        let data = coordinator.refresh().await.context("the first refresh has failed")?;

        let mut sensors = Sensor::from_polling_result(&entry_id, &self.prefix, &data);
        for sensor in &sensors {
            debug!(
                unique_id = sensor.unique_id,
                name = sensor.name,
                options = ?sensor.options(),
                attributes = ?sensor.attributes(&data),
                "described"
            );
        }
        info!(n_sensors = sensors.len(), "described");
        let cache = match &self.state_file {
            Some(path) => Cache::read_from(path)?,
            None => Cache::default(),
        };
        cache.restore(&mut sensors);

        let mut renderer = Renderer { sensors, cache, state_file: self.state_file };
        renderer.on_update(&data)?;
        if self.once {
            return Ok(());
        }

        let interval = Duration::from_secs(self.scan_interval);
        tokio::select! {
            result = coordinator.run(interval, |data| renderer.on_update(data)) => result,
            result = shutdown_signal() => result,
        }
    }
}

struct Renderer {
    sensors: Vec<Sensor>,
    cache: Cache,
    state_file: Option<PathBuf>,
}

impl Renderer {
    fn on_update(&mut self, data: &PollingResult) -> Result {
        let states: Vec<_> = self.sensors.iter_mut().map(|sensor| sensor.update(data)).collect();
        println!("{}", build_sensors_table(self.sensors.iter().zip(states)));
        if self.cache.remember(&self.sensors)
            && let Some(path) = &self.state_file
        {
            self.cache.write_to(path)?;
        }
        Ok(())
    }
}

async fn shutdown_signal() -> Result {
    let ctrl_c = async { tokio::signal::ctrl_c().await.context("failed to listen for Ctrl+C") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to install the signal handler")?
            .recv()
            .await;
        anyhow::Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result>();

    let result = tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    };
    info!("stopping…");
    result
}
