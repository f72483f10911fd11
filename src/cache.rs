use std::{collections::BTreeMap, fmt::Debug, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{entity::Sensor, prelude::*, sunspec::Value};

/// State kept between runs.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cache {
    /// Last known energy readings by sensor unique id.
    #[serde(default)]
    pub last_known: BTreeMap<String, Value>,
}

impl Cache {
    #[instrument(name = "reading the cache…")]
    pub fn read_from<P: AsRef<Path> + Debug>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() { Ok(toml::from_slice(&fs::read(path)?)?) } else { Ok(Self::default()) }
    }

    #[instrument(skip(self), name = "writing the cache…")]
    pub fn write_to<P: AsRef<Path> + Debug>(&self, path: P) -> Result {
        fs::write(path, toml::to_string(self)?)?;
        Ok(())
    }

    /// Seed the energy sensors with their last known readings.
    pub fn restore(&self, sensors: &mut [Sensor]) {
        for sensor in sensors.iter_mut().filter(|sensor| sensor.is_energy()) {
            if let Some(value) = self.last_known.get(&sensor.unique_id) {
                debug!(unique_id = sensor.unique_id, %value, "restored");
                sensor.restore(value.clone());
            }
        }
    }

    /// Remember the last known energy readings, returns whether anything has changed.
    pub fn remember(&mut self, sensors: &[Sensor]) -> bool {
        let mut is_changed = false;
        for sensor in sensors.iter().filter(|sensor| sensor.is_energy()) {
            if let Some(value) = sensor.last_known()
                && self.last_known.get(&sensor.unique_id) != Some(value)
            {
                self.last_known.insert(sensor.unique_id.clone(), value.clone());
                is_changed = true;
            }
        }
        is_changed
    }
}
