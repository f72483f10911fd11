//! Sensor entities over the polling result.

mod units;

use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;

pub use self::units::{DeviceClass, StateClass, UnitMeta};
use self::units::{ICON_DC_AMPS, ICON_DEFAULT};
use crate::{
    coordinator::PollingResult,
    prelude::*,
    sunspec::{ModelWrapper, PointDefinition, PointError, PointKey, PointKind, Value},
};

pub const INTEGRATION: &str = "sunspec";

/// Longest state text a sensor may report.
const MAX_STATE_LENGTH: usize = 255;

/// One exposed point of one model instance.
#[derive(Clone, Debug)]
pub struct Sensor {
    pub unique_id: String,
    pub name: String,
    pub model_id: u16,
    pub model_index: usize,
    pub key: PointKey,
    pub unit: Option<String>,
    pub icon: &'static str,
    pub device_class: Option<DeviceClass>,
    definition: Arc<PointDefinition>,
    last_known: Option<Value>,
    is_assumed: bool,
}

impl Sensor {
    /// Create a sensor per exposable key and model instance.
    pub fn from_polling_result(entry_id: &str, prefix: &str, data: &PollingResult) -> Vec<Self> {
        data.values()
            .flat_map(move |model| {
                model.keys().into_iter().flat_map(move |key| {
                    (0..model.num_models()).filter_map(move |model_index| {
                        Self::new(entry_id, prefix, model, key.clone(), model_index)
                    })
                })
            })
            .collect()
    }

    /// Describe the point, `None` if the model does not define it.
    #[must_use]
    pub fn new(
        entry_id: &str,
        prefix: &str,
        model: &ModelWrapper,
        key: PointKey,
        model_index: usize,
    ) -> Option<Self> {
        let model_id = model.id();
        let definition = model.meta(&key)?.clone();

        let (unit, mut icon, device_class) = if definition.kind.is_symbolic() {
            let device_class = definition.kind.symbols().map(|_| DeviceClass::Enum);
            (None, ICON_DEFAULT, device_class)
        } else {
            match definition.units.as_deref() {
                Some(units) => UnitMeta::lookup(units).map_or_else(
                    || (Some(units.to_string()), ICON_DEFAULT, None),
                    |meta| (Some(meta.unit.to_string()), meta.icon, meta.device_class),
                ),
                None => (None, ICON_DEFAULT, None),
            }
        };

        let label = definition.label.clone().unwrap_or_else(|| key.to_string());
        if unit.as_deref() == Some("A") && label.contains("DC") {
            icon = ICON_DC_AMPS;
        }

        let mut name = model.group_meta().name.clone();
        if model_index > 0 {
            name = format!("{name} {model_index}");
        }
        if let PointKey::Grouped { group, index, .. } = &key {
            name = format!("{name} {group} {index}");
        }
        if !prefix.is_empty() {
            name = format!("{prefix} {name}");
        }
        let name = format!("{} {label}", capitalize(&name));

        let unique_id = format!("{entry_id}_{key}-{model_id}-{model_index}");
        trace!(unique_id, name, ?unit, ?device_class, "described");
        Some(Self {
            unique_id,
            name,
            model_id,
            model_index,
            key,
            unit,
            icon,
            device_class,
            definition,
            last_known: None,
            is_assumed: false,
        })
    }

    #[must_use]
    pub fn is_energy(&self) -> bool {
        self.device_class == Some(DeviceClass::Energy)
    }

    /// Whether the reported value is the last known one instead of the current reading.
    #[must_use]
    pub const fn is_assumed(&self) -> bool {
        self.is_assumed
    }

    #[must_use]
    pub const fn last_known(&self) -> Option<&Value> {
        self.last_known.as_ref()
    }

    /// Seed the last known value, for example from the previous run.
    pub fn restore(&mut self, value: Value) {
        self.last_known = Some(value);
    }

    #[must_use]
    pub fn state_class(&self) -> Option<StateClass> {
        match (&self.unit, self.device_class) {
            (None, _) => None,
            (Some(unit), _) if unit.is_empty() => None,
            (_, Some(DeviceClass::Energy)) => Some(StateClass::TotalIncreasing),
            _ => Some(StateClass::Measurement),
        }
    }

    /// Enumeration options including the empty state, for enum sensors only.
    #[must_use]
    pub fn options(&self) -> Option<Vec<String>> {
        if self.device_class != Some(DeviceClass::Enum) {
            return None;
        }
        let symbols = self.definition.kind.symbols()?;
        Some(symbols.iter().map(|symbol| symbol.name.clone()).chain([String::new()]).collect())
    }

    /// Computed value of the point, absent when it cannot be resolved.
    #[must_use]
    pub fn raw_value(&self, data: &PollingResult) -> Option<Value> {
        let Some(model) = data.get(&self.model_id) else {
            warn!(model_id = self.model_id, "model is not found");
            return None;
        };
        match model.value(&self.key.to_string(), self.model_index) {
            Ok(value) => value,
            Err(error @ PointError::Overflow(_)) => {
                warn!(unique_id = self.unique_id, "{error}");
                None
            }
            Err(error @ PointError::NotFound { .. }) => {
                debug!(unique_id = self.unique_id, "{error}");
                None
            }
        }
    }

    /// State as rendered for the sensor: symbol names for enumerations and bitfields.
    #[must_use]
    pub fn native_value(&self, data: &PollingResult) -> Option<Value> {
        let value = self.raw_value(data)?;
        let symbols = match (&self.definition.kind, self.definition.kind.symbols()) {
            (PointKind::Scalar, _) | (_, None) => return Some(value),
            (_, Some(symbols)) => symbols,
        };
        let raw = value.as_integer()?;
        if matches!(self.definition.kind, PointKind::Enum(_)) {
            symbols
                .iter()
                .find(|symbol| i64::from(symbol.value) == raw)
                .map(|symbol| Value::Text(truncate(&symbol.name)))
        } else {
            let names = symbols
                .iter()
                .filter(|symbol| raw.checked_shr(symbol.value).is_some_and(|bits| bits & 1 == 1))
                .sorted_by_key(|symbol| symbol.value)
                .map(|symbol| symbol.name.as_str())
                .join(",");
            Some(Value::Text(truncate(&names)))
        }
    }

    /// Refresh the state, holding energy counters at the last known value on zero readings.
    pub fn update(&mut self, data: &PollingResult) -> Option<Value> {
        let value = self.native_value(data);
        if !self.is_energy() {
            return value;
        }
        if value.as_ref().is_some_and(Value::is_zero) {
            debug!(unique_id = self.unique_id, "zero energy reading, using the last known value");
            self.is_assumed = true;
            return self.last_known.clone();
        }
        self.is_assumed = false;
        if value.is_some() {
            self.last_known.clone_from(&value);
        }
        value
    }

    #[must_use]
    pub fn attributes(&self, data: &PollingResult) -> IndexMap<&'static str, String> {
        let mut attributes = IndexMap::from([
            ("integration", INTEGRATION.to_string()),
            ("sunspec_key", self.key.to_string()),
        ]);
        if let Some(label) = &self.definition.label {
            attributes.insert("label", label.clone());
        }
        if self.definition.kind.is_symbolic()
            && let Some(raw) = self.raw_value(data)
        {
            attributes.insert("raw", raw.to_string());
        }
        attributes
    }
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_STATE_LENGTH).collect()
}
