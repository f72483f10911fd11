use std::sync::Arc;

use crate::sunspec::{PointDefinition, RawValue, Value};

/// Failure resolving a single point, never fatal for a poll cycle.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PointError {
    #[error("point `{key}` is not found in model instance #{index}")]
    NotFound { key: String, index: usize },

    #[error("computed value of `{0}` overflows")]
    Overflow(String),
}

/// Resolved scale factor of a point.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Scale {
    #[default]
    Unscaled,

    Factor(i16),

    /// The referenced scale factor is missing or not implemented by the device.
    Unavailable,
}

#[derive(Clone, Debug)]
pub struct Point {
    pub definition: Arc<PointDefinition>,
    pub value: Option<RawValue>,
    pub scale: Scale,
}

impl Point {
    pub const fn new(definition: Arc<PointDefinition>, value: Option<RawValue>) -> Self {
        Self { definition, value, scale: Scale::Unscaled }
    }

    /// Whether the point can be exposed as an entity.
    ///
    /// Enumerations and bitfields are always exposable when present, other points need a unit.
    #[must_use]
    pub fn is_exposable(&self) -> bool {
        self.value.is_some()
            && (self.definition.kind.is_symbolic() || self.definition.units.is_some())
    }

    /// Value with the scale factor applied.
    pub fn computed(&self) -> Result<Option<Value>, PointError> {
        let Some(value) = &self.value else {
            return Ok(None);
        };
        let factor = match self.scale {
            Scale::Unscaled => 0,
            Scale::Factor(factor) => factor,
            Scale::Unavailable => return Ok(None),
        };
        let overflow = || PointError::Overflow(self.definition.name.clone());
        match value {
            RawValue::Text(text) => Ok(Some(Value::Text(text.clone()))),
            RawValue::Float(value) => {
                let scaled = value * 10_f64.powi(factor.into());
                if scaled.is_finite() { Ok(Some(Value::Float(scaled))) } else { Err(overflow()) }
            }
            RawValue::Signed(value) => scale(*value, factor).map(Some).ok_or_else(overflow),
            RawValue::Unsigned(value) => i64::try_from(*value)
                .ok()
                .and_then(|value| scale(value, factor))
                .map(Some)
                .ok_or_else(overflow),
        }
    }
}

/// Scale an integer, keeping it exact for non-negative factors.
#[expect(clippy::cast_precision_loss)]
fn scale(value: i64, factor: i16) -> Option<Value> {
    let exponent = u32::from(factor.unsigned_abs());
    if factor >= 0 {
        10_i64
            .checked_pow(exponent)
            .and_then(|multiplier| value.checked_mul(multiplier))
            .map(Value::Integer)
    } else {
        Some(Value::Float(value as f64 / 10_f64.powi(exponent.try_into().ok()?)))
    }
}
