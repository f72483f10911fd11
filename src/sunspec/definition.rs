//! Model definitions in the official SunSpec JSON layout.

use std::sync::Arc;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("point `{0}` must specify its size")]
    MissingSize(String),

    #[error("model {0} must start with the `ID` and `L` points")]
    MissingHeader(u16),

    #[error("failed to deserialize the model definition")]
    Json(#[from] serde_json::Error),

    #[error("failed to read the model definition")]
    Io(#[from] std::io::Error),
}

#[must_use]
#[derive(Debug, Deserialize)]
pub struct ModelDefinition {
    pub id: u16,
    pub group: GroupDefinition,
}

impl ModelDefinition {
    /// Placeholder for a model that is advertised by the device but unknown to the catalog.
    pub fn opaque(id: u16) -> Self {
        Self {
            id,
            group: GroupDefinition {
                name: format!("model_{id}"),
                label: None,
                description: None,
                count: None,
                points: Vec::new(),
                groups: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.group.points.is_empty() && self.group.groups.is_empty()
    }

    pub(super) fn validate(&self) -> Result<(), DefinitionError> {
        let mut points = self.group.points.iter().map(|point| point.name.as_str());
        if points.next() == Some("ID") && points.next() == Some("L") {
            Ok(())
        } else {
            Err(DefinitionError::MissingHeader(self.id))
        }
    }
}

#[must_use]
#[derive(Debug, Deserialize)]
pub struct GroupDefinition {
    pub name: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default, rename = "desc")]
    pub description: Option<String>,

    /// Number of repetitions, a single instance when omitted.
    #[serde(default)]
    pub count: Option<GroupCount>,

    #[serde(default)]
    pub points: Vec<Arc<PointDefinition>>,

    #[serde(default)]
    pub groups: Vec<Self>,
}

impl GroupDefinition {
    #[must_use]
    pub fn point(&self, name: &str) -> Option<&Arc<PointDefinition>> {
        self.points.iter().find(|point| point.name == name)
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Self> {
        self.groups.iter().find(|group| group.name == name)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum GroupCount {
    Fixed(u16),

    /// Name of the point holding the count.
    Point(String),
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum ScaleFactor {
    Fixed(i16),

    /// Name of the `sunssf` point holding the factor.
    Point(String),
}

#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int16,
    Uint16,
    Count,
    Acc16,
    Enum16,
    Bitfield16,
    Pad,
    Sunssf,
    Int32,
    Uint32,
    Acc32,
    Enum32,
    Bitfield32,
    Ipaddr,
    Float32,
    Int64,
    Uint64,
    Acc64,
    Float64,
    Eui48,
    Ipv6addr,

    #[serde(rename = "string")]
    Text,
}

impl DataType {
    /// Size in registers, `None` for variable-size types.
    #[must_use]
    pub const fn fixed_size(self) -> Option<u16> {
        match self {
            Self::Int16
            | Self::Uint16
            | Self::Count
            | Self::Acc16
            | Self::Enum16
            | Self::Bitfield16
            | Self::Pad
            | Self::Sunssf => Some(1),
            Self::Int32
            | Self::Uint32
            | Self::Acc32
            | Self::Enum32
            | Self::Bitfield32
            | Self::Ipaddr
            | Self::Float32 => Some(2),
            Self::Int64 | Self::Uint64 | Self::Acc64 | Self::Float64 | Self::Eui48 => Some(4),
            Self::Ipv6addr => Some(8),
            Self::Text => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Symbol {
    pub name: String,

    /// Enumeration value, or bit index for bitfields.
    pub value: u32,

    #[serde(default)]
    pub label: Option<String>,
}

/// How a point's raw value is interpreted, fixed when the definition is loaded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PointKind {
    Scalar,
    Enum(Vec<Symbol>),
    Bitfield(Vec<Symbol>),
}

impl PointKind {
    #[must_use]
    pub const fn is_symbolic(&self) -> bool {
        matches!(self, Self::Enum(_) | Self::Bitfield(_))
    }

    /// Symbol table, `None` for scalars and for enums or bitfields defined without one.
    #[must_use]
    pub fn symbols(&self) -> Option<&[Symbol]> {
        match self {
            Self::Enum(symbols) | Self::Bitfield(symbols) if !symbols.is_empty() => Some(symbols),
            _ => None,
        }
    }
}

#[must_use]
#[derive(Debug, Deserialize)]
#[serde(try_from = "RawPointDefinition")]
pub struct PointDefinition {
    pub name: String,
    pub data_type: DataType,

    /// Size in registers.
    pub size: u16,

    pub scale_factor: Option<ScaleFactor>,

    /// Unit, never empty.
    pub units: Option<String>,

    pub label: Option<String>,
    pub description: Option<String>,
    pub kind: PointKind,
}

#[derive(Deserialize)]
struct RawPointDefinition {
    name: String,

    #[serde(rename = "type")]
    data_type: DataType,

    #[serde(default)]
    size: Option<u16>,

    #[serde(default)]
    sf: Option<ScaleFactor>,

    #[serde(default)]
    units: Option<String>,

    #[serde(default)]
    label: Option<String>,

    #[serde(default)]
    desc: Option<String>,

    #[serde(default)]
    symbols: Vec<Symbol>,
}

impl TryFrom<RawPointDefinition> for PointDefinition {
    type Error = DefinitionError;

    fn try_from(raw: RawPointDefinition) -> Result<Self, Self::Error> {
        let size = raw
            .data_type
            .fixed_size()
            .or(raw.size)
            .ok_or_else(|| DefinitionError::MissingSize(raw.name.clone()))?;
        // Only `enum16` and `bitfield32` points render through their symbols.
        let kind = match raw.data_type {
            DataType::Enum16 => PointKind::Enum(raw.symbols),
            DataType::Bitfield32 => PointKind::Bitfield(raw.symbols),
            _ => PointKind::Scalar,
        };
        Ok(Self {
            name: raw.name,
            data_type: raw.data_type,
            size,
            scale_factor: raw.sf,
            units: raw.units.filter(|units| !units.is_empty()),
            label: raw.label,
            description: raw.desc,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_definition_ok() -> Result<(), DefinitionError> {
        // language=json
        let json = r#"{
            "name": "W",
            "type": "int16",
            "sf": "W_SF",
            "units": "W",
            "label": "Watts",
            "desc": "AC Power",
            "mandatory": "M"
        }"#;
        let point: PointDefinition = serde_json::from_str(json)?;
        assert_eq!(point.data_type, DataType::Int16);
        assert_eq!(point.size, 1);
        assert_eq!(point.scale_factor, Some(ScaleFactor::Point("W_SF".to_string())));
        assert_eq!(point.units.as_deref(), Some("W"));
        assert_eq!(point.kind, PointKind::Scalar);
        Ok(())
    }

    #[test]
    fn enum_kind_is_resolved_once_ok() -> Result<(), DefinitionError> {
        // language=json
        let json = r#"{
            "name": "St",
            "type": "enum16",
            "symbols": [{"name": "OFF", "value": 1}, {"name": "MPPT", "value": 4}]
        }"#;
        let point: PointDefinition = serde_json::from_str(json)?;
        assert!(point.kind.is_symbolic());
        assert_eq!(point.kind.symbols().map(<[Symbol]>::len), Some(2));
        Ok(())
    }

    #[test]
    fn empty_units_are_none_ok() -> Result<(), DefinitionError> {
        let point: PointDefinition =
            serde_json::from_str(r#"{"name": "N", "type": "count", "units": ""}"#)?;
        assert_eq!(point.units, None);
        Ok(())
    }

    #[test]
    fn string_without_size_fails() {
        let json = r#"{"name": "Mn", "type": "string"}"#;
        assert!(serde_json::from_str::<PointDefinition>(json).is_err());
    }

    #[test]
    fn fixed_scale_factor_ok() -> Result<(), DefinitionError> {
        let point: PointDefinition =
            serde_json::from_str(r#"{"name": "V", "type": "uint16", "sf": -1, "units": "V"}"#)?;
        assert_eq!(point.scale_factor, Some(ScaleFactor::Fixed(-1)));
        Ok(())
    }
}
