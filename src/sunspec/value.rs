use std::net::{Ipv4Addr, Ipv6Addr};

use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::sunspec::DataType;

/// Point value as stored in the registers.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Decode the point registers, `None` for the "not implemented" sentinels.
    ///
    /// Accumulators have no sentinel: zero is a reading.
    #[must_use]
    pub fn decode(data_type: DataType, words: &[u16]) -> Option<Self> {
        match data_type {
            DataType::Int16 | DataType::Sunssf => {
                let value = i16::from_be_bytes(words[0].to_be_bytes());
                (value != i16::MIN).then(|| Self::Signed(value.into()))
            }
            DataType::Uint16 | DataType::Count | DataType::Enum16 | DataType::Bitfield16 => {
                (words[0] != u16::MAX).then(|| Self::Unsigned(words[0].into()))
            }
            DataType::Acc16 => Some(Self::Unsigned(words[0].into())),
            DataType::Pad => None,
            DataType::Int32 => {
                let value = i32::from_be_bytes(bytes(words));
                (value != i32::MIN).then(|| Self::Signed(value.into()))
            }
            DataType::Uint32 | DataType::Enum32 | DataType::Bitfield32 => {
                let value = u32::from_be_bytes(bytes(words));
                (value != u32::MAX).then(|| Self::Unsigned(value.into()))
            }
            DataType::Acc32 => Some(Self::Unsigned(u32::from_be_bytes(bytes(words)).into())),
            DataType::Ipaddr => {
                let address = Ipv4Addr::from(bytes::<4>(words));
                (!address.is_unspecified()).then(|| Self::Text(address.to_string()))
            }
            DataType::Float32 => {
                let value = f32::from_be_bytes(bytes(words));
                (!value.is_nan()).then(|| Self::Float(value.into()))
            }
            DataType::Int64 => {
                let value = i64::from_be_bytes(bytes(words));
                (value != i64::MIN).then_some(Self::Signed(value))
            }
            DataType::Uint64 => {
                let value = u64::from_be_bytes(bytes(words));
                (value != u64::MAX).then_some(Self::Unsigned(value))
            }
            DataType::Acc64 => Some(Self::Unsigned(u64::from_be_bytes(bytes(words)))),
            DataType::Float64 => {
                let value = f64::from_be_bytes(bytes(words));
                (!value.is_nan()).then_some(Self::Float(value))
            }
            DataType::Eui48 => {
                // The leading register is reserved.
                let bytes = words[1..].iter().flat_map(|word| word.to_be_bytes()).collect_vec();
                bytes.iter().any(|byte| *byte != 0).then(|| {
                    Self::Text(bytes.iter().map(|byte| format!("{byte:02X}")).join(":"))
                })
            }
            DataType::Ipv6addr => {
                let address = Ipv6Addr::from(bytes::<16>(words));
                (!address.is_unspecified()).then(|| Self::Text(address.to_string()))
            }
            DataType::Text => {
                let bytes = words.iter().flat_map(|word| word.to_be_bytes()).collect_vec();
                let text = String::from_utf8_lossy(&bytes);
                let text = text.trim_end_matches('\0').trim_end();
                (!text.is_empty()).then(|| Self::Text(text.to_string()))
            }
        }
    }
}

/// Big-endian bytes of the leading registers.
fn bytes<const N: usize>(words: &[u16]) -> [u8; N] {
    let mut bytes = [0; N];
    for (chunk, word) in bytes.chunks_exact_mut(2).zip(words) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    bytes
}

/// Point value with the scale factor applied.
#[derive(Clone, Debug, Display, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_f64() == Some(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int16_ok() {
        assert_eq!(RawValue::decode(DataType::Int16, &[0xFFFE]), Some(RawValue::Signed(-2)));
        assert_eq!(RawValue::decode(DataType::Int16, &[0x8000]), None);
    }

    #[test]
    fn uint32_ok() {
        assert_eq!(
            RawValue::decode(DataType::Uint32, &[0x0001, 0x0002]),
            Some(RawValue::Unsigned(65538)),
        );
        assert_eq!(RawValue::decode(DataType::Uint32, &[0xFFFF, 0xFFFF]), None);
    }

    #[test]
    fn int32_ok() {
        assert_eq!(
            RawValue::decode(DataType::Int32, &[0xFFFF, 0xFFFF]),
            Some(RawValue::Signed(-1)),
        );
        assert_eq!(RawValue::decode(DataType::Int32, &[0x8000, 0x0000]), None);
    }

    #[test]
    fn accumulator_zero_ok() {
        assert_eq!(RawValue::decode(DataType::Acc32, &[0, 0]), Some(RawValue::Unsigned(0)));
        assert_eq!(RawValue::decode(DataType::Acc32, &[0, 7]), Some(RawValue::Unsigned(7)));
        assert_eq!(RawValue::decode(DataType::Acc16, &[0]), Some(RawValue::Unsigned(0)));
        assert_eq!(RawValue::decode(DataType::Acc64, &[0; 4]), Some(RawValue::Unsigned(0)));
    }

    #[test]
    fn float32_ok() {
        assert_eq!(
            RawValue::decode(DataType::Float32, &[0x3FC0, 0x0000]),
            Some(RawValue::Float(1.5)),
        );
        assert_eq!(RawValue::decode(DataType::Float32, &[0x7FC0, 0x0000]), None);
    }

    #[test]
    fn text_ok() {
        let words = [u16::from_be_bytes(*b"Su"), u16::from_be_bytes(*b"n\0"), 0, 0];
        assert_eq!(RawValue::decode(DataType::Text, &words), Some(RawValue::Text("Sun".into())));
        assert_eq!(RawValue::decode(DataType::Text, &[0, 0]), None);
    }

    #[test]
    fn ipaddr_ok() {
        assert_eq!(
            RawValue::decode(DataType::Ipaddr, &[0xC0A8, 0x0102]),
            Some(RawValue::Text("192.168.1.2".into())),
        );
    }

    #[test]
    fn eui48_ok() {
        assert_eq!(
            RawValue::decode(DataType::Eui48, &[0, 0x0011, 0x2233, 0x4455]),
            Some(RawValue::Text("00:11:22:33:44:55".into())),
        );
    }

    #[test]
    fn value_display_ok() {
        assert_eq!(Value::Integer(9800).to_string(), "9800");
        assert_eq!(Value::Text("SunSpecTest".into()).to_string(), "SunSpecTest");
    }
}
