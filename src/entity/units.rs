use derive_more::Display;

pub const ICON_DEFAULT: &str = "mdi:information-outline";
pub const ICON_AC_AMPS: &str = "mdi:current-ac";
pub const ICON_DC_AMPS: &str = "mdi:current-dc";
const ICON_VOLT: &str = "mdi:lightning-bolt";
const ICON_POWER: &str = "mdi:solar-power";
const ICON_FREQ: &str = "mdi:sine-wave";
const ICON_ENERGY: &str = "mdi:solar-panel";
const ICON_TEMP: &str = "mdi:thermometer";

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum DeviceClass {
    #[display("current")]
    Current,

    #[display("voltage")]
    Voltage,

    #[display("power")]
    Power,

    #[display("energy")]
    Energy,

    #[display("temperature")]
    Temperature,

    #[display("enum")]
    Enum,
}

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum StateClass {
    #[display("measurement")]
    Measurement,

    #[display("total_increasing")]
    TotalIncreasing,
}

/// Display unit, icon and device class of a SunSpec unit.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnitMeta {
    pub unit: &'static str,
    pub icon: &'static str,
    pub device_class: Option<DeviceClass>,
}

impl UnitMeta {
    const fn new(
        unit: &'static str,
        icon: &'static str,
        device_class: Option<DeviceClass>,
    ) -> Self {
        Self { unit, icon, device_class }
    }

    /// Metadata of a known SunSpec unit.
    #[must_use]
    pub fn lookup(sunspec_unit: &str) -> Option<Self> {
        let meta = match sunspec_unit {
            "A" => Self::new("A", ICON_AC_AMPS, Some(DeviceClass::Current)),
            "HPa" => Self::new("hPa", ICON_DEFAULT, None),
            "Hz" => Self::new("Hz", ICON_FREQ, None),
            "Mbps" => Self::new("Mbit/s", ICON_DEFAULT, None),
            "V" => Self::new("V", ICON_VOLT, Some(DeviceClass::Voltage)),
            "VA" => Self::new("VA", ICON_POWER, None),
            "VAr" | "var" => Self::new("var", ICON_POWER, None),
            "W" => Self::new("W", ICON_POWER, Some(DeviceClass::Power)),
            "W/m2" => Self::new("W/m²", ICON_DEFAULT, None),
            "Wh" | "WH" => Self::new("Wh", ICON_ENERGY, Some(DeviceClass::Energy)),
            "bps" => Self::new("bit/s", ICON_DEFAULT, None),
            "deg" | "Degrees" => Self::new("°", ICON_TEMP, Some(DeviceClass::Temperature)),
            "C" => Self::new("°C", ICON_TEMP, Some(DeviceClass::Temperature)),
            "kWh" => Self::new("kWh", ICON_ENERGY, Some(DeviceClass::Energy)),
            "m/s" => Self::new("m/s", ICON_DEFAULT, None),
            "mSecs" => Self::new("ms", ICON_DEFAULT, None),
            "meters" => Self::new("m", ICON_DEFAULT, None),
            "mm" => Self::new("mm", ICON_DEFAULT, None),
            "%" | "Pct" => Self::new("%", ICON_DEFAULT, None),
            "Secs" => Self::new("s", ICON_DEFAULT, None),
            _ => return None,
        };
        Some(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ok() {
        let meta = UnitMeta::lookup("Wh").unwrap();
        assert_eq!(meta.device_class, Some(DeviceClass::Energy));
        assert_eq!(meta.icon, ICON_ENERGY);
        assert_eq!(UnitMeta::lookup("C").unwrap().unit, "°C");
        assert_eq!(UnitMeta::lookup("Pct").unwrap().unit, "%");
        assert!(UnitMeta::lookup("furlongs").is_none());
    }

    #[test]
    fn display_ok() {
        assert_eq!(DeviceClass::Energy.to_string(), "energy");
        assert_eq!(StateClass::TotalIncreasing.to_string(), "total_increasing");
    }
}
