use std::fmt::{Display, Formatter};

use tokio_modbus::SlaveId;
use url::Host;

use crate::prelude::*;

/// Modbus unit connection endpoint, the identity of a physical device.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Endpoint {
    pub host: Host,
    pub port: u16,
    pub unit_id: SlaveId,
}

impl Endpoint {
    pub const DEFAULT_PORT: u16 = 502;

    /// Parse the host so that equal addresses spelled differently share an identity.
    pub fn try_new(host: &str, port: u16, unit_id: SlaveId) -> Result<Self> {
        let host =
            Host::parse(host.trim()).with_context(|| format!("`{host}` is an invalid host"))?;
        Ok(Self { host, port, unit_id })
    }

    /// Title used for configuration entries and unique ids.
    #[must_use]
    pub fn title(&self) -> String {
        format!("{}:{}:{}", self.host, self.port, self.unit_id)
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_hosts_ok() -> Result {
        assert_eq!(
            Endpoint::try_new("Inverter.LAN", 502, 1)?,
            Endpoint::try_new("inverter.lan", 502, 1)?,
        );
        assert_eq!(
            Endpoint::try_new(" 192.168.1.10", 502, 1)?,
            Endpoint::try_new("192.168.1.10", 502, 1)?,
        );
        Ok(())
    }

    #[test]
    fn different_units_ok() -> Result {
        assert_ne!(
            Endpoint::try_new("192.168.1.10", 502, 1)?,
            Endpoint::try_new("192.168.1.10", 502, 2)?,
        );
        Ok(())
    }

    #[test]
    fn title_ok() -> Result {
        assert_eq!(Endpoint::try_new("192.168.1.10", 1502, 3)?.title(), "192.168.1.10:1502:3");
        Ok(())
    }
}
