use std::io;

/// Failure talking to a device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport, handshake or protocol failure other than a timeout.
    #[error("connection error: {0}")]
    Connection(String),

    /// A connect or read exceeded its deadline.
    #[error("connection timed out: {0}")]
    Timeout(String),

    /// The device does not advertise the requested model.
    #[error("model {0} is not available on the device")]
    ModelNotFound(u16),
}

impl DeviceError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<io::Error> for DeviceError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::TimedOut {
            Self::Timeout(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

impl From<tokio_modbus::Error> for DeviceError {
    fn from(error: tokio_modbus::Error) -> Self {
        match error {
            tokio_modbus::Error::Transport(error) => error.into(),
            other => Self::Connection(other.to_string()),
        }
    }
}

impl From<tokio_modbus::ExceptionCode> for DeviceError {
    fn from(code: tokio_modbus::ExceptionCode) -> Self {
        Self::Connection(format!("device responded with exception {code}"))
    }
}
