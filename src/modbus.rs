//! Modbus TCP plumbing: device identity, connection cache and transports.
//!
//! The wire protocol itself is handled by `tokio-modbus`, this module only adds the
//! seams the rest of the crate needs to talk to a device and to swap it in tests.

mod endpoint;
mod error;
#[cfg(test)]
pub mod fake;
mod pool;
mod tcp;

use std::time::Duration;

use async_trait::async_trait;

pub use self::{
    endpoint::Endpoint,
    error::DeviceError,
    pool::{ConnectionCache, Shared},
    tcp::TcpConnector,
};

/// Modbus allows at most 125 holding registers per request.
pub const MAX_REGISTERS_PER_READ: u16 = 125;

/// Opens transports to a device.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Self::Transport, DeviceError>;
}

/// An open register-level channel to a single unit.
#[async_trait]
pub trait Transport: Send {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError>;

    fn is_connected(&self) -> bool;

    /// Best-effort close, errors are only logged.
    async fn close(&mut self);

    /// Read a register range of any length by splitting it into protocol-sized chunks.
    async fn read_range(&mut self, address: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        let mut words = Vec::with_capacity(usize::from(count));
        let mut offset = 0;
        while offset < count {
            let chunk = (count - offset).min(MAX_REGISTERS_PER_READ);
            let start = address.checked_add(offset).ok_or_else(|| {
                DeviceError::connection(format!("register range overflows at #{address}+{offset}"))
            })?;
            let read = self.read_holding_registers(start, chunk).await?;
            if read.len() != usize::from(chunk) {
                return Err(DeviceError::connection(format!(
                    "read {} registers at #{start} while expected {chunk}",
                    read.len(),
                )));
            }
            words.extend(read);
            offset += chunk;
        }
        Ok(words)
    }
}
