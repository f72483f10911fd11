use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use itertools::Itertools;
use tokio::{
    net::{TcpStream, lookup_host},
    time::timeout,
};
use tokio_modbus::{
    Slave,
    client::{Client, Context, Reader, tcp::attach_slave},
};
use url::Host;

use crate::{
    modbus::{Connector, DeviceError, Endpoint, Transport},
    prelude::*,
};

/// Opens Modbus TCP transports after checking that the port accepts connections.
#[derive(Copy, Clone)]
pub struct TcpConnector {
    port_check_timeout: Duration,
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self { port_check_timeout: Self::PORT_CHECK_TIMEOUT }
    }
}

impl TcpConnector {
    const PORT_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

    async fn resolve(endpoint: &Endpoint) -> Result<Vec<SocketAddr>, DeviceError> {
        let port = endpoint.port;
        let addresses = match &endpoint.host {
            Host::Domain(domain) => lookup_host((domain.as_str(), port)).await?.collect_vec(),
            Host::Ipv4(ip_address) => lookup_host((*ip_address, port)).await?.collect_vec(),
            Host::Ipv6(ip_address) => lookup_host((*ip_address, port)).await?.collect_vec(),
        };
        if addresses.is_empty() {
            return Err(DeviceError::connection(format!("`{}` resolved to nothing", endpoint.host)));
        }
        Ok(addresses)
    }

    /// Check that the port is open before attempting the protocol-level connect.
    #[instrument(skip_all, level = "debug")]
    async fn check_port(&self, addresses: &[SocketAddr]) -> bool {
        debug!(timeout = ?self.port_check_timeout, "checking the port…");
        match timeout(self.port_check_timeout, TcpStream::connect(addresses)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                debug!("port is open");
                true
            }
            Ok(Err(error)) => {
                debug!("port is not available: {error:#}");
                false
            }
            Err(_) => {
                debug!("port check timed out");
                false
            }
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    #[instrument(
        skip_all,
        fields(host = %endpoint.host, port = endpoint.port, unit_id = endpoint.unit_id),
    )]
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout_duration: Duration,
    ) -> Result<TcpTransport, DeviceError> {
        let addresses = Self::resolve(endpoint).await?;
        if !self.check_port(&addresses).await {
            return Err(DeviceError::connection(format!(
                "device is not active on {}:{}",
                endpoint.host, endpoint.port,
            )));
        }
        info!(timeout = ?timeout_duration, "connecting…");
        let stream = timeout(timeout_duration, TcpStream::connect(&*addresses))
            .await
            .map_err(|_| DeviceError::timeout(format!("connecting to {endpoint}")))??;
        stream.set_nodelay(true)?;
        info!("connected");
        Ok(TcpTransport {
            context: Some(attach_slave(stream, Slave(endpoint.unit_id))),
            read_timeout: timeout_duration,
        })
    }
}

pub struct TcpTransport {
    context: Option<Context>,
    read_timeout: Duration,
}

#[async_trait]
impl Transport for TcpTransport {
    #[instrument(skip_all, level = "trace", fields(address = address, count = count))]
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        let context =
            self.context.as_mut().ok_or_else(|| DeviceError::connection("transport is closed"))?;
        let response =
            timeout(self.read_timeout, context.read_holding_registers(address, count)).await;
        match response {
            Ok(Ok(Ok(words))) => Ok(words),
            // Exception responses leave the stream in sync.
            Ok(Ok(Err(exception_code))) => Err(exception_code.into()),
            Ok(Err(error)) => {
                self.context = None;
                Err(error.into())
            }
            Err(_) => {
                self.context = None;
                Err(DeviceError::timeout(format!("reading {count} registers at #{address}")))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.context.is_some()
    }

    async fn close(&mut self) {
        if let Some(mut context) = self.context.take() {
            match context.disconnect().await {
                Ok(()) => debug!("disconnected"),
                Err(error) => warn!("failed to disconnect cleanly: {error:#}"),
            }
        }
    }
}
