//! In-memory Modbus device for tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::modbus::{Connector, DeviceError, Endpoint, Transport};

#[derive(Copy, Clone, Debug)]
pub enum Failure {
    Timeout,
    Connection,
}

/// Shared device state. Clones observe the same registers and counters.
#[derive(Clone, Default)]
pub struct FakeDevice(Arc<State>);

#[derive(Default)]
struct State {
    registers: Mutex<HashMap<u16, u16>>,
    failures: Mutex<VecDeque<Failure>>,
    is_unreachable: AtomicBool,
    n_connects: AtomicUsize,
    n_live: AtomicUsize,
}

impl FakeDevice {
    pub fn new(registers: impl IntoIterator<Item = (u16, u16)>) -> Self {
        let device = Self::default();
        device.0.registers.lock().unwrap().extend(registers);
        device
    }

    pub fn set_register(&self, address: u16, value: u16) {
        self.0.registers.lock().unwrap().insert(address, value);
    }

    /// Make the next read fail and tear the transport down.
    pub fn fail_next_read(&self, failure: Failure) {
        self.0.failures.lock().unwrap().push_back(failure);
    }

    pub fn set_unreachable(&self, is_unreachable: bool) {
        self.0.is_unreachable.store(is_unreachable, Ordering::Relaxed);
    }

    pub fn n_connects(&self) -> usize {
        self.0.n_connects.load(Ordering::Relaxed)
    }

    /// Number of transports currently open.
    pub fn n_live(&self) -> usize {
        self.0.n_live.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Connector for FakeDevice {
    type Transport = FakeTransport;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        _timeout: Duration,
    ) -> Result<FakeTransport, DeviceError> {
        if self.0.is_unreachable.load(Ordering::Relaxed) {
            return Err(DeviceError::connection(format!("device is not active on {endpoint}")));
        }
        self.0.n_connects.fetch_add(1, Ordering::Relaxed);
        self.0.n_live.fetch_add(1, Ordering::Relaxed);
        Ok(FakeTransport { state: self.0.clone(), is_open: true })
    }
}

pub struct FakeTransport {
    state: Arc<State>,
    is_open: bool,
}

impl FakeTransport {
    fn release(&mut self) {
        if self.is_open {
            self.is_open = false;
            self.state.n_live.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl Drop for FakeTransport {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceError> {
        if !self.is_open {
            return Err(DeviceError::connection("transport is closed"));
        }
        let failure = self.state.failures.lock().unwrap().pop_front();
        if let Some(failure) = failure {
            self.release();
            return Err(match failure {
                Failure::Timeout => DeviceError::timeout("injected timeout"),
                Failure::Connection => DeviceError::connection("injected failure"),
            });
        }
        let registers = self.state.registers.lock().unwrap();
        (address..address.saturating_add(count))
            .map(|address| {
                registers.get(&address).copied().ok_or_else(|| {
                    DeviceError::connection(format!("illegal data address #{address}"))
                })
            })
            .collect()
    }

    fn is_connected(&self) -> bool {
        self.is_open
    }

    async fn close(&mut self) {
        self.release();
    }
}

/// Builds a SunSpec register map starting at the conventional base address.
pub struct RegisterImage {
    base: u16,
    words: Vec<u16>,
}

impl Default for RegisterImage {
    fn default() -> Self {
        Self::at(40000)
    }
}

impl RegisterImage {
    pub fn at(base: u16) -> Self {
        Self { base, words: vec![0x5375, 0x6E53] }
    }

    /// Append a model block: id, length, then the body.
    pub fn model(mut self, id: u16, body: Words) -> Self {
        self.words.push(id);
        self.words.push(u16::try_from(body.0.len()).unwrap());
        self.words.extend(body.0);
        self
    }

    pub fn build(mut self) -> FakeDevice {
        self.words.extend([0xFFFF, 0]);
        FakeDevice::new((self.base..).zip(self.words))
    }
}

/// Register body builder.
#[derive(Default)]
pub struct Words(pub Vec<u16>);

impl Words {
    pub fn u16(mut self, value: u16) -> Self {
        self.0.push(value);
        self
    }

    #[expect(clippy::cast_sign_loss)]
    pub fn i16(self, value: i16) -> Self {
        self.u16(value as u16)
    }

    #[expect(clippy::cast_possible_truncation)]
    pub fn u32(self, value: u32) -> Self {
        self.u16((value >> 16) as u16).u16(value as u16)
    }

    pub fn string(mut self, value: &str, n_registers: usize) -> Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.resize(n_registers * 2, 0);
        self.0.extend(bytes.chunks(2).map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]])));
        self
    }

    pub fn extend(mut self, words: &[u16]) -> Self {
        self.0.extend_from_slice(words);
        self
    }

    pub fn zeros(mut self, n_registers: usize) -> Self {
        self.0.extend(std::iter::repeat_n(0, n_registers));
        self
    }
}
