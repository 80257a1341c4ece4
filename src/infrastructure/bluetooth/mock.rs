//! In-memory radio for unit testing

use super::radio::{
    DisconnectSender, RadioAdapter, RadioCharacteristic, RadioDevice, RadioService, ScanControl,
    ValueSender,
};
use crate::infrastructure::bluetooth::protocol::TELEMETRY_SERVICE_UUID;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Scan control that only records start/stop calls
#[derive(Clone, Default)]
pub struct MockScanControl {
    scanning: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl MockScanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl ScanControl for MockScanControl {
    fn start(&mut self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.scanning.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.scanning.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }
}

pub struct MockCharacteristic {
    uuid: Uuid,
    notify: bool,
    /// Number of enable attempts that fail before one succeeds
    failures: AtomicU32,
    enable_calls: AtomicU32,
    /// Pushed from inside `enable_notify`, like a device streaming right away
    frame_on_enable: Mutex<Option<Vec<u8>>>,
    sink: Mutex<Option<ValueSender>>,
}

impl MockCharacteristic {
    fn new(uuid: Uuid, notify: bool) -> Self {
        Self {
            uuid,
            notify,
            failures: AtomicU32::new(0),
            enable_calls: AtomicU32::new(0),
            frame_on_enable: Mutex::new(None),
            sink: Mutex::new(None),
        }
    }

    pub fn notifying() -> Self {
        Self::new(Uuid::from_u128(0xA1), true)
    }

    pub fn read_only() -> Self {
        Self::new(Uuid::from_u128(0xA0), false)
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn failing(self, failures: u32) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn with_frame_on_enable(self, frame: Vec<u8>) -> Self {
        *self.frame_on_enable.lock().unwrap() = Some(frame);
        self
    }

    pub fn enable_calls(&self) -> u32 {
        self.enable_calls.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    /// Deliver a notification payload. False if nobody is listening.
    pub fn push(&self, bytes: Vec<u8>) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.send(bytes).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl RadioCharacteristic for MockCharacteristic {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn supports_notify(&self) -> bool {
        self.notify
    }

    fn subscribe_values(&self, sink: ValueSender) -> Result<()> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn enable_notify(&self) -> Result<()> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("GATT write failed: Unreachable");
        }

        if let Some(frame) = self.frame_on_enable.lock().unwrap().take() {
            self.push(frame);
        }
        Ok(())
    }
}

pub struct MockService {
    uuid: Uuid,
    persistent: AtomicBool,
    characteristics: Vec<Arc<MockCharacteristic>>,
    fail_characteristics: bool,
}

impl MockService {
    pub fn new(uuid: Uuid, characteristics: Vec<Arc<MockCharacteristic>>) -> Self {
        Self {
            uuid,
            persistent: AtomicBool::new(false),
            characteristics,
            fail_characteristics: false,
        }
    }

    /// Telemetry service with the given characteristics
    pub fn telemetry(characteristics: Vec<Arc<MockCharacteristic>>) -> Self {
        Self::new(TELEMETRY_SERVICE_UUID, characteristics)
    }

    pub fn failing_characteristics(mut self) -> Self {
        self.fail_characteristics = true;
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RadioService for MockService {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn set_persistent(&self, persistent: bool) {
        self.persistent.store(persistent, Ordering::SeqCst);
    }

    async fn get_characteristics(&self) -> Result<Vec<Arc<dyn RadioCharacteristic>>> {
        if self.fail_characteristics {
            anyhow::bail!("Failed to get characteristics");
        }
        Ok(self
            .characteristics
            .iter()
            .map(|c| c.clone() as Arc<dyn RadioCharacteristic>)
            .collect())
    }
}

pub struct MockDevice {
    address: u64,
    services: Vec<Arc<MockService>>,
    fail_services: bool,
    fail_link_watch: bool,
    disconnect: Mutex<Option<DisconnectSender>>,
    closed: AtomicBool,
}

impl MockDevice {
    pub fn new(address: u64, services: Vec<Arc<MockService>>) -> Self {
        Self {
            address,
            services,
            fail_services: false,
            fail_link_watch: false,
            disconnect: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Device whose GATT service query reports a failure status
    pub fn unreachable(address: u64) -> Self {
        let mut device = Self::new(address, Vec::new());
        device.fail_services = true;
        device
    }

    /// Refuse the connection status handler
    pub fn without_link_watch(mut self) -> Self {
        self.fail_link_watch = true;
        self
    }

    /// Simulate involuntary link loss
    pub fn drop_link(&self) -> bool {
        match self.disconnect.lock().unwrap().as_ref() {
            Some(sink) => sink.send(()).is_ok(),
            None => false,
        }
    }

    pub fn has_disconnect_handler(&self) -> bool {
        self.disconnect.lock().unwrap().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RadioDevice for MockDevice {
    fn address(&self) -> u64 {
        self.address
    }

    async fn get_services(&self) -> Result<Vec<Arc<dyn RadioService>>> {
        if self.fail_services {
            anyhow::bail!("Failed to get GATT services: Unreachable");
        }
        Ok(self
            .services
            .iter()
            .map(|s| s.clone() as Arc<dyn RadioService>)
            .collect())
    }

    fn subscribe_disconnect(&self, sink: DisconnectSender) -> Result<()> {
        if self.fail_link_watch {
            drop(sink);
            anyhow::bail!("ConnectionStatusChanged registration failed");
        }
        *self.disconnect.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Adapter resolving addresses to registered mock devices
#[derive(Default)]
pub struct MockAdapter {
    devices: Mutex<HashMap<u64, Arc<MockDevice>>>,
    resolve_calls: AtomicUsize,
    resolve_delay: Option<Duration>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every resolve waits `delay` before answering
    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    pub fn add_device(&self, device: Arc<MockDevice>) {
        self.devices.lock().unwrap().insert(device.address, device);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RadioAdapter for MockAdapter {
    async fn resolve_by_address(&self, address: u64) -> Result<Arc<dyn RadioDevice>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }

        let device = self.devices.lock().unwrap().get(&address).cloned();
        match device {
            Some(device) => Ok(device as Arc<dyn RadioDevice>),
            None => anyhow::bail!("No device at {:#X}", address),
        }
    }
}

/// A healthy glove: telemetry service with one read-only and one notifying characteristic
pub fn glove(address: u64) -> (Arc<MockDevice>, Arc<MockService>, Arc<MockCharacteristic>) {
    let data = Arc::new(MockCharacteristic::notifying());
    let service = Arc::new(MockService::telemetry(vec![
        Arc::new(MockCharacteristic::read_only()),
        data.clone(),
    ]));
    let device = Arc::new(MockDevice::new(address, vec![service.clone()]));
    (device, service, data)
}
