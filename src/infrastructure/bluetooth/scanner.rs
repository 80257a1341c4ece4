//! Glove Scanner
//!
//! Composition root of the radio core. Receives advertisements, admits the
//! expected glove through the [`SessionRegistry`], runs one connect sequence
//! per admitted device and republishes lifecycle and telemetry events.

use crate::domain::models::{Advertisement, ConnectionState, GloveEvent};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::connection::{ConnectionConfig, ConnectionOrchestrator};
use crate::infrastructure::bluetooth::radio::{RadioAdapter, ScanControl};
use crate::infrastructure::bluetooth::registry::SessionRegistry;
use crate::infrastructure::bluetooth::session::SessionStream;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Advertisements with any other name are ignored
    pub expected_device_name: String,
    /// Publish every named advertisement as [`GloveEvent::DeviceDiscovered`]
    pub report_all_advertisements: bool,
    /// Trace every notification payload before decoding
    pub raw_data_logging: bool,
    pub connection: ConnectionConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ScannerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            expected_device_name: settings.expected_device_name.clone(),
            report_all_advertisements: settings.debug_show_all_devices,
            raw_data_logging: settings.debug_raw_data_logging,
            connection: ConnectionConfig {
                service_uuid: settings.telemetry_service_uuid,
                notify_max_attempts: settings.notify_max_attempts,
                notify_retry_delay_ms: settings.notify_retry_delay_ms,
            },
        }
    }
}

pub struct Scanner {
    scan: Box<dyn ScanControl>,
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<ConnectionOrchestrator>,
    event_sender: mpsc::UnboundedSender<GloveEvent>,
    expected_device_name: String,
    report_all_advertisements: bool,
    raw_data_logging: bool,
}

impl Scanner {
    pub fn new(
        scan: Box<dyn ScanControl>,
        adapter: Arc<dyn RadioAdapter>,
        config: ScannerConfig,
        event_sender: mpsc::UnboundedSender<GloveEvent>,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let orchestrator = Arc::new(ConnectionOrchestrator::new(
            adapter,
            registry.clone(),
            config.connection,
        ));

        Self {
            scan,
            registry,
            orchestrator,
            event_sender,
            expected_device_name: config.expected_device_name,
            report_all_advertisements: config.report_all_advertisements,
            raw_data_logging: config.raw_data_logging,
        }
    }

    /// Start scanning for advertisements
    pub fn start_scan(&mut self) -> Result<()> {
        info!("Scanning for {}...", self.expected_device_name);
        self.scan.start()
    }

    /// Stop scanning. Sessions already admitted are unaffected.
    pub fn stop_scan(&mut self) -> Result<()> {
        if self.scan.is_scanning() {
            info!("Stopping scan...");
        }
        self.scan.stop()
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.is_scanning()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Names of devices whose session is streaming (or connected but silent)
    pub fn active_devices(&self) -> Vec<String> {
        self.registry.names_in_state(ConnectionState::Active)
    }

    /// Consume advertisements until the scan side closes its sender
    pub async fn run(&self, mut advertisements: mpsc::UnboundedReceiver<Advertisement>) {
        while let Some(advertisement) = advertisements.recv().await {
            self.on_advertisement(advertisement);
        }
        debug!("Advertisement stream closed");
    }

    /// Handle one advertisement.
    ///
    /// Returns the spawned session task if the advertisement was admitted;
    /// `None` if it was filtered or its name already has a session.
    pub fn on_advertisement(&self, advertisement: Advertisement) -> Option<JoinHandle<()>> {
        if self.report_all_advertisements && !advertisement.name.is_empty() {
            let _ = self
                .event_sender
                .send(GloveEvent::DeviceDiscovered(advertisement.clone()));
        }

        if advertisement.name != self.expected_device_name {
            return None;
        }

        if !self
            .registry
            .try_admit(&advertisement.name, advertisement.address)
        {
            return None;
        }

        debug!(
            "Admitted {} ({:#X}, {} dBm)",
            advertisement.name, advertisement.address, advertisement.signal_strength
        );

        let task = SessionTask {
            name: advertisement.name,
            address: advertisement.address,
            registry: self.registry.clone(),
            orchestrator: self.orchestrator.clone(),
            event_sender: self.event_sender.clone(),
            raw_data_logging: self.raw_data_logging,
        };
        Some(tokio::spawn(task.run()))
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        let _ = self.scan.stop();
    }
}

/// Lifetime of one admitted device, from connect to teardown
struct SessionTask {
    name: String,
    address: u64,
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<ConnectionOrchestrator>,
    event_sender: mpsc::UnboundedSender<GloveEvent>,
    raw_data_logging: bool,
}

impl SessionTask {
    async fn run(self) {
        let session = match self.orchestrator.connect(&self.name, self.address).await {
            Ok(session) => session,
            Err(e) => {
                debug!("Session task for {} ended before connecting: {}", self.name, e);
                return;
            }
        };

        info!("Device connected: {}", self.name);
        let _ = self
            .event_sender
            .send(GloveEvent::DeviceConnected(self.name.clone()));

        let mut stream =
            SessionStream::new(&self.name, self.event_sender.clone(), self.raw_data_logging);
        stream.run(session.values, session.disconnected).await;

        // Teardown: the next advertisement for this name starts a new session
        self.registry
            .set_state(&self.name, ConnectionState::Disconnected);
        self.registry.remove(&self.name);
        session.device.close();

        info!("Device disconnected: {}", self.name);
        let _ = self
            .event_sender
            .send(GloveEvent::DeviceDisconnected(self.name));
    }
}
