//! Connection Orchestrator
//!
//! Drives one admitted device from its radio address to a subscribed
//! telemetry stream, rolling the admission back if a fatal step fails.

use crate::domain::errors::ConnectError;
use crate::domain::models::ConnectionState;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::radio::{
    RadioAdapter, RadioCharacteristic, RadioDevice, RadioService,
};
use crate::infrastructure::bluetooth::registry::SessionRegistry;
use crate::infrastructure::bluetooth::subscription::{SubscriptionManager, ValueReceiver};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Service carrying the telemetry characteristic
    pub service_uuid: Uuid,
    /// Enable-notify writes before giving up on a subscription
    pub notify_max_attempts: u32,
    /// Delay between enable-notify writes in milliseconds
    pub notify_retry_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            service_uuid: protocol::TELEMETRY_SERVICE_UUID,
            notify_max_attempts: 1,
            notify_retry_delay_ms: 500,
        }
    }
}

/// A device that completed the connect sequence
pub struct ConnectedSession {
    pub name: String,
    pub device: Arc<dyn RadioDevice>,
    /// Present only if notifications were armed
    pub values: Option<ValueReceiver>,
    /// Signalled by the device on link loss
    pub disconnected: mpsc::UnboundedReceiver<()>,
}

/// Connect sequence runner
pub struct ConnectionOrchestrator {
    adapter: Arc<dyn RadioAdapter>,
    registry: Arc<SessionRegistry>,
    subscriptions: SubscriptionManager,
    config: ConnectionConfig,
}

impl ConnectionOrchestrator {
    pub fn new(
        adapter: Arc<dyn RadioAdapter>,
        registry: Arc<SessionRegistry>,
        config: ConnectionConfig,
    ) -> Self {
        let subscriptions = SubscriptionManager::new(
            config.notify_max_attempts,
            Duration::from_millis(config.notify_retry_delay_ms),
        );
        Self {
            adapter,
            registry,
            subscriptions,
            config,
        }
    }

    /// Connect the admitted session `name` at `address`.
    ///
    /// On error the registry entry is gone when this returns, so the next
    /// advertisement for `name` starts over.
    pub async fn connect(
        &self,
        name: &str,
        address: u64,
    ) -> Result<ConnectedSession, ConnectError> {
        info!("Connecting to {} at {:#X}", name, address);

        match self.run_steps(name, address).await {
            Ok(session) => Ok(session),
            Err(e) => {
                self.registry.remove(name);
                warn!("Connection to {} rolled back: {}", name, e);
                Err(e)
            }
        }
    }

    async fn run_steps(&self, name: &str, address: u64) -> Result<ConnectedSession, ConnectError> {
        // Step 1: Resolve the device handle
        let device = self
            .adapter
            .resolve_by_address(address)
            .await
            .map_err(|e| ConnectError::AddressResolutionFailed {
                name: name.to_string(),
                address,
                reason: format!("{:#}", e),
            })?;

        // Step 2: Locate the telemetry service
        let service = self.find_service(name, device.as_ref()).await?;
        self.registry.set_state(name, ConnectionState::ServiceBound);
        info!("Found telemetry service on {}", name);

        // Step 3: Keep the link up while idle
        service.set_persistent(true);

        // Step 4: Select the notifying characteristic
        // Step 5: Arm notifications. Failure leaves the session connected but silent.
        let values = match self.find_notify_characteristic(name, service.as_ref()).await {
            Some(characteristic) => {
                let subscribed = self
                    .subscriptions
                    .enable_notifications(characteristic.as_ref())
                    .await;
                match subscribed {
                    Ok(values) => {
                        self.registry.attach_subscription(name, characteristic);
                        Some(values)
                    }
                    Err(e) => {
                        warn!("{}: {}. Device will stay connected without data.", name, e);
                        None
                    }
                }
            }
            None => None,
        };

        // Step 6: Observe involuntary link loss. Failure here is fatal.
        let (disconnect_tx, disconnected) = mpsc::unbounded_channel();
        if let Err(e) = device.subscribe_disconnect(disconnect_tx) {
            device.close();
            return Err(ConnectError::LinkWatchFailed {
                name: name.to_string(),
                reason: format!("{:#}", e),
            });
        }

        self.registry.set_state(name, ConnectionState::Active);
        info!("{} is active", name);

        Ok(ConnectedSession {
            name: name.to_string(),
            device,
            values,
            disconnected,
        })
    }

    async fn find_service(
        &self,
        name: &str,
        device: &dyn RadioDevice,
    ) -> Result<Arc<dyn RadioService>, ConnectError> {
        let unavailable = |reason: String| ConnectError::ServiceUnavailable {
            name: name.to_string(),
            reason,
        };

        let services = device
            .get_services()
            .await
            .map_err(|e| unavailable(format!("{:#}", e)))?;
        info!("Found {} services on {}", services.len(), name);

        services
            .into_iter()
            .find(|s| s.uuid() == self.config.service_uuid)
            .ok_or_else(|| unavailable(format!("service {} not found", self.config.service_uuid)))
    }

    /// First characteristic advertising notify, in enumeration order
    async fn find_notify_characteristic(
        &self,
        name: &str,
        service: &dyn RadioService,
    ) -> Option<Arc<dyn RadioCharacteristic>> {
        let characteristics = match service.get_characteristics().await {
            Ok(characteristics) => characteristics,
            Err(e) => {
                warn!("Failed to get characteristics of {}: {:#}", name, e);
                return None;
            }
        };
        info!("Found {} characteristics", characteristics.len());

        let found = characteristics.into_iter().find(|c| c.supports_notify());
        if found.is_none() {
            warn!("{} exposes no notifying characteristic", name);
        }
        found
    }
}
