//! Radio Collaborator Interfaces
//!
//! The core never talks to a platform Bluetooth stack directly. It consumes
//! these traits, implemented by the Windows backend and by the test radio.

use crate::domain::models::Advertisement;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sink receiving advertisements while a scan is active
pub type AdvertisementSender = mpsc::UnboundedSender<Advertisement>;

/// Sink receiving raw notification payloads
pub type ValueSender = mpsc::UnboundedSender<Vec<u8>>;

/// Sink signalled once when the link is lost
pub type DisconnectSender = mpsc::UnboundedSender<()>;

/// Starts and stops advertisement scanning.
///
/// Implementations push every advertisement they observe into the
/// [`AdvertisementSender`] they were built with. Delivery is unordered and
/// may repeat the same device any number of times.
pub trait ScanControl: Send {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn is_scanning(&self) -> bool;
}

/// Resolves radio addresses into live device handles
#[async_trait]
pub trait RadioAdapter: Send + Sync {
    async fn resolve_by_address(&self, address: u64) -> Result<Arc<dyn RadioDevice>>;
}

#[async_trait]
pub trait RadioDevice: Send + Sync {
    fn address(&self) -> u64;

    async fn get_services(&self) -> Result<Vec<Arc<dyn RadioService>>>;

    /// Register `sink` to be signalled on involuntary link loss
    fn subscribe_disconnect(&self, sink: DisconnectSender) -> Result<()>;

    /// Release the platform handle
    fn close(&self);
}

#[async_trait]
pub trait RadioService: Send + Sync {
    fn uuid(&self) -> Uuid;

    /// Keep the link up while idle
    fn set_persistent(&self, persistent: bool);

    async fn get_characteristics(&self) -> Result<Vec<Arc<dyn RadioCharacteristic>>>;
}

#[async_trait]
pub trait RadioCharacteristic: Send + Sync {
    fn uuid(&self) -> Uuid;

    fn supports_notify(&self) -> bool;

    /// Register `sink` for raw payloads pushed by the peripheral
    fn subscribe_values(&self, sink: ValueSender) -> Result<()>;

    /// Write the "notify" value to the client configuration descriptor
    async fn enable_notify(&self) -> Result<()>;
}
