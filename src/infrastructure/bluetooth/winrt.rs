//! Windows Radio Backend
//!
//! Implements the radio collaborator traits on top of the WinRT Bluetooth
//! LE APIs.

use crate::domain::models::Advertisement;
use crate::infrastructure::bluetooth::radio::{
    AdvertisementSender, DisconnectSender, RadioAdapter, RadioCharacteristic, RadioDevice,
    RadioService, ScanControl, ValueSender,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use windows::core::GUID;
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristic, GattCharacteristicProperties,
    GattClientCharacteristicConfigurationDescriptorValue, GattCommunicationStatus,
    GattDeviceService, GattValueChangedEventArgs,
};
use windows::Devices::Bluetooth::{BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::DataReader;

fn to_uuid(guid: GUID) -> Uuid {
    Uuid::from_u128(guid.to_u128())
}

/// Active advertisement watcher
pub struct AdvertisementWatcher {
    watcher: Option<BluetoothLEAdvertisementWatcher>,
    sender: AdvertisementSender,
}

impl AdvertisementWatcher {
    pub fn new(sender: AdvertisementSender) -> Self {
        Self {
            watcher: None,
            sender,
        }
    }
}

impl ScanControl for AdvertisementWatcher {
    fn start(&mut self) -> Result<()> {
        // Stop any existing scan
        self.stop()?;

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let sender = self.sender.clone();
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let advertisement = Advertisement {
                        name: args.Advertisement()?.LocalName()?.to_string(),
                        address: args.BluetoothAddress()?,
                        signal_strength: args.RawSignalStrengthInDBm()?,
                    };
                    let _ = sender.send(advertisement);
                }
                Ok(())
            },
        );

        watcher.Received(&handler)?;
        watcher.Start()?;
        self.watcher = Some(watcher);

        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(watcher) = self.watcher.take() {
            watcher.Stop()?;
        }
        Ok(())
    }

    fn is_scanning(&self) -> bool {
        self.watcher.is_some()
    }
}

impl Drop for AdvertisementWatcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WinRtAdapter;

#[async_trait]
impl RadioAdapter for WinRtAdapter {
    async fn resolve_by_address(&self, address: u64) -> Result<Arc<dyn RadioDevice>> {
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(address)?.await?;
        info!("Resolved device: {:?}", device.Name()?);
        Ok(Arc::new(WinRtDevice { device }))
    }
}

pub struct WinRtDevice {
    device: BluetoothLEDevice,
}

#[async_trait]
impl RadioDevice for WinRtDevice {
    fn address(&self) -> u64 {
        self.device.BluetoothAddress().unwrap_or_default()
    }

    async fn get_services(&self) -> Result<Vec<Arc<dyn RadioService>>> {
        let result = self.device.GetGattServicesAsync()?.await?;

        let status = result.Status()?;
        if status != GattCommunicationStatus::Success {
            anyhow::bail!("Failed to get GATT services: {:?}", status);
        }

        let services = result.Services()?;
        let mut out: Vec<Arc<dyn RadioService>> = Vec::with_capacity(services.Size()? as usize);
        for i in 0..services.Size()? {
            out.push(Arc::new(WinRtService {
                service: services.GetAt(i)?,
            }));
        }
        Ok(out)
    }

    fn subscribe_disconnect(&self, sink: DisconnectSender) -> Result<()> {
        let handler =
            TypedEventHandler::new(move |dev: windows::core::Ref<BluetoothLEDevice>, _| {
                if let Some(dev) = dev.as_ref() {
                    if dev.ConnectionStatus()? == BluetoothConnectionStatus::Disconnected {
                        let _ = sink.send(());
                    }
                }
                Ok(())
            });
        self.device.ConnectionStatusChanged(&handler)?;
        Ok(())
    }

    fn close(&self) {
        if let Err(e) = self.device.Close() {
            warn!("Failed to close device: {}", e);
        }
    }
}

pub struct WinRtService {
    service: GattDeviceService,
}

#[async_trait]
impl RadioService for WinRtService {
    fn uuid(&self) -> Uuid {
        self.service.Uuid().map(to_uuid).unwrap_or_default()
    }

    fn set_persistent(&self, persistent: bool) {
        let result = self
            .service
            .Session()
            .and_then(|session| session.SetMaintainConnection(persistent));
        if let Err(e) = result {
            warn!("Failed to set MaintainConnection: {}", e);
        }
    }

    async fn get_characteristics(&self) -> Result<Vec<Arc<dyn RadioCharacteristic>>> {
        let result = self.service.GetCharacteristicsAsync()?.await?;
        if result.Status()? != GattCommunicationStatus::Success {
            anyhow::bail!("Failed to get characteristics: {:?}", result.Status()?);
        }

        let characteristics = result.Characteristics()?;
        let mut out: Vec<Arc<dyn RadioCharacteristic>> =
            Vec::with_capacity(characteristics.Size()? as usize);
        for i in 0..characteristics.Size()? {
            out.push(Arc::new(WinRtCharacteristic {
                characteristic: characteristics.GetAt(i)?,
            }));
        }
        Ok(out)
    }
}

pub struct WinRtCharacteristic {
    characteristic: GattCharacteristic,
}

#[async_trait]
impl RadioCharacteristic for WinRtCharacteristic {
    fn uuid(&self) -> Uuid {
        self.characteristic.Uuid().map(to_uuid).unwrap_or_default()
    }

    fn supports_notify(&self) -> bool {
        self.characteristic
            .CharacteristicProperties()
            .map(|p| p.0 & GattCharacteristicProperties::Notify.0 != 0)
            .unwrap_or(false)
    }

    fn subscribe_values(&self, sink: ValueSender) -> Result<()> {
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<GattCharacteristic>,
                  args: windows::core::Ref<GattValueChangedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let value = args.CharacteristicValue()?;
                    let reader = DataReader::FromBuffer(&value)?;
                    let mut bytes = vec![0u8; reader.UnconsumedBufferLength()? as usize];
                    reader.ReadBytes(&mut bytes)?;
                    let _ = sink.send(bytes);
                }
                Ok(())
            },
        );
        self.characteristic.ValueChanged(&handler)?;
        Ok(())
    }

    async fn enable_notify(&self) -> Result<()> {
        let status = self
            .characteristic
            .WriteClientCharacteristicConfigurationDescriptorAsync(
                GattClientCharacteristicConfigurationDescriptorValue::Notify,
            )?
            .await?;

        if status != GattCommunicationStatus::Success {
            anyhow::bail!("Notification subscription returned status: {:?}", status);
        }
        Ok(())
    }
}
