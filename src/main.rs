use hmi_glove_link::domain::models::GloveEvent;
use hmi_glove_link::domain::settings::SettingsService;
use hmi_glove_link::infrastructure::bluetooth::radio::{
    AdvertisementSender, RadioAdapter, ScanControl,
};
use hmi_glove_link::infrastructure::bluetooth::{Scanner, ScannerConfig};
use hmi_glove_link::infrastructure::logging;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting HMI Glove Link");
    info!("Settings: {}", settings_service.path().display());

    let (advertisement_tx, advertisement_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let (scan, adapter) = radio_backend(advertisement_tx)?;
    let mut scanner = Scanner::new(
        scan,
        adapter,
        ScannerConfig::from_settings(&settings),
        event_tx,
    );
    scanner.start_scan()?;

    let print_samples = settings.print_samples;
    {
        let run = scanner.run(advertisement_rx);
        tokio::pin!(run);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    break;
                }
                _ = &mut run => {
                    error!("Radio backend stopped delivering advertisements");
                    break;
                }
                Some(event) = event_rx.recv() => match event {
                    GloveEvent::DeviceDiscovered(adv) => {
                        info!(
                            "Discovered {} ({:#X}, {} dBm)",
                            adv.name, adv.address, adv.signal_strength
                        );
                    }
                    GloveEvent::DeviceConnected(name) => info!("{} connected", name),
                    GloveEvent::DeviceDisconnected(name) => info!("{} disconnected", name),
                    GloveEvent::DataReceived(sample) => {
                        if print_samples {
                            println!("{}", serde_json::to_string(&sample)?);
                        }
                    }
                },
            }
        }
    }

    scanner.stop_scan()?;
    Ok(())
}

type RadioBackend = (Box<dyn ScanControl>, Arc<dyn RadioAdapter>);

#[cfg(windows)]
fn radio_backend(advertisements: AdvertisementSender) -> anyhow::Result<RadioBackend> {
    use hmi_glove_link::infrastructure::bluetooth::winrt::{AdvertisementWatcher, WinRtAdapter};

    let scan: Box<dyn ScanControl> = Box::new(AdvertisementWatcher::new(advertisements));
    let adapter: Arc<dyn RadioAdapter> = Arc::new(WinRtAdapter);
    Ok((scan, adapter))
}

#[cfg(not(windows))]
fn radio_backend(_advertisements: AdvertisementSender) -> anyhow::Result<RadioBackend> {
    anyhow::bail!("No Bluetooth LE backend is available on this platform")
}
