//! Subscription Manager
//!
//! Arms notifications on the telemetry characteristic.

use crate::domain::errors::SubscribeError;
use crate::infrastructure::bluetooth::radio::RadioCharacteristic;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Raw notification payloads of one characteristic
pub type ValueReceiver = mpsc::UnboundedReceiver<Vec<u8>>;

#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    max_attempts: u32,
    retry_delay: Duration,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new(1, Duration::from_millis(500))
    }
}

impl SubscriptionManager {
    /// `max_attempts` below one is treated as one
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Enable notifications on `characteristic`.
    ///
    /// The payload sink is registered before the descriptor write, so a
    /// frame sent right after enablement is already captured. The returned
    /// receiver yields every payload the characteristic pushes.
    pub async fn enable_notifications(
        &self,
        characteristic: &dyn RadioCharacteristic,
    ) -> Result<ValueReceiver, SubscribeError> {
        info!("Enabling notifications on {}", characteristic.uuid());

        let (tx, rx) = mpsc::unbounded_channel();
        characteristic
            .subscribe_values(tx)
            .map_err(|e| SubscribeError::SubscriptionFailed {
                attempts: 0,
                reason: format!("{:#}", e),
            })?;

        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match characteristic.enable_notify().await {
                Ok(()) => {
                    info!("Notifications enabled successfully");
                    return Ok(rx);
                }
                Err(e) => {
                    warn!(
                        "Notification subscription attempt {} failed: {:#}",
                        attempt, e
                    );
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(SubscribeError::SubscriptionFailed {
            attempts: self.max_attempts,
            reason: last_error
                .map(|e| format!("{:#}", e))
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}
