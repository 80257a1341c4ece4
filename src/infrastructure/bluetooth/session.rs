//! Per-session notification pump.
//!
//! Each connected device gets one of these. It owns the session's
//! [`SequenceGuard`], so no other session ever touches its timestamp.

use crate::domain::errors::FrameError;
use crate::domain::models::{GloveEvent, TelemetrySample};
use crate::domain::sequence::SequenceGuard;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::subscription::ValueReceiver;
use tokio::sync::mpsc;
use tracing::{debug, trace};

pub struct SessionStream {
    name: String,
    guard: SequenceGuard,
    events: mpsc::UnboundedSender<GloveEvent>,
    raw_logging: bool,
}

impl SessionStream {
    pub fn new(
        name: impl Into<String>,
        events: mpsc::UnboundedSender<GloveEvent>,
        raw_logging: bool,
    ) -> Self {
        Self {
            name: name.into(),
            guard: SequenceGuard::new(),
            events,
            raw_logging,
        }
    }

    pub fn last_timestamp(&self) -> u32 {
        self.guard.last()
    }

    /// Decode one payload and pass it through the sequence guard
    pub fn accept_frame(&mut self, bytes: &[u8]) -> Result<TelemetrySample, FrameError> {
        if self.raw_logging {
            trace!("{} raw frame: {:02X?}", self.name, bytes);
        }

        let sample = protocol::decode(&self.name, bytes)?;
        self.guard.check(sample.timestamp)?;
        Ok(sample)
    }

    /// Publish the sample for `bytes`, dropping it if it is malformed or stale
    pub fn handle_frame(&mut self, bytes: &[u8]) {
        match self.accept_frame(bytes) {
            Ok(sample) => {
                let _ = self.events.send(GloveEvent::DataReceived(sample));
            }
            Err(e @ FrameError::MalformedFrame { .. }) => {
                debug!(
                    "{}: dropped {} (timestamp {:?})",
                    self.name,
                    e,
                    protocol::frame_timestamp(bytes)
                );
            }
            Err(e) => trace!("{}: dropped {}", self.name, e),
        }
    }

    /// Forward notifications until the link is lost.
    ///
    /// `values` is absent for a connected-but-silent session; the pump then
    /// only waits for the disconnect signal. A dropped disconnect sender
    /// counts as link loss.
    pub async fn run(
        &mut self,
        mut values: Option<ValueReceiver>,
        mut disconnected: mpsc::UnboundedReceiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = disconnected.recv() => break,
                frame = async {
                    match values.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => None,
                    }
                }, if values.is_some() => {
                    match frame {
                        Some(bytes) => self.handle_frame(&bytes),
                        None => {
                            debug!("{}: notification source closed", self.name);
                            values = None;
                        }
                    }
                }
            }
        }

        self.guard.reset();
    }
}
