//! Bluetooth Module
//!
//! Connects to HMI gloves and turns their notifications into telemetry samples.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        Scanner                           │
//! │    (composition root - advertisements in, events out)    │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼──────────────┐
//!         │             │              │
//!         ▼             ▼              ▼
//! ┌───────────┐  ┌────────────┐  ┌───────────┐
//! │ Registry  │  │ Connection │  │  Session  │
//! │           │  │            │  │           │
//! │ - admit   │  │ - resolve  │  │ - decode  │
//! │ - evict   │  │ - service  │  │ - sequence│
//! │           │  │ - subscribe│  │   guard   │
//! └───────────┘  └────────────┘  └───────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Wire constants and the telemetry frame decoder
//! - [`radio`] - Traits the platform radio stack is consumed through
//! - [`registry`] - Session admission and eviction
//! - [`subscription`] - Notification enablement
//! - [`connection`] - The multi-step connect sequence
//! - [`session`] - Per-session notification pump
//! - [`scanner`] - Composition root
//! - `winrt` - Windows backend (Windows only)

pub mod connection;
pub mod protocol;
pub mod radio;
pub mod registry;
pub mod scanner;
pub mod session;
pub mod subscription;

#[cfg(windows)]
pub mod winrt;

#[cfg(test)]
pub(crate) mod mock;

// Re-export the composition root for convenience
pub use scanner::{Scanner, ScannerConfig};
