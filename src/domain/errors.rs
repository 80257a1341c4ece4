//! Error taxonomy for connecting to gloves and handling their frames.

use thiserror::Error;

/// Fatal failure of a connect sequence. The admission is rolled back.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("could not resolve device {name} at {address:#X}: {reason}")]
    AddressResolutionFailed {
        name: String,
        address: u64,
        reason: String,
    },

    #[error("telemetry service unavailable on {name}: {reason}")]
    ServiceUnavailable { name: String, reason: String },

    #[error("could not watch link status of {name}: {reason}")]
    LinkWatchFailed { name: String, reason: String },
}

/// Notifications could not be armed. Never unwinds the session.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("failed to enable notifications after {attempts} attempt(s): {reason}")]
    SubscriptionFailed { attempts: u32, reason: String },
}

/// A notification payload that produced no sample
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed frame: {len} bytes, expected at least {expected}")]
    MalformedFrame { len: usize, expected: usize },

    #[error("stale frame: timestamp {candidate} is older than {last}")]
    StaleFrame { last: u32, candidate: u32 },
}
