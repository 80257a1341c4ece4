//! Session Registry
//!
//! Tracks every device session that is connecting or connected. All
//! membership changes go through one lock, so two advertisements for the
//! same name can never both start a connect sequence.

use crate::domain::models::ConnectionState;
use crate::infrastructure::bluetooth::radio::RadioCharacteristic;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Bookkeeping for one peripheral, keyed by its display name.
///
/// The last accepted frame timestamp is not kept here. It belongs to the
/// session's `SessionStream`, the only reader of its notifications.
#[derive(Clone)]
pub struct DeviceSession {
    pub name: String,
    pub address: u64,
    pub state: ConnectionState,
    subscription: Option<Arc<dyn RadioCharacteristic>>,
}

impl DeviceSession {
    fn admitted(name: &str, address: u64) -> Self {
        Self {
            name: name.to_string(),
            address,
            state: ConnectionState::Connecting,
            subscription: None,
        }
    }

    /// The characteristic notifications were armed on, once subscribed
    pub fn subscription(&self) -> Option<&Arc<dyn RadioCharacteristic>> {
        self.subscription.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("name", &self.name)
            .field("address", &format_args!("{:#X}", self.address))
            .field("state", &self.state)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, DeviceSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every update leaves the map consistent, so a poisoned lock is still usable.
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, DeviceSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a `Connecting` placeholder for `name` unless one exists.
    ///
    /// Returns false, without touching the existing entry, if `name` is
    /// already connecting or connected.
    pub fn try_admit(&self, name: &str, address: u64) -> bool {
        let mut sessions = self.sessions();
        if sessions.contains_key(name) {
            return false;
        }
        sessions.insert(name.to_string(), DeviceSession::admitted(name, address));
        true
    }

    /// Drop any trace of `name`. Returns the removed session, if there was one.
    pub fn remove(&self, name: &str) -> Option<DeviceSession> {
        self.sessions().remove(name)
    }

    pub fn get(&self, name: &str) -> Option<DeviceSession> {
        self.sessions().get(name).cloned()
    }

    /// Where `name` stands. A name with no session is `Discovered`.
    pub fn state(&self, name: &str) -> ConnectionState {
        self.sessions()
            .get(name)
            .map(|s| s.state)
            .unwrap_or(ConnectionState::Discovered)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sessions().contains_key(name)
    }

    /// Move `name` to `state`. No-op if the session was already evicted.
    pub fn set_state(&self, name: &str, state: ConnectionState) -> bool {
        match self.sessions().get_mut(name) {
            Some(session) => {
                session.state = state;
                true
            }
            None => false,
        }
    }

    /// Record the characteristic notifications were armed on
    pub fn attach_subscription(
        &self,
        name: &str,
        characteristic: Arc<dyn RadioCharacteristic>,
    ) -> bool {
        match self.sessions().get_mut(name) {
            Some(session) => {
                session.subscription = Some(characteristic);
                true
            }
            None => false,
        }
    }

    /// Names of sessions in `state`
    pub fn names_in_state(&self, state: ConnectionState) -> Vec<String> {
        let mut names: Vec<String> = self
            .sessions()
            .values()
            .filter(|s| s.state == state)
            .map(|s| s.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}
