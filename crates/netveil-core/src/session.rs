// # Session State
//
// Counters, timestamps and addresses describing the current anonymization
// session.
//
// ## Lifecycle
//
// - One session per process run
// - Nothing is persisted: a restart loses all history
//
// ## Invariants
//
// - Counters only grow, and only through `record_mac_change` /
//   `record_identity_change`
// - `original_address` is write-once
// - `session_start` is write-once

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Session shared between the controller, the dashboard and the menu
///
/// Mutators are serialized by the lock, so a dashboard refresh can read while
/// no rotation is writing and vice versa.
pub type SharedSession = Arc<RwLock<Session>>;

/// State of the current anonymization session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    session_start: Option<DateTime<Utc>>,
    ip_change_count: u64,
    mac_change_count: u64,
    original_address: Option<IpAddr>,
    current_address: Option<IpAddr>,
    network_interface: String,
}

impl Session {
    /// Create a fresh session for `network_interface`
    pub fn new(network_interface: impl Into<String>) -> Self {
        Self {
            session_start: None,
            ip_change_count: 0,
            mac_change_count: 0,
            original_address: None,
            current_address: None,
            network_interface: network_interface.into(),
        }
    }

    /// Wrap the session for sharing
    pub fn shared(self) -> SharedSession {
        Arc::new(RwLock::new(self))
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    pub fn ip_change_count(&self) -> u64 {
        self.ip_change_count
    }

    pub fn mac_change_count(&self) -> u64 {
        self.mac_change_count
    }

    pub fn original_address(&self) -> Option<IpAddr> {
        self.original_address
    }

    pub fn current_address(&self) -> Option<IpAddr> {
        self.current_address
    }

    pub fn network_interface(&self) -> &str {
        &self.network_interface
    }

    /// Count a successful MAC rotation
    pub fn record_mac_change(&mut self) {
        self.mac_change_count = self.mac_change_count.saturating_add(1);
    }

    /// Count a successful Tor identity change
    pub fn record_identity_change(&mut self) {
        self.ip_change_count = self.ip_change_count.saturating_add(1);
    }

    /// Record the pre-anonymization address
    ///
    /// Returns `true` if the address was stored, `false` if one was already set.
    pub fn set_original_address(&mut self, address: IpAddr) -> bool {
        if self.original_address.is_some() {
            return false;
        }
        self.original_address = Some(address);
        true
    }

    /// Record the latest anonymized address
    pub fn set_current_address(&mut self, address: IpAddr) {
        self.current_address = Some(address);
    }

    /// Mark the session as started at `now` unless it already is
    ///
    /// Returns the effective start time.
    pub fn ensure_started(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        *self.session_start.get_or_insert(now)
    }

    /// Change the interface used by subsequent MAC rotations
    pub fn set_network_interface(&mut self, name: impl Into<String>) {
        self.network_interface = name.into();
    }

    /// Copy the current state for rendering
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_start: self.session_start,
            ip_change_count: self.ip_change_count,
            mac_change_count: self.mac_change_count,
            original_address: self.original_address,
            current_address: self.current_address,
            network_interface: self.network_interface.clone(),
        }
    }
}

/// Read-only copy of a [`Session`], handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_start: Option<DateTime<Utc>>,
    pub ip_change_count: u64,
    pub mac_change_count: u64,
    pub original_address: Option<IpAddr>,
    pub current_address: Option<IpAddr>,
    pub network_interface: String,
}
