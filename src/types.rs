//! Shared relay settings, status, and contract constants.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Milliseconds a client mapping survives without fresh traffic.
pub const CLIENT_TTL_MS: u64 = 60_000;
/// Milliseconds between mapping-table sweeps.
pub const SWEEP_INTERVAL_MS: u64 = 5_000;

/// Relay lifecycle state as reported to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayStatus {
    /// Socket bound, receive loop and sweep timer active.
    Running,
    /// No socket bound; the mapping table is empty.
    Stopped,
}

/// Listen/forward configuration supplied by the host application.
///
/// The host validates and persists these; the relay only consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySettings {
    /// UDP port to listen on (all interfaces).
    pub listen_port: u16,
    /// Remote endpoints every client packet is duplicated to.
    pub forwards: Vec<SocketAddr>,
}

impl RelaySettings {
    /// Creates settings for `listen_port` and `forwards`.
    pub fn new(listen_port: u16, forwards: Vec<SocketAddr>) -> Self {
        Self {
            listen_port,
            forwards,
        }
    }

    /// Returns true when `port` is a usable UDP port (1-65535).
    pub fn valid_port(port: u16) -> bool {
        port != 0
    }

    /// Value comparison: same listen port and the same forward set,
    /// regardless of list order. Decides whether a settings update
    /// requires a restart.
    pub fn same_as(&self, other: &Self) -> bool {
        if self.listen_port != other.listen_port || self.forwards.len() != other.forwards.len() {
            return false;
        }
        let mut a = self.forwards.clone();
        let mut b = other.forwards.clone();
        a.sort();
        b.sort();
        a == b
    }

    /// Returns true when `addr` is one of the configured forwards.
    pub fn is_forward(&self, addr: &SocketAddr) -> bool {
        self.forwards.iter().any(|f| f == addr)
    }
}
