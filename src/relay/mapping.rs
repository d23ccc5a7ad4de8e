use std::net::SocketAddr;

use hashbrown::HashMap;

/// Tracks, per forward endpoint, the clients that recently sent traffic
/// toward it, with last-activity timestamps in epoch milliseconds.
///
/// Invariant: a forward bucket exists only while it has at least one
/// client; sweeps remove emptied buckets rather than retaining them.
/// The table is owned by the single relay task, which serializes the
/// receive path and the sweep timer against each other.
#[derive(Debug, Default)]
pub struct AddressMappingTable {
    buckets: HashMap<SocketAddr, HashMap<SocketAddr, u64>>,
}

impl AddressMappingTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts `client`'s timestamp under `forward`'s bucket, creating the
    /// bucket if absent. Idempotent for repeated calls with the same `now`.
    pub fn record_activity(&mut self, forward: SocketAddr, client: SocketAddr, now_ms: u64) {
        self.buckets.entry(forward).or_default().insert(client, now_ms);
    }

    /// Returns the clients currently mapped to `forward`, possibly empty.
    /// Never creates a bucket as a side effect.
    pub fn lookup_clients(&self, forward: &SocketAddr) -> Vec<SocketAddr> {
        self.buckets
            .get(forward)
            .map(|clients| clients.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Removes every client whose age reaches `ttl_ms` (`now - last >= ttl`)
    /// and drops any bucket left empty. Repeated calls with nothing stale
    /// are no-ops.
    pub fn sweep(&mut self, now_ms: u64, ttl_ms: u64) {
        self.buckets.retain(|_, clients| {
            clients.retain(|_, last_seen| now_ms.saturating_sub(*last_seen) < ttl_ms);
            !clients.is_empty()
        });
    }

    /// Drops every mapping.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Number of forward buckets currently held.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no mappings exist.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
