//! UDP relay engine: NAT-style mapping table, event stream, and the
//! single-writer actor that owns the socket.

/// Event stream payloads emitted by the relay loop.
pub mod events;
/// Handle, command loop, and datagram dispatch.
pub mod handle;
/// Forward-to-client activity mapping with TTL expiry.
pub mod mapping;
