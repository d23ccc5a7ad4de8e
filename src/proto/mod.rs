//! WSJT-X binary wire protocol: framing primitives and message decoding.

/// Checked big-endian cursor over a raw datagram.
pub mod frame;
/// Typed message bodies, decode entry point, outbound framing.
pub mod message;

/// First four bytes of every valid frame.
pub const MAGIC: u32 = 0xADBC_CBDA;
/// Schema version written into outbound frames.
pub const SCHEMA_VERSION: u32 = 2;
/// String length prefixes above this decode as absent, not as errors.
pub const MAX_STRING_LEN: u32 = 1000;

/// Frame-level decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The first four bytes are not [`MAGIC`].
    InvalidMagic,
    /// A read ran past the end of the datagram.
    Truncated,
}
