use crate::{
    contact::ContactRecord,
    proto::message::{DecodedFrame, StatusBody},
    types::RelayStatus,
};

/// Events broadcast by the relay loop.
///
/// For a given packet the order is: send-failure errors (if any), then
/// decode-derived events, then the combined traffic log line.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Human-readable traffic or lifecycle line.
    Log(String),
    /// Non-fatal failure description.
    Error(String),
    /// Lifecycle transition.
    Status(RelayStatus),
    /// Any successfully decoded frame.
    Decoded(DecodedFrame),
    /// Radio-state snapshot from a Status frame.
    StatusUpdate(StatusBody),
    /// A contact extracted from an embedded ADIF record.
    ContactLogged(ContactRecord),
}
