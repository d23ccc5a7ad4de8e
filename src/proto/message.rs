use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    adif::{reader::AdiReader, writer::AdiWriter},
    contact::ContactRecord,
    proto::{
        MAGIC, SCHEMA_VERSION,
        frame::{FrameReader, FrameWriter},
    },
};

use super::ProtocolError;

/// Sender id written into frames synthesized by this program.
pub const PROGRAM_ID: &str = "wsjtx-relay";

/// Heartbeat message kind.
pub const KIND_HEARTBEAT: u32 = 0;
/// Status message kind.
pub const KIND_STATUS: u32 = 1;
/// Decode message kind.
pub const KIND_DECODE: u32 = 2;
/// Clear message kind.
pub const KIND_CLEAR: u32 = 3;
/// Reply message kind.
pub const KIND_REPLY: u32 = 4;
/// QSO Logged message kind.
pub const KIND_QSO_LOGGED: u32 = 5;
/// Closed message kind.
pub const KIND_CLOSED: u32 = 6;
/// Replay message kind.
pub const KIND_REPLAY: u32 = 7;
/// Halt TX message kind.
pub const KIND_HALT_TX: u32 = 8;
/// Free Text message kind.
pub const KIND_FREE_TEXT: u32 = 9;
/// WSPR Decode message kind.
pub const KIND_WSPR_DECODE: u32 = 10;
/// Location message kind.
pub const KIND_LOCATION: u32 = 11;
/// Logged ADIF message kind.
pub const KIND_LOGGED_ADIF: u32 = 12;
/// Highlight Call message kind.
pub const KIND_HIGHLIGHT_CALL: u32 = 13;
/// Switch Config message kind.
pub const KIND_SWITCH_CONFIG: u32 = 14;
/// Configure message kind.
pub const KIND_CONFIGURE: u32 = 15;

/// Header fields common to every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Protocol schema version.
    pub schema_version: u32,
    /// Raw message kind discriminant.
    pub kind: u32,
    /// Client identifier string, absent when the peer sent a null string.
    pub sender_id: Option<String>,
}

/// Special operational mode carried in Status frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialOpMode {
    /// No special mode.
    None,
    /// NA VHF contest.
    NaVhf,
    /// EU VHF contest.
    EuVhf,
    /// ARRL Field Day.
    FieldDay,
    /// RTTY Roundup.
    RttyRu,
    /// WW Digi contest.
    WwDigi,
    /// Fox (DXpedition mode).
    Fox,
    /// Hound (DXpedition mode).
    Hound,
    /// Value outside the defined 0-7 range.
    Other(u8),
}

impl SpecialOpMode {
    /// Maps the wire byte onto the defined 0-7 enum.
    pub fn from_wire(v: u8) -> Self {
        match v {
            0 => Self::None,
            1 => Self::NaVhf,
            2 => Self::EuVhf,
            3 => Self::FieldDay,
            4 => Self::RttyRu,
            5 => Self::WwDigi,
            6 => Self::Fox,
            7 => Self::Hound,
            other => Self::Other(other),
        }
    }
}

/// Radio state snapshot (kind 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBody {
    /// Dial frequency in Hz.
    pub dial_frequency_hz: u64,
    /// Operating mode.
    pub mode: Option<String>,
    /// DX callsign.
    pub dx_call: Option<String>,
    /// Signal report.
    pub report: Option<String>,
    /// Transmit mode.
    pub tx_mode: Option<String>,
    /// True when TX is enabled.
    pub tx_enabled: bool,
    /// True while transmitting.
    pub transmitting: bool,
    /// True while decoding.
    pub decoding: bool,
    /// RX offset in Hz.
    pub rx_offset_hz: u32,
    /// TX offset in Hz.
    pub tx_offset_hz: u32,
    /// Own callsign.
    pub de_call: Option<String>,
    /// Own grid locator.
    pub de_grid: Option<String>,
    /// DX grid locator.
    pub dx_grid: Option<String>,
    /// True when the TX watchdog tripped.
    pub tx_watchdog: bool,
    /// Sub-mode.
    pub sub_mode: Option<String>,
    /// True in fast mode.
    pub fast_mode: bool,
    /// Special operational mode.
    pub special_op_mode: SpecialOpMode,
    /// Frequency tolerance in Hz.
    pub freq_tolerance_hz: u32,
    /// T/R period in seconds.
    pub tr_period_sec: u32,
    /// Active configuration name.
    pub config_name: Option<String>,
    /// Current TX message; peers predating this field omit it entirely.
    pub tx_message: Option<String>,
}

impl StatusBody {
    fn read(r: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            dial_frequency_hz: r.u64()?,
            mode: r.string()?,
            dx_call: r.string()?,
            report: r.string()?,
            tx_mode: r.string()?,
            tx_enabled: r.bool()?,
            transmitting: r.bool()?,
            decoding: r.bool()?,
            rx_offset_hz: r.u32()?,
            tx_offset_hz: r.u32()?,
            de_call: r.string()?,
            de_grid: r.string()?,
            dx_grid: r.string()?,
            tx_watchdog: r.bool()?,
            sub_mode: r.string()?,
            fast_mode: r.bool()?,
            special_op_mode: SpecialOpMode::from_wire(r.u8()?),
            freq_tolerance_hz: r.u32()?,
            tr_period_sec: r.u32()?,
            config_name: r.string()?,
            // Truncation here means an older peer, not a bad frame.
            tx_message: r.string().unwrap_or(None),
        })
    }
}

/// A single decoded transmission (kind 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeBody {
    /// True for a fresh decode, false for a replayed one.
    pub is_new: bool,
    /// Milliseconds since midnight UTC.
    pub time_ms: u32,
    /// Signal-to-noise ratio in dB.
    pub snr_db: i32,
    /// Time offset in seconds.
    pub delta_time_sec: f64,
    /// Frequency offset in Hz.
    pub delta_freq_hz: u32,
    /// Mode indicator.
    pub mode: Option<String>,
    /// Decoded message text.
    pub message: Option<String>,
    /// True when the decoder flagged low confidence.
    pub low_confidence: bool,
    /// True for off-air (file) decodes.
    pub off_air: bool,
}

impl DecodeBody {
    fn read(r: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            is_new: r.i8()? != 0,
            time_ms: r.u32()?,
            snr_db: r.i32()?,
            delta_time_sec: r.f64()?,
            delta_freq_hz: r.u32()?,
            mode: r.string()?,
            message: r.string()?,
            low_confidence: r.i8()? != 0,
            off_air: r.i8()? != 0,
        })
    }
}

/// A completed contact as logged by the client (kind 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QsoLoggedBody {
    /// QSO end date (Julian day number).
    pub date_off: u64,
    /// QSO end time, milliseconds since midnight UTC.
    pub time_off: u32,
    /// Time spec for the end timestamp; 2 means offset-from-UTC follows.
    pub time_off_spec: u8,
    /// Minutes offset for the end timestamp, present when spec == 2.
    pub offset_off_minutes: Option<i32>,
    /// DX callsign.
    pub dx_call: Option<String>,
    /// DX grid locator.
    pub dx_grid: Option<String>,
    /// Dial frequency in Hz.
    pub dial_frequency_hz: u64,
    /// Mode.
    pub mode: Option<String>,
    /// Report sent.
    pub rst_sent: Option<String>,
    /// Report received.
    pub rst_rcvd: Option<String>,
    /// Transmit power.
    pub tx_power: Option<String>,
    /// Operator comments.
    pub comments: Option<String>,
    /// Operator name.
    pub name: Option<String>,
    /// QSO start date (Julian day number).
    pub date_on: u64,
    /// QSO start time, milliseconds since midnight UTC.
    pub time_on: u32,
    /// Time spec for the start timestamp; 2 means offset-from-UTC follows.
    pub time_on_spec: u8,
    /// Minutes offset for the start timestamp, present when spec == 2.
    pub offset_on_minutes: Option<i32>,
    /// Operator callsign.
    pub operator_call: Option<String>,
    /// Own callsign.
    pub de_call: Option<String>,
    /// Own grid locator.
    pub de_grid: Option<String>,
    /// Contest exchange sent.
    pub exchange_sent: Option<String>,
    /// Contest exchange received.
    pub exchange_rcvd: Option<String>,
}

impl QsoLoggedBody {
    fn read(r: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        let date_off = r.u64()?;
        let time_off = r.u32()?;
        let time_off_spec = r.u8()?;
        let offset_off_minutes = if time_off_spec == 2 {
            Some(r.i32()?)
        } else {
            None
        };
        let dx_call = r.string()?;
        let dx_grid = r.string()?;
        let dial_frequency_hz = r.u64()?;
        let mode = r.string()?;
        let rst_sent = r.string()?;
        let rst_rcvd = r.string()?;
        let tx_power = r.string()?;
        let comments = r.string()?;
        let name = r.string()?;
        let date_on = r.u64()?;
        let time_on = r.u32()?;
        let time_on_spec = r.u8()?;
        let offset_on_minutes = if time_on_spec == 2 {
            Some(r.i32()?)
        } else {
            None
        };
        Ok(Self {
            date_off,
            time_off,
            time_off_spec,
            offset_off_minutes,
            dx_call,
            dx_grid,
            dial_frequency_hz,
            mode,
            rst_sent,
            rst_rcvd,
            tx_power,
            comments,
            name,
            date_on,
            time_on,
            time_on_spec,
            offset_on_minutes,
            operator_call: r.string()?,
            de_call: r.string()?,
            de_grid: r.string()?,
            exchange_sent: r.string()?,
            exchange_rcvd: r.string()?,
        })
    }
}

/// A WSPR spot decode (kind 10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsprDecodeBody {
    /// True for a fresh decode.
    pub is_new: bool,
    /// Milliseconds since midnight UTC.
    pub time_ms: u32,
    /// Signal-to-noise ratio.
    pub snr: u32,
    /// Time offset in seconds.
    pub delta_time_sec: f64,
    /// Absolute frequency in Hz.
    pub freq_hz: u64,
    /// Frequency drift in Hz.
    pub drift_hz: i32,
    /// Spotted callsign.
    pub callsign: Option<String>,
    /// Spotted grid locator.
    pub grid: Option<String>,
    /// Reported power in dBm.
    pub power_dbm: i32,
    /// True for off-air decodes.
    pub off_air: bool,
}

impl WsprDecodeBody {
    fn read(r: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            is_new: r.i8()? != 0,
            time_ms: r.u32()?,
            snr: r.u32()?,
            delta_time_sec: r.f64()?,
            freq_hz: r.u64()?,
            drift_hz: r.i32()?,
            callsign: r.string()?,
            grid: r.string()?,
            power_dbm: r.i32()?,
            off_air: r.i8()? != 0,
        })
    }
}

/// An ADIF record broadcast by the client after logging (kind 12).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedAdifBody {
    /// Raw embedded ADIF text.
    pub adif: Option<String>,
    /// Contacts parsed out of the ADIF text, normally exactly one.
    pub contacts: Vec<ContactRecord>,
}

impl LoggedAdifBody {
    fn read(r: &mut FrameReader<'_>) -> Result<Self, ProtocolError> {
        let adif = r.string()?;
        let contacts = match &adif {
            Some(text) => match AdiReader::new(text.as_bytes()).read_all() {
                Ok(contacts) => contacts,
                Err(err) => {
                    warn!(?err, "malformed embedded adif, no contacts extracted");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        Ok(Self { adif, contacts })
    }
}

/// Kind-specific payload of a decoded frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    /// Kind 0, header only.
    Heartbeat,
    /// Kind 1.
    Status(StatusBody),
    /// Kind 2.
    Decode(DecodeBody),
    /// Kind 3, header only.
    Clear,
    /// Kind 4, header only.
    Reply,
    /// Kind 5.
    QsoLogged(QsoLoggedBody),
    /// Kind 6, header only.
    Closed,
    /// Kind 7, header only.
    Replay,
    /// Kind 8, header only.
    HaltTx,
    /// Kind 9, header only.
    FreeText,
    /// Kind 10.
    WsprDecode(WsprDecodeBody),
    /// Kind 11, header only.
    Location,
    /// Kind 12.
    LoggedAdif(LoggedAdifBody),
    /// Kind 13, header only.
    HighlightCall,
    /// Kind 14, header only.
    SwitchConfig,
    /// Kind 15, header only.
    Configure,
    /// Any kind outside the enumerated set; never an error.
    Unknown(u32),
}

/// A fully decoded frame: common header plus kind-specific body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedFrame {
    /// Common header fields.
    pub header: FrameHeader,
    /// Kind-specific payload.
    pub body: MessageBody,
}

impl DecodedFrame {
    /// Human-readable name of this frame's kind.
    pub fn kind_name(&self) -> &'static str {
        kind_name(self.header.kind)
    }
}

/// Maps a raw kind discriminant to its display name.
pub fn kind_name(kind: u32) -> &'static str {
    match kind {
        KIND_HEARTBEAT => "Heartbeat",
        KIND_STATUS => "Status",
        KIND_DECODE => "Decode",
        KIND_CLEAR => "Clear",
        KIND_REPLY => "Reply",
        KIND_QSO_LOGGED => "QSO Logged",
        KIND_CLOSED => "Closed",
        KIND_REPLAY => "Replay",
        KIND_HALT_TX => "Halt TX",
        KIND_FREE_TEXT => "Free Text",
        KIND_WSPR_DECODE => "WSPR Decode",
        KIND_LOCATION => "Location",
        KIND_LOGGED_ADIF => "Logged ADIF",
        KIND_HIGHLIGHT_CALL => "Highlight Call",
        KIND_SWITCH_CONFIG => "Switch Config",
        KIND_CONFIGURE => "Configure",
        _ => "Unknown",
    }
}

/// Decodes one datagram into a typed frame.
///
/// Unknown kinds succeed with [`MessageBody::Unknown`]; only a bad magic
/// number or a truncated read of an enumerated kind fails.
pub fn decode(data: &[u8]) -> Result<DecodedFrame, ProtocolError> {
    let mut r = FrameReader::new(data);
    if r.u32()? != MAGIC {
        return Err(ProtocolError::InvalidMagic);
    }
    let schema_version = r.u32()?;
    let kind = r.u32()?;
    let sender_id = r.string()?;

    let body = match kind {
        KIND_HEARTBEAT => MessageBody::Heartbeat,
        KIND_STATUS => MessageBody::Status(StatusBody::read(&mut r)?),
        KIND_DECODE => MessageBody::Decode(DecodeBody::read(&mut r)?),
        KIND_CLEAR => MessageBody::Clear,
        KIND_REPLY => MessageBody::Reply,
        KIND_QSO_LOGGED => MessageBody::QsoLogged(QsoLoggedBody::read(&mut r)?),
        KIND_CLOSED => MessageBody::Closed,
        KIND_REPLAY => MessageBody::Replay,
        KIND_HALT_TX => MessageBody::HaltTx,
        KIND_FREE_TEXT => MessageBody::FreeText,
        KIND_WSPR_DECODE => MessageBody::WsprDecode(WsprDecodeBody::read(&mut r)?),
        KIND_LOCATION => MessageBody::Location,
        KIND_LOGGED_ADIF => MessageBody::LoggedAdif(LoggedAdifBody::read(&mut r)?),
        KIND_HIGHLIGHT_CALL => MessageBody::HighlightCall,
        KIND_SWITCH_CONFIG => MessageBody::SwitchConfig,
        KIND_CONFIGURE => MessageBody::Configure,
        other => MessageBody::Unknown(other),
    };

    Ok(DecodedFrame {
        header: FrameHeader {
            schema_version,
            kind,
            sender_id,
        },
        body,
    })
}

/// Frames `record` as a Logged ADIF message suitable for injection or
/// direct sending to forwards.
pub fn encode_logged_adif(record: &ContactRecord) -> Vec<u8> {
    let mut adif = AdiWriter::new(PROGRAM_ID, Some(env!("CARGO_PKG_VERSION")));
    adif.write_record(record);
    let text = adif.into_string();

    let mut w = FrameWriter::new();
    w.u32(MAGIC)
        .u32(SCHEMA_VERSION)
        .u32(KIND_LOGGED_ADIF)
        .string(Some(PROGRAM_ID))
        .string(Some(&text));
    w.into_bytes()
}

/// Formats milliseconds-since-midnight as `HHMMSS`, truncating fractional
/// seconds the way the upstream client displays decode times.
pub fn hhmmss(time_ms: u32) -> String {
    let total = time_ms / 1000;
    let hours = total / 3600;
    let minutes = total / 60 - hours * 60;
    let seconds = total % 60;
    format!("{hours:02}{minutes:02}{seconds:02}")
}
