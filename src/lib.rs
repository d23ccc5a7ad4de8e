//! UDP relay, frame decoder, and ADIF codec for the WSJT-X
//! logging/control protocol.
//!
//! The relay duplicates client traffic to every configured forward
//! endpoint and routes forward replies back through a NAT-style mapping
//! table, while decoding each payload into typed messages and structured
//! contact records for observers.
//!
//! # Examples
//!
//! ADIF codec roundtrip:
//! ```
//! use wsjtx_relay::{
//!     adif::{reader::AdiReader, writer::AdiWriter},
//!     contact::{ContactRecord, FieldValue},
//! };
//!
//! let mut record = ContactRecord::new();
//! record.insert("call", FieldValue::Text("W1ABC".to_string()));
//! record.insert("band", FieldValue::Text("20M".to_string()));
//! record.insert("mode", FieldValue::Text("FT8".to_string()));
//!
//! let mut writer = AdiWriter::new("wsjtx-relay", None);
//! writer.write_record(&record);
//! let text = writer.into_string();
//!
//! let records = AdiReader::new(text.as_bytes()).read_all().expect("parse");
//! assert_eq!(records, vec![record]);
//! ```
//!
//! Running the relay:
//! ```no_run
//! use wsjtx_relay::{relay::handle::spawn_relay, types::RelaySettings};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let forwards = vec!["127.0.0.1:2238".parse().expect("addr")];
//! let relay = spawn_relay(RelaySettings::new(2237, forwards));
//! let mut events = relay.subscribe();
//! relay.start().await.expect("start");
//! while let Ok(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # }
//! ```

/// ADIF log-format reader, writer, and field registry.
pub mod adif;
/// Structured contact records and typed field values.
pub mod contact;
/// Binary wire protocol framing and message decoding.
pub mod proto;
/// UDP relay engine, mapping table, and event stream.
pub mod relay;
/// Shared settings, status, and contract constants.
pub mod types;
