//! ADIF log-format codec: tag tokenizer, record assembly, and writer.
//!
//! The same format appears standalone in log exchange files and embedded in
//! Logged ADIF frames, so the codec is independent of the wire protocol.

/// Date/time component reconciliation against `start`/`end` instants.
pub mod datetime;
/// Closed field registry with per-field decode/encode rules.
pub mod fields;
/// Tokenizer and contact-record assembly.
pub mod reader;
/// Preamble and per-record serialization.
pub mod writer;

/// Structural failures in the tag stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdifError {
    /// Input ended inside a tag or before a declared value length was met.
    UnterminatedTag,
}

/// Per-field failures. Both are non-fatal: the field is skipped and the
/// rest of the record proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The field name is not in the registry.
    UnknownField(String),
    /// The raw value does not satisfy the field's type rule.
    InvalidValue(String),
}
