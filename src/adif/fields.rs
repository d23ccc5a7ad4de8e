use chrono::{NaiveDate, NaiveTime};

use crate::contact::FieldValue;

use super::FieldError;

/// Type rule attached to a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, stored verbatim.
    Text,
    /// Decimal number (frequency in MHz, power in watts).
    Number,
    /// Calendar date, `YYYYMMDD`.
    Date,
    /// Time of day, `HHMMSS` (or `HHMM`).
    Time,
    /// Maidenhead grid locator.
    Grid,
}

/// One registry row: ADIF tag name, type rule, and the record key the
/// decoded value is stored under.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Lowercase ADIF tag name.
    pub name: &'static str,
    /// Type rule.
    pub kind: FieldKind,
    /// Key in a [`crate::contact::ContactRecord`]; differs from `name` only
    /// for the vendor-namespaced bookkeeping fields.
    pub record_key: &'static str,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef {
        name,
        kind,
        record_key: name,
    }
}

/// The closed field table. Fixed at compile time; fields outside it are
/// skipped with a diagnostic, never an abort.
pub static FIELDS: &[FieldDef] = &[
    field("adif_ver", FieldKind::Text),
    field("programid", FieldKind::Text),
    field("programversion", FieldKind::Text),
    FieldDef {
        name: "app_wsjtxrelay_id",
        kind: FieldKind::Text,
        record_key: "_id",
    },
    FieldDef {
        name: "app_wsjtxrelay_rev",
        kind: FieldKind::Text,
        record_key: "_rev",
    },
    field("call", FieldKind::Text),
    field("band", FieldKind::Text),
    field("mode", FieldKind::Text),
    field("submode", FieldKind::Text),
    field("freq", FieldKind::Number),
    field("freq_rx", FieldKind::Number),
    field("gridsquare", FieldKind::Grid),
    field("my_gridsquare", FieldKind::Grid),
    field("rst_sent", FieldKind::Text),
    field("rst_rcvd", FieldKind::Text),
    field("operator", FieldKind::Text),
    field("station_callsign", FieldKind::Text),
    field("tx_pwr", FieldKind::Number),
    field("comment", FieldKind::Text),
    field("name", FieldKind::Text),
    field("sig", FieldKind::Text),
    field("sig_info", FieldKind::Text),
    field("qso_date", FieldKind::Date),
    field("qso_date_off", FieldKind::Date),
    field("time_on", FieldKind::Time),
    field("time_off", FieldKind::Time),
];

/// Looks up a registered field by lowercase tag name.
pub fn lookup(name: &str) -> Option<&'static FieldDef> {
    FIELDS.iter().find(|def| def.name == name)
}

/// Encodes `value` for the field named `name`, resolving the registry first.
pub fn encode_field(name: &str, value: &FieldValue) -> Result<String, FieldError> {
    match lookup(name) {
        Some(def) => def.encode(value),
        None => Err(FieldError::UnknownField(name.to_string())),
    }
}

impl FieldDef {
    /// Decodes raw tag text into a typed value.
    pub fn decode(&self, raw: &str) -> Result<FieldValue, FieldError> {
        let invalid = || FieldError::InvalidValue(self.name.to_string());
        match self.kind {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Number => raw
                .trim()
                .parse::<f64>()
                .map(FieldValue::Number)
                .map_err(|_| invalid()),
            FieldKind::Date => {
                NaiveDate::parse_from_str(raw, "%Y%m%d").map_err(|_| invalid())?;
                Ok(FieldValue::Text(raw.to_string()))
            }
            FieldKind::Time => {
                parse_time(raw).ok_or_else(invalid)?;
                Ok(FieldValue::Text(raw.to_string()))
            }
            FieldKind::Grid => {
                if is_grid(raw) {
                    Ok(FieldValue::Text(raw.to_string()))
                } else {
                    Err(invalid())
                }
            }
        }
    }

    /// Encodes a typed value back to raw tag text.
    pub fn encode(&self, value: &FieldValue) -> Result<String, FieldError> {
        let invalid = || FieldError::InvalidValue(self.name.to_string());
        match (self.kind, value) {
            (FieldKind::Number, FieldValue::Number(n)) => Ok(format!("{n}")),
            (FieldKind::Number, _) => Err(invalid()),
            (FieldKind::Grid, FieldValue::Text(s)) if is_grid(s) => Ok(s.clone()),
            (FieldKind::Grid, _) => Err(invalid()),
            (FieldKind::Date, FieldValue::Text(s)) => {
                NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|_| invalid())?;
                Ok(s.clone())
            }
            (FieldKind::Time, FieldValue::Text(s)) => {
                parse_time(s).ok_or_else(invalid)?;
                Ok(s.clone())
            }
            (FieldKind::Text, FieldValue::Text(s)) => Ok(s.clone()),
            _ => Err(invalid()),
        }
    }
}

/// Parses `HHMMSS` or `HHMM` time-of-day text.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    match raw.len() {
        6 => NaiveTime::parse_from_str(raw, "%H%M%S").ok(),
        4 => NaiveTime::parse_from_str(raw, "%H%M").ok(),
        _ => None,
    }
}

/// Validates a Maidenhead locator: field pair A-R, square pair 0-9, then an
/// optional subsquare pair a-x and optional extended digit pair.
pub fn is_grid(s: &str) -> bool {
    let b = s.as_bytes();
    if !matches!(b.len(), 4 | 6 | 8) {
        return false;
    }
    let field_ok = b[..2]
        .iter()
        .all(|c| c.to_ascii_uppercase().is_ascii_uppercase() && c.to_ascii_uppercase() <= b'R');
    let square_ok = b[2..4].iter().all(u8::is_ascii_digit);
    if !(field_ok && square_ok) {
        return false;
    }
    if b.len() >= 6 {
        let sub_ok = b[4..6]
            .iter()
            .all(|c| c.to_ascii_lowercase().is_ascii_lowercase() && c.to_ascii_lowercase() <= b'x');
        if !sub_ok {
            return false;
        }
    }
    if b.len() == 8 && !b[6..8].iter().all(u8::is_ascii_digit) {
        return false;
    }
    true
}
