use tracing::warn;

use crate::contact::{ContactRecord, FieldValue};

use super::{datetime, fields};

/// ADIF format version written into the preamble.
const ADIF_VERSION: &str = "3.0.4";

/// Serializer for contact records.
///
/// Construction writes the preamble (format version plus program identity,
/// closed by `<EOH>`); each record then emits its fields through the
/// registry and a terminating `<EOR>`. Fields without a registry entry are
/// dropped with a diagnostic and never abort the rest of the record.
#[derive(Debug)]
pub struct AdiWriter {
    out: String,
}

impl AdiWriter {
    /// Starts a document identified by `program_id`/`program_version`.
    pub fn new(program_id: &str, program_version: Option<&str>) -> Self {
        let mut writer = Self {
            out: String::from("# wsjtx-relay adif export\n"),
        };
        writer.field("adif_ver", ADIF_VERSION);
        writer.field("programid", program_id);
        if let Some(version) = program_version {
            writer.field("programversion", version);
        }
        writer.out.push_str("<EOH>\n\n");
        writer
    }

    /// Serializes every record in order.
    pub fn write_all(&mut self, records: &[ContactRecord]) {
        for record in records {
            self.write_record(record);
        }
    }

    /// Serializes one record and its `<EOR>` terminator. Fields are emitted
    /// in sorted key order so output is deterministic.
    pub fn write_record(&mut self, record: &ContactRecord) {
        let mut pairs: Vec<(&str, &FieldValue)> = record.iter().collect();
        pairs.sort_unstable_by_key(|(key, _)| *key);
        for (key, value) in pairs {
            self.write_property(key, value);
        }
        self.out.push_str("<EOR>\n\n");
    }

    fn write_property(&mut self, key: &str, value: &FieldValue) {
        // Synthetic instants expand into their paired date+time fields
        // using UTC calendar components.
        if key == "start" || key == "end" {
            let Some(instant) = value.as_instant() else {
                warn!(field = %key, "expected instant value, field dropped");
                return;
            };
            if key == "start" {
                self.field("qso_date", &datetime::date_string(&instant));
                self.field("time_on", &datetime::time_string(&instant));
            } else {
                self.field("qso_date_off", &datetime::date_string(&instant));
                self.field("time_off", &datetime::time_string(&instant));
            }
            return;
        }

        // Bookkeeping keys serialize under the application namespace.
        let out_key = match key {
            "_id" => "app_wsjtxrelay_id",
            "_rev" => "app_wsjtxrelay_rev",
            other => other,
        };

        match fields::encode_field(out_key, value) {
            Ok(text) => self.field(out_key, &text),
            Err(err) => warn!(field = %out_key, ?err, "adif field dropped on write"),
        }
    }

    fn field(&mut self, name: &str, value: &str) {
        self.out.push('<');
        self.out.push_str(&name.to_ascii_uppercase());
        self.out.push(':');
        self.out.push_str(&value.len().to_string());
        self.out.push('>');
        self.out.push_str(value);
    }

    /// Finishes the document and returns the serialized text.
    pub fn into_string(self) -> String {
        self.out
    }
}
