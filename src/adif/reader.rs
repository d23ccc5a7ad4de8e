use tracing::{debug, warn};

use crate::contact::ContactRecord;

use super::{AdifError, datetime, fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    Name,
    Length,
    Type,
    Value,
}

/// Pull parser over an ADIF byte stream.
///
/// Tags are `<name>` bare markers or `<name:length[:type]>value` where the
/// value is exactly `length` raw bytes, so `<` and `>` may appear inside
/// values. Names are case-folded to lowercase. The sequence of fields is
/// finite and not restartable.
#[derive(Debug)]
pub struct AdiReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> AdiReader<'a> {
    /// Wraps `data` positioned at the start.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads every remaining record.
    pub fn read_all(&mut self) -> Result<Vec<ContactRecord>, AdifError> {
        let mut records = Vec::new();
        while let Some(record) = self.read_next()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Assembles fields into the next committed record.
    ///
    /// Registered fields accumulate through their type rule; a bad value is
    /// skipped with a diagnostic. The bare `eor` marker commits the working
    /// record after date/time reconciliation; `eoh` discards it (header
    /// region is not data); unrecognized names are skipped.
    pub fn read_next(&mut self) -> Result<Option<ContactRecord>, AdifError> {
        let mut working = ContactRecord::new();

        loop {
            let Some((name, value)) = self.read_field()? else {
                return Ok(None);
            };

            if let Some(def) = fields::lookup(&name) {
                let Some(raw) = value else { continue };
                if raw.is_empty() {
                    continue;
                }
                match def.decode(&raw) {
                    Ok(decoded) => working.insert(def.record_key, decoded),
                    Err(err) => warn!(field = %name, ?err, "adif field value rejected"),
                }
            } else if name == "eor" {
                break;
            } else if name == "eoh" {
                working = ContactRecord::new();
            } else {
                debug!(field = %name, "unknown adif field");
            }
        }

        datetime::reconcile(&mut working);
        Ok(Some(working))
    }

    /// Tokenizes the next tag into `(lowercase name, value)`. Bare markers
    /// yield `None` values. Returns `Ok(None)` at a clean end of input and
    /// [`AdifError::UnterminatedTag`] when input ends inside a tag or short
    /// of a declared value length.
    fn read_field(&mut self) -> Result<Option<(String, Option<String>)>, AdifError> {
        let mut state = State::Scanning;
        let mut name = String::new();
        let mut length_digits = String::new();
        let mut value: Vec<u8> = Vec::new();
        let mut remaining: usize = 0;

        while self.pos < self.data.len() {
            let c = self.data[self.pos];

            match state {
                State::Scanning => {
                    if c == b'<' {
                        state = State::Name;
                    }
                }
                State::Name => match c {
                    b':' => state = State::Length,
                    b'>' => {
                        self.pos += 1;
                        return Ok(Some((name.to_ascii_lowercase(), None)));
                    }
                    _ => name.push(c as char),
                },
                State::Length => match c {
                    b':' => {
                        remaining = length_digits.parse().unwrap_or(0);
                        state = State::Type;
                    }
                    b'>' => {
                        remaining = length_digits.parse().unwrap_or(0);
                        state = State::Value;
                    }
                    _ => length_digits.push(c as char),
                },
                State::Type => {
                    // The declared type is ignored.
                    if c == b'>' {
                        state = State::Value;
                    }
                }
                State::Value => {
                    if remaining > 0 {
                        remaining -= 1;
                        value.push(c);
                    } else {
                        // Current byte belongs to the next tag.
                        return Ok(Some((
                            name.to_ascii_lowercase(),
                            Some(String::from_utf8_lossy(&value).into_owned()),
                        )));
                    }
                }
            }

            self.pos += 1;
        }

        match state {
            State::Scanning => Ok(None),
            State::Value if remaining == 0 => Ok(Some((
                name.to_ascii_lowercase(),
                Some(String::from_utf8_lossy(&value).into_owned()),
            ))),
            _ => Err(AdifError::UnterminatedTag),
        }
    }
}
