use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::contact::{ContactRecord, FieldValue};

use super::fields::parse_time;

/// Folds the paired `qso_date`/`time_on` and `qso_date_off`/`time_off`
/// components of a freshly committed record into single `start` and `end`
/// UTC instants. The component fields are removed once folded; fields that
/// fail to combine are left in place untouched.
pub fn reconcile(record: &mut ContactRecord) {
    let date_on = record.text("qso_date").map(str::to_owned);
    let date_off = record.text("qso_date_off").map(str::to_owned);

    if let Some(date) = &date_on {
        let time = record.text("time_on").unwrap_or("000000").to_owned();
        if let Some(start) = parse_instant(date, &time) {
            record.remove("qso_date");
            record.remove("time_on");
            record.insert("start", FieldValue::Instant(start));
        }
    }

    // The end date falls back to the start date when the record only
    // carries a time_off.
    if let Some(time) = record.text("time_off").map(str::to_owned) {
        let date = date_off.clone().or(date_on);
        if let Some(end) = date.as_deref().and_then(|d| parse_instant(d, &time)) {
            record.remove("qso_date_off");
            record.remove("time_off");
            record.insert("end", FieldValue::Instant(end));
        }
    }
}

/// Combines `YYYYMMDD` date text and `HHMMSS` time text into a UTC instant.
pub fn parse_instant(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let time = parse_time(time)?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

/// UTC calendar date of `t` as `YYYYMMDD`.
pub fn date_string(t: &DateTime<Utc>) -> String {
    t.format("%Y%m%d").to_string()
}

/// UTC time of day of `t` as `HHMMSS`.
pub fn time_string(t: &DateTime<Utc>) -> String {
    t.format("%H%M%S").to_string()
}
