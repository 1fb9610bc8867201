//! Serde adapters for calendar values exchanged over the API.
//!
//! Dates travel as `YYYY-MM-DD` and wall-clock times as `HH:MM:SS`, matching what the
//! booking form and the admin screens send.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
pub const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");

pub mod iso_date {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(value: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = value.format(DATE_FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let text = String::deserialize(deserializer)?;
        Date::parse(text.trim(), DATE_FORMAT).map_err(D::Error::custom)
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
        use time::Date;

        use super::super::DATE_FORMAT;

        pub fn serialize<S: Serializer>(
            value: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(date) => {
                    let text = date.format(DATE_FORMAT).map_err(S::Error::custom)?;
                    serializer.serialize_some(&text)
                }
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let text = Option::<String>::deserialize(deserializer)?;
            match text.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => Date::parse(value, DATE_FORMAT)
                    .map(Some)
                    .map_err(D::Error::custom),
            }
        }
    }
}

pub mod clock_time {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::Time;

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(value: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        let text = value.format(TIME_FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_clock_time(&text).map_err(D::Error::custom)
    }
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(text: &str) -> Result<time::Time, time::error::Parse> {
    let trimmed = text.trim();
    if trimmed.len() == 5 {
        time::Time::parse(trimmed, format_description!("[hour]:[minute]"))
    } else {
        time::Time::parse(trimmed, TIME_FORMAT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::macros::{date, time};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Slot {
        #[serde(with = "iso_date")]
        day: time::Date,
        #[serde(with = "clock_time")]
        at: time::Time,
        #[serde(with = "iso_date::option", default)]
        until: Option<time::Date>,
    }

    #[test]
    fn calendar_values_use_plain_text_formats() {
        let slot = Slot {
            day: date!(2026 - 03 - 14),
            at: time!(14:30),
            until: None,
        };
        let json = serde_json::to_value(&slot).expect("serialize");
        assert_eq!(json["day"], "2026-03-14");
        assert_eq!(json["at"], "14:30:00");
        assert!(json["until"].is_null());
    }

    #[test]
    fn clock_time_accepts_minutes_only() {
        let parsed: Slot =
            serde_json::from_str(r#"{"day":"2026-03-14","at":"09:30","until":""}"#)
                .expect("deserialize");
        assert_eq!(parsed.at, time!(09:30));
        assert_eq!(parsed.until, None);
    }
}
