//! 📅 Date helpers for `#[serde(with = "...")]`.
//!
//! The cluster is inconsistent about dates in a very consistent way: `*_in_millis`
//! fields are epoch milliseconds, `*_time` fields are ISO-8601 strings, some plugins
//! send epoch millis as *strings*, and mapping-driven fields can be bare `yyyy-MM-dd`.
//! These modules turn all of that into `DateTime<Utc>` and back again without losing
//! the milliseconds on the round trip.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// 🔧 Parse any of the shapes listed in the module docs from a string.
pub fn parse_flexible(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(millis) = trimmed.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(with_offset.with_timezone(&Utc));
    }
    // -- no offset means UTC, that's what the server assumes too
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// 📝 The one true output format: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_rfc3339(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

struct FlexibleVisitor;

impl Visitor<'_> for FlexibleVisitor {
    type Value = DateTime<Utc>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("epoch milliseconds or an ISO-8601 date string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Utc.timestamp_millis_opt(v)
            .single()
            .ok_or_else(|| E::custom(format!("epoch millis {v} out of range")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("epoch millis out of range"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        self.visit_i64(v.round() as i64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_flexible(v).ok_or_else(|| E::custom(format!("unrecognised date '{v}'")))
    }
}

/// 🕰️ `DateTime<Utc>` ⇄ epoch milliseconds (`i64`).
pub mod epoch_millis {
    use super::*;

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(date.timestamp_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        deserializer.deserialize_any(FlexibleVisitor)
    }
}

/// 🕰️ Same as [`epoch_millis`] but for `Option<DateTime<Utc>>`; pair it with `#[serde(default)]`.
pub mod epoch_millis_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&date.timestamp_millis()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        deserializer.deserialize_option(OptionVisitor)
    }
}

/// 🌀 Accepts whatever the server throws at us, writes RFC 3339 back.
pub mod flexible {
    use super::*;

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_rfc3339(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        deserializer.deserialize_any(FlexibleVisitor)
    }
}

/// 🌀 [`flexible`], optional edition.
pub mod flexible_opt {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&format_rfc3339(date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        deserializer.deserialize_option(OptionVisitor)
    }
}

struct OptionVisitor;

impl<'de> Visitor<'de> for OptionVisitor {
    type Value = Option<DateTime<Utc>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an optional date")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(FlexibleVisitor).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Stamped {
        #[serde(with = "epoch_millis")]
        start_time_in_millis: DateTime<Utc>,
        #[serde(with = "flexible")]
        start_time: DateTime<Utc>,
        #[serde(default, with = "epoch_millis_opt")]
        end_time_in_millis: Option<DateTime<Utc>>,
        #[serde(default, with = "flexible_opt")]
        end_time: Option<DateTime<Utc>>,
    }

    #[test]
    fn the_one_where_millis_survive_the_round_trip() {
        let raw = r#"{"start_time_in_millis":1700000000123,"start_time":"2023-11-14T22:13:20.123Z","end_time_in_millis":null}"#;
        let parsed: Stamped = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.start_time_in_millis, parsed.start_time);
        assert_eq!(parsed.start_time_in_millis.timestamp_subsec_millis(), 123);
        assert_eq!(parsed.end_time_in_millis, None);
        assert_eq!(parsed.end_time, None);

        let written = serde_json::to_value(&parsed).unwrap();
        assert_eq!(written["start_time_in_millis"], 1_700_000_000_123i64);
        assert_eq!(written["start_time"], "2023-11-14T22:13:20.123Z");

        let again: Stamped = serde_json::from_value(written).unwrap();
        assert_eq!(again, parsed);
    }

    #[test]
    fn the_one_where_every_dialect_is_understood() {
        let expected = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        for raw in [
            "2024-02-29",
            "2024-02-29T00:00:00",
            "2024-02-29T00:00:00.000",
            "2024-02-29T00:00:00Z",
            "2024-02-29T02:00:00+02:00",
            "1709164800000",
        ] {
            assert_eq!(parse_flexible(raw), Some(expected), "parsing {raw}");
        }
        assert_eq!(parse_flexible("last tuesday"), None);
    }

    #[test]
    fn the_one_where_millis_arrive_as_strings() {
        let raw = r#"{"start_time_in_millis":"1700000000000","start_time":1700000000000,"end_time":"2023-11-14T22:13:20Z"}"#;
        let parsed: Stamped = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.start_time, parsed.start_time_in_millis);
        assert_eq!(parsed.end_time, Some(parsed.start_time));
    }
}
