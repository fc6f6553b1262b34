//! ⏱️ `Time`: the cluster's own little duration dialect.
//!
//! `"30s"`, `"1m"`, `"1.5h"`, `"-1"`, `"0"`. The server accepts these for every
//! `timeout`, `cluster_manager_timeout` and `scroll` parameter, and we accept them
//! in the config file too, because writing `request_timeout = 60000` is how
//! people end up with 60 second timeouts they thought were 60 milliseconds. 🦆

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// 📏 The units the server understands, smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanos,
    Micros,
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    // -- ordered so that multi-letter suffixes are tried before the single letters they end with
    const SUFFIXES: [(&'static str, TimeUnit); 7] = [
        ("nanos", TimeUnit::Nanos),
        ("micros", TimeUnit::Micros),
        ("ms", TimeUnit::Millis),
        ("d", TimeUnit::Days),
        ("h", TimeUnit::Hours),
        ("s", TimeUnit::Seconds),
        ("m", TimeUnit::Minutes),
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            TimeUnit::Nanos => "nanos",
            TimeUnit::Micros => "micros",
            TimeUnit::Millis => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }

    /// 🔢 How many nanoseconds fit in one of these.
    pub fn nanos(&self) -> u128 {
        match self {
            TimeUnit::Nanos => 1,
            TimeUnit::Micros => 1_000,
            TimeUnit::Millis => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60 * 1_000_000_000,
            TimeUnit::Hours => 60 * 60 * 1_000_000_000,
            TimeUnit::Days => 24 * 60 * 60 * 1_000_000_000,
        }
    }
}

/// ⏱️ A duration as the cluster spells it.
///
/// `MinusOne` means "no timeout / forever" on the server side, `Zero` means "don't wait".
/// Everything else is a (possibly fractional) factor of a unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Time {
    MinusOne,
    Zero,
    Value { factor: f64, unit: TimeUnit },
}

/// 💀 The string did not look like a duration. Not even squinting.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid time value '{input}': {reason}")]
pub struct TimeParseError {
    pub input: String,
    pub reason: &'static str,
}

impl Time {
    pub fn new(factor: f64, unit: TimeUnit) -> Self {
        if factor == 0.0 {
            Time::Zero
        } else {
            Time::Value { factor, unit }
        }
    }

    pub fn seconds(factor: f64) -> Self {
        Time::new(factor, TimeUnit::Seconds)
    }

    pub fn minutes(factor: f64) -> Self {
        Time::new(factor, TimeUnit::Minutes)
    }

    pub fn millis(factor: f64) -> Self {
        Time::new(factor, TimeUnit::Millis)
    }

    /// 🔄 Convert into a std `Duration`. `-1` has no finite equivalent, hence `None`.
    pub fn to_duration(&self) -> Option<Duration> {
        match self {
            Time::MinusOne => None,
            Time::Zero => Some(Duration::ZERO),
            Time::Value { factor, unit } => {
                let nanos = (factor * unit.nanos() as f64).round();
                Some(Duration::from_nanos(nanos as u64))
            }
        }
    }
}

impl FromStr for Time {
    type Err = TimeParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let input = raw.trim();
        let fail = |reason| TimeParseError {
            input: raw.to_string(),
            reason,
        };
        match input {
            "" => return Err(fail("empty string")),
            "-1" => return Ok(Time::MinusOne),
            "0" => return Ok(Time::Zero),
            _ => {}
        }

        let (number, unit) = TimeUnit::SUFFIXES
            .iter()
            .find_map(|(suffix, unit)| input.strip_suffix(suffix).map(|n| (n, *unit)))
            .ok_or_else(|| fail("missing unit (expected one of d, h, m, s, ms, micros, nanos)"))?;

        let factor: f64 = number
            .trim()
            .parse()
            .map_err(|_| fail("factor is not a number"))?;
        if !factor.is_finite() || factor < 0.0 {
            return Err(fail("factor must be a finite, non-negative number"));
        }
        Ok(Time::new(factor, unit))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Time::MinusOne => f.write_str("-1"),
            Time::Zero => f.write_str("0"),
            Time::Value { factor, unit } => {
                let (whole, unit) = whole_units(*factor, *unit);
                write!(f, "{}{}", whole, unit.suffix())
            }
        }
    }
}

/// 🪜 The server only takes whole numbers, so `1.5h` walks down the units until it
/// lands on one: `90m`. Whatever is still fractional at `nanos` gets rounded.
fn whole_units(factor: f64, unit: TimeUnit) -> (u64, TimeUnit) {
    const DESCENDING: [TimeUnit; 7] = [
        TimeUnit::Days,
        TimeUnit::Hours,
        TimeUnit::Minutes,
        TimeUnit::Seconds,
        TimeUnit::Millis,
        TimeUnit::Micros,
        TimeUnit::Nanos,
    ];
    DESCENDING
        .into_iter()
        .filter(|smaller| smaller.nanos() <= unit.nanos())
        .map(|smaller| (factor * (unit.nanos() / smaller.nanos()) as f64, smaller))
        .find(|(scaled, _)| scaled.fract() == 0.0)
        .map(|(scaled, smaller)| (scaled as u64, smaller))
        .unwrap_or_else(|| ((factor * unit.nanos() as f64).round() as u64, TimeUnit::Nanos))
}

impl From<Duration> for Time {
    /// 🎯 Picks the largest unit that represents the duration exactly, so
    /// `Duration::from_secs(120)` goes over the wire as `2m` and not `120000000000nanos`.
    fn from(duration: Duration) -> Self {
        let nanos = duration.as_nanos();
        if nanos == 0 {
            return Time::Zero;
        }
        let unit = [
            TimeUnit::Days,
            TimeUnit::Hours,
            TimeUnit::Minutes,
            TimeUnit::Seconds,
            TimeUnit::Millis,
            TimeUnit::Micros,
        ]
        .into_iter()
        .find(|unit| nanos % unit.nanos() == 0)
        .unwrap_or(TimeUnit::Nanos);
        Time::Value {
            factor: (nanos / unit.nanos()) as f64,
            unit,
        }
    }
}

impl TryFrom<&str> for Time {
    type Error = TimeParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimeVisitor;

        impl Visitor<'_> for TimeVisitor {
            type Value = Time;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a time value such as \"30s\", \"-1\" or a number of milliseconds")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Time, E> {
                v.parse().map_err(E::custom)
            }

            // -- bare numbers are milliseconds, same as the server does it
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Time, E> {
                match v {
                    -1 => Ok(Time::MinusOne),
                    v if v < 0 => Err(E::custom("negative time values other than -1 are invalid")),
                    v => Ok(Time::millis(v as f64)),
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Time, E> {
                Ok(Time::millis(v as f64))
            }
        }

        deserializer.deserialize_any(TimeVisitor)
    }
}
