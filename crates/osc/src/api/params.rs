//! 🎛️ Query strings: one bag of `key -> text`, filled through typed setters.
//!
//! The wire only knows strings. [`ToQueryValue`] is how a `bool`, a [`Time`], a [`Names`]
//! list or one of the string enums below becomes one.

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

use crate::api::route::Names;
use crate::serialization::Time;

/// 🔤 Anything that can sit on the right of `=` in a query string.
pub trait ToQueryValue {
    fn to_query_value(&self) -> String;
}

impl ToQueryValue for bool {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

macro_rules! display_query_value {
    ($($ty:ty),+) => {
        $(impl ToQueryValue for $ty {
            fn to_query_value(&self) -> String {
                self.to_string()
            }
        })+
    };
}

display_query_value!(i32, i64, u32, u64, usize, f64, String, Time, Names);

impl ToQueryValue for str {
    fn to_query_value(&self) -> String {
        self.to_string()
    }
}

impl<T: ToQueryValue> ToQueryValue for Vec<T> {
    fn to_query_value(&self) -> String {
        self.iter()
            .map(ToQueryValue::to_query_value)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<T: ToQueryValue + ?Sized> ToQueryValue for &T {
    fn to_query_value(&self) -> String {
        (**self).to_query_value()
    }
}

/// 🎒 The query-string bag. Sorted, so requests are reproducible in tests and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString(BTreeMap<String, String>);

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToQueryValue) {
        self.0.insert(key.into(), value.to_query_value());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// 🔍 Read a value back as a typed thing, when it parses as one.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key)?.parse().ok()
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.0.into_iter().collect()
    }
}

/// 🤷 A string that is not one of the values an enum knows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {kind}; expected one of: {expected}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

/// 🏭 A closed set of wire strings as a Rust enum, with serde, `Display`, `FromStr` and
/// [`ToQueryValue`] all agreeing on the spelling.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::api::params::UnknownVariant;

            fn from_str(value: &str) -> ::std::result::Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::api::params::UnknownVariant {
                        kind: stringify!($name),
                        value: value.to_string(),
                        expected: [$($text),+].join(", "),
                    }),
                }
            }
        }

        impl $crate::api::params::ToQueryValue for $name {
            fn to_query_value(&self) -> String {
                self.as_str().to_string()
            }
        }
    };
}

pub(crate) use string_enum;

string_enum!(
    /// 🃏 Which kinds of index a wildcard expression may expand to.
    ExpandWildcards {
        All => "all",
        Open => "open",
        Closed => "closed",
        Hidden => "hidden",
        None => "none",
    }
);

string_enum!(
    /// 🔬 Detail level of health and stats responses.
    Level {
        Cluster => "cluster",
        Indices => "indices",
        Shards => "shards",
        AwarenessAttributes => "awareness_attributes",
    }
);

string_enum!(HealthStatus {
    Green => "green",
    Yellow => "yellow",
    Red => "red",
});

string_enum!(
    /// 🔄 When changes become visible to search.
    Refresh {
        True => "true",
        False => "false",
        WaitFor => "wait_for",
    }
);

string_enum!(OpType {
    Index => "index",
    Create => "create",
});

string_enum!(VersionType {
    Internal => "internal",
    External => "external",
    ExternalGte => "external_gte",
    Force => "force",
});

string_enum!(
    /// 📏 Unit for byte values in cat output.
    Bytes {
        B => "b",
        K => "k",
        Kb => "kb",
        M => "m",
        Mb => "mb",
        G => "g",
        Gb => "gb",
        T => "t",
        Tb => "tb",
        P => "p",
        Pb => "pb",
    }
);

string_enum!(WaitForEvents {
    Immediate => "immediate",
    Urgent => "urgent",
    High => "high",
    Normal => "normal",
    Low => "low",
    Languid => "languid",
});

string_enum!(SortOrder {
    Asc => "asc",
    Desc => "desc",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_everything_becomes_a_string() {
        let mut query = QueryString::new();
        query.set("pretty", true);
        query.set("timeout", Time::seconds(30.0));
        query.set("index", Names::from(["a", "b"]));
        query.set("expand_wildcards", vec![ExpandWildcards::Open, ExpandWildcards::Hidden]);
        query.set("size", 10i64);
        query.set("refresh", Refresh::WaitFor);

        assert_eq!(query.get("pretty"), Some("true"));
        assert_eq!(query.get("timeout"), Some("30s"));
        assert_eq!(query.get("index"), Some("a,b"));
        assert_eq!(query.get("expand_wildcards"), Some("open,hidden"));
        assert_eq!(query.get_as::<i64>("size"), Some(10));
        assert_eq!(query.get_as::<Refresh>("refresh"), Some(Refresh::WaitFor));
        assert_eq!(query.get_as::<Time>("timeout"), Some(Time::seconds(30.0)));
        assert_eq!(
            query.into_pairs().first(),
            Some(&("expand_wildcards".to_string(), "open,hidden".to_string()))
        );
    }

    #[test]
    fn the_one_where_enums_spell_themselves_the_same_everywhere() {
        assert_eq!("wait_for".parse::<Refresh>().unwrap(), Refresh::WaitFor);
        assert_eq!(VersionType::ExternalGte.to_string(), "external_gte");
        assert_eq!(serde_json::to_string(&HealthStatus::Yellow).unwrap(), r#""yellow""#);
        let error = "purple".parse::<HealthStatus>().unwrap_err();
        assert_eq!(
            error.to_string(),
            "'purple' is not a valid HealthStatus; expected one of: green, yellow, red"
        );
        assert_eq!(SortOrder::ALL.len(), 2);
    }
}
