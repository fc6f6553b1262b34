//! 🛣️ URL lookup tables and route values.
//!
//! Every operation owns a small static table of path templates, most specific first:
//!
//! ```text
//! /{index}/_search
//! /_search
//! ```
//!
//! A request carries a bag of route values (`index -> "logs"`). Resolution picks the
//! first template whose placeholders are *exactly* the keys in the bag, no more, no less.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

/// 📚 The templates of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlLookup {
    pub name: &'static str,
    pub paths: &'static [&'static str],
}

impl UrlLookup {
    pub const fn new(name: &'static str, paths: &'static [&'static str]) -> Self {
        Self { name, paths }
    }

    /// 🎯 Resolve into path segments (not yet percent-encoded; the transport does that).
    pub fn resolve(&self, route: &RouteValues) -> Result<Vec<String>> {
        let provided: BTreeSet<&str> = route.keys().collect();
        for path in self.paths {
            let placeholders: BTreeSet<&str> = template_segments(path)
                .filter_map(placeholder)
                .collect();
            if placeholders != provided {
                continue;
            }
            let segments = template_segments(path)
                .map(|segment| match placeholder(segment) {
                    Some(key) => route.get(key).unwrap_or_default().to_string(),
                    None => segment.to_string(),
                })
                .collect();
            return Ok(segments);
        }
        Err(Error::Route {
            api: self.name,
            provided: provided.into_iter().collect::<Vec<_>>().join(", "),
            candidates: self.paths.join(" | "),
        })
    }
}

fn template_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn placeholder(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

/// 🎒 Path parameter name -> value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteValues(BTreeMap<&'static str, String>);

impl RouteValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// ✍️ Set a value. Empty values are dropped, so an empty name list falls back to the
    /// template without that placeholder.
    pub fn set(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.0.remove(key);
        } else {
            self.0.insert(key, value);
        }
    }

    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 🏷️ One or more names (indices, nodes, repositories...), sent comma separated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names(Vec<String>);

impl Names {
    pub fn all() -> Self {
        Names(vec!["_all".to_string()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Names {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl From<&str> for Names {
    // -- "a,b" is two names, same as on the wire
    fn from(value: &str) -> Self {
        Names(
            value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl From<String> for Names {
    fn from(value: String) -> Self {
        Names::from(value.as_str())
    }
}

impl From<&String> for Names {
    fn from(value: &String) -> Self {
        Names::from(value.as_str())
    }
}

impl From<Vec<String>> for Names {
    fn from(value: Vec<String>) -> Self {
        Names(value)
    }
}

impl From<Vec<&str>> for Names {
    fn from(value: Vec<&str>) -> Self {
        Names(value.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Names {
    fn from(value: &[&str]) -> Self {
        Names(value.iter().map(|name| name.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(value: [&str; N]) -> Self {
        Names(value.iter().map(|name| name.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SEARCH: UrlLookup = UrlLookup::new("search", &["/{index}/_search", "/_search"]);
    static DOC: UrlLookup = UrlLookup::new("get", &["/{index}/_doc/{id}"]);

    #[test]
    fn the_one_where_the_most_specific_template_wins() {
        let route = RouteValues::new().with("index", "logs-*");
        assert_eq!(SEARCH.resolve(&route).unwrap(), vec!["logs-*", "_search"]);
        assert_eq!(SEARCH.resolve(&RouteValues::new()).unwrap(), vec!["_search"]);

        let route = RouteValues::new().with("index", Names::from(["a", "b"]).to_string());
        assert_eq!(SEARCH.resolve(&route).unwrap(), vec!["a,b", "_search"]);
    }

    #[test]
    fn the_one_where_missing_route_values_are_named_in_the_error() {
        let route = RouteValues::new().with("index", "logs");
        let error = DOC.resolve(&route).unwrap_err();
        assert_eq!(
            error.to_string(),
            "no url template of `get` accepts route values [index]; templates: /{index}/_doc/{id}"
        );
        let route = RouteValues::new().with("id", "1").with("index", "logs").with("extra", "x");
        assert!(DOC.resolve(&route).is_err(), "extra keys do not match either");
    }

    #[test]
    fn the_one_where_empty_values_do_not_count() {
        let route = RouteValues::new().with("index", Names::from("").to_string());
        assert!(route.is_empty());
        assert_eq!(SEARCH.resolve(&route).unwrap(), vec!["_search"]);
        assert_eq!(Names::from(" a, ,b ").to_string(), "a,b");
    }
}
