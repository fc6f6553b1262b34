//! # 🗺️ THE API SURFACE
//!
//! Three moving parts per operation:
//!
//! 1. a static [`UrlLookup`] with the operation's path templates,
//! 2. a request struct (built by [`endpoint!`]) that fills a [`RouteValues`] bag through its
//!    constructor and a [`QueryString`] bag through typed setters (built by [`query_params!`]),
//! 3. a method on a namespace (`client.indices().create(..)`) that hands the request to
//!    [`Transport::perform`](crate::transport::Transport::perform) and decodes the answer.
//!
//! Required path parameters are constructor arguments, so a request that reaches the
//! transport always has a template that fits it. 🧩

use reqwest::Method;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::transport::{Body, RequestConfig, TransportRequest};

/// 🏗️ Declares a request struct wired to a url table.
///
/// `endpoint!(Name, GET, TABLE)` for a fixed verb, or `endpoint!(Name, fn pick, TABLE)` where
/// `pick: fn(&RequestParts) -> Method` decides per request (PUT with an id, POST without...).
macro_rules! endpoint {
    (@common $(#[$meta:meta])* $name:ident, $urls:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            parts: $crate::api::RequestParts,
        }

        #[allow(dead_code)]
        impl $name {
            fn blank() -> Self {
                Self {
                    parts: $crate::api::RequestParts::default(),
                }
            }

            fn route(mut self, key: &'static str, value: impl ::std::fmt::Display) -> Self {
                self.parts.route.set(key, value.to_string());
                self
            }
        }

        impl $crate::api::Parameters for $name {
            fn parts_mut(&mut self) -> &mut $crate::api::RequestParts {
                &mut self.parts
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, fn $pick:path, $urls:expr) => {
        endpoint!(@common $(#[$meta])* $name, $urls);

        impl $crate::api::Endpoint for $name {
            fn method(&self) -> ::reqwest::Method {
                $pick(&self.parts)
            }

            fn urls(&self) -> &'static $crate::api::UrlLookup {
                &$urls
            }

            fn into_parts(self) -> $crate::api::RequestParts {
                self.parts
            }
        }
    };
    ($(#[$meta:meta])* $name:ident, $method:ident, $urls:expr) => {
        endpoint!(@common $(#[$meta])* $name, $urls);

        impl $crate::api::Endpoint for $name {
            fn method(&self) -> ::reqwest::Method {
                ::reqwest::Method::$method
            }

            fn urls(&self) -> &'static $crate::api::UrlLookup {
                &$urls
            }

            fn into_parts(self) -> $crate::api::RequestParts {
                self.parts
            }
        }
    };
}

/// 🎛️ Typed query-string setters. `name: Type` sends `name=...`; `name as "wire": Type`
/// renames it (for keywords and the `_source_*` family).
macro_rules! query_params {
    (@key $setter:ident $key:literal) => {
        $key
    };
    (@key $setter:ident) => {
        stringify!($setter)
    };
    ($name:ident { $($setter:ident $(as $key:literal)? : $ty:ty),* $(,)? }) => {
        #[allow(dead_code)]
        impl $name {
            $(
                pub fn $setter(mut self, value: impl Into<$ty>) -> Self {
                    let value: $ty = value.into();
                    self.parts.query.set(query_params!(@key $setter $($key)?), value);
                    self
                }
            )*
        }
    };
}

/// 📦 Adds `.body(&T)` to a request that carries JSON.
macro_rules! json_body {
    ($($name:ident),+ $(,)?) => {
        $(impl $name {
            pub fn body<T: ::serde::Serialize + ?Sized>(mut self, body: &T) -> Self {
                self.parts.set_json(body);
                self
            }
        })+
    };
}

/// 🐣 `Default` for requests whose `new()` takes nothing.
macro_rules! default_via_new {
    ($($name:ident),+ $(,)?) => {
        $(impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        })+
    };
}

pub mod common;
pub mod params;
pub mod route;

pub mod bulk;
pub mod cat;
pub mod cluster;
pub mod indices;
pub mod ingest;
pub mod ml;
pub mod nodes;
pub mod notifications;
pub mod observability;
pub mod root;
pub mod sm;
pub mod snapshot;

pub use params::{
    Bytes, ExpandWildcards, HealthStatus, Level, OpType, QueryString, Refresh, SortOrder,
    ToQueryValue, UnknownVariant, VersionType, WaitForEvents,
};
pub use route::{Names, RouteValues, UrlLookup};

/// 🧩 Everything a request knows before it meets a node.
#[derive(Debug, Default)]
pub struct RequestParts {
    pub route: RouteValues,
    pub query: QueryString,
    /// serialization is deferred so that setters stay infallible; errors surface when sent
    pub body: Option<std::result::Result<Body, serde_json::Error>>,
    pub config: Option<RequestConfig>,
}

impl RequestParts {
    pub(crate) fn set_json<T: Serialize + ?Sized>(&mut self, body: &T) {
        self.body = Some(Body::json(body));
    }

    pub(crate) fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// 🎛️ The request config, created on first touch.
    pub(crate) fn config_mut(&mut self) -> &mut RequestConfig {
        self.config.get_or_insert_with(RequestConfig::default)
    }
}

/// 🎯 One operation of the REST API.
pub trait Endpoint {
    fn method(&self) -> Method;
    fn urls(&self) -> &'static UrlLookup;
    fn into_parts(self) -> RequestParts;
}

/// 🎛️ Parameters every endpoint accepts.
pub trait Parameters: Sized {
    fn parts_mut(&mut self) -> &mut RequestParts;

    /// pretty-print the response JSON
    fn pretty(mut self, pretty: bool) -> Self {
        self.parts_mut().query.set("pretty", pretty);
        self
    }

    /// human-readable sizes and durations next to the raw numbers
    fn human(mut self, human: bool) -> Self {
        self.parts_mut().query.set("human", human);
        self
    }

    /// stack traces in error responses
    fn error_trace(mut self, error_trace: bool) -> Self {
        self.parts_mut().query.set("error_trace", error_trace);
        self
    }

    /// trim the response down to the listed paths, e.g. `hits.hits._id`
    fn filter_path(mut self, filter_path: impl Into<Names>) -> Self {
        self.parts_mut().query.set("filter_path", filter_path.into());
        self
    }

    /// the request body as a query parameter, for clients that can't send GET bodies
    fn source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.parts_mut().query.set("source", source);
        self.parts_mut().query.set("source_content_type", "application/json");
        self
    }

    /// 🔓 Any query parameter, for the ones without a typed setter.
    fn param(mut self, key: impl Into<String>, value: impl ToQueryValue) -> Self {
        self.parts_mut().query.set(key, value);
        self
    }

    fn request_config(mut self, config: RequestConfig) -> Self {
        self.parts_mut().config = Some(config);
        self
    }
}

/// 🔁 GET without a body, POST with one. For search-like calls.
pub(crate) fn get_or_post(parts: &RequestParts) -> Method {
    if parts.has_body() {
        Method::POST
    } else {
        Method::GET
    }
}

/// 🆔 PUT when the caller picked the id, POST when the server should.
pub(crate) fn put_with_id(parts: &RequestParts) -> Method {
    if parts.route.get("id").is_some() {
        Method::PUT
    } else {
        Method::POST
    }
}

/// 🧭 Resolve an endpoint into a transport request.
pub(crate) fn into_request<E: Endpoint>(endpoint: E) -> Result<TransportRequest> {
    let method = endpoint.method();
    let urls = endpoint.urls();
    let parts = endpoint.into_parts();
    let segments = urls.resolve(&parts.route)?;
    let mut request = TransportRequest::from_segments(method, segments);
    request.query = parts.query.into_pairs();
    request.body = parts.body.transpose().map_err(Error::Body)?;
    if let Some(config) = parts.config {
        request.config = config;
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::Time;
    use crate::transport::RequestPath;

    static THINGS: UrlLookup = UrlLookup::new("things.put", &["/{index}/_thing/{id}", "/{index}/_thing"]);

    endpoint!(
        /// a request that only exists in this test
        PutThing, fn put_with_id, THINGS
    );

    impl PutThing {
        fn new(index: &str) -> Self {
            Self::blank().route("index", index)
        }

        fn id(self, id: &str) -> Self {
            self.route("id", id)
        }
    }

    query_params!(PutThing {
        timeout: Time,
        op_type: OpType,
        source_includes as "_source_includes": Names,
        size: i64,
    });

    json_body!(PutThing);

    #[test]
    fn the_one_where_the_macros_build_a_working_request() {
        let request = PutThing::new("my things")
            .id("1")
            .timeout(Time::seconds(5.0))
            .op_type(OpType::Create)
            .source_includes("a,b")
            .size(3)
            .pretty(true)
            .body(&serde_json::json!({"x": 1}));
        let request = into_request(request).unwrap();

        assert_eq!(request.method, Method::PUT);
        assert_eq!(
            request.path,
            RequestPath::Segments(vec!["my things".into(), "_thing".into(), "1".into()])
        );
        assert_eq!(
            request.query,
            vec![
                ("_source_includes".to_string(), "a,b".to_string()),
                ("op_type".to_string(), "create".to_string()),
                ("pretty".to_string(), "true".to_string()),
                ("size".to_string(), "3".to_string()),
                ("timeout".to_string(), "5s".to_string()),
            ]
        );
        assert_eq!(request.body.unwrap().content_type(), "application/json");

        let request = into_request(PutThing::new("things")).unwrap();
        assert_eq!(request.method, Method::POST);
    }

    #[test]
    fn the_one_where_a_body_that_cannot_serialize_fails_at_send_time() {
        let mut broken = std::collections::HashMap::new();
        broken.insert(vec![1u8], "keys must be strings");
        let request = PutThing::new("things").body(&broken);
        assert!(matches!(into_request(request), Err(Error::Body(_))));
    }
}
