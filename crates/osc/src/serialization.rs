//! 🦆 Serialization: the parts of JSON the cluster gets creative with.
//!
//! - [`error_cause`]: polymorphic server errors (`caused_by` turtles included)
//! - [`dates`]: epoch millis, ISO-8601, and the in-betweens, as `DateTime<Utc>`
//! - [`time`]: the `"30s"` / `"-1"` duration dialect
//!
//! Document sources are not converted here at all: `serde_json::value::RawValue`
//! lets `_source` pass through untouched when callers ask for it.

pub mod dates;
pub mod error_cause;
pub mod time;

pub use error_cause::{ErrorCause, ScriptPosition, ServerError, ShardFailure};
pub use time::{Time, TimeParseError, TimeUnit};
