//! # 🔎 osc
//!
//! An OpenSearch client that assumes at least one of your nodes is having a bad day.
//!
//! ```no_run
//! # async fn demo() -> osc::Result<()> {
//! use osc::api::indices::CreateIndexRequest;
//!
//! let client = osc::Client::single_node("http://localhost:9200")?;
//! client.indices().create(CreateIndexRequest::new("logs")).await?;
//! # Ok(())
//! # }
//! ```
//!
//! - [`transport`]: node pools, retries, pings, sniffing, the audit trail
//! - [`api`]: typed requests and responses, one module per namespace
//! - [`client_config`]: Figment-loaded settings (`OSC_*` env + TOML)

pub mod api;
pub mod client;
pub mod client_config;
pub mod error;
pub mod serialization;
pub mod transport;

pub use client::Client;
pub use client_config::{ClientConfig, load_config};
pub use error::{Error, Result};
