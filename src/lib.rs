//! Starbucks Provider
//!
//! An infrastructure provider plugin that manages Starbucks stores, staff,
//! menu items, inventory and promotions through the Starbucks Management API.
//!
//! The host runtime starts the `starbucks-provider` binary as a subprocess,
//! reads the handshake line from stdout and drives the provider over gRPC.
//!
//! # Resources
//!
//! | Type | API collection |
//! |------|----------------|
//! | `starbucks_store` | `/stores` |
//! | `starbucks_employee` | `/employees` |
//! | `starbucks_menu_item` | `/menu_items` |
//! | `starbucks_inventory` | `/inventory` |
//! | `starbucks_promotion` | `/promotions` |
//!
//! # Data Sources
//!
//! - `starbucks_store`: one store by `id`
//! - `starbucks_stores`: every store, as a `stores` list
//!
//! # Provider Configuration
//!
//! | Attribute | Default |
//! |-----------|---------|
//! | `api_key` | `STARBUCKS_API_KEY` environment variable |
//! | `endpoint` | `https://api.starbucks.com/v1` |
//! | `region` | `us-west-2` |
//! | `timeout` | `30` (seconds) |
//!
//! # Handshake Protocol
//!
//! ```text
//! STARBUCKS_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `STARBUCKS_PROVIDER|<protocol_version>|<address>`
//!
//! # Embedding
//!
//! ```ignore
//! use starbucks_provider::{serve, StarbucksProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), starbucks_provider::ServeError> {
//!     starbucks_provider::init_logging(false);
//!     serve(StarbucksProvider::new(env!("CARGO_PKG_VERSION"))).await
//! }
//! ```

#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::{ApiClient, ClientConfig};
pub use config::ProviderConfig;
pub use error::{ClientError, ProviderError};
pub use logging::{init_logging, try_init_logging};
pub use provider::StarbucksProvider;
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, serve_with_shutdown,
    ProviderService, ServeError, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::{is_valid, validate, validate_result};
