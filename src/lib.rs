/// frontdoor - static site and API gateway front door
///
/// This crate provides an HTTP server that:
/// - Serves a bundled static site
/// - Relays `/api` requests to backends chosen from an endpoint table
/// - Reloads the endpoint table when its file changes
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::adapters::file_system::{DiskAssets, EmbeddedAssets};
pub use crate::adapters::http::server::HyperServer;
pub use crate::adapters::http_client::HyperHttpClient;
pub use crate::adapters::http_handler::HyperHandler;
pub use crate::core::{EndpointStore, ProxyService};
