//! Client library for the Alveo virtual laboratory API.
//!
//! This crate authenticates against an Alveo service with an API key,
//! fetches item metadata and document content over HTTP, manages named
//! server-side item lists, and runs ad-hoc SPARQL queries. Read paths go
//! through a persistent local cache (metadata and document bytes, keyed by
//! URL) with cache-first semantics; mutating operations always go directly
//! to the server.
//!
//! # Modules
//!
//! - `cache`: persistent dual-namespace store for metadata and documents
//! - `client`: authenticated API client and request/cache orchestration
//! - `config`: client configuration and `alveo.config` credential loading
//! - `error`: crate-level error type
//! - `model`: lazy resource handles (`Item`, `Document`, `ItemList`)
//!
//! # Example
//!
//! ```no_run
//! use alveo::{Client, ClientConfig};
//!
//! # fn main() -> Result<(), alveo::AlveoError> {
//! let client = Client::with_config(ClientConfig::new().use_cache(true))?;
//! let item = client.get_item("https://app.alveo.edu.au/catalog/cooee/1-190");
//! let document = item.get_document(0)?;
//! let content = document.get_content()?;
//! println!("{} bytes", content.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod model;

pub use cache::{Cache, CacheError};
pub use client::Client;
pub use config::{ClientConfig, ConfigurationError, ResolvedConfig};
pub use error::AlveoError;
pub use model::{Document, Item, ItemList};
