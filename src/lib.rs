//! # Venuedesk
//!
//! Multi-tenant booking backend: staff sessions, role policy, license serial
//! issuance and tenant-owned events. Usable both as a standalone binary and as
//! a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! venuedesk = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use venuedesk::config::ServiceConfig;
//! use venuedesk::server::{AppState, create_router};
//! use venuedesk::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/venuedesk.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), ServiceConfig::default()));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `venuedesk` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod license;
pub mod server;
pub mod store;
pub mod types;
