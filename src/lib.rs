//! devlog library entrypoint.
//!
//! Modules:
//! - `app`: startup, configuration, shared state
//! - `codec`: extra-data encoding, namespaces and size bounding
//! - `db`: migrations, entry store and retention
//! - `http`: Axum router and handlers
//! - `logger`: producer-facing logging facade
//! - `models`: typed records used across layers
//! - `watchdog`: digest, report rendering and mail delivery
//! - `util`: helpers for tracing, HTML escaping and host resolution

pub mod app;
pub mod codec;
pub mod db;
pub mod error;
pub mod http;
pub mod logger;
pub mod models;
pub mod util;
pub mod watchdog;
