//! # chatbridge Server
//!
//! REST surface over the helper bridge. Each endpoint is a thin caller of a
//! [`HelperClient`](chatbridge_helper::HelperClient) domain action; the
//! interesting semantics (correlation, timeouts, exactly-once resumption)
//! live in `chatbridge-helper`.

pub mod config;
pub mod routes;

pub use config::{BridgeConfig, ServerConfigError};
pub use routes::{build_router, AppState};
