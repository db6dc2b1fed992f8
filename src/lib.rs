//! JSON-described HTTP request relay.
//!
//! A caller posts `{method, url, headers}` to `/proxy`; the relay performs
//! that request against the target, records the descriptor under a fresh
//! UUID, and answers with `{id, status, headers, length}` describing the
//! upstream response.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
