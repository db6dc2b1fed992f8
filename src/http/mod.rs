//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, /proxy route)
//!     → request.rs (x-request-id assignment and propagation)
//!     → relay subsystem (descriptor → outbound call → summary)
//!     → JSON summary or plain-text error to client
//! ```

pub mod request;
pub mod server;

pub use request::{request_id, X_REQUEST_ID};
pub use server::{AppState, HttpServer, RELAY_PATH};
