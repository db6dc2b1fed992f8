//! Request relay subsystem.
//!
//! # Data Flow
//! ```text
//! inbound body bytes
//!     → types.rs (decode RequestDescriptor, require method + url)
//!     → fresh UUID v4 id
//!     → store.rs (record id → descriptor, write-only)
//!     → client.rs (build outbound request, execute, drain body)
//!     → ResponseSummary { id, status, headers, length }
//! ```
//!
//! # Design Decisions
//! - One linear pass per call; every failure ends the call
//! - The descriptor is recorded before the outbound call is attempted, so
//!   failed calls leave an entry too
//! - Upstream body bytes are counted and dropped, never forwarded

pub mod client;
pub mod error;
pub mod store;
pub mod types;

use uuid::Uuid;

pub use client::{UpstreamClient, UpstreamResponse};
pub use error::RelayError;
pub use store::RequestStore;
pub use types::{RequestDescriptor, ResponseSummary};

/// Performs relayed calls against a shared client and store.
#[derive(Debug, Clone)]
pub struct Relay {
    client: UpstreamClient,
    store: RequestStore,
}

impl Relay {
    pub fn new(client: UpstreamClient, store: RequestStore) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &RequestStore {
        &self.store
    }

    /// Run one call from raw descriptor bytes to summary.
    pub async fn handle(&self, body: &[u8]) -> Result<ResponseSummary, RelayError> {
        let descriptor = RequestDescriptor::decode(body)?;

        let id = Uuid::new_v4();
        self.store.record(id, descriptor.clone());

        tracing::debug!(
            relay_id = %id,
            method = %descriptor.method,
            url = %descriptor.url,
            headers = descriptor.headers.len(),
            "Relaying request"
        );

        let request = self.client.build_request(&descriptor)?;
        let upstream = self.client.execute(request).await?;

        tracing::debug!(
            relay_id = %id,
            status = upstream.status,
            length = upstream.length,
            "Upstream responded"
        );

        Ok(ResponseSummary {
            id: id.to_string(),
            status: upstream.status,
            headers: upstream.headers,
            length: upstream.length,
        })
    }
}
