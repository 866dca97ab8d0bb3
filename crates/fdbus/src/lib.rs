// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! # FDB: distributed IPC/RPC message bus, client connection core
//!
//! Processes expose named services on the bus; clients address them by name
//! and the name resolves, transparently, to a concrete transport: a
//! Unix-domain socket for same-host peers or TCP for cross-host peers.
//! This crate is the client endpoint lifecycle: dialing, sessions,
//! supervised reconnection, and the name-service wire contract.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fdbus::{BusContext, Client, ClientConfig};
//!
//! let ctx = BusContext::new();
//! let client = Client::with_config(
//!     "svc.echo",
//!     ctx,
//!     ClientConfig::new().with_ns_url("tcp://127.0.0.1:60000"),
//! );
//!
//! // Direct dial...
//! let sid = client.connect(Some("tcp://10.0.0.1:9000"));
//!
//! // ...or symbolic: resolved through the name service.
//! client.connect(Some("svc://media"));
//!
//! client.disconnect(sid);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                       Client endpoint                        |
//! |   connect / disconnect / host_connected / security tokens    |
//! +--------------------------------------------------------------+
//! |                      Endpoint worker                         |
//! |   every state mutation is a job; callers block on hand-off   |
//! +--------------------------------------------------------------+
//! |   Socket (one per URL)  ->  Session (one per socket)         |
//! |   owns the transport        id, error flag, framed send      |
//! +--------------------------------------------------------------+
//! |                        Bus context                           |
//! |   session registry | reader threads | name-server connection |
//! +--------------------------------------------------------------+
//! |                    Transport factories                       |
//! |        domain://<path>   tcp://<host>:<port>   svc://<name>  |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Named client endpoint; the public façade |
//! | [`BusContext`] | Process-wide session registry and I/O host |
//! | [`ClientConfig`] | Reconnection policy, name-server URL, limits |
//! | [`transport::TransportFactory`] | Plug-in point for custom transports |
//! | [`name_service`] | Parcelables shared with other bus implementations |

/// Client endpoint façade and worker-side connection logic.
pub mod client;
/// Endpoint configuration.
pub mod config;
/// Process-wide session registry and I/O attachment.
pub mod context;
/// Error types.
pub mod error;
/// Session message framing.
pub mod frame;
/// Shared name-server connection.
mod name_client;
/// Name-service message codes and parcelables.
pub mod name_service;
/// Serialization primitives for parcelables.
pub mod parcel;
/// One live connection over a socket's transport.
pub mod session;
/// One dial target and its session-deleted policy.
pub mod socket;
/// URL grammar, pipe/transport capabilities, built-in factories.
pub mod transport;
/// Job bus with synchronous hand-off.
pub mod worker;

pub use client::Client;
pub use config::ClientConfig;
pub use context::BusContext;
pub use error::{Error, Result};
pub use frame::{Frame, FDB_SIDEBAND_AUTH};
pub use session::Session;
pub use socket::ClientSocket;

/// Bus-wide session identifier, assigned at registration.
pub type FdbSessionId = i32;

/// Socket identifier, unique within its owning endpoint.
pub type FdbSocketId = i32;

/// Placeholder for "no session" / "no socket"; also the argument that makes
/// [`Client::disconnect`] tear down the whole endpoint.
pub const FDB_INVALID_ID: i32 = -1;

/// True for ids actually assigned by the bus.
pub fn fdb_valid_id(id: i32) -> bool {
    id >= 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validity() {
        assert!(!fdb_valid_id(FDB_INVALID_ID));
        assert!(fdb_valid_id(0));
        assert!(fdb_valid_id(1));
        assert!(!fdb_valid_id(-2));
    }
}
