// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Transport adapter layer.
//!
//! The connection core dials through three capabilities kept deliberately
//! small so alternative stacks can be plugged in:
//!
//! - [`Pipe`]: a connected byte stream (`Read + Write`) that can hand a
//!   clone to the context's reader thread.
//! - [`Transport`]: a parsed dial target that opens a [`Pipe`].
//! - [`TransportFactory`]: maps a parsed URL to a [`Transport`].
//!
//! URL grammar: `domain://<path>` (same-host), `tcp://<host>:<port>`
//! (cross-host), `svc://<service-name>` (symbolic; resolved through the
//! name service and never handed to a factory).

pub mod tcp;
#[cfg(unix)]
pub mod unix;

#[cfg(test)]
pub(crate) mod mock;

use std::io::{self, Read, Write};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// URL parsing
// ============================================================================

const SCHEME_DOMAIN: &str = "domain://";
const SCHEME_TCP: &str = "tcp://";
const SCHEME_SVC: &str = "svc://";

/// Transport kind selected by the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    /// Unix-domain socket, same-host peers.
    Domain,
    /// TCP, cross-host peers.
    Tcp,
    /// Symbolic service name, resolved through the name service.
    Svc,
}

/// Parsed dial target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketAddress {
    Domain { path: String },
    Tcp { host: String, port: u16 },
    Svc { name: String },
}

/// A URL together with its parsed address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketUrl {
    pub url: String,
    pub address: SocketAddress,
}

impl SocketUrl {
    /// Parse a bus URL. Anything outside the three schemes, or a scheme
    /// with an empty/ill-formed remainder, is [`Error::MalformedUrl`].
    pub fn parse(url: &str) -> Result<SocketUrl> {
        let malformed = || Error::MalformedUrl(url.to_string());

        let address = if let Some(path) = url.strip_prefix(SCHEME_DOMAIN) {
            if path.is_empty() {
                return Err(malformed());
            }
            SocketAddress::Domain {
                path: path.to_string(),
            }
        } else if let Some(rest) = url.strip_prefix(SCHEME_TCP) {
            let (host, port) = rest.rsplit_once(':').ok_or_else(malformed)?;
            if host.is_empty() {
                return Err(malformed());
            }
            let port: u16 = port.parse().map_err(|_| malformed())?;
            SocketAddress::Tcp {
                host: host.to_string(),
                port,
            }
        } else if let Some(name) = url.strip_prefix(SCHEME_SVC) {
            if name.is_empty() {
                return Err(malformed());
            }
            SocketAddress::Svc {
                name: name.to_string(),
            }
        } else {
            return Err(malformed());
        };

        Ok(SocketUrl {
            url: url.to_string(),
            address,
        })
    }

    pub fn kind(&self) -> SocketKind {
        match self.address {
            SocketAddress::Domain { .. } => SocketKind::Domain,
            SocketAddress::Tcp { .. } => SocketKind::Tcp,
            SocketAddress::Svc { .. } => SocketKind::Svc,
        }
    }

    /// Service name for symbolic targets.
    pub fn svc_name(&self) -> Option<&str> {
        match &self.address {
            SocketAddress::Svc { name } => Some(name),
            _ => None,
        }
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// A connected byte stream.
///
/// The session keeps the write half; the context's reader thread takes a
/// clone. `shutdown` must unblock a reader stuck in `read`.
pub trait Pipe: Read + Write + Send {
    fn try_clone(&self) -> io::Result<Box<dyn Pipe>>;

    fn shutdown(&self) -> io::Result<()>;

    /// Short peer description for logs.
    fn peer_label(&self) -> String;
}

/// One dial target bound to a concrete transport kind.
pub trait Transport: Send {
    /// Open a client pipe to the peer.
    fn connect(&self) -> Result<Box<dyn Pipe>>;

    /// The address this transport dials.
    fn address(&self) -> &SocketUrl;
}

/// Maps parsed URLs to transports.
pub trait TransportFactory: Send + Sync {
    fn create_client(&self, addr: &SocketUrl) -> Result<Box<dyn Transport>>;
}

// ============================================================================
// Default factory
// ============================================================================

/// Factory dispatching on the URL scheme to the built-in transports.
pub struct DefaultFactory {
    connect_timeout: Duration,
}

impl DefaultFactory {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl TransportFactory for DefaultFactory {
    fn create_client(&self, addr: &SocketUrl) -> Result<Box<dyn Transport>> {
        match &addr.address {
            SocketAddress::Tcp { .. } => Ok(Box::new(tcp::TcpTransport::new(
                addr.clone(),
                self.connect_timeout,
            ))),
            #[cfg(unix)]
            SocketAddress::Domain { .. } => {
                Ok(Box::new(unix::UnixTransport::new(addr.clone())))
            }
            _ => Err(Error::Unsupported(addr.url.clone())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
