// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! One dial target of a client endpoint.
//!
//! A socket exclusively owns its transport and at most one live session.
//! When the bus context destroys the session, the socket decides between
//! plain disposal and a reconnect attempt; the decision is returned to the
//! dispatcher rather than acted on in place, so the socket never has to
//! remove itself from the endpoint while its own hook is running.

use std::sync::Arc;

use log::warn;

use crate::session::Session;
use crate::transport::{SocketUrl, Transport};
use crate::FdbSocketId;

/// Outcome of the session-deleted policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDeleted {
    /// Drop the socket; no retry.
    Dispose,
    /// Drop the socket and dial `url` again (transport fault with
    /// reconnection enabled).
    Reconnect { url: String },
}

/// A URL bound to an owned transport, dialed by one endpoint.
pub struct ClientSocket {
    socket_id: FdbSocketId,
    url: String,
    connected_host: String,
    transport: Option<Box<dyn Transport>>,
    session: Option<Arc<Session>>,
}

impl ClientSocket {
    pub(crate) fn new(
        socket_id: FdbSocketId,
        transport: Box<dyn Transport>,
        host_name: Option<&str>,
    ) -> ClientSocket {
        let url = transport.address().url.clone();
        ClientSocket {
            socket_id,
            url,
            connected_host: host_name.unwrap_or_default().to_string(),
            transport: Some(transport),
            session: None,
        }
    }

    pub fn socket_id(&self) -> FdbSocketId {
        self.socket_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Address metadata of the owned transport, if any.
    pub fn address(&self) -> Option<&SocketUrl> {
        self.transport.as_ref().map(|t| t.address())
    }

    /// Host name advertised by the name-service record that produced this
    /// socket; empty for direct dials.
    pub fn connected_host(&self) -> &str {
        &self.connected_host
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// Open the transport and wrap the pipe in a fresh session.
    ///
    /// The session is not attached yet; the endpoint links it after
    /// registration succeeds.
    pub(crate) fn connect(&self, endpoint: &str, max_message_size: usize) -> Option<Arc<Session>> {
        let transport = self.transport.as_ref()?;
        match transport.connect() {
            Ok(pipe) => Some(Session::new(
                self.socket_id,
                endpoint,
                pipe,
                max_message_size,
            )),
            Err(e) => {
                warn!("{}: dial {} failed: {}", endpoint, self.url, e);
                None
            }
        }
    }

    /// Record the connected session on this socket.
    pub(crate) fn attach_session(&mut self, session: Arc<Session>) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(session);
        true
    }

    /// Destroy the transport; the session-deleted path fires shortly after
    /// the reader observes the close.
    pub(crate) fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown();
        }
        self.transport = None;
    }

    /// Session-deleted policy.
    ///
    /// Retry only when the owner wants reconnection and the session died of
    /// a transport fault; an orderly close is final either way. The error
    /// flag is cleared on the doomed session before it goes away.
    pub(crate) fn on_session_deleted(
        &mut self,
        session: &Session,
        reconnect_enabled: bool,
    ) -> SessionDeleted {
        self.session = None;
        if reconnect_enabled && session.internal_error() {
            session.mark_internal_error(false);
            SessionDeleted::Reconnect {
                url: self.url.clone(),
            }
        } else {
            SessionDeleted::Dispose
        }
    }
}
