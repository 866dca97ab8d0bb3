// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Client endpoint: the public façade of the connection core.
//!
//! Every public operation hands off to the endpoint's worker and blocks
//! until the job ran; the worker owns all mutable endpoint state (socket
//! map, token set, cached service name). Session loss arrives as a job
//! posted by the session's reader thread, so teardown and the reconnect
//! supervisor run serialized with every other mutation.
//!
//! The public API reports failure as `FDB_INVALID_ID` and nothing else;
//! diagnostics go to the log. Callers that need richer signals watch the
//! bus event stream instead of the synchronous façade.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use log::{debug, error, warn};

use crate::config::ClientConfig;
use crate::context::{BusContext, SessionEvents};
use crate::error::{Error, Result};
use crate::frame::{Frame, FDB_SIDEBAND_AUTH, MSG_CLASS_APP, MSG_CLASS_SIDEBAND};
use crate::name_client::NsSubscription;
use crate::name_service::{FdbAuthentication, FdbMsgAddressList, FdbMsgTokens, CRYPTO_NONE};
use crate::parcel::Parcelable;
use crate::socket::{ClientSocket, SessionDeleted};
use crate::transport::{DefaultFactory, SocketAddress, SocketUrl, TransportFactory};
use crate::worker::Worker;
use crate::{fdb_valid_id, FdbSessionId, FdbSocketId, FDB_INVALID_ID};

/// Application frames delivered off the I/O loop.
type MessageHandler = Box<dyn Fn(FdbSessionId, u32, &[u8]) + Send + Sync>;

/// A named client endpoint on the bus.
///
/// Cheap to clone through its internal `Arc`; all clones share one worker
/// and one socket map.
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    name: String,
    ctx: Arc<BusContext>,
    factory: Arc<dyn TransportFactory>,
    worker: Worker,
    core: Mutex<ClientCore>,
    on_message: Mutex<Option<MessageHandler>>,
}

/// Worker-owned endpoint state. Only worker jobs lock it; the mutex is
/// uncontended by construction and ordering comes from the job queue.
struct ClientCore {
    config: ClientConfig,
    sockets: HashMap<FdbSocketId, ClientSocket>,
    tokens: Vec<String>,
    next_socket_id: FdbSocketId,
    ns_name: String,
    is_local: bool,
    registered: bool,
}

impl ClientCore {
    fn alloc_socket_id(&mut self) -> FdbSocketId {
        let skid = self.next_socket_id;
        self.next_socket_id += 1;
        skid
    }

    fn socket_by_url(&self, url: &str) -> Option<FdbSocketId> {
        self.sockets
            .iter()
            .find_map(|(skid, socket)| (socket.url() == url).then_some(*skid))
    }
}

fn lock_core(inner: &ClientInner) -> MutexGuard<'_, ClientCore> {
    match inner.core.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Client {
    /// Create an endpoint with default configuration and the built-in
    /// transports.
    pub fn new(name: &str, ctx: Arc<BusContext>) -> Client {
        Self::with_config(name, ctx, ClientConfig::default())
    }

    pub fn with_config(name: &str, ctx: Arc<BusContext>, config: ClientConfig) -> Client {
        let factory: Arc<dyn TransportFactory> =
            Arc::new(DefaultFactory::new(config.connect_timeout));
        Self::with_factory(name, ctx, config, factory)
    }

    /// Create an endpoint dialing through a caller-supplied factory.
    pub fn with_factory(
        name: &str,
        ctx: Arc<BusContext>,
        config: ClientConfig,
        factory: Arc<dyn TransportFactory>,
    ) -> Client {
        let ns_name = config.ns_name.clone();
        Client {
            inner: Arc::new(ClientInner {
                name: name.to_string(),
                ctx,
                factory,
                worker: Worker::spawn(name),
                core: Mutex::new(ClientCore {
                    config,
                    sockets: HashMap::new(),
                    tokens: Vec::new(),
                    next_socket_id: 0,
                    ns_name,
                    is_local: true,
                    registered: false,
                }),
                on_message: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn context(&self) -> &Arc<BusContext> {
        &self.inner.ctx
    }

    /// Dial `url`, or the default `svc://<ns_name>` target when `None`.
    ///
    /// Blocks until the worker finished the attempt. Returns the session id
    /// on success and `FDB_INVALID_ID` on any failure; symbolic targets
    /// resolve asynchronously and also report `FDB_INVALID_ID` here.
    pub fn connect(&self, url: Option<&str>) -> FdbSessionId {
        let inner = self.inner.clone();
        let url = url.map(str::to_string);
        self.inner
            .worker
            .post_and_wait(move || cb_connect(&inner, url))
            .unwrap_or(FDB_INVALID_ID)
    }

    /// Drop the socket behind `sid`. With `FDB_INVALID_ID`, drop every
    /// socket and unregister the endpoint from the bus context.
    pub fn disconnect(&self, sid: FdbSessionId) {
        let inner = self.inner.clone();
        let _ = self
            .inner
            .worker
            .post_and_wait(move || cb_disconnect(&inner, sid));
        if !fdb_valid_id(sid) {
            // Terminal teardown: let queued jobs drain before the caller
            // assumes nothing refers to the endpoint anymore.
            self.inner.worker.flush();
        }
    }

    /// True iff any socket was produced by a name-service record for
    /// `host`. Strict string equality.
    pub fn host_connected(&self, host: &str) -> bool {
        let inner = self.inner.clone();
        let host = host.to_string();
        self.inner
            .worker
            .post_and_wait(move || {
                let core = lock_core(&inner);
                core.sockets
                    .values()
                    .any(|socket| socket.connected_host() == host)
            })
            .unwrap_or(false)
    }

    /// Push the current token set as an authentication sideband message on
    /// every live session. No-op while the token set is empty.
    pub fn update_security_level(&self) {
        let inner = self.inner.clone();
        let _ = self.inner.worker.post_and_wait(move || {
            let core = lock_core(&inner);
            if core.tokens.is_empty() {
                return;
            }
            let auth = FdbAuthentication {
                token_list: Some(FdbMsgTokens {
                    crypto_algorithm: CRYPTO_NONE,
                    tokens: core.tokens.clone(),
                }),
            };
            let bytes = auth.encode();
            for socket in core.sockets.values() {
                if let Some(session) = socket.session() {
                    if let Err(e) = session.send(MSG_CLASS_SIDEBAND, FDB_SIDEBAND_AUTH, &bytes) {
                        warn!(
                            "{}: auth push on session {} failed: {}",
                            inner.name,
                            session.id(),
                            e
                        );
                    }
                }
            }
        });
    }

    /// Replace the endpoint's authentication tokens.
    pub fn set_tokens(&self, tokens: Vec<String>) {
        let inner = self.inner.clone();
        let _ = self.inner.worker.post_and_wait(move || {
            lock_core(&inner).tokens = tokens;
        });
    }

    pub fn enable_reconnect(&self, enabled: bool) {
        let inner = self.inner.clone();
        let _ = self.inner.worker.post_and_wait(move || {
            lock_core(&inner).config.reconnect_enabled = enabled;
        });
    }

    /// Whether the last resolution reported a same-host peer.
    pub fn is_local(&self) -> bool {
        let inner = self.inner.clone();
        self.inner
            .worker
            .post_and_wait(move || lock_core(&inner).is_local)
            .unwrap_or(true)
    }

    /// Send an application frame on a session.
    pub fn send(&self, sid: FdbSessionId, code: u32, payload: &[u8]) -> Result<()> {
        let session = self.inner.ctx.session(sid).ok_or(Error::NotConnected)?;
        session.send(MSG_CLASS_APP, code, payload)
    }

    /// Install the handler for received application frames. Runs on the
    /// session reader threads.
    pub fn set_message_handler<F>(&self, handler: F)
    where
        F: Fn(FdbSessionId, u32, &[u8]) + Send + Sync + 'static,
    {
        *self.inner.on_message.lock().unwrap_or_else(|p| p.into_inner()) =
            Some(Box::new(handler));
    }

    #[cfg(test)]
    pub(crate) fn sockets_snapshot(&self) -> Vec<SocketSnapshot> {
        let inner = self.inner.clone();
        self.inner
            .worker
            .post_and_wait(move || {
                let core = lock_core(&inner);
                core.sockets
                    .iter()
                    .map(|(skid, socket)| SocketSnapshot {
                        socket_id: *skid,
                        url: socket.url().to_string(),
                        connected_host: socket.connected_host().to_string(),
                        session_id: socket
                            .session()
                            .map(|s| s.id())
                            .unwrap_or(FDB_INVALID_ID),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SocketSnapshot {
    pub socket_id: FdbSocketId,
    pub url: String,
    pub connected_host: String,
    pub session_id: FdbSessionId,
}

impl Clone for Client {
    fn clone(&self) -> Self {
        Client {
            inner: self.inner.clone(),
        }
    }
}

// ============================================================================
// Worker-side operations
// ============================================================================

fn cb_connect(inner: &Arc<ClientInner>, url: Option<String>) -> FdbSessionId {
    let mut core = lock_core(inner);

    let url = match url.filter(|u| !u.is_empty()) {
        Some(u) => u,
        None => {
            if core.ns_name.is_empty() {
                error!(
                    "{}: connect without url and no default service name",
                    inner.name
                );
                return FDB_INVALID_ID;
            }
            format!("svc://{}", core.ns_name)
        }
    };

    let Some(skid) = do_connect(inner, &mut core, &url, None) else {
        return FDB_INVALID_ID;
    };

    match core.sockets.get(&skid).and_then(ClientSocket::session) {
        Some(session) => session.id(),
        None => {
            // The retry supervisor converges on the next session-deleted
            // event; the caller may also simply reissue connect.
            error!(
                "{}: socket for {} exists but no session is bound",
                inner.name, url
            );
            FDB_INVALID_ID
        }
    }
}

/// Resolve and dial one URL on the worker.
///
/// Symbolic (`svc://`) targets kick off an asynchronous name-service query
/// and return `None`; the reply re-enters this function with a concrete
/// URL. Dialing a URL that already has a socket is idempotent.
fn do_connect(
    inner: &Arc<ClientInner>,
    core: &mut ClientCore,
    url: &str,
    host_name: Option<&str>,
) -> Option<FdbSocketId> {
    let parsed = match SocketUrl::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("{}: {}", inner.name, e);
            return None;
        }
    };

    if let SocketAddress::Svc { name } = &parsed.address {
        let name = name.clone();
        request_service_address(inner, core, Some(&name));
        return None;
    }

    if let Some(skid) = core.socket_by_url(url) {
        return Some(skid);
    }

    let transport = match inner.factory.create_client(&parsed) {
        Ok(transport) => transport,
        Err(e) => {
            error!("{}: no transport for {}: {}", inner.name, url, e);
            return None;
        }
    };

    let skid = core.alloc_socket_id();
    let mut socket = ClientSocket::new(skid, transport, host_name);

    let Some(session) = socket.connect(&inner.name, core.config.max_message_size) else {
        return None;
    };

    let sid = inner.ctx.register_session(&session);
    if let Err(e) = inner.ctx.attach(&session, session_events(inner)) {
        error!("{}: cannot attach session {}: {}", inner.name, sid, e);
        inner.ctx.unregister_session(sid);
        session.shutdown();
        return None;
    }
    if !socket.attach_session(session.clone()) {
        inner.ctx.unregister_session(sid);
        session.shutdown();
        return None;
    }
    core.sockets.insert(skid, socket);

    if !core.registered {
        inner.ctx.register_endpoint(&inner.name);
        core.registered = true;
    }

    debug!("{}: session {} connected to {}", inner.name, sid, url);
    Some(skid)
}

fn cb_disconnect(inner: &Arc<ClientInner>, sid: FdbSessionId) {
    let mut core = lock_core(inner);
    do_disconnect(inner, &mut core, sid);
    if !fdb_valid_id(sid) && core.registered {
        inner.ctx.unregister_endpoint(&inner.name);
        core.registered = false;
    }
}

fn do_disconnect(inner: &Arc<ClientInner>, core: &mut ClientCore, sid: FdbSessionId) {
    if fdb_valid_id(sid) {
        let Some(session) = inner.ctx.session(sid) else {
            return;
        };
        let skid = session.socket_id();
        inner.ctx.unregister_session(sid);
        if let Some(mut socket) = core.sockets.remove(&skid) {
            socket.disconnect();
        }
    } else {
        for (_, mut socket) in core.sockets.drain() {
            let sid = socket.session().map(|s| s.id());
            if let Some(sid) = sid {
                inner.ctx.unregister_session(sid);
            }
            socket.disconnect();
        }
    }
}

fn session_events(inner: &Arc<ClientInner>) -> SessionEvents {
    let for_frames = Arc::downgrade(inner);
    let for_closed = Arc::downgrade(inner);
    SessionEvents {
        on_frame: Box::new(move |sid, frame| {
            if let Some(inner) = for_frames.upgrade() {
                handle_frame(&inner, sid, frame);
            }
        }),
        on_closed: Box::new(move |sid| {
            if let Some(inner) = for_closed.upgrade() {
                let job_inner = inner.clone();
                inner
                    .worker
                    .post(move || handle_session_closed(&job_inner, sid));
            }
        }),
    }
}

fn handle_frame(inner: &Arc<ClientInner>, sid: FdbSessionId, frame: Frame) {
    match frame.class {
        MSG_CLASS_APP => {
            let handler = inner.on_message.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(handler) = handler.as_ref() {
                handler(sid, frame.code, &frame.payload);
            }
        }
        MSG_CLASS_SIDEBAND => {
            debug!(
                "{}: sideband code {} on session {}",
                inner.name, frame.code, sid
            );
        }
        other => {
            debug!(
                "{}: ignoring frame class {} on session {}",
                inner.name, other, sid
            );
        }
    }
}

/// Runs on the worker when the I/O loop tore a session down.
///
/// Two-phase teardown: the socket's policy hook only returns a decision;
/// the socket is removed here, after the hook, and the supervisor runs
/// last so its retry re-enters a consistent endpoint.
fn handle_session_closed(inner: &Arc<ClientInner>, sid: FdbSessionId) {
    let mut core = lock_core(inner);

    let Some(session) = inner.ctx.session(sid) else {
        // An explicit disconnect already disposed the socket.
        inner.ctx.unregister_session(sid);
        return;
    };

    let skid = session.socket_id();
    let reconnect_enabled = core.config.reconnect_enabled;
    let decision = match core.sockets.get_mut(&skid) {
        Some(socket) => socket.on_session_deleted(&session, reconnect_enabled),
        None => {
            inner.ctx.unregister_session(sid);
            return;
        }
    };

    inner.ctx.unregister_session(sid);
    if let Some(mut socket) = core.sockets.remove(&skid) {
        socket.disconnect();
    }
    drop(session);

    match decision {
        SessionDeleted::Dispose => {
            debug!("{}: session {} disposed", inner.name, sid);
        }
        SessionDeleted::Reconnect { url } => supervise_reconnect(inner, &mut core, &url),
    }
}

/// Reconnect supervisor: prefer re-resolution through the name service,
/// fall back to dialing the last-known URL directly.
fn supervise_reconnect(inner: &Arc<ClientInner>, core: &mut ClientCore, url: &str) {
    if request_service_address(inner, core, None) {
        error!(
            "{}: shutdown due to IO error; requesting address from name server",
            inner.name
        );
        return;
    }

    let wait = core.config.reconnect_wait;
    if !wait.is_zero() {
        thread::sleep(wait);
    }

    if do_connect(inner, core, url, None).is_some() {
        error!(
            "{}: shutdown due to IO error but reconnected to {}@{}",
            inner.name, core.ns_name, url
        );
    } else {
        error!(
            "{}: shutdown due to IO error and failed to reconnect to {}@{}",
            inner.name, core.ns_name, url
        );
    }
}

/// Issue an asynchronous name-service query for `server_name` (or the
/// cached service name). True iff a resolution is in flight.
fn request_service_address(
    inner: &Arc<ClientInner>,
    core: &mut ClientCore,
    server_name: Option<&str>,
) -> bool {
    if let Some(name) = server_name {
        core.ns_name = name.to_string();
    }
    if core.ns_name.is_empty() {
        return false;
    }

    let weak = Arc::downgrade(inner);
    let sub = NsSubscription {
        endpoint: inner.name.clone(),
        deliver: Box::new(move |list| {
            if let Some(inner) = weak.upgrade() {
                let job_inner = inner.clone();
                inner.worker.post(move || on_service_online(&job_inner, list));
            }
        }),
    };

    let service = core.ns_name.clone();
    inner
        .ctx
        .request_service_address(&inner.factory, core.config.ns_url.as_deref(), &service, sub)
}

/// Runs on the worker when the name server published addresses for the
/// service this endpoint is seeking.
fn on_service_online(inner: &Arc<ClientInner>, list: FdbMsgAddressList) {
    let mut core = lock_core(inner);
    if list.service_name != core.ns_name {
        debug!(
            "{}: ignoring address list for {}",
            inner.name, list.service_name
        );
        return;
    }

    core.is_local = list.is_local;
    if let Some(tokens) = &list.token_list {
        core.tokens = tokens.tokens.clone();
    }

    for url in &list.address_list {
        if do_connect(inner, &mut core, url, Some(&list.host_name)).is_some() {
            debug!(
                "{}: resolved {} to {} on host {}",
                inner.name, list.service_name, url, list.host_name
            );
            return;
        }
    }
    warn!(
        "{}: no published address for {} was reachable",
        inner.name, list.service_name
    );
}

// ============================================================================
// Tests
// ============================================================================
