// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Process-wide bus context.
//!
//! Owns the session-id allocator, a weak index of live sessions, the
//! registry of endpoint names, and the shared name-server connection.
//! "Attaching" a session to the context starts its reader thread: the
//! context's I/O scheduler is one blocking reader per session, each feeding
//! frames and the closed notification back to the owning endpoint.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;

use log::{debug, warn};

use crate::error::Result;
use crate::frame::Frame;
use crate::name_client::{NameClient, NsSubscription};
use crate::session::Session;
use crate::transport::TransportFactory;
use crate::{FdbSessionId, FDB_INVALID_ID};

/// Callbacks a session's reader feeds into the owning endpoint.
///
/// Both run off the endpoint's worker; implementations post jobs rather
/// than touching endpoint state.
pub(crate) struct SessionEvents {
    pub on_frame: Box<dyn Fn(FdbSessionId, Frame) + Send>,
    pub on_closed: Box<dyn Fn(FdbSessionId) + Send>,
}

/// Registry of sessions and endpoints, shared by every endpoint in the
/// process.
pub struct BusContext {
    sessions: Mutex<HashMap<FdbSessionId, Weak<Session>>>,
    endpoints: Mutex<HashSet<String>>,
    next_session_id: AtomicI32,
    ns: Mutex<Option<Arc<NameClient>>>,
}

fn recover<'a, T>(lock: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("{} lock poisoned, recovering", what);
            poisoned.into_inner()
        }
    }
}

impl BusContext {
    pub fn new() -> Arc<BusContext> {
        Arc::new(BusContext {
            sessions: Mutex::new(HashMap::new()),
            endpoints: Mutex::new(HashSet::new()),
            next_session_id: AtomicI32::new(0),
            ns: Mutex::new(None),
        })
    }

    // ------------------------------------------------------------------
    // Session index
    // ------------------------------------------------------------------

    /// Assign the next session id and index the session weakly.
    pub(crate) fn register_session(&self, session: &Arc<Session>) -> FdbSessionId {
        let sid = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        session.set_id(sid);
        recover(&self.sessions, "session index").insert(sid, Arc::downgrade(session));
        sid
    }

    pub(crate) fn unregister_session(&self, sid: FdbSessionId) {
        recover(&self.sessions, "session index").remove(&sid);
    }

    /// Look up a live session by id.
    pub fn session(&self, sid: FdbSessionId) -> Option<Arc<Session>> {
        if sid == FDB_INVALID_ID {
            return None;
        }
        recover(&self.sessions, "session index")
            .get(&sid)
            .and_then(Weak::upgrade)
    }

    /// Number of indexed sessions (dead weak entries included until
    /// unregistered).
    pub fn session_count(&self) -> usize {
        recover(&self.sessions, "session index").len()
    }

    /// Start the reader thread for a registered session.
    pub(crate) fn attach(&self, session: &Arc<Session>, events: SessionEvents) -> Result<()> {
        let mut pipe = session.reader_pipe()?;
        let session = session.clone();
        let sid = session.id();
        thread::Builder::new()
            .name(format!("fdb-io-{}", sid))
            .spawn(move || {
                let max = session.max_message_size();
                loop {
                    match Frame::read_from(&mut pipe, max) {
                        Ok(Some(frame)) => (events.on_frame)(sid, frame),
                        Ok(None) => {
                            debug!("session {} closed by peer", sid);
                            break;
                        }
                        Err(e) => {
                            warn!(
                                "session {} ({}) read failed: {}",
                                sid,
                                session.peer_label(),
                                e
                            );
                            session.mark_internal_error(true);
                            break;
                        }
                    }
                }
                (events.on_closed)(sid);
            })
            .map_err(crate::error::Error::Io)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Endpoint registry
    // ------------------------------------------------------------------

    pub(crate) fn register_endpoint(&self, name: &str) -> bool {
        recover(&self.endpoints, "endpoint registry").insert(name.to_string())
    }

    pub(crate) fn unregister_endpoint(&self, name: &str) {
        recover(&self.endpoints, "endpoint registry").remove(name);
    }

    /// True while `name` has dialed successfully and not finally
    /// disconnected.
    pub fn endpoint_registered(&self, name: &str) -> bool {
        recover(&self.endpoints, "endpoint registry").contains(name)
    }

    // ------------------------------------------------------------------
    // Name service
    // ------------------------------------------------------------------

    /// Issue an asynchronous service query on the shared name-server
    /// connection, dialing it first if needed.
    ///
    /// Returns true iff a resolution is in flight. A missing `ns_url` or a
    /// dead, un-redialable connection reports false so callers can fall
    /// back to direct reconnection.
    pub(crate) fn request_service_address(
        &self,
        factory: &Arc<dyn TransportFactory>,
        ns_url: Option<&str>,
        service: &str,
        sub: NsSubscription,
    ) -> bool {
        let Some(url) = ns_url else {
            return false;
        };

        let mut guard = recover(&self.ns, "name client");
        if guard.as_ref().is_some_and(|ns| !ns.alive()) {
            *guard = None;
        }
        if guard.is_none() {
            match NameClient::dial(factory.as_ref(), url) {
                Ok(ns) => *guard = Some(Arc::new(ns)),
                Err(e) => {
                    warn!("name server unreachable at {}: {}", url, e);
                    return false;
                }
            }
        }
        guard
            .as_ref()
            .map(|ns| ns.query_service(service, sub))
            .unwrap_or(false)
    }
}
