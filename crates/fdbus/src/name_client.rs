// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Client side of the shared name-server connection.
//!
//! One connection per process serves every endpoint (the bus context owns
//! it). Endpoints subscribe to a service name; when the name server
//! publishes an address list for that service the subscription callback
//! runs on the name-client reader thread and hands the work to the
//! endpoint's worker.
//!
//! Malformed replies are dropped and logged; they never tear the
//! connection down and never crash the process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, error, warn};

use crate::error::{Error, Result};
use crate::frame::{Frame, MSG_CLASS_NAME_SERVER};
use crate::name_service::{
    FdbMsgAddressList, FdbMsgHostAddressList, FdbMsgHostInfo, FdbMsgServerName, NsMsgCode,
};
use crate::parcel::Parcelable;
use crate::transport::{Pipe, SocketKind, SocketUrl, TransportFactory};

/// Frames above this size from the name server are protocol errors.
const NS_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// A pending interest in one service name.
pub(crate) struct NsSubscription {
    /// Endpoint name; a re-subscription from the same endpoint replaces
    /// the previous one.
    pub endpoint: String,
    /// Runs on the name-client reader thread; must hand off, not block.
    pub deliver: Box<dyn Fn(FdbMsgAddressList) + Send + Sync>,
}

type SubscriptionMap = HashMap<String, Vec<NsSubscription>>;

/// Shared connection to the name server.
pub(crate) struct NameClient {
    pipe: Mutex<Box<dyn Pipe>>,
    alive: Arc<AtomicBool>,
    subs: Arc<Mutex<SubscriptionMap>>,
}

impl NameClient {
    /// Dial the name server and start the reader thread.
    pub fn dial(factory: &dyn TransportFactory, ns_url: &str) -> Result<NameClient> {
        let addr = SocketUrl::parse(ns_url)?;
        if addr.kind() == SocketKind::Svc {
            return Err(Error::Unsupported(ns_url.to_string()));
        }

        let transport = factory.create_client(&addr)?;
        let pipe = transport.connect()?;
        let reader = pipe.try_clone()?;

        let alive = Arc::new(AtomicBool::new(true));
        let subs: Arc<Mutex<SubscriptionMap>> = Arc::new(Mutex::new(HashMap::new()));

        {
            let alive = alive.clone();
            let subs = subs.clone();
            thread::Builder::new()
                .name("fdb-ns".to_string())
                .spawn(move || read_loop(reader, alive, subs))
                .map_err(Error::Io)?;
        }

        debug!("name server connected at {}", ns_url);
        Ok(NameClient {
            pipe: Mutex::new(pipe),
            alive,
            subs,
        })
    }

    /// False once the connection died; the context re-dials lazily.
    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Subscribe `sub` to `service` and send the query.
    ///
    /// Returns true iff a resolution is now in flight.
    pub fn query_service(&self, service: &str, sub: NsSubscription) -> bool {
        if !self.alive() {
            return false;
        }

        {
            let mut subs = match self.subs.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let list = subs.entry(service.to_string()).or_default();
            list.retain(|existing| existing.endpoint != sub.endpoint);
            list.push(sub);
        }

        let payload = FdbMsgServerName {
            name: service.to_string(),
        }
        .encode();
        let frame = Frame::new(
            MSG_CLASS_NAME_SERVER,
            NsMsgCode::ReqQueryService as u32,
            payload,
        );

        let mut pipe = match self.pipe.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match pipe.write_all(&frame.encode()).and_then(|_| pipe.flush()) {
            Ok(()) => true,
            Err(e) => {
                warn!("name server query for {} failed: {}", service, e);
                self.alive.store(false, Ordering::SeqCst);
                let _ = pipe.shutdown();
                false
            }
        }
    }
}

impl Drop for NameClient {
    fn drop(&mut self) {
        // Socket-level shutdown reaches the reader's clone as well.
        self.alive.store(false, Ordering::SeqCst);
        let pipe = match self.pipe.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = pipe.shutdown();
    }
}

fn read_loop(mut pipe: Box<dyn Pipe>, alive: Arc<AtomicBool>, subs: Arc<Mutex<SubscriptionMap>>) {
    loop {
        match Frame::read_from(&mut pipe, NS_MAX_MESSAGE_SIZE) {
            Ok(Some(frame)) => dispatch(&frame, &subs),
            Ok(None) => {
                debug!("name server closed the connection");
                break;
            }
            Err(e) => {
                warn!("name server read failed: {}", e);
                break;
            }
        }
    }
    alive.store(false, Ordering::SeqCst);
}

fn dispatch(frame: &Frame, subs: &Mutex<SubscriptionMap>) {
    if frame.class != MSG_CLASS_NAME_SERVER {
        debug!("ignoring non-name-server frame class {}", frame.class);
        return;
    }

    match NsMsgCode::from_u32(frame.code) {
        Some(NsMsgCode::NtfServiceOnline)
        | Some(NsMsgCode::NtfServiceOnlineInterMachine)
        | Some(NsMsgCode::NtfMoreAddress) => {
            let list = match FdbMsgAddressList::decode(&frame.payload) {
                Ok(list) => list,
                Err(e) => {
                    error!("dropping malformed service-online notification: {}", e);
                    return;
                }
            };
            if list.address_list.is_empty() {
                debug!("service {} has no addresses yet", list.service_name);
                return;
            }
            let subs = match subs.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(waiters) = subs.get(&list.service_name) {
                for waiter in waiters {
                    (waiter.deliver)(list.clone());
                }
            }
        }
        Some(NsMsgCode::NtfHostOnlineLocal) => match FdbMsgHostAddressList::decode(&frame.payload)
        {
            Ok(hosts) => debug!("{} host(s) online", hosts.address_list.len()),
            Err(e) => error!("dropping malformed host-online notification: {}", e),
        },
        Some(NsMsgCode::NtfHostInfo) => match FdbMsgHostInfo::decode(&frame.payload) {
            Ok(info) => debug!("host info: {}", info.name),
            Err(e) => error!("dropping malformed host-info notification: {}", e),
        },
        other => {
            debug!("ignoring name server message code {:?}", other);
        }
    }
}
