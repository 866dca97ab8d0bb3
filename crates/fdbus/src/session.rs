// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! One live connection over a socket's transport.
//!
//! A session is an inert carrier: it records that the transport faulted
//! (`internal_error`) but never decides reconnection. The socket's
//! session-deleted policy consumes the flag after the I/O loop tears the
//! session down.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::transport::Pipe;
use crate::{FdbSessionId, FdbSocketId, FDB_INVALID_ID};

/// One bound connection, identified bus-wide once registered.
pub struct Session {
    sid: AtomicI32,
    socket_id: FdbSocketId,
    endpoint: String,
    internal_error: AtomicBool,
    max_message_size: usize,
    pipe: Mutex<Box<dyn Pipe>>,
}

impl Session {
    pub(crate) fn new(
        socket_id: FdbSocketId,
        endpoint: &str,
        pipe: Box<dyn Pipe>,
        max_message_size: usize,
    ) -> Arc<Session> {
        Arc::new(Session {
            sid: AtomicI32::new(FDB_INVALID_ID),
            socket_id,
            endpoint: endpoint.to_string(),
            internal_error: AtomicBool::new(false),
            max_message_size,
            pipe: Mutex::new(pipe),
        })
    }

    /// Assigned session id, or `FDB_INVALID_ID` before registration.
    pub fn id(&self) -> FdbSessionId {
        self.sid.load(Ordering::SeqCst)
    }

    pub(crate) fn set_id(&self, sid: FdbSessionId) {
        self.sid.store(sid, Ordering::SeqCst);
    }

    /// The socket this session is bound to (relation, not ownership).
    pub fn socket_id(&self) -> FdbSocketId {
        self.socket_id
    }

    /// Owning endpoint name, for diagnostics.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Set by the I/O loop on an unrecoverable read/write fault.
    pub fn mark_internal_error(&self, faulted: bool) {
        self.internal_error.store(faulted, Ordering::SeqCst);
    }

    /// Distinguishes transport failure from orderly disconnect.
    pub fn internal_error(&self) -> bool {
        self.internal_error.load(Ordering::SeqCst)
    }

    pub(crate) fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Write one framed message.
    ///
    /// A write fault marks the session internal-error and shuts the pipe so
    /// the reader thread observes the failure and starts teardown.
    pub fn send(&self, class: u8, code: u32, payload: &[u8]) -> Result<()> {
        let frame = Frame::new(class, code, payload.to_vec());
        let bytes = frame.encode();
        let mut pipe = match self.pipe.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match pipe.write_all(&bytes).and_then(|_| pipe.flush()) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.mark_internal_error(true);
                let _ = pipe.shutdown();
                Err(Error::Io(e))
            }
        }
    }

    /// Clone of the pipe for the context's reader thread.
    pub(crate) fn reader_pipe(&self) -> io::Result<Box<dyn Pipe>> {
        let pipe = match self.pipe.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pipe.try_clone()
    }

    /// Close the transport; unblocks the reader thread.
    pub(crate) fn shutdown(&self) {
        let pipe = match self.pipe.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = pipe.shutdown();
    }

    pub(crate) fn peer_label(&self) -> String {
        let pipe = match self.pipe.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pipe.peer_label()
    }
}
