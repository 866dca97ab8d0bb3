// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! In-memory pipes and a scripted factory for unit tests.
//!
//! `MockPipe::pair()` builds two connected ends backed by shared byte
//! queues; reads block on a condvar until data arrives, the peer closes,
//! or an injected error fires. `MockFactory` hands out a fresh pair per
//! dial and keeps the peer ends so tests can drive the remote side.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{Error, Result};

use super::{Pipe, SocketKind, SocketUrl, Transport, TransportFactory};

// ============================================================================
// MockPipe
// ============================================================================

#[derive(Default)]
struct ChannelState {
    buf: VecDeque<u8>,
    closed: bool,
    fail_read: Option<io::ErrorKind>,
}

#[derive(Default)]
struct Channel {
    state: Mutex<ChannelState>,
    cond: Condvar,
}

impl Channel {
    fn push(&self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"));
        }
        state.buf.extend(data);
        self.cond.notify_all();
        Ok(())
    }

    fn pull(&self, out: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(kind) = state.fail_read.take() {
                return Err(io::Error::new(kind, "injected error"));
            }
            if !state.buf.is_empty() {
                let n = out.len().min(state.buf.len());
                for (i, byte) in state.buf.drain(..n).enumerate() {
                    out[i] = byte;
                }
                return Ok(n);
            }
            if state.closed {
                return Ok(0);
            }
            state = self.cond.wait(state).unwrap();
        }
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        self.cond.notify_all();
    }

    fn fail_read(&self, kind: io::ErrorKind) {
        let mut state = self.state.lock().unwrap();
        state.fail_read = Some(kind);
        self.cond.notify_all();
    }
}

/// One end of an in-memory duplex connection.
pub(crate) struct MockPipe {
    inc: Arc<Channel>,
    out: Arc<Channel>,
    label: String,
}

impl MockPipe {
    pub fn pair() -> (MockPipe, MockPipe) {
        let a_to_b = Arc::new(Channel::default());
        let b_to_a = Arc::new(Channel::default());
        let a = MockPipe {
            inc: b_to_a.clone(),
            out: a_to_b.clone(),
            label: "mock://client".into(),
        };
        let b = MockPipe {
            inc: a_to_b,
            out: b_to_a,
            label: "mock://server".into(),
        };
        (a, b)
    }

    /// Close both directions, as a dropped connection would.
    pub fn close(&self) {
        self.inc.close();
        self.out.close();
    }

    /// Make the peer's next read fail with `kind`.
    pub fn fail_peer_read(&self, kind: io::ErrorKind) {
        self.out.fail_read(kind);
    }

    /// Bytes queued for this end to read.
    pub fn pending(&self) -> usize {
        self.inc.state.lock().unwrap().buf.len()
    }
}

impl Read for MockPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inc.pull(buf)
    }
}

impl Write for MockPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.push(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Pipe for MockPipe {
    fn try_clone(&self) -> io::Result<Box<dyn Pipe>> {
        Ok(Box::new(MockPipe {
            inc: self.inc.clone(),
            out: self.out.clone(),
            label: self.label.clone(),
        }))
    }

    fn shutdown(&self) -> io::Result<()> {
        self.close();
        Ok(())
    }

    fn peer_label(&self) -> String {
        self.label.clone()
    }
}

// ============================================================================
// MockFactory
// ============================================================================

#[derive(Default)]
struct MockFactoryInner {
    peers: Mutex<Vec<MockPipe>>,
    dials: AtomicUsize,
    refuse_connect: AtomicBool,
}

/// Factory producing in-memory transports; keeps every peer end.
#[derive(Clone, Default)]
pub(crate) struct MockFactory {
    inner: Arc<MockFactoryInner>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `connect()` calls across all transports.
    pub fn dial_count(&self) -> usize {
        self.inner.dials.load(Ordering::SeqCst)
    }

    /// Refuse subsequent dial attempts.
    pub fn set_refuse(&self, refuse: bool) {
        self.inner.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    /// Peer end of the `i`-th successful dial.
    pub fn take_peer(&self, i: usize) -> MockPipe {
        let mut peers = self.inner.peers.lock().unwrap();
        assert!(i < peers.len(), "no dial #{}", i);
        peers.remove(i)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.peers.lock().unwrap().len()
    }
}

struct MockTransport {
    addr: SocketUrl,
    inner: Arc<MockFactoryInner>,
}

impl Transport for MockTransport {
    fn connect(&self) -> Result<Box<dyn Pipe>> {
        if self.inner.refuse_connect.load(Ordering::SeqCst) {
            return Err(Error::Refused(self.addr.url.clone()));
        }
        self.inner.dials.fetch_add(1, Ordering::SeqCst);
        let (client, server) = MockPipe::pair();
        self.inner.peers.lock().unwrap().push(server);
        Ok(Box::new(client))
    }

    fn address(&self) -> &SocketUrl {
        &self.addr
    }
}

impl TransportFactory for MockFactory {
    fn create_client(&self, addr: &SocketUrl) -> Result<Box<dyn Transport>> {
        if addr.kind() == SocketKind::Svc {
            return Err(Error::Unsupported(addr.url.clone()));
        }
        Ok(Box::new(MockTransport {
            addr: addr.clone(),
            inner: self.inner.clone(),
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn pair_moves_bytes_both_ways() {
        let (mut a, mut b) = MockPipe::pair();
        a.write_all(b"to-b").unwrap();
        let mut buf = [0u8; 4];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"to-b");

        b.write_all(b"to-a").unwrap();
        a.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"to-a");
    }

    #[test]
    fn read_blocks_until_data_or_close() {
        let (a, mut b) = MockPipe::pair();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 1];
            b.read(&mut buf)
        });
        a.write_all_helper(b"x");
        assert_eq!(handle.join().unwrap().unwrap(), 1);

        let (a, mut b) = MockPipe::pair();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 1];
            b.read(&mut buf)
        });
        a.close();
        assert_eq!(handle.join().unwrap().unwrap(), 0);
    }

    impl MockPipe {
        fn write_all_helper(&self, data: &[u8]) {
            self.out.push(data).unwrap();
        }
    }

    #[test]
    fn injected_error_reaches_blocked_reader() {
        let (a, mut b) = MockPipe::pair();
        let handle = thread::spawn(move || {
            let mut buf = [0u8; 1];
            b.read(&mut buf)
        });
        a.fail_peer_read(io::ErrorKind::ConnectionReset);
        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[test]
    fn factory_scripts_refusal_and_counts_dials() {
        let factory = MockFactory::new();
        let addr = SocketUrl::parse("tcp://127.0.0.1:9000").unwrap();

        let transport = factory.create_client(&addr).unwrap();
        factory.set_refuse(true);
        assert!(matches!(transport.connect(), Err(Error::Refused(_))));
        assert_eq!(factory.dial_count(), 0);

        factory.set_refuse(false);
        let _pipe = transport.connect().unwrap();
        assert_eq!(factory.dial_count(), 1);
        assert_eq!(factory.peer_count(), 1);
    }
}
