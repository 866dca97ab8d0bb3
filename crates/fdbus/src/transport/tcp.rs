// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! TCP client transport.

use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Error, Result};

use super::{Pipe, SocketAddress, SocketUrl, Transport};

/// Dial target for `tcp://<host>:<port>` URLs.
pub struct TcpTransport {
    addr: SocketUrl,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(addr: SocketUrl, connect_timeout: Duration) -> Self {
        debug_assert!(matches!(addr.address, SocketAddress::Tcp { .. }));
        Self {
            addr,
            connect_timeout,
        }
    }
}

impl Transport for TcpTransport {
    fn connect(&self) -> Result<Box<dyn Pipe>> {
        let SocketAddress::Tcp { host, port } = &self.addr.address else {
            return Err(Error::Unsupported(self.addr.url.clone()));
        };

        let refused = |e: &dyn std::fmt::Display| Error::Refused(format!("{}: {}", self.addr.url, e));

        let target = (host.as_str(), *port)
            .to_socket_addrs()
            .map_err(|e| refused(&e))?
            .next()
            .ok_or_else(|| refused(&"no address"))?;

        let stream =
            TcpStream::connect_timeout(&target, self.connect_timeout).map_err(|e| refused(&e))?;
        stream.set_nodelay(true).ok();

        Ok(Box::new(stream))
    }

    fn address(&self) -> &SocketUrl {
        &self.addr
    }
}

impl Pipe for TcpStream {
    fn try_clone(&self) -> io::Result<Box<dyn Pipe>> {
        TcpStream::try_clone(self).map(|s| Box::new(s) as Box<dyn Pipe>)
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }

    fn peer_label(&self) -> String {
        match self.peer_addr() {
            Ok(addr) => format!("tcp://{}", addr),
            Err(_) => "tcp://<unknown>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn dial_refused_when_nobody_listens() {
        // Bind then drop to get a port that is very likely closed.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let addr = SocketUrl::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap();
        let transport = TcpTransport::new(addr, Duration::from_millis(500));
        assert!(matches!(transport.connect(), Err(Error::Refused(_))));
    }

    #[test]
    fn dial_and_exchange_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let addr = SocketUrl::parse(&format!("tcp://127.0.0.1:{}", port)).unwrap();

        let transport = TcpTransport::new(addr.clone(), Duration::from_secs(2));
        let mut pipe = transport.connect().unwrap();
        assert_eq!(transport.address(), &addr);

        let (mut server, _) = listener.accept().unwrap();
        pipe.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        // Reader clone sees data the server writes.
        let mut clone = pipe.try_clone().unwrap();
        server.write_all(b"pong").unwrap();
        clone.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");

        assert!(pipe.peer_label().starts_with("tcp://127.0.0.1:"));
    }
}
