// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Unix-domain client transport for same-host peers.

use std::io;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::error::{Error, Result};

use super::{Pipe, SocketAddress, SocketUrl, Transport};

/// Dial target for `domain://<path>` URLs.
///
/// The path is taken relative to the filesystem root, so
/// `domain://run/fdb/echo` dials `/run/fdb/echo`.
pub struct UnixTransport {
    addr: SocketUrl,
}

impl UnixTransport {
    pub fn new(addr: SocketUrl) -> Self {
        debug_assert!(matches!(addr.address, SocketAddress::Domain { .. }));
        Self { addr }
    }

    fn socket_path(&self) -> Option<std::path::PathBuf> {
        match &self.addr.address {
            SocketAddress::Domain { path } => {
                let p = Path::new(path);
                if p.is_absolute() {
                    Some(p.to_path_buf())
                } else {
                    Some(Path::new("/").join(p))
                }
            }
            _ => None,
        }
    }
}

impl Transport for UnixTransport {
    fn connect(&self) -> Result<Box<dyn Pipe>> {
        let path = self
            .socket_path()
            .ok_or_else(|| Error::Unsupported(self.addr.url.clone()))?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| Error::Refused(format!("{}: {}", self.addr.url, e)))?;
        Ok(Box::new(stream))
    }

    fn address(&self) -> &SocketUrl {
        &self.addr
    }
}

impl Pipe for UnixStream {
    fn try_clone(&self) -> io::Result<Box<dyn Pipe>> {
        UnixStream::try_clone(self).map(|s| Box::new(s) as Box<dyn Pipe>)
    }

    fn shutdown(&self) -> io::Result<()> {
        UnixStream::shutdown(self, Shutdown::Both)
    }

    fn peer_label(&self) -> String {
        match self.peer_addr() {
            Ok(addr) => match addr.as_pathname() {
                Some(p) => format!("domain://{}", p.display()),
                None => "domain://<unnamed>".to_string(),
            },
            Err(_) => "domain://<unknown>".to_string(),
        }
    }
}
