// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Session framing.
//!
//! Every message on a session travels as one frame:
//!
//! ```text
//! +---------+---------+----------+------------------+
//! | len u32 | class u8| code u32 | payload          |
//! +---------+---------+----------+------------------+
//! ```
//!
//! `len` counts everything after itself (class + code + payload), all
//! integers little-endian. The class byte keeps sideband traffic from
//! interleaving with application payloads on the same pipe.

use std::io::{self, Read};

/// Application payload.
pub const MSG_CLASS_APP: u8 = 0;
/// Out-of-band control traffic (authentication).
pub const MSG_CLASS_SIDEBAND: u8 = 1;
/// Name-server requests and notifications.
pub const MSG_CLASS_NAME_SERVER: u8 = 2;

/// Sideband channel id for authentication pushes.
pub const FDB_SIDEBAND_AUTH: u32 = 0;

/// Bytes of class + code that `len` covers in addition to the payload.
const FRAME_OVERHEAD: usize = 5;

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub class: u8,
    pub code: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(class: u8, code: u32, payload: Vec<u8>) -> Self {
        Self {
            class,
            code,
            payload,
        }
    }

    /// Encode including the length prefix.
    pub fn encode(&self) -> Vec<u8> {
        let len = (FRAME_OVERHEAD + self.payload.len()) as u32;
        let mut buf = Vec::with_capacity(4 + len as usize);
        buf.extend_from_slice(&len.to_le_bytes());
        buf.push(self.class);
        buf.extend_from_slice(&self.code.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Read one frame from a blocking stream.
    ///
    /// Returns `Ok(None)` when the peer closed the pipe before the next
    /// length prefix (orderly shutdown). Any other short read, an undersized
    /// length, or a length above `max_size` is an error; the caller treats
    /// those as transport faults.
    pub fn read_from(r: &mut impl Read, max_size: usize) -> io::Result<Option<Frame>> {
        let mut len_buf = [0u8; 4];
        match r.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len < FRAME_OVERHEAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame length {} below minimum", len),
            ));
        }
        if len > max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame length {} exceeds limit {}", len, max_size),
            ));
        }

        let mut head = [0u8; FRAME_OVERHEAD];
        r.read_exact(&mut head)?;
        let class = head[0];
        let code = u32::from_le_bytes([head[1], head[2], head[3], head[4]]);

        let mut payload = vec![0u8; len - FRAME_OVERHEAD];
        r.read_exact(&mut payload)?;

        Ok(Some(Frame {
            class,
            code,
            payload,
        }))
    }
}
