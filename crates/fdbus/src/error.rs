// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Error types for the client connection core.
//!
//! The public endpoint API never surfaces these (it reports failure as
//! `FDB_INVALID_ID`, see [`crate::client::Client`]); internal paths and the
//! transport layer propagate them with `?`.

use thiserror::Error;

use crate::parcel::DecodeError;

/// Errors produced by the connection core and its transports.
#[derive(Debug, Error)]
pub enum Error {
    /// The URL does not match the `domain://`, `tcp://` or `svc://` grammar.
    #[error("malformed url: {0}")]
    MalformedUrl(String),

    /// The transport kind cannot be dialed by this factory.
    #[error("unsupported transport: {0}")]
    Unsupported(String),

    /// The peer refused or the dial failed outright.
    #[error("connection refused: {0}")]
    Refused(String),

    /// Operation requires a live session.
    #[error("not connected")]
    NotConnected,

    /// The endpoint worker is no longer running.
    #[error("worker gone")]
    WorkerGone,

    /// A name-service parcelable failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error from the underlying byte pipe.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
