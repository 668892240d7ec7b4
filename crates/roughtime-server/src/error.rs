// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Server-side error type.
//!
//! Public server APIs return `io::Result<T>`; internally errors are
//! [`ServerError`] variants converted via `From<ServerError> for io::Error`.
//! Callers who want programmatic matching can downcast through
//! `io::Error::get_ref()`.

use std::fmt;
use std::io;

use roughtime_proto::RoughtimeError;

/// Errors that can occur during Roughtime server operations.
#[derive(Debug)]
pub enum ServerError {
    /// A protocol failure from the core (parse, build, or mint).
    Protocol(RoughtimeError),
    /// Invalid server configuration.
    Config {
        /// What was wrong with the configuration.
        detail: String,
    },
    /// Underlying I/O error (socket bind, send/recv).
    Io(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Protocol(e) => write!(f, "roughtime protocol error: {e}"),
            ServerError::Config { detail } => write!(f, "roughtime server config error: {detail}"),
            ServerError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Protocol(e) => Some(e),
            ServerError::Io(e) => Some(e),
            ServerError::Config { .. } => None,
        }
    }
}

impl From<RoughtimeError> for ServerError {
    fn from(err: RoughtimeError) -> ServerError {
        ServerError::Protocol(err)
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> ServerError {
        ServerError::Io(err)
    }
}

impl From<ServerError> for io::Error {
    fn from(err: ServerError) -> io::Error {
        match err {
            ServerError::Io(e) => e,
            ServerError::Protocol(_) => io::Error::new(io::ErrorKind::InvalidData, err),
            ServerError::Config { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
        }
    }
}
