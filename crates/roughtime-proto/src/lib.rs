// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime protocol core: wire format, version dispatch, Merkle batching,
//! and Ed25519 signature machinery.
//!
//! Roughtime (draft-ietf-ntp-roughtime) is an authenticated coarse time
//! protocol. A client sends a random nonce; the server answers with a signed
//! midpoint/radius pair and a Merkle path proving the client's request was
//! covered by that single signature. This crate implements the pieces a
//! client and a server share, across the Google-era wire format (version 0)
//! and IETF drafts 1 through 15:
//!
//! - the tag-value message codec and the `ROUGHTIM` packet envelope ([`wire`])
//! - the version-compatibility policy table ([`version`])
//! - the SHA-512 Merkle tree engine with batch path emission ([`merkle`])
//! - Ed25519 signing with context prefixes and the SRV server-identifier
//!   hash ([`crypto`])
//! - delegation certificates ([`cert`]), signed-response payloads and the
//!   per-version response layouts ([`response`])
//! - request construction and parsing ([`request`])
//! - the full client-side validation pipeline ([`verify`])
//!
//! The crate is synchronous and pure given its inputs: no I/O, no logging,
//! no shared mutable state. Sockets live in `roughtime-client` and
//! `roughtime-server`.
//!
//! # Example
//!
//! ```
//! use roughtime_proto::request::{make_request, RequestOptions};
//!
//! let built = make_request(&RequestOptions::default()).unwrap();
//! assert_eq!(built.bytes.len(), 1024 + 12); // 1024-byte message + envelope
//! ```

#![warn(missing_docs)]

pub mod cert;
pub mod crypto;
pub mod error;
pub mod merkle;
pub mod request;
pub mod response;
pub mod tag;
pub mod verify;
pub mod version;
pub mod wire;

pub use error::{RequestProblem, RoughtimeError};
pub use tag::Tag;
pub use verify::{Exchange, VerifiedTime};
pub use version::Version;
