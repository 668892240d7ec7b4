// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Signed response payloads and response assembly.
//!
//! The SREP is the only signed region of a response; everything else (the
//! Merkle index and path, the certificate, the echoed nonce) hangs off it
//! unsigned. Its schema moved across versions:
//!
//! | Version | SREP tags |
//! |---|---|
//! | classic | `ROOT, MIDP, RADI` |
//! | drafts 1–2 | `ROOT, MIDP, RADI, NONC` |
//! | drafts 3–11 | `ROOT, MIDP, RADI` |
//! | draft 12 / rfc | `VER, RADI, MIDP, VERS, ROOT` |
//!
//! Drafts 1–2 placing the nonce *inside* the signed payload is what makes
//! them unbatchable: one signature can then only ever cover one request.
//!
//! Top-level response layouts are in [`assemble_response`]; the builder
//! emits canonical tag order, so the layouts are tag sets.

use crate::crypto::SigningKey;
use crate::error::RoughtimeError;
use crate::tag::Tag;
use crate::version::Version;
use crate::wire::{encode_u32_list, MessageBuilder};

/// Default server radius, in seconds.
pub const DEFAULT_RADIUS_SECONDS: u32 = 10;

/// The `TYPE` value carried in responses.
pub const RESPONSE_TYPE: u32 = 1;

/// Inputs to [`build_srep`].
#[derive(Clone, Copy, Debug)]
pub struct SrepParams<'a> {
    /// The negotiated version; decides the schema.
    pub version: Version,
    /// Merkle tree root covering the batch.
    pub root: &'a [u8],
    /// Midpoint timestamp, in the version's unit.
    pub midpoint: u64,
    /// Radius, in the version's unit. Must be positive.
    pub radius: u32,
    /// The request nonce; required by (and only by) drafts 1–2.
    pub nonce: Option<&'a [u8]>,
    /// The versions the server advertises (current draft only).
    pub supported_versions: &'a [u32],
}

/// Build the signed response payload for the given version.
pub fn build_srep(params: &SrepParams<'_>) -> Result<Vec<u8>, RoughtimeError> {
    let version = params.version;
    if !version.is_supported() {
        return Err(RoughtimeError::UnsupportedVersion { version: version.0 });
    }
    if params.radius == 0 {
        return Err(RoughtimeError::InputValidation {
            what: "radius must be positive",
        });
    }

    let mut builder = MessageBuilder::new();
    builder.add(Tag::ROOT, params.root.to_vec());
    builder.add(Tag::MIDP, params.midpoint.to_le_bytes().to_vec());
    builder.add(Tag::RADI, params.radius.to_le_bytes().to_vec());

    if !version.supports_batching() {
        let nonce = params.nonce.ok_or(RoughtimeError::InputValidation {
            what: "drafts 1 and 2 sign the nonce inside the response payload",
        })?;
        builder.add(Tag::NONC, nonce.to_vec());
    }

    if version.is_modern() {
        builder.add(Tag::VER, version.0.to_le_bytes().to_vec());
        builder.add(Tag::VERS, encode_u32_list(params.supported_versions));
    }

    Ok(builder.encode())
}

/// Sign a response payload with the delegated online key.
pub fn sign_srep(srep: &[u8], online_key: &SigningKey) -> [u8; 64] {
    online_key.sign_with_context(crate::crypto::SIGNED_RESPONSE_CONTEXT, srep)
}

/// Inputs to [`assemble_response`].
#[derive(Clone, Copy, Debug)]
pub struct ResponseParams<'a> {
    /// The negotiated version; decides the top-level layout and framing.
    pub version: Version,
    /// The encoded signed payload, byte-exact as signed.
    pub srep: &'a [u8],
    /// The online key's signature over the payload.
    pub signature: &'a [u8; 64],
    /// The minted certificate for this version.
    pub cert: &'a [u8],
    /// The leaf's position in the batch (0 for a single response).
    pub index: u32,
    /// The leaf's Merkle path (empty for a single response).
    pub path: &'a [u8],
    /// The request nonce, echoed at top level by drafts 3 and later.
    pub nonce: &'a [u8],
}

/// Assemble a complete response datagram.
pub fn assemble_response(params: &ResponseParams<'_>) -> Vec<u8> {
    let version = params.version;
    let mut builder = MessageBuilder::new();
    builder.add(Tag::SREP, params.srep.to_vec());
    builder.add(Tag::SIG, params.signature.to_vec());
    builder.add(Tag::CERT, params.cert.to_vec());
    builder.add(Tag::INDX, params.index.to_le_bytes().to_vec());
    builder.add(Tag::PATH, params.path.to_vec());

    match version.0 {
        0 => {}
        0x8000_0001 | 0x8000_0002 => {
            builder.add(Tag::VER, version.0.to_le_bytes().to_vec());
        }
        v if v >= 0x8000_0003 && v <= 0x8000_000b => {
            builder.add(Tag::VER, version.0.to_le_bytes().to_vec());
            builder.add(Tag::NONC, params.nonce.to_vec());
            builder.add(Tag::TYPE, RESPONSE_TYPE.to_le_bytes().to_vec());
        }
        // Draft 12 and the RFC value: VER moved inside the signed payload.
        _ => {
            builder.add(Tag::NONC, params.nonce.to_vec());
            builder.add(Tag::TYPE, RESPONSE_TYPE.to_le_bytes().to_vec());
        }
    }

    if version.is_framed() {
        builder.encode_packet()
    } else {
        builder.encode()
    }
}
