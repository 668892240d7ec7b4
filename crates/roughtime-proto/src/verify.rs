// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Client-side response validation.
//!
//! Given an exchange (the request sent, the response received, and the
//! server's claimed long-term key), [`verify_response`] performs the full
//! pipeline, in order:
//!
//! 1. decode the response packet (bare-message fallback allowed)
//! 2. extract the byte-exact `SREP` and `DELE` regions
//! 3. determine the version: `SREP.VER`, else top-level `VER`, else classic
//! 4. find the echoed nonce: top-level `NONC`, else `SREP.NONC`, else absent
//! 5. an echoed nonce must equal the request nonce
//! 6. reconstruct the Merkle root from `(INDX, PATH, leaf)` and compare it
//!    to `SREP.ROOT` in constant time
//! 7. verify `CERT.SIG` over `DELE` under the long-term key
//! 8. verify the top-level `SIG` over `SREP` under `DELE.PUBK`
//! 9. check `MINT ≤ MIDP ≤ MAXT`
//!
//! Each failure maps to its own error kind (`BadNonce`, `BadRoot`,
//! `BadDele`, `BadSrep`, `ExpiredDele`) so callers can distinguish a lying
//! server from a stale certificate.

use crate::crypto::{verify_with_context, SIGNED_RESPONSE_CONTEXT};
use crate::error::RoughtimeError;
use crate::merkle::verify_path;
use crate::request::parse_request;
use crate::tag::Tag;
use crate::version::Version;
use crate::wire::{decode_packet, DecodedMessage};

/// One request/response round trip, as seen by the client.
#[derive(Clone, Copy, Debug)]
pub struct Exchange<'a> {
    /// The request datagram the client sent.
    pub request: &'a [u8],
    /// The response datagram the client received.
    pub response: &'a [u8],
    /// The server's claimed long-term public key.
    pub server_public_key: &'a [u8; 32],
    /// Wall-clock observation time (Unix seconds), recorded when the
    /// response arrived. Diagnostic only; the checks below are defined
    /// purely over message contents.
    pub observed_at: u64,
}

/// The signed time extracted from a validated response.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VerifiedTime {
    /// The version the response was validated under.
    pub version: Version,
    /// Signed midpoint, in the version's unit (microseconds for classic,
    /// seconds otherwise).
    pub midpoint: u64,
    /// Signed radius, in the version's unit.
    pub radius: u32,
    /// Start of the delegation window, in the version's unit.
    pub mint: u64,
    /// End of the delegation window, in the version's unit.
    pub maxt: u64,
}

impl VerifiedTime {
    /// The midpoint as Unix seconds, whatever the version's unit.
    pub fn midpoint_seconds(&self) -> u64 {
        if self.version.uses_microseconds() {
            self.midpoint / 1_000_000
        } else {
            self.midpoint
        }
    }

    /// The radius in whole seconds, rounded up.
    pub fn radius_seconds(&self) -> u32 {
        if self.version.uses_microseconds() {
            self.radius.div_ceil(1_000_000)
        } else {
            self.radius
        }
    }
}

fn required<'a>(
    message: &DecodedMessage<'a>,
    tag: Tag,
) -> Result<&'a [u8], RoughtimeError> {
    message
        .bytes(tag)
        .ok_or(RoughtimeError::InvalidResponse { missing: tag })
}

/// Validate a response against the request that provoked it.
pub fn verify_response(exchange: &Exchange<'_>) -> Result<VerifiedTime, RoughtimeError> {
    // 1. Decode the packet; Google-era responses arrive bare.
    let message = decode_packet(exchange.response, 0)?;
    let top = DecodedMessage::decode(message)?;

    // 2. Byte-exact signed regions.
    let (srep_raw, srep) = top
        .nested(Tag::SREP)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::SREP })?;
    let (_, cert) = top
        .nested(Tag::CERT)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::CERT })?;
    let (dele_raw, dele) = cert
        .nested(Tag::DELE)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::DELE })?;

    // 3. Version discovery.
    let version = srep
        .u32(Tag::VER)
        .or_else(|| top.u32(Tag::VER))
        .map(Version)
        .unwrap_or(Version::CLASSIC);

    // 4–5. Echoed nonce, when present, must match the request.
    let request = parse_request(exchange.request, 0)?;
    let returned_nonce = top.bytes(Tag::NONC).or_else(|| srep.bytes(Tag::NONC));
    if let Some(returned) = returned_nonce {
        if returned != request.nonce {
            return Err(RoughtimeError::BadNonce {
                expected: request.nonce.to_vec(),
                actual: returned.to_vec(),
            });
        }
    }

    // 6. Merkle proof against the signed root.
    let index = top
        .u32(Tag::INDX)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::INDX })?;
    let path = required(&top, Tag::PATH)?;
    let root = required(srep, Tag::ROOT)?;
    let leaf_data: &[u8] = if version.leaf_is_request() {
        exchange.request
    } else {
        request.nonce
    };
    verify_path(version.merkle_options(), root, leaf_data, index, path)?;

    // 7. Delegation certificate under the long-term key.
    let cert_sig = required(cert, Tag::SIG)?;
    if !verify_with_context(
        version.delegation_context(),
        dele_raw,
        exchange.server_public_key,
        cert_sig,
    ) {
        return Err(RoughtimeError::BadDele {
            signature: cert_sig.to_vec(),
        });
    }

    // 8. Response signature under the delegated online key.
    let online_public_key = required(dele, Tag::PUBK)?;
    let response_sig = required(&top, Tag::SIG)?;
    if !verify_with_context(
        SIGNED_RESPONSE_CONTEXT,
        srep_raw,
        online_public_key,
        response_sig,
    ) {
        return Err(RoughtimeError::BadSrep {
            signature: response_sig.to_vec(),
        });
    }

    // 9. The midpoint must fall inside the delegation window.
    let midpoint = srep
        .u64(Tag::MIDP)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::MIDP })?;
    let radius = srep
        .u32(Tag::RADI)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::RADI })?;
    let mint = dele
        .u64(Tag::MINT)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::MINT })?;
    let maxt = dele
        .u64(Tag::MAXT)
        .ok_or(RoughtimeError::InvalidResponse { missing: Tag::MAXT })?;
    if midpoint < mint || midpoint > maxt {
        return Err(RoughtimeError::ExpiredDele {
            mint,
            midp: midpoint,
            maxt,
        });
    }

    Ok(VerifiedTime {
        version,
        midpoint,
        radius,
        mint,
        maxt,
    })
}
