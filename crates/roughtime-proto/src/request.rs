// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Client request construction and server-side request parsing.
//!
//! Requests are padded up to a fixed message size so a reply can never be
//! larger than the query that provoked it (anti-amplification). The tag set
//! depends on the negotiated version:
//!
//! | Version | Tags |
//! |---|---|
//! | classic | `NONC(64)`, `PAD\xff` |
//! | drafts 1–7 | `NONC(64)`, `VER`, `PAD` |
//! | drafts 8–11 | `NONC(32)`, `VER`, `ZZZZ`, optional `SRV` (≥ 10) |
//! | draft 12 / rfc | `NONC(32)`, `VER`, `TYPE(=0)`, `ZZZZ`, optional `SRV` |
//!
//! `VER` in a request holds the client's offered version list. Only version
//! 0 goes out as a bare message; every IETF version is framed.

use crate::crypto::server_id_hash;
use crate::error::{RequestProblem, RoughtimeError};
use crate::tag::Tag;
use crate::version::{
    choose_version, validate_nonce, validate_type, validate_version_list, Version,
    CLASSIC_WIRE_SENTINEL,
};
use crate::wire::{
    decode_packet, encode_u32_list, read_u32_list, MessageBuilder, TagValueMap,
};

/// Minimum size in bytes of a request datagram a server will answer.
pub const MIN_REQUEST_SIZE: usize = 1024;

/// Default size in bytes of the request message (the packet adds 12).
pub const DEFAULT_MESSAGE_SIZE: usize = 1024;

/// Options for building a request.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// Versions to offer, most preferred not required to be first; the
    /// negotiated version is the best supported overlap. Defaults to the
    /// current draft only.
    pub versions: Vec<u32>,
    /// Nonce to use; defaults to fresh random bytes of the version's length.
    pub nonce: Option<Vec<u8>>,
    /// Total message size to pad to, in bytes.
    pub message_size: usize,
    /// The server's long-term public key; when set (and the version carries
    /// `SRV`), binds the request to that server.
    pub server_public_key: Option<[u8; 32]>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            versions: vec![Version::CURRENT.0],
            nonce: None,
            message_size: DEFAULT_MESSAGE_SIZE,
            server_public_key: None,
        }
    }
}

/// A built request: the wire bytes plus what the client must remember to
/// validate the response.
#[derive(Clone, Debug)]
pub struct BuiltRequest {
    /// The datagram to send.
    pub bytes: Vec<u8>,
    /// The nonce bound into the request.
    pub nonce: Vec<u8>,
    /// The version the request was built for.
    pub version: Version,
}

/// Build a request per the given options.
pub fn make_request(options: &RequestOptions) -> Result<BuiltRequest, RoughtimeError> {
    let mut versions: Vec<u32> = options
        .versions
        .iter()
        .map(|&v| if v == CLASSIC_WIRE_SENTINEL { 0 } else { v })
        .collect();
    // The wire list must be strictly ascending for the current draft.
    versions.sort_unstable();
    versions.dedup();
    let version = choose_version(if versions.is_empty() {
        None
    } else {
        Some(&versions)
    });

    let nonce = match &options.nonce {
        Some(nonce) => {
            if nonce.len() != version.nonce_length() {
                return Err(RoughtimeError::InputValidation {
                    what: "nonce length does not match the negotiated version",
                });
            }
            nonce.clone()
        }
        None => {
            let mut nonce = vec![0u8; version.nonce_length()];
            rand::fill(&mut nonce[..]);
            nonce
        }
    };

    let mut builder = MessageBuilder::new();
    builder.add(Tag::NONC, nonce.clone());
    if !version.is_classic() {
        builder.add(Tag::VER, encode_u32_list(&versions));
    }
    if version.is_modern() {
        builder.add(Tag::TYPE, 0u32.to_le_bytes().to_vec());
    }
    if version.0 >= 0x8000_000a || version.is_modern() {
        if let Some(public_key) = &options.server_public_key {
            builder.add(Tag::SRV, server_id_hash(public_key).to_vec());
        }
    }

    // Pad the message to exactly the requested size. Adding the padding tag
    // grows the header by 8 bytes (one tag, one offset) on top of its value.
    let unpadded = builder.encode();
    if unpadded.len() + 8 <= options.message_size {
        let pad_len = options.message_size - unpadded.len() - 8;
        builder.add(version.pad_tag(), vec![0u8; pad_len]);
    }
    let message = builder.encode();

    let bytes = if version.is_framed() {
        crate::wire::encode_packet(&message)
    } else {
        message
    };

    Ok(BuiltRequest {
        bytes,
        nonce,
        version,
    })
}

/// A parsed and validated request.
#[derive(Debug)]
pub struct ParsedRequest<'a> {
    /// The negotiated version.
    pub version: Version,
    /// The version list the client offered, if any.
    pub client_versions: Option<Vec<u32>>,
    /// The client's nonce.
    pub nonce: &'a [u8],
    /// The SRV server-identifier hash, if the client sent one.
    pub server_id: Option<&'a [u8]>,
    /// The full datagram as received. This is the Merkle leaf for the
    /// current draft.
    pub request: &'a [u8],
    /// Length of the message portion (without any envelope).
    pub message_len: usize,
}

/// Parse and validate a request datagram.
///
/// `min_size` is the anti-amplification floor applied to the whole datagram;
/// pass 0 to disable.
pub fn parse_request(buf: &[u8], min_size: usize) -> Result<ParsedRequest<'_>, RoughtimeError> {
    let message = decode_packet(buf, min_size)?;
    let map = TagValueMap::parse(message)?;

    let client_versions = match map.get(Tag::VER) {
        Some(raw) => Some(
            read_u32_list(raw)
                .map_err(|_| RoughtimeError::InvalidRequest(RequestProblem::VersionListMalformed))?,
        ),
        None => None,
    };
    let version = choose_version(client_versions.as_deref());
    if let Some(list) = &client_versions {
        validate_version_list(version, list)?;
    }
    let nonce = validate_nonce(version, map.get(Tag::NONC))?;
    validate_type(version, map.get(Tag::TYPE))?;

    Ok(ParsedRequest {
        version,
        client_versions,
        nonce,
        server_id: map.get(Tag::SRV),
        request: buf,
        message_len: message.len(),
    })
}
