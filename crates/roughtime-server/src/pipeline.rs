// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! The respond pipelines.
//!
//! [`respond_batch`] is the reason Roughtime batches: requests are grouped
//! by negotiated version, each group gets one Merkle tree, one signed
//! payload, and one Ed25519 signature, and every member's response reuses
//! that shared work with only its own index and path.
//!
//! The output vector matches the input in length and position. A request
//! that fails to parse, negotiates an unbatchable version (drafts 1–2), or
//! whose group hits an internal error becomes a `None` slot; nothing
//! poisons its neighbors. These functions are pure given their inputs and
//! never log.

use std::collections::HashMap;

use roughtime_proto::merkle::MerkleTree;
use roughtime_proto::request::{parse_request, ParsedRequest, MIN_REQUEST_SIZE};
use roughtime_proto::response::{
    assemble_response, build_srep, sign_srep, ResponseParams, SrepParams, DEFAULT_RADIUS_SECONDS,
};
use roughtime_proto::version::advertised_versions;
use roughtime_proto::{RoughtimeError, Version};

use crate::keys::OnlineCertSet;

/// Responder policy knobs.
#[derive(Clone, Debug)]
pub struct ResponderConfig {
    /// Radius reported in every signed payload, in seconds.
    pub radius_seconds: u32,
    /// Anti-amplification floor on the request datagram size; 0 disables.
    pub min_request_size: usize,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        ResponderConfig {
            radius_seconds: DEFAULT_RADIUS_SECONDS,
            min_request_size: MIN_REQUEST_SIZE,
        }
    }
}

impl ResponderConfig {
    fn midpoint_for(&self, version: Version, now_micros: u64) -> u64 {
        if version.uses_microseconds() {
            now_micros
        } else {
            now_micros / 1_000_000
        }
    }

    fn radius_for(&self, version: Version) -> u32 {
        if version.uses_microseconds() {
            self.radius_seconds.saturating_mul(1_000_000)
        } else {
            self.radius_seconds
        }
    }
}

fn leaf_of<'a>(parsed: &ParsedRequest<'a>) -> &'a [u8] {
    if parsed.version.leaf_is_request() {
        parsed.request
    } else {
        parsed.nonce
    }
}

/// Answer one request.
///
/// Unlike the batch path this also serves drafts 1–2, whose signed payload
/// embeds the nonce: a batch of one is the only batch they allow.
pub fn respond_single(
    request: &[u8],
    certs: &OnlineCertSet,
    config: &ResponderConfig,
    now_micros: u64,
) -> Result<Vec<u8>, RoughtimeError> {
    let parsed = parse_request(request, config.min_request_size)?;
    let version = parsed.version;
    let cert = certs
        .cert_for(version)
        .ok_or(RoughtimeError::UnsupportedVersion { version: version.0 })?;

    let tree = MerkleTree::build(version.merkle_options(), &[leaf_of(&parsed)])?;
    let srep = build_srep(&SrepParams {
        version,
        root: tree.root(),
        midpoint: config.midpoint_for(version, now_micros),
        radius: config.radius_for(version),
        nonce: Some(parsed.nonce),
        supported_versions: &advertised_versions(),
    })?;
    let signature = sign_srep(&srep, certs.online_key());

    Ok(assemble_response(&ResponseParams {
        version,
        srep: &srep,
        signature: &signature,
        cert,
        index: 0,
        path: &tree.path(0)?,
        nonce: parsed.nonce,
    }))
}

/// Answer a whole batch, preserving input order exactly.
///
/// `output[i]` is the response to `requests[i]`, or `None` when that
/// request cannot be answered.
pub fn respond_batch(
    requests: &[Vec<u8>],
    certs: &OnlineCertSet,
    config: &ResponderConfig,
    now_micros: u64,
) -> Vec<Option<Vec<u8>>> {
    let parsed: Vec<Option<ParsedRequest<'_>>> = requests
        .iter()
        .map(|r| parse_request(r, config.min_request_size).ok())
        .collect();

    // Group member positions by negotiated version, preserving order.
    let mut groups: HashMap<u32, Vec<usize>> = HashMap::new();
    for (position, request) in parsed.iter().enumerate() {
        if let Some(request) = request {
            groups.entry(request.version.0).or_default().push(position);
        }
    }

    let mut output: Vec<Option<Vec<u8>>> = vec![None; requests.len()];
    for (version, members) in groups {
        let version = Version(version);
        // Drafts 1–2 sign the nonce into the payload; they cannot share a
        // batch signature and are dropped here.
        if !version.supports_batching() {
            continue;
        }
        // An internal failure degrades this group to None slots only.
        if let Ok(responses) = respond_group(version, &members, &parsed, certs, config, now_micros)
        {
            for (position, response) in members.into_iter().zip(responses) {
                output[position] = Some(response);
            }
        }
    }
    output
}

fn respond_group(
    version: Version,
    members: &[usize],
    parsed: &[Option<ParsedRequest<'_>>],
    certs: &OnlineCertSet,
    config: &ResponderConfig,
    now_micros: u64,
) -> Result<Vec<Vec<u8>>, RoughtimeError> {
    let cert = certs
        .cert_for(version)
        .ok_or(RoughtimeError::UnsupportedVersion { version: version.0 })?;

    let leaves: Vec<&[u8]> = members
        .iter()
        .map(|&position| {
            parsed[position]
                .as_ref()
                .map(leaf_of)
                .ok_or(RoughtimeError::InputValidation {
                    what: "batch member index out of range",
                })
        })
        .collect::<Result<_, _>>()?;

    // One tree, one signed payload, one signature for the whole group.
    let tree = MerkleTree::build(version.merkle_options(), &leaves)?;
    let srep = build_srep(&SrepParams {
        version,
        root: tree.root(),
        midpoint: config.midpoint_for(version, now_micros),
        radius: config.radius_for(version),
        nonce: None,
        supported_versions: &advertised_versions(),
    })?;
    let signature = sign_srep(&srep, certs.online_key());

    members
        .iter()
        .enumerate()
        .map(|(leaf_index, &position)| {
            let parsed = parsed[position]
                .as_ref()
                .ok_or(RoughtimeError::InputValidation {
                    what: "batch member index out of range",
                })?;
            Ok(assemble_response(&ResponseParams {
                version,
                srep: &srep,
                signature: &signature,
                cert,
                index: leaf_index as u32,
                path: &tree.path(leaf_index)?,
                nonce: parsed.nonce,
            }))
        })
        .collect()
}
