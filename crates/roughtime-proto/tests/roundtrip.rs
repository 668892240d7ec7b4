// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! End-to-end exercise of the proto crate alone: mint a certificate, answer
//! a request by hand the way a server pipeline would, and validate the
//! exchange as a client.

use ring::rand::SystemRandom;
use roughtime_proto::cert::mint_certificate;
use roughtime_proto::crypto::SigningKey;
use roughtime_proto::merkle::MerkleTree;
use roughtime_proto::request::{make_request, parse_request, RequestOptions, MIN_REQUEST_SIZE};
use roughtime_proto::response::{
    assemble_response, build_srep, sign_srep, ResponseParams, SrepParams,
};
use roughtime_proto::verify::{verify_response, Exchange};
use roughtime_proto::version::advertised_versions;
use roughtime_proto::{RoughtimeError, Version};

struct TestServer {
    long_term: SigningKey,
    online: SigningKey,
}

impl TestServer {
    fn new() -> Self {
        let rng = SystemRandom::new();
        TestServer {
            long_term: SigningKey::generate(&rng).unwrap(),
            online: SigningKey::generate(&rng).unwrap(),
        }
    }

    /// Answer a single request the way the batch pipeline would for a
    /// batch of one, with an explicit delegation window.
    fn respond(&self, request: &[u8], mint: u64, maxt: u64, midpoint: u64) -> Vec<u8> {
        let parsed = parse_request(request, MIN_REQUEST_SIZE).unwrap();
        let version = parsed.version;

        let cert = mint_certificate(
            &self.long_term,
            version,
            &self.online.public_key(),
            mint,
            maxt,
        )
        .unwrap();

        let leaf: &[u8] = if version.leaf_is_request() {
            request
        } else {
            parsed.nonce
        };
        let tree = MerkleTree::build(version.merkle_options(), &[leaf]).unwrap();

        let radius = if version.uses_microseconds() {
            10_000_000
        } else {
            10
        };
        let srep = build_srep(&SrepParams {
            version,
            root: tree.root(),
            midpoint,
            radius,
            nonce: Some(parsed.nonce),
            supported_versions: &advertised_versions(),
        })
        .unwrap();
        let signature = sign_srep(&srep, &self.online);

        assemble_response(&ResponseParams {
            version,
            srep: &srep,
            signature: &signature,
            cert: &cert,
            index: 0,
            path: &tree.path(0).unwrap(),
            nonce: parsed.nonce,
        })
    }
}

fn window_for(version: u32) -> (u64, u64, u64) {
    // (mint, maxt, midpoint) in the version's unit.
    if version == 0 {
        (1_700_000_000_000_000, 1_700_003_600_000_000, 1_700_001_800_000_000)
    } else {
        (1_700_000_000, 1_700_003_600, 1_700_001_800)
    }
}

#[test]
fn test_roundtrip_every_supported_version() {
    let server = TestServer::new();
    let public = server.long_term.public_key();

    for v in [
        0u32,
        1,
        0x8000_0001,
        0x8000_0002,
        0x8000_0003,
        0x8000_0004,
        0x8000_0006,
        0x8000_0008,
        0x8000_0009,
        0x8000_000a,
        0x8000_000b,
        0x8000_000c,
    ] {
        let request = make_request(&RequestOptions {
            versions: vec![v],
            server_public_key: Some(public),
            ..RequestOptions::default()
        })
        .unwrap();
        assert_eq!(request.version.0, v);

        let (mint, maxt, midpoint) = window_for(v);
        let response = server.respond(&request.bytes, mint, maxt, midpoint);
        assert!(
            response.len() <= request.bytes.len(),
            "version {v:#x}: response larger than request"
        );

        let verified = verify_response(&Exchange {
            request: &request.bytes,
            response: &response,
            server_public_key: &public,
            observed_at: 1_700_001_800,
        })
        .unwrap_or_else(|e| panic!("version {v:#x}: {e}"));

        assert_eq!(verified.version.0, v);
        assert_eq!(verified.midpoint, midpoint);
        assert!(verified.mint <= verified.midpoint && verified.midpoint <= verified.maxt);
        assert_eq!(verified.midpoint_seconds(), 1_700_001_800);
    }
}

#[test]
fn test_wrong_long_term_key_fails_dele() {
    let server = TestServer::new();
    let request = make_request(&RequestOptions::default()).unwrap();
    let (mint, maxt, midpoint) = window_for(Version::CURRENT.0);
    let response = server.respond(&request.bytes, mint, maxt, midpoint);

    let other = SigningKey::generate(&SystemRandom::new()).unwrap();
    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &response,
        server_public_key: &other.public_key(),
        observed_at: 0,
    });
    assert!(matches!(result, Err(RoughtimeError::BadDele { .. })));
}

#[test]
fn test_expired_window_fails() {
    let server = TestServer::new();
    let request = make_request(&RequestOptions::default()).unwrap();
    // Window ends before the midpoint.
    let response = server.respond(&request.bytes, 1_000, 2_000, 5_000);

    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &response,
        server_public_key: &server.long_term.public_key(),
        observed_at: 0,
    });
    assert_eq!(
        result,
        Err(RoughtimeError::ExpiredDele {
            mint: 1_000,
            midp: 5_000,
            maxt: 2_000
        })
    );
}

#[test]
fn test_nonce_substitution_fails() {
    let server = TestServer::new();
    let public = server.long_term.public_key();
    let request_a = make_request(&RequestOptions::default()).unwrap();
    let request_b = make_request(&RequestOptions::default()).unwrap();

    let (mint, maxt, midpoint) = window_for(Version::CURRENT.0);
    let response_b = server.respond(&request_b.bytes, mint, maxt, midpoint);

    // A response for someone else's nonce must not validate for ours.
    let result = verify_response(&Exchange {
        request: &request_a.bytes,
        response: &response_b,
        server_public_key: &public,
        observed_at: 0,
    });
    assert!(matches!(result, Err(RoughtimeError::BadNonce { .. })));
}

#[test]
fn test_tampered_srep_fails_signature() {
    let server = TestServer::new();
    let public = server.long_term.public_key();
    let request = make_request(&RequestOptions {
        versions: vec![0x8000_000b], // top-level NONC, nonce leaf
        ..RequestOptions::default()
    })
    .unwrap();
    let (mint, maxt, midpoint) = window_for(0x8000_000b);
    let response = server.respond(&request.bytes, mint, maxt, midpoint);

    // Find the MIDP value inside the response and flip a byte. The Merkle
    // root still matches (the root is untouched), so the failure must come
    // from the response signature.
    let offset = find_subslice(&response, &midpoint.to_le_bytes()).unwrap();
    let mut tampered = response.clone();
    tampered[offset] ^= 0x01;

    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &tampered,
        server_public_key: &public,
        observed_at: 0,
    });
    assert!(matches!(result, Err(RoughtimeError::BadSrep { .. })));
}

#[test]
fn test_tampered_dele_fails_certificate() {
    let server = TestServer::new();
    let public = server.long_term.public_key();
    let request = make_request(&RequestOptions::default()).unwrap();
    let (mint, maxt, midpoint) = window_for(Version::CURRENT.0);
    let response = server.respond(&request.bytes, mint, maxt, midpoint);

    // Flip a byte inside the DELE's MAXT value.
    let offset = find_subslice(&response, &maxt.to_le_bytes()).unwrap();
    let mut tampered = response.clone();
    tampered[offset] ^= 0x01;

    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &tampered,
        server_public_key: &public,
        observed_at: 0,
    });
    assert!(matches!(result, Err(RoughtimeError::BadDele { .. })));
}

#[test]
fn test_wrong_index_fails_root() {
    let server = TestServer::new();
    let public = server.long_term.public_key();
    let request = make_request(&RequestOptions::default()).unwrap();
    let (mint, maxt, midpoint) = window_for(Version::CURRENT.0);
    let response = server.respond(&request.bytes, mint, maxt, midpoint);

    // INDX is 0 in a single response; patch it to 1. With an empty PATH the
    // index bits cannot be consumed, which reads as a proof failure.
    let indx_value = 0u32.to_le_bytes();
    // The INDX value is the only all-zero u32 that follows the INDX tag.
    let tag_offset = find_subslice(&response, b"INDX").unwrap();
    // Values live after the tag section; find the value via the parsed map
    // instead of guessing: reparse and locate the zero word it points at.
    let message = roughtime_proto::wire::decode_packet(&response, 0).unwrap();
    let map = roughtime_proto::wire::TagValueMap::parse(message).unwrap();
    let indx = map.get(roughtime_proto::Tag::INDX).unwrap();
    assert_eq!(indx, indx_value);
    let value_offset = indx.as_ptr() as usize - response.as_ptr() as usize;
    assert!(value_offset > tag_offset);

    let mut tampered = response.clone();
    tampered[value_offset] = 1;

    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &tampered,
        server_public_key: &public,
        observed_at: 0,
    });
    assert!(result.is_err());
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
