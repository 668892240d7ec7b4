// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios: every supported version round-trips, large uniform
//! and mixed batches preserve order and validate, malformed members degrade
//! to `None`, and tampered or expired responses fail with the right kind.

use ring::rand::SystemRandom;
use roughtime_proto::crypto::SigningKey;
use roughtime_proto::merkle::{reconstruct_root, verify_path};
use roughtime_proto::request::{make_request, BuiltRequest, RequestOptions};
use roughtime_proto::verify::{verify_response, Exchange};
use roughtime_proto::wire::{decode_packet, TagValueMap};
use roughtime_proto::{RoughtimeError, Tag, Version};
use roughtime_server::pipeline::{respond_batch, respond_single, ResponderConfig};
use roughtime_server::OnlineCertSet;

const NOW_UNIX: u64 = 1_700_001_800;
const NOW_MICROS: u64 = NOW_UNIX * 1_000_000;

const ALL_WIRE_VERSIONS: [u32; 12] = [
    0,
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
];

fn mint() -> (SigningKey, OnlineCertSet) {
    let rng = SystemRandom::new();
    let long_term = SigningKey::generate(&rng).unwrap();
    let certs = OnlineCertSet::mint(&long_term, &rng, NOW_UNIX - 600, 3_600).unwrap();
    (long_term, certs)
}

fn request_for(version: u32, public_key: &[u8; 32]) -> BuiltRequest {
    make_request(&RequestOptions {
        versions: vec![version],
        server_public_key: Some(*public_key),
        ..RequestOptions::default()
    })
    .unwrap()
}

fn verify(request: &[u8], response: &[u8], public_key: &[u8; 32]) -> roughtime_proto::VerifiedTime {
    verify_response(&Exchange {
        request,
        response,
        server_public_key: public_key,
        observed_at: NOW_UNIX,
    })
    .unwrap()
}

#[test]
fn test_scenario_1_every_version_roundtrips() {
    let (long_term, certs) = mint();
    let public = long_term.public_key();

    for version in ALL_WIRE_VERSIONS {
        let request = request_for(version, &public);
        let response = respond_single(
            &request.bytes,
            &certs,
            &ResponderConfig::default(),
            NOW_MICROS,
        )
        .unwrap_or_else(|e| panic!("version {version:#x}: {e}"));

        let verified = verify(&request.bytes, &response, &public);
        assert_eq!(verified.version.0, version);
        assert!(verified.mint <= verified.midpoint && verified.midpoint <= verified.maxt);
    }
}

#[test]
fn test_scenario_2_uniform_batch_of_128() {
    let (long_term, certs) = mint();
    let public = long_term.public_key();

    let requests: Vec<BuiltRequest> = (0..128)
        .map(|_| request_for(Version::CURRENT.0, &public))
        .collect();
    // Nonces must all be distinct.
    for (i, a) in requests.iter().enumerate() {
        for b in &requests[i + 1..] {
            assert_ne!(a.nonce, b.nonce);
        }
    }

    let buffers: Vec<Vec<u8>> = requests.iter().map(|r| r.bytes.clone()).collect();
    let responses = respond_batch(&buffers, &certs, &ResponderConfig::default(), NOW_MICROS);
    assert_eq!(responses.len(), 128);

    for (i, (request, response)) in requests.iter().zip(&responses).enumerate() {
        let response = response.as_deref().unwrap();
        verify(&request.bytes, response, &public);

        // Reconstruct by hand and check the index binds the leaf: flipping
        // the low bit of INDX yields a different root.
        let message = decode_packet(response, 0).unwrap();
        let top = TagValueMap::parse(message).unwrap();
        let srep = top.get_nested(Tag::SREP).unwrap();
        let root = srep.get(Tag::ROOT).unwrap();
        let index = roughtime_proto::wire::read_u32(top.get(Tag::INDX).unwrap()).unwrap();
        assert_eq!(index, i as u32);
        let path = top.get(Tag::PATH).unwrap();

        let opts = Version::CURRENT.merkle_options();
        assert!(verify_path(opts, root, &request.bytes, index, path).is_ok());
        let flipped = reconstruct_root(opts, &request.bytes, index ^ 1, path).unwrap();
        assert_ne!(flipped.as_slice(), root);
    }
}

#[test]
fn test_scenario_3_mixed_batch_preserves_order() {
    let (long_term, certs) = mint();
    let public = long_term.public_key();
    let cycle = [0u32, 0x8000_0008, 0x8000_000b, 0x8000_000c];

    let requests: Vec<BuiltRequest> = (0..128)
        .map(|i| request_for(cycle[i % cycle.len()], &public))
        .collect();
    let buffers: Vec<Vec<u8>> = requests.iter().map(|r| r.bytes.clone()).collect();
    let responses = respond_batch(&buffers, &certs, &ResponderConfig::default(), NOW_MICROS);
    assert_eq!(responses.len(), 128);

    for (i, (request, response)) in requests.iter().zip(&responses).enumerate() {
        let verified = verify(&request.bytes, response.as_deref().unwrap(), &public);
        assert_eq!(
            verified.version.0,
            cycle[i % cycle.len()],
            "position {i} answered with the wrong version"
        );
    }
}

#[test]
fn test_scenario_4_malformed_batch_members() {
    let (long_term, certs) = mint();
    let public = long_term.public_key();

    let good_0 = request_for(Version::CURRENT.0, &public);
    let good_3 = request_for(0x8000_000b, &public);
    let unbatchable_2 = request_for(0x8000_0001, &public);
    let unbatchable_4 = request_for(0x8000_0001, &public);

    let buffers = vec![
        good_0.bytes.clone(),
        vec![0x13, 0x37, 0xBE, 0xEF], // garbage
        unbatchable_2.bytes.clone(),
        good_3.bytes.clone(),
        unbatchable_4.bytes.clone(),
        vec![0xAA, 0xBB, 0xCC, 0xDD], // garbage
    ];

    let responses = respond_batch(&buffers, &certs, &ResponderConfig::default(), NOW_MICROS);
    assert_eq!(responses.len(), 6);
    verify(&good_0.bytes, responses[0].as_deref().unwrap(), &public);
    verify(&good_3.bytes, responses[3].as_deref().unwrap(), &public);
    for position in [1, 2, 4, 5] {
        assert!(responses[position].is_none(), "position {position}");
    }
}

#[test]
fn test_scenario_5_tampered_and_expired_responses() {
    let (long_term, certs) = mint();
    let public = long_term.public_key();

    let request = request_for(Version::CURRENT.0, &public);
    let response = respond_single(
        &request.bytes,
        &certs,
        &ResponderConfig::default(),
        NOW_MICROS,
    )
    .unwrap();

    // Flip one byte inside the DELE's MAXT value.
    let maxt = (NOW_UNIX - 600) + 3_600;
    let offset = find_subslice(&response, &maxt.to_le_bytes()).unwrap();
    let mut tampered = response.clone();
    tampered[offset] ^= 0x40;
    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &tampered,
        server_public_key: &public,
        observed_at: NOW_UNIX,
    });
    assert!(matches!(result, Err(RoughtimeError::BadDele { .. })));

    // Swap the long-term key for an unrelated one.
    let stranger = SigningKey::generate(&SystemRandom::new()).unwrap();
    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &response,
        server_public_key: &stranger.public_key(),
        observed_at: NOW_UNIX,
    });
    assert!(matches!(result, Err(RoughtimeError::BadDele { .. })));

    // Mint a window that ended before the midpoint.
    let rng = SystemRandom::new();
    let expired = OnlineCertSet::mint(&long_term, &rng, NOW_UNIX - 100, 90).unwrap();
    let request = request_for(Version::CURRENT.0, &public);
    let response = respond_single(
        &request.bytes,
        &expired,
        &ResponderConfig::default(),
        NOW_MICROS,
    )
    .unwrap();
    let result = verify_response(&Exchange {
        request: &request.bytes,
        response: &response,
        server_public_key: &public,
        observed_at: NOW_UNIX,
    });
    assert!(matches!(result, Err(RoughtimeError::ExpiredDele { .. })));
}

#[test]
fn test_batch_of_one_matches_single() {
    // The batch path and the single path must produce responses that both
    // validate for the same request (signatures differ only if the payload
    // does; with the same clock input they are byte-identical).
    let (long_term, certs) = mint();
    let public = long_term.public_key();
    let request = request_for(Version::CURRENT.0, &public);

    let single = respond_single(
        &request.bytes,
        &certs,
        &ResponderConfig::default(),
        NOW_MICROS,
    )
    .unwrap();
    let batch = respond_batch(
        &[request.bytes.clone()],
        &certs,
        &ResponderConfig::default(),
        NOW_MICROS,
    );
    let batched = batch[0].as_deref().unwrap();

    assert_eq!(single, batched);
    verify(&request.bytes, &single, &public);
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
