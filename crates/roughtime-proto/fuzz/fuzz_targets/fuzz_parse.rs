// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Fuzz the packet decoder, the tag-value parser, the recursive typed
//! decoder, and the request validator against arbitrary bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use roughtime_proto::request::parse_request;
use roughtime_proto::wire::{decode_packet, DecodedMessage, TagValueMap};

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = decode_packet(data, 0) {
        if let Ok(map) = TagValueMap::parse(message) {
            for (_, value) in map.iter() {
                std::hint::black_box(value);
            }
        }
        let _ = DecodedMessage::decode(message);
    }
    let _ = parse_request(data, 1024);
});
