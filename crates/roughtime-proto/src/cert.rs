// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Delegation certificates.
//!
//! A server's long-term key never signs responses directly. It signs a DELE
//! record delegating to a short-lived online key for a bounded time window,
//! and the online key signs every response payload. The CERT carried in each
//! response is the DELE plus that long-term signature, prefixed with the
//! version's delegation context.
//!
//! Timestamp units follow the version: microseconds for the Google wire,
//! seconds for every IETF draft. The caller supplies `mint`/`maxt` already
//! in the right unit.

use crate::crypto::SigningKey;
use crate::error::RoughtimeError;
use crate::tag::Tag;
use crate::version::Version;
use crate::wire::MessageBuilder;

/// Encode a DELE record: `{PUBK, MINT, MAXT}`.
pub fn encode_delegation(online_public_key: &[u8; 32], mint: u64, maxt: u64) -> Vec<u8> {
    let mut builder = MessageBuilder::new();
    builder.add(Tag::PUBK, online_public_key.to_vec());
    builder.add(Tag::MINT, mint.to_le_bytes().to_vec());
    builder.add(Tag::MAXT, maxt.to_le_bytes().to_vec());
    builder.encode()
}

/// Mint a CERT: the DELE for the given online key and window, signed by the
/// long-term key under the version's delegation context.
pub fn mint_certificate(
    long_term: &SigningKey,
    version: Version,
    online_public_key: &[u8; 32],
    mint: u64,
    maxt: u64,
) -> Result<Vec<u8>, RoughtimeError> {
    if maxt < mint {
        return Err(RoughtimeError::InputValidation {
            what: "delegation window ends before it starts",
        });
    }
    let dele = encode_delegation(online_public_key, mint, maxt);
    let sig = long_term.sign_with_context(version.delegation_context(), &dele);

    let mut builder = MessageBuilder::new();
    builder.add(Tag::SIG, sig.to_vec());
    builder.add(Tag::DELE, dele);
    Ok(builder.encode())
}
