// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Online key and certificate minting.
//!
//! The long-term key signs nothing but delegations. At start (and whenever
//! the window lapses) the server generates a fresh online key pair and mints
//! three certificate variants over it:
//!
//! - version 0: microsecond timestamps, legacy delegation context
//! - drafts 1–11: second timestamps, legacy delegation context
//! - draft 12 / rfc: second timestamps, modern delegation context
//!
//! fanned out into a `version → CERT bytes` map covering every supported
//! version, so the respond pipeline is a plain lookup.

use std::collections::HashMap;

use ring::rand::SecureRandom;

use roughtime_proto::cert::mint_certificate;
use roughtime_proto::crypto::SigningKey;
use roughtime_proto::{RoughtimeError, Version};

/// Default delegation validity window, in seconds.
pub const DEFAULT_VALIDITY_SECS: u64 = 3_600;

/// A minted online key with its per-version certificates.
#[derive(Debug)]
pub struct OnlineCertSet {
    online_key: SigningKey,
    certs: HashMap<u32, Vec<u8>>,
    expires_at: u64,
}

impl OnlineCertSet {
    /// Generate a fresh online key and mint certificates valid from
    /// `now_unix` for `validity_secs` seconds.
    pub fn mint(
        long_term: &SigningKey,
        rng: &dyn SecureRandom,
        now_unix: u64,
        validity_secs: u64,
    ) -> Result<OnlineCertSet, RoughtimeError> {
        let online_key = SigningKey::generate(rng)?;
        let online_public = online_key.public_key();

        let mint = now_unix;
        let maxt = now_unix + validity_secs;

        let classic = mint_certificate(
            long_term,
            Version::CLASSIC,
            &online_public,
            mint * 1_000_000,
            maxt * 1_000_000,
        )?;
        let legacy = mint_certificate(long_term, Version::draft(1), &online_public, mint, maxt)?;
        let modern = mint_certificate(long_term, Version::CURRENT, &online_public, mint, maxt)?;

        let mut certs = HashMap::new();
        for version in Version::SUPPORTED {
            let cert = if version.is_classic() {
                &classic
            } else if version.is_modern() {
                &modern
            } else {
                &legacy
            };
            certs.insert(version.0, cert.clone());
        }

        Ok(OnlineCertSet {
            online_key,
            certs,
            expires_at: maxt,
        })
    }

    /// The certificate minted for the given version, if supported.
    pub fn cert_for(&self, version: Version) -> Option<&[u8]> {
        self.certs.get(&version.0).map(|c| c.as_slice())
    }

    /// The delegated online key that signs response payloads.
    pub fn online_key(&self) -> &SigningKey {
        &self.online_key
    }

    /// End of the delegation window, Unix seconds.
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Whether the delegation window has lapsed at `now_unix`.
    pub fn is_expired(&self, now_unix: u64) -> bool {
        now_unix >= self.expires_at
    }
}
