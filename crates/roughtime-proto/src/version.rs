// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Version-compatibility policy table.
//!
//! Roughtime shipped several mutually incompatible wire layouts: the
//! Google-era format (version 0) and the IETF draft series (`0x80000001`
//! through `0x8000000c`, drafts 1 through 12, with 5 and 7 expired). They
//! differ in nonce size, padding tag, hash size, signature context, signed
//! payload schema, and what gets hashed at the base of the Merkle tree.
//! Every one of those differences is answered here, by a single method on
//! [`Version`], so the compatibility risk lives in one testable unit instead
//! of being smeared across the codec.

use core::fmt;

use crate::crypto::{DELEGATION_CONTEXT, DELEGATION_CONTEXT_LEGACY};
use crate::error::{RequestProblem, RoughtimeError};
use crate::merkle::MerkleOptions;
use crate::tag::Tag;

/// Wire-format sentinel some clients use to request the Google-era framing
/// (bare message, no envelope). Normalized to [`Version::CLASSIC`] on input.
pub const CLASSIC_WIRE_SENTINEL: u32 = 0x8000_0000;

/// A Roughtime protocol version.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Version(pub u32);

impl Version {
    /// The Google-era protocol: bare messages, 64-byte nonces, 64-byte tree
    /// hashes, microsecond timestamps.
    pub const CLASSIC: Version = Version(0);

    /// The version value reserved for the eventual RFC release. Treated as
    /// the current draft's profile.
    pub const RFC_RELEASE: Version = Version(1);

    /// The current IETF draft (12), and the fiducial fallback when version
    /// negotiation finds no overlap.
    pub const CURRENT: Version = Version(0x8000_000c);

    /// The IETF draft version `n` (`0x80000000 | n`).
    pub const fn draft(n: u32) -> Version {
        Version(0x8000_0000 | n)
    }

    /// Every version this implementation can answer. Drafts 5 and 7 are
    /// expired and deliberately absent.
    pub const SUPPORTED: [Version; 12] = [
        Version::CLASSIC,
        Version::RFC_RELEASE,
        Version::draft(1),
        Version::draft(2),
        Version::draft(3),
        Version::draft(4),
        Version::draft(6),
        Version::draft(8),
        Version::draft(9),
        Version::draft(10),
        Version::draft(11),
        Version::draft(12),
    ];

    /// Whether this version is in the supported set.
    pub fn is_supported(self) -> bool {
        Version::SUPPORTED.contains(&self)
    }

    /// Whether this is the Google-era protocol.
    pub const fn is_classic(self) -> bool {
        self.0 == 0
    }

    /// Whether this version uses the current draft's profile: 32-byte nonce,
    /// `ZZZZ` padding, request bytes as the Merkle leaf, modern delegation
    /// context, `VER`/`VERS` inside the signed payload.
    pub const fn is_modern(self) -> bool {
        self.0 == 1 || self.0 >= 0x8000_000c
    }

    /// The nonce length this version requires: 64 bytes for the Google wire
    /// and drafts 1–4, 32 bytes afterwards.
    pub const fn nonce_length(self) -> usize {
        match self.0 {
            0 => 64,
            0x8000_0001..=0x8000_0004 => 64,
            _ => 32,
        }
    }

    /// The padding tag this version's requests carry.
    pub const fn pad_tag(self) -> Tag {
        match self.0 {
            0 => Tag::PAD_CLASSIC,
            0x8000_0001..=0x8000_0007 => Tag::PAD,
            _ => Tag::ZZZZ,
        }
    }

    /// Merkle tree geometry: 64-byte hashes for the Google wire, 32-byte
    /// hashes for every IETF version; natural node order for both.
    pub const fn merkle_options(self) -> MerkleOptions {
        if self.is_classic() {
            MerkleOptions::CLASSIC
        } else {
            MerkleOptions::IETF
        }
    }

    /// Whether the Merkle leaf is the full request datagram (current draft)
    /// rather than the bare nonce (all earlier versions).
    pub const fn leaf_is_request(self) -> bool {
        self.is_modern()
    }

    /// The context string prefixed to delegation signatures.
    pub fn delegation_context(self) -> &'static [u8] {
        if self.is_modern() {
            DELEGATION_CONTEXT
        } else {
            DELEGATION_CONTEXT_LEGACY
        }
    }

    /// Whether responses for this version can share one signed payload
    /// across a batch. Drafts 1 and 2 place the nonce inside the signed
    /// payload, which pins the signature to a single request.
    pub const fn supports_batching(self) -> bool {
        !matches!(self.0, 0x8000_0001 | 0x8000_0002)
    }

    /// Whether timestamps (`MIDP`, `MINT`, `MAXT`) and the radius are in
    /// microseconds (Google wire) rather than seconds.
    pub const fn uses_microseconds(self) -> bool {
        self.is_classic()
    }

    /// Whether responses are wrapped in the `ROUGHTIM` envelope.
    pub const fn is_framed(self) -> bool {
        !self.is_classic()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "classic"),
            1 => write!(f, "rfc"),
            n if n & 0x8000_0000 != 0 => write!(f, "draft-{}", n & 0x7FFF_FFFF),
            n => write!(f, "{n:#010x}"),
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({self})")
    }
}

/// The version list a server advertises in modern signed payloads: the
/// supported IETF drafts in ascending order, excluding the Google wire and
/// the unreleased RFC value.
pub fn advertised_versions() -> Vec<u32> {
    let mut out: Vec<u32> = Version::SUPPORTED
        .iter()
        .map(|v| v.0)
        .filter(|&v| v != 0 && v != 1)
        .collect();
    out.sort_unstable();
    out
}

/// Negotiate a version from the client's offered list.
///
/// No list means a Google-era request. An offered list with no supported
/// overlap falls back to [`Version::CURRENT`]; if the RFC release value is
/// in the overlap it wins, otherwise the numerically largest overlap does.
pub fn choose_version(client_versions: Option<&[u32]>) -> Version {
    let list = match client_versions {
        None => return Version::CLASSIC,
        Some(list) if list.is_empty() => return Version::CLASSIC,
        Some(list) => list,
    };

    let mut best: Option<u32> = None;
    for &offered in list {
        let v = if offered == CLASSIC_WIRE_SENTINEL {
            0
        } else {
            offered
        };
        if !Version(v).is_supported() {
            continue;
        }
        if v == 1 {
            return Version::RFC_RELEASE;
        }
        best = Some(best.map_or(v, |b: u32| b.max(v)));
    }
    best.map(Version).unwrap_or(Version::CURRENT)
}

/// Check a request nonce against the negotiated version's required length.
pub fn validate_nonce(version: Version, nonce: Option<&[u8]>) -> Result<&[u8], RoughtimeError> {
    let nonce = nonce.ok_or(RoughtimeError::InvalidRequest(RequestProblem::MissingNonce))?;
    let expected = version.nonce_length();
    if nonce.len() != expected {
        return Err(RoughtimeError::InvalidRequest(RequestProblem::NonceLength {
            expected,
            actual: nonce.len(),
        }));
    }
    Ok(nonce)
}

/// Check a request's `TYPE` value. The current draft requires an explicit
/// zero; earlier versions carry no `TYPE` and impose no constraint.
pub fn validate_type(version: Version, type_value: Option<&[u8]>) -> Result<(), RoughtimeError> {
    if !version.is_modern() {
        return Ok(());
    }
    let raw = type_value.ok_or(RoughtimeError::InvalidRequest(RequestProblem::MissingType))?;
    let value = crate::wire::read_u32(raw)?;
    if value != 0 {
        return Err(RoughtimeError::InvalidRequest(RequestProblem::WrongType {
            value,
        }));
    }
    Ok(())
}

/// Check a request's offered version list. The current draft requires a
/// non-empty, strictly ascending list of at most 32 entries; earlier
/// versions impose no constraint.
pub fn validate_version_list(version: Version, list: &[u32]) -> Result<(), RoughtimeError> {
    if !version.is_modern() {
        return Ok(());
    }
    if list.is_empty() {
        return Err(RoughtimeError::InvalidRequest(
            RequestProblem::VersionListEmpty,
        ));
    }
    if list.len() > 32 {
        return Err(RoughtimeError::InvalidRequest(
            RequestProblem::TooManyVersions { count: list.len() },
        ));
    }
    if list.windows(2).any(|w| w[0] >= w[1]) {
        return Err(RoughtimeError::InvalidRequest(
            RequestProblem::VersionListNotAscending,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_version_no_list() {
        assert_eq!(choose_version(None), Version::CLASSIC);
        assert_eq!(choose_version(Some(&[])), Version::CLASSIC);
    }

    #[test]
    fn test_choose_version_takes_max_overlap() {
        assert_eq!(
            choose_version(Some(&[0x8000_0001, 0x8000_000c])),
            Version::CURRENT
        );
        assert_eq!(
            choose_version(Some(&[0x8000_0008, 0x8000_0003])),
            Version::draft(8)
        );
    }

    #[test]
    fn test_choose_version_no_overlap_falls_back_to_fiducial() {
        assert_eq!(choose_version(Some(&[0x9999_9999])), Version::CURRENT);
        // Expired drafts are not overlap either.
        assert_eq!(
            choose_version(Some(&[0x8000_0005, 0x8000_0007])),
            Version::CURRENT
        );
    }

    #[test]
    fn test_choose_version_prefers_rfc_release() {
        assert_eq!(
            choose_version(Some(&[0x8000_000c, 1, 0x8000_0008])),
            Version::RFC_RELEASE
        );
    }

    #[test]
    fn test_choose_version_normalizes_sentinel() {
        assert_eq!(
            choose_version(Some(&[CLASSIC_WIRE_SENTINEL])),
            Version::CLASSIC
        );
    }

    #[test]
    fn test_supported_set() {
        assert!(Version::CLASSIC.is_supported());
        assert!(Version::CURRENT.is_supported());
        assert!(Version::draft(6).is_supported());
        assert!(!Version::draft(5).is_supported());
        assert!(!Version::draft(7).is_supported());
        assert!(!Version(0x8000_000d).is_supported());
    }

    #[test]
    fn test_nonce_lengths() {
        assert_eq!(Version::CLASSIC.nonce_length(), 64);
        assert_eq!(Version::draft(1).nonce_length(), 64);
        assert_eq!(Version::draft(4).nonce_length(), 64);
        assert_eq!(Version::draft(6).nonce_length(), 32);
        assert_eq!(Version::draft(8).nonce_length(), 32);
        assert_eq!(Version::CURRENT.nonce_length(), 32);
        assert_eq!(Version::RFC_RELEASE.nonce_length(), 32);
    }

    #[test]
    fn test_pad_tags() {
        assert_eq!(Version::CLASSIC.pad_tag(), Tag::PAD_CLASSIC);
        assert_eq!(Version::draft(1).pad_tag(), Tag::PAD);
        assert_eq!(Version::draft(6).pad_tag(), Tag::PAD);
        assert_eq!(Version::draft(8).pad_tag(), Tag::ZZZZ);
        assert_eq!(Version::CURRENT.pad_tag(), Tag::ZZZZ);
    }

    #[test]
    fn test_merkle_options() {
        assert_eq!(Version::CLASSIC.merkle_options().hash_size, 64);
        assert_eq!(Version::draft(1).merkle_options().hash_size, 32);
        assert_eq!(Version::CURRENT.merkle_options().hash_size, 32);
    }

    #[test]
    fn test_leaf_selection() {
        assert!(!Version::CLASSIC.leaf_is_request());
        assert!(!Version::draft(11).leaf_is_request());
        assert!(Version::CURRENT.leaf_is_request());
        assert!(Version::RFC_RELEASE.leaf_is_request());
    }

    #[test]
    fn test_delegation_contexts() {
        assert_eq!(
            Version::CLASSIC.delegation_context(),
            DELEGATION_CONTEXT_LEGACY
        );
        assert_eq!(
            Version::draft(11).delegation_context(),
            DELEGATION_CONTEXT_LEGACY
        );
        assert_eq!(Version::CURRENT.delegation_context(), DELEGATION_CONTEXT);
    }

    #[test]
    fn test_batching_restriction() {
        assert!(!Version::draft(1).supports_batching());
        assert!(!Version::draft(2).supports_batching());
        assert!(Version::CLASSIC.supports_batching());
        assert!(Version::draft(3).supports_batching());
        assert!(Version::CURRENT.supports_batching());
    }

    #[test]
    fn test_advertised_versions_ascending_and_filtered() {
        let vers = advertised_versions();
        assert!(!vers.contains(&0));
        assert!(!vers.contains(&1));
        assert!(vers.windows(2).all(|w| w[0] < w[1]));
        assert!(vers.contains(&0x8000_000c));
        assert!(!vers.contains(&0x8000_0005));
    }

    #[test]
    fn test_validate_nonce() {
        assert!(matches!(
            validate_nonce(Version::CURRENT, None),
            Err(RoughtimeError::InvalidRequest(RequestProblem::MissingNonce))
        ));
        assert!(matches!(
            validate_nonce(Version::CURRENT, Some(&[0; 64])),
            Err(RoughtimeError::InvalidRequest(
                RequestProblem::NonceLength {
                    expected: 32,
                    actual: 64
                }
            ))
        ));
        assert!(validate_nonce(Version::CURRENT, Some(&[0; 32])).is_ok());
        assert!(validate_nonce(Version::CLASSIC, Some(&[0; 64])).is_ok());
    }

    #[test]
    fn test_validate_type() {
        assert!(validate_type(Version::draft(8), None).is_ok());
        assert!(matches!(
            validate_type(Version::CURRENT, None),
            Err(RoughtimeError::InvalidRequest(RequestProblem::MissingType))
        ));
        assert!(validate_type(Version::CURRENT, Some(&0u32.to_le_bytes())).is_ok());
        assert!(matches!(
            validate_type(Version::CURRENT, Some(&1u32.to_le_bytes())),
            Err(RoughtimeError::InvalidRequest(RequestProblem::WrongType {
                value: 1
            }))
        ));
    }

    #[test]
    fn test_validate_version_list() {
        assert!(validate_version_list(Version::draft(8), &[]).is_ok());
        assert!(matches!(
            validate_version_list(Version::CURRENT, &[]),
            Err(RoughtimeError::InvalidRequest(
                RequestProblem::VersionListEmpty
            ))
        ));
        assert!(matches!(
            validate_version_list(Version::CURRENT, &[2, 1]),
            Err(RoughtimeError::InvalidRequest(
                RequestProblem::VersionListNotAscending
            ))
        ));
        let long: Vec<u32> = (0..33).collect();
        assert!(matches!(
            validate_version_list(Version::CURRENT, &long),
            Err(RoughtimeError::InvalidRequest(
                RequestProblem::TooManyVersions { count: 33 }
            ))
        ));
        assert!(validate_version_list(Version::CURRENT, &[0x8000_0008, 0x8000_000c]).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::CLASSIC.to_string(), "classic");
        assert_eq!(Version::CURRENT.to_string(), "draft-12");
        assert_eq!(Version::RFC_RELEASE.to_string(), "rfc");
    }
}
