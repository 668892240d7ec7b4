// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime tag codec.
//!
//! A tag is 4 bytes, usually 1–4 printable ASCII characters right-padded with
//! NUL. The one exception in the wild is the Google-era padding tag, whose
//! fourth byte is `0xFF`; it round-trips as raw bytes. Tags compare and sort
//! by their value read as a little-endian `u32`, which is also the order they
//! must appear in on the wire.

use core::cmp::Ordering;
use core::fmt;

use crate::error::RoughtimeError;

/// A 4-byte Roughtime tag.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Tag([u8; 4]);

impl Tag {
    /// Certificate: nested `DELE` and `SIG`.
    pub const CERT: Tag = Tag(*b"CERT");
    /// Delegation: nested `PUBK`, `MINT`, `MAXT`.
    pub const DELE: Tag = Tag(*b"DELE");
    /// Index of the request's leaf in the Merkle tree.
    pub const INDX: Tag = Tag(*b"INDX");
    /// End of the delegation validity window.
    pub const MAXT: Tag = Tag(*b"MAXT");
    /// Midpoint of the server's time estimate.
    pub const MIDP: Tag = Tag(*b"MIDP");
    /// Start of the delegation validity window.
    pub const MINT: Tag = Tag(*b"MINT");
    /// Client nonce.
    pub const NONC: Tag = Tag(*b"NONC");
    /// Padding used by IETF drafts 1 through 7.
    pub const PAD: Tag = Tag(*b"PAD\0");
    /// Padding used by the Google-era wire format (`PAD` followed by `0xFF`).
    pub const PAD_CLASSIC: Tag = Tag([b'P', b'A', b'D', 0xFF]);
    /// Merkle path from the leaf to the root.
    pub const PATH: Tag = Tag(*b"PATH");
    /// Delegated online public key (32 bytes, Ed25519).
    pub const PUBK: Tag = Tag(*b"PUBK");
    /// Radius of the server's time estimate.
    pub const RADI: Tag = Tag(*b"RADI");
    /// Merkle tree root.
    pub const ROOT: Tag = Tag(*b"ROOT");
    /// Ed25519 signature (64 bytes).
    pub const SIG: Tag = Tag(*b"SIG\0");
    /// Signed response payload.
    pub const SREP: Tag = Tag(*b"SREP");
    /// Hash of the server's long-term public key.
    pub const SRV: Tag = Tag(*b"SRV\0");
    /// Message type: 0 in requests, 1 in responses.
    pub const TYPE: Tag = Tag(*b"TYPE");
    /// Version: the client's offered list in requests, the negotiated
    /// version in responses.
    pub const VER: Tag = Tag(*b"VER\0");
    /// The server's supported version list (signed response payload).
    pub const VERS: Tag = Tag(*b"VERS");
    /// Padding used by IETF drafts 8 and later.
    pub const ZZZZ: Tag = Tag(*b"ZZZZ");

    /// Create a tag from its raw 4 bytes, passed through unchanged.
    pub const fn from_bytes(bytes: [u8; 4]) -> Tag {
        Tag(bytes)
    }

    /// Create a tag from a 1–4 character ASCII name, right-padded with NUL.
    pub fn from_name(name: &str) -> Result<Tag, RoughtimeError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(RoughtimeError::BadTag {
                reason: "name must be 1 to 4 characters",
            });
        }
        if !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(RoughtimeError::BadTag {
                reason: "name must be printable ASCII",
            });
        }
        let mut out = [0u8; 4];
        out[..bytes.len()].copy_from_slice(bytes);
        Ok(Tag(out))
    }

    /// The raw 4 bytes of this tag.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The tag's numeric value: its bytes read as a little-endian `u32`.
    /// This is the wire sort key.
    pub const fn number(self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// The ASCII name, if every byte is printable ASCII or trailing NUL
    /// padding. Returns `None` for raw tags such as the Google padding tag.
    pub fn name(&self) -> Option<&str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(4);
        // NULs may only pad on the right.
        if self.0[end..].iter().any(|&b| b != 0) {
            return None;
        }
        if !self.0[..end].iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        core::str::from_utf8(&self.0[..end]).ok()
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Tag) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Tag) -> Ordering {
        self.number().cmp(&other.number())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => {
                for b in &self.0 {
                    if b.is_ascii_graphic() {
                        write!(f, "{}", *b as char)?;
                    } else {
                        write!(f, "\\x{b:02x}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}
