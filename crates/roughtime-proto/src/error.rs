// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Error types for Roughtime parsing, construction, and verification.
//!
//! [`RoughtimeError`] is a closed sum: every failure the core can produce has
//! a named kind, and validation failures carry the offending bytes so callers
//! can log or display diagnostics. A `From<RoughtimeError> for std::io::Error`
//! conversion lets the networked crates keep `io::Result` signatures while
//! callers downcast via `io::Error::get_ref()` for programmatic matching.

use core::fmt;

use crate::tag::Tag;

/// Errors that can occur while encoding, decoding, or verifying Roughtime
/// messages.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RoughtimeError {
    /// The buffer is shorter than a structure it claims to contain.
    Truncated {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },
    /// The packet header does not start with the `ROUGHTIM` magic.
    BadMagic,
    /// A length is misaligned, inconsistent, or below the policy floor.
    BadLength {
        /// What was being measured.
        what: &'static str,
        /// The length that was required.
        expected: usize,
        /// The length that was found.
        actual: usize,
    },
    /// A tag-value map violates the canonical form rules.
    BadTlv {
        /// Which rule was violated.
        reason: &'static str,
    },
    /// A tag name could not be encoded as a 4-byte tag.
    BadTag {
        /// Which rule the name violated.
        reason: &'static str,
    },
    /// A client request failed validation.
    InvalidRequest(RequestProblem),
    /// A server response is missing a required tag.
    InvalidResponse {
        /// The tag that was expected.
        missing: Tag,
    },
    /// The nonce echoed in a response does not match the request nonce.
    BadNonce {
        /// The nonce the client sent.
        expected: Vec<u8>,
        /// The nonce the server returned.
        actual: Vec<u8>,
    },
    /// The Merkle root reconstructed from the response path does not match
    /// the root the server signed.
    BadRoot {
        /// The root claimed in the signed response.
        expected: Vec<u8>,
        /// The root reconstructed from the leaf, index, and path.
        computed: Vec<u8>,
    },
    /// The delegation certificate signature did not verify under the
    /// server's long-term key.
    BadDele {
        /// The signature bytes that failed to verify.
        signature: Vec<u8>,
    },
    /// The response signature did not verify under the delegated online key.
    BadSrep {
        /// The signature bytes that failed to verify.
        signature: Vec<u8>,
    },
    /// The signed midpoint falls outside the delegation validity window.
    ExpiredDele {
        /// Start of the delegation window (MINT).
        mint: u64,
        /// The signed midpoint (MIDP).
        midp: u64,
        /// End of the delegation window (MAXT).
        maxt: u64,
    },
    /// The version is not in the supported set.
    UnsupportedVersion {
        /// The raw version value.
        version: u32,
    },
    /// A caller-provided input failed validation (wrong-length raw key,
    /// empty Merkle tree, out-of-range index, and so on).
    InputValidation {
        /// What was being validated.
        what: &'static str,
    },
}

/// The specific way a client request failed validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestProblem {
    /// The request carries no `NONC` tag.
    MissingNonce,
    /// The nonce length does not match the negotiated version.
    NonceLength {
        /// The length the version requires.
        expected: usize,
        /// The length that was found.
        actual: usize,
    },
    /// The `VER` value is not a sequence of 32-bit words.
    VersionListMalformed,
    /// The version list is present but empty.
    VersionListEmpty,
    /// The version list exceeds the 32-entry cap.
    TooManyVersions {
        /// Number of entries found.
        count: usize,
    },
    /// The version list is not strictly ascending.
    VersionListNotAscending,
    /// The request carries no `TYPE` tag where one is required.
    MissingType,
    /// The `TYPE` value is not zero.
    WrongType {
        /// The value that was found.
        value: u32,
    },
}

fn fmt_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

impl fmt::Display for RoughtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoughtimeError::Truncated { needed, available } => {
                write!(f, "buffer too short: needed {needed} bytes, got {available}")
            }
            RoughtimeError::BadMagic => write!(f, "invalid Roughtime packet magic"),
            RoughtimeError::BadLength {
                what,
                expected,
                actual,
            } => {
                write!(f, "bad {what} length: expected {expected}, got {actual}")
            }
            RoughtimeError::BadTlv { reason } => write!(f, "malformed tag-value map: {reason}"),
            RoughtimeError::BadTag { reason } => write!(f, "invalid tag name: {reason}"),
            RoughtimeError::InvalidRequest(problem) => write!(f, "invalid request: {problem}"),
            RoughtimeError::InvalidResponse { missing } => {
                write!(f, "response is missing required tag {missing}")
            }
            RoughtimeError::BadNonce { expected, actual } => {
                write!(f, "nonce mismatch: sent ")?;
                fmt_hex(f, expected)?;
                write!(f, ", got ")?;
                fmt_hex(f, actual)
            }
            RoughtimeError::BadRoot { expected, computed } => {
                write!(f, "merkle root mismatch: signed ")?;
                fmt_hex(f, expected)?;
                write!(f, ", reconstructed ")?;
                fmt_hex(f, computed)
            }
            RoughtimeError::BadDele { signature } => {
                write!(f, "delegation signature verification failed: ")?;
                fmt_hex(f, signature)
            }
            RoughtimeError::BadSrep { signature } => {
                write!(f, "response signature verification failed: ")?;
                fmt_hex(f, signature)
            }
            RoughtimeError::ExpiredDele { mint, midp, maxt } => {
                write!(
                    f,
                    "delegation window violated: midpoint {midp} outside [{mint}, {maxt}]"
                )
            }
            RoughtimeError::UnsupportedVersion { version } => {
                write!(f, "unsupported version: {version:#010x}")
            }
            RoughtimeError::InputValidation { what } => write!(f, "invalid input: {what}"),
        }
    }
}

impl fmt::Display for RequestProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestProblem::MissingNonce => write!(f, "missing NONC"),
            RequestProblem::NonceLength { expected, actual } => {
                write!(f, "nonce must be {expected} bytes, got {actual}")
            }
            RequestProblem::VersionListMalformed => {
                write!(f, "VER value is not a sequence of 32-bit words")
            }
            RequestProblem::VersionListEmpty => write!(f, "version list is empty"),
            RequestProblem::TooManyVersions { count } => {
                write!(f, "version list has {count} entries (maximum 32)")
            }
            RequestProblem::VersionListNotAscending => {
                write!(f, "version list is not strictly ascending")
            }
            RequestProblem::MissingType => write!(f, "missing TYPE"),
            RequestProblem::WrongType { value } => {
                write!(f, "TYPE must be 0 in a request, got {value}")
            }
        }
    }
}

impl std::error::Error for RoughtimeError {}
impl std::error::Error for RequestProblem {}

impl From<RoughtimeError> for std::io::Error {
    fn from(err: RoughtimeError) -> std::io::Error {
        let kind = match &err {
            RoughtimeError::Truncated { .. } => std::io::ErrorKind::UnexpectedEof,
            RoughtimeError::BadTag { .. } | RoughtimeError::InputValidation { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            _ => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_truncated() {
        let err = RoughtimeError::Truncated {
            needed: 12,
            available: 4,
        };
        assert_eq!(err.to_string(), "buffer too short: needed 12 bytes, got 4");
    }

    #[test]
    fn test_display_nonce_mismatch() {
        let err = RoughtimeError::BadNonce {
            expected: vec![0xAB, 0xCD],
            actual: vec![0x01, 0x02],
        };
        assert_eq!(err.to_string(), "nonce mismatch: sent abcd, got 0102");
    }

    #[test]
    fn test_display_expired_dele() {
        let err = RoughtimeError::ExpiredDele {
            mint: 100,
            midp: 250,
            maxt: 200,
        };
        assert_eq!(
            err.to_string(),
            "delegation window violated: midpoint 250 outside [100, 200]"
        );
    }

    #[test]
    fn test_display_bad_tag() {
        let err = RoughtimeError::BadTag {
            reason: "name must be 1 to 4 characters",
        };
        assert_eq!(
            err.to_string(),
            "invalid tag name: name must be 1 to 4 characters"
        );
    }

    #[test]
    fn test_display_unsupported_version() {
        let err = RoughtimeError::UnsupportedVersion {
            version: 0x8000_0005,
        };
        assert_eq!(err.to_string(), "unsupported version: 0x80000005");
    }

    #[test]
    fn test_display_request_problem() {
        let err = RoughtimeError::InvalidRequest(RequestProblem::NonceLength {
            expected: 32,
            actual: 64,
        });
        assert_eq!(
            err.to_string(),
            "invalid request: nonce must be 32 bytes, got 64"
        );
    }

    #[test]
    fn test_into_io_error_kinds() {
        let io_err: std::io::Error = RoughtimeError::Truncated {
            needed: 4,
            available: 0,
        }
        .into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::UnexpectedEof);

        let io_err: std::io::Error = RoughtimeError::BadMagic.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::InvalidData);

        let io_err: std::io::Error = RoughtimeError::InputValidation { what: "seed" }.into();
        assert_eq!(io_err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_io_error_downcast_roundtrip() {
        let io_err: std::io::Error = RoughtimeError::BadMagic.into();
        let inner = io_err
            .get_ref()
            .unwrap()
            .downcast_ref::<RoughtimeError>()
            .unwrap();
        assert_eq!(*inner, RoughtimeError::BadMagic);
    }
}
