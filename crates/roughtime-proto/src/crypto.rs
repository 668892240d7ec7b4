// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Ed25519 signing with Roughtime context prefixes, SHA-512 helpers, and the
//! SRV server-identifier hash.
//!
//! Every Roughtime signature covers `context ‖ message`, where the context is
//! a NUL-terminated ASCII string that domain-separates delegation signatures
//! from response signatures (and, for older versions, the legacy delegation
//! context from the modern one).

use ring::digest;
use ring::rand::SecureRandom;
use ring::signature::{self, Ed25519KeyPair, KeyPair, UnparsedPublicKey};

use crate::error::RoughtimeError;

/// Context prefixed to the server's signature over the signed response
/// payload, for every protocol version.
pub const SIGNED_RESPONSE_CONTEXT: &[u8] = b"RoughTime v1 response signature\0";

/// Context prefixed to delegation signatures for the current draft.
pub const DELEGATION_CONTEXT: &[u8] = b"RoughTime v1 delegation signature\0";

/// Context prefixed to delegation signatures for the Google wire and IETF
/// drafts 1 through 11.
pub const DELEGATION_CONTEXT_LEGACY: &[u8] = b"RoughTime v1 delegation signature--\0";

/// Size in bytes of an Ed25519 public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Size in bytes of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Size in bytes of an Ed25519 private-key seed.
pub const SEED_LENGTH: usize = 32;

/// SHA-512 over an optional single prefix byte followed by the given input
/// buffers, fed as successive updates of one computation.
pub(crate) fn sha512_prefixed(prefix: Option<u8>, parts: &[&[u8]]) -> [u8; 64] {
    let mut ctx = digest::Context::new(&digest::SHA512);
    if let Some(byte) = prefix {
        ctx.update(&[byte]);
    }
    for part in parts {
        ctx.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

/// An Ed25519 key pair that remembers its raw seed.
///
/// `ring` key pairs are one-way (the seed cannot be extracted), so the seed
/// is kept alongside to support the raw-32-byte round-trip the key-on-disk
/// lifecycle needs. Each signing call owns its own transient computation;
/// the type is freely shareable across threads.
pub struct SigningKey {
    seed: [u8; 32],
    keypair: Ed25519KeyPair,
}

impl SigningKey {
    /// Generate a fresh key pair from the given entropy source.
    pub fn generate(rng: &dyn SecureRandom) -> Result<SigningKey, RoughtimeError> {
        let mut seed = [0u8; SEED_LENGTH];
        rng.fill(&mut seed)
            .map_err(|_| RoughtimeError::InputValidation {
                what: "entropy source failed",
            })?;
        SigningKey::from_seed(&seed)
    }

    /// Construct a key pair from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<SigningKey, RoughtimeError> {
        if seed.len() != SEED_LENGTH {
            return Err(RoughtimeError::InputValidation {
                what: "private key seed must be 32 bytes",
            });
        }
        let keypair = Ed25519KeyPair::from_seed_unchecked(seed).map_err(|_| {
            RoughtimeError::InputValidation {
                what: "seed rejected by ed25519 key derivation",
            }
        })?;
        let mut owned = [0u8; SEED_LENGTH];
        owned.copy_from_slice(seed);
        Ok(SigningKey {
            seed: owned,
            keypair,
        })
    }

    /// The raw 32-byte seed this key pair was derived from.
    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    /// The raw 32-byte public key.
    pub fn public_key(&self) -> [u8; 32] {
        let mut out = [0u8; PUBLIC_KEY_LENGTH];
        out.copy_from_slice(self.keypair.public_key().as_ref());
        out
    }

    /// Sign `context ‖ data`, returning the 64-byte signature.
    ///
    /// Ed25519 signing is deterministic: equal inputs yield equal output.
    pub fn sign_with_context(&self, context: &[u8], data: &[u8]) -> [u8; 64] {
        let mut message = Vec::with_capacity(context.len() + data.len());
        message.extend_from_slice(context);
        message.extend_from_slice(data);
        let sig = self.keypair.sign(&message);
        let mut out = [0u8; SIGNATURE_LENGTH];
        out.copy_from_slice(sig.as_ref());
        out
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never print the seed.
        let public = self.public_key();
        write!(f, "SigningKey(public=")?;
        for b in &public[..8] {
            write!(f, "{b:02x}")?;
        }
        write!(f, "…)")
    }
}

/// Verify a 64-byte Ed25519 signature over `context ‖ data`.
///
/// Returns `false` for any failure, including malformed key or signature
/// lengths.
pub fn verify_with_context(context: &[u8], data: &[u8], public_key: &[u8], sig: &[u8]) -> bool {
    if public_key.len() != PUBLIC_KEY_LENGTH || sig.len() != SIGNATURE_LENGTH {
        return false;
    }
    let key = UnparsedPublicKey::new(&signature::ED25519, public_key);
    let mut message = Vec::with_capacity(context.len() + data.len());
    message.extend_from_slice(context);
    message.extend_from_slice(data);
    key.verify(&message, sig).is_ok()
}

/// Copy a raw public key out of a slice, enforcing the 32-byte length.
pub fn public_key_from_slice(bytes: &[u8]) -> Result<[u8; 32], RoughtimeError> {
    bytes
        .try_into()
        .map_err(|_| RoughtimeError::InputValidation {
            what: "public key must be 32 bytes",
        })
}

/// The SRV server identifier: `SHA-512(0xFF ‖ long_term_public_key)[..32]`.
///
/// Clients place this in requests so a server can refuse traffic aimed at a
/// different operator.
pub fn server_id_hash(long_term_public_key: &[u8; 32]) -> [u8; 32] {
    let digest = sha512_prefixed(Some(0xFF), &[long_term_public_key]);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// Derive a chained nonce from a previous response: the first `nonce_length`
/// bytes of `SHA-512(previous_response ‖ blind)`.
///
/// Chaining lets a client later prove the order of its exchanges: each nonce
/// commits to the response that preceded it.
pub fn chained_nonce(previous_response: &[u8], blind: &[u8; 32], nonce_length: usize) -> Vec<u8> {
    let digest = sha512_prefixed(None, &[previous_response, blind]);
    digest[..nonce_length.min(64)].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::rand::SystemRandom;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    // RFC 8032 section 7.1, test vector 1.
    const RFC8032_SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    const RFC8032_PUBLIC: &str =
        "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
    const RFC8032_SIG_EMPTY: &str = "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b";

    #[test]
    fn test_rfc8032_vector_1() {
        let key = SigningKey::from_seed(&unhex(RFC8032_SEED)).unwrap();
        assert_eq!(hex(&key.public_key()), RFC8032_PUBLIC);
        let sig = key.sign_with_context(b"", b"");
        assert_eq!(hex(&sig), RFC8032_SIG_EMPTY);
        assert!(verify_with_context(b"", b"", &key.public_key(), &sig));
    }

    #[test]
    fn test_seed_roundtrip() {
        let rng = SystemRandom::new();
        let key = SigningKey::generate(&rng).unwrap();
        let restored = SigningKey::from_seed(&key.seed()).unwrap();
        assert_eq!(key.public_key(), restored.public_key());
    }

    #[test]
    fn test_from_seed_rejects_wrong_length() {
        assert!(SigningKey::from_seed(&[0; 16]).is_err());
        assert!(SigningKey::from_seed(&[0; 33]).is_err());
    }

    #[test]
    fn test_sign_is_deterministic() {
        let rng = SystemRandom::new();
        let key = SigningKey::generate(&rng).unwrap();
        let a = key.sign_with_context(SIGNED_RESPONSE_CONTEXT, b"payload");
        let b = key.sign_with_context(SIGNED_RESPONSE_CONTEXT, b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn test_context_separates_signatures() {
        let rng = SystemRandom::new();
        let key = SigningKey::generate(&rng).unwrap();
        let public = key.public_key();
        let sig = key.sign_with_context(DELEGATION_CONTEXT, b"dele");

        assert!(verify_with_context(DELEGATION_CONTEXT, b"dele", &public, &sig));
        assert!(!verify_with_context(
            DELEGATION_CONTEXT_LEGACY,
            b"dele",
            &public,
            &sig
        ));
        assert!(!verify_with_context(
            SIGNED_RESPONSE_CONTEXT,
            b"dele",
            &public,
            &sig
        ));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let rng = SystemRandom::new();
        let key = SigningKey::generate(&rng).unwrap();
        let public = key.public_key();
        let sig = key.sign_with_context(SIGNED_RESPONSE_CONTEXT, b"message");

        assert!(verify_with_context(
            SIGNED_RESPONSE_CONTEXT,
            b"message",
            &public,
            &sig
        ));
        // Flip one bit in the message.
        assert!(!verify_with_context(
            SIGNED_RESPONSE_CONTEXT,
            b"messagf",
            &public,
            &sig
        ));
        // Flip one bit in the signature.
        let mut bad_sig = sig;
        bad_sig[0] ^= 1;
        assert!(!verify_with_context(
            SIGNED_RESPONSE_CONTEXT,
            b"message",
            &public,
            &bad_sig
        ));
        // Wrong key.
        let other = SigningKey::generate(&rng).unwrap();
        assert!(!verify_with_context(
            SIGNED_RESPONSE_CONTEXT,
            b"message",
            &other.public_key(),
            &sig
        ));
    }

    #[test]
    fn test_verify_rejects_bad_lengths() {
        assert!(!verify_with_context(b"", b"m", &[0; 31], &[0; 64]));
        assert!(!verify_with_context(b"", b"m", &[0; 32], &[0; 63]));
    }

    #[test]
    fn test_context_strings_are_nul_terminated() {
        assert_eq!(SIGNED_RESPONSE_CONTEXT.last(), Some(&0));
        assert_eq!(DELEGATION_CONTEXT.last(), Some(&0));
        assert_eq!(DELEGATION_CONTEXT_LEGACY.last(), Some(&0));
        assert_eq!(SIGNED_RESPONSE_CONTEXT.len(), 32);
        assert_eq!(DELEGATION_CONTEXT.len(), 34);
        assert_eq!(DELEGATION_CONTEXT_LEGACY.len(), 36);
    }

    #[test]
    fn test_server_id_hash_differs_from_plain_hash() {
        let key = [0x42u8; 32];
        let srv = server_id_hash(&key);
        let plain = sha512_prefixed(None, &[&key]);
        assert_ne!(srv, plain[..32]);
    }

    #[test]
    fn test_public_key_from_slice() {
        assert!(public_key_from_slice(&[0; 32]).is_ok());
        assert!(public_key_from_slice(&[0; 31]).is_err());
        assert!(public_key_from_slice(&[0; 64]).is_err());
    }

    #[test]
    fn test_chained_nonce_deterministic_and_bound() {
        let blind = [0xBB; 32];
        let a = chained_nonce(b"previous response", &blind, 32);
        let b = chained_nonce(b"previous response", &blind, 32);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);

        let c = chained_nonce(b"previous responsf", &blind, 32);
        assert_ne!(a, c);

        let long = chained_nonce(b"previous response", &blind, 64);
        assert_eq!(long.len(), 64);
        assert_eq!(&long[..32], a.as_slice());
    }
}
