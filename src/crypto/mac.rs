//! Keyed message authentication.
//!
//! Tags are HMACs over the concatenation of one or more byte slices, so
//! callers can authenticate `iv || ciphertext` without first copying the
//! two into one buffer.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use subtle::{Choice, ConstantTimeEq};

use crate::mode::HashAlgorithm;

// HMAC accepts keys of any length (long keys are hashed, short ones
// padded), so `new_from_slice` never returns an error.
macro_rules! hmac_over {
    ($hash:ty, $key:expr, $parts:expr) => {{
        let mut mac = <Hmac<$hash> as Mac>::new_from_slice($key)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        for part in $parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().to_vec()
    }};
}

/// Compute the HMAC of `parts` (concatenated in order) under `key`.
pub fn compute(parts: &[&[u8]], key: &[u8], hash: HashAlgorithm) -> Vec<u8> {
    match hash {
        HashAlgorithm::Sha1 => hmac_over!(Sha1, key, parts),
        HashAlgorithm::Sha256 => hmac_over!(Sha256, key, parts),
        HashAlgorithm::Sha384 => hmac_over!(Sha384, key, parts),
        HashAlgorithm::Sha512 => hmac_over!(Sha512, key, parts),
    }
}

/// Recompute the HMAC of `parts` and compare it with `tag` in constant
/// time.
pub fn verify(parts: &[&[u8]], tag: &[u8], key: &[u8], hash: HashAlgorithm) -> bool {
    bool::from(verify_choice(parts, tag, key, hash))
}

/// Like [`verify`], but keeps the result as a [`Choice`] so it can be
/// combined with other secret-dependent checks without branching.
pub(crate) fn verify_choice(parts: &[&[u8]], tag: &[u8], key: &[u8], hash: HashAlgorithm) -> Choice {
    // `ct_eq` on slices of unequal length is 0 without inspecting
    // contents; tag length is public.
    compute(parts, key, hash).as_slice().ct_eq(tag)
}

/// Tag length in bytes for `hash`.
pub fn tag_len(hash: HashAlgorithm) -> usize {
    hash.output_len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Vec<u8> {
        (0u8..64).collect()
    }

    #[test]
    fn known_answers() {
        let k = key();
        assert_eq!(
            hex::encode(compute(&[b"abc"], &k[..20], HashAlgorithm::Sha1)),
            "d2761a970b1e72c75a25539511e1b3e350311534"
        );
        assert_eq!(
            hex::encode(compute(&[b"abc"], &k[..32], HashAlgorithm::Sha256)),
            "f0133729c4163dede81e21cd47839256da58171238c8a0d874397c73b14e1e47"
        );
    }

    #[test]
    fn parts_are_concatenated() {
        let k = key();
        for hash in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let whole = compute(&[b"hello world"], &k, hash);
            let split = compute(&[b"hello", b" ", b"world"], &k, hash);
            assert_eq!(whole, split);
            assert_eq!(whole.len(), tag_len(hash));
        }
    }

    #[test]
    fn any_key_length_is_accepted() {
        // Empty, short and longer-than-block keys all produce full tags.
        for len in [0usize, 1, 64] {
            let k = vec![0x0Bu8; len];
            assert_eq!(compute(&[b"abc"], &k, HashAlgorithm::Sha256).len(), 32);
        }
        let long = vec![0x0Bu8; 200];
        assert_eq!(compute(&[b"abc"], &long, HashAlgorithm::Sha1).len(), 20);
    }

    #[test]
    fn verify_detects_any_flip() {
        let k = key();
        let tag = compute(&[b"payload"], &k, HashAlgorithm::Sha256);
        assert!(verify(&[b"payload"], &tag, &k, HashAlgorithm::Sha256));
        for i in 0..tag.len() {
            let mut bad = tag.clone();
            bad[i] ^= 0x01;
            assert!(!verify(&[b"payload"], &bad, &k, HashAlgorithm::Sha256));
        }
        assert!(!verify(&[b"payload"], &tag[..31], &k, HashAlgorithm::Sha256));
        assert!(!verify(&[b"payload"], &tag, &k, HashAlgorithm::Sha1));
    }
}
