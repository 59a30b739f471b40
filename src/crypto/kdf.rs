//! Subkey derivation.
//!
//! ## Modern
//!
//! Each raw key is fed separately through the NIST SP 800-108 KDF in
//! counter mode with HMAC-SHA-512 as the PRF:
//!
//! ```text
//! K(i) = HMAC-SHA-512(raw, [i]be32 || label || 0x00 || context || [L]be32)
//! out  = K(1) || K(2) || ...   truncated to L bits
//! ```
//!
//! `label` is `"FormsAuthentication.Ticket"`, `context` is empty, and the
//! output is as long as the raw key it came from.
//!
//! ## LegacyFramework45
//!
//! No derivation: the raw decryption key is the AES key and the raw
//! validation key is the HMAC key.
//!
//! ## IVs
//!
//! No IV material is derived from keys in either mode. Every encryption
//! draws a fresh IV from the OS CSPRNG in [`crate::crypto::cipher`].

use hmac::{Hmac, Mac};
use sha2::Sha512;
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::KeyRole;
use crate::mode::{CompatibilityMode, HashAlgorithm};
use crate::{Error, Result};

/// Label used for ticket subkeys.
pub const TICKET_LABEL: &[u8] = b"FormsAuthentication.Ticket";

/// AES key sizes accepted for the decryption key.
pub const CIPHER_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// Keys actually used by the cipher and MAC engines.
///
/// Both buffers are wiped on drop.
pub struct SubKeys {
    /// HMAC key.
    pub mac_key: Zeroizing<Vec<u8>>,
    /// AES key (16, 24 or 32 bytes).
    pub cipher_key: Zeroizing<Vec<u8>>,
}

/// Check both raw keys against the primitives `mode` and `hash` require,
/// then derive the subkeys.
///
/// Length checks happen before any HMAC is computed. The decryption key
/// must be an AES key size; the validation key must be at least as long as
/// the MAC's tag.
pub fn derive_keys(
    validation_key: &[u8],
    decryption_key: &[u8],
    mode: CompatibilityMode,
    hash: HashAlgorithm,
) -> Result<SubKeys> {
    check_cipher_key(decryption_key)?;
    check_validation_key(validation_key, hash)?;

    let keys = match mode {
        CompatibilityMode::Modern => SubKeys {
            mac_key: sp800_108(validation_key, TICKET_LABEL, &[], validation_key.len())?,
            cipher_key: sp800_108(decryption_key, TICKET_LABEL, &[], decryption_key.len())?,
        },
        CompatibilityMode::LegacyFramework45 => SubKeys {
            mac_key: Zeroizing::new(validation_key.to_vec()),
            cipher_key: Zeroizing::new(decryption_key.to_vec()),
        },
    };
    trace!(
        %mode,
        %hash,
        mac_key_len = keys.mac_key.len(),
        cipher_key_len = keys.cipher_key.len(),
        "derived ticket subkeys"
    );
    Ok(keys)
}

fn check_cipher_key(key: &[u8]) -> Result<()> {
    if CIPHER_KEY_LENGTHS.contains(&key.len()) {
        return Ok(());
    }
    let required = CIPHER_KEY_LENGTHS
        .iter()
        .copied()
        .find(|&n| n >= key.len())
        .unwrap_or(CIPHER_KEY_LENGTHS[CIPHER_KEY_LENGTHS.len() - 1]);
    Err(Error::KeyLength {
        role: KeyRole::Decryption,
        required,
        actual: key.len(),
    })
}

fn check_validation_key(key: &[u8], hash: HashAlgorithm) -> Result<()> {
    let required = hash.output_len();
    if key.len() < required {
        return Err(Error::KeyLength {
            role: KeyRole::Validation,
            required,
            actual: key.len(),
        });
    }
    Ok(())
}

/// NIST SP 800-108 counter-mode KDF with HMAC-SHA-512.
///
/// Produces `out_len` bytes. `out_len * 8` must fit in a `u32`.
pub fn sp800_108(
    master: &[u8],
    label: &[u8],
    context: &[u8],
    out_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let bits = out_len
        .checked_mul(8)
        .and_then(|b| u32::try_from(b).ok())
        .ok_or(Error::Format("derived key length too large"))?;
    // HMAC takes keys of any length, including empty ones.
    let prf = <Hmac<Sha512> as Mac>::new_from_slice(master)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));

    let mut out = Zeroizing::new(Vec::with_capacity(out_len));
    let mut counter = 1u32;
    while out.len() < out_len {
        let mut block = prf.clone();
        block.update(&counter.to_be_bytes());
        block.update(label);
        block.update(&[0x00]);
        block.update(context);
        block.update(&bits.to_be_bytes());
        let k = block.finalize().into_bytes();
        let take = (out_len - out.len()).min(k.len());
        out.extend_from_slice(&k[..take]);
        counter += 1;
    }
    Ok(out)
}
