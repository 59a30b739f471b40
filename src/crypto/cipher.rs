//! AES-CBC encryption of ticket payloads.
//!
//! * Key size selects the variant: 16 → AES-128, 24 → AES-192,
//!   32 → AES-256.
//! * Every call to [`encrypt`] draws a new 16-byte IV from the OS CSPRNG.
//!   The IV travels in the clear in front of the ciphertext.
//! * Plaintext is padded with PKCS#7, so the ciphertext is always at least
//!   one block and a whole number of blocks long.
//!
//! Prepending a random IV is wire-compatible with the older "zero IV plus
//! one random leading plaintext block" convention: the first ciphertext
//! block of that scheme plays exactly the role of our IV.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::{
    Choice, ConditionallySelectable, ConstantTimeEq, ConstantTimeGreater, ConstantTimeLess,
};
use zeroize::Zeroizing;

use crate::crypto::kdf::CIPHER_KEY_LENGTHS;
use crate::error::KeyRole;
use crate::{Error, Result};

/// AES block size in bytes; also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// A CBC initialization vector.
pub type Iv = [u8; BLOCK_SIZE];

macro_rules! with_aes {
    ($key:expr, $iv:expr, $mode:ident, |$c:ident| $body:expr) => {
        match $key.len() {
            16 => {
                let $c = cbc::$mode::<Aes128>::new_from_slices($key, $iv).map_err(|_| bad_key($key))?;
                $body
            }
            24 => {
                let $c = cbc::$mode::<Aes192>::new_from_slices($key, $iv).map_err(|_| bad_key($key))?;
                $body
            }
            32 => {
                let $c = cbc::$mode::<Aes256>::new_from_slices($key, $iv).map_err(|_| bad_key($key))?;
                $body
            }
            _ => return Err(bad_key($key)),
        }
    };
}

/// A fresh IV from the operating system's CSPRNG.
pub fn generate_iv() -> Iv {
    let mut iv = [0u8; BLOCK_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` under `key` with a freshly generated IV.
pub fn encrypt(plaintext: &[u8], key: &[u8]) -> Result<(Iv, Vec<u8>)> {
    let iv = generate_iv();
    let ciphertext = encrypt_with_iv(plaintext, key, &iv)?;
    Ok((iv, ciphertext))
}

/// Encrypt `plaintext` under `key` with a caller-chosen IV.
///
/// Only for reproducing fixed vectors; reusing an IV with the same key
/// leaks plaintext equality.
pub fn encrypt_with_iv(plaintext: &[u8], key: &[u8], iv: &Iv) -> Result<Vec<u8>> {
    let ciphertext = with_aes!(key, iv, Encryptor, |c| c
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext));
    Ok(ciphertext)
}

/// Decrypt and unpad.
///
/// Returns [`Error::Padding`] when the ciphertext is not a positive whole
/// number of blocks or the PKCS#7 padding is malformed.
pub fn decrypt(iv: &Iv, ciphertext: &[u8], key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let mut plaintext = decrypt_blocks(iv, ciphertext, key)?;
    let (len, valid) = unpad(&plaintext);
    if !bool::from(valid) {
        return Err(Error::Padding);
    }
    plaintext.truncate(len);
    Ok(plaintext)
}

/// Decrypt without looking at the padding.
///
/// Fails only on a bad key or a ciphertext length that is not a positive
/// multiple of [`BLOCK_SIZE`]; both are public.
pub(crate) fn decrypt_blocks(iv: &Iv, ciphertext: &[u8], key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::Padding);
    }
    let plaintext = with_aes!(key, iv, Decryptor, |c| c
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| Error::Padding)?);
    Ok(Zeroizing::new(plaintext))
}

/// Locate PKCS#7 padding without branching on secret bytes.
///
/// Returns the unpadded length and whether the padding was valid. When it
/// is not, the length is the full buffer length so callers can keep doing
/// the same amount of work.
pub(crate) fn unpad(buf: &[u8]) -> (usize, Choice) {
    let len = buf.len();
    if len == 0 || len % BLOCK_SIZE != 0 {
        return (len, Choice::from(0));
    }

    let pad = buf[len - 1];
    let mut valid = !pad.ct_eq(&0) & !pad.ct_gt(&(BLOCK_SIZE as u8));
    for (i, &b) in buf[len - BLOCK_SIZE..].iter().rev().enumerate() {
        let in_pad = (i as u8).ct_lt(&pad);
        valid &= !in_pad | b.ct_eq(&pad);
    }

    let pad_len = u64::conditional_select(&0, &u64::from(pad), valid);
    (len - pad_len as usize, valid)
}

fn bad_key(key: &[u8]) -> Error {
    let required = CIPHER_KEY_LENGTHS
        .iter()
        .copied()
        .find(|&n| n >= key.len())
        .unwrap_or(CIPHER_KEY_LENGTHS[CIPHER_KEY_LENGTHS.len() - 1]);
    Error::KeyLength {
        role: KeyRole::Decryption,
        required,
        actual: key.len(),
    }
}
