//! Ticket ⇄ cookie text.
//!
//! ## Constructions
//!
//! ```text
//! Modern (encrypt-then-MAC)
//!   payload = serialize(ticket)
//!   iv, ct  = AES-CBC(cipher_key, payload)
//!   tag     = HMAC(mac_key, iv || ct)
//!   cookie  = HEX(iv || ct || tag)
//!
//! LegacyFramework45 (MAC-then-encrypt)
//!   payload = serialize(ticket)
//!   tag     = HMAC(mac_key, payload)
//!   iv, ct  = AES-CBC(cipher_key, payload || tag)
//!   cookie  = HEX(iv || ct)
//! ```
//!
//! Cookies are written as uppercase hex and read in either case.
//!
//! ## Decoding order
//!
//! Nothing inside the payload is parsed until the tag has been checked.
//! In the legacy construction the tag is inside the ciphertext, so the
//! payload has to be decrypted first; padding and tag are then checked
//! together and a failure of either is the same [`Error::Integrity`].
//! Expiry is only looked at once the ticket has authenticated.

use chrono::{DateTime, Utc};
use subtle::{ConstantTimeEq, ConstantTimeLess};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::cipher::{self, BLOCK_SIZE, Iv};
use crate::crypto::kdf::{self, SubKeys};
use crate::crypto::mac;
use crate::formats::ticket::{Ticket, deserialize, serialize};
use crate::keys::{KeyMaterial, hex_decode};
use crate::mode::{CompatibilityMode, HashAlgorithm};
use crate::{Error, Result};

/// Encodes and decodes ticket cookies for one key pair and mode.
///
/// Keys are checked and derived once in the constructor. The codec holds
/// no other state, so one instance can serve any number of threads.
pub struct TicketCodec {
    mode: CompatibilityMode,
    hash: HashAlgorithm,
    keys: SubKeys,
    enforce_expiry: bool,
}

impl TicketCodec {
    /// Build a codec using the mode's default hash algorithm.
    pub fn new(keys: &KeyMaterial, mode: CompatibilityMode) -> Result<Self> {
        Self::with_hash(keys, mode, mode.default_hash())
    }

    /// Build a codec with an explicit MAC hash algorithm.
    ///
    /// Fails with [`Error::KeyLength`] if either key is unsuitable for the
    /// chosen mode and hash.
    pub fn with_hash(
        keys: &KeyMaterial,
        mode: CompatibilityMode,
        hash: HashAlgorithm,
    ) -> Result<Self> {
        let keys = kdf::derive_keys(keys.validation_key(), keys.decryption_key(), mode, hash)?;
        Ok(Self {
            mode,
            hash,
            keys,
            enforce_expiry: true,
        })
    }

    /// Whether [`decode`](Self::decode) rejects expired tickets with
    /// [`Error::Expired`]. On by default.
    pub fn enforce_expiry(mut self, enforce: bool) -> Self {
        self.enforce_expiry = enforce;
        self
    }

    /// The construction this codec uses.
    pub fn mode(&self) -> CompatibilityMode {
        self.mode
    }

    /// The MAC hash this codec uses.
    pub fn hash(&self) -> HashAlgorithm {
        self.hash
    }

    /// Serialize, protect and hex-encode `ticket`.
    pub fn encode(&self, ticket: &Ticket) -> Result<String> {
        self.encode_with_iv(ticket, &cipher::generate_iv())
    }

    pub(crate) fn encode_with_iv(&self, ticket: &Ticket, iv: &Iv) -> Result<String> {
        let payload = Zeroizing::new(serialize(ticket)?);
        let blob = match self.mode {
            CompatibilityMode::Modern => self.seal_modern(&payload, iv)?,
            CompatibilityMode::LegacyFramework45 => self.seal_legacy(&payload, iv)?,
        };
        debug!(mode = %self.mode, len = blob.len(), "encoded ticket cookie");
        Ok(hex::encode_upper(blob))
    }

    /// Decode `cookie`, checking expiry against the system clock.
    pub fn decode(&self, cookie: &str) -> Result<Ticket> {
        self.decode_at(cookie, Utc::now())
    }

    /// Decode `cookie`, checking expiry against `now`.
    pub fn decode_at(&self, cookie: &str, now: DateTime<Utc>) -> Result<Ticket> {
        let blob = hex_decode(cookie)?;
        let opened = match self.mode {
            CompatibilityMode::Modern => self.open_modern(&blob),
            CompatibilityMode::LegacyFramework45 => self.open_legacy(&blob),
        };
        let ticket = match opened {
            Ok(ticket) => ticket,
            Err(e) => {
                debug!(mode = %self.mode, len = blob.len(), error = %e, "rejected ticket cookie");
                return Err(e);
            }
        };

        if self.enforce_expiry && ticket.is_expired_at(now) {
            debug!(mode = %self.mode, "authenticated ticket has expired");
            return Err(Error::Expired);
        }
        Ok(ticket)
    }

    fn seal_modern(&self, payload: &[u8], iv: &Iv) -> Result<Vec<u8>> {
        let ciphertext = cipher::encrypt_with_iv(payload, &self.keys.cipher_key, iv)?;
        let tag = mac::compute(&[iv.as_slice(), &ciphertext], &self.keys.mac_key, self.hash);

        let mut blob = Vec::with_capacity(BLOCK_SIZE + ciphertext.len() + tag.len());
        blob.extend_from_slice(iv);
        blob.extend_from_slice(&ciphertext);
        blob.extend_from_slice(&tag);
        Ok(blob)
    }

    fn seal_legacy(&self, payload: &[u8], iv: &Iv) -> Result<Vec<u8>> {
        let tag = mac::compute(&[payload], &self.keys.mac_key, self.hash);
        let mut signed = Zeroizing::new(Vec::with_capacity(payload.len() + tag.len()));
        signed.extend_from_slice(payload);
        signed.extend_from_slice(&tag);
        let ciphertext = cipher::encrypt_with_iv(&signed, &self.keys.cipher_key, iv)?;

        let mut blob = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
        blob.extend_from_slice(iv);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn open_modern(&self, blob: &[u8]) -> Result<Ticket> {
        let tag_len = mac::tag_len(self.hash);
        let Some(body_len) = blob.len().checked_sub(BLOCK_SIZE + tag_len) else {
            return Err(Error::Integrity);
        };
        if body_len == 0 || body_len % BLOCK_SIZE != 0 {
            return Err(Error::Integrity);
        }
        let (iv, rest) = split_iv(blob)?;
        let (ciphertext, tag) = rest.split_at(body_len);

        if !mac::verify(&[iv.as_slice(), ciphertext], tag, &self.keys.mac_key, self.hash) {
            return Err(Error::Integrity);
        }
        let payload = cipher::decrypt(iv, ciphertext, &self.keys.cipher_key)
            .map_err(|_| Error::Integrity)?;
        deserialize(&payload)
    }

    fn open_legacy(&self, blob: &[u8]) -> Result<Ticket> {
        let tag_len = mac::tag_len(self.hash);
        let Some(body_len) = blob.len().checked_sub(BLOCK_SIZE) else {
            return Err(Error::Integrity);
        };
        if body_len == 0 || body_len % BLOCK_SIZE != 0 {
            return Err(Error::Integrity);
        }
        let (iv, ciphertext) = split_iv(blob)?;

        let plaintext = cipher::decrypt_blocks(iv, ciphertext, &self.keys.cipher_key)
            .map_err(|_| Error::Integrity)?;
        let (len, padding_ok) = cipher::unpad(&plaintext);

        // Always run the MAC, whatever the padding said, so a padding
        // failure costs the same as a tag mismatch.
        let too_short = (len as u64).ct_lt(&(tag_len as u64));
        let split = len.saturating_sub(tag_len);
        let tag_end = (split + tag_len).min(plaintext.len());
        let payload = &plaintext[..split];
        let tag = &plaintext[split..tag_end];
        let tag_ok = mac::verify_choice(&[payload], tag, &self.keys.mac_key, self.hash)
            & (tag.len() as u64).ct_eq(&(tag_len as u64));

        if !bool::from(padding_ok & tag_ok & !too_short) {
            return Err(Error::Integrity);
        }
        deserialize(payload)
    }
}

fn split_iv(blob: &[u8]) -> Result<(&Iv, &[u8])> {
    let (iv, rest) = blob.split_at(BLOCK_SIZE);
    let iv: &Iv = iv.try_into().map_err(|_| Error::Integrity)?;
    Ok((iv, rest))
}

/// Encode `ticket` into cookie text with raw key bytes.
pub fn encode_ticket(
    ticket: &Ticket,
    validation_key: &[u8],
    decryption_key: &[u8],
    mode: CompatibilityMode,
) -> Result<String> {
    let keys = KeyMaterial::new(validation_key, decryption_key);
    TicketCodec::new(&keys, mode)?.encode(ticket)
}

/// Decode cookie text into a ticket with raw key bytes, rejecting expired
/// tickets.
pub fn decode_ticket(
    cookie: &str,
    validation_key: &[u8],
    decryption_key: &[u8],
    mode: CompatibilityMode,
) -> Result<Ticket> {
    let keys = KeyMaterial::new(validation_key, decryption_key);
    TicketCodec::new(&keys, mode)?.decode(cookie)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    const MODERN_VECTOR: &str = "\
        A0A1A2A3A4A5A6A7A8A9AAABACADAEAFDD07609BADF1C8395AA08D680753E849C405BFB4C5DC\
        FF38B597C92915B9E5699F45AE727B8C2AA57D0391280FB80F47D81AAC56827CDBB649047A4E\
        DACF9E40AD14946DB55ED4B5D5CC7CEAD977C480";

    const LEGACY_VECTOR: &str = "\
        A0A1A2A3A4A5A6A7A8A9AAABACADAEAF58F475DF5E4410F2F786B35ABA52083C422860BFB352\
        4B5BA682DBF67BC8F0D7C6D5523AEDC18925E455CEFCDE3B2B416B736F6135474393792ACC9C\
        9629C473";

    fn keys() -> KeyMaterial {
        KeyMaterial::new((0x00u8..0x40).collect::<Vec<_>>(), (0x40u8..0x60).collect::<Vec<_>>())
    }

    fn fixed_iv() -> Iv {
        let mut iv = [0u8; BLOCK_SIZE];
        for (i, b) in iv.iter_mut().enumerate() {
            *b = 0xA0 + i as u8;
        }
        iv
    }

    fn alice() -> Ticket {
        let issue = DateTime::from_timestamp(1_700_000_000, 123_456_700).unwrap();
        Ticket::new("alice").with_dates(issue, issue + Duration::hours(72))
    }

    #[test]
    fn modern_known_answer() {
        let codec = TicketCodec::new(&keys(), CompatibilityMode::Modern).unwrap();
        let cookie = codec.encode_with_iv(&alice(), &fixed_iv()).unwrap();
        assert_eq!(cookie, MODERN_VECTOR);

        let now = alice().issue_date + Duration::hours(1);
        assert_eq!(codec.decode_at(MODERN_VECTOR, now).unwrap(), alice());
        assert_eq!(
            codec.decode_at(&MODERN_VECTOR.to_lowercase(), now).unwrap(),
            alice()
        );
    }

    #[test]
    fn legacy_known_answer() {
        let codec = TicketCodec::new(&keys(), CompatibilityMode::LegacyFramework45).unwrap();
        let cookie = codec.encode_with_iv(&alice(), &fixed_iv()).unwrap();
        assert_eq!(cookie, LEGACY_VECTOR);

        let now = alice().issue_date + Duration::hours(1);
        assert_eq!(codec.decode_at(LEGACY_VECTOR, now).unwrap(), alice());
    }

    #[test]
    fn expiry_is_checked_against_supplied_clock() {
        let codec = TicketCodec::new(&keys(), CompatibilityMode::Modern).unwrap();
        let after = alice().expiration;
        assert!(matches!(
            codec.decode_at(MODERN_VECTOR, after),
            Err(Error::Expired)
        ));

        let lenient = TicketCodec::new(&keys(), CompatibilityMode::Modern)
            .unwrap()
            .enforce_expiry(false);
        assert_eq!(lenient.decode_at(MODERN_VECTOR, after).unwrap(), alice());
    }

    #[test]
    fn short_blobs_are_integrity_failures() {
        for mode in [CompatibilityMode::Modern, CompatibilityMode::LegacyFramework45] {
            let codec = TicketCodec::new(&keys(), mode).unwrap();
            for len in [0usize, 8, 16, 31, 32, 48] {
                let cookie = "00".repeat(len);
                assert!(
                    matches!(codec.decode(&cookie), Err(Error::Integrity)),
                    "{mode} with {len} bytes"
                );
            }
        }
    }

    #[test]
    fn non_hex_is_format_error() {
        let codec = TicketCodec::new(&keys(), CompatibilityMode::Modern).unwrap();
        assert!(matches!(codec.decode("not hex!"), Err(Error::Format(_))));
    }

    #[test]
    fn legacy_padding_and_mac_failures_look_alike() {
        let codec = TicketCodec::new(&keys(), CompatibilityMode::LegacyFramework45).unwrap();
        let mut blob = hex::decode(LEGACY_VECTOR).unwrap();
        let n = blob.len();

        // Last byte of the final block: breaks the padding.
        let mut bad_pad = blob.clone();
        bad_pad[n - 1] ^= 0x01;
        // Bit flip in the IV: padding intact, payload (and so the tag) wrong.
        blob[0] ^= 0x01;

        let now = alice().issue_date;
        for bad in [bad_pad, blob] {
            let err = codec.decode_at(&hex::encode(bad), now).unwrap_err();
            assert!(matches!(err, Error::Integrity));
        }
    }

    #[test]
    fn legacy_plaintext_shorter_than_tag_fails_integrity() {
        let keys = keys();
        let codec = TicketCodec::new(&keys, CompatibilityMode::LegacyFramework45).unwrap();
        let iv = fixed_iv();
        // Well padded, but five bytes cannot hold a 20-byte SHA-1 tag.
        let ciphertext = cipher::encrypt_with_iv(b"short", keys.decryption_key(), &iv).unwrap();
        let mut blob = iv.to_vec();
        blob.extend_from_slice(&ciphertext);

        let err = codec.decode_at(&hex::encode(blob), alice().issue_date).unwrap_err();
        assert!(matches!(err, Error::Integrity));
    }

    #[test]
    fn codec_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TicketCodec>();
    }
}
