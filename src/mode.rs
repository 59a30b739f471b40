//! Compatibility modes and the hash algorithms they select.
//!
//! A [`CompatibilityMode`] names one historical deployment and fixes three
//! things at once:
//!
//! | Mode | Construction | Key schedule | Default MAC hash |
//! |------|--------------|--------------|------------------|
//! | [`CompatibilityMode::Modern`] | encrypt-then-MAC | SP 800-108 (HMAC-SHA-512) | SHA-256 |
//! | [`CompatibilityMode::LegacyFramework45`] | MAC-then-encrypt | raw keys | SHA-1 |
//!
//! The mode is chosen per call and never stored on the ticket.

use std::fmt;

/// Historical construction a cookie was (or must be) produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompatibilityMode {
    /// Encrypt-then-MAC with derived subkeys.
    Modern,
    /// MAC-then-encrypt with the raw keys, reproduced for interoperability.
    LegacyFramework45,
}

impl CompatibilityMode {
    /// Hash algorithm used for the MAC unless the codec overrides it.
    pub fn default_hash(self) -> HashAlgorithm {
        match self {
            CompatibilityMode::Modern => HashAlgorithm::Sha256,
            CompatibilityMode::LegacyFramework45 => HashAlgorithm::Sha1,
        }
    }

    /// `true` when the MAC covers the ciphertext rather than the plaintext.
    pub fn encrypt_then_mac(self) -> bool {
        matches!(self, CompatibilityMode::Modern)
    }
}

impl fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityMode::Modern => f.write_str("modern"),
            CompatibilityMode::LegacyFramework45 => f.write_str("legacy-framework45"),
        }
    }
}

/// HMAC hash function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// HMAC-SHA-1 (20-byte tag).
    Sha1,
    /// HMAC-SHA-256 (32-byte tag).
    Sha256,
    /// HMAC-SHA-384 (48-byte tag).
    Sha384,
    /// HMAC-SHA-512 (64-byte tag).
    Sha512,
}

impl HashAlgorithm {
    /// Digest (and therefore tag) size in bytes.
    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha1 => f.write_str("SHA-1"),
            HashAlgorithm::Sha256 => f.write_str("SHA-256"),
            HashAlgorithm::Sha384 => f.write_str("SHA-384"),
            HashAlgorithm::Sha512 => f.write_str("SHA-512"),
        }
    }
}
