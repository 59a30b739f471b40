//! Cryptographic primitives behind the ticket codec.
//!
//! All functions accept already-loaded key material; hex decoding and key
//! files are handled by [`crate::keys`]. Nothing here is implemented from
//! scratch - AES, HMAC and the SHA family come from the RustCrypto crates,
//! and tag comparison goes through [`subtle`].
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`kdf`]    | Key length checks and per-mode subkey derivation (SP 800-108) |
//! | [`cipher`] | AES-CBC with a fresh random IV and PKCS#7 padding |
//! | [`mac`]    | HMAC-SHA-1/256/384/512 and constant-time verification |
//!
//! ## Key flow (brief)
//!
//! ```text
//! KeyMaterial
//!   ├── validation key ─┐
//!   │                   ├─ kdf::derive_keys(mode) ─┬─ mac_key    → mac
//!   └── decryption key ─┘                          └─ cipher_key → cipher
//!
//! OsRng ─────────────────────────────────────────── iv         → cipher
//! ```

pub mod cipher;
pub mod kdf;
pub mod mac;
