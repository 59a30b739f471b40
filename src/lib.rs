//! **formscookie** - encrypt, authenticate and decode forms authentication
//! ticket cookies compatible with legacy deployments.
//!
//! # Modules
//! | Module | Purpose |
//! |--------|---------|
//! | [`formats::ticket`] | Ticket type and its binary layout |
//! | [`crypto::kdf`]     | Key length checks and subkey derivation |
//! | [`crypto::cipher`]  | AES-CBC with random IVs |
//! | [`crypto::mac`]     | HMAC and constant-time verification |
//! | [`codec`]           | Modern and legacy constructions, cookie text |
//! | [`keys`]            | Hex decoding and key files |
//! | [`mode`]            | Compatibility modes and hash choices |
//!
//! # Example
//! ```
//! use formscookie::{CompatibilityMode, KeyMaterial, Ticket, TicketCodec};
//!
//! let keys = KeyMaterial::from_hex(
//!     "000102030405060708090A0B0C0D0E0F101112131415161718191A1B1C1D1E1F",
//!     "404142434445464748494A4B4C4D4E4F505152535455565758595A5B5C5D5E5F",
//! )?;
//! let codec = TicketCodec::new(&keys, CompatibilityMode::Modern)?;
//!
//! let ticket = Ticket::new("alice").with_user_data("role=admin");
//! let cookie = codec.encode(&ticket)?;
//! assert_eq!(codec.decode(&cookie)?, ticket);
//! # Ok::<(), formscookie::Error>(())
//! ```

pub mod codec;
pub mod crypto;
pub mod error;
pub mod formats;
pub mod keys;
pub mod mode;
pub(crate) mod utils;

pub use codec::{TicketCodec, decode_ticket, encode_ticket};
pub use error::{Error, KeyRole, Result};
pub use formats::ticket::Ticket;
pub use keys::{KeyMaterial, hex_decode};
pub use mode::{CompatibilityMode, HashAlgorithm};
