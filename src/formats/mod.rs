//! Binary layouts carried inside cookies.
//!
//! Parsers here follow the same conventions:
//!
//! * **Slice in, value out** - `deserialize` takes the complete
//!   already-decrypted payload and either returns a fully built value or an
//!   error. Nothing partially parsed escapes.
//! * **Strict** - every length prefix is checked against the bytes that
//!   remain, and leftover bytes are an error.
//! * **Crypto is separate** - parsers never see ciphertext. Use
//!   [`crate::codec`] to get from cookie text to a payload.
//!
//! ## Format overview
//!
//! | Module     | Format | Description |
//! |------------|--------|-------------|
//! | [`ticket`] | Forms authentication ticket | Identity, validity window, user data and cookie path |

pub mod ticket;
