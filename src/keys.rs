//! Raw key material for ticket protection.
//!
//! A deployment is configured with two independent secrets:
//!
//! * **Validation key** - authenticates the ticket (HMAC key, or the input
//!   to HMAC subkey derivation).
//! * **Decryption key** - encrypts the ticket (AES key, or the input to
//!   AES subkey derivation). Despite the name it is used in both directions.
//!
//! This module performs no cryptography. It turns hex text into bytes and
//! holds the two buffers; [`crate::crypto::kdf`] checks their lengths and
//! derives the keys actually used.
//!
//! ## Key file format
//! Key files are plain `name = hex_value` text, one entry per line. Lines
//! starting with `;` or `#` are comments.
//!
//! ```text
//! ; machine keys for the staging farm
//! validationKey = 0123...CDEF
//! decryptionKey = 0011...EEFF
//! ```

use std::fmt;
use std::io::{BufRead, BufReader, Read};

use zeroize::Zeroizing;

use crate::{Error, Result};

/// Decode a hexadecimal string into raw bytes.
///
/// Surrounding whitespace is ignored and either letter case is accepted.
/// Returns [`Error::Format`] for odd lengths or non-hex characters.
pub fn hex_decode(text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim()).map_err(|_| Error::Format("invalid hex string"))
}

/// The validation and decryption keys for one encode/decode call.
///
/// Both buffers are wiped when the value is dropped, and [`fmt::Debug`]
/// only reveals their lengths.
#[derive(Clone)]
pub struct KeyMaterial {
    validation: Zeroizing<Vec<u8>>,
    decryption: Zeroizing<Vec<u8>>,
}

impl KeyMaterial {
    /// Wrap already-decoded key bytes.
    pub fn new(validation_key: impl Into<Vec<u8>>, decryption_key: impl Into<Vec<u8>>) -> Self {
        Self {
            validation: Zeroizing::new(validation_key.into()),
            decryption: Zeroizing::new(decryption_key.into()),
        }
    }

    /// Decode both keys from hex strings.
    pub fn from_hex(validation_key: &str, decryption_key: &str) -> Result<Self> {
        Ok(Self::new(
            hex_decode(validation_key)?,
            hex_decode(decryption_key)?,
        ))
    }

    /// Load both keys from a key-file reader.
    ///
    /// Recognised names (case-insensitive) are `validationKey`,
    /// `validation_key` and `vkey` for the validation key, and
    /// `decryptionKey`, `decryption_key` and `ekey` for the decryption key.
    /// Unknown names are skipped so that one file can carry other settings.
    /// A later entry overrides an earlier one.
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        let buf = BufReader::new(reader);
        let mut validation = None;
        let mut decryption = None;

        for line in buf.lines() {
            let line = line.map_err(Error::Io)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };

            match name.trim().to_ascii_lowercase().as_str() {
                "validationkey" | "validation_key" | "vkey" => {
                    validation = Some(hex_decode(value).map_err(|_| {
                        Error::Parse("validation key is not valid hex")
                    })?);
                }
                "decryptionkey" | "decryption_key" | "ekey" => {
                    decryption = Some(hex_decode(value).map_err(|_| {
                        Error::Parse("decryption key is not valid hex")
                    })?);
                }
                _ => {}
            }
        }

        match (validation, decryption) {
            (Some(v), Some(d)) => Ok(Self::new(v, d)),
            (None, _) => Err(Error::Parse("missing validation key")),
            (_, None) => Err(Error::Parse("missing decryption key")),
        }
    }

    /// Raw validation key bytes.
    pub fn validation_key(&self) -> &[u8] {
        &self.validation
    }

    /// Raw decryption key bytes.
    pub fn decryption_key(&self) -> &[u8] {
        &self.decryption
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("validation_len", &self.validation.len())
            .field("decryption_len", &self.decryption.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_accepts_mixed_case_and_padding() {
        assert_eq!(hex_decode(" 0aFf \n").unwrap(), vec![0x0A, 0xFF]);
        assert!(matches!(hex_decode("abc"), Err(Error::Format(_))));
        assert!(matches!(hex_decode("zz"), Err(Error::Format(_))));
        assert!(hex_decode("").unwrap().is_empty());
    }

    #[test]
    fn load_key_file() {
        let file = "\
; comment
# another comment

validationKey = 00112233445566778899AABBCCDDEEFF00112233
compilation = debug
EKEY=000102030405060708090a0b0c0d0e0f
";
        let keys = KeyMaterial::load(file.as_bytes()).unwrap();
        assert_eq!(keys.validation_key().len(), 20);
        assert_eq!(keys.decryption_key()[15], 0x0F);
    }

    #[test]
    fn load_reports_missing_key() {
        let file = "validation_key = 0011\n";
        assert!(matches!(
            KeyMaterial::load(file.as_bytes()),
            Err(Error::Parse("missing decryption key"))
        ));
    }

    #[test]
    fn load_rejects_bad_hex() {
        let file = "vkey = xyz\nekey = 00\n";
        assert!(matches!(
            KeyMaterial::load(file.as_bytes()),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn debug_hides_key_bytes() {
        let keys = KeyMaterial::new(vec![0xAB; 4], vec![0xCD; 4]);
        let shown = format!("{keys:?}");
        assert!(!shown.contains("171"));
        assert!(!shown.to_lowercase().contains("ab"));
        assert!(shown.contains("validation_len: 4"));
    }
}
