//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout formscookie.
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two raw keys a [`Error::KeyLength`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// The key that authenticates (`validationKey`).
    Validation,
    /// The key that encrypts (`decryptionKey`).
    Decryption,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Validation => f.write_str("validation"),
            KeyRole::Decryption => f.write_str("decryption"),
        }
    }
}

/// All errors the library can produce.
///
/// Messages never include key bytes or decrypted ticket contents, so any
/// variant can be logged as-is.
#[derive(Debug)]
pub enum Error {
    /// A serialized ticket or cookie text is structurally malformed.
    Format(&'static str),
    /// The serialized ticket ended before all declared bytes could be read.
    UnexpectedEof,
    /// A raw key is too short, or not a length the cipher accepts.
    KeyLength {
        /// Which key was rejected.
        role: KeyRole,
        /// Minimum (or exact) length required, in bytes.
        required: usize,
        /// Length supplied, in bytes.
        actual: usize,
    },
    /// Authentication failed: MAC mismatch, or a padding failure inside an
    /// authenticated decode. Carries no detail.
    Integrity,
    /// The ticket authenticated but its expiration has passed.
    Expired,
    /// PKCS#7 padding was invalid. Only returned by direct calls to
    /// [`crate::crypto::cipher::decrypt`]; the codec reports
    /// [`Error::Integrity`] instead.
    Padding,
    /// A key file was readable but did not contain what was expected.
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl Error {
    /// `true` for errors describing malformed input rather than a failed
    /// cryptographic check.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_) | Error::UnexpectedEof)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(s) => write!(f, "malformed ticket: {s}"),
            Error::UnexpectedEof => write!(f, "unexpected end of ticket data"),
            Error::KeyLength {
                role,
                required,
                actual,
            } => write!(
                f,
                "{role} key has invalid length: need {required} bytes, got {actual}"
            ),
            Error::Integrity => write!(f, "ticket failed integrity check"),
            Error::Expired => write!(f, "ticket has expired"),
            Error::Padding => write!(f, "invalid padding"),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(e),
        }
    }
}
