//! Low-level binary primitives shared by the ticket serializer.
//!
//! Each reader consumes exactly the bytes it promises or returns an error -
//! there is no partial-read ambiguity. Writers append to a `Vec<u8>` and
//! cannot fail.

use std::io::{Cursor, Read};

use crate::{Error, Result};

/// Largest value a 7-bit encoded length may carry (`i32::MAX`).
const MAX_7BIT: u32 = i32::MAX as u32;

/// Read one byte.
#[inline]
pub(crate) fn u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    r.read_exact(&mut b)?;
    Ok(b[0])
}

/// Read a little-endian `i64`.
#[inline]
pub(crate) fn le_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    Ok(i64::from_le_bytes(b))
}

/// Verify that the next byte in the stream equals `expected`.
///
/// Returns [`Error::Format`] with `what` on mismatch.
#[inline]
pub(crate) fn marker<R: Read>(r: &mut R, expected: u8, what: &'static str) -> Result<()> {
    if u8(r)? != expected {
        return Err(Error::Format(what));
    }
    Ok(())
}

/// Read a 7-bit encoded unsigned integer (at most five bytes, value no
/// larger than `i32::MAX`).
pub(crate) fn read_7bit<R: Read>(r: &mut R) -> Result<u32> {
    let mut value = 0u32;
    for shift in (0..35).step_by(7) {
        let b = u8(r)?;
        if shift == 28 && b > 0x0F {
            return Err(Error::Format("7-bit integer overflows 32 bits"));
        }
        value |= u32::from(b & 0x7F) << shift;
        if b & 0x80 == 0 {
            if value > MAX_7BIT {
                return Err(Error::Format("7-bit integer exceeds i32 range"));
            }
            return Ok(value);
        }
    }
    Err(Error::Format("7-bit integer is too long"))
}

/// Number of bytes left between the cursor position and the end of its
/// buffer.
#[inline]
pub(crate) fn remaining(c: &Cursor<&[u8]>) -> usize {
    let len = c.get_ref().len() as u64;
    len.saturating_sub(c.position()) as usize
}

/// Read a length-prefixed UTF-16LE string.
///
/// The declared code-unit count is checked against the bytes left in the
/// buffer before anything is allocated.
pub(crate) fn utf16_string(c: &mut Cursor<&[u8]>) -> Result<String> {
    let units = read_7bit(c)? as usize;
    let byte_len = units.checked_mul(2).ok_or(Error::UnexpectedEof)?;
    if byte_len > remaining(c) {
        return Err(Error::UnexpectedEof);
    }
    let mut raw = vec![0u8; byte_len];
    c.read_exact(&mut raw)?;
    let code_units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|p| u16::from_le_bytes([p[0], p[1]]))
        .collect();
    String::from_utf16(&code_units).map_err(|_| Error::Format("string is not valid UTF-16"))
}

/// Append a little-endian `i64`.
#[inline]
pub(crate) fn put_le_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Append a 7-bit encoded unsigned integer.
pub(crate) fn put_7bit(out: &mut Vec<u8>, mut v: u32) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Append a length-prefixed UTF-16LE string.
///
/// Fails when the string has more code units than a 7-bit length can
/// describe.
pub(crate) fn put_utf16_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let units: Vec<u16> = s.encode_utf16().collect();
    let count = u32::try_from(units.len())
        .ok()
        .filter(|&n| n <= MAX_7BIT)
        .ok_or(Error::Format("string is too long to serialize"))?;
    put_7bit(out, count);
    out.reserve(units.len() * 2);
    for unit in units {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    Ok(())
}
