//! Forms authentication ticket - the plaintext inside every cookie.
//!
//! ## Layout
//! ```text
//! [0x00] FormatVersion  0x01           (u8)
//! [0x01] TicketVersion                 (u8)
//! [0x02] IssueDate      UTC ticks      (i64 LE)
//! [0x0A] Spacer         0xFE           (u8)
//! [0x0B] Expiration     UTC ticks      (i64 LE)
//! [0x13] IsPersistent   0x00 / 0x01    (u8)
//! [0x14] Name                          (string)
//!        UserData                      (string)
//!        CookiePath                    (string)
//!        Footer         0xFF           (u8)
//! ```
//!
//! ## Strings
//! A 7-bit encoded count of UTF-16 code units (low groups first, high bit
//! set on every byte but the last) followed by the code units in
//! little-endian order. An empty string is a single `0x00` byte.
//!
//! ## Timestamps
//! Ticks are 100 ns intervals since 0001-01-01T00:00:00 UTC, so anything
//! finer than 100 ns is truncated on serialization.

use std::io::Cursor;

use chrono::{DateTime, Duration, Utc};

use crate::utils::{
    le_i64, marker, put_le_i64, put_utf16_string, remaining, u8, utf16_string,
};
use crate::{Error, Result};

const FORMAT_VERSION: u8 = 0x01;
const SPACER: u8 = 0xFE;
const FOOTER: u8 = 0xFF;

/// Ticks between 0001-01-01 and the Unix epoch.
const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;
/// Ticks at 9999-12-31T23:59:59.9999999.
const MAX_TICKS: i64 = 3_155_378_975_999_999_999;
const TICKS_PER_SECOND: i64 = 10_000_000;
const NANOS_PER_TICK: u32 = 100;

/// Ticket version written by [`Ticket::new`].
pub const DEFAULT_VERSION: u8 = 2;
/// Cookie path written by [`Ticket::new`].
pub const DEFAULT_COOKIE_PATH: &str = "/";
/// Validity window applied by [`Ticket::new`], in hours.
pub const DEFAULT_VALIDITY_HOURS: i64 = 72;

/// A decoded forms authentication ticket.
///
/// Tickets have no identity beyond their fields; two tickets are equal when
/// every field is equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Ticket schema generation.
    pub version: u8,
    /// Principal name.
    pub name: String,
    /// When the ticket was issued.
    pub issue_date: DateTime<Utc>,
    /// When the ticket stops being valid. Must be later than `issue_date`.
    pub expiration: DateTime<Utc>,
    /// Whether the issuing cookie outlives the browser session.
    pub is_persistent: bool,
    /// Opaque application data.
    pub user_data: String,
    /// Path the cookie was scoped to.
    pub cookie_path: String,
}

impl Ticket {
    /// Build a fresh ticket for `name`, issued now and valid for
    /// [`DEFAULT_VALIDITY_HOURS`].
    pub fn new(name: impl Into<String>) -> Self {
        // Truncate to tick resolution so a fresh ticket survives a round
        // trip unchanged.
        let now = truncate_to_ticks(Utc::now());
        Self {
            version: DEFAULT_VERSION,
            name: name.into(),
            issue_date: now,
            expiration: now + Duration::hours(DEFAULT_VALIDITY_HOURS),
            is_persistent: false,
            user_data: String::new(),
            cookie_path: DEFAULT_COOKIE_PATH.to_owned(),
        }
    }

    /// Set the ticket version.
    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Set the opaque user data.
    pub fn with_user_data(mut self, user_data: impl Into<String>) -> Self {
        self.user_data = user_data.into();
        self
    }

    /// Set the cookie path.
    pub fn with_cookie_path(mut self, cookie_path: impl Into<String>) -> Self {
        self.cookie_path = cookie_path.into();
        self
    }

    /// Mark the ticket persistent or session-scoped.
    pub fn with_persistent(mut self, is_persistent: bool) -> Self {
        self.is_persistent = is_persistent;
        self
    }

    /// Replace the validity window, keeping the issue date.
    ///
    /// A window that overflows the calendar saturates, leaving an
    /// expiration that [`serialize`] rejects.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.expiration = self
            .issue_date
            .checked_add_signed(validity)
            .unwrap_or(if validity < Duration::zero() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });
        self
    }

    /// Set both timestamps explicitly.
    pub fn with_dates(mut self, issue_date: DateTime<Utc>, expiration: DateTime<Utc>) -> Self {
        self.issue_date = issue_date;
        self.expiration = expiration;
        self
    }

    /// `true` if the ticket's expiration is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration <= now
    }

    /// `true` if the ticket has expired according to the system clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Encode this ticket into its binary layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    /// Parse a ticket from its binary layout.
    pub fn parse(data: &[u8]) -> Result<Self> {
        deserialize(data)
    }
}

/// Encode `ticket` into its binary layout.
///
/// Fails with [`Error::Format`] if the expiration is not after the issue
/// date, if either date is outside the tick range, or if a string is too
/// long for its length prefix.
pub fn serialize(ticket: &Ticket) -> Result<Vec<u8>> {
    let issue = to_ticks(ticket.issue_date)?;
    let expiration = to_ticks(ticket.expiration)?;
    // Compared after truncation: two instants inside one tick are equal
    // on the wire.
    if expiration <= issue {
        return Err(Error::Format("expiration must be after issue date"));
    }

    let strings_len = ticket.name.len() + ticket.user_data.len() + ticket.cookie_path.len();
    let mut out = Vec::with_capacity(0x18 + strings_len * 2);
    out.push(FORMAT_VERSION);
    out.push(ticket.version);
    put_le_i64(&mut out, issue);
    out.push(SPACER);
    put_le_i64(&mut out, expiration);
    out.push(ticket.is_persistent as u8);
    put_utf16_string(&mut out, &ticket.name)?;
    put_utf16_string(&mut out, &ticket.user_data)?;
    put_utf16_string(&mut out, &ticket.cookie_path)?;
    out.push(FOOTER);
    Ok(out)
}

/// Parse a ticket from its binary layout.
///
/// The whole structure is walked before a [`Ticket`] is built. Truncated
/// input yields [`Error::UnexpectedEof`]; every other structural problem,
/// including bytes left over after the footer, yields [`Error::Format`].
pub fn deserialize(data: &[u8]) -> Result<Ticket> {
    let mut c = Cursor::new(data);

    marker(&mut c, FORMAT_VERSION, "unsupported serialized format version")?;
    let version = u8(&mut c)?;
    let issue = le_i64(&mut c)?;
    marker(&mut c, SPACER, "missing spacer after issue date")?;
    let expiration = le_i64(&mut c)?;
    let is_persistent = match u8(&mut c)? {
        0 => false,
        1 => true,
        _ => return Err(Error::Format("persistence flag is not a boolean")),
    };
    let name = utf16_string(&mut c)?;
    let user_data = utf16_string(&mut c)?;
    let cookie_path = utf16_string(&mut c)?;
    marker(&mut c, FOOTER, "missing footer")?;
    if remaining(&c) != 0 {
        return Err(Error::Format("trailing data after footer"));
    }

    Ok(Ticket {
        version,
        name,
        issue_date: from_ticks(issue)?,
        expiration: from_ticks(expiration)?,
        is_persistent,
        user_data,
        cookie_path,
    })
}

/// Convert a UTC timestamp into ticks, truncating below 100 ns.
///
/// A leap second folds into the last tick of the second before it.
pub fn to_ticks(dt: DateTime<Utc>) -> Result<i64> {
    const OUT_OF_RANGE: Error = Error::Format("date outside the representable tick range");

    let nanos = dt.timestamp_subsec_nanos().min(999_999_999);
    let ticks = dt
        .timestamp()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(i64::from(nanos / NANOS_PER_TICK)))
        .and_then(|t| t.checked_add(TICKS_AT_UNIX_EPOCH))
        .ok_or(OUT_OF_RANGE)?;
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(OUT_OF_RANGE);
    }
    Ok(ticks)
}

/// Convert ticks back into a UTC timestamp.
pub fn from_ticks(ticks: i64) -> Result<DateTime<Utc>> {
    if !(0..=MAX_TICKS).contains(&ticks) {
        return Err(Error::Format("tick count outside the calendar range"));
    }
    let unix = ticks - TICKS_AT_UNIX_EPOCH;
    let secs = unix.div_euclid(TICKS_PER_SECOND);
    let nanos = (unix.rem_euclid(TICKS_PER_SECOND) as u32) * NANOS_PER_TICK;
    DateTime::from_timestamp(secs, nanos).ok_or(Error::Format("tick count outside the calendar range"))
}

fn truncate_to_ticks(dt: DateTime<Utc>) -> DateTime<Utc> {
    to_ticks(dt).and_then(from_ticks).unwrap_or(dt)
}
