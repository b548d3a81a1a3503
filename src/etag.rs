//! Concurrency tokens for collection metadata.
//!
//! An [`Etag`] is an opaque 12-byte value, hex-encoded to 24 characters:
//! 4 bytes of big-endian Unix seconds, 5 bytes of per-process random
//! machine id, 3 bytes of a wrapping counter. Byte order doubles as
//! creation-time order, and the embedded seconds are recoverable for
//! display as a "last updated" timestamp.

use crate::core::{DbError, Result};
use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

lazy_static! {
    static ref MACHINE_ID: [u8; 5] = {
        let b = uuid::Uuid::new_v4().into_bytes();
        [b[0], b[1], b[2], b[3], b[4]]
    };
    static ref COUNTER: AtomicU32 = {
        let b = uuid::Uuid::new_v4().into_bytes();
        AtomicU32::new(u32::from_be_bytes([0, b[5], b[6], b[7]]))
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Etag([u8; 12]);

impl Etag {
    /// Issue a fresh token stamped with the current wall-clock second.
    pub fn new() -> Self {
        Self::with_time(Utc::now())
    }

    /// Issue a token carrying an explicit timestamp. Second resolution;
    /// sub-second precision is discarded.
    pub fn with_time(at: DateTime<Utc>) -> Self {
        let secs = at.timestamp().clamp(0, u32::MAX as i64) as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*MACHINE_ID);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Etag(bytes)
    }

    /// The wall-clock second embedded at issuance.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]) as i64;
        Utc.timestamp_opt(secs, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Parse a stored field value, tolerating anything that is not a
    /// well-formed token. Readers use this to decide whether a derived
    /// timestamp can be offered at all.
    pub fn from_json(value: &serde_json::Value) -> Option<Etag> {
        value.as_str().and_then(|s| s.parse().ok())
    }
}

impl Default for Etag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Etag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Etag {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 24 || !s.is_ascii() {
            return Err(DbError::ParseError(format!("not a valid etag: '{}'", s)));
        }
        let mut bytes = [0u8; 12];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| DbError::ParseError(format!("not a valid etag: '{}'", s)))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| DbError::ParseError(format!("not a valid etag: '{}'", s)))?;
        }
        Ok(Etag(bytes))
    }
}
