//! Compression method/level carried from a source archive into its rewrite.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ── Method ───────────────────────────────────────────────────────────────────

/// Compression method of one member.
///
/// `Other` covers methods this crate can read but not write (Deflate64, LZMA,
/// vendor ids, ...).  It never reaches the writer; see
/// [`CompressionProfile::writable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Stored,
    Deflated,
    Bzip2,
    Zstd,
    Other,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Stored   => "stored",
            Method::Deflated => "deflated",
            Method::Bzip2    => "bzip2",
            Method::Zstd     => "zstd",
            Method::Other    => "other",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stored" | "store"             => Some(Method::Stored),
            "deflated" | "deflate"         => Some(Method::Deflated),
            "bzip2"                        => Some(Method::Bzip2),
            "zstd"                         => Some(Method::Zstd),
            _                              => None,
        }
    }

    #[allow(deprecated)]
    pub(crate) fn from_zip(method: zip::CompressionMethod) -> Self {
        match method {
            zip::CompressionMethod::Stored   => Method::Stored,
            zip::CompressionMethod::Deflated => Method::Deflated,
            zip::CompressionMethod::Bzip2    => Method::Bzip2,
            zip::CompressionMethod::Zstd     => Method::Zstd,
            _                                => Method::Other,
        }
    }

    pub(crate) fn to_zip(self) -> zip::CompressionMethod {
        match self {
            Method::Stored                  => zip::CompressionMethod::Stored,
            Method::Deflated | Method::Other => zip::CompressionMethod::Deflated,
            Method::Bzip2                   => zip::CompressionMethod::Bzip2,
            Method::Zstd                    => zip::CompressionMethod::Zstd,
        }
    }

    /// Inclusive level range the writer accepts, `None` for level-less methods.
    fn level_range(self) -> Option<(i64, i64)> {
        match self {
            Method::Stored                   => None,
            Method::Deflated | Method::Other => Some((0, 9)),
            Method::Bzip2                    => Some((1, 9)),
            Method::Zstd                     => Some((1, 22)),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::from_name(s)
            .ok_or_else(|| format!("unknown method '{s}' (expected stored, deflated, bzip2 or zstd)"))
    }
}

// ── Deflate level hint ───────────────────────────────────────────────────────

/// General-purpose flag bits 1-2: deflate option chosen by the producer.
const FLAG_DEFLATE_OPTION_MASK: u16 = 0b0110;

/// Map the deflate option bits of a general-purpose flag word to a level.
///
/// The format records only four coarse options; they map to the levels the
/// common producers use for them.
pub fn deflate_level_from_flags(flags: u16) -> i64 {
    match (flags & FLAG_DEFLATE_OPTION_MASK) >> 1 {
        0b00 => 6, // normal
        0b01 => 9, // maximum
        0b10 => 2, // fast
        _    => 1, // super fast
    }
}

// ── CompressionProfile ───────────────────────────────────────────────────────

/// The (method, level) pair a rewritten archive is compressed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompressionProfile {
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level:  Option<i64>,
}

impl CompressionProfile {
    /// Used when a source has no file members to take a profile from.
    pub const DEFAULT: Self = Self { method: Method::Deflated, level: Some(6) };

    /// The fixed override behind `--force-deflated`.
    pub const FORCED_DEFLATE: Self = Self { method: Method::Deflated, level: Some(5) };

    pub const STORED: Self = Self { method: Method::Stored, level: None };

    pub fn new(method: Method, level: Option<i64>) -> Self {
        Self { method, level }
    }

    /// Profile as the writer will actually apply it: unwritable methods fall
    /// back to [`Self::DEFAULT`] and levels are clamped to the method's range.
    pub fn writable(self) -> Self {
        if self.method == Method::Other {
            warn!(fallback = %Self::DEFAULT, "source method cannot be written; using fallback");
            return Self::DEFAULT;
        }
        let level = match self.method.level_range() {
            None => None,
            Some((lo, hi)) => self.level.map(|l| l.clamp(lo, hi)),
        };
        Self { method: self.method, level }
    }
}

impl Default for CompressionProfile {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for CompressionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Some(level) => write!(f, "{}:{}", self.method, level),
            None        => write!(f, "{}", self.method),
        }
    }
}
