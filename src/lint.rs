//! Encoding validation ("lint") and detection.
//!
//! A wrong charset guess is data, not an error: [`lint_outcome`] reports it as
//! [`LintOutcome::Undecodable`] and [`detect`] moves on to the next
//! candidate.  Every other failure propagates unchanged.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::adapter::ArchiveReader;
use crate::charset::{Charset, DecodeError};
use crate::error::{Error, Result};

// ── LintOutcome ──────────────────────────────────────────────────────────────

/// Result of checking one archive against one charset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintOutcome {
    /// Every name decodes and every member passes its CRC check.
    Valid,
    /// Member `index` does not decode under the candidate charset.
    Undecodable { index: usize, source: DecodeError },
    /// Names decode but the container fails its integrity check.
    Corrupted { entry: String, reason: String },
}

impl LintOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, LintOutcome::Valid)
    }
}

/// Check `path` under `charset`, keeping the reason for a negative result.
pub fn lint_outcome(path: &Path, charset: Charset, password: Option<&[u8]>) -> Result<LintOutcome> {
    let mut reader = match ArchiveReader::open(path, charset, password) {
        Ok(reader) => reader,
        Err(Error::Decode { index, source }) => {
            debug!(path = %path.display(), %charset, index, "name does not decode");
            return Ok(LintOutcome::Undecodable { index, source });
        }
        Err(e) => return Err(e),
    };
    match reader.verify() {
        Ok(()) => Ok(LintOutcome::Valid),
        Err(Error::Corrupted { entry, reason }) => Ok(LintOutcome::Corrupted { entry, reason }),
        Err(e) => Err(e),
    }
}

/// Whether every name in `path` decodes under `charset` and the archive is
/// intact.
pub fn lint(path: &Path, charset: Charset, password: Option<&[u8]>) -> Result<bool> {
    Ok(lint_outcome(path, charset, password)?.is_valid())
}

// ── Detection ────────────────────────────────────────────────────────────────

/// First charset in `candidates` under which `path` lints clean.
///
/// Candidates are tried strictly in slice order, so the result for a given
/// archive and list never changes between calls.  A corrupted archive is an
/// error rather than `None`: corruption does not depend on the charset, so no
/// other candidate could succeed.
pub fn detect(path: &Path, candidates: &[Charset], password: Option<&[u8]>) -> Result<Option<Charset>> {
    for &charset in candidates {
        match lint_outcome(path, charset, password)? {
            LintOutcome::Valid => {
                debug!(path = %path.display(), %charset, "charset detected");
                return Ok(Some(charset));
            }
            LintOutcome::Undecodable { .. } => continue,
            LintOutcome::Corrupted { entry, reason } => {
                return Err(Error::Corrupted { entry, reason });
            }
        }
    }
    Ok(None)
}

// ── Classification ───────────────────────────────────────────────────────────

/// Coarse state of an archive, as a batch front-end presents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArchiveStatus {
    /// Names are already UTF-8; nothing to do.
    Valid,
    /// Names decode under a legacy charset and can be rectified.
    Legacy { charset: Charset },
    /// No candidate decodes every name.
    Undetected,
    /// The archive could not be checked.
    Broken { reason: String },
}

impl ArchiveStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ArchiveStatus::Valid          => "valid",
            ArchiveStatus::Legacy { .. }  => "legacy",
            ArchiveStatus::Undetected     => "undetected",
            ArchiveStatus::Broken { .. }  => "broken",
        }
    }
}

/// Detect and fold every outcome, errors included, into an [`ArchiveStatus`].
pub fn classify(path: &Path, candidates: &[Charset], password: Option<&[u8]>) -> ArchiveStatus {
    match detect(path, candidates, password) {
        Ok(Some(charset)) if charset.is_utf8() => ArchiveStatus::Valid,
        Ok(Some(charset))                      => ArchiveStatus::Legacy { charset },
        Ok(None)                               => ArchiveStatus::Undetected,
        Err(e)                                 => ArchiveStatus::Broken { reason: e.to_string() },
    }
}
