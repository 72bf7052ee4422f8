//! Entry descriptors and validated relative paths.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::profile::CompressionProfile;

// ── EntryPath ────────────────────────────────────────────────────────────────

/// Why a decoded name was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Absolute, drive-prefixed, `..`-bearing, or empty after normalization.
    Escapes,
    /// Contains a control character.
    IllegalChar(char),
}

/// A member path relative to the archive root.
///
/// Construction guarantees: at least one segment; no segment is empty, `.`
/// or `..`; no segment contains a separator or a control character.  Joining
/// it onto a directory therefore never leaves that directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryPath {
    segments: Vec<String>,
}

impl EntryPath {
    /// Validate a decoded member name.
    ///
    /// Backslashes count as separators.  This runs on decoded text, so a
    /// double-byte character whose trail byte happens to be 0x5C is already
    /// whole by the time it gets here.
    pub fn parse(name: &str) -> Result<Self, PathError> {
        if let Some(c) = name.chars().find(|c| c.is_control()) {
            return Err(PathError::IllegalChar(c));
        }
        let normalized = name.replace('\\', "/");
        if normalized.starts_with('/') {
            return Err(PathError::Escapes);
        }

        let mut segments = Vec::new();
        for (i, seg) in normalized.split('/').enumerate() {
            match seg {
                "" | "." => continue,
                ".."     => return Err(PathError::Escapes),
                _ if i == 0 && is_drive_prefix(seg) => return Err(PathError::Escapes),
                _        => segments.push(seg.to_owned()),
            }
        }
        if segments.is_empty() {
            return Err(PathError::Escapes);
        }
        Ok(Self { segments })
    }

    /// Build from a path relative to a staging root, as produced by a walk.
    pub fn from_relative(path: &Path) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str().ok_or(PathError::Escapes)?;
                    if let Some(c) = part.chars().find(|c| c.is_control()) {
                        return Err(PathError::IllegalChar(c));
                    }
                    segments.push(part.to_owned());
                }
                Component::CurDir => {}
                _ => return Err(PathError::Escapes),
            }
        }
        if segments.is_empty() {
            return Err(PathError::Escapes);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Native relative path for staging.
    pub fn to_path_buf(&self) -> PathBuf {
        self.segments.iter().collect()
    }

    /// `/`-joined name as written into the container.
    pub fn to_archive_name(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_archive_name())
    }
}

fn is_drive_prefix(seg: &str) -> bool {
    let bytes = seg.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

// ── EntryDescriptor ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One member as listed by the reader, in container index order.
#[derive(Debug, Clone)]
pub struct EntryDescriptor {
    /// Position in the container's own index.
    pub index:             usize,
    pub path:              EntryPath,
    pub kind:              EntryKind,
    pub compressed_size:   u64,
    pub uncompressed_size: u64,
    pub profile:           CompressionProfile,
    pub encrypted:         bool,
}

impl EntryDescriptor {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
