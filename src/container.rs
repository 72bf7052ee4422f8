//! Supported container kinds.
//!
//! Kind is decided by file suffix against a fixed allow-list, then confirmed
//! by the leading signature.  The suffix check happens before the file is
//! touched at all.

use std::io::{self, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Local file header signature, `PK\x03\x04`.
pub const SIG_LOCAL_HEADER: [u8; 4] = *b"PK\x03\x04";
/// End of central directory signature: an archive with no entries starts here.
pub const SIG_END_OF_DIR:   [u8; 4] = *b"PK\x05\x06";
/// Spanning marker some writers put before the first local header.
pub const SIG_SPANNED:      [u8; 4] = *b"PK\x07\x08";

/// Suffixes accepted on input and output paths (compared case-insensitively).
pub const SUPPORTED_SUFFIXES: &[&str] = &["zip"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Zip,
}

impl ContainerKind {
    /// Classify `path` by suffix alone.
    pub fn from_path(path: &Path) -> Result<Self> {
        let suffix = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match suffix.as_deref() {
            Some("zip") => Ok(ContainerKind::Zip),
            _ => Err(Error::UnsupportedFormat { path: path.to_path_buf() }),
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ContainerKind::Zip => "zip",
        }
    }

    /// Whether `magic` (the first bytes of a file) matches this kind.
    pub fn matches_signature(self, magic: &[u8]) -> bool {
        match self {
            ContainerKind::Zip => {
                magic.starts_with(&SIG_LOCAL_HEADER)
                    || magic.starts_with(&SIG_END_OF_DIR)
                    || magic.starts_with(&SIG_SPANNED)
            }
        }
    }
}

/// Read up to four leading bytes from `reader`.  Short files yield fewer.
pub fn read_magic<R: Read>(reader: R) -> io::Result<Vec<u8>> {
    let mut magic = Vec::with_capacity(4);
    reader.take(4).read_to_end(&mut magic)?;
    Ok(magic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_suffix_is_case_insensitive() {
        assert_eq!(ContainerKind::from_path(Path::new("a/b.zip")).unwrap(), ContainerKind::Zip);
        assert_eq!(ContainerKind::from_path(Path::new("B.ZIP")).unwrap(), ContainerKind::Zip);
    }

    #[test]
    fn other_suffixes_are_rejected() {
        for name in ["a.rar", "a.7z", "a.tar.gz", "zip", "a.zip.part"] {
            let err = ContainerKind::from_path(Path::new(name)).unwrap_err();
            assert!(matches!(err, Error::UnsupportedFormat { .. }), "{name}");
        }
    }

    #[test]
    fn signatures() {
        let kind = ContainerKind::Zip;
        assert!(kind.matches_signature(b"PK\x03\x04\x14\x00"));
        assert!(kind.matches_signature(b"PK\x05\x06"));
        assert!(!kind.matches_signature(b"Rar!"));
        assert!(!kind.matches_signature(b"PK"));
    }

    #[test]
    fn magic_of_short_input() {
        assert_eq!(read_magic(&b"PK"[..]).unwrap(), b"PK");
        assert_eq!(read_magic(&b"PK\x03\x04rest"[..]).unwrap(), b"PK\x03\x04");
    }
}
