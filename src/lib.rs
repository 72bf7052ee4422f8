//! Rewrite zip archives whose member names were stored in a legacy codepage
//! (Shift-JIS, GBK, ...) into archives whose names are UTF-8.
//!
//! ```no_run
//! use std::path::Path;
//! use zipcharset::{detect, rectify, Charset, RectifyOptions, StagingArea, DEFAULT_CANDIDATES};
//!
//! # fn main() -> zipcharset::Result<()> {
//! let source = Path::new("photos.zip");
//! if let Some(charset) = detect(source, DEFAULT_CANDIDATES, None)? {
//!     if !charset.is_utf8() {
//!         let staging = StagingArea::new()?;
//!         rectify(source, Path::new("photos_utf8.zip"), staging.path(), &RectifyOptions::new(charset))?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod charset;
pub mod config;
pub mod container;
pub mod entry;
pub mod error;
pub mod job;
pub mod lint;
pub mod profile;
pub mod rectify;
pub mod staging;

pub use adapter::{ArchiveReader, ArchiveWriter};
pub use charset::{decode, Charset, DecodeError, DEFAULT_CANDIDATES};
pub use entry::{EntryDescriptor, EntryKind, EntryPath};
pub use error::{Error, Result};
pub use lint::{classify, detect, lint, lint_outcome, ArchiveStatus, LintOutcome};
pub use profile::{CompressionProfile, Method};
pub use rectify::{rectify, RectifyOptions, RectifyReport};
pub use staging::StagingArea;
