//! The rectification pipeline: read under a legacy charset, stage, rewrite as
//! UTF-8.
//!
//! ```text
//! source ──open(decoding)──► verify ──► extract_all ──► staging_dir
//!                                                          │
//! output ◄──close── add_directory / add_file ◄──sorted walk┘
//! ```
//!
//! The source reader is dropped before the output is created, so `output`
//! may name the source itself when `overwrite` is set.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::adapter::{ArchiveReader, ArchiveWriter};
use crate::charset::Charset;
use crate::entry::{EntryPath, PathError};
use crate::error::{Error, Result};
use crate::profile::CompressionProfile;

// ── Options / report ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RectifyOptions {
    /// Charset the source names are decoded with.
    pub decoding:      Charset,
    pub password:      Option<Vec<u8>>,
    /// Overrides the profile taken from the source.
    pub force_profile: Option<CompressionProfile>,
    /// Allow `output` to exist already; it is replaced.
    pub overwrite:     bool,
}

impl RectifyOptions {
    pub fn new(decoding: Charset) -> Self {
        Self { decoding, password: None, force_profile: None, overwrite: false }
    }
}

/// What one successful run wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RectifyReport {
    pub directories: usize,
    pub files:       usize,
    /// Uncompressed content bytes written.
    pub bytes:       u64,
    /// Profile applied to file members.
    pub profile:     CompressionProfile,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

/// Rewrite `source` into `output` with every name re-encoded as UTF-8.
///
/// `staging_dir` must exist and be empty; its contents are left for the
/// caller to dispose of.  A failure never publishes anything the caller did
/// not already have at `output`, except for a partially written file when
/// the final write itself fails.
pub fn rectify(
    source:      &Path,
    output:      &Path,
    staging_dir: &Path,
    opts:        &RectifyOptions,
) -> Result<RectifyReport> {
    check_staging(staging_dir)?;
    if !opts.overwrite && output.exists() {
        return Err(Error::AlreadyExists { path: output.to_owned() });
    }

    let profile = {
        let mut reader = ArchiveReader::open(source, opts.decoding, opts.password.as_deref())?;
        reader.verify()?;
        let profile = opts
            .force_profile
            .unwrap_or_else(|| reader.dominant_compression_profile());
        let bytes = reader.extract_all(staging_dir)?;
        debug!(
            source = %source.display(),
            staging = %staging_dir.display(),
            bytes,
            "source staged"
        );
        profile
    };

    let mut writer = ArchiveWriter::create(output, profile, opts.overwrite)?;
    let mut report = RectifyReport {
        directories: 0,
        files:       0,
        bytes:       0,
        profile:     writer.profile(),
    };

    for item in WalkDir::new(staging_dir).min_depth(1).sort_by_file_name() {
        let item = item.map_err(walk_error)?;
        let rel = item.path().strip_prefix(staging_dir).map_err(|_| Error::Precondition {
            path:   item.path().to_owned(),
            reason: "walked outside the staging directory",
        })?;
        let entry = EntryPath::from_relative(rel).map_err(|e| match e {
            PathError::Escapes        => Error::UnsafePath { entry: rel.display().to_string() },
            PathError::IllegalChar(_) => Error::IllegalName { entry: rel.display().to_string() },
        })?;

        let file_type = item.file_type();
        if file_type.is_dir() {
            writer.add_directory(&entry)?;
            report.directories += 1;
        } else if file_type.is_file() {
            let len = item.metadata().map_err(walk_error)?.len();
            let mut content = BufReader::new(File::open(item.path())?);
            report.bytes += writer.add_file_from_reader(&entry, &mut content, len)?;
            report.files += 1;
        } else {
            warn!(entry = %entry, "skipping non-regular file in staging area");
        }
    }

    writer.close()?;
    info!(
        source = %source.display(),
        output = %output.display(),
        decoding = %opts.decoding,
        directories = report.directories,
        files = report.files,
        profile = %report.profile,
        "rectified"
    );
    Ok(report)
}

fn check_staging(dir: &Path) -> Result<()> {
    let precondition = |reason| Error::Precondition { path: dir.to_owned(), reason };
    let meta = fs::metadata(dir).map_err(|_| precondition("staging directory does not exist"))?;
    if !meta.is_dir() {
        return Err(precondition("staging path is not a directory"));
    }
    if fs::read_dir(dir)?.next().is_some() {
        return Err(precondition("staging directory is not empty"));
    }
    Ok(())
}

fn walk_error(err: walkdir::Error) -> Error {
    match err.into_io_error() {
        Some(e) => Error::Io(e),
        None    => Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop in staging area")),
    }
}
