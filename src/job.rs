//! Conversion jobs: everything around [`rectify`] that a front-end needs.
//!
//! A job resolves the decoding (running detection for [`Decoding::Auto`]),
//! plans the output path, backs up the source before an in-place rewrite and
//! publishes the result atomically.  The pipeline writes into a temp file in
//! the output's directory; only a successful run is renamed into place, so a
//! failure never leaves partial output behind.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::charset::{self, Charset};
use crate::container::ContainerKind;
use crate::error::Error;
use crate::lint::detect;
use crate::profile::CompressionProfile;
use crate::rectify::{rectify, RectifyOptions, RectifyReport};
use crate::staging::StagingArea;

/// Directory, next to the source, that receives backups of in-place rewrites.
pub const DEFAULT_BACKUP_DIR: &str = ".zipcharset_backup";

// ── Decoding ─────────────────────────────────────────────────────────────────

/// How a job picks the charset to decode source names with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Decoding {
    /// Run detection over the candidate list first.
    Auto,
    Fixed(Charset),
}

impl Default for Decoding {
    fn default() -> Self {
        Decoding::Fixed(Charset::ShiftJis)
    }
}

impl fmt::Display for Decoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoding::Auto           => f.write_str("auto"),
            Decoding::Fixed(charset) => write!(f, "{charset}"),
        }
    }
}

impl FromStr for Decoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Decoding::Auto);
        }
        s.parse().map(Decoding::Fixed)
    }
}

impl TryFrom<String> for Decoding {
    type Error = String;

    fn try_from(s: String) -> Result<Self, String> {
        s.parse()
    }
}

impl From<Decoding> for String {
    fn from(d: Decoding) -> String {
        d.to_string()
    }
}

// ── Errors / outcomes ────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JobError {
    #[error("no candidate charset decodes every name in '{}'", path.display())]
    Undetected { path: PathBuf },

    #[error("backup of '{}' failed: {source}", path.display())]
    Backup {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Rectify(#[from] Error),
}

impl From<io::Error> for JobError {
    fn from(e: io::Error) -> Self {
        JobError::Rectify(Error::Io(e))
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Converted {
        output:   PathBuf,
        decoding: Charset,
        report:   RectifyReport,
        backup:   Option<PathBuf>,
    },
    /// Detection found the names already UTF-8; nothing was written.
    AlreadyUtf8,
}

// ── Options ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JobOptions {
    pub decoding:      Decoding,
    /// Trial order for [`Decoding::Auto`].
    pub candidates:    Vec<Charset>,
    pub password:      Option<Vec<u8>>,
    pub force_profile: Option<CompressionProfile>,
    /// Explicit output path; ignored when `in_place` is set.
    pub output:        Option<PathBuf>,
    /// Rewrite the source itself.
    pub in_place:      bool,
    /// Skip the backup and allow replacing an existing output.
    pub force:         bool,
    /// Backup directory name, relative to the source's directory.
    pub backup_dir:    String,
    /// Parent for staging areas; the system temp directory when `None`.
    pub tmpdir:        Option<PathBuf>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            decoding:      Decoding::default(),
            candidates:    charset::DEFAULT_CANDIDATES.to_vec(),
            password:      None,
            force_profile: None,
            output:        None,
            in_place:      false,
            force:         false,
            backup_dir:    DEFAULT_BACKUP_DIR.to_owned(),
            tmpdir:        None,
        }
    }
}

impl JobOptions {
    fn overwrite(&self) -> bool {
        self.in_place || self.force
    }
}

// ── Output planning ──────────────────────────────────────────────────────────

/// Where the rewrite of `source` goes.
///
/// In place: the source path with a `.zip` suffix.  Otherwise the explicit
/// output, or `<stem>_<8 random characters>.zip` beside the source.
pub fn plan_output(source: &Path, opts: &JobOptions) -> Result<PathBuf, Error> {
    let output = if opts.in_place {
        source.with_extension(ContainerKind::Zip.suffix())
    } else if let Some(explicit) = &opts.output {
        explicit.clone()
    } else {
        let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let tag = uuid::Uuid::new_v4().simple().to_string();
        source.with_file_name(format!("{stem}_{}.{}", &tag[..8], ContainerKind::Zip.suffix()))
    };
    ContainerKind::from_path(&output)?;
    Ok(output)
}

/// Copy `source` into `backup_dir` next to it, creating the directory.
pub fn backup(source: &Path, backup_dir: &str) -> Result<PathBuf, JobError> {
    let wrap = |source_err| JobError::Backup { path: source.to_owned(), source: source_err };
    let dir = parent_of(source).join(backup_dir);
    fs::create_dir_all(&dir).map_err(wrap)?;
    let name = source
        .file_name()
        .ok_or_else(|| wrap(io::Error::new(io::ErrorKind::InvalidInput, "source has no file name")))?;
    let target = dir.join(name);
    fs::copy(source, &target).map_err(wrap)?;
    info!(source = %source.display(), backup = %target.display(), "backup written");
    Ok(target)
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _                                     => Path::new("."),
    }
}

// ── Single job ───────────────────────────────────────────────────────────────

pub fn convert_one(source: &Path, opts: &JobOptions) -> Result<JobOutcome, JobError> {
    let password = opts.password.as_deref();
    let decoding = match opts.decoding {
        Decoding::Fixed(charset) => charset,
        Decoding::Auto => match detect(source, &opts.candidates, password)? {
            Some(charset) if charset.is_utf8() => {
                info!(source = %source.display(), "names are already UTF-8; skipped");
                return Ok(JobOutcome::AlreadyUtf8);
            }
            Some(charset) => charset,
            None => return Err(JobError::Undetected { path: source.to_owned() }),
        },
    };

    let output = plan_output(source, opts)?;
    if !opts.overwrite() && output.exists() {
        return Err(Error::AlreadyExists { path: output }.into());
    }

    let backup = if opts.in_place && !opts.force {
        Some(backup(source, &opts.backup_dir)?)
    } else {
        None
    };

    let staging = match &opts.tmpdir {
        Some(parent) => StagingArea::new_in(parent)?,
        None         => StagingArea::new()?,
    };
    let pending = tempfile::Builder::new()
        .prefix(".zipcharset-")
        .suffix(".zip")
        .tempfile_in(parent_of(&output))?;

    let rectify_opts = RectifyOptions {
        decoding,
        password:      opts.password.clone(),
        force_profile: opts.force_profile,
        overwrite:     true,
    };
    let report = rectify(source, pending.path(), staging.path(), &rectify_opts)?;
    if let Err(e) = staging.close() {
        warn!(error = %e, "staging area not fully removed");
    }

    let published = if opts.overwrite() {
        pending.persist(&output)
    } else {
        pending.persist_noclobber(&output)
    };
    published.map_err(|e| match e.error.kind() {
        io::ErrorKind::AlreadyExists => Error::AlreadyExists { path: output.clone() },
        _                            => Error::Io(e.error),
    })?;

    info!(source = %source.display(), output = %output.display(), %decoding, "published");
    Ok(JobOutcome::Converted { output, decoding, report, backup })
}

// ── Batch ────────────────────────────────────────────────────────────────────

/// Convert every source independently.  Results come back in input order and
/// one failure never stops the others.
///
/// With the `parallel` feature the jobs run on the rayon pool.
pub fn convert_all(sources: &[PathBuf], opts: &JobOptions) -> Vec<Result<JobOutcome, JobError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        sources.par_iter().map(|source| convert_one(source, opts)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        sources.iter().map(|source| convert_one(source, opts)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_parses_auto_and_charsets() {
        assert_eq!("auto".parse::<Decoding>().unwrap(), Decoding::Auto);
        assert_eq!("AUTO".parse::<Decoding>().unwrap(), Decoding::Auto);
        assert_eq!("gbk".parse::<Decoding>().unwrap(), Decoding::Fixed(Charset::Gbk));
        assert!("latin-9000".parse::<Decoding>().is_err());
    }

    #[test]
    fn decoding_serializes_as_plain_string() {
        assert_eq!(serde_json::to_string(&Decoding::Auto).unwrap(), r#""auto""#);
        let d: Decoding = serde_json::from_str(r#""shift-jis""#).unwrap();
        assert_eq!(d, Decoding::Fixed(Charset::ShiftJis));
    }

    #[test]
    fn sibling_output_gets_random_tag() {
        let opts = JobOptions::default();
        let out = plan_output(Path::new("/data/photos.zip"), &opts).unwrap();
        let name = out.file_name().unwrap().to_str().unwrap();
        assert_eq!(out.parent(), Some(Path::new("/data")));
        assert!(name.starts_with("photos_"), "{name}");
        assert!(name.ends_with(".zip"));
        assert_eq!(name.len(), "photos_".len() + 8 + ".zip".len());

        let again = plan_output(Path::new("/data/photos.zip"), &opts).unwrap();
        assert_ne!(out, again);
    }

    #[test]
    fn in_place_wins_over_explicit_output() {
        let opts = JobOptions {
            in_place: true,
            output:   Some(PathBuf::from("/elsewhere/x.zip")),
            ..JobOptions::default()
        };
        assert_eq!(plan_output(Path::new("/data/a.zip"), &opts).unwrap(), PathBuf::from("/data/a.zip"));
    }

    #[test]
    fn explicit_output_needs_zip_suffix() {
        let opts = JobOptions { output: Some(PathBuf::from("out.tar")), ..JobOptions::default() };
        assert!(matches!(plan_output(Path::new("a.zip"), &opts), Err(Error::UnsupportedFormat { .. })));
    }

    #[test]
    fn backup_copies_into_sibling_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.zip");
        fs::write(&source, b"original").unwrap();

        let copy = backup(&source, DEFAULT_BACKUP_DIR).unwrap();
        assert_eq!(copy, dir.path().join(DEFAULT_BACKUP_DIR).join("a.zip"));
        assert_eq!(fs::read(copy).unwrap(), b"original");
    }
}
