//! Scratch directories for extraction.

use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use crate::error::Result;

const PREFIX: &str = "zipcharset-";

/// A fresh, empty directory owned by one conversion.
///
/// The directory and everything in it are removed on drop.  Use
/// [`close`](Self::close) to observe removal errors instead of ignoring them.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Allocate under the system temp directory.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        debug!(path = %dir.path().display(), "staging area allocated");
        Ok(Self { dir })
    }

    /// Allocate under `parent`, which must already exist.
    pub fn new_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "staging area allocated");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn close(self) -> Result<()> {
        self.dir.close()?;
        Ok(())
    }
}
