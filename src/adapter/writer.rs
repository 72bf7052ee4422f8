use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{DateTime, ZipWriter};

use crate::container::ContainerKind;
use crate::entry::EntryPath;
use crate::error::{Error, Result};
use crate::profile::CompressionProfile;

/// Members at or above this size need zip64 headers.
const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

/// A container opened for writing with one compression profile.
///
/// [`close`](Self::close) consumes the writer; a writer dropped without it
/// still finalizes on a best-effort basis, but errors are then lost.
pub struct ArchiveWriter {
    path:    PathBuf,
    profile: CompressionProfile,
    zip:     ZipWriter<File>,
    entries: usize,
}

impl ArchiveWriter {
    /// Create `path` for writing.  Unless `overwrite` is set the file must not
    /// exist yet; the check and the creation are one atomic step.
    pub fn create<P: AsRef<Path>>(path: P, profile: CompressionProfile, overwrite: bool) -> Result<Self> {
        let path = path.as_ref().to_owned();
        ContainerKind::from_path(&path)?;

        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(&path).map_err(|source| match source.kind() {
            io::ErrorKind::AlreadyExists => Error::AlreadyExists { path: path.clone() },
            _ => Error::Open { path: path.clone(), source },
        })?;

        let profile = profile.writable();
        debug!(path = %path.display(), %profile, "created archive");
        Ok(Self { path, profile, zip: ZipWriter::new(file), entries: 0 })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Profile applied to file members, after method fallback and clamping.
    pub fn profile(&self) -> CompressionProfile { self.profile }

    pub fn add_directory(&mut self, path: &EntryPath) -> Result<()> {
        let options = stamp(SimpleFileOptions::default()).compression_method(zip::CompressionMethod::Stored);
        self.zip
            .add_directory(path.to_archive_name(), options)
            .map_err(write_error)?;
        self.entries += 1;
        Ok(())
    }

    pub fn add_file(&mut self, path: &EntryPath, data: &[u8]) -> Result<()> {
        self.add_file_from_reader(path, &mut &data[..], data.len() as u64)
            .map(|_| ())
    }

    /// Stream `len` bytes from `reader` into a new member.
    pub fn add_file_from_reader<R: Read + ?Sized>(
        &mut self,
        path:   &EntryPath,
        reader: &mut R,
        len:    u64,
    ) -> Result<u64> {
        let options = self.file_options(len >= LARGE_FILE_THRESHOLD);
        self.zip
            .start_file(path.to_archive_name(), options)
            .map_err(write_error)?;
        let written = io::copy(reader, &mut self.zip)?;
        self.entries += 1;
        Ok(written)
    }

    /// Write the central directory and flush the file to disk.
    pub fn close(self) -> Result<()> {
        let file = self.zip.finish().map_err(write_error)?;
        file.sync_all()?;
        info!(path = %self.path.display(), entries = self.entries, "archive written");
        Ok(())
    }

    fn file_options(&self, large: bool) -> SimpleFileOptions {
        stamp(SimpleFileOptions::default())
            .compression_method(self.profile.method.to_zip())
            .compression_level(self.profile.level)
            .large_file(large)
    }
}

/// Every member carries the DOS epoch so identical input gives identical bytes.
fn stamp(options: SimpleFileOptions) -> SimpleFileOptions {
    options.last_modified_time(DateTime::default())
}

fn write_error(err: ZipError) -> Error {
    match err {
        ZipError::Io(e) => Error::Io(e),
        other => Error::Io(io::Error::new(io::ErrorKind::Other, other)),
    }
}
