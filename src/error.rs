use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::charset::DecodeError;

/// Every failure the rectifier can surface.
///
/// `Decode` is the only variant the detector treats as data ("wrong guess");
/// everything else is fatal for the archive at hand.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported container format: '{}'", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("entry #{index}: {source}")]
    Decode {
        index:  usize,
        #[source]
        source: DecodeError,
    },

    #[error("'{entry}' is corrupted: {reason}")]
    Corrupted { entry: String, reason: String },

    #[error("cannot open '{}': {source}", path.display())]
    Open {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' already exists", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("precondition failed for '{}': {reason}", path.display())]
    Precondition { path: PathBuf, reason: &'static str },

    #[error("entry '{entry}' escapes the archive root")]
    UnsafePath { entry: String },

    #[error("entry '{entry}' collides with another entry after normalization")]
    DuplicateEntry { entry: String },

    #[error("entry '{entry}' contains a character that is not allowed in file names")]
    IllegalName { entry: String },

    #[error("entry '{entry}' is encrypted and no password was supplied")]
    PasswordRequired { entry: String },

    #[error("wrong password for entry '{entry}'")]
    InvalidPassword { entry: String },

    #[error("entry '{entry}' cannot be read: {reason}")]
    UnsupportedEntry { entry: String, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for failures caused by the archive's own bytes rather than by the
    /// caller or the filesystem.
    pub fn is_broken_archive(&self) -> bool {
        matches!(
            self,
            Error::Corrupted { .. }
                | Error::UnsafePath { .. }
                | Error::IllegalName { .. }
                | Error::DuplicateEntry { .. }
                | Error::UnsupportedEntry { .. }
        )
    }
}
