//! User configuration, read from a JSON file.
//!
//! Every field is optional in the file; missing ones take the defaults below.
//! Command-line flags override whatever is loaded here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::charset::{self, Charset};
use crate::job::{Decoding, DEFAULT_BACKUP_DIR};
use crate::profile::CompressionProfile;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config '{}' lists no candidate charsets", path.display())]
    NoCandidates { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Detection trial order.
    pub candidates:    Vec<Charset>,
    /// Decoding used by `convert` when none is given.
    pub decoding:      Decoding,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_profile: Option<CompressionProfile>,
    pub backup_dir:    String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidates:    charset::DEFAULT_CANDIDATES.to_vec(),
            decoding:      Decoding::default(),
            force_profile: None,
            backup_dir:    DEFAULT_BACKUP_DIR.to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_owned(), source })?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_owned(), source })?;
        if config.candidates.is_empty() {
            return Err(ConfigError::NoCandidates { path: path.to_owned() });
        }
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/zipcharset/config.json`, falling back to
    /// `~/.config/zipcharset/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| home::home_dir().map(|h| h.join(".config")))
            .map(|dir| dir.join("zipcharset").join("config.json"))
    }

    /// Load `explicit` if given (it must exist), else the default file when
    /// present, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _                            => Ok(Self::default()),
        }
    }
}
