use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use super::copy_member;
use crate::charset::{self, Charset};
use crate::container::{self, ContainerKind};
use crate::entry::{EntryDescriptor, EntryKind, EntryPath, PathError};
use crate::error::{Error, Result};
use crate::profile::{deflate_level_from_flags, CompressionProfile, Method};

/// `PK\x03\x04` read as a little-endian u32.
const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
/// General-purpose flag bit 11: name and comment are UTF-8.
const FLAG_UTF8: u16 = 0x0800;

// ── RawEntry ─────────────────────────────────────────────────────────────────

/// Index metadata captured before any name is decoded.
struct RawEntry {
    index:           usize,
    name_raw:        Vec<u8>,
    compressed_size: u64,
    size:            u64,
    method:          zip::CompressionMethod,
    header_start:    u64,
    encrypted:       bool,
}

// ── ArchiveReader ────────────────────────────────────────────────────────────

/// A container opened for reading under one declared name charset.
pub struct ArchiveReader {
    path:     PathBuf,
    charset:  Charset,
    password: Option<Vec<u8>>,
    archive:  ZipArchive<File>,
    entries:  Vec<EntryDescriptor>,
}

impl ArchiveReader {
    // ── Constructor ──────────────────────────────────────────────────────────

    /// Open `path` and decode every member name under `charset`.
    ///
    /// Members flagged as UTF-8 by the container are decoded as UTF-8
    /// regardless of `charset`.  All names are decoded before any path is
    /// validated, so a wrong guess surfaces as [`Error::Decode`] even when a
    /// later member is also malformed.
    pub fn open<P: AsRef<Path>>(path: P, charset: Charset, password: Option<&[u8]>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let kind = ContainerKind::from_path(&path)?;

        let mut file = File::open(&path).map_err(|source| open_error(&path, source))?;
        let magic = container::read_magic(&mut file).map_err(|source| open_error(&path, source))?;
        if !kind.matches_signature(&magic) {
            return Err(Error::UnsupportedFormat { path });
        }
        file.rewind()?;

        let mut archive = ZipArchive::new(file).map_err(|e| member_error(e, "central directory"))?;
        let raw = read_raw_entries(&mut archive)?;

        // Flags live in each local header; a second handle keeps the codec's
        // cursor untouched.
        let mut headers = File::open(&path).map_err(|source| open_error(&path, source))?;
        let mut decoded = Vec::with_capacity(raw.len());
        for entry in &raw {
            let flags = local_flags(&mut headers, entry.header_start).map_err(|e| Error::Corrupted {
                entry:  String::from_utf8_lossy(&entry.name_raw).into_owned(),
                reason: e.to_string(),
            })?;
            let declared = if flags & FLAG_UTF8 != 0 { Charset::Utf8 } else { charset };
            let name = charset::decode(&entry.name_raw, declared)
                .map_err(|source| Error::Decode { index: entry.index, source })?;
            decoded.push((name, flags));
        }

        let entries = raw
            .into_iter()
            .zip(decoded)
            .map(|(entry, (name, flags))| describe(entry, &name, flags))
            .collect::<Result<Vec<_>>>()?;
        check_collisions(&entries)?;

        info!(path = %path.display(), %charset, entries = entries.len(), "opened archive");
        Ok(Self {
            path,
            charset,
            password: password.map(<[u8]>::to_vec),
            archive,
            entries,
        })
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn path(&self) -> &Path { &self.path }

    pub fn charset(&self) -> Charset { self.charset }

    /// Members in container index order, directories included.
    pub fn list_entries(&self) -> &[EntryDescriptor] { &self.entries }

    /// Profile of the first file member, or [`CompressionProfile::DEFAULT`]
    /// when there is none.  Directory members are stored, so they say nothing
    /// about how the producer compressed data.
    pub fn dominant_compression_profile(&self) -> CompressionProfile {
        self.entries
            .iter()
            .find(|e| !e.is_dir())
            .map(|e| e.profile)
            .unwrap_or(CompressionProfile::DEFAULT)
    }

    // ── Integrity ────────────────────────────────────────────────────────────

    /// Decompress every file member and check its CRC.  The first failing
    /// member is reported as [`Error::Corrupted`].
    pub fn verify(&mut self) -> Result<()> {
        for pos in 0..self.entries.len() {
            if self.entries[pos].is_dir() {
                continue;
            }
            self.with_member(pos, |member, entry| {
                copy_member(member, &mut io::sink(), &entry.path.to_archive_name()).map(|_| ())
            })?;
        }
        debug!(path = %self.path.display(), "integrity check passed");
        Ok(())
    }

    // ── Extraction ───────────────────────────────────────────────────────────

    /// Write every member beneath `dest`, recreating the directory structure.
    /// Returns the number of content bytes written.
    ///
    /// On failure whatever was already written stays in place; `dest` is
    /// scratch space for the caller to discard.
    pub fn extract_all<P: AsRef<Path>>(&mut self, dest: P) -> Result<u64> {
        let dest = dest.as_ref();
        fs::create_dir_all(dest)?;

        let mut total = 0u64;
        for pos in 0..self.entries.len() {
            let target = dest.join(self.entries[pos].path.to_path_buf());
            if self.entries[pos].is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let written = self.with_member(pos, |member, entry| {
                let mut out = BufWriter::new(File::create(&target)?);
                let n = copy_member(member, &mut out, &entry.path.to_archive_name())?;
                out.flush()?;
                Ok(n)
            })?;
            debug!(entry = %self.entries[pos].path, bytes = written, "extracted");
            total += written;
        }
        Ok(total)
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Open member `pos` (decrypting if needed) and hand its reader to `f`.
    fn with_member<T, F>(&mut self, pos: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Read, &EntryDescriptor) -> Result<T>,
    {
        let entry = &self.entries[pos];
        let opened = match (entry.encrypted, self.password.as_deref()) {
            (true, Some(password)) => self.archive.by_index_decrypt(entry.index, password),
            (true, None) => {
                return Err(Error::PasswordRequired { entry: entry.path.to_archive_name() })
            }
            (false, _) => self.archive.by_index(entry.index),
        };
        let mut member = opened.map_err(|e| member_error(e, &entry.path.to_archive_name()))?;
        f(&mut member, entry)
    }
}

// ── Free helpers ─────────────────────────────────────────────────────────────

fn read_raw_entries(archive: &mut ZipArchive<File>) -> Result<Vec<RawEntry>> {
    (0..archive.len())
        .map(|index| {
            let file = archive
                .by_index_raw(index)
                .map_err(|e| member_error(e, &format!("entry #{index}")))?;
            Ok(RawEntry {
                index,
                name_raw:        file.name_raw().to_vec(),
                compressed_size: file.compressed_size(),
                size:            file.size(),
                method:          file.compression(),
                header_start:    file.header_start(),
                encrypted:       file.encrypted(),
            })
        })
        .collect()
}

/// Read the general-purpose flag word of the local header at `offset`.
fn local_flags<R: Read + Seek>(reader: &mut R, offset: u64) -> io::Result<u16> {
    reader.seek(SeekFrom::Start(offset))?;
    if reader.read_u32::<LittleEndian>()? != LOCAL_HEADER_SIGNATURE {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "local header signature mismatch"));
    }
    let _version_needed = reader.read_u16::<LittleEndian>()?;
    reader.read_u16::<LittleEndian>()
}

fn describe(raw: RawEntry, name: &str, flags: u16) -> Result<EntryDescriptor> {
    let path = EntryPath::parse(name).map_err(|e| match e {
        PathError::Escapes        => Error::UnsafePath { entry: name.to_owned() },
        PathError::IllegalChar(_) => Error::IllegalName { entry: name.escape_debug().to_string() },
    })?;
    // Only the decoded name counts: in the codec's CP437 view a legacy
    // double-byte character with a 0x5C trail byte ends in a backslash.
    let kind = if name.ends_with('/') || name.ends_with('\\') {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    let method = Method::from_zip(raw.method);
    let level = match method {
        Method::Deflated => Some(deflate_level_from_flags(flags)),
        _                => None,
    };
    Ok(EntryDescriptor {
        index:             raw.index,
        path,
        kind,
        compressed_size:   raw.compressed_size,
        uncompressed_size: raw.size,
        profile:           CompressionProfile::new(method, level),
        encrypted:         raw.encrypted,
    })
}

/// Reject members that would land on the same staging path, or a file that
/// another member needs as a directory.
fn check_collisions(entries: &[EntryDescriptor]) -> Result<()> {
    let mut files: HashSet<&[String]> = HashSet::new();
    let mut dirs:  HashSet<&[String]> = HashSet::new();
    for entry in entries {
        let segments = entry.path.segments();
        for depth in 1..segments.len() {
            dirs.insert(&segments[..depth]);
        }
        if entry.is_dir() {
            dirs.insert(segments);
        } else if !files.insert(segments) {
            return Err(Error::DuplicateEntry { entry: entry.path.to_archive_name() });
        }
    }
    match files.iter().find(|f| dirs.contains(*f)) {
        Some(clash) => Err(Error::DuplicateEntry { entry: clash.join("/") }),
        None        => Ok(()),
    }
}

fn open_error(path: &Path, source: io::Error) -> Error {
    Error::Open { path: path.to_path_buf(), source }
}

fn member_error(err: ZipError, entry: &str) -> Error {
    match err {
        ZipError::Io(e) if e.kind() != io::ErrorKind::UnexpectedEof => Error::Io(e),
        ZipError::InvalidPassword => Error::InvalidPassword { entry: entry.to_owned() },
        ZipError::UnsupportedArchive(reason) => Error::UnsupportedEntry {
            entry:  entry.to_owned(),
            reason: reason.to_string(),
        },
        other => Error::Corrupted { entry: entry.to_owned(), reason: other.to_string() },
    }
}
