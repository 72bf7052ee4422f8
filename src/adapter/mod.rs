//! Container adapters: the only code that talks to the zip codec.
//!
//! # Reader
//! [`ArchiveReader`] opens a container under one declared [`Charset`],
//! decodes every member name from its raw bytes up front, validates the
//! resulting paths, and then offers integrity verification and streaming
//! extraction.
//!
//! # Writer
//! [`ArchiveWriter`] creates a container with one [`CompressionProfile`] and
//! accepts directories and files by [`EntryPath`].  Names are always written
//! as UTF-8.
//!
//! Both are plain blocking types owned by a single caller; neither is shared
//! across threads.
//!
//! [`Charset`]: crate::charset::Charset
//! [`CompressionProfile`]: crate::profile::CompressionProfile
//! [`EntryPath`]: crate::entry::EntryPath

mod reader;
mod writer;

pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;

use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Buffer size for streaming member content.
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Stream `reader` into `writer`.
///
/// Read failures come from the codec (bad CRC, truncated data, failed
/// decompression) and are reported as corruption of `entry`; write failures
/// are plain I/O errors.
pub(crate) fn copy_member<R, W>(reader: &mut R, writer: &mut W, entry: &str) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::Corrupted {
                    entry:  entry.to_owned(),
                    reason: e.to_string(),
                })
            }
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "Invalid checksum"))
        }
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn copies_everything() {
        let data = vec![7u8; COPY_BUFFER_SIZE * 2 + 5];
        let mut out = Vec::new();
        let n = copy_member(&mut data.as_slice(), &mut out, "a").unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(out, data);
    }

    #[test]
    fn read_failure_is_corruption() {
        let err = copy_member(&mut FailingReader, &mut io::sink(), "bad.txt").unwrap_err();
        match err {
            Error::Corrupted { entry, reason } => {
                assert_eq!(entry, "bad.txt");
                assert!(reason.contains("checksum"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn write_failure_is_io() {
        let err = copy_member(&mut &b"data"[..], &mut FailingWriter, "a").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
