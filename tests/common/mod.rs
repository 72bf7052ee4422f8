//! Fixture builders shared by the integration tests.
//!
//! `zip::ZipWriter` only takes `&str` names, so archives with legacy name
//! bytes are assembled by hand: stored members, no extra fields, one central
//! directory.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use zip::unstable::write::FileOptionsExt;

pub const FLAG_UTF8: u16 = 0x0800;
const DOS_DATE_1980_01_01: u16 = 0x0021;
const ATTR_DIRECTORY: u32 = 0x10;

/// "日本語.txt" in Shift-JIS.
pub const SJIS_NIHONGO_TXT: &[u8] = b"\x93\xfa\x96\x7b\x8c\xea.txt";
/// "フォルダ/" in Shift-JIS.
pub const SJIS_FOLDER: &[u8] = b"\x83\x74\x83\x48\x83\x8b\x83\x5f/";
/// "フォルダ/写真.txt" in Shift-JIS.
pub const SJIS_FOLDER_PHOTO: &[u8] = b"\x83\x74\x83\x48\x83\x8b\x83\x5f/\x8e\xca\x90\x5e.txt";
/// "ソ.txt": the second byte of "ソ" is 0x5C.
pub const SJIS_SO_TXT: &[u8] = b"\x83\x5c.txt";
/// "データ表" in Shift-JIS: no extension, and the last byte is 0x5C.
pub const SJIS_DATA_TABLE: &[u8] = b"\x83\x66\x81\x5b\x83\x5e\x95\x5c";
/// "压缩包.txt" in GBK.
pub const GBK_YASUOBAO_TXT: &[u8] = b"\xd1\xb9\xcb\xf5\xb0\xfc.txt";
/// "说明书/" in GBK.
pub const GBK_MANUAL: &[u8] = b"\xcb\xb5\xc3\xf7\xca\xe9/";
/// "说明书/a.txt" in GBK.
pub const GBK_MANUAL_A: &[u8] = b"\xcb\xb5\xc3\xf7\xca\xe9/a.txt";

struct Member {
    name:    Vec<u8>,
    data:    Vec<u8>,
    flags:   u16,
    is_dir:  bool,
    bad_crc: bool,
}

/// A stored-only zip assembled byte by byte.
#[derive(Default)]
pub struct RawZip {
    members: Vec<Member>,
}

impl RawZip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, name: &[u8]) -> Self {
        self.members.push(Member { name: name.to_vec(), data: Vec::new(), flags: 0, is_dir: true, bad_crc: false });
        self
    }

    pub fn file(mut self, name: &[u8], data: &[u8]) -> Self {
        self.members.push(Member { name: name.to_vec(), data: data.to_vec(), flags: 0, is_dir: false, bad_crc: false });
        self
    }

    /// A member whose name the container itself declares as UTF-8.
    pub fn utf8_file(mut self, name: &str, data: &[u8]) -> Self {
        self.members.push(Member {
            name:    name.as_bytes().to_vec(),
            data:    data.to_vec(),
            flags:   FLAG_UTF8,
            is_dir:  false,
            bad_crc: false,
        });
        self
    }

    /// A member whose recorded CRC does not match its content.
    pub fn corrupt_file(mut self, name: &[u8], data: &[u8]) -> Self {
        self.members.push(Member { name: name.to_vec(), data: data.to_vec(), flags: 0, is_dir: false, bad_crc: true });
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::with_capacity(self.members.len());

        for m in &self.members {
            offsets.push(out.len() as u32);
            let crc = m.crc();
            out.write_u32::<LittleEndian>(0x0403_4b50).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(m.flags).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // stored
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(DOS_DATE_1980_01_01).unwrap();
            out.write_u32::<LittleEndian>(crc).unwrap();
            out.write_u32::<LittleEndian>(m.data.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(m.data.len() as u32).unwrap();
            out.write_u16::<LittleEndian>(m.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_all(&m.name).unwrap();
            out.write_all(&m.data).unwrap();
        }

        let cd_offset = out.len() as u32;
        for (m, offset) in self.members.iter().zip(&offsets) {
            out.write_u32::<LittleEndian>(0x0201_4b50).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(m.flags).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(DOS_DATE_1980_01_01).unwrap();
            out.write_u32::<LittleEndian>(m.crc()).unwrap();
            out.write_u32::<LittleEndian>(m.data.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(m.data.len() as u32).unwrap();
            out.write_u16::<LittleEndian>(m.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap(); // extra
            out.write_u16::<LittleEndian>(0).unwrap(); // comment
            out.write_u16::<LittleEndian>(0).unwrap(); // disk
            out.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
            out.write_u32::<LittleEndian>(if m.is_dir { ATTR_DIRECTORY } else { 0 }).unwrap();
            out.write_u32::<LittleEndian>(*offset).unwrap();
            out.write_all(&m.name).unwrap();
        }
        let cd_size = out.len() as u32 - cd_offset;

        let n = self.members.len() as u16;
        out.write_u32::<LittleEndian>(0x0605_4b50).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(n).unwrap();
        out.write_u16::<LittleEndian>(n).unwrap();
        out.write_u32::<LittleEndian>(cd_size).unwrap();
        out.write_u32::<LittleEndian>(cd_offset).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out
    }

    pub fn write_to(&self, path: &Path) {
        std::fs::write(path, self.to_bytes()).unwrap();
    }
}

impl Member {
    fn crc(&self) -> u32 {
        let crc = crc32fast::hash(&self.data);
        if self.bad_crc { crc ^ 0xDEAD_BEEF } else { crc }
    }
}

/// The Shift-JIS fixture: a directory, a nested file, a top-level file and a
/// file whose name carries a 0x5C trail byte.
pub fn sjis_archive(path: &Path) {
    RawZip::new()
        .dir(SJIS_FOLDER)
        .file(SJIS_FOLDER_PHOTO, b"photo bytes")
        .file(SJIS_NIHONGO_TXT, b"nihongo")
        .file(SJIS_SO_TXT, b"so")
        .write_to(path);
}

pub fn gbk_archive(path: &Path) {
    RawZip::new()
        .file(GBK_YASUOBAO_TXT, b"yasuobao")
        .dir(GBK_MANUAL)
        .file(GBK_MANUAL_A, b"manual")
        .write_to(path);
}

/// A deflated archive with UTF-8 names, written the ordinary way.
pub fn utf8_archive(path: &Path, members: &[(&str, &[u8])]) {
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data) in members {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

pub fn encrypted_archive(path: &Path, password: &[u8]) {
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .with_deprecated_encryption(password);
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("secret.txt", options).unwrap();
    zip.write_all(b"top secret").unwrap();
    zip.finish().unwrap();
}

/// Raw name bytes of every member, in index order.
pub fn raw_names(path: &Path) -> Vec<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index_raw(i).unwrap().name_raw().to_vec())
        .collect()
}

/// Name → content for every member of a UTF-8 archive; directories map to
/// `None`.
pub fn contents(path: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut map = BTreeMap::new();
    for i in 0..archive.len() {
        let mut member = archive.by_index(i).unwrap();
        let name = std::str::from_utf8(member.name_raw()).unwrap().to_owned();
        if member.is_dir() {
            map.insert(name, None);
        } else {
            let mut data = Vec::new();
            member.read_to_end(&mut data).unwrap();
            map.insert(name, Some(data));
        }
    }
    map
}

/// Compression method of every file member.
pub fn file_methods(path: &Path) -> Vec<zip::CompressionMethod> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .filter_map(|i| {
            let member = archive.by_index_raw(i).unwrap();
            (!member.is_dir()).then(|| member.compression())
        })
        .collect()
}
