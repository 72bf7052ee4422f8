//! Codepage registry and strict name decoding.
//!
//! # Closed set
//! Every charset the crate can try is a variant of [`Charset`].  Adding a
//! codepage means adding a variant here and, if it should be tried by
//! default, appending it to [`DEFAULT_CANDIDATES`].  Nothing else in the
//! crate enumerates codepages.
//!
//! # Strictness
//! [`decode`] never substitutes U+FFFD.  A byte sequence that is malformed
//! under the declared charset is a [`DecodeError`]; a clean decode is the
//! positive signal the detector relies on.

use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Charset enum ─────────────────────────────────────────────────────────────

/// A filename encoding the crate knows how to decode.
///
/// Serialized as its canonical name; deserialization accepts the same aliases
/// as [`Charset::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    Utf8,
    ShiftJis,
    Gbk,
    Gb18030,
    Big5,
    EucJp,
    EucKr,
}

/// Candidates tried by detection, in trial order.
///
/// UTF-8 comes first so an archive that is already correct is never reported
/// as legacy.  Shift-JIS precedes GBK: most Shift-JIS names also decode as
/// GBK (both are double-byte with overlapping lead ranges) while the reverse
/// is much rarer, so the narrower codepage has to be tried first.
pub const DEFAULT_CANDIDATES: &[Charset] = &[Charset::Utf8, Charset::ShiftJis, Charset::Gbk];

/// Every supported charset, for help output.
pub const ALL: &[Charset] = &[
    Charset::Utf8,
    Charset::ShiftJis,
    Charset::Gbk,
    Charset::Gb18030,
    Charset::Big5,
    Charset::EucJp,
    Charset::EucKr,
];

impl Charset {
    /// The backing `encoding_rs` codec.
    #[inline]
    pub fn encoding(self) -> &'static Encoding {
        match self {
            Charset::Utf8     => encoding_rs::UTF_8,
            Charset::ShiftJis => encoding_rs::SHIFT_JIS,
            Charset::Gbk      => encoding_rs::GBK,
            Charset::Gb18030  => encoding_rs::GB18030,
            Charset::Big5     => encoding_rs::BIG5,
            Charset::EucJp    => encoding_rs::EUC_JP,
            Charset::EucKr    => encoding_rs::EUC_KR,
        }
    }

    /// Canonical lowercase name.  Round-trips through [`Charset::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8     => "utf-8",
            Charset::ShiftJis => "shift-jis",
            Charset::Gbk      => "gbk",
            Charset::Gb18030  => "gb18030",
            Charset::Big5     => "big5",
            Charset::EucJp    => "euc-jp",
            Charset::EucKr    => "euc-kr",
        }
    }

    /// Parse a name or common alias, case-insensitively.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8"                              => Some(Charset::Utf8),
            "shift-jis" | "shift_jis" | "sjis" | "cp932"  => Some(Charset::ShiftJis),
            "gbk" | "cp936"                               => Some(Charset::Gbk),
            "gb18030"                                     => Some(Charset::Gb18030),
            "big5" | "cp950"                              => Some(Charset::Big5),
            "euc-jp" | "eucjp"                            => Some(Charset::EucJp),
            "euc-kr" | "euckr" | "cp949"                  => Some(Charset::EucKr),
            _                                             => None,
        }
    }

    pub fn is_utf8(self) -> bool {
        self == Charset::Utf8
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Charset::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = ALL.iter().map(|c| c.name()).collect();
            format!("unknown charset '{s}' (expected one of: {})", known.join(", "))
        })
    }
}

impl TryFrom<String> for Charset {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Charset> for String {
    fn from(charset: Charset) -> Self {
        charset.name().to_owned()
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// A byte sequence that is not valid under `charset`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("\"{}\" is not valid {charset}", .raw.escape_ascii())]
pub struct DecodeError {
    pub charset: Charset,
    pub raw:     Vec<u8>,
}

// ── Decoding ─────────────────────────────────────────────────────────────────

/// Decode `bytes` under `charset`, failing on the first malformed sequence.
///
/// No BOM sniffing is done: a name is never allowed to switch its own charset.
pub fn decode(bytes: &[u8], charset: Charset) -> Result<String, DecodeError> {
    charset
        .encoding()
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| DecodeError { charset, raw: bytes.to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    // "日本語" in Shift-JIS.
    const SJIS_NIHONGO: &[u8] = b"\x93\xfa\x96\x7b\x8c\xea";
    // "压缩包.txt" in GBK; the final lead byte 0xFC is followed by '.', which
    // Shift-JIS rejects as a trail byte.
    const GBK_YASUOBAO: &[u8] = b"\xd1\xb9\xcb\xf5\xb0\xfc.txt";

    #[test]
    fn utf8_is_strict() {
        assert_eq!(decode("日本語".as_bytes(), Charset::Utf8).unwrap(), "日本語");
        let err = decode(SJIS_NIHONGO, Charset::Utf8).unwrap_err();
        assert_eq!(err.charset, Charset::Utf8);
        assert_eq!(err.raw, SJIS_NIHONGO);
    }

    #[test]
    fn shift_jis_decodes_its_own_bytes() {
        assert_eq!(decode(SJIS_NIHONGO, Charset::ShiftJis).unwrap(), "日本語");
    }

    #[test]
    fn shift_jis_trail_backslash_is_not_a_separator() {
        // "ソ" is 0x83 0x5C; the trail byte is ASCII '\'.
        let text = decode(b"\x83\x5c", Charset::ShiftJis).unwrap();
        assert_eq!(text, "ソ");
        assert!(!text.contains('\\'));
    }

    #[test]
    fn gbk_only_bytes_are_rejected_by_shift_jis() {
        assert_eq!(decode(GBK_YASUOBAO, Charset::Gbk).unwrap(), "压缩包.txt");
        assert!(decode(GBK_YASUOBAO, Charset::ShiftJis).is_err());
    }

    #[test]
    fn ascii_decodes_everywhere() {
        for charset in ALL {
            assert_eq!(decode(b"docs/readme.txt", *charset).unwrap(), "docs/readme.txt");
        }
    }

    #[test]
    fn truncated_double_byte_is_an_error() {
        assert!(decode(b"\x93", Charset::ShiftJis).is_err());
        assert!(decode(b"\xd6", Charset::Gbk).is_err());
    }

    #[test]
    fn names_round_trip() {
        for charset in ALL {
            assert_eq!(Charset::from_name(charset.name()), Some(*charset));
            assert_eq!(charset.to_string().parse::<Charset>(), Ok(*charset));
        }
        assert_eq!(Charset::from_name("SJIS"), Some(Charset::ShiftJis));
        assert_eq!(Charset::from_name("cp936"), Some(Charset::Gbk));
        assert!("latin-9".parse::<Charset>().is_err());
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&DEFAULT_CANDIDATES).unwrap();
        assert_eq!(json, r#"["utf-8","shift-jis","gbk"]"#);
        let parsed: Vec<Charset> = serde_json::from_str(r#"["utf8","sjis","gbk"]"#).unwrap();
        assert_eq!(parsed, DEFAULT_CANDIDATES);
    }

    #[test]
    fn serde_accepts_every_name_from_name_accepts() {
        let parsed: Vec<Charset> = serde_json::from_str(r#"["EUC-JP","eucjp","SJIS","euckr"," Utf8 "]"#).unwrap();
        assert_eq!(parsed, [Charset::EucJp, Charset::EucJp, Charset::ShiftJis, Charset::EucKr, Charset::Utf8]);
        let err = serde_json::from_str::<Charset>(r#""latin-9""#).unwrap_err();
        assert!(err.to_string().contains("unknown charset 'latin-9'"), "{err}");
    }

    #[test]
    fn default_candidates_start_with_utf8() {
        assert_eq!(DEFAULT_CANDIDATES.first(), Some(&Charset::Utf8));
    }
}
