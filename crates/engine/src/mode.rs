// Document-wide codec state
// Delimiter, stream encoding, legacy codepage, BOM and line terminator.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};

/// Line terminator of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    /// Unterminated last line (end of stream)
    Eof,
    Lf,
    CrLf,
}

impl Term {
    pub fn as_str(self) -> &'static str {
        match self {
            Term::Eof => "",
            Term::Lf => "\n",
            Term::CrLf => "\r\n",
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    pub fn is_eof(self) -> bool {
        self == Term::Eof
    }

    /// Status-line tag
    pub fn tag(self) -> &'static str {
        match self {
            Term::Eof => "[EOF]",
            Term::Lf => "[LF]",
            Term::CrLf => "[CRLF]",
        }
    }
}

/// Byte encoding of the whole stream, decided once at stream start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Byte-order-mark tri-state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bom {
    #[default]
    Unknown,
    Absent,
    Present,
}

#[derive(Debug, Clone)]
pub struct Mode {
    pub delimiter: u8,
    pub stream: StreamEncoding,
    pub bom: Bom,
    /// Set once any field failed UTF-8 validation (or when forced by the user).
    /// New cells are then encoded with the legacy codepage.
    pub non_utf8: bool,
    legacy: &'static Encoding,
    explicit: bool,
    default_term: Option<Term>,
}

impl Default for Mode {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl Mode {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            stream: StreamEncoding::Utf8,
            bom: Bom::Unknown,
            non_utf8: false,
            legacy: WINDOWS_1252,
            explicit: false,
            default_term: None,
        }
    }

    /// Force an encoding by WHATWG label (`shift_jis`, `latin1`, `utf-16be`, ...).
    /// UTF-16 labels switch the stream encoding; anything else replaces the
    /// legacy codepage used for non-UTF-8 fields.
    pub fn set_encoding(&mut self, label: &str) -> Result<(), String> {
        let encoding = lookup(label)?;
        if encoding == UTF_16LE {
            self.stream = StreamEncoding::Utf16Le;
        } else if encoding == UTF_16BE {
            self.stream = StreamEncoding::Utf16Be;
        } else if encoding != UTF_8 {
            self.legacy = encoding;
        }
        self.explicit = true;
        Ok(())
    }

    /// Replace the legacy codepage of an already-loaded document.
    /// The byte layout of loaded rows is fixed, so UTF-16 is refused here.
    pub fn set_legacy_encoding(&mut self, label: &str) -> Result<(), String> {
        let encoding = lookup(label)?;
        if encoding == UTF_16LE || encoding == UTF_16BE {
            return Err(format!("{}: cannot reinterpret loaded data as UTF-16", label.trim()));
        }
        self.legacy = encoding;
        self.explicit = true;
        Ok(())
    }

    pub fn legacy(&self) -> &'static Encoding {
        self.legacy
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    pub fn is_utf16(&self) -> bool {
        self.stream != StreamEncoding::Utf8
    }

    /// Terminator for rows created by editing; LF until the first record says otherwise.
    pub fn default_term(&self) -> Term {
        self.default_term.unwrap_or(Term::Lf)
    }

    /// Record the terminator of a parsed record; only the first one counts.
    pub fn observe_term(&mut self, term: Term) {
        if self.default_term.is_none() && !term.is_eof() {
            self.default_term = Some(term);
        }
    }

    /// Decode wire bytes to text.
    ///
    /// UTF-16 streams were transcoded to UTF-8 before scanning, so their
    /// bytes are always UTF-8. Otherwise valid UTF-8 wins until the first
    /// field that fails validation; from then on the legacy codepage is used.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        if self.is_utf16() {
            return String::from_utf8_lossy(bytes).into_owned();
        }
        if !self.non_utf8 {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return text.to_owned();
            }
            log::debug!("field is not UTF-8, switching to {}", self.legacy.name());
        }
        self.non_utf8 = true;
        let (text, _) = self.legacy.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Encode text to wire bytes (the inverse of `decode`).
    pub fn encode(&self, text: &str) -> Vec<u8> {
        if self.non_utf8 && !self.is_utf16() {
            let (bytes, _, _) = self.legacy.encode(text);
            bytes.into_owned()
        } else {
            text.as_bytes().to_vec()
        }
    }

    /// Status-line delimiter tag: `[CSV]`, `[TSV]` or the raw delimiter.
    pub fn delimiter_tag(&self) -> String {
        match self.delimiter {
            b',' => "[CSV]".to_string(),
            b'\t' => "[TSV]".to_string(),
            other => format!("[{}]", other as char),
        }
    }

    /// Status-line encoding tag, `None` for plain UTF-8.
    pub fn encoding_tag(&self) -> Option<String> {
        match self.stream {
            StreamEncoding::Utf16Le => Some("[16LE]".to_string()),
            StreamEncoding::Utf16Be => Some("[16BE]".to_string()),
            StreamEncoding::Utf8 if self.non_utf8 => Some(format!("[{}]", self.legacy.name())),
            StreamEncoding::Utf8 => None,
        }
    }
}

fn lookup(label: &str) -> Result<&'static Encoding, String> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| format!("{}: unknown encoding", label.trim()))
}
