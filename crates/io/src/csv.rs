// CSV/TSV record reader and document writer
// Fields keep their verbatim wire bytes so an unedited document is written
// back byte for byte.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};

use encoding_rs::{UTF_16BE, UTF_16LE};
use tabula_engine::cell::QUOTE;
use tabula_engine::{Bom, Cell, Mode, Row, StreamEncoding, Term};

use crate::utf16::{self, Utf16Reader};

/// Bytes inspected at stream start for a BOM or UTF-16 NUL bytes.
const SNIFF_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Read or write failure of the underlying stream.
    Io(String),
    /// Document bytes that cannot be expressed in the stream encoding.
    Encoding(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Encoding(msg) => write!(f, "encoding error: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// One scanned record. `eof` is set when the stream ended inside it; the
/// row is still data unless it is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub row: Row,
    pub eof: bool,
}

pub struct RecordReader {
    input: Box<dyn BufRead + Send>,
    prepared: bool,
    finished: bool,
}

impl RecordReader {
    pub fn new(input: impl Read + Send + 'static) -> Self {
        Self::from_buf(BufReader::new(input))
    }

    pub fn from_buf(input: impl BufRead + Send + 'static) -> Self {
        Self {
            input: Box::new(input),
            prepared: false,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decide BOM and stream encoding from the first bytes. Only the first
    /// call reads anything; `read_record` calls it on demand.
    pub fn prepare(&mut self, mode: &mut Mode) -> Result<(), CodecError> {
        if self.prepared {
            return Ok(());
        }
        self.prepared = true;
        let mut prefix = Vec::new();
        loop {
            let buf = self.input.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let take = buf.len().min(SNIFF_LEN - prefix.len());
            prefix.extend_from_slice(&buf[..take]);
            self.input.consume(take);
            if prefix.len() >= 4 || prefix.len() >= SNIFF_LEN {
                break;
            }
        }

        let mut skip = 0;
        match mode.stream {
            StreamEncoding::Utf16Le | StreamEncoding::Utf16Be => {
                if prefix.starts_with(utf16::bom(mode.stream)) {
                    skip = 2;
                }
            }
            StreamEncoding::Utf8 => {
                if prefix.starts_with(b"\xEF\xBB\xBF") {
                    skip = 3;
                } else if prefix.starts_with(b"\xFF\xFE") {
                    mode.stream = StreamEncoding::Utf16Le;
                    skip = 2;
                } else if prefix.starts_with(b"\xFE\xFF") {
                    mode.stream = StreamEncoding::Utf16Be;
                    skip = 2;
                } else if !mode.is_explicit() {
                    if let Some(at) = prefix.iter().position(|&b| b == 0) {
                        mode.stream = if at % 2 == 1 {
                            StreamEncoding::Utf16Le
                        } else {
                            StreamEncoding::Utf16Be
                        };
                    }
                }
            }
        }
        mode.bom = if skip > 0 { Bom::Present } else { Bom::Absent };
        log::debug!("stream prepared: {:?}, bom {:?}", mode.stream, mode.bom);

        let rest = std::mem::replace(&mut self.input, Box::new(io::empty()));
        let chained = io::Cursor::new(prefix.split_off(skip)).chain(rest);
        self.input = match mode.stream {
            StreamEncoding::Utf8 => Box::new(chained),
            StreamEncoding::Utf16Le => Box::new(BufReader::new(Utf16Reader::new(chained, UTF_16LE))),
            StreamEncoding::Utf16Be => Box::new(BufReader::new(Utf16Reader::new(chained, UTF_16BE))),
        };
        Ok(())
    }

    /// Scan one record. `Ok(None)` once the stream is exhausted.
    pub fn read_record(&mut self, mode: &mut Mode) -> Result<Option<Record>, CodecError> {
        if self.finished {
            return Ok(None);
        }
        if let Err(e) = self.prepare(mode) {
            self.finished = true;
            return Err(e);
        }
        let mut cells = Vec::new();
        let mut source = Vec::new();
        let mut quoted = false;
        loop {
            let buf = match self.input.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(e.into());
                }
            };
            if buf.is_empty() {
                cells.push(Cell::parsed(source, mode));
                self.finished = true;
                return Ok(Some(Record {
                    row: Row { cells, term: Term::Eof },
                    eof: true,
                }));
            }
            let mut used = 0;
            let mut term = None;
            for &c in buf {
                used += 1;
                if c == QUOTE {
                    quoted = !quoted;
                }
                if !quoted {
                    if c == mode.delimiter {
                        cells.push(Cell::parsed(std::mem::take(&mut source), mode));
                        continue;
                    }
                    if c == b'\n' {
                        term = Some(if source.last() == Some(&b'\r') {
                            source.pop();
                            Term::CrLf
                        } else {
                            Term::Lf
                        });
                        break;
                    }
                }
                source.push(c);
            }
            self.input.consume(used);
            if let Some(term) = term {
                cells.push(Cell::parsed(source, mode));
                mode.observe_term(term);
                return Ok(Some(Record {
                    row: Row { cells, term },
                    eof: false,
                }));
            }
        }
    }

    /// Next data row; the blank record after a final terminator is not one.
    pub fn next_row(&mut self, mode: &mut Mode) -> Result<Option<Row>, CodecError> {
        match self.read_record(mode)? {
            Some(Record { row, eof: true }) if row.is_blank() => Ok(None),
            Some(record) => Ok(Some(record.row)),
            None => Ok(None),
        }
    }
}

/// Read every remaining row.
pub fn read_all(reader: &mut RecordReader, mode: &mut Mode) -> Result<Vec<Row>, CodecError> {
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row(mode)? {
        rows.push(row);
    }
    Ok(rows)
}

/// Write a whole document: BOM if the input had one, then every row rebuilt
/// from its wire bytes, re-encoded to UTF-16 when the input was UTF-16.
pub fn write_document<'a>(
    rows: impl IntoIterator<Item = &'a Row>,
    mode: &Mode,
    out: &mut dyn Write,
) -> Result<(), CodecError> {
    let mut body = Vec::new();
    for row in rows {
        row.rebuild(mode.delimiter, &mut body);
    }
    let has_bom = mode.bom == Bom::Present;
    if mode.is_utf16() {
        let text = String::from_utf8(body).map_err(|e| CodecError::Encoding(e.to_string()))?;
        if has_bom {
            out.write_all(utf16::bom(mode.stream))?;
        }
        out.write_all(&utf16::encode(&text, mode.stream))?;
    } else {
        if has_bom {
            out.write_all(utf16::bom(StreamEncoding::Utf8))?;
        }
        out.write_all(&body)?;
    }
    out.flush()?;
    Ok(())
}
