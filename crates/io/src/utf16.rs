// UTF-16 transcoding
// The record scanner works on bytes, so UTF-16 input is converted to UTF-8
// before scanning and converted back when the document is written.

use std::io::{self, BufRead, Read};

use encoding_rs::{CoderResult, Decoder, Encoding};
use tabula_engine::StreamEncoding;

/// `Read` adapter yielding the UTF-8 form of a UTF-16 byte stream.
/// Any byte order mark must already have been consumed.
pub struct Utf16Reader<R> {
    inner: R,
    decoder: Decoder,
    pending: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: BufRead> Utf16Reader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            decoder: encoding.new_decoder_without_bom_handling(),
            pending: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    fn refill(&mut self) -> io::Result<()> {
        let input = self.inner.fill_buf()?;
        let last = input.is_empty();
        let capacity = self
            .decoder
            .max_utf8_buffer_length(input.len())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "UTF-16 block too large"))?;
        let mut output = vec![0u8; capacity];
        let (result, read, written, _) = self.decoder.decode_to_utf8(input, &mut output, last);
        self.inner.consume(read);
        output.truncate(written);
        self.pending = output;
        self.pos = 0;
        if last && result == CoderResult::InputEmpty {
            self.done = true;
        }
        Ok(())
    }
}

impl<R: BufRead> Read for Utf16Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            if self.done {
                return Ok(0);
            }
            self.refill()?;
        }
        let available = &self.pending[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Convert UTF-8 document bytes to the UTF-16 wire form of `stream`.
pub fn encode(text: &str, stream: StreamEncoding) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        let bytes = match stream {
            StreamEncoding::Utf16Be => unit.to_be_bytes(),
            _ => unit.to_le_bytes(),
        };
        out.extend_from_slice(&bytes);
    }
    out
}

/// Byte order mark of a UTF-16 stream.
pub fn bom(stream: StreamEncoding) -> &'static [u8] {
    match stream {
        StreamEncoding::Utf16Le => b"\xFF\xFE",
        StreamEncoding::Utf16Be => b"\xFE\xFF",
        StreamEncoding::Utf8 => b"\xEF\xBB\xBF",
    }
}
