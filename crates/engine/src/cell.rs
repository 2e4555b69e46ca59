use std::sync::Arc;

use crate::mode::{Mode, Term};

pub const QUOTE: u8 = b'"';

/// A single field.
///
/// `source` is the verbatim wire form (quotes and all), `text` its decoded
/// and unquoted value, `original` the wire form as it was when loaded (or
/// last saved). Cells are replaced wholesale on edit; the byte buffers are
/// shared so yank snapshots stay cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    source: Arc<[u8]>,
    text: String,
    original: Arc<[u8]>,
}

impl Default for Cell {
    fn default() -> Self {
        let empty: Arc<[u8]> = Arc::from(Vec::new());
        Self {
            source: empty.clone(),
            text: String::new(),
            original: empty,
        }
    }
}

impl Cell {
    /// A cell read from the stream: its wire form is also its original.
    pub fn parsed(source: Vec<u8>, mode: &mut Mode) -> Self {
        let text = dequote(&mode.decode(&source));
        let source: Arc<[u8]> = source.into();
        Self {
            original: source.clone(),
            source,
            text,
        }
    }

    /// A new cell holding `text`, quoted only when the text needs it.
    pub fn from_text(text: &str, mode: &Mode) -> Self {
        let needs_quote = text
            .bytes()
            .any(|b| b == QUOTE || b == b'\n' || b == b'\r' || b == mode.delimiter);
        let wire = if needs_quote {
            quote_text(text)
        } else {
            text.to_string()
        };
        Self {
            source: mode.encode(&wire).into(),
            text: text.to_string(),
            original: Arc::from(Vec::<u8>::new()),
        }
    }

    /// Same position in the document, new wire bytes; the original is kept.
    pub fn with_source(&self, source: &[u8], mode: &mut Mode) -> Self {
        Self {
            source: source.into(),
            text: dequote(&mode.decode(source)),
            original: self.original.clone(),
        }
    }

    /// The current text in forced-quoted wire form.
    pub fn quoted(&self, mode: &Mode) -> Self {
        Self {
            source: mode.encode(&quote_text(&self.text)).into(),
            text: self.text.clone(),
            original: self.original.clone(),
        }
    }

    /// Undo: back to the original wire bytes.
    pub fn restore(&mut self, mode: &mut Mode) {
        self.source = self.original.clone();
        self.text = dequote(&mode.decode(&self.original));
    }

    /// Recompute the text from the wire bytes (after an encoding switch).
    pub fn redecode(&mut self, mode: &mut Mode) {
        self.text = dequote(&mode.decode(&self.source));
    }

    /// Make the current wire form the new original (after a save).
    pub fn rebaseline(&mut self) {
        self.original = self.source.clone();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn original(&self) -> &[u8] {
        &self.original
    }

    pub fn is_modified(&self) -> bool {
        self.source != self.original
    }

    pub fn is_quoted(&self) -> bool {
        self.source.first() == Some(&QUOTE)
    }

    /// The wire form decoded for display (quotes kept).
    pub fn readable_source(&self, mode: &mut Mode) -> String {
        mode.decode(&self.source)
    }
}

fn quote_text(text: &str) -> String {
    let mut wire = String::with_capacity(text.len() + 2);
    wire.push('"');
    for c in text.chars() {
        if c == '"' {
            wire.push('"');
        }
        wire.push(c);
    }
    wire.push('"');
    wire
}

/// Strip quoting from a wire field. A doubled quote yields one literal
/// quote wherever it appears; any other quote opens or closes a quoted run.
pub fn dequote(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();
    let mut at_start = true;
    while let Some(c) = chars.next() {
        if c != '"' {
            text.push(c);
        } else if (in_quotes || !at_start) && chars.peek() == Some(&'"') {
            // a leading quote opens a run, so `""` is the empty field
            text.push('"');
            chars.next();
        } else {
            in_quotes = !in_quotes;
        }
        at_start = false;
    }
    text
}

/// One record: at least one cell and its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub term: Term,
}

impl Row {
    /// A row with a single empty cell and the document's default terminator.
    pub fn new(mode: &Mode) -> Self {
        Self {
            cells: vec![Cell::from_text("", mode)],
            term: mode.default_term(),
        }
    }

    pub fn from_texts<S: AsRef<str>>(texts: &[S], term: Term, mode: &Mode) -> Self {
        let mut cells: Vec<Cell> = texts.iter().map(|t| Cell::from_text(t.as_ref(), mode)).collect();
        if cells.is_empty() {
            cells.push(Cell::from_text("", mode));
        }
        Self { cells, term }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Nothing was read into this record (the phantom record after a final newline).
    pub fn is_blank(&self) -> bool {
        match self.cells.as_slice() {
            [] => true,
            [only] => only.original().is_empty(),
            _ => false,
        }
    }

    fn pad_to(&mut self, len: usize) {
        while self.cells.len() < len {
            self.cells.push(Cell::default());
        }
    }

    /// Replace the text of cell `i`, keeping its original for undo.
    pub fn replace(&mut self, i: usize, text: &str, mode: &Mode) {
        self.pad_to(i + 1);
        let original = self.cells[i].original.clone();
        let mut cell = Cell::from_text(text, mode);
        cell.original = original;
        self.cells[i] = cell;
    }

    /// Overwrite the wire bytes of cell `i`, keeping its original.
    pub fn set_source(&mut self, i: usize, source: &[u8], mode: &mut Mode) {
        self.pad_to(i + 1);
        self.cells[i] = self.cells[i].with_source(source, mode);
    }

    pub fn insert(&mut self, i: usize, text: &str, mode: &Mode) {
        self.insert_cell(i, Cell::from_text(text, mode));
    }

    pub fn insert_cell(&mut self, i: usize, cell: Cell) {
        self.pad_to(i);
        self.cells.insert(i, cell);
    }

    /// Remove cell `i`; the last remaining cell is emptied instead.
    pub fn delete(&mut self, i: usize, mode: &Mode) {
        if self.cells.len() <= 1 {
            self.replace(0, "", mode);
        } else if i < self.cells.len() {
            self.cells.remove(i);
        }
    }

    /// Append the wire form of this row: cells joined by the delimiter, then the terminator.
    pub fn rebuild(&self, delimiter: u8, out: &mut Vec<u8>) {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            out.extend_from_slice(cell.source());
        }
        out.extend_from_slice(self.term.as_bytes());
    }

    pub fn restore_all(&mut self, mode: &mut Mode) {
        for cell in &mut self.cells {
            cell.restore(mode);
        }
    }

    pub fn redecode(&mut self, mode: &mut Mode) {
        for cell in &mut self.cells {
            cell.redecode(mode);
        }
    }

    pub fn rebaseline(&mut self) {
        for cell in &mut self.cells {
            cell.rebaseline();
        }
    }
}
