// Cell search over materialized rows
// Scans cell by cell from the cursor, left to right within a row and row by
// row across the document. Never wraps around.

use std::collections::HashSet;

use crate::sheet::{RowPtr, Sheet};

/// Most completion candidates offered for a column.
pub const MAX_CANDIDATES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-sensitive containment
    Substring,
    /// Case-insensitive equality of the whole cell
    Exact,
}

impl MatchKind {
    pub fn matches(self, text: &str, term: &str) -> bool {
        match self {
            Self::Substring => text.contains(term),
            Self::Exact => text.to_lowercase() == term.to_lowercase(),
        }
    }
}

/// The last search, reused by `n` and `N`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSearch {
    pub term: String,
    pub kind: MatchKind,
    pub direction: Direction,
}

impl LastSearch {
    pub fn repeat(&self, sheet: &Sheet, from: RowPtr, col: usize) -> Option<(RowPtr, usize)> {
        find(sheet, from, col, &self.term, self.kind, self.direction)
    }

    pub fn repeat_reversed(&self, sheet: &Sheet, from: RowPtr, col: usize) -> Option<(RowPtr, usize)> {
        find(sheet, from, col, &self.term, self.kind, self.direction.reversed())
    }
}

/// First cell strictly after (or before) `(from, col)` matching `term`.
pub fn find(
    sheet: &Sheet,
    from: RowPtr,
    col: usize,
    term: &str,
    kind: MatchKind,
    direction: Direction,
) -> Option<(RowPtr, usize)> {
    let mut row = sheet.resolve(from);
    match direction {
        Direction::Forward => {
            let mut c = col + 1;
            loop {
                let cells = &sheet.get(row)?.cells;
                if let Some(offset) = cells.iter().skip(c).position(|cell| kind.matches(cell.text(), term)) {
                    return Some((row, c + offset));
                }
                row = sheet.next(row)?;
                c = 0;
            }
        }
        Direction::Backward => {
            let mut end = col;
            loop {
                let cells = &sheet.get(row)?.cells;
                let end_at = end.min(cells.len());
                if let Some(c) = cells[..end_at].iter().rposition(|cell| kind.matches(cell.text(), term)) {
                    return Some((row, c));
                }
                row = sheet.prev(row)?;
                end = usize::MAX;
            }
        }
    }
}

/// Distinct non-empty values of column `col`, walking up from `from`.
/// A missing or empty cell on the starting row is skipped; anywhere else it
/// ends the walk.
pub fn column_candidates(sheet: &Sheet, from: RowPtr, col: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    let mut cursor = Some(sheet.resolve(from));
    let mut first = true;
    while let Some(p) = cursor {
        let value = sheet.get(p).and_then(|row| row.cells.get(col)).map(|cell| cell.text());
        match value {
            Some(text) if !text.is_empty() => {
                if seen.insert(text.to_string()) {
                    result.push(text.to_string());
                    if result.len() >= MAX_CANDIDATES {
                        break;
                    }
                }
            }
            _ if first => {}
            _ => break,
        }
        first = false;
        cursor = sheet.prev(p);
    }
    result
}
