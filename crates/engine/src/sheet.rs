// Row sequence
// An arena of rows with stable ids plus an order vector. Removed rows leave a
// tombstone in the arena and are kept in `removed`.

use std::ops::{Index, IndexMut};

use crate::cell::Row;
use crate::mode::Term;

pub type RowId = usize;

/// Non-owning reference to a row: a stable id plus the line index it had
/// when the pointer was taken. Structural edits may make `line` stale;
/// `Sheet::resolve` recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPtr {
    pub id: RowId,
    pub line: usize,
}

/// Cursor position and the first row of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub top: RowPtr,
    pub row: RowPtr,
    pub col: usize,
}

/// Incremental, time-boxed supply of streamed rows
pub trait RowFeed {
    /// Next row if one arrives in time; `None` means "none yet" or exhausted.
    fn pull(&mut self) -> Option<Row>;
}

/// A feed that never yields (fully loaded documents, tests).
pub struct NoFeed;

impl RowFeed for NoFeed {
    fn pull(&mut self) -> Option<Row> {
        None
    }
}

#[derive(Debug, Default)]
pub struct Sheet {
    slots: Vec<Option<Row>>,
    order: Vec<RowId>,
    removed: Vec<Row>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut sheet = Self::new();
        for row in rows {
            sheet.push(row);
        }
        sheet
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn alloc(&mut self, row: Row) -> RowId {
        self.slots.push(Some(row));
        self.slots.len() - 1
    }

    /// Append at the tail (streamed rows).
    pub fn push(&mut self, row: Row) -> RowPtr {
        let id = self.alloc(row);
        self.order.push(id);
        RowPtr {
            id,
            line: self.order.len() - 1,
        }
    }

    pub fn at(&self, line: usize) -> Option<RowPtr> {
        self.order.get(line).map(|&id| RowPtr { id, line })
    }

    pub fn front(&self) -> Option<RowPtr> {
        self.at(0)
    }

    pub fn back(&self) -> Option<RowPtr> {
        self.order.len().checked_sub(1).and_then(|line| self.at(line))
    }

    /// Current line of `p`, or `None` if its row was removed.
    pub fn locate(&self, p: RowPtr) -> Option<usize> {
        if self.order.get(p.line) == Some(&p.id) {
            return Some(p.line);
        }
        self.order.iter().position(|&id| id == p.id)
    }

    /// Re-validate `p`: same row at its current line, or the row now at its
    /// old line (clamped to the tail) when it was removed.
    pub fn resolve(&self, p: RowPtr) -> RowPtr {
        if let Some(line) = self.locate(p) {
            return RowPtr { id: p.id, line };
        }
        let line = p.line.min(self.len().saturating_sub(1));
        self.at(line).unwrap_or(p)
    }

    pub fn next(&self, p: RowPtr) -> Option<RowPtr> {
        let line = self.locate(p)?;
        self.at(line + 1)
    }

    pub fn prev(&self, p: RowPtr) -> Option<RowPtr> {
        let line = self.locate(p)?;
        line.checked_sub(1).and_then(|l| self.at(l))
    }

    /// Successor of `p`, pulling one more row from `feed` when `p` is the tail.
    pub fn next_or_fetch(&mut self, p: RowPtr, feed: &mut dyn RowFeed) -> Option<RowPtr> {
        if let Some(next) = self.next(p) {
            return Some(next);
        }
        let row = feed.pull()?;
        self.push(row);
        self.next(p)
    }

    pub fn get(&self, p: RowPtr) -> Option<&Row> {
        self.slots.get(p.id).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, p: RowPtr) -> Option<&mut Row> {
        self.slots.get_mut(p.id).and_then(|slot| slot.as_mut())
    }

    /// Insert `row` after `p`. A row that ends up in the middle of the
    /// document always gets a terminator.
    pub fn insert_after(&mut self, p: RowPtr, mut row: Row, default_term: Term) -> RowPtr {
        let line = self.locate(p).unwrap_or(self.len().saturating_sub(1));
        if let Some(anchor) = self.get_mut(p) {
            if anchor.term.is_eof() {
                anchor.term = default_term;
            }
        }
        let at = (line + 1).min(self.len());
        if at < self.len() && row.term.is_eof() {
            row.term = default_term;
        }
        let id = self.alloc(row);
        self.order.insert(at, id);
        RowPtr { id, line: at }
    }

    /// Insert `row` before `p`; the new row is never last.
    pub fn insert_before(&mut self, p: RowPtr, mut row: Row, default_term: Term) -> RowPtr {
        let line = self.locate(p).unwrap_or(0);
        if row.term.is_eof() {
            row.term = default_term;
        }
        let id = self.alloc(row);
        self.order.insert(line, id);
        RowPtr { id, line }
    }

    /// Unlink the row at `p`. It is kept in the removed list; a copy is returned.
    pub fn remove(&mut self, p: RowPtr) -> Option<Row> {
        let line = self.locate(p)?;
        self.order.remove(line);
        let row = self.slots.get_mut(p.id)?.take()?;
        self.removed.push(row.clone());
        Some(row)
    }

    pub fn removed(&self) -> &[Row] {
        &self.removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> + '_ {
        self.order.iter().filter_map(|&id| self.slots[id].as_ref())
    }

    pub fn ptrs(&self) -> impl Iterator<Item = RowPtr> + '_ {
        self.order
            .iter()
            .enumerate()
            .map(|(line, &id)| RowPtr { id, line })
    }

    /// Every live row, in arena order rather than document order.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut())
    }

    /// After a successful save the written bytes become every cell's original.
    pub fn mark_saved(&mut self) {
        for row in self.rows_mut() {
            row.rebaseline();
        }
    }
}

impl Index<RowPtr> for Sheet {
    type Output = Row;

    fn index(&self, p: RowPtr) -> &Row {
        match self.get(p) {
            Some(row) => row,
            None => panic!("row {} is no longer in the sheet", p.id),
        }
    }
}

impl IndexMut<RowPtr> for Sheet {
    fn index_mut(&mut self, p: RowPtr) -> &mut Row {
        match self.get_mut(p) {
            Some(row) => row,
            None => panic!("row {} is no longer in the sheet", p.id),
        }
    }
}
