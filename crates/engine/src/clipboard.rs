// Yank, kill and paste
// A yank captures an immutable snapshot; `paste` applies it in one of three
// modes after checking write protection.

use crate::cell::{Cell, Row};
use crate::mode::Mode;
use crate::protect::{ProtectError, Protection};
use crate::sheet::{Cursor, RowPtr, Sheet};

/// Snapshot captured at yank time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YankedUnit {
    Cell(Cell),
    Row(Row),
    /// One cell per materialized row; empty past a row's width
    Column(Vec<Cell>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    After,
    Before,
    Over,
}

pub fn yank_cell(sheet: &Sheet, at: RowPtr, col: usize) -> YankedUnit {
    let cell = sheet
        .get(at)
        .and_then(|row| row.cells.get(col))
        .cloned()
        .unwrap_or_default();
    YankedUnit::Cell(cell)
}

pub fn yank_row(sheet: &Sheet, at: RowPtr) -> YankedUnit {
    let row = sheet.get(at).cloned().unwrap_or(Row {
        cells: vec![Cell::default()],
        term: crate::mode::Term::Eof,
    });
    YankedUnit::Row(row)
}

pub fn yank_column(sheet: &Sheet, col: usize) -> YankedUnit {
    let cells = sheet
        .iter()
        .map(|row| row.cells.get(col).cloned().unwrap_or_default())
        .collect();
    YankedUnit::Column(cells)
}

/// Yank the cell, then delete it (the last cell of a row is emptied instead).
pub fn kill_cell(sheet: &mut Sheet, at: RowPtr, col: usize, mode: &Mode) -> YankedUnit {
    let unit = yank_cell(sheet, at, col);
    if let Some(row) = sheet.get_mut(at) {
        row.delete(col, mode);
    }
    unit
}

/// Yank the cursor row, then remove it.
///
/// The cursor moves to the successor, or to the predecessor at the tail, in
/// which case that row inherits the removed row's terminator. The sole row
/// of a document is emptied instead of removed.
pub fn kill_row(sheet: &mut Sheet, cursor: &mut Cursor, mode: &Mode) -> YankedUnit {
    let unit = yank_row(sheet, cursor.row);
    if sheet.len() <= 1 {
        if let Some(row) = sheet.get_mut(cursor.row) {
            row.cells = vec![Cell::from_text("", mode)];
        }
        cursor.col = 0;
        return unit;
    }
    let Some(line) = sheet.locate(cursor.row) else {
        return unit;
    };
    let top_line = sheet.locate(cursor.top).unwrap_or(0);
    let Some(removed) = sheet.remove(cursor.row) else {
        return unit;
    };
    if let Some(next) = sheet.at(line) {
        cursor.row = next;
    } else if let Some(prev) = sheet.back() {
        sheet[prev].term = removed.term;
        cursor.row = prev;
    }
    if let Some(top) = sheet.at(top_line.min(sheet.len() - 1)) {
        cursor.top = top;
    }
    unit
}

/// Yank column `col`, then delete it from every row wide enough to lose a cell.
pub fn kill_column(sheet: &mut Sheet, col: usize) -> YankedUnit {
    let unit = yank_column(sheet, col);
    for row in sheet.rows_mut() {
        if row.cells.len() > 1 && col < row.cells.len() {
            row.cells.remove(col);
        }
    }
    unit
}

/// Apply a snapshot at the cursor. Fails without touching the document when
/// the destination is write-protected.
pub fn paste(
    unit: &YankedUnit,
    how: PasteMode,
    sheet: &mut Sheet,
    cursor: &mut Cursor,
    mode: &mut Mode,
    guard: &Protection,
) -> Result<(), ProtectError> {
    cursor.row = sheet.resolve(cursor.row);
    cursor.top = sheet.resolve(cursor.top);
    let line = cursor.row.line;
    match unit {
        YankedUnit::Cell(cell) => {
            if how == PasteMode::Over {
                guard.check_row(line)?;
                sheet[cursor.row].set_source(cursor.col, cell.source(), mode);
            } else {
                guard.check_row_and_column(line)?;
                if how == PasteMode::After {
                    cursor.col += 1;
                }
                sheet[cursor.row].insert_cell(cursor.col, cell.clone());
            }
        }
        YankedUnit::Row(row) => {
            guard.check_row(line)?;
            match how {
                PasteMode::Over => {
                    let dst = &sheet[cursor.row];
                    if guard.fix_column && row.cells.len() > dst.cells.len() {
                        return Err(ProtectError::ColumnFixed);
                    }
                    let dst = &mut sheet[cursor.row];
                    for (i, cell) in row.cells.iter().enumerate() {
                        if i < dst.cells.len() {
                            dst.set_source(i, cell.source(), mode);
                        } else {
                            dst.cells.push(cell.clone());
                        }
                    }
                }
                PasteMode::After => {
                    sheet.insert_after(cursor.row, row.clone(), mode.default_term());
                }
                PasteMode::Before => {
                    let top_is_dst = cursor.top == cursor.row;
                    cursor.row = sheet.insert_before(cursor.row, row.clone(), mode.default_term());
                    if top_is_dst {
                        cursor.top = cursor.row;
                    }
                }
            }
        }
        YankedUnit::Column(cells) => {
            if how == PasteMode::Over {
                guard.check_row(line)?;
            } else {
                guard.check_row_and_column(line)?;
            }
            let pos = if how == PasteMode::After {
                cursor.col + 1
            } else {
                cursor.col
            };
            let ptrs: Vec<RowPtr> = sheet.ptrs().collect();
            for (i, p) in ptrs.into_iter().enumerate() {
                let source = cells.get(i).map(|c| c.source()).unwrap_or(&[]);
                if how == PasteMode::Over {
                    if guard.protect_header && guard.is_header(i) {
                        continue;
                    }
                    sheet[p].set_source(pos, source, mode);
                } else {
                    let cell = Cell::default().with_source(source, mode);
                    sheet[p].insert_cell(pos, cell);
                }
            }
        }
    }
    cursor.row = sheet.resolve(cursor.row);
    cursor.top = sheet.resolve(cursor.top);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Term;

    fn parse(lines: &[&str], mode: &mut Mode) -> Sheet {
        Sheet::from_rows(lines.iter().map(|line| {
            let cells = line
                .split(',')
                .map(|f| Cell::parsed(f.as_bytes().to_vec(), mode))
                .collect();
            Row { cells, term: Term::Lf }
        }))
    }

    fn dump(sheet: &Sheet) -> Vec<String> {
        sheet
            .iter()
            .map(|row| row.cells.iter().map(|c| c.text()).collect::<Vec<_>>().join(","))
            .collect()
    }

    fn cursor_at(sheet: &Sheet, line: usize, col: usize) -> Cursor {
        Cursor {
            top: sheet.front().unwrap(),
            row: sheet.at(line).unwrap(),
            col,
        }
    }

    #[test]
    fn test_cell_over_keeps_dimensions() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a,b", "c,d"], &mut mode);
        let unit = yank_cell(&sheet, sheet.front().unwrap(), 0);
        let mut cursor = cursor_at(&sheet, 1, 1);
        paste(&unit, PasteMode::Over, &mut sheet, &mut cursor, &mut mode, &Protection::default()).unwrap();
        assert_eq!(dump(&sheet), ["a,b", "c,a"]);
        assert!(sheet[cursor.row].cells[1].is_modified());
    }

    #[test]
    fn test_cell_after_moves_cursor_to_new_cell() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a,b,c"], &mut mode);
        let unit = yank_cell(&sheet, sheet.front().unwrap(), 0);
        let mut cursor = cursor_at(&sheet, 0, 1);
        paste(&unit, PasteMode::After, &mut sheet, &mut cursor, &mut mode, &Protection::default()).unwrap();
        assert_eq!(dump(&sheet), ["a,b,a,c"]);
        assert_eq!(cursor.col, 2);
    }

    #[test]
    fn test_fix_column_blocks_cell_insert_not_overwrite() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a,b"], &mut mode);
        let guard = Protection {
            fix_column: true,
            ..Default::default()
        };
        let unit = yank_cell(&sheet, sheet.front().unwrap(), 0);
        let mut cursor = cursor_at(&sheet, 0, 1);
        assert_eq!(
            paste(&unit, PasteMode::Before, &mut sheet, &mut cursor, &mut mode, &guard),
            Err(ProtectError::ColumnFixed)
        );
        assert_eq!(dump(&sheet), ["a,b"]);
        paste(&unit, PasteMode::Over, &mut sheet, &mut cursor, &mut mode, &guard).unwrap();
        assert_eq!(dump(&sheet), ["a,a"]);
    }

    #[test]
    fn test_row_before_at_top_moves_viewport() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a", "b"], &mut mode);
        let unit = yank_row(&sheet, sheet.at(1).unwrap());
        let mut cursor = cursor_at(&sheet, 0, 0);
        paste(&unit, PasteMode::Before, &mut sheet, &mut cursor, &mut mode, &Protection::default()).unwrap();
        assert_eq!(dump(&sheet), ["b", "a", "b"]);
        assert_eq!(cursor.row.line, 0);
        assert_eq!(cursor.top, cursor.row);
    }

    #[test]
    fn test_row_over_wider_under_fix_column() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a,b,c", "d"], &mut mode);
        let guard = Protection {
            fix_column: true,
            ..Default::default()
        };
        let unit = yank_row(&sheet, sheet.front().unwrap());
        let mut cursor = cursor_at(&sheet, 1, 0);
        assert_eq!(
            paste(&unit, PasteMode::Over, &mut sheet, &mut cursor, &mut mode, &guard),
            Err(ProtectError::ColumnFixed)
        );
        paste(&unit, PasteMode::Over, &mut sheet, &mut cursor, &mut mode, &Protection::default()).unwrap();
        assert_eq!(dump(&sheet), ["a,b,c", "a,b,c"]);
    }

    #[test]
    fn test_column_paste_after_and_over() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["h1,h2", "a,b", "c"], &mut mode);
        let unit = yank_column(&sheet, 1);
        let mut cursor = cursor_at(&sheet, 1, 0);
        paste(&unit, PasteMode::After, &mut sheet, &mut cursor, &mut mode, &Protection::default()).unwrap();
        assert_eq!(dump(&sheet), ["h1,h2,h2", "a,b,b", "c,"]);

        let guard = Protection {
            protect_header: true,
            header_lines: 1,
            ..Default::default()
        };
        let unit = yank_column(&sheet, 0);
        paste(&unit, PasteMode::Over, &mut sheet, &mut cursor, &mut mode, &guard).unwrap();
        assert_eq!(dump(&sheet), ["h1,h2,h2", "a,b,b", "c,"]);
        cursor.col = 2;
        paste(&unit, PasteMode::Over, &mut sheet, &mut cursor, &mut mode, &guard).unwrap();
        assert_eq!(dump(&sheet), ["h1,h2,h2", "a,b,a", "c,,c"]);
    }

    #[test]
    fn test_read_only_blocks_everything() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a"], &mut mode);
        let guard = Protection {
            read_only: true,
            ..Default::default()
        };
        let mut cursor = cursor_at(&sheet, 0, 0);
        for unit in [
            yank_cell(&sheet, cursor.row, 0),
            yank_row(&sheet, cursor.row),
            yank_column(&sheet, 0),
        ] {
            for how in [PasteMode::After, PasteMode::Before, PasteMode::Over] {
                assert_eq!(
                    paste(&unit, how, &mut sheet, &mut cursor, &mut mode, &guard),
                    Err(ProtectError::ReadOnly)
                );
            }
        }
        assert_eq!(dump(&sheet), ["a"]);
    }

    #[test]
    fn test_kill_row_at_tail_carries_terminator() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a", "b"], &mut mode);
        let back = sheet.back().unwrap();
        sheet[back].term = Term::Eof;
        let mut cursor = cursor_at(&sheet, 1, 0);
        cursor.top = cursor.row;
        let unit = kill_row(&mut sheet, &mut cursor, &mode);
        assert_eq!(dump(&sheet), ["a"]);
        assert_eq!(cursor.row.line, 0);
        assert_eq!(cursor.top, cursor.row);
        assert_eq!(sheet[cursor.row].term, Term::Eof);
        // kill yanks: the row can be pasted back
        paste(&unit, PasteMode::After, &mut sheet, &mut cursor, &mut mode, &Protection::default()).unwrap();
        assert_eq!(dump(&sheet), ["a", "b"]);
    }

    #[test]
    fn test_kill_sole_row_leaves_placeholder() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["x"], &mut mode);
        let mut cursor = cursor_at(&sheet, 0, 0);
        kill_row(&mut sheet, &mut cursor, &mode);
        assert_eq!(sheet.len(), 1);
        assert_eq!(dump(&sheet), [""]);
    }

    #[test]
    fn test_kill_column_keeps_one_cell_rows() {
        let mut mode = Mode::default();
        let mut sheet = parse(&["a,b", "c"], &mut mode);
        kill_column(&mut sheet, 0);
        assert_eq!(dump(&sheet), ["b", "c"]);
    }
}
