// Command dispatch
// One method per command id of keybindings.toml. Protection failures and
// search misses only leave a message; input and output failures propagate.

use tabula_engine::clipboard::{self, PasteMode};
use tabula_engine::protect::ProtectError;
use tabula_engine::search::{Direction, LastSearch, MatchKind};
use tabula_engine::{Cell, Row};

use super::editor::{Editor, EditError, Flow};
use super::keys::{self, Unit};

impl Editor<'_> {
    pub(super) fn dispatch(&mut self, command: &str) -> Result<Flow, EditError> {
        match command {
            "app.quit" => return self.quit(),
            "app.escape" => return self.escape(),
            "view.repaint" => self.renderer.clear_cache(),
            "file.encoding" => self.switch_encoding()?,
            "file.save" => {
                self.save()?;
                self.renderer.clear_cache();
            }
            "cursor.down" => self.move_down(),
            "cursor.up" => self.move_up(),
            "cursor.left" => self.cursor.col = self.cursor.col.saturating_sub(1),
            "cursor.right" => self.move_right(),
            "cursor.lineStart" => self.cursor.col = 0,
            "cursor.lineEnd" => self.cursor.col = self.row_len().saturating_sub(1),
            "cursor.pageDown" => self.page_down(),
            "cursor.pageUp" => self.page_up(),
            "cursor.first" => self.go_first(),
            "cursor.goPrefix" => {
                let key = self.prompt_key(r#"g- ["g": move to the beginning of file ]"#)?;
                if key == "g" {
                    self.go_first();
                }
            }
            "cursor.last" => {
                if let Some(last) = self.sheet.back() {
                    self.cursor.row = last;
                }
            }
            "search.forward" => self.search_prompt("/", Direction::Forward)?,
            "search.backward" => self.search_prompt("?", Direction::Backward)?,
            "search.next" => self.search_again(false),
            "search.previous" => self.search_again(true),
            "search.wordForward" => self.search_word(Direction::Forward),
            "search.wordBackward" => self.search_word(Direction::Backward),
            "row.insertBelow" => self.insert_row(true)?,
            "row.insertAbove" => self.insert_row(false)?,
            "row.delete" => self.delete_row(),
            "cell.insert" => self.insert_cell()?,
            "cell.append" => self.append_cell()?,
            "cell.replace" => self.replace_cell()?,
            "cell.clear" => self.edit_cell(|_| Some(String::new())),
            "cell.toggleQuote" => self.toggle_quote(),
            "cell.restore" => self.restore_cell(),
            "yank.prefix" => self.yank_prefix()?,
            "yank.row" => self.clipboard = Some(clipboard::yank_row(&self.sheet, self.cursor.row)),
            "delete.prefix" => self.delete_prefix()?,
            "paste.after" => self.paste(PasteMode::After),
            "paste.before" => self.paste(PasteMode::Before),
            "paste.over" => self.paste(PasteMode::Over),
            "column.widen" => {
                if self.widths.widen(self.cursor.col) {
                    self.renderer.clear_cache();
                }
            }
            "column.narrow" => {
                if self.widths.narrow(self.cursor.col) {
                    self.renderer.clear_cache();
                }
            }
            other => tracing::debug!("no handler for command {:?}", other),
        }
        Ok(Flow::Continue)
    }

    fn refuse(&mut self, e: ProtectError) {
        self.message = Some(e.to_string());
    }

    fn line(&self) -> usize {
        self.sheet.locate(self.cursor.row).unwrap_or(0)
    }

    fn row_len(&self) -> usize {
        self.sheet.get(self.cursor.row).map_or(0, |row| row.cells.len())
    }

    fn escape(&mut self) -> Result<Flow, EditError> {
        let key = self.prompt_key(r#"Esc- ["q": quit, "p": paste]"#)?;
        match key.as_str() {
            "q" => self.quit(),
            "p" => {
                self.paste(PasteMode::Over);
                Ok(Flow::Continue)
            }
            _ => Ok(Flow::Continue),
        }
    }

    /// Reinterpret every loaded cell with another legacy codepage,
    /// dropping text edits.
    fn switch_encoding(&mut self) -> Result<(), EditError> {
        let Some(label) = self.read_line("This will discard all unsaved changes. Switch encoding to:", "", &[])? else {
            return Ok(());
        };
        if let Err(e) = self.mode.set_legacy_encoding(&label) {
            self.message = Some(e);
            return Ok(());
        }
        self.mode.non_utf8 = true;
        for row in self.sheet.rows_mut() {
            row.restore_all(&mut self.mode);
        }
        self.dirty.reset_soft();
        self.renderer.clear_cache();
        tracing::info!(encoding = %self.mode.legacy().name(), "encoding switched");
        Ok(())
    }

    // ---- cursor ----

    fn move_down(&mut self) {
        let at = self.cursor.row;
        let (sheet, mut feed) = self.stream();
        if let Some(next) = sheet.next_or_fetch(at, &mut feed) {
            self.cursor.row = next;
        }
    }

    fn move_up(&mut self) {
        if let Some(prev) = self.sheet.prev(self.cursor.row) {
            self.cursor.row = prev;
        }
    }

    fn move_right(&mut self) {
        if self.cursor.col + 1 < self.row_len() {
            self.cursor.col += 1;
        }
    }

    fn page_down(&mut self) {
        for _ in 1..self.screen_height {
            let (row, top) = (self.cursor.row, self.cursor.top);
            let (sheet, mut feed) = self.stream();
            let Some(next) = sheet.next_or_fetch(row, &mut feed) else {
                break;
            };
            let top = sheet.next(top).unwrap_or(top);
            self.cursor.row = next;
            self.cursor.top = top;
        }
    }

    fn page_up(&mut self) {
        for _ in 1..self.screen_height {
            let Some(prev) = self.sheet.prev(self.cursor.row) else {
                break;
            };
            self.cursor.row = prev;
            if let Some(top) = self.sheet.prev(self.cursor.top) {
                self.cursor.top = top;
            }
        }
    }

    fn go_first(&mut self) {
        if let Some(first) = self.sheet.front() {
            self.cursor.row = first;
        }
    }

    // ---- search ----

    fn search_prompt(&mut self, prompt: &str, direction: Direction) -> Result<(), EditError> {
        let Some(term) = self.read_line(prompt, "", &[])? else {
            return Ok(());
        };
        if term.is_empty() {
            return Ok(());
        }
        self.last_search = Some(LastSearch {
            term,
            kind: MatchKind::Substring,
            direction,
        });
        self.search_again(false);
        Ok(())
    }

    fn search_again(&mut self, reversed: bool) {
        let Some(last) = &self.last_search else {
            return;
        };
        let found = if reversed {
            last.repeat_reversed(&self.sheet, self.cursor.row, self.cursor.col)
        } else {
            last.repeat(&self.sheet, self.cursor.row, self.cursor.col)
        };
        match found {
            Some((row, col)) => {
                self.cursor.row = row;
                self.cursor.col = col;
            }
            None => self.message = Some(format!("{}: not found", last.term)),
        }
    }

    /// `*` / `#`: the next cell equal to the one under the cursor
    fn search_word(&mut self, direction: Direction) {
        let Some(word) = self
            .sheet
            .get(self.cursor.row)
            .and_then(|row| row.cells.get(self.cursor.col))
            .map(|cell| cell.text().to_string())
        else {
            return;
        };
        self.last_search = Some(LastSearch {
            term: word,
            kind: MatchKind::Exact,
            direction,
        });
        self.search_again(false);
        self.renderer.clear_cache();
    }

    // ---- rows ----

    /// `o` / `O`: a new row below or above the cursor, then its first value
    fn insert_row(&mut self, below: bool) -> Result<(), EditError> {
        let line = self.line();
        let checked = if below {
            self.protection.check_row(line + 1)
        } else {
            self.protection.check_row(line)
        };
        if let Err(e) = checked {
            self.refuse(e);
            return Ok(());
        }

        let Some(current) = self.sheet.get(self.cursor.row) else {
            return Ok(());
        };
        let mut row = Row {
            cells: vec![Cell::from_text("", &self.mode)],
            term: current.term,
        };
        if self.protection.fix_column {
            row.cells.resize(current.cells.len().max(1), Cell::default());
        }
        let default_term = self.mode.default_term();
        if below {
            self.cursor.row = self.sheet.insert_after(self.cursor.row, row, default_term);
        } else {
            let top_was_cursor = self.cursor.top == self.cursor.row;
            self.cursor.row = self.sheet.insert_before(self.cursor.row, row, default_term);
            if top_was_cursor {
                self.cursor.top = self.cursor.row;
            }
        }
        self.cursor.top = self.sheet.resolve(self.cursor.top);
        self.cursor.col = self.cursor.col.min(self.row_len().saturating_sub(1));
        self.dirty.set_hard();

        if let Some(text) = self.read_cell("new line>", "")? {
            let col = self.cursor.col;
            self.sheet[self.cursor.row].replace(col, &text, &self.mode);
        }
        Ok(())
    }

    fn delete_row(&mut self) {
        if let Err(e) = self.protection.check_row(self.line()) {
            self.refuse(e);
            return;
        }
        self.clipboard = Some(clipboard::kill_row(&mut self.sheet, &mut self.cursor, &self.mode));
        self.dirty.set_hard();
    }

    // ---- cells ----

    /// A row holding nothing but one empty cell takes a typed value in place.
    fn is_vacant_row(&self) -> bool {
        self.sheet
            .get(self.cursor.row)
            .is_some_and(|row| matches!(row.cells.as_slice(), [only] if only.text().is_empty()))
    }

    /// `i`: a new cell before the cursor
    fn insert_cell(&mut self) -> Result<(), EditError> {
        if let Err(e) = self.protection.check_row_and_column(self.line()) {
            self.refuse(e);
            return Ok(());
        }
        let vacant = self.is_vacant_row();
        let Some(text) = self.read_cell("insert cell>", "")? else {
            return Ok(());
        };
        let col = self.cursor.col;
        let mode = &self.mode;
        let row = &mut self.sheet[self.cursor.row];
        if vacant {
            row.replace(0, &text, mode);
        } else {
            row.insert(col, &text, mode);
            // stay on the cell that was under the cursor
            self.cursor.col += 1;
        }
        self.dirty.set_hard();
        Ok(())
    }

    /// `a`: a new cell after the cursor
    fn append_cell(&mut self) -> Result<(), EditError> {
        let line = self.line();
        if self.is_vacant_row() {
            if let Err(e) = self.protection.check_row(line) {
                self.refuse(e);
                return Ok(());
            }
            if let Some(text) = self.read_cell("append cell>", "")? {
                self.sheet[self.cursor.row].replace(0, &text, &self.mode);
            }
            self.dirty.set_hard();
            return Ok(());
        }
        if let Err(e) = self.protection.check_row_and_column(line) {
            self.refuse(e);
            return Ok(());
        }

        self.cursor.col += 1;
        let col = self.cursor.col;
        self.sheet[self.cursor.row].insert(col, "", &self.mode);
        match self.read_cell("append cell>", "")? {
            Some(text) => self.sheet[self.cursor.row].replace(col, &text, &self.mode),
            None => {
                self.sheet[self.cursor.row].delete(col, &self.mode);
                self.cursor.col -= 1;
            }
        }
        self.dirty.set_hard();
        Ok(())
    }

    /// `r`: edit the cursor cell, starting from its text
    fn replace_cell(&mut self) -> Result<(), EditError> {
        if let Err(e) = self.protection.check_row(self.line()) {
            self.refuse(e);
            return Ok(());
        }
        let current = self
            .sheet
            .get(self.cursor.row)
            .and_then(|row| row.cells.get(self.cursor.col))
            .map(|cell| cell.text().to_string())
            .unwrap_or_default();
        let Some(text) = self.read_cell("replace cell>", &current)? else {
            return Ok(());
        };
        self.edit_cell(|_| Some(text));
        Ok(())
    }

    /// Store a new text in the cursor cell, keeping its quoting, and
    /// account for the change.
    fn edit_cell(&mut self, new_text: impl FnOnce(&Cell) -> Option<String>) {
        if let Err(e) = self.protection.check_row(self.line()) {
            self.refuse(e);
            return;
        }
        let col = self.cursor.col;
        let mode = &self.mode;
        let Some(row) = self.sheet.get_mut(self.cursor.row) else {
            return;
        };
        let Some(cell) = row.cells.get(col) else {
            return;
        };
        let Some(text) = new_text(cell) else {
            return;
        };
        let before = cell.is_modified();
        let was_quoted = cell.is_quoted();
        row.replace(col, &text, mode);
        if was_quoted && !row.cells[col].is_quoted() {
            row.cells[col] = row.cells[col].quoted(mode);
        }
        self.dirty.update_soft(before, row.cells[col].is_modified());
    }

    fn toggle_quote(&mut self) {
        if let Err(e) = self.protection.check_row(self.line()) {
            self.refuse(e);
            return;
        }
        let col = self.cursor.col;
        let mode = &self.mode;
        let Some(row) = self.sheet.get_mut(self.cursor.row) else {
            return;
        };
        let Some(cell) = row.cells.get(col) else {
            return;
        };
        let before = cell.is_modified();
        if cell.is_quoted() {
            // Quotes stay when the text needs them
            let text = cell.text().to_string();
            row.replace(col, &text, mode);
        } else {
            row.cells[col] = cell.quoted(mode);
        }
        self.dirty.update_soft(before, row.cells[col].is_modified());
    }

    /// `u`: back to the loaded (or last saved) value
    fn restore_cell(&mut self) {
        let col = self.cursor.col;
        let Some(cell) = self
            .sheet
            .get_mut(self.cursor.row)
            .and_then(|row| row.cells.get_mut(col))
        else {
            return;
        };
        let before = cell.is_modified();
        cell.restore(&mut self.mode);
        self.dirty.update_soft(before, false);
    }

    // ---- clipboard ----

    fn ask_unit(&mut self, question: &str, row_key: &str) -> Result<Option<Unit>, EditError> {
        let key = self.prompt_key(question)?;
        Ok(keys::unit_of(&key, row_key))
    }

    fn yank_prefix(&mut self) -> Result<(), EditError> {
        let unit = self.ask_unit(
            r#"Yank ? ["l"/"v"/SPACE/TAB/C-F/→: cell, "y"/"r": row, "|"/"c": column]"#,
            "y",
        )?;
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.clipboard = match unit {
            Some(Unit::Cell) => Some(clipboard::yank_cell(&self.sheet, row, col)),
            Some(Unit::Row) => Some(clipboard::yank_row(&self.sheet, row)),
            Some(Unit::Column) => Some(clipboard::yank_column(&self.sheet, col)),
            None => return Ok(()),
        };
        Ok(())
    }

    fn delete_prefix(&mut self) -> Result<(), EditError> {
        let line = self.line();
        if let Err(e) = self.protection.check_row(line) {
            self.refuse(e);
            return Ok(());
        }
        let question = if self.protection.fix_column {
            r#"Delete ? ["d"/"r": row]"#
        } else {
            r#"Delete ? ["l"/"v"/SPACE/TAB/C-F/→: cell, "d"/"r": row, "|"/"c": column]"#
        };
        let Some(unit) = self.ask_unit(question, "d")? else {
            return Ok(());
        };
        if unit != Unit::Row {
            if let Err(e) = self.protection.check_row_and_column(line) {
                self.refuse(e);
                return Ok(());
            }
        }
        let (row, col) = (self.cursor.row, self.cursor.col);
        self.clipboard = Some(match unit {
            Unit::Cell => clipboard::kill_cell(&mut self.sheet, row, col, &self.mode),
            Unit::Row => clipboard::kill_row(&mut self.sheet, &mut self.cursor, &self.mode),
            Unit::Column => clipboard::kill_column(&mut self.sheet, col),
        });
        self.dirty.set_hard();
        Ok(())
    }

    fn paste(&mut self, how: PasteMode) {
        let Some(unit) = &self.clipboard else {
            return;
        };
        match clipboard::paste(
            unit,
            how,
            &mut self.sheet,
            &mut self.cursor,
            &mut self.mode,
            &self.protection,
        ) {
            Ok(()) => self.dirty.set_hard(),
            Err(e) => self.message = Some(e.to_string()),
        }
    }
}
