// Editing session
//
// Owns the document, the cursor and the viewport. Each turn of the main loop
// clamps the viewport to the cursor, draws the frame, waits for a key while
// streamed rows keep arriving, and runs the bound command (commands.rs).

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, Show};
use crossterm::QueueableCommand;

use tabula_config::keybindings::KeybindingManager;
use tabula_config::theme::Theme;
use tabula_engine::clipboard::YankedUnit;
use tabula_engine::column_width::ColumnWidths;
use tabula_engine::dirty::DirtyState;
use tabula_engine::protect::Protection;
use tabula_engine::search::{column_candidates, LastSearch};
use tabula_engine::{Cell, Cursor, Mode, Row, RowFeed, Sheet, Term};
use tabula_io::{RecordReader, SaveError, SaveSession, Target};

use super::coordinator::{Coordinator, Feed};
use super::input::{self, InputError, SharedInput};
use super::render::{status_line, Frame, Renderer, Status};
use crate::util::cut_str_in_width;

/// Status refresh period while rows stream in and no key arrives
const REFRESH: Duration = Duration::from_millis(250);

/// A cell value about to be stored
#[derive(Debug, Clone, Copy)]
pub struct CellEdit<'a> {
    pub line: usize,
    pub col: usize,
    pub text: &'a str,
}

/// Accepts (possibly rewriting) or rejects a typed cell value.
pub type Validator = Box<dyn FnMut(&CellEdit<'_>) -> Result<String, String> + Send>;

pub struct EditorConfig {
    pub mode: Mode,
    pub widths: ColumnWidths,
    pub protection: Protection,
    /// Lines printed once above the grid
    pub titles: Vec<String>,
    /// Drawn between cells
    pub separator: String,
    pub theme: Theme,
    pub keys: KeybindingManager,
    /// Default answer to "write to>"; standard output when `None`
    pub save_path: Option<PathBuf>,
    /// How long one pull from the row stream may wait
    pub poll_interval: Duration,
    /// Shown in the first frame
    pub message: Option<String>,
    pub validator: Option<Validator>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            widths: ColumnWidths::default(),
            protection: Protection {
                header_lines: 1,
                ..Protection::default()
            },
            titles: Vec::new(),
            separator: String::new(),
            theme: Theme::mono(),
            keys: KeybindingManager::default(),
            save_path: None,
            poll_interval: Duration::from_millis(100),
            message: None,
            validator: None,
        }
    }
}

/// How the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was left unsaved.
    Clean,
    /// Saved on the way out.
    Saved,
    /// Unsaved changes were thrown away.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    Input(InputError),
    Io(String),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(e) => write!(f, "{e}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EditError {}

impl From<InputError> for EditError {
    fn from(e: InputError) -> Self {
        Self::Input(e)
    }
}

impl From<io::Error> for EditError {
    fn from(e: io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Prepare a streamed row for the foreground document.
///
/// The fetcher decodes with its own copy of the mode; once either side has
/// fallen back to the legacy codepage, rows are decoded again with the
/// foreground mode so `L` also applies to rows that arrive later.
pub(super) fn admit(mode: &mut Mode, message: &mut Option<String>, feed: Feed) -> Option<Row> {
    match feed {
        Feed::Row { mut row, non_utf8 } => {
            mode.observe_term(row.term);
            if non_utf8 {
                mode.non_utf8 = true;
            }
            if mode.non_utf8 {
                row.redecode(mode);
            }
            Some(row)
        }
        Feed::Failed(msg) => {
            tracing::warn!("reading stopped: {}", msg);
            *message = Some(msg);
            None
        }
        Feed::End => None,
    }
}

/// Time-boxed pulls for `Sheet::next_or_fetch`
pub(super) struct StreamFeed<'a> {
    pub coordinator: &'a mut Coordinator,
    pub mode: &'a mut Mode,
    pub message: &'a mut Option<String>,
    pub wait: Duration,
}

impl RowFeed for StreamFeed<'_> {
    fn pull(&mut self) -> Option<Row> {
        let feed = self.coordinator.try_fetch(self.wait)?;
        admit(self.mode, self.message, feed)
    }
}

fn status_text(sheet: &Sheet, mode: &mut Mode, dirty: &DirtyState, cursor: &Cursor, width: usize) -> String {
    let row = sheet.get(cursor.row);
    let term = row.map_or(Term::Eof, |r| r.term);
    let cell = row.and_then(|r| r.cells.get(cursor.col));
    let last_cell = row.map_or(true, |r| cursor.col + 1 >= r.cells.len());
    let status = Status {
        dirty: dirty.is_dirty(),
        mode,
        term,
        col: cursor.col,
        line: sheet.locate(cursor.row).unwrap_or(0),
        total: sheet.len(),
        cell,
        last_cell,
    };
    status_line(status, width.saturating_sub(1))
}

pub(super) enum Flow {
    Continue,
    Quit(Outcome),
}

pub struct Editor<'o> {
    pub(super) sheet: Sheet,
    pub(super) mode: Mode,
    pub(super) dirty: DirtyState,
    pub(super) cursor: Cursor,
    /// First visible column
    pub(super) left: usize,
    pub(super) widths: ColumnWidths,
    pub(super) protection: Protection,
    pub(super) clipboard: Option<YankedUnit>,
    pub(super) last_search: Option<LastSearch>,
    pub(super) message: Option<String>,
    showing_message: bool,
    keys: KeybindingManager,
    titles: Vec<String>,
    save_path: Option<PathBuf>,
    saves: SaveSession,
    poll_interval: Duration,
    validator: Option<Validator>,
    pub(super) renderer: Renderer,
    pub(super) coordinator: Coordinator,
    input: SharedInput,
    pub(super) out: &'o mut dyn Write,
    width: usize,
    pub(super) screen_height: usize,
}

/// Run an editing session over `source` until the user quits.
///
/// The first row is read before the session starts; the rest stream in on a
/// background thread. Without a source the session starts from one empty row.
pub fn edit(
    config: EditorConfig,
    source: Option<RecordReader>,
    input: SharedInput,
    out: &mut dyn Write,
) -> Result<Outcome, EditError> {
    let EditorConfig {
        mut mode,
        widths,
        protection,
        titles,
        separator,
        theme,
        keys,
        save_path,
        poll_interval,
        mut message,
        validator,
    } = config;

    let mut sheet = Sheet::new();
    let coordinator = match source {
        Some(mut reader) => {
            match reader.next_row(&mut mode) {
                Ok(Some(row)) => {
                    mode.observe_term(row.term);
                    sheet.push(row);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("reading stopped: {}", e);
                    message = Some(e.to_string());
                }
            }
            if reader.is_finished() {
                Coordinator::keys_only(input.clone())
            } else {
                let mut fetch_mode = mode.clone();
                Coordinator::spawn(input.clone(), move || match reader.next_row(&mut fetch_mode) {
                    Ok(Some(row)) => Feed::Row {
                        row,
                        non_utf8: fetch_mode.non_utf8,
                    },
                    Ok(None) => Feed::End,
                    Err(e) => Feed::Failed(e.to_string()),
                })
            }
        }
        None => Coordinator::keys_only(input.clone()),
    };
    if sheet.is_empty() {
        sheet.push(Row {
            cells: vec![Cell::default()],
            term: Term::Eof,
        });
    }
    let Some(first) = sheet.front() else {
        return Err(EditError::Io("empty document".to_string()));
    };
    tracing::info!(
        delimiter = %mode.delimiter_tag(),
        encoding = %mode.encoding_tag().unwrap_or_else(|| "UTF-8".to_string()),
        "session started"
    );

    let mut editor = Editor {
        sheet,
        mode,
        dirty: DirtyState::default(),
        cursor: Cursor {
            top: first,
            row: first,
            col: 0,
        },
        left: 0,
        widths,
        protection,
        clipboard: None,
        last_search: None,
        message,
        showing_message: false,
        keys,
        titles,
        save_path,
        saves: SaveSession::new(),
        poll_interval,
        validator,
        renderer: Renderer::new(theme, separator),
        coordinator,
        input,
        out,
        width: 0,
        screen_height: 0,
    };
    editor.run()
}

impl Editor<'_> {
    fn run(&mut self) -> Result<Outcome, EditError> {
        self.measure()?;
        for title in &self.titles {
            let (line, _) = cut_str_in_width(title, self.width.saturating_sub(1));
            write!(self.out, "{}\r\n", line)?;
        }
        loop {
            self.measure()?;
            self.clamp();
            self.fill_screen();
            self.draw()?;
            let key = self.next_key()?;
            let command = self.keys.get_command(&key).map(str::to_string);
            if let Some(command) = command {
                if let Flow::Quit(outcome) = self.dispatch(&command)? {
                    self.out.write_all(b"\r\n")?;
                    self.out.flush()?;
                    tracing::info!(?outcome, rows = self.sheet.len(), "session ended");
                    return Ok(outcome);
                }
            }
            self.clamp();
            self.renderer.rewind(&mut *self.out)?;
        }
    }

    /// Read the screen size; a change drops the render caches.
    fn measure(&mut self) -> Result<(), EditError> {
        let (width, height) = input::lock(&self.input)?.size()?;
        if self.renderer.resize(width, height) {
            self.out.queue(Hide)?;
        }
        self.width = width;
        self.screen_height = height
            .saturating_sub(self.titles.len())
            .saturating_sub(self.protection.header_lines)
            .max(2);
        Ok(())
    }

    pub(super) fn body_height(&self) -> usize {
        self.screen_height.saturating_sub(1).max(1)
    }

    fn body_start(&self) -> usize {
        let top = self.sheet.locate(self.cursor.top).unwrap_or(0);
        top.max(self.protection.header_lines)
    }

    /// Keep the cursor inside its row and the viewport around the cursor.
    pub(super) fn clamp(&mut self) {
        self.cursor.row = self.sheet.resolve(self.cursor.row);
        self.cursor.top = self.sheet.resolve(self.cursor.top);
        if let Some(row) = self.sheet.get(self.cursor.row) {
            self.cursor.col = self.cursor.col.min(row.cells.len().saturating_sub(1));
        }

        let line = self.cursor.row.line;
        if line < self.cursor.top.line {
            self.cursor.top = self.cursor.row;
        } else {
            let body_height = self.body_height();
            if line >= self.body_start() + body_height {
                if let Some(top) = self.sheet.at(line + 1 - body_height) {
                    self.cursor.top = top;
                }
            }
        }

        let col = self.cursor.col;
        if col < self.left {
            self.left = col;
        } else {
            let room = self.width.saturating_sub(1);
            while self.left < col && self.widths.sum(self.left, col + 1) > room {
                self.left += 1;
            }
        }
    }

    /// Pull streamed rows until the body is full or none arrives in time.
    fn fill_screen(&mut self) {
        let wanted = self.body_start() + self.body_height();
        while self.sheet.len() < wanted && !self.coordinator.is_exhausted() {
            let Some(feed) = self.coordinator.try_fetch(self.poll_interval) else {
                break;
            };
            if let Some(row) = admit(&mut self.mode, &mut self.message, feed) {
                self.sheet.push(row);
            }
        }
    }

    fn draw(&mut self) -> Result<(), EditError> {
        let header_lines = self.protection.header_lines;
        let start = self.body_start();
        let body_height = self.body_height();
        let line = self.cursor.row.line;
        let frame = Frame {
            header: (0..header_lines)
                .filter_map(|l| self.sheet.at(l))
                .filter_map(|p| self.sheet.get(p))
                .collect(),
            body: (start..start + body_height)
                .filter_map(|l| self.sheet.at(l))
                .filter_map(|p| self.sheet.get(p))
                .collect(),
            header_lines,
            header_cursor: (line < header_lines).then_some(line),
            body_cursor: line.checked_sub(start).filter(|&i| i < body_height),
            col: self.cursor.col,
            left: self.left,
            width: self.width.saturating_sub(1),
            body_height,
        };
        self.renderer.draw(&frame, &self.widths, &mut *self.out)?;

        let message = self.message.take();
        self.showing_message = message.is_some();
        let text = match message {
            Some(message) => message,
            None => status_text(&self.sheet, &mut self.mode, &self.dirty, &self.cursor, self.width),
        };
        self.renderer.status(&text, self.width, &mut *self.out)?;
        Ok(())
    }

    /// Wait for a key. Rows arriving meanwhile are ingested, and the status
    /// line is refreshed now and then unless a message is on screen.
    fn next_key(&mut self) -> Result<String, EditError> {
        let showing_message = self.showing_message;
        let width = self.width;
        let mut last_refresh = Instant::now();
        let mut failure = None;
        let Self {
            coordinator,
            sheet,
            mode,
            dirty,
            cursor,
            message,
            renderer,
            out,
            ..
        } = self;
        let key = coordinator.get_or(|feed| {
            let last = feed.is_last();
            if let Some(row) = admit(mode, message, feed) {
                sheet.push(row);
            }
            if showing_message || failure.is_some() {
                return;
            }
            if last || last_refresh.elapsed() >= REFRESH {
                last_refresh = Instant::now();
                let text = match message.clone() {
                    Some(text) => text,
                    None => status_text(sheet, mode, dirty, cursor, width),
                };
                if let Err(e) = renderer.status(&text, width, &mut **out) {
                    failure = Some(e);
                }
            }
        });
        if let Some(e) = failure {
            return Err(e.into());
        }
        Ok(key?)
    }

    /// Ask a one-key question in the status line.
    pub(super) fn prompt_key(&mut self, question: &str) -> Result<String, EditError> {
        self.renderer.prompt_line(question, &mut *self.out)?;
        self.out.queue(Show)?;
        self.out.flush()?;
        let Self {
            coordinator,
            sheet,
            mode,
            message,
            ..
        } = self;
        let key = coordinator.get_or(|feed| {
            if let Some(row) = admit(mode, message, feed) {
                sheet.push(row);
            }
        });
        self.out.queue(Hide)?;
        Ok(key?)
    }

    /// One line of text; `None` when the user canceled.
    pub(super) fn read_line(&mut self, prompt: &str, default: &str, candidates: &[String]) -> Result<Option<String>, EditError> {
        let answer = input::lock(&self.input)?.read_line(&mut *self.out, prompt, default, candidates);
        canceled_to_none(answer)
    }

    /// A cell value typed at the cursor, offered the column's values for
    /// completion and checked by the validator. A rejected value is asked
    /// for again with the reason in the prompt.
    pub(super) fn read_cell(&mut self, prompt: &str, default: &str) -> Result<Option<String>, EditError> {
        let candidates = column_candidates(&self.sheet, self.cursor.row, self.cursor.col);
        let line = self.sheet.locate(self.cursor.row).unwrap_or(0);
        let col = self.cursor.col;
        let mut prompt = prompt.to_string();
        let mut default = default.to_string();
        loop {
            let Some(text) = self.read_line(&prompt, &default, &candidates)? else {
                return Ok(None);
            };
            let Some(validator) = self.validator.as_mut() else {
                return Ok(Some(text));
            };
            match validator(&CellEdit {
                line,
                col,
                text: &text,
            }) {
                Ok(accepted) => return Ok(Some(accepted)),
                Err(reason) => {
                    prompt = format!("{}: Re-enter>", reason);
                    default = text;
                }
            }
        }
    }

    fn default_save_name(&self) -> String {
        match &self.save_path {
            Some(path) => std::path::absolute(path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string(),
            None => "-".to_string(),
        }
    }

    /// Read the rest of the stream so a save is never truncated.
    fn drain(&mut self) -> Result<(), EditError> {
        if self.coordinator.is_exhausted() {
            return Ok(());
        }
        self.renderer
            .status("w: Wait a moment for reading all data...", self.width, &mut *self.out)?;
        while let Some(feed) = self.coordinator.fetch() {
            if let Some(row) = admit(&mut self.mode, &mut self.message, feed) {
                self.sheet.push(row);
            }
        }
        tracing::info!(rows = self.sheet.len(), "stream drained for saving");
        Ok(())
    }

    /// The save protocol. `Ok(true)` when the document was written.
    pub(super) fn save(&mut self) -> Result<bool, EditError> {
        let default = self.default_save_name();
        let answer = input::lock(&self.input)?.prompt_filename(&mut *self.out, "write to>", &default);
        let Some(name) = canceled_to_none(answer)? else {
            return Ok(false);
        };
        self.drain()?;

        let target = Target::parse(&name);
        let Self {
            saves,
            sheet,
            mode,
            coordinator,
            renderer,
            out,
            ..
        } = self;
        let result = saves.save(&target, sheet.iter(), mode, |question| {
            if renderer.prompt_line(question, &mut **out).is_err() {
                return false;
            }
            matches!(coordinator.get_or(|_| {}).as_deref(), Ok("y"))
        });
        match result {
            Ok(msg) => {
                self.dirty.reset();
                self.sheet.mark_saved();
                tracing::info!(path = %target, "saved");
                self.message = Some(msg);
                Ok(true)
            }
            Err(SaveError::Canceled) => Ok(false),
            Err(e) => {
                tracing::warn!(path = %target, "save failed: {}", e);
                self.message = Some(e.to_string());
                Ok(false)
            }
        }
    }

    /// Leave, offering to save unsaved changes first.
    pub(super) fn quit(&mut self) -> Result<Flow, EditError> {
        if !self.dirty.is_dirty() || self.protection.read_only {
            return Ok(Flow::Quit(Outcome::Clean));
        }
        let key = self.prompt_key(r#"Quit: Save changes ? ["y": save, "n": quit without saving, other: cancel]"#)?;
        match key.as_str() {
            "y" | "Y" => {
                if !self.save()? {
                    return Ok(Flow::Continue);
                }
                if let Some(msg) = self.message.take() {
                    self.renderer.status(&msg, self.width, &mut *self.out)?;
                }
                Ok(Flow::Quit(Outcome::Saved))
            }
            "n" | "N" => Ok(Flow::Quit(Outcome::Discarded)),
            _ => Ok(Flow::Continue),
        }
    }

    /// Feed for `Sheet::next_or_fetch`, plus the sheet it extends.
    pub(super) fn stream(&mut self) -> (&mut Sheet, StreamFeed<'_>) {
        let feed = StreamFeed {
            coordinator: &mut self.coordinator,
            mode: &mut self.mode,
            message: &mut self.message,
            wait: self.poll_interval,
        };
        (&mut self.sheet, feed)
    }
}

fn canceled_to_none(answer: Result<String, InputError>) -> Result<Option<String>, EditError> {
    match answer {
        Ok(text) => Ok(Some(text)),
        Err(InputError::Canceled) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
