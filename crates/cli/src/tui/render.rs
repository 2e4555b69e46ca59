// Differential renderer
//
// The grid is drawn in place below the titles. Every frame starts where the
// previous one started (see `rewind`), and a screen line is only rewritten
// when its styled text differs from what was drawn there last time.

use std::collections::HashMap;
use std::io::{self, Write};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::style::{Attribute, Color, SetAttribute, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command;

use tabula_config::theme::{Paint, RowStyle, TermColor, Theme};
use tabula_engine::column_width::ColumnWidths;
use tabula_engine::{Bom, Cell, Mode, Row, Term};

use crate::util::{control_pictures, display_width, truncate_display};

const ELLIPSIS: &str = "\u{2026}";
/// Drawn in the status line after the last cell of an unterminated row
const EOF_MARK: &str = "\u{2592}";

fn put(buf: &mut String, command: impl Command) {
    // Formatting into a String cannot fail
    let _ = command.write_ansi(buf);
}

fn color(c: TermColor) -> Color {
    match c {
        TermColor::Reset => Color::Reset,
        TermColor::Black => Color::Black,
        TermColor::Cyan => Color::DarkCyan,
        TermColor::Yellow => Color::DarkYellow,
        TermColor::Silver => Color::Grey,
        TermColor::White => Color::White,
        TermColor::Indexed(n) => Color::AnsiValue(n),
    }
}

pub(crate) fn paint_on(buf: &mut String, paint: Paint) {
    put(buf, SetForegroundColor(color(paint.fg)));
    put(buf, SetBackgroundColor(color(paint.bg)));
    put(
        buf,
        SetAttribute(if paint.bold {
            Attribute::Bold
        } else {
            Attribute::NormalIntensity
        }),
    );
    put(
        buf,
        SetAttribute(if paint.reverse {
            Attribute::Reverse
        } else {
            Attribute::NoReverse
        }),
    );
}

pub(crate) fn paint_off(buf: &mut String) {
    put(buf, SetAttribute(Attribute::Reset));
}

fn clear_line(buf: &mut String) {
    put(buf, Clear(ClearType::UntilNewLine));
}

/// How one block of lines (header or body) is drawn
struct PageStyle<'a> {
    widths: &'a ColumnWidths,
    left: usize,
    screen_width: usize,
    screen_height: usize,
    rows: RowStyle,
    separator: &'a str,
    separator_paint: Paint,
}

impl PageStyle<'_> {
    fn cell_width(&self, n: usize) -> usize {
        self.widths.get(self.left + n)
    }

    /// `cells` starts at the first visible column; `cursor_pos` is relative to it.
    fn draw_line(&self, cells: &[Cell], cursor_pos: Option<usize>, odd: bool, buf: &mut String) {
        let row_paint = if odd { self.rows.odd } else { self.rows.even };
        if cells.is_empty() {
            paint_on(buf, row_paint);
            clear_line(buf);
            paint_off(buf);
            return;
        }
        paint_on(buf, row_paint);
        clear_line(buf);

        let separator_width = display_width(self.separator);
        let mut screen_width = self.screen_width;
        let mut rest = cells;
        let mut i = 0;
        while let Some((cell, tail)) = rest.split_first() {
            rest = tail;
            let mut next_i = i + 1;

            // Empty cells lend their room to the cell on their left
            let mut cw = self.cell_width(i);
            while let Some((next, tail)) = rest.split_first() {
                if !next.text().is_empty() || cursor_pos == Some(next_i) {
                    break;
                }
                cw += self.cell_width(next_i);
                rest = tail;
                next_i += 1;
            }
            if cw > screen_width || rest.is_empty() {
                cw = screen_width;
            }

            if i > 0 && separator_width > 0 {
                paint_on(buf, self.separator_paint);
                buf.push_str(self.separator);
                paint_on(buf, row_paint);
            }
            let text = control_pictures(cell.text());
            let text = truncate_display(&text, cw.saturating_sub(separator_width), ELLIPSIS);
            let at_cursor = cursor_pos == Some(i);
            if at_cursor {
                paint_on(buf, self.rows.cursor);
            }
            if cell.is_modified() {
                put(buf, SetAttribute(Attribute::Underlined));
                buf.push_str(&text);
                put(buf, SetAttribute(Attribute::NoUnderline));
            } else {
                buf.push_str(&text);
            }
            if at_cursor {
                clear_line(buf);
                paint_on(buf, row_paint);
            }

            screen_width -= cw;
            if screen_width == 0 {
                break;
            }
            let column = self.widths.sum(self.left, self.left + next_i);
            put(buf, MoveToColumn(column.min(u16::MAX as usize) as u16));
            if at_cursor {
                clear_line(buf);
            }
            i = next_i;
        }
        paint_off(buf);
    }

    /// Draw up to `screen_height` rows, writing only lines that differ from
    /// `cache`. Returns the number of line feeds written.
    fn draw_page(
        &self,
        rows: &[&Row],
        cursor: Option<usize>,
        col: usize,
        cache: &mut HashMap<usize, String>,
        out: &mut dyn Write,
    ) -> io::Result<usize> {
        let mut line_feeds = 0;
        let mut drawn = 0;
        for (count, row) in rows.iter().take(self.screen_height).enumerate() {
            if count > 0 {
                out.write_all(b"\r\n")?;
                line_feeds += 1;
            }
            let cursor_pos = if cursor == Some(count) {
                col.checked_sub(self.left)
            } else {
                None
            };
            let cells = row.cells.get(self.left..).unwrap_or(&[]);
            let mut line = String::new();
            self.draw_line(cells, cursor_pos, count % 2 == 1, &mut line);
            if cache.get(&count) != Some(&line) {
                out.write_all(line.as_bytes())?;
                cache.insert(count, line);
            }
            drawn = count + 1;
        }
        // Lines past the end were overwritten by the status line
        cache.retain(|&line, _| line < drawn);
        out.write_all(b"\r\n")?;
        Ok(line_feeds + 1)
    }
}

/// What one frame shows
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    /// The fixed header rows
    pub header: Vec<&'a Row>,
    /// Rows from the viewport top down
    pub body: Vec<&'a Row>,
    /// Configured header height; an odd count flips the body striping
    pub header_lines: usize,
    /// Index of the cursor row within `header` or `body`
    pub header_cursor: Option<usize>,
    pub body_cursor: Option<usize>,
    pub col: usize,
    /// First visible column
    pub left: usize,
    /// Drawable columns
    pub width: usize,
    pub body_height: usize,
}

pub struct Renderer {
    theme: Theme,
    separator: String,
    head_cache: HashMap<usize, String>,
    body_cache: HashMap<usize, String>,
    line_feeds: usize,
    last_size: Option<(usize, usize)>,
}

impl Renderer {
    pub fn new(theme: Theme, separator: impl Into<String>) -> Self {
        Self {
            theme,
            separator: separator.into(),
            head_cache: HashMap::new(),
            body_cache: HashMap::new(),
            line_feeds: 0,
            last_size: None,
        }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Forget what is on screen so the next frame is drawn in full.
    pub fn clear_cache(&mut self) {
        self.head_cache.clear();
        self.body_cache.clear();
    }

    /// Record the screen size; a change drops the caches. Returns whether it changed.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if self.last_size == Some((width, height)) {
            return false;
        }
        self.last_size = Some((width, height));
        self.clear_cache();
        true
    }

    /// Draw the header and body; the output position ends at the start of
    /// the status line.
    pub fn draw(&mut self, frame: &Frame<'_>, widths: &ColumnWidths, out: &mut dyn Write) -> io::Result<()> {
        let body_rows = if frame.header_lines % 2 == 1 {
            self.theme.body.swapped()
        } else {
            self.theme.body
        };
        let mut line_feeds = 0;
        if frame.header_lines > 0 {
            let style = PageStyle {
                widths,
                left: frame.left,
                screen_width: frame.width,
                screen_height: frame.header_lines,
                rows: self.theme.header,
                separator: &self.separator,
                separator_paint: self.theme.separator,
            };
            line_feeds += style.draw_page(&frame.header, frame.header_cursor, frame.col, &mut self.head_cache, out)?;
        }
        let style = PageStyle {
            widths,
            left: frame.left,
            screen_width: frame.width,
            screen_height: frame.body_height,
            rows: body_rows,
            separator: &self.separator,
            separator_paint: self.theme.separator,
        };
        line_feeds += style.draw_page(&frame.body, frame.body_cursor, frame.col, &mut self.body_cache, out)?;
        self.line_feeds = line_feeds;
        Ok(())
    }

    /// Move back to where the last frame started.
    pub fn rewind(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut buf = String::from("\r");
        if self.line_feeds > 0 {
            put(&mut buf, MoveUp(self.line_feeds.min(u16::MAX as usize) as u16));
        }
        out.write_all(buf.as_bytes())
    }

    /// The status (or message) line, cut to `width`, clearing everything below.
    pub fn status(&self, text: &str, width: usize, out: &mut dyn Write) -> io::Result<()> {
        let mut buf = String::from("\r");
        paint_on(&mut buf, self.theme.status);
        buf.push_str(&truncate_display(text, width.saturating_sub(1), ""));
        paint_off(&mut buf);
        put(&mut buf, Clear(ClearType::FromCursorDown));
        out.write_all(buf.as_bytes())?;
        out.flush()
    }

    /// A one-line question in the status area, waiting for a key.
    pub fn prompt_line(&self, text: &str, out: &mut dyn Write) -> io::Result<()> {
        let mut buf = String::from("\r");
        paint_on(&mut buf, self.theme.status);
        buf.push_str(text);
        clear_line(&mut buf);
        buf.push(' ');
        out.write_all(buf.as_bytes())?;
        out.flush()
    }
}

/// Facts shown in the status line
pub struct Status<'a> {
    pub dirty: bool,
    pub mode: &'a mut Mode,
    /// Terminator of the cursor row
    pub term: Term,
    pub col: usize,
    pub line: usize,
    pub total: usize,
    /// The cursor cell, `None` when the cursor is past the row's end
    pub cell: Option<&'a Cell>,
    pub last_cell: bool,
}

/// `* [CSV][LF](2,10/300): "wire,form",`
pub fn status_line(status: Status<'_>, width: usize) -> String {
    let mut line = String::new();
    line.push(if status.dirty { '*' } else { ' ' });
    line.push_str(&status.mode.delimiter_tag());
    line.push_str(status.term.tag());
    if status.mode.bom == Bom::Present {
        line.push_str("[BOM]");
    }
    if let Some(tag) = status.mode.encoding_tag() {
        line.push_str(&tag);
    }
    let Some(cell) = status.cell else {
        return line;
    };
    line.push_str(&format!("({},{}/{}): ", status.col + 1, status.line + 1, status.total));

    let mut source = cell.readable_source(status.mode);
    if !status.last_cell {
        source.push(status.mode.delimiter as char);
    } else if !status.term.is_eof() {
        source.push_str(status.term.as_str());
    } else {
        source.push_str(EOF_MARK);
    }
    let room = width.saturating_sub(display_width(&line));
    line.push_str(&truncate_display(&control_pictures(&source), room, "..."));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(texts: &[&str]) -> Row {
        Row::from_texts(texts, Term::Lf, &Mode::default())
    }

    fn frame<'a>(body: Vec<&'a Row>, cursor: Option<usize>, col: usize) -> Frame<'a> {
        Frame {
            header: Vec::new(),
            body,
            header_lines: 0,
            header_cursor: None,
            body_cursor: cursor,
            col,
            left: 0,
            width: 79,
            body_height: 23,
        }
    }

    fn draw(renderer: &mut Renderer, frame: &Frame<'_>) -> String {
        let mut out = Vec::new();
        renderer.draw(frame, &ColumnWidths::default(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_unchanged_lines_are_not_rewritten() {
        let a = row(&["alpha", "beta"]);
        let b = row(&["gamma", "delta"]);
        let mut renderer = Renderer::new(Theme::mono(), "");

        let first = draw(&mut renderer, &frame(vec![&a, &b], Some(0), 0));
        assert!(first.contains("alpha") && first.contains("gamma"));

        let second = draw(&mut renderer, &frame(vec![&a, &b], Some(0), 0));
        assert_eq!(second, "\r\n\r\n");

        // Moving the cursor to the second row redraws both
        let third = draw(&mut renderer, &frame(vec![&a, &b], Some(1), 0));
        assert!(third.contains("alpha") && third.contains("gamma"));

        renderer.clear_cache();
        let fourth = draw(&mut renderer, &frame(vec![&a, &b], Some(1), 0));
        assert!(fourth.contains("alpha"));
    }

    #[test]
    fn test_line_that_left_the_screen_is_redrawn() {
        let a = row(&["alpha"]);
        let b = row(&["beta"]);
        let mut renderer = Renderer::new(Theme::mono(), "");
        draw(&mut renderer, &frame(vec![&a, &b], None, 0));
        draw(&mut renderer, &frame(vec![&a], None, 0));
        let again = draw(&mut renderer, &frame(vec![&a, &b], None, 0));
        assert!(again.contains("beta"));
    }

    #[test]
    fn test_long_cell_is_truncated() {
        let a = row(&["abcdefghijklmnopqrstuvwxyz", "next"]);
        let mut renderer = Renderer::new(Theme::mono(), "");
        let out = draw(&mut renderer, &frame(vec![&a], None, 0));
        assert!(out.contains("abcdefghijklm\u{2026}"));
        assert!(out.contains("next"));
    }

    #[test]
    fn test_empty_neighbour_lends_its_width() {
        let a = row(&["abcdefghijklmnopqrstuvwxyz", "", "z"]);
        let mut renderer = Renderer::new(Theme::mono(), "");
        let out = draw(&mut renderer, &frame(vec![&a], None, 0));
        assert!(out.contains("abcdefghijklmnopqrstuvwxyz"));
    }

    #[test]
    fn test_control_characters_are_pictured() {
        let a = row(&["a\nb"]);
        let mut renderer = Renderer::new(Theme::mono(), "");
        let out = draw(&mut renderer, &frame(vec![&a], None, 0));
        assert!(out.contains("a\u{240A}b"));
    }

    #[test]
    fn test_rewind_counts_line_feeds() {
        let a = row(&["a"]);
        let b = row(&["b"]);
        let mut renderer = Renderer::new(Theme::mono(), "");
        let mut out = Vec::new();
        renderer.rewind(&mut out).unwrap();
        assert_eq!(out, b"\r");

        draw(&mut renderer, &frame(vec![&a, &b], None, 0));
        let mut out = Vec::new();
        renderer.rewind(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\r\x1B[2A");
    }

    #[test]
    fn test_status_line() {
        let mut mode = Mode::default();
        let cell = Cell::parsed(b"\"x,y\"".to_vec(), &mut mode);
        let line = status_line(
            Status {
                dirty: true,
                mode: &mut mode,
                term: Term::Lf,
                col: 1,
                line: 0,
                total: 3,
                cell: Some(&cell),
                last_cell: false,
            },
            80,
        );
        assert_eq!(line, "*[CSV][LF](2,1/3): \"x,y\",");
    }

    #[test]
    fn test_status_line_marks_unterminated_last_cell() {
        let mut mode = Mode::new(b'\t');
        let cell = Cell::parsed(b"end".to_vec(), &mut mode);
        let line = status_line(
            Status {
                dirty: false,
                mode: &mut mode,
                term: Term::Eof,
                col: 0,
                line: 4,
                total: 5,
                cell: Some(&cell),
                last_cell: true,
            },
            80,
        );
        assert_eq!(line, " [TSV][EOF](1,5/5): end\u{2592}");
    }
}
