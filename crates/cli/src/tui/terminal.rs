// Interactive input source
// Keys come from crossterm events. Prompts are answered with a one-line
// editor drawn in the status area, with Tab completion.

use std::fs;
use std::io::Write;
use std::path::MAIN_SEPARATOR;

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;

use super::input::{InputError, InputSource};
use super::keys;
use crate::util::display_width;

/// The controlling terminal (already in raw mode)
#[derive(Debug, Default)]
pub struct Terminal;

impl Terminal {
    pub fn new() -> Self {
        Self
    }

    fn next_key_event() -> Result<KeyEvent, InputError> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    return Ok(key);
                }
            }
        }
    }

    fn edit(
        out: &mut dyn Write,
        prompt: &str,
        default: &str,
        complete: &dyn Fn(&str) -> Vec<String>,
    ) -> Result<String, InputError> {
        let mut line = LineState::new(default);
        loop {
            line.render(out, prompt)?;
            let key = Self::next_key_event()?;
            match line.apply(&key, complete) {
                Step::Continue => {}
                Step::Done => return Ok(line.text()),
                Step::Cancel => return Err(InputError::Canceled),
            }
        }
    }
}

impl InputSource for Terminal {
    fn get_key(&mut self) -> Result<String, InputError> {
        loop {
            if let Some(name) = keys::event_name(&Self::next_key_event()?) {
                return Ok(name);
            }
        }
    }

    fn read_line(
        &mut self,
        out: &mut dyn Write,
        prompt: &str,
        default: &str,
        candidates: &[String],
    ) -> Result<String, InputError> {
        let complete = |prefix: &str| -> Vec<String> {
            candidates
                .iter()
                .filter(|c| c.starts_with(prefix))
                .cloned()
                .collect()
        };
        Self::edit(out, prompt, default, &complete)
    }

    fn prompt_filename(
        &mut self,
        out: &mut dyn Write,
        prompt: &str,
        default: &str,
    ) -> Result<String, InputError> {
        Self::edit(out, prompt, default, &complete_path)
    }

    fn size(&mut self) -> Result<(usize, usize), InputError> {
        let (cols, rows) = terminal::size()?;
        Ok((cols as usize, rows as usize))
    }
}

/// File names starting with `prefix`; directories end with a separator.
fn complete_path(prefix: &str) -> Vec<String> {
    let (dir, stem) = match prefix.rfind(MAIN_SEPARATOR) {
        Some(i) => (&prefix[..=i], &prefix[i + 1..]),
        None => ("", prefix),
    };
    let read_from = if dir.is_empty() { "." } else { dir };
    let Ok(entries) = fs::read_dir(read_from) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(stem) || (stem.is_empty() && name.starts_with('.')) {
                return None;
            }
            let mut path = format!("{}{}", dir, name);
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                path.push(MAIN_SEPARATOR);
            }
            Some(path)
        })
        .collect();
    names.sort();
    names
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
    Cancel,
}

/// Text and caret of a prompt being edited
#[derive(Debug, Clone)]
struct LineState {
    chars: Vec<char>,
    caret: usize,
    /// Matches being cycled by repeated Tab, and the one shown
    cycle: Option<(Vec<String>, usize)>,
}

impl LineState {
    fn new(default: &str) -> Self {
        let chars: Vec<char> = default.chars().collect();
        Self {
            caret: chars.len(),
            chars,
            cycle: None,
        }
    }

    fn text(&self) -> String {
        self.chars.iter().collect()
    }

    fn set_text(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.caret = self.chars.len();
    }

    fn render(&self, out: &mut dyn Write, prompt: &str) -> Result<(), InputError> {
        let before: String = self.chars[..self.caret].iter().collect();
        let column = display_width(prompt) + display_width(&before);
        write!(out, "\r{}{}", prompt, self.text())?;
        out.queue(Clear(ClearType::UntilNewLine))?
            .queue(MoveToColumn(column.min(u16::MAX as usize) as u16))?;
        out.flush()?;
        Ok(())
    }

    fn apply(&mut self, key: &KeyEvent, complete: &dyn Fn(&str) -> Vec<String>) -> Step {
        if key.code != KeyCode::Tab {
            self.cycle = None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            self.handle_control_key(key.code)
        } else {
            self.handle_regular_key(key.code, complete)
        }
    }

    fn handle_control_key(&mut self, code: KeyCode) -> Step {
        match code {
            KeyCode::Char('c') | KeyCode::Char('g') => return Step::Cancel,
            KeyCode::Char('a') => self.caret = 0,
            KeyCode::Char('e') => self.caret = self.chars.len(),
            KeyCode::Char('b') => self.caret = self.caret.saturating_sub(1),
            KeyCode::Char('f') => self.caret = (self.caret + 1).min(self.chars.len()),
            KeyCode::Char('h') => self.backspace(),
            KeyCode::Char('d') => self.delete(),
            KeyCode::Char('u') => {
                self.chars.drain(..self.caret);
                self.caret = 0;
            }
            KeyCode::Char('k') => self.chars.truncate(self.caret),
            KeyCode::Char('m') | KeyCode::Char('j') => return Step::Done,
            _ => {}
        }
        Step::Continue
    }

    fn handle_regular_key(&mut self, code: KeyCode, complete: &dyn Fn(&str) -> Vec<String>) -> Step {
        match code {
            KeyCode::Enter => return Step::Done,
            KeyCode::Esc => return Step::Cancel,
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.caret = self.caret.saturating_sub(1),
            KeyCode::Right => self.caret = (self.caret + 1).min(self.chars.len()),
            KeyCode::Home => self.caret = 0,
            KeyCode::End => self.caret = self.chars.len(),
            KeyCode::Tab => self.complete(complete),
            KeyCode::Char(c) => {
                self.chars.insert(self.caret, c);
                self.caret += 1;
            }
            _ => {}
        }
        Step::Continue
    }

    fn backspace(&mut self) {
        if self.caret > 0 {
            self.caret -= 1;
            self.chars.remove(self.caret);
        }
    }

    fn delete(&mut self) {
        if self.caret < self.chars.len() {
            self.chars.remove(self.caret);
        }
    }

    /// First Tab extends to the longest common prefix of the matches; later
    /// Tabs cycle through them.
    fn complete(&mut self, complete: &dyn Fn(&str) -> Vec<String>) {
        if let Some((matches, shown)) = self.cycle.take() {
            let next = (shown + 1) % matches.len();
            self.set_text(&matches[next]);
            self.cycle = Some((matches, next));
            return;
        }
        let text = self.text();
        let matches = complete(&text);
        match matches.as_slice() {
            [] => {}
            [only] => self.set_text(only),
            _ => {
                let prefix = common_prefix(&matches);
                if prefix.chars().count() > text.chars().count() {
                    self.set_text(&prefix);
                } else {
                    self.set_text(&matches[0]);
                    self.cycle = Some((matches, 0));
                }
            }
        }
    }
}

fn common_prefix(words: &[String]) -> String {
    let Some((first, rest)) = words.split_first() else {
        return String::new();
    };
    let mut prefix: Vec<char> = first.chars().collect();
    for word in rest {
        let common = prefix
            .iter()
            .zip(word.chars())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(common);
    }
    prefix.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(line: &mut LineState, code: KeyCode, candidates: &[&str]) -> Step {
        let complete = |prefix: &str| -> Vec<String> {
            candidates
                .iter()
                .filter(|c| c.starts_with(prefix))
                .map(|c| c.to_string())
                .collect()
        };
        line.apply(&KeyEvent::new(code, KeyModifiers::NONE), &complete)
    }

    fn ctrl(line: &mut LineState, c: char) -> Step {
        line.apply(&KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL), &|_| Vec::new())
    }

    #[test]
    fn test_editing_keys() {
        let mut line = LineState::new("abc");
        press(&mut line, KeyCode::Left, &[]);
        press(&mut line, KeyCode::Char('X'), &[]);
        assert_eq!(line.text(), "abXc");
        press(&mut line, KeyCode::Backspace, &[]);
        press(&mut line, KeyCode::Delete, &[]);
        assert_eq!(line.text(), "ab");
        ctrl(&mut line, 'a');
        press(&mut line, KeyCode::Char('>'), &[]);
        assert_eq!(line.text(), ">ab");
        ctrl(&mut line, 'k');
        assert_eq!(line.text(), ">");
        assert_eq!(press(&mut line, KeyCode::Enter, &[]), Step::Done);
    }

    #[test]
    fn test_escape_and_ctrl_c_cancel() {
        let mut line = LineState::new("");
        assert_eq!(press(&mut line, KeyCode::Esc, &[]), Step::Cancel);
        assert_eq!(ctrl(&mut line, 'c'), Step::Cancel);
    }

    #[test]
    fn test_tab_extends_then_cycles() {
        let candidates = ["tokyo", "tottori", "osaka"];
        let mut line = LineState::new("t");
        press(&mut line, KeyCode::Tab, &candidates);
        assert_eq!(line.text(), "to");
        press(&mut line, KeyCode::Tab, &candidates);
        assert_eq!(line.text(), "tokyo");
        press(&mut line, KeyCode::Tab, &candidates);
        assert_eq!(line.text(), "tottori");
        press(&mut line, KeyCode::Tab, &candidates);
        assert_eq!(line.text(), "tokyo");
    }

    #[test]
    fn test_single_match_completes() {
        let mut line = LineState::new("os");
        press(&mut line, KeyCode::Tab, &["tokyo", "osaka"]);
        assert_eq!(line.text(), "osaka");
    }

    #[test]
    fn test_path_completion_lists_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data.csv"), "").unwrap();
        fs::create_dir(dir.path().join("dump")).unwrap();
        let prefix = format!("{}{}d", dir.path().display(), MAIN_SEPARATOR);
        let found = complete_path(&prefix);
        assert_eq!(
            found,
            vec![
                format!("{}{}data.csv", dir.path().display(), MAIN_SEPARATOR),
                format!("{}{}dump{}", dir.path().display(), MAIN_SEPARATOR, MAIN_SEPARATOR),
            ]
        );
    }
}
