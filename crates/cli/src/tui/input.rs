// Input sources
// Everything the editor asks of the user goes through `InputSource`: the
// interactive terminal, or a `Script` replaying `|`-separated tokens.

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use super::keys;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The user aborted a prompt (Esc or Ctrl-C).
    Canceled,
    /// No more input will ever arrive.
    Closed,
    Io(String),
    /// A script token that cannot stand for what was asked.
    Script(String),
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => write!(f, "canceled"),
            Self::Closed => write!(f, "input closed"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Script(msg) => write!(f, "script error: {msg}"),
        }
    }
}

impl std::error::Error for InputError {}

impl From<std::io::Error> for InputError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Where keys, prompt answers and the screen size come from.
pub trait InputSource: Send {
    /// Next key, by name (see `keys`).
    fn get_key(&mut self) -> Result<String, InputError>;

    /// Edit one line of text starting from `default`. `candidates` feed
    /// completion.
    fn read_line(
        &mut self,
        out: &mut dyn Write,
        prompt: &str,
        default: &str,
        candidates: &[String],
    ) -> Result<String, InputError>;

    /// Like `read_line`, completing file names.
    fn prompt_filename(
        &mut self,
        out: &mut dyn Write,
        prompt: &str,
        default: &str,
    ) -> Result<String, InputError>;

    /// Screen size as (columns, rows).
    fn size(&mut self) -> Result<(usize, usize), InputError>;
}

/// The input source, shared between the editor and the key-reader thread.
pub type SharedInput = Arc<Mutex<Box<dyn InputSource>>>;

pub fn shared(source: impl InputSource + 'static) -> SharedInput {
    Arc::new(Mutex::new(Box::new(source)))
}

pub fn lock(input: &SharedInput) -> Result<MutexGuard<'_, Box<dyn InputSource>>, InputError> {
    input.lock().map_err(|_| InputError::Closed)
}

/// Replays a `|`-separated script on a fixed 80x25 screen.
///
/// Each key or prompt answer consumes one token. A key token is a single
/// character or an escape sequence (`\x1B`, `\x1Bp` for Alt-p, ...).
#[derive(Debug, Clone)]
pub struct Script {
    tokens: VecDeque<String>,
}

pub const SCRIPT_SIZE: (usize, usize) = (80, 25);

impl Script {
    pub fn new(script: &str) -> Self {
        let tokens = if script.is_empty() {
            VecDeque::new()
        } else {
            script.split('|').map(String::from).collect()
        };
        Self { tokens }
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }

    fn next(&mut self) -> Result<String, InputError> {
        self.tokens.pop_front().ok_or(InputError::Closed)
    }

    fn answer(&mut self, out: &mut dyn Write, prompt: &str) -> Result<String, InputError> {
        let text = self.next()?;
        write!(out, "\r{}{}", prompt, text)?;
        Ok(text)
    }
}

impl InputSource for Script {
    fn get_key(&mut self) -> Result<String, InputError> {
        let token = self.next()?;
        if token.chars().count() > 1 && !token.starts_with('\x1B') {
            return Err(InputError::Script(format!("{:?}: too long for a key", token)));
        }
        Ok(keys::token_name(&token))
    }

    fn read_line(
        &mut self,
        out: &mut dyn Write,
        prompt: &str,
        _default: &str,
        _candidates: &[String],
    ) -> Result<String, InputError> {
        self.answer(out, prompt)
    }

    fn prompt_filename(
        &mut self,
        out: &mut dyn Write,
        prompt: &str,
        _default: &str,
    ) -> Result<String, InputError> {
        self.answer(out, prompt)
    }

    fn size(&mut self) -> Result<(usize, usize), InputError> {
        Ok(SCRIPT_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_tokens() {
        let mut script = Script::new("<|y|l|\x1Bp|ぎ\nゃあ");
        assert_eq!(script.get_key().unwrap(), "<");
        assert_eq!(script.get_key().unwrap(), "y");
        assert_eq!(script.get_key().unwrap(), "l");
        assert_eq!(script.get_key().unwrap(), "alt+p");
        let mut out = Vec::new();
        assert_eq!(script.read_line(&mut out, "replace cell>", "", &[]).unwrap(), "ぎ\nゃあ");
        assert_eq!(script.get_key(), Err(InputError::Closed));
    }

    #[test]
    fn test_long_key_token_is_an_error() {
        let mut script = Script::new("abc");
        assert!(matches!(script.get_key(), Err(InputError::Script(_))));
    }

    #[test]
    fn test_empty_script_is_closed() {
        let mut script = Script::new("");
        assert_eq!(script.remaining(), 0);
        assert_eq!(script.get_key(), Err(InputError::Closed));
        assert_eq!(script.size().unwrap(), (80, 25));
    }
}
