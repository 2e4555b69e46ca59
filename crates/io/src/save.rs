// Save protocol
// The first overwrite of a path in a session asks for confirmation and keeps
// the old file as `<path>~`; later saves to the same path replace it quietly.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tabula_engine::{Mode, Row};

use crate::csv::{write_document, CodecError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    /// The user declined to overwrite.
    Canceled,
    Io(String),
    Codec(CodecError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canceled => write!(f, "canceled"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Codec(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SaveError {}

impl From<CodecError> for SaveError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Where a save goes: `-` is standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Stdout,
    Path(PathBuf),
}

impl Target {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "-" => Self::Stdout,
            path => Self::Path(PathBuf::from(path)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "-"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("~");
    PathBuf::from(name)
}

/// Paths already backed up during this editing session
#[derive(Debug, Default)]
pub struct SaveSession {
    overwritten: HashSet<PathBuf>,
}

impl SaveSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `rows` to `target`, returning the status message.
    /// `confirm` is asked before the first overwrite of an existing file.
    pub fn save<'a, F>(
        &mut self,
        target: &Target,
        rows: impl IntoIterator<Item = &'a Row>,
        mode: &Mode,
        confirm: F,
    ) -> Result<String, SaveError>
    where
        F: FnOnce(&str) -> bool,
    {
        let path = match target {
            Target::Stdout => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                write_document(rows, mode, &mut out)?;
                return Ok("Output to STDOUT".to_string());
            }
            Target::Path(path) => path,
        };

        if path.exists() {
            if self.overwritten.contains(path) {
                fs::remove_file(path).map_err(|e| io_error(path, e))?;
            } else {
                if !confirm(&format!("Overwrite as \"{}\" [y/n] ?", path.display())) {
                    return Err(SaveError::Canceled);
                }
                let backup = backup_path(path);
                if backup.exists() {
                    fs::remove_file(&backup).map_err(|e| io_error(&backup, e))?;
                }
                fs::rename(path, &backup).map_err(|e| io_error(path, e))?;
                log::info!("backed up {} to {}", path.display(), backup.display());
                self.overwritten.insert(path.clone());
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| io_error(path, e))?;
        let mut out = BufWriter::new(file);
        write_document(rows, mode, &mut out)?;
        out.into_inner()
            .map_err(|e| io_error(path, e.into_error()))?
            .sync_all()
            .map_err(|e| io_error(path, e))?;
        log::info!("saved {}", path.display());
        Ok(format!("Saved as \"{}\"", path.display()))
    }
}

fn io_error(path: &Path, e: io::Error) -> SaveError {
    SaveError::Io(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_engine::Term;

    fn rows(texts: &[&str]) -> Vec<Row> {
        let mode = Mode::default();
        texts
            .iter()
            .map(|t| Row::from_texts(&[*t], Term::Lf, &mode))
            .collect()
    }

    #[test]
    fn test_new_file_needs_no_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.csv");
        let mut session = SaveSession::new();
        let msg = session
            .save(&Target::Path(path.clone()), &rows(&["a"]), &Mode::default(), |_| {
                panic!("no prompt expected")
            })
            .unwrap();
        assert_eq!(msg, format!("Saved as \"{}\"", path.display()));
        assert_eq!(fs::read(&path).unwrap(), b"a\n");
    }

    #[test]
    fn test_first_overwrite_backs_up_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "old\n").unwrap();
        fs::write(backup_path(&path), "older\n").unwrap();
        let target = Target::Path(path.clone());
        let mut session = SaveSession::new();

        let mut asked = 0;
        session
            .save(&target, &rows(&["v1"]), &Mode::default(), |_| {
                asked += 1;
                true
            })
            .unwrap();
        assert_eq!(asked, 1);
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "old\n");

        session
            .save(&target, &rows(&["v2"]), &Mode::default(), |_| {
                panic!("second save must not prompt")
            })
            .unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "v2\n");
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "old\n");
    }

    #[test]
    fn test_declined_overwrite_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.csv");
        fs::write(&path, "keep\n").unwrap();
        let mut session = SaveSession::new();
        let err = session
            .save(&Target::Path(path.clone()), &rows(&["x"]), &Mode::default(), |_| false)
            .unwrap_err();
        assert_eq!(err, SaveError::Canceled);
        assert_eq!(err.to_string(), "canceled");
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep\n");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_unwritable_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.csv");
        let mut session = SaveSession::new();
        let err = session
            .save(&Target::Path(path), &rows(&["x"]), &Mode::default(), |_| true)
            .unwrap_err();
        assert!(matches!(err, SaveError::Io(_)));
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("-"), Target::Stdout);
        assert_eq!(Target::parse(" a.csv "), Target::Path(PathBuf::from("a.csv")));
    }
}
