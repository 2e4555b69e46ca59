// tabula - terminal editor for delimiter-separated text

mod exit_codes;
mod logging;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal;
use crossterm::tty::IsTty;

use tabula_cli::tui::{self, EditorConfig, InputSource, Outcome, Script, Terminal};
use tabula_config::keybindings::KeybindingManager;
use tabula_config::settings::Settings;
use tabula_config::theme::Theme;
use tabula_engine::column_width::ColumnWidths;
use tabula_engine::protect::Protection;
use tabula_engine::Mode;
use tabula_io::RecordReader;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tabula")]
#[command(about = "Edit CSV/TSV files in the terminal while they are still loading")]
#[command(version, long_version = long_version())]
struct Cli {
    /// Files to edit, read as one concatenated stream
    files: Vec<PathBuf>,

    /// Cell widths: DEFAULT,COL:WIDTH,...
    #[arg(long, short = 'w', value_name = "SPEC")]
    widths: Option<String>,

    /// Number of header rows
    #[arg(long, short = 'H', value_name = "N")]
    header: Option<usize>,

    /// Tab-separated
    #[arg(long, short = 't', conflicts_with_all = ["csv", "semicolon", "delimiter"])]
    tsv: bool,

    /// Comma-separated
    #[arg(long, short = 'c', conflicts_with_all = ["semicolon", "delimiter"])]
    csv: bool,

    /// Semicolon-separated
    #[arg(long, conflicts_with = "delimiter")]
    semicolon: bool,

    /// Any single-byte delimiter
    #[arg(long, value_name = "C")]
    delimiter: Option<String>,

    /// Encoding label (utf-8, utf-16le, shift_jis, ...)
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,

    /// Do not judge the input as UTF-8
    #[arg(long)]
    nonutf8: bool,

    /// Read as UTF-16 little endian
    #[arg(long = "16le", conflicts_with = "utf16be")]
    utf16le: bool,

    /// Read as UTF-16 big endian
    #[arg(long = "16be")]
    utf16be: bool,

    /// Forbid inserting or deleting cells
    #[arg(long)]
    fixcol: bool,

    /// Forbid all changes
    #[arg(long)]
    readonly: bool,

    /// Forbid changes to header rows
    #[arg(long, short = 'p')]
    protect_header: bool,

    /// Title line above the grid (repeatable)
    #[arg(long, value_name = "TEXT")]
    title: Vec<String>,

    /// Reverse-video theme
    #[arg(long)]
    rv: bool,

    /// Separator drawn between cells
    #[arg(long, value_name = "SEP")]
    ofs: Option<String>,

    /// Replay a |-separated key script instead of reading the terminal
    #[arg(long, value_name = "SCRIPT", hide = true)]
    auto: Option<String>,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tabula-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tabula-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    match run(cli) {
        Ok(outcome) => {
            tracing::info!(?outcome, "exit");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(CliError { code, message, hint }) => {
            tracing::error!(code, "{}", message);
            eprintln!("error: {}", message);
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn run(cli: Cli) -> Result<Outcome, CliError> {
    let settings = Settings::load();

    let mut widths: ColumnWidths = settings.grid.cell_width.parse().map_err(|e: String| {
        CliError::args(e).with_hint(format!("check [grid] cell_width in {}", Settings::config_path_display()))
    })?;
    if let Some(spec) = &cli.widths {
        widths
            .apply_spec(spec)
            .map_err(|e| CliError::args(e).with_hint("expected DEFAULT,COL:WIDTH,... e.g. -w 10,0:20"))?;
    }

    let stdin_is_tty = io::stdin().is_tty();
    let mut mode = Mode::new(delimiter(&cli, stdin_is_tty)?);
    if let Some(label) = &cli.encoding {
        mode.set_encoding(label).map_err(CliError::args)?;
    }
    if cli.utf16le {
        mode.set_encoding("utf-16le").map_err(CliError::args)?;
    }
    if cli.utf16be {
        mode.set_encoding("utf-16be").map_err(CliError::args)?;
    }
    if cli.nonutf8 {
        mode.non_utf8 = true;
    }

    let source = if cli.files.is_empty() {
        (!stdin_is_tty).then(|| RecordReader::new(io::stdin()))
    } else {
        Some(RecordReader::new(open_all(&cli.files)?))
    };

    let editor = &settings.editor;
    let config = EditorConfig {
        mode,
        widths,
        protection: Protection {
            read_only: cli.readonly || editor.read_only,
            protect_header: cli.protect_header || editor.protect_header,
            fix_column: cli.fixcol || editor.fix_column,
            header_lines: cli.header.unwrap_or(settings.grid.header_lines),
        },
        titles: cli.title.clone(),
        separator: cli.ofs.clone().unwrap_or_else(|| editor.output_separator.clone()),
        theme: Theme::resolve(settings.theme.source, cli.rv),
        keys: KeybindingManager::new(),
        save_path: cli.files.first().cloned(),
        poll_interval: Duration::from_millis(editor.poll_interval_ms.max(1)),
        message: None,
        validator: None,
    };
    tracing::info!(files = cli.files.len(), scripted = cli.auto.is_some(), "starting");

    // Draw where a `-` save does not land
    let mut out: Box<dyn Write> = if cli.files.is_empty() {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };

    let result = match &cli.auto {
        Some(script) => edit_with(config, source, Script::new(script), &mut out),
        None => {
            terminal::enable_raw_mode()
                .map_err(|e| CliError::runtime(format!("failed to enable raw mode: {}", e)))?;
            struct Cleanup;
            impl Drop for Cleanup {
                fn drop(&mut self) {
                    let _ = execute!(io::stderr(), Show);
                    let _ = execute!(io::stdout(), Show);
                    let _ = terminal::disable_raw_mode();
                }
            }
            let _cleanup = Cleanup;
            execute!(out, Hide).map_err(|e| CliError::runtime(e.to_string()))?;
            edit_with(config, source, Terminal::new(), &mut out)
        }
    };
    result.map_err(|e| CliError::runtime(e.to_string()))
}

fn edit_with(
    config: EditorConfig,
    source: Option<RecordReader>,
    input: impl InputSource + 'static,
    out: &mut Box<dyn Write>,
) -> Result<Outcome, tui::EditError> {
    tui::edit(config, source, tui::shared(input), out.as_mut())
}

/// Delimiter from the flags, else guessed from the first file name
fn delimiter(cli: &Cli, stdin_is_tty: bool) -> Result<u8, CliError> {
    if cli.tsv {
        return Ok(b'\t');
    }
    if cli.csv {
        return Ok(b',');
    }
    if cli.semicolon {
        return Ok(b';');
    }
    if let Some(d) = &cli.delimiter {
        return match d.as_bytes() {
            [b] if *b != b'"' && *b != b'\r' && *b != b'\n' => Ok(*b),
            _ => Err(CliError::args(format!("invalid delimiter '{}'", d))
                .with_hint("the delimiter must be a single ASCII character other than a quote or newline")),
        };
    }
    let tab = match cli.files.first() {
        Some(first) => !has_csv_extension(first),
        None => stdin_is_tty,
    };
    Ok(if tab { b'\t' } else { b',' })
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Open every file up front and read them back to back.
fn open_all(files: &[PathBuf]) -> Result<Box<dyn Read + Send>, CliError> {
    let mut chained: Box<dyn Read + Send> = Box::new(io::empty());
    for path in files {
        let file = File::open(path)
            .map_err(|e| CliError::args(format!("cannot open '{}': {}", path.display(), e)))?;
        chained = Box::new(chained.chain(file));
    }
    Ok(chained)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tabula").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_delimiter_flags() {
        assert_eq!(delimiter(&parse(&["-t", "a.csv"]), false).unwrap(), b'\t');
        assert_eq!(delimiter(&parse(&["-c", "a.tsv"]), false).unwrap(), b',');
        assert_eq!(delimiter(&parse(&["--semicolon"]), true).unwrap(), b';');
        assert_eq!(delimiter(&parse(&["--delimiter", "|"]), true).unwrap(), b'|');
    }

    #[test]
    fn test_delimiter_guess() {
        assert_eq!(delimiter(&parse(&["data.CSV"]), true).unwrap(), b',');
        assert_eq!(delimiter(&parse(&["data.txt"]), false).unwrap(), b'\t');
        // empty start from a terminal
        assert_eq!(delimiter(&parse(&[]), true).unwrap(), b'\t');
        // piped input
        assert_eq!(delimiter(&parse(&[]), false).unwrap(), b',');
    }

    #[test]
    fn test_bad_delimiter_is_usage_error() {
        let err = delimiter(&parse(&["--delimiter", "ab"]), false).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        let err = delimiter(&parse(&["--delimiter", "\""]), false).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn test_conflicting_delimiters_rejected() {
        assert!(Cli::try_parse_from(["tabula", "-t", "-c"]).is_err());
        assert!(Cli::try_parse_from(["tabula", "--16le", "--16be"]).is_err());
    }

    #[test]
    fn test_files_are_concatenated() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, "1,2\n").unwrap();
        std::fs::write(&b, "3,4\n").unwrap();
        let mut text = String::new();
        open_all(&[a, b]).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "1,2\n3,4\n");
    }

    #[test]
    fn test_missing_file_is_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_all(&[dir.path().join("nope.csv")]).err().unwrap();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn test_title_repeats() {
        let cli = parse(&["--title", "one", "--title", "two"]);
        assert_eq!(cli.title, vec!["one", "two"]);
    }
}
