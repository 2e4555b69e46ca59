// End-to-end editing scenarios driven by key scripts.
// Run with: cargo test -p tabula-cli --test scenarios
//
// Each case loads a document, replays `<keys>|w|<path>|q|y` and compares the
// saved bytes.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use tabula_cli::tui::{edit, shared, EditError, EditorConfig, InputError, Outcome, Script};
use tabula_engine::Mode;
use tabula_io::RecordReader;

const AIUEO: &str = "あ,い,う,え,お
か,き,く,け,こ
さ,し,す,せ,そ
た,ち,つ,て,と
な,に,ぬ,ね,の
は,ひ,ふ,へ,ほ
ま,み,む,め,も
や,ゆ,よ
ら,り,る,れ,ろ
わ,を,ん";

const SMALL: &str = "あ,い,う,え,お\nか,き,く,け,こ";
const SMALL_CRLF: &str = "あ,い,う,え,お\r\nか,き,く,け,こ";

#[derive(Clone, Copy, PartialEq)]
enum Flags {
    None,
    FixCol,
    ReadOnly,
}

fn config(flags: Flags) -> EditorConfig {
    let mut config = EditorConfig {
        mode: Mode::new(b','),
        poll_interval: Duration::from_millis(500),
        ..EditorConfig::default()
    };
    config.protection.fix_column = flags == Flags::FixCol;
    config.protection.read_only = flags == Flags::ReadOnly;
    config
}

/// Replay `script` over `source`; returns the outcome and what was drawn.
fn replay(config: EditorConfig, source: &[u8], script: &str) -> (Outcome, String) {
    let reader = RecordReader::new(Cursor::new(source.to_vec()));
    let mut screen = Vec::new();
    let outcome = match edit(config, Some(reader), shared(Script::new(script)), &mut screen) {
        Ok(outcome) => outcome,
        // scripts may end while a prompt is still waiting
        Err(EditError::Input(InputError::Closed)) => Outcome::Clean,
        Err(e) => panic!("edit failed: {e}"),
    };
    (outcome, String::from_utf8_lossy(&screen).into_owned())
}

fn saved_after(config: EditorConfig, source: &[u8], process: &str) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.csv");
    let script = if process.is_empty() {
        format!("w|{}|q|y", path.display())
    } else {
        format!("{}|w|{}|q|y", process, path.display())
    };
    replay(config, source, &script);
    read(&path)
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

#[track_caller]
fn check(source: &str, process: &str, expect: &str) {
    check_with(Flags::None, source, process, expect);
}

#[track_caller]
fn check_with(flags: Flags, source: &str, process: &str, expect: &str) {
    let saved = saved_after(config(flags), source.as_bytes(), process);
    assert_eq!(String::from_utf8_lossy(&saved), expect, "keys: {:?}", process);
}

// ---------------------------------------------------------------------------
// Insert / append / delete cells
// ---------------------------------------------------------------------------

#[test]
fn insert_cell_at_head() {
    check(AIUEO, "<|i|new", &AIUEO.replacen("あ,", "new,あ,", 1));
}

#[test]
fn insert_cell_keeps_cursor_on_the_old_cell() {
    check(AIUEO, "<|i|new|r|X", &AIUEO.replacen("あ,", "new,X,", 1));
}

#[test]
fn insert_cell_refused_on_empty_row_when_columns_are_fixed() {
    let source = "a,b\n\nc,d\n";
    check_with(Flags::FixCol, source, "j|i", source);
    let (_, screen) = replay(config(Flags::FixCol), source.as_bytes(), "j|i");
    assert!(screen.contains("The order of Columns is fixed !"), "screen: {:?}", screen);
}

#[test]
fn append_cell_at_line_end() {
    check(AIUEO, "<|$|a|new", &AIUEO.replacen("お\n", "お,new\n", 1));
}

#[test]
fn delete_last_cell_of_row() {
    check(AIUEO, "<|$|d| ", &AIUEO.replacen(",お\n", "\n", 1));
}

#[test]
fn delete_first_cell_of_row() {
    check(AIUEO, "<|d| ", &AIUEO.replacen("あ,", "", 1));
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[test]
fn new_row_below_last_row_terminates_it() {
    check(AIUEO, ">|o|ががが", &format!("{}\nががが", AIUEO));
}

#[test]
fn new_row_above_last_row() {
    check(AIUEO, ">|O|ががが", &AIUEO.replacen("わ,を,ん", "ががが\nわ,を,ん", 1));
}

#[test]
fn new_row_above_first_row() {
    check(AIUEO, "<|O|ががが", &format!("ががが\n{}", AIUEO));
}

#[test]
fn new_row_below_first_row() {
    check(AIUEO, "<|o|ががが", &AIUEO.replacen("お\n", "お\nががが\n", 1));
}

#[test]
fn delete_last_row() {
    check(AIUEO, ">|D", &AIUEO.replacen("\nわ,を,ん", "", 1));
}

#[test]
fn delete_first_row() {
    check(AIUEO, "<|D", &AIUEO.replacen("あ,い,う,え,お\n", "", 1));
}

// ---------------------------------------------------------------------------
// Replace and search
// ---------------------------------------------------------------------------

#[test]
fn replace_with_newline_gets_quoted() {
    check(AIUEO, "<|r|ぎ\nゃあ", &AIUEO.replacen("あ,", "\"ぎ\nゃあ\",", 1));
}

#[test]
fn search_then_insert() {
    check(AIUEO, "/|ま|$|j|i|foo", &AIUEO.replacen("や,ゆ,よ", "や,ゆ,foo,よ", 1));
}

#[test]
fn search_then_replace() {
    check(AIUEO, "/|ま|$|j|r|foo", &AIUEO.replacen("や,ゆ,よ", "や,ゆ,foo", 1));
}

#[test]
fn search_then_append() {
    check(AIUEO, "/|ま|$|j|a|foo", &AIUEO.replacen("や,ゆ,よ", "や,ゆ,よ,foo", 1));
}

#[test]
fn search_miss_keeps_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let script = format!("j|/|zzz|r|X|w|{}|q|y", path.display());
    let (_, screen) = replay(config(Flags::None), b"a\nb\nc\n", &script);
    assert_eq!(read(&path), b"a\nX\nc\n");
    assert!(screen.contains("zzz: not found"), "screen: {:?}", screen);
}

#[test]
fn backward_search_and_repeat() {
    check("x,1\ny,2\nx,3\n", ">|?|x|n|r|hit", "x,1\ny,2\nx,3\n".replacen("x,1", "hit,1", 1).as_str());
}

// ---------------------------------------------------------------------------
// Encodings
// ---------------------------------------------------------------------------

const AIUEO_FOO: &str = "あ,い,う,え,お
か,foo,く,け,こ
さ,し,す,せ,そ
た,ち,つ,て,と
な,に,ぬ,ね,の
は,ひ,ふ,へ,ほ
ま,み,む,め,も
や,ゆ,よ
ら,り,る,れ,ろ
わ,を,ん";

fn utf16(text: &str, little: bool) -> Vec<u8> {
    text.encode_utf16()
        .flat_map(|u| if little { u.to_le_bytes() } else { u.to_be_bytes() })
        .collect()
}

#[test]
fn utf16le_without_bom_is_detected() {
    let saved = saved_after(config(Flags::None), &utf16(AIUEO, true), "j|l|r|foo");
    assert_eq!(saved, utf16(AIUEO_FOO, true));
}

#[test]
fn utf16be_without_bom_is_detected() {
    let saved = saved_after(config(Flags::None), &utf16(AIUEO, false), "j|l|r|foo");
    assert_eq!(saved, utf16(AIUEO_FOO, false));
}

#[test]
fn shift_jis_keeps_untouched_bytes() {
    let (source, _, _) = encoding_rs::SHIFT_JIS.encode(AIUEO);
    let (expect, _, _) = encoding_rs::SHIFT_JIS.encode(AIUEO_FOO);

    let saved = saved_after(config(Flags::None), &source, "j|l|r|foo");
    assert_eq!(saved, expect.clone().into_owned());

    let mut explicit = config(Flags::None);
    explicit.mode.set_encoding("shift_jis").unwrap();
    let saved = saved_after(explicit, &source, "j|l|r|foo");
    assert_eq!(saved, expect.into_owned());
}

#[test]
fn bom_is_written_back() {
    let source = "\u{FEFF}a,b\n";
    check(source, "l|r|c", "\u{FEFF}a,c\n");
}

// ---------------------------------------------------------------------------
// Undo
// ---------------------------------------------------------------------------

#[test]
fn restore_after_replace() {
    check(AIUEO, "<|r|あ'|u", AIUEO);
}

#[test]
fn restore_goes_back_to_last_save() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.csv");
    let process = format!("<|r|あ'|w|{}|r|あ''|u", first.display());
    check(AIUEO, &process, &AIUEO.replacen("あ,", "あ',", 1));
    assert_eq!(
        String::from_utf8(read(&first)).unwrap(),
        AIUEO.replacen("あ,", "あ',", 1)
    );
}

// ---------------------------------------------------------------------------
// Empty input
// ---------------------------------------------------------------------------

#[test]
fn empty_input_starts_with_one_cell() {
    check("", "i|ahaha", "ahaha");
}

// ---------------------------------------------------------------------------
// Copy and paste
// ---------------------------------------------------------------------------

#[test]
fn delete_cell() {
    check(SMALL, "<|d| ", "い,う,え,お\nか,き,く,け,こ");
    check_with(Flags::FixCol, SMALL, "<|d| ", SMALL);
    check_with(Flags::ReadOnly, SMALL, "<|d| ", SMALL);
}

#[test]
fn delete_row() {
    let expect = "か,き,く,け,こ";
    check(SMALL, "<|D", expect);
    check_with(Flags::FixCol, SMALL, "<|D", expect);
    check_with(Flags::ReadOnly, SMALL, "<|D", SMALL);
}

#[test]
fn delete_column() {
    check(SMALL, "<|d|c", "い,う,え,お\nき,く,け,こ");
    check_with(Flags::FixCol, SMALL, "<|d|c", SMALL);
    check_with(Flags::ReadOnly, SMALL, "<|d|c", SMALL);
}

#[test]
fn yank_cell_paste_after() {
    let process = "<|y|l|l|p";
    check(SMALL, process, "あ,い,あ,う,え,お\nか,き,く,け,こ");
    check_with(Flags::FixCol, SMALL, process, SMALL);
    check_with(Flags::ReadOnly, SMALL, process, SMALL);
}

#[test]
fn yank_cell_paste_before() {
    let process = "<|y|l|$|P";
    check(SMALL, process, "あ,い,う,え,あ,お\nか,き,く,け,こ");
    check_with(Flags::FixCol, SMALL, process, SMALL);
    check_with(Flags::ReadOnly, SMALL, process, SMALL);
}

#[test]
fn yank_cell_paste_over() {
    let expect = "あ,い,う,え,あ\nか,き,く,け,こ";
    let escape_p = "<|y|l|$|\x1B|p";
    check(SMALL, escape_p, expect);
    check_with(Flags::FixCol, SMALL, escape_p, expect);
    check_with(Flags::ReadOnly, SMALL, escape_p, SMALL);
    check(SMALL, "<|y|l|$|\x1Bp", expect);
}

#[test]
fn yank_row_paste_after() {
    let process = "<|y|y|>|p";
    let expect = "あ,い,う,え,お\nか,き,く,け,こ\nあ,い,う,え,お\n";
    check(SMALL, process, expect);
    check_with(Flags::FixCol, SMALL, process, expect);
    check_with(Flags::ReadOnly, SMALL, process, SMALL);
}

#[test]
fn yank_row_paste_before() {
    let process = "<|y|y|P";
    let expect = "あ,い,う,え,お\r\nあ,い,う,え,お\r\nか,き,く,け,こ";
    check(SMALL_CRLF, process, expect);
    check_with(Flags::FixCol, SMALL_CRLF, process, expect);
    check_with(Flags::ReadOnly, SMALL_CRLF, process, SMALL_CRLF);
}

#[test]
fn yank_row_paste_over_keeps_terminator() {
    let expect = "あ,い,う,え,お\r\nあ,い,う,え,お";
    let escape_p = "<|y|y|\r|\x1B|p";
    check(SMALL_CRLF, escape_p, expect);
    check_with(Flags::FixCol, SMALL_CRLF, escape_p, expect);
    check_with(Flags::ReadOnly, SMALL_CRLF, escape_p, SMALL_CRLF);
    check(SMALL_CRLF, "<|y|y|\r|\x1Bp", expect);
}

#[test]
fn yank_column_paste_after() {
    let process = "<|y|c|$|p";
    check(SMALL, process, "あ,い,う,え,お,あ\nか,き,く,け,こ,か");
    check_with(Flags::FixCol, SMALL, process, SMALL);
    check_with(Flags::ReadOnly, SMALL, process, SMALL);
}

#[test]
fn yank_column_paste_before() {
    let process = "<|y|c|$|P";
    check(SMALL, process, "あ,い,う,え,あ,お\nか,き,く,け,か,こ");
    check_with(Flags::FixCol, SMALL, process, SMALL);
    check_with(Flags::ReadOnly, SMALL, process, SMALL);
}

#[test]
fn yank_column_paste_over() {
    let expect = "あ,い,う,え,あ\nか,き,く,け,か";
    let escape_p = "<|y|c|$|\x1B|p";
    check(SMALL, escape_p, expect);
    check_with(Flags::FixCol, SMALL, escape_p, expect);
    check_with(Flags::ReadOnly, SMALL, escape_p, SMALL);
    check(SMALL, "<|y|c|$|\x1Bp", expect);
}

// ---------------------------------------------------------------------------
// Small documents
// ---------------------------------------------------------------------------

#[test]
fn replace_last_column() {
    check("a,b,c\n", "$|r|X", "a,b,X\n");
}

#[test]
fn untouched_document_round_trips() {
    check("a,b\r\nc,d", "", "a,b\r\nc,d");
}

#[test]
fn yank_cell_paste_over_elsewhere() {
    check("a,b\nc,d\n", "y|l|j|l|\x1B|p", "a,b\nc,a\n");
}

#[test]
fn deleting_the_only_row_leaves_an_empty_cell() {
    check("x", "D", "");
}

#[test]
fn toggle_quote_then_back() {
    check("a,b\n", "\"", "\"a\",b\n");
    check("\"a\",b\n", "\"", "a,b\n");
}

#[test]
fn protected_header_is_not_edited() {
    let mut protected = config(Flags::None);
    protected.protection.protect_header = true;
    let saved = saved_after(protected, b"h1,h2\nv1,v2\n", "r|X|j|r|Y");
    assert_eq!(saved, b"h1,h2\nY,v2\n");
}

// ---------------------------------------------------------------------------
// Quitting
// ---------------------------------------------------------------------------

#[test]
fn quit_offers_to_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let script = format!("r|X|q|y|{}", path.display());
    let (outcome, _) = replay(config(Flags::None), b"a,b\n", &script);
    assert_eq!(outcome, Outcome::Saved);
    assert_eq!(read(&path), b"X,b\n");
}

#[test]
fn quit_without_saving() {
    let (outcome, _) = replay(config(Flags::None), b"a,b\n", "r|X|q|n");
    assert_eq!(outcome, Outcome::Discarded);
}

#[test]
fn quit_unchanged_is_clean() {
    let (outcome, _) = replay(config(Flags::None), b"a,b\n", "j|q");
    assert_eq!(outcome, Outcome::Clean);
}

#[test]
fn overwrite_keeps_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    std::fs::write(&path, "a,b\n").unwrap();
    let script = format!("r|X|w|{}|y|q", path.display());
    let (outcome, _) = replay(config(Flags::None), b"a,b\n", &script);
    assert_eq!(outcome, Outcome::Clean);
    assert_eq!(read(&path), b"X,b\n");
    let mut backup = path.clone().into_os_string();
    backup.push("~");
    assert_eq!(read(Path::new(&backup)), b"a,b\n");
}

#[test]
fn validator_rejects_then_accepts() {
    let mut strict = config(Flags::None);
    strict.validator = Some(Box::new(|edit: &tabula_cli::tui::CellEdit<'_>| {
        if edit.text.chars().all(|c| c.is_ascii_digit()) {
            Ok(edit.text.to_string())
        } else {
            Err("digits only".to_string())
        }
    }));
    let saved = saved_after(strict, b"1,2\n", "r|abc|42");
    assert_eq!(saved, b"42,2\n");
}
