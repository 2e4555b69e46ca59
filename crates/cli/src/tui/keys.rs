// Key names
// Input sources report keys by the names keybindings.toml uses ("j", "G",
// "ctrl+f", "alt+p", "pagedown", ...). Raw byte tokens (scripts) and
// crossterm events are both translated here.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tabula_config::keybindings::normalize_key;

pub const ENTER: &str = "enter";
pub const ESC: &str = "esc";
pub const TAB: &str = "tab";
pub const SPACE: &str = "space";

/// Name of a raw terminal byte sequence: control characters, `ESC x` for
/// alt, and the common CSI/SS3 sequences. Plain text names itself.
pub fn token_name(token: &str) -> String {
    let named = match token {
        "\r" => Some(ENTER),
        "\t" => Some(TAB),
        " " => Some(SPACE),
        "\x1B" => Some(ESC),
        "\x7F" | "\x08" => Some("backspace"),
        "\x1B[A" | "\x1BOA" => Some("up"),
        "\x1B[B" | "\x1BOB" => Some("down"),
        "\x1B[C" | "\x1BOC" => Some("right"),
        "\x1B[D" | "\x1BOD" => Some("left"),
        "\x1B[H" | "\x1BOH" | "\x1B[1~" => Some("home"),
        "\x1B[F" | "\x1BOF" | "\x1B[4~" => Some("end"),
        "\x1B[5~" => Some("pageup"),
        "\x1B[6~" => Some("pagedown"),
        "\x1B[3~" => Some("delete"),
        "\x1B[Z" => Some("shift+tab"),
        "\x1BOP" => Some("f1"),
        "\x1BOQ" | "\x1B[12~" => Some("f2"),
        _ => None,
    };
    if let Some(name) = named {
        return name.to_string();
    }

    let mut chars = token.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, None) if ('\x01'..='\x1A').contains(&c) => {
            let letter = (b'a' + (c as u8) - 1) as char;
            format!("ctrl+{}", letter)
        }
        (Some('\x1B'), Some(c), None) => normalize_key(&format!("alt+{}", c)),
        _ => token.to_string(),
    }
}

/// Name of a crossterm key press; `None` for releases and keys without a name.
pub fn event_name(event: &KeyEvent) -> Option<String> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    let base = match event.code {
        KeyCode::Char(' ') if !ctrl && !alt => return Some(SPACE.to_string()),
        KeyCode::Char(c) => {
            let c = if ctrl { c.to_ascii_lowercase() } else { c };
            let mut name = String::new();
            if ctrl {
                name.push_str("ctrl+");
            }
            if alt {
                name.push_str("alt+");
            }
            name.push(c);
            return Some(name);
        }
        KeyCode::Enter => ENTER.to_string(),
        KeyCode::Tab => TAB.to_string(),
        KeyCode::BackTab => return Some("shift+tab".to_string()),
        KeyCode::Esc => ESC.to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::F(n) => format!("f{}", n),
        _ => return None,
    };
    let mut name = String::new();
    if ctrl {
        name.push_str("ctrl+");
    }
    if event.modifiers.contains(KeyModifiers::SHIFT) {
        name.push_str("shift+");
    }
    if alt {
        name.push_str("alt+");
    }
    name.push_str(&base);
    Some(name)
}

/// Unit chosen after `y` or `d`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Cell,
    Row,
    Column,
}

/// `row_key` is the doubled command key (`y` for `yy`, `d` for `dd`).
pub fn unit_of(key: &str, row_key: &str) -> Option<Unit> {
    match key {
        "l" | "v" | SPACE | TAB | "ctrl+f" | "right" => Some(Unit::Cell),
        "r" => Some(Unit::Row),
        k if k == row_key => Some(Unit::Row),
        "|" | "c" => Some(Unit::Column),
        _ => None,
    }
}
