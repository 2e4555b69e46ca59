// Keybinding configuration
// Defaults below; ~/.config/tabula/keybindings.toml overrides or extends them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybinding {
    pub key: String,
    pub command: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeybindingFile {
    #[serde(default)]
    binding: Vec<Keybinding>,
}

#[derive(Debug, Clone)]
pub struct KeybindingManager {
    // Maps normalized key name -> command id
    bindings: HashMap<String, String>,
}

impl Default for KeybindingManager {
    fn default() -> Self {
        let mut manager = Self {
            bindings: HashMap::new(),
        };
        manager.apply(default_keybindings());
        manager
    }
}

impl KeybindingManager {
    /// Defaults plus the user's keybindings.toml
    pub fn new() -> Self {
        let mut manager = Self::default();
        let path = Self::config_path();
        if !path.exists() {
            create_default_config(&path);
            return manager;
        }
        match load_user_bindings(&path) {
            Ok(user_bindings) => manager.apply(user_bindings),
            Err(e) => eprintln!("Error loading keybindings.toml: {}", e),
        }
        manager
    }

    pub fn config_path() -> PathBuf {
        crate::config_dir().join("keybindings.toml")
    }

    /// Add bindings; later ones win. Bindings to unknown commands are dropped.
    pub fn apply(&mut self, bindings: Vec<Keybinding>) {
        let known: HashSet<&'static str> = COMMANDS.iter().copied().collect();
        for binding in bindings {
            if !known.contains(binding.command.as_str()) {
                log::warn!("key {:?} bound to unknown command {:?}", binding.key, binding.command);
                continue;
            }
            self.bindings.insert(normalize_key(&binding.key), binding.command);
        }
    }

    /// Get command for a key name
    pub fn get_command(&self, key: &str) -> Option<&str> {
        self.bindings.get(&normalize_key(key)).map(String::as_str)
    }
}

pub fn load_user_bindings(path: &Path) -> Result<Vec<Keybinding>, String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    parse_bindings(&contents)
}

pub fn parse_bindings(contents: &str) -> Result<Vec<Keybinding>, String> {
    let file: KeybindingFile = toml::from_str(contents).map_err(|e| e.to_string())?;
    Ok(file.binding)
}

fn create_default_config(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Error creating config directory: {}", e);
            return;
        }
    }

    let default_config = r#"# Custom keybindings - these override defaults
#
# [[binding]]
# key = "ctrl+d"
# command = "cursor.pageDown"
#
# Key names: single characters (case-sensitive), ctrl+x, alt+x, up, down,
# left, right, home, end, pageup, pagedown, enter, tab, shift+tab, esc,
# backspace, delete, space, f1 ... f12
#
# Available commands:
#   app.quit, app.escape, view.repaint, file.save, file.encoding
#   cursor.down/up/left/right, cursor.lineStart/lineEnd
#   cursor.pageDown/pageUp, cursor.first/goPrefix/last
#   search.forward/backward/next/previous/wordForward/wordBackward
#   row.insertBelow/insertAbove/delete
#   cell.insert/append/replace/clear/toggleQuote/restore
#   yank.prefix, yank.row, delete.prefix
#   paste.after/before/over
#   column.widen/narrow
"#;

    if let Err(e) = fs::write(path, default_config) {
        eprintln!("Error writing default keybindings.toml: {}", e);
    }
}

/// Normalize key name to canonical form: "ctrl+shift+alt+key".
/// Named keys and modified letters are case-insensitive; a lone character
/// keeps its case, so "G" and "g" stay distinct.
pub fn normalize_key(key: &str) -> String {
    let (mods, main) = match key.strip_suffix("++") {
        Some(mods) => (mods, "+"),
        None if key == "+" => ("", "+"),
        None => match key.rsplit_once('+') {
            Some((mods, main)) => (mods, main),
            None => ("", key),
        },
    };

    let mut has_ctrl = false;
    let mut has_shift = false;
    let mut has_alt = false;
    for part in mods.split('+') {
        match part.trim().to_lowercase().as_str() {
            "ctrl" | "control" => has_ctrl = true,
            "shift" => has_shift = true,
            "alt" | "meta" => has_alt = true,
            _ => {}
        }
    }

    let main = if main.chars().count() == 1 && main != " " {
        if has_ctrl {
            main.to_lowercase()
        } else {
            main.to_string()
        }
    } else if main == " " {
        "space".to_string()
    } else {
        match main.trim().to_lowercase().as_str() {
            "escape" => "esc".to_string(),
            "return" => "enter".to_string(),
            "pgup" => "pageup".to_string(),
            "pgdn" => "pagedown".to_string(),
            "del" => "delete".to_string(),
            other => other.to_string(),
        }
    };

    let mut result = String::new();
    if has_ctrl { result.push_str("ctrl+"); }
    if has_shift { result.push_str("shift+"); }
    if has_alt { result.push_str("alt+"); }
    result.push_str(&main);
    result
}

/// Every command id a key may be bound to
pub const COMMANDS: &[&str] = &[
    "app.quit",
    "app.escape",
    "view.repaint",
    "file.encoding",
    "file.save",
    "cursor.down",
    "cursor.up",
    "cursor.left",
    "cursor.right",
    "cursor.lineStart",
    "cursor.lineEnd",
    "cursor.pageDown",
    "cursor.pageUp",
    "cursor.first",
    "cursor.goPrefix",
    "cursor.last",
    "search.forward",
    "search.backward",
    "search.next",
    "search.previous",
    "search.wordForward",
    "search.wordBackward",
    "row.insertBelow",
    "row.insertAbove",
    "row.delete",
    "cell.insert",
    "cell.append",
    "cell.replace",
    "cell.clear",
    "cell.toggleQuote",
    "cell.restore",
    "yank.prefix",
    "yank.row",
    "delete.prefix",
    "paste.after",
    "paste.before",
    "paste.over",
    "column.widen",
    "column.narrow",
];

pub fn default_keybindings() -> Vec<Keybinding> {
    let table: &[(&str, &str)] = &[
        ("q", "app.quit"),
        ("esc", "app.escape"),
        ("ctrl+l", "view.repaint"),
        ("L", "file.encoding"),
        ("w", "file.save"),
        // Cursor
        ("j", "cursor.down"),
        ("down", "cursor.down"),
        ("ctrl+n", "cursor.down"),
        ("enter", "cursor.down"),
        ("k", "cursor.up"),
        ("up", "cursor.up"),
        ("ctrl+p", "cursor.up"),
        ("h", "cursor.left"),
        ("left", "cursor.left"),
        ("shift+tab", "cursor.left"),
        ("l", "cursor.right"),
        ("right", "cursor.right"),
        ("tab", "cursor.right"),
        ("0", "cursor.lineStart"),
        ("^", "cursor.lineStart"),
        ("ctrl+a", "cursor.lineStart"),
        ("$", "cursor.lineEnd"),
        ("ctrl+e", "cursor.lineEnd"),
        ("ctrl+f", "cursor.pageDown"),
        ("pagedown", "cursor.pageDown"),
        ("ctrl+b", "cursor.pageUp"),
        ("pageup", "cursor.pageUp"),
        ("g", "cursor.goPrefix"),
        ("<", "cursor.first"),
        (">", "cursor.last"),
        ("G", "cursor.last"),
        // Search
        ("/", "search.forward"),
        ("?", "search.backward"),
        ("n", "search.next"),
        ("N", "search.previous"),
        ("*", "search.wordForward"),
        ("#", "search.wordBackward"),
        // Rows and cells
        ("o", "row.insertBelow"),
        ("O", "row.insertAbove"),
        ("D", "row.delete"),
        ("i", "cell.insert"),
        ("a", "cell.append"),
        ("r", "cell.replace"),
        ("R", "cell.replace"),
        ("f2", "cell.replace"),
        ("x", "cell.clear"),
        ("\"", "cell.toggleQuote"),
        ("u", "cell.restore"),
        // Clipboard
        ("y", "yank.prefix"),
        ("Y", "yank.row"),
        ("d", "delete.prefix"),
        ("p", "paste.after"),
        ("P", "paste.before"),
        ("alt+p", "paste.over"),
        // Columns
        ("]", "column.widen"),
        ("[", "column.narrow"),
    ];
    table
        .iter()
        .map(|(key, command)| Keybinding {
            key: key.to_string(),
            command: command.to_string(),
        })
        .collect()
}
