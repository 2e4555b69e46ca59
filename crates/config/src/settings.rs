// Application settings
// Loaded from ~/.config/tabula/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use crate::theme::ThemeSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Same syntax as `-w`: "DEFAULT,COL:WIDTH,..."
    pub cell_width: String,
    pub header_lines: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_width: "14".to_string(),
            header_lines: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub fix_column: bool,
    pub protect_header: bool,
    pub read_only: bool,
    /// Drawn between cells; empty = none
    pub output_separator: String,
    /// How long one streamed-row pull may wait, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            fix_column: false,
            protect_header: false,
            read_only: false,
            output_separator: String::new(),
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    pub source: ThemeSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub editor: EditorSettings,
    pub theme: ThemeSettings,
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Error loading settings.toml: {}", e);
                eprintln!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_SETTINGS) {
            eprintln!("Error writing default settings.toml: {}", e);
        }
    }

    /// Get the config file path for display
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

const DEFAULT_SETTINGS: &str = r#"# tabula settings

[grid]
# Cell widths: "DEFAULT,COL:WIDTH,..." (same as -w)
cell_width = "14"
# Rows drawn as a fixed header
header_lines = 1

[editor]
# Forbid inserting and deleting columns
fix_column = false
# Forbid editing header rows
protect_header = false
read_only = false
# Drawn between cells
output_separator = ""
# Longest wait for one streamed row while idle (ms)
poll_interval_ms = 100

[theme]
# auto | dark | light | mono
source = "auto"
"#;
