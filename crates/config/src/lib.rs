// Configuration loading

pub mod keybindings;
pub mod settings;
pub mod theme;

use std::path::PathBuf;

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "TABULA_CONFIG_DIR";

/// Directory holding settings.toml and keybindings.toml
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tabula")
}
