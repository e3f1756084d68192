//! Platform directories used by minipack

use std::path::PathBuf;

use etcetera::{BaseStrategy, choose_base_strategy};

/// File name of both the user-level and the project-level configuration
pub const CONFIG_FILE_NAME: &str = "minipack.toml";

/// `<config dir>/minipack`: `$XDG_CONFIG_HOME` (or `~/.config`) on Unix,
/// `%APPDATA%` on Windows
pub fn user_config_dir() -> Option<PathBuf> {
    choose_base_strategy()
        .ok()
        .map(|strategy| strategy.config_dir().join("minipack"))
}

/// Location of the user-level configuration file, whether or not it exists
pub fn user_config_file() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}
