//! Default paths for pushupd components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/pushupd/config.toml` or `~/.config/pushupd/config.toml`
//! - Data: `$XDG_DATA_HOME/pushupd` or `~/.local/share/pushupd`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const PUSHUP_CONFIG_ENV: &str = "PUSHUP_CONFIG";

/// Environment variable for overriding the data directory
pub const PUSHUP_DATA_DIR_ENV: &str = "PUSHUP_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "pushupd";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "pushupd.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$PUSHUP_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/pushupd/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/pushupd/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(PUSHUP_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$PUSHUP_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/pushupd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/pushupd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(PUSHUP_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking PUSHUP_DATA_DIR env var.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Default database location inside the data directory
pub fn default_database_path() -> PathBuf {
    default_data_dir().join(DATABASE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_config_toml() {
        let path = default_config_path();
        assert!(path.to_string_lossy().ends_with(".toml"));
    }

    #[test]
    fn data_dir_contains_pushupd() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("pushupd"));
    }

    #[test]
    fn database_lives_in_data_dir() {
        let db = default_database_path();
        assert_eq!(db.file_name().unwrap(), DATABASE_FILENAME);
    }
}
