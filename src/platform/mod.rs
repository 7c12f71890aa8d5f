// Bookmark sync platform paths
// Config and data directories for Linux, macOS and Windows.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "bookmark-sync";

#[cfg_attr(target_os = "windows", allow(dead_code))]
fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/bookmark-sync` or `~/.config/bookmark-sync`
/// - **macOS**: `~/Library/Application Support/bookmark-sync`
/// - **Windows**: `%APPDATA%/bookmark-sync`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA")
            .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
        PathBuf::from(appdata).join(APP_DIR)
    }
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join(APP_DIR)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR),
            _ => home_dir().join(".config").join(APP_DIR),
        }
    }
}

/// Returns the platform-specific data directory (where the database lives).
///
/// - **Linux**: `$XDG_DATA_HOME/bookmark-sync` or `~/.local/share/bookmark-sync`
/// - **macOS**: `~/Library/Application Support/bookmark-sync`
/// - **Windows**: `%APPDATA%/bookmark-sync`
pub fn get_data_dir() -> PathBuf {
    #[cfg(any(target_os = "windows", target_os = "macos"))]
    {
        get_config_dir()
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        match env::var("XDG_DATA_HOME") {
            Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR),
            _ => home_dir().join(".local").join("share").join(APP_DIR),
        }
    }
}
