//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/golden-plot/`
//! - macOS: `~/Library/Application Support/golden-plot/`
//! - Windows: `%APPDATA%\golden-plot\`

use std::path::{Component, Path, PathBuf};

/// Application name used for config directories
const APP_NAME: &str = "golden-plot";

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "GOLDEN_PLOT_CONFIG";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// `GOLDEN_PLOT_CONFIG` takes precedence over the platform config directory.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve `path` against `base` unless it is already absolute
///
/// The result is lexically normalized, so `./a.png` and `a.png` resolve to
/// the same path.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        normalize(&base.join(path))
    } else {
        normalize(path)
    }
}

/// Drop `.` components and fold `name/..` pairs without touching the disk
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Directory that relative paths in a suite file resolve against
pub fn suite_dir(suite_path: &Path) -> PathBuf {
    match suite_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
