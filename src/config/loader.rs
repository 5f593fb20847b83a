use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::types::AppConfig;

/// Discover and load the app config.
///
/// Priority:
/// 1. `--config` flag (explicit path, must exist)
/// 2. `$NUTRI_BOARD_CONFIG` environment variable
/// 3. `$XDG_CONFIG_HOME/nutri-board/config.toml`
/// 4. `~/.config/nutri-board/config.toml`
///
/// With no file found the built-in defaults are used. Either way the
/// per-view defaults are applied before returning.
pub fn load_config(explicit_path: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config(),
    };

    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            parse_file(&path)?
        }
        None => AppConfig::default(),
    };
    Ok(config.with_view_defaults())
}

pub fn parse_file(path: &Path) -> Result<AppConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_str(&contents).with_context(|| format!("parsing TOML from {}", path.display()))
}

pub fn parse_str(contents: &str) -> Result<AppConfig> {
    Ok(toml::from_str(contents)?)
}

fn find_config() -> Option<PathBuf> {
    let candidates = [
        std::env::var_os("NUTRI_BOARD_CONFIG").map(PathBuf::from),
        std::env::var_os("XDG_CONFIG_HOME")
            .map(|xdg| PathBuf::from(xdg).join("nutri-board/config.toml")),
        home_dir().map(|home| home.join(".config/nutri-board/config.toml")),
    ];
    candidates.into_iter().flatten().find(|p| p.is_file())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand a leading `~/` in a configured path.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
