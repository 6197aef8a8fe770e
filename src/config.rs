use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{NavError, NavResult};

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub navigation: NavigationConfig,
    pub logging: LoggingConfig,
}

/// Settings shared by every navigator built from the same configuration.
///
/// Handed to each navigator at construction time, so two coordinators in the
/// same process can run with different settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NavigationConfig {
    /// Prefix of generated modal names (`Modal3` for priority 3).
    pub modal_name_prefix: String,
    /// Skip per-entry transitions on every stack navigator.
    pub suppress_transitions: bool,
    /// Priority given to the first modal opened without an explicit one.
    pub first_modal_priority: i32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            modal_name_prefix: "Modal".to_string(),
            suppress_transitions: false,
            first_modal_priority: 1,
        }
    }
}

impl NavigationConfig {
    pub fn modal_name(&self, priority: i32) -> String {
        format!("{}{priority}", self.modal_name_prefix)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

impl Config {
    pub fn load() -> NavResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> NavResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(NavError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            NavError::io_with_context(source, format!("failed to read config: {}", path.display()))
        })?;
        let parsed = toml::from_str::<Self>(&raw).map_err(|source| {
            NavError::invalid_argument(format!(
                "failed to parse config {}: {source}",
                path.display()
            ))
        })?;
        Ok(parsed.sanitized())
    }

    fn sanitized(mut self) -> Self {
        let defaults = NavigationConfig::default();
        if self.navigation.modal_name_prefix.trim().is_empty() {
            self.navigation.modal_name_prefix = defaults.modal_name_prefix;
        }
        if self.logging.filter.trim().is_empty() {
            self.logging.filter = LoggingConfig::default().filter;
        }
        self
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("SECNAV_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("secnav").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("secnav")
                .join("config.toml"),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("secnav").join("config.toml"));
    }
    None
}
