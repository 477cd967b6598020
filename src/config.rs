//! Configuration options

use crate::{bars::KillScope, utils::deserialize_shellexpand};
use anyhow::{Context, Result};
use colored::Colorize;
use directories::BaseDirs;
use format_serde_error::SerdeError;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

/// Configuration file name
const CONFIG_FILE: &str = "polyctl.yml";

// ================ Global Settings =============== [[[

/// Settings that apply to the program as a whole
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GlobalSettings {
    /// Whether logs should be written to a file
    #[serde(alias = "log-to-file")]
    pub(crate) log_to_file: bool,

    /// The directory to write the log to
    #[serde(alias = "log-dir", deserialize_with = "deserialize_shellexpand")]
    pub(crate) log_dir: Option<PathBuf>,
} // ]]] === Global Settings ===

// ================ Polybar Settings ============== [[[

/// A theme's bar list and gap preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Theme {
    /// Bars to launch; empty means auto-detect from the theme's config
    pub(crate) bars: Vec<String>,

    /// Gaps between i3 and the bars
    pub(crate) gaps: Gaps,
}

/// Per-side gap sizes; unset sides fall back to the configured defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Gaps {
    /// Gap above the windows
    pub(crate) top:    Option<String>,
    /// Gap below the windows
    pub(crate) bottom: Option<String>,
    /// Gap left of the windows
    pub(crate) left:   Option<String>,
    /// Gap right of the windows
    pub(crate) right:  Option<String>,
}

/// Polybar-facing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PolybarSettings {
    /// Theme loaded when none is given on the command line
    pub(crate) theme: String,

    /// Directory holding one subdirectory per installed theme
    #[serde(alias = "themes-directory", deserialize_with = "deserialize_shellexpand")]
    pub(crate) themes_directory: Option<PathBuf>,

    /// Which processes the pre-launch cleanup may kill
    #[serde(alias = "kill-scope")]
    pub(crate) kill_scope: KillScope,

    /// Installed themes keyed by name, in declaration order
    pub(crate) themes: IndexMap<String, Theme>,
} // ]]] === Polybar Settings ===

// ================== i3 Settings ================= [[[

/// i3-facing settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct I3Settings {
    /// Gaps applied for the sides a theme leaves unset
    #[serde(alias = "default-gaps")]
    pub(crate) default_gaps: Gaps,
} // ]]] === i3 Settings ===

// =================== Config ===================== [[[

/// Configuration file to parse
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// Global settings
    #[serde(flatten)]
    pub(crate) global: GlobalSettings,

    /// Polybar settings: theme, themes root, cleanup policy
    pub(crate) polybar: PolybarSettings,

    /// i3 settings: default gaps
    pub(crate) i3wm: I3Settings,
}

impl Config {
    /// Create the default configuration file
    pub(crate) fn create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!("Creating configuration path: {}", path.display());
            fs::create_dir_all(path).context("unable to create configuration directory")?;
        }

        let path = path.join(CONFIG_FILE);
        log::debug!("{}: {}", "Configuration path".bright_blue(), path.display());

        if !path.is_file() {
            let initialization = include_str!("../example/polyctl.yml");

            let mut config_file: fs::File = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .open(&path)
                .with_context(|| {
                    format!("could not create polyctl config: '{}'", path.display())
                })?;

            config_file
                .write_all(initialization.as_bytes())
                .with_context(|| {
                    format!("could not create polyctl config: '{}'", path.display())
                })?;
            config_file.flush()?;
        }

        Self::load(path)
    }

    /// Load the configuration file from a given path
    pub(crate) fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = fs::read_to_string(path).context("failed to read config file")?;
        let res = serde_yaml::from_str(&file).map_err(|e| SerdeError::new(file, e))?;

        Ok(res)
    }

    /// Load the default configuration file
    pub(crate) fn load_default() -> Result<Self> {
        let path = PROJECT_DIRS.config_dir();
        log::debug!("loading default config: {}", path.display());
        Self::create_default(path)
    }

    /// Default location of the configuration file
    pub(crate) fn default_path() -> PathBuf {
        PROJECT_DIRS.config_dir().join(CONFIG_FILE)
    }

    /// Persist the configuration, recording the selected theme
    pub(crate) fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("failed to serialize configuration")?;

        fs::write(path, yaml)
            .with_context(|| format!("could not write polyctl config: '{}'", path.display()))
    }

    /// Absolute path of the themes root.
    ///
    /// A relative directory is taken relative to `$HOME`.
    pub(crate) fn themes_root(&self) -> Result<PathBuf> {
        let dir = self
            .polybar
            .themes_directory
            .clone()
            .context("please set polybar.themes-directory in polyctl.yml")?;

        if dir.is_absolute() {
            Ok(dir)
        } else {
            Ok(PROJECT_DIRS.home_dir().join(dir))
        }
    }
} // ]]] === Config ===

// ================ Project Dirs ================== [[[

/// Get the base [`PolyctlDirs`]
pub(crate) static PROJECT_DIRS: Lazy<PolyctlDirs> =
    Lazy::new(|| PolyctlDirs::new().expect("failed to get `PolyctlDirs`"));

/// Get the project directories relevant to [`polyctl`]
#[derive(Debug, Clone)]
pub(crate) struct PolyctlDirs {
    /// User's `$HOME` directory
    home_dir:   PathBuf,
    /// User's `$XDG_CONFIG_HOME/polyctl` directory
    config_dir: PathBuf,
}

impl PolyctlDirs {
    /// Create a new [`PolyctlDirs`]
    fn new() -> Option<Self> {
        Some(Self {
            home_dir:   Self::get_home_dir()?,
            config_dir: Self::get_config_dir()?,
        })
    }

    /// Wrapper function that makes it easier to get directories
    fn get_dir(env_var: &str, var: &str, join: &str) -> Option<PathBuf> {
        env::var_os(env_var).map(PathBuf::from).map_or_else(
            || {
                env::var_os(var)
                    .map(PathBuf::from)
                    .filter(|p| p.is_absolute())
                    .or_else(|| BaseDirs::new().map(|p| p.home_dir().join(join)))
                    .map(|p| p.join(env!("CARGO_PKG_NAME")))
            },
            |v| {
                // Custom env var is set
                if v.is_absolute() {
                    Some(v)
                } else {
                    BaseDirs::new()
                        .map(|p| p.home_dir().join(join))
                        .map(|p| p.join(env!("CARGO_PKG_NAME")))
                }
            },
        )
    }

    /// Get the `home` directory
    fn get_home_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|p| p.home_dir().to_path_buf())
    }

    /// Get the `config` directory
    fn get_config_dir() -> Option<PathBuf> {
        Self::get_dir("POLYCTL_CONFIG_DIR", "XDG_CONFIG_HOME", ".config")
    }

    /// Get configuration directory
    #[must_use]
    pub(crate) fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get home directory
    #[must_use]
    pub(crate) fn home_dir(&self) -> &Path {
        &self.home_dir
    }
} // ]]] === Project Dirs ===

// =============================== Tests ==============================
// ====================================================================

/// Tests for [`Config`] parsing
#[cfg(test)]
mod tests {
    use super::Config;
    use crate::bars::KillScope;

    /// A settings file naming two themes
    const SETTINGS: &str = "\
log-to-file: false
polybar:
  theme: material
  themes-directory: ~/.config/polybar/themes
  kill-scope: current-user
  themes:
    material:
      bars: [top, bottom]
      gaps:
        top: '5'
    nord:
      gaps: {}
i3wm:
  default-gaps:
    top: '0'
    bottom: '0'
";

    #[test]
    fn settings_round_trip_through_yaml() {
        let config: Config = serde_yaml::from_str(SETTINGS).expect("settings should parse");

        assert_eq!(config.polybar.theme, "material");
        assert_eq!(config.polybar.kill_scope, KillScope::CurrentUser);
        assert_eq!(
            config.polybar.themes.keys().collect::<Vec<_>>(),
            vec!["material", "nord"]
        );

        let material = &config.polybar.themes["material"];
        assert_eq!(material.bars, vec!["top", "bottom"]);
        assert_eq!(material.gaps.top.as_deref(), Some("5"));
        assert!(material.gaps.bottom.is_none());

        assert!(config.polybar.themes["nord"].bars.is_empty());
        assert_eq!(config.i3wm.default_gaps.top.as_deref(), Some("0"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = serde_yaml::from_str("polybar:\n  theme: nord\n")
            .expect("sparse settings should parse");

        assert_eq!(config.polybar.theme, "nord");
        assert_eq!(config.polybar.kill_scope, KillScope::SystemWide);
        assert!(config.polybar.themes.is_empty());
        assert!(!config.global.log_to_file);
    }
}
