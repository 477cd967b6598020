//! Theme discovery and resolution of the bars a theme declares

use crate::{config::Theme, error::Error};
use anyhow::{anyhow, Context, Result};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs,
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

/// Name of the polybar configuration file inside a theme directory
pub(crate) const THEME_CONFIG: &str = "config";

/// Themes-root entry holding shared includes rather than a theme
const GLOBAL_DIR: &str = "global";

/// Matches a bar section header at the start of a line, capturing the
/// bar name: `[bar/main.top]` -> `main.top`
static BAR_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[bar/(.+?)\]").expect("bar section pattern is valid"));

// ========================== Installed Themes ========================
// ====================================================================

/// Themes installed under the themes root.
///
/// A theme is installed if a directory with its name exists under the
/// root. The `global` directory is shared between themes and skipped.
pub(crate) fn installed_themes(root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("failed to read themes from '{}'", root.display()))?;

    Ok(entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map_or(false, |t| t.is_dir()))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name != GLOBAL_DIR)
        .sorted()
        .collect())
}

/// Select a theme with `rofi -dmenu`
pub(crate) fn select_theme(themes: &[String]) -> Result<String> {
    let mut child = Command::new("rofi")
        .args(["-dmenu", "-i", "-p", "Select Polybar theme"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .context("failed to start rofi")?;

    child
        .stdin
        .as_mut()
        .context("rofi stdin was not captured")?
        .write_all(themes.join("\n").as_bytes())
        .context("failed to hand themes to rofi")?;

    let output = child.wait_with_output().context("rofi did not finish")?;
    if !output.status.success() {
        return Err(anyhow!("no theme was selected"));
    }

    let selection = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    log::info!("you selected: {}", selection);
    Ok(selection)
}

// ============================ Resolution ============================
// ====================================================================

/// The bars a theme wants launched.
///
/// An explicit `bars` list wins and the theme config is never opened.
/// Otherwise bar names are scanned out of the theme's polybar config,
/// in file order, duplicates preserved.
pub(crate) fn resolve_bars(theme: &Theme, config_path: &Path) -> Result<Vec<String>, Error> {
    if !theme.bars.is_empty() {
        log::info!("bars specified in the settings file");
        return Ok(theme.bars.clone());
    }

    log::info!(
        "no bars specified in the settings file, auto-detecting from '{}'",
        config_path.display()
    );
    let source =
        fs::read_to_string(config_path).map_err(|source| Error::ThemeFileNotFound {
            path: config_path.to_path_buf(),
            source,
        })?;

    let bars = parse_bars(&source);
    if bars.is_empty() {
        return Err(Error::NoBarsFound(config_path.to_path_buf()));
    }

    Ok(bars)
}

/// Scan a polybar config for `[bar/...]` section headers
fn parse_bars(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| BAR_SECTION.captures(line))
        .map(|caps| caps[1].to_owned())
        .collect()
}

// =============================== Tests ==============================
// ====================================================================

/// Tests for theme resolution
#[cfg(test)]
mod tests {
    use super::{installed_themes, parse_bars, resolve_bars};
    use crate::{config::Theme, error::Error};
    use std::{env, fs, path::PathBuf};

    /// Polybar config declaring two bars among unrelated sections
    const TWO_BARS: &str = "\
[colors]
background = #222

[bar/top]
monitor = ${env:MONITOR_MAIN}

[module/date]
type = internal/date

[bar/bottom]
monitor = ${env:MONITOR_LEFT}
";

    /// Create a scratch directory holding one file
    fn scratch_file(dir: &str, contents: &str) -> PathBuf {
        let root = env::temp_dir().join("polyctl-tests").join(dir);
        fs::create_dir_all(&root).expect("failed to create scratch dir");
        let path = root.join("config");
        fs::write(&path, contents).expect("failed to write scratch config");
        path
    }

    #[test]
    fn bar_sections_parse_in_file_order() {
        assert_eq!(parse_bars(TWO_BARS), vec!["top", "bottom"]);
    }

    #[test]
    fn duplicate_bar_sections_are_preserved() {
        assert_eq!(
            parse_bars("[bar/top]\n[bar/top]\n"),
            vec!["top", "top"]
        );
    }

    #[test]
    fn section_must_start_the_line() {
        assert!(parse_bars("  [bar/top]\nbar = [bar/top]\n").is_empty());
    }

    #[test]
    fn explicit_bars_win_without_touching_the_file() {
        let theme = Theme {
            bars: vec![String::from("top"), String::from("bottom")],
            ..Theme::default()
        };

        // The path does not exist; an explicit list must never open it
        let bars = resolve_bars(&theme, &PathBuf::from("/nonexistent/config"))
            .expect("explicit bars should resolve");
        assert_eq!(bars, vec!["top", "bottom"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let path = scratch_file("idempotent", TWO_BARS);
        let theme = Theme::default();

        let first = resolve_bars(&theme, &path).expect("bars should resolve");
        let second = resolve_bars(&theme, &path).expect("bars should resolve");
        assert_eq!(first, second);
    }

    #[test]
    fn config_without_bars_is_an_error() {
        let path = scratch_file("no-bars", "[colors]\nbackground = #222\n");

        match resolve_bars(&Theme::default(), &path) {
            Err(Error::NoBarsFound(p)) => assert_eq!(p, path),
            other => panic!("expected NoBarsFound, got {:?}", other),
        }
    }

    #[test]
    fn missing_config_is_an_error() {
        let missing = PathBuf::from("/nonexistent/polyctl/config");

        assert!(matches!(
            resolve_bars(&Theme::default(), &missing),
            Err(Error::ThemeFileNotFound { .. })
        ));
    }

    #[test]
    fn global_directory_is_not_a_theme() {
        let root = env::temp_dir().join("polyctl-tests").join("themes-root");
        for dir in ["material", "global", "nord"] {
            fs::create_dir_all(root.join(dir)).expect("failed to create theme dir");
        }

        let themes = installed_themes(&root).expect("themes root should list");
        assert_eq!(themes, vec!["material", "nord"]);
    }
}
