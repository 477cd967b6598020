//! Environment variables handed to launched bars

use crate::display::DisplayCatalog;
use itertools::Itertools;
use std::path::Path;

/// Variable polybar configs read to locate the active theme
const THEME_VAR: &str = "polybar_theme";

/// Environment variables describing the monitor layout and theme.
///
/// Roles that did not resolve simply omit their variable; the pairs
/// are applied on top of the inherited environment at spawn time, so
/// later entries win on duplicate keys.
pub(crate) fn build(catalog: &DisplayCatalog, theme_path: &Path) -> Vec<(String, String)> {
    let roles = catalog.roles();
    let mut env = Vec::with_capacity(4);

    if let Some(main) = roles.main {
        env.push((String::from("MONITOR_MAIN"), main.name.clone()));
    } else {
        log::warn!("no primary monitor resolved, MONITOR_MAIN will not be set");
    }
    if let Some(left) = roles.left {
        env.push((String::from("MONITOR_LEFT"), left.name.clone()));
    }
    if let Some(right) = roles.right {
        env.push((String::from("MONITOR_RIGHT"), right.name.clone()));
    }
    env.push((String::from(THEME_VAR), theme_path.display().to_string()));

    log::debug!(
        "bar environment: {}",
        env.iter().map(|(k, v)| format!("{}={}", k, v)).join(" ")
    );

    env
}

// =============================== Tests ==============================
// ====================================================================

/// Tests for the bar environment
#[cfg(test)]
mod tests {
    use super::build;
    use crate::display::{DisplayCatalog, Output};
    use std::path::Path;

    /// Shorthand for building an [`Output`]
    fn output(name: &str, x: i16, primary: bool) -> Output {
        Output {
            name: name.to_owned(),
            connected: true,
            active: true,
            position: Some((x, 0)),
            resolution: Some((2560, 1440)),
            primary,
        }
    }

    /// Value of `key`, if present
    fn lookup<'a>(env: &'a [(String, String)], key: &str) -> Option<&'a str> {
        env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn lone_primary_sets_only_main() {
        let catalog = DisplayCatalog { outputs: vec![output("eDP-1", 0, true)] };
        let env = build(&catalog, Path::new("/themes/material/config"));

        assert_eq!(lookup(&env, "MONITOR_MAIN"), Some("eDP-1"));
        assert_eq!(lookup(&env, "MONITOR_LEFT"), None);
        assert_eq!(lookup(&env, "MONITOR_RIGHT"), None);
        assert_eq!(
            lookup(&env, "polybar_theme"),
            Some("/themes/material/config")
        );
    }

    #[test]
    fn center_primary_is_flanked() {
        let catalog = DisplayCatalog {
            outputs: vec![
                output("DP-4", 0, false),
                output("DP-2", 100, true),
                output("HDMI-0", 200, false),
            ],
        };
        let env = build(&catalog, Path::new("/themes/material/config"));

        assert_eq!(lookup(&env, "MONITOR_LEFT"), Some("DP-4"));
        assert_eq!(lookup(&env, "MONITOR_MAIN"), Some("DP-2"));
        assert_eq!(lookup(&env, "MONITOR_RIGHT"), Some("HDMI-0"));
    }

    #[test]
    fn missing_primary_omits_main() {
        let catalog = DisplayCatalog {
            outputs: vec![output("DP-4", 0, false), output("DP-2", 100, false)],
        };
        let env = build(&catalog, Path::new("/themes/material/config"));

        assert_eq!(lookup(&env, "MONITOR_MAIN"), None);
        assert_eq!(lookup(&env, "MONITOR_LEFT"), Some("DP-4"));
        assert_eq!(lookup(&env, "MONITOR_RIGHT"), Some("DP-2"));
        assert!(lookup(&env, "polybar_theme").is_some());
    }
}
