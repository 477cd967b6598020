//! i3 gap adjustment around the bars

use crate::config::Gaps;
use colored::Colorize;
use std::process::Command;

/// Sides i3 knows about, in the order they are applied
const SIDES: [&str; 4] = ["top", "bottom", "left", "right"];

/// Apply per-side gaps through `i3-msg`, falling back to `defaults`
/// for the sides the theme leaves unset.
///
/// Some polybar settings make i3 ignore the bar height; themes
/// compensate by requesting explicit gaps. Failures are logged per
/// side and never abort the run.
pub(crate) fn adjust(gaps: &Gaps, defaults: &Gaps) {
    let sizes = [&gaps.top, &gaps.bottom, &gaps.left, &gaps.right];
    let fallbacks = [
        &defaults.top,
        &defaults.bottom,
        &defaults.left,
        &defaults.right,
    ];

    for (idx, &side) in SIDES.iter().enumerate() {
        let (size, origin) = match (sizes[idx], fallbacks[idx]) {
            (Some(size), _) => (size, "theme"),
            (None, Some(size)) => (size, "default"),
            (None, None) => {
                log::debug!("no {} gap configured, leaving it untouched", side);
                continue;
            },
        };

        log::info!(
            "setting i3wm {} gap to {} ({})",
            side.green(),
            size.yellow(),
            origin
        );

        match Command::new("i3-msg")
            .args(["gaps", side, "all", "set", size.as_str()])
            .output()
        {
            Ok(output) if !output.status.success() => log::error!(
                "i3 rejected the {} gap: {}",
                side,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Ok(_) => {},
            Err(e) => log::error!("failed to invoke i3-msg: {}", e),
        }
    }
}
