//! Monitor topology queried from the X server through the `RandR` extension

use crate::error::Error;
use x11rb::{
    connection::Connection,
    protocol::randr::{self, ConnectionExt as _},
    rust_connection::RustConnection,
};

// ============================== Output ==============================
// ====================================================================

/// One physical output as reported by the X server
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Output {
    /// Stable connector identifier, e.g. `DP-4`
    pub(crate) name:       String,
    /// Whether a monitor is plugged into the connector
    pub(crate) connected:  bool,
    /// Whether the output currently drives a CRTC
    pub(crate) active:     bool,
    /// Top-left corner in the virtual screen; only meaningful when active
    pub(crate) position:   Option<(i16, i16)>,
    /// Width and height of the output's first advertised mode
    pub(crate) resolution: Option<(u16, u16)>,
    /// Whether the server designates this output as primary
    pub(crate) primary:    bool,
}

// =============================== Roles ==============================
// ====================================================================

/// Positional labels over the active outputs.
///
/// The primary output is `main` wherever it sits in the left-to-right
/// order. The remaining actives are assigned by sorted index: the first
/// is `left`, the second and third both land on `right` with the later
/// one keeping the slot. Theme configs written against that collapse
/// depend on it, so it is kept as-is.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Roles<'a> {
    /// The primary monitor
    pub(crate) main:  Option<&'a Output>,
    /// The leftmost non-primary monitor
    pub(crate) left:  Option<&'a Output>,
    /// The remaining non-primary monitor(s)
    pub(crate) right: Option<&'a Output>,
}

// ========================== DisplayCatalog ==========================
// ====================================================================

/// Connected outputs in ascending x-order, built fresh from a live query
#[derive(Debug, Clone)]
pub(crate) struct DisplayCatalog {
    /// Connected outputs, sorted left-to-right
    pub(crate) outputs: Vec<Output>,
}

impl DisplayCatalog {
    /// Query the X server for every connected output.
    ///
    /// The connection only lives for the duration of this call. An
    /// output whose CRTC cannot be fetched is recorded as inactive,
    /// not treated as a failure: a disabled output has no CRTC.
    pub(crate) fn enumerate() -> Result<Self, Error> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let root = conn.setup().roots[screen_num].root;

        let resources = conn.randr_get_screen_resources(root)?.reply()?;
        let primary = conn.randr_get_output_primary(root)?.reply()?.output;

        let mut outputs = Vec::with_capacity(resources.outputs.len());
        for &output in &resources.outputs {
            let info = conn
                .randr_get_output_info(output, resources.config_timestamp)?
                .reply()?;

            if info.connection != randr::Connection::CONNECTED {
                continue;
            }

            let name = String::from_utf8_lossy(&info.name).into_owned();

            let crtc = (info.crtc != x11rb::NONE)
                .then(|| conn.randr_get_crtc_info(info.crtc, resources.config_timestamp))
                .and_then(Result::ok)
                .and_then(|cookie| cookie.reply().ok());

            if crtc.is_none() {
                log::debug!("output {} is connected but inactive", name);
            }

            // "Best" mode is simply the first one the output advertises
            let resolution = info.modes.first().and_then(|&mode| {
                resources
                    .modes
                    .iter()
                    .find(|m| m.id == mode)
                    .map(|m| (m.width, m.height))
            });

            outputs.push(Output {
                name,
                connected: true,
                active: crtc.is_some(),
                position: crtc.as_ref().map(|c| (c.x, c.y)),
                resolution,
                primary: output == primary,
            });
        }

        Ok(Self { outputs: sort_left_to_right(outputs) })
    }

    /// Assign [`Roles`] over the active outputs
    pub(crate) fn roles(&self) -> Roles<'_> {
        let mut roles = Roles::default();
        let mut flank = 0_usize;

        for output in self.outputs.iter().filter(|o| o.active) {
            if output.primary {
                roles.main = Some(output);
                continue;
            }
            match flank {
                0 => roles.left = Some(output),
                1 | 2 => roles.right = Some(output),
                _ => log::warn!("output {} is too far right to receive a role", output.name),
            }
            flank += 1;
        }

        roles
    }
}

/// Sort outputs ascending by x-position, preserving discovery order on
/// ties. Inactive outputs have no position and sort last.
fn sort_left_to_right(mut outputs: Vec<Output>) -> Vec<Output> {
    outputs.sort_by_key(|o| o.position.map_or(i32::MAX, |(x, _)| i32::from(x)));
    outputs
}

// =============================== Tests ==============================
// ====================================================================

/// Tests for [`DisplayCatalog`] role assignment
#[cfg(test)]
mod tests {
    use super::{sort_left_to_right, DisplayCatalog, Output};

    /// Shorthand for building an [`Output`]
    fn output(name: &str, x: i16, active: bool, primary: bool) -> Output {
        Output {
            name: name.to_owned(),
            connected: true,
            active,
            position: active.then(|| (x, 0)),
            resolution: active.then(|| (1920, 1080)),
            primary,
        }
    }

    #[test]
    fn primary_maps_to_main_regardless_of_position() {
        for idx in 0..3_i16 {
            let outputs = (0..3_i16)
                .map(|i| output(&format!("DP-{}", i), i * 100, true, i == idx))
                .collect::<Vec<_>>();
            let catalog = DisplayCatalog { outputs };

            let roles = catalog.roles();
            assert_eq!(
                roles.main.map(|o| o.name.as_str()),
                Some(format!("DP-{}", idx).as_str())
            );
        }
    }

    #[test]
    fn three_monitors_flank_the_primary() {
        let catalog = DisplayCatalog {
            outputs: sort_left_to_right(vec![
                output("HDMI-0", 200, true, false),
                output("DP-2", 100, true, true),
                output("DP-4", 0, true, false),
            ]),
        };

        let roles = catalog.roles();
        assert_eq!(roles.left.map(|o| o.name.as_str()), Some("DP-4"));
        assert_eq!(roles.main.map(|o| o.name.as_str()), Some("DP-2"));
        assert_eq!(roles.right.map(|o| o.name.as_str()), Some("HDMI-0"));
    }

    #[test]
    fn second_and_third_flank_collapse_to_right() {
        // Four monitors: the two rightmost non-primaries both map to
        // the right slot and the later one wins it
        let catalog = DisplayCatalog {
            outputs: vec![
                output("DP-0", 0, true, true),
                output("DP-1", 100, true, false),
                output("DP-2", 200, true, false),
                output("DP-3", 300, true, false),
            ],
        };

        let roles = catalog.roles();
        assert_eq!(roles.left.map(|o| o.name.as_str()), Some("DP-1"));
        assert_eq!(roles.right.map(|o| o.name.as_str()), Some("DP-3"));
    }

    #[test]
    fn inactive_outputs_never_receive_a_role() {
        let catalog = DisplayCatalog {
            outputs: sort_left_to_right(vec![
                output("DP-0", 0, true, true),
                output("HDMI-1", 0, false, false),
            ]),
        };

        let roles = catalog.roles();
        assert_eq!(roles.main.map(|o| o.name.as_str()), Some("DP-0"));
        assert!(roles.left.is_none());
        assert!(roles.right.is_none());
    }

    #[test]
    fn inactive_outputs_sort_last() {
        let sorted = sort_left_to_right(vec![
            output("HDMI-1", 0, false, false),
            output("DP-1", 100, true, false),
            output("DP-0", 0, true, true),
        ]);

        let names = sorted.iter().map(|o| o.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["DP-0", "DP-1", "HDMI-1"]);
    }
}
