//! Errors found throughout this crate

use std::{io, path::PathBuf};
use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};

/// Errors that occur while resolving monitors, themes, and bars
#[derive(Debug, Error)]
pub(crate) enum Error {
    /// Failure to connect to the server
    #[error("failed to connect to the X11 server: {0}")]
    Connection(#[from] ConnectError),

    /// The connection to the server broke down mid-request
    #[error("lost the connection to the X11 server: {0}")]
    ConnectionLost(#[from] ConnectionError),

    /// The server failed or rejected a display query
    #[error("the X11 server failed a display query: {0}")]
    Reply(#[from] ReplyError),

    /// The selected theme has no directory under the themes root
    #[error("theme {0:?} was not found")]
    UnknownTheme(String),

    /// The theme's polybar configuration could not be read
    #[error("failed to read theme config '{}': {source}", path.display())]
    ThemeFileNotFound {
        /// Path that was attempted
        path:   PathBuf,
        /// Underlying I/O failure
        source: io::Error,
    },

    /// The theme declared no bars and its config contains no bar sections
    #[error("no bars found in '{}'", .0.display())]
    NoBarsFound(PathBuf),
}
