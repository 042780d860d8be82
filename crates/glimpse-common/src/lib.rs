//! glimpse-common: configuration, preamble storage, errors and telemetry
//! shared by the renderer and the preview server.

pub mod config;
pub mod error;
pub mod perf;
pub mod preamble;
pub mod telemetry;

pub use crate::config::{Config, EditorConfig, LatexConfig, PreviewConfig, ServerConfig};
pub use crate::error::GlimpseError;
pub use crate::preamble::{DEFAULT_PREAMBLE, PreambleStore};

/// Application name, used for the config directory and log file prefix.
pub const APP_NAME: &str = "glimpse";

/// Short display name for a file path: the last `/` or `\` separated component.
pub fn short_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
