//! Error types for glimpse configuration and settings handling

use miette::Diagnostic;
use std::path::PathBuf;

/// Main error type for glimpse settings operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum GlimpseError {
    /// Config file could not be read
    #[error("error reading config file {}", path.display())]
    #[diagnostic(code(glimpse::config::read))]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::Config`]
    #[error("error parsing config file {}", path.display())]
    #[diagnostic(
        code(glimpse::config::parse),
        help("valid sections are [server], [editor], [latex] and [preview]")
    )]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No platform config directory and no explicit path given
    #[error("could not resolve a config directory for glimpse")]
    #[diagnostic(code(glimpse::config::no_dir), help("pass --config FILE"))]
    NoConfigDir,

    /// Preamble file import failed
    #[error("failed to import preamble from {}", path.display())]
    #[diagnostic(code(glimpse::preamble::import))]
    PreambleImport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Preamble file removal failed
    #[error("failed to reset preamble at {}", path.display())]
    #[diagnostic(code(glimpse::preamble::reset))]
    PreambleReset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Preamble import was given something that is not a `.tex` file
    #[error("not a LaTeX file: {}", path.display())]
    #[diagnostic(code(glimpse::preamble::not_tex))]
    NotTex { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = GlimpseError::NotTex {
            path: PathBuf::from("/tmp/preamble.txt"),
        };
        assert_eq!(err.to_string(), "not a LaTeX file: /tmp/preamble.txt");
        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("glimpse::preamble::not_tex".to_string())
        );
    }
}
