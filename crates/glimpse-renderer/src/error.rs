use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Why inline math could not be typeset.
#[derive(Debug, Error, Diagnostic)]
pub enum TypesetError {
    #[error("{0}")]
    #[diagnostic(code(glimpse::math::parse))]
    Parse(String),

    #[error("failed to write MathML: {0}")]
    #[diagnostic(code(glimpse::math::write))]
    Write(String),
}

/// Why a delegated render produced no artifact.
#[derive(Debug, Error, Diagnostic)]
pub enum DelegateError {
    #[error("failed to run {program}")]
    #[diagnostic(
        code(glimpse::delegate::spawn),
        help("check that it is installed and on PATH, or set its path under [latex]")
    )]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("LaTeX compilation failed. See log:\n\n{log}")]
    #[diagnostic(code(glimpse::delegate::latex))]
    Latex { log: String },

    #[error("dvisvgm conversion failed: {stderr}")]
    #[diagnostic(code(glimpse::delegate::dvisvgm))]
    Dvisvgm { stderr: String },

    #[error("renderer output is not UTF-8")]
    #[diagnostic(code(glimpse::delegate::utf8))]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("io error: {0}")]
    #[diagnostic(code(glimpse::delegate::io))]
    Io(#[from] std::io::Error),

    #[error("no artifact after {0:?}")]
    #[diagnostic(
        code(glimpse::delegate::timed_out),
        help("raise [latex] timeout_secs, or set it to 0 to wait indefinitely")
    )]
    TimedOut(Duration),
}
