//! The LaTeX + dvisvgm delegate: each request is compiled as a standalone
//! document in a scratch directory and converted to SVG.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{PoisonError, RwLock};

use glimpse_common::{DEFAULT_PREAMBLE, LatexConfig};
use tokio::process::Command;

use crate::client::DelegatedRenderer;
use crate::error::DelegateError;
use crate::request::DelegateRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct LatexOptions {
    pub latex_bin: PathBuf,
    pub dvisvgm_bin: PathBuf,
    pub zoom: f32,
}

impl Default for LatexOptions {
    fn default() -> Self {
        Self::from(&LatexConfig::default())
    }
}

impl From<&LatexConfig> for LatexOptions {
    fn from(config: &LatexConfig) -> Self {
        Self {
            latex_bin: PathBuf::from(&config.latex_bin),
            dvisvgm_bin: PathBuf::from(&config.dvisvgm_bin),
            zoom: config.zoom,
        }
    }
}

/// Renders math by shelling out to `latex` and `dvisvgm`.
///
/// The preamble can be swapped at runtime; requests already dispatched keep
/// the preamble they started with.
#[derive(Debug)]
pub struct LatexRenderer {
    options: LatexOptions,
    preamble: RwLock<String>,
}

impl LatexRenderer {
    pub fn new(options: LatexOptions, preamble: impl Into<String>) -> Self {
        Self {
            options,
            preamble: RwLock::new(preamble.into()),
        }
    }

    pub fn preamble(&self) -> String {
        self.preamble
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_preamble(&self, preamble: impl Into<String>) {
        *self
            .preamble
            .write()
            .unwrap_or_else(PoisonError::into_inner) = preamble.into();
    }
}

impl Default for LatexRenderer {
    fn default() -> Self {
        Self::new(LatexOptions::default(), DEFAULT_PREAMBLE)
    }
}

impl DelegatedRenderer for LatexRenderer {
    fn render(
        &self,
        request: DelegateRequest,
    ) -> impl Future<Output = Result<String, DelegateError>> + Send + 'static {
        LatexJob {
            options: self.options.clone(),
            preamble: self.preamble(),
            request,
        }
        .run()
    }
}

/// Wrap an expression in a standalone document. Inline expressions get `$...$`.
pub fn tex_document(tex: &str, display_mode: bool, preamble: &str) -> String {
    let body = if display_mode {
        tex.to_owned()
    } else {
        format!("${tex}$")
    };
    format!(
        r"\documentclass[dvisvgm, preview, 12pt]{{standalone}}
\usepackage[utf8]{{inputenc}}
{preamble}
\begin{{document}}
{body}
\end{{document}}
"
    )
}

/// Scratch file stem for a request id. Ids come from our own counter, but
/// anything unexpected is kept out of the path.
fn file_stem(id: &str) -> &str {
    let safe = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe { id } else { "input" }
}

struct LatexJob {
    options: LatexOptions,
    preamble: String,
    request: DelegateRequest,
}

impl LatexJob {
    async fn run(self) -> Result<String, DelegateError> {
        let dir = tempfile::tempdir()?;
        let stem = file_stem(&self.request.id);
        let tex_path = dir.path().join(format!("{stem}.tex"));
        let document = tex_document(&self.request.tex, self.request.display_mode, &self.preamble);
        tokio::fs::write(&tex_path, document).await?;

        let latex = run(
            Command::new(&self.options.latex_bin)
                .arg("-interaction=nonstopmode")
                .arg("-output-directory")
                .arg(dir.path())
                .arg(&tex_path),
            &self.options.latex_bin,
        )
        .await?;
        if !latex.status.success() {
            let log = read_log(&dir.path().join(format!("{stem}.log"))).await;
            return Err(DelegateError::Latex { log });
        }

        let dvi_path = dir.path().join(format!("{stem}.dvi"));
        let dvisvgm = run(
            Command::new(&self.options.dvisvgm_bin)
                .arg(format!("--zoom={}", self.options.zoom))
                .arg("--exact-bbox")
                .arg("--stdout")
                .arg(&dvi_path),
            &self.options.dvisvgm_bin,
        )
        .await?;
        if !dvisvgm.status.success() {
            return Err(DelegateError::Dvisvgm {
                stderr: String::from_utf8_lossy(&dvisvgm.stderr).into_owned(),
            });
        }

        tracing::trace!(
            target: "glimpse::resolve",
            id = %self.request.id,
            bytes = dvisvgm.stdout.len(),
            "dvisvgm produced svg"
        );
        Ok(String::from_utf8(dvisvgm.stdout)?)
    }
}

async fn run(command: &mut Command, program: &Path) -> Result<Output, DelegateError> {
    command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| DelegateError::Spawn {
            program: program.display().to_string(),
            source,
        })
}

async fn read_log(path: &Path) -> String {
    tokio::fs::read_to_string(path)
        .await
        .unwrap_or_else(|_| "Could not read LaTeX log.".to_owned())
}
