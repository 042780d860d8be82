//! User LaTeX preamble, stored as `preamble.tex` in the glimpse config directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GlimpseError;

pub const PREAMBLE_FILENAME: &str = "preamble.tex";

pub const DEFAULT_PREAMBLE: &str = r#"
    \usepackage{amsmath}
    \usepackage{amssymb}
    \usepackage{amsfonts}
"#;

/// Reads, imports and resets the preamble file.
///
/// Every read falls back to [`DEFAULT_PREAMBLE`] when no custom file exists
/// or it cannot be read.
#[derive(Debug, Clone)]
pub struct PreambleStore {
    dir: PathBuf,
}

impl PreambleStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Store rooted at the platform config directory.
    pub fn default_location() -> Result<Self, GlimpseError> {
        crate::config::config_dir()
            .map(Self::new)
            .ok_or(GlimpseError::NoConfigDir)
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PREAMBLE_FILENAME)
    }

    /// Whether a custom preamble file is present.
    pub fn is_custom(&self) -> bool {
        self.path().is_file()
    }

    pub fn load(&self) -> String {
        let path = self.path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => return content,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "error reading preamble file"
                    );
                }
            }
        }
        DEFAULT_PREAMBLE.to_string()
    }

    /// Copy a `.tex` file into place as the custom preamble and return its contents.
    pub fn import(&self, source: impl AsRef<Path>) -> Result<String, GlimpseError> {
        let source = source.as_ref();
        if source.extension().and_then(|ext| ext.to_str()) != Some("tex") {
            return Err(GlimpseError::NotTex {
                path: source.to_path_buf(),
            });
        }
        let import_err = |source_err| GlimpseError::PreambleImport {
            path: source.to_path_buf(),
            source: source_err,
        };
        let content = fs::read_to_string(source).map_err(import_err)?;
        fs::create_dir_all(&self.dir).map_err(import_err)?;
        fs::write(self.path(), &content).map_err(import_err)?;
        tracing::info!(from = %source.display(), "preamble imported");
        Ok(content)
    }

    /// Remove the custom preamble; returns the default that now applies.
    pub fn reset(&self) -> Result<String, GlimpseError> {
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path).map_err(|source| GlimpseError::PreambleReset {
                path: path.clone(),
                source,
            })?;
            tracing::info!(path = %path.display(), "preamble reset to default");
        }
        Ok(DEFAULT_PREAMBLE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreambleStore::new(dir.path());
        assert!(!store.is_custom());
        assert_eq!(store.load(), DEFAULT_PREAMBLE);
    }

    #[test]
    fn import_then_reset() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mine.tex");
        fs::write(&source, r"\usepackage{physics}").unwrap();

        // Config dir does not exist yet; import creates it.
        let store = PreambleStore::new(dir.path().join("config"));
        let imported = store.import(&source).unwrap();
        assert_eq!(imported, r"\usepackage{physics}");
        assert!(store.is_custom());
        assert_eq!(store.load(), r"\usepackage{physics}");

        assert_eq!(store.reset().unwrap(), DEFAULT_PREAMBLE);
        assert!(!store.is_custom());
        assert_eq!(store.load(), DEFAULT_PREAMBLE);

        // Resetting twice is fine.
        assert!(store.reset().is_ok());
    }

    #[test]
    fn import_rejects_non_tex() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.md");
        fs::write(&source, "# hi").unwrap();
        let store = PreambleStore::new(dir.path());
        assert!(matches!(
            store.import(&source),
            Err(GlimpseError::NotTex { .. })
        ));
        assert!(!store.is_custom());
    }

    #[test]
    fn import_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreambleStore::new(dir.path());
        assert!(matches!(
            store.import(dir.path().join("gone.tex")),
            Err(GlimpseError::PreambleImport { .. })
        ));
    }
}
