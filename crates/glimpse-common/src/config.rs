use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::error::GlimpseError;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the editor posts document updates to.
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:42069".into(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Address of the editor's line listener, for click-to-jump.
    pub listener_addr: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            listener_addr: "127.0.0.1:42070".into(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LatexConfig {
    pub latex_bin: String,
    pub dvisvgm_bin: String,
    /// Passed to `dvisvgm --zoom`.
    pub zoom: f32,
    /// Seconds before a delegated render is given up on. 0 disables the limit.
    pub timeout_secs: u64,
}

impl LatexConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            latex_bin: "latex".into(),
            dvisvgm_bin: "dvisvgm".into(),
            zoom: 1.1,
            timeout_secs: 30,
        }
    }
}

/// Placeholder footprint heuristic, in CSS pixels.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PreviewConfig {
    pub block_height_px: u32,
    pub line_height_px: u32,
    pub inline_base_px: u32,
    pub inline_char_px: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            block_height_px: 50,
            line_height_px: 24,
            inline_base_px: 10,
            inline_char_px: 8,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub editor: EditorConfig,
    pub latex: LatexConfig,
    pub preview: PreviewConfig,
}

impl Config {
    pub fn load(config_file: impl AsRef<Path>) -> Result<Config, GlimpseError> {
        let path = config_file.as_ref();
        let config_string = fs::read_to_string(path).map_err(|source| GlimpseError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&config_string, env::vars()).map_err(|source| GlimpseError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse config text, substituting `$NAME` for each `(NAME, value)` pair first.
    pub fn parse(
        config: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Config, toml::de::Error> {
        let mut vars: Vec<_> = vars.into_iter().collect();
        // Longest names first so `$HOME_DIR` is not clobbered by `$HOME`.
        vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        let mut config_string = config.to_string();
        for (k, v) in vars {
            config_string = config_string.replace(&format!("${}", k), &v);
        }
        toml::from_str(&config_string)
    }

    /// Load from an explicit path, or from the default location if there is one.
    ///
    /// A missing default file is not an error; an explicit path must exist.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Config, GlimpseError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => {
                tracing::debug!("no config file found, using defaults");
                Ok(Config::default())
            }
        }
    }
}

/// `<platform config dir>/glimpse`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(crate::APP_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("", Vec::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.latex.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [latex]
            zoom = 1.5
            timeout_secs = 0

            [preview]
            block_height_px = 80
            "#,
            Vec::new(),
        )
        .unwrap();
        assert_eq!(config.latex.zoom, 1.5);
        assert_eq!(config.latex.latex_bin, "latex");
        assert_eq!(config.latex.timeout(), None);
        assert_eq!(config.preview.block_height_px, 80);
        assert_eq!(config.preview.inline_char_px, 8);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn substitutes_environment_variables() {
        let vars = vec![
            ("TEX".to_string(), "/opt/tex/bin/latex".to_string()),
            ("TEXLIVE".to_string(), "/opt/texlive".to_string()),
        ];
        let config = Config::parse(
            r#"
            [latex]
            latex_bin = "$TEX"
            dvisvgm_bin = "$TEXLIVE/dvisvgm"
            "#,
            vars,
        )
        .unwrap();
        assert_eq!(config.latex.latex_bin, "/opt/tex/bin/latex");
        assert_eq!(config.latex.dvisvgm_bin, "/opt/texlive/dvisvgm");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here/glimpse.toml").unwrap_err();
        assert!(matches!(err, GlimpseError::ConfigRead { .. }));
    }

    #[test]
    fn load_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[latex\nzoom = ").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, GlimpseError::ConfigParse { .. }));
    }
}
