//! Configuration management for Stencil.
//!
//! Parses `stencil.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [render]
//! parts = ["word/document.xml", "word/header*.xml", "word/footer*.xml"]
//!
//! [[render.unique_ids]]
//! element = "docPr"
//! attribute = "id"
//!
//! [images]
//! media_dir = "word/media"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the part name patterns to render.
    pub parts: Option<Vec<String>>,
    /// Override the media directory.
    pub media_dir: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "stencil.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directive rendering configuration.
    pub render: RenderConfig,
    /// Image embedding configuration.
    pub images: ImagesConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Directive rendering configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Glob patterns of part names whose directives are evaluated.
    pub parts: Vec<String>,
    /// Identifier attributes that must stay unique within a part.
    pub unique_ids: Vec<UniqueIdConfig>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            parts: vec![
                "word/document.xml".to_owned(),
                "word/header*.xml".to_owned(),
                "word/footer*.xml".to_owned(),
            ],
            unique_ids: vec![
                UniqueIdConfig::new("docPr", "id"),
                UniqueIdConfig::new("cNvPr", "id"),
            ],
        }
    }
}

impl RenderConfig {
    /// Whether `part` matches one of the configured part patterns.
    ///
    /// Invalid patterns never match; [`Config::validate`] rejects them on load.
    #[must_use]
    pub fn matches_part(&self, part: &str) -> bool {
        self.parts.iter().any(|pattern| {
            glob::Pattern::new(pattern).is_ok_and(|pattern| pattern.matches(part))
        })
    }
}

/// An element/attribute pair whose values are renumbered after duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct UniqueIdConfig {
    /// Element local name, e.g. `docPr`.
    pub element: String,
    /// Attribute local name, e.g. `id`.
    pub attribute: String,
}

impl UniqueIdConfig {
    /// Create a new element/attribute pair.
    #[must_use]
    pub fn new(element: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            attribute: attribute.into(),
        }
    }
}

/// Image embedding configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Package directory that receives embedded media.
    pub media_dir: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            media_dir: "word/media".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `stencil.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(parts) = &settings.parts {
            self.render.parts.clone_from(parts);
        }
        if let Some(media_dir) = &settings.media_dir {
            self.images.media_dir.clone_from(media_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_render()?;
        require_non_empty(&self.images.media_dir, "images.media_dir")?;
        if self.images.media_dir.starts_with('/') || self.images.media_dir.contains("..") {
            return Err(ConfigError::Validation(
                "images.media_dir must be a relative path inside the package".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        if self.render.parts.is_empty() {
            return Err(ConfigError::Validation(
                "render.parts must list at least one pattern".to_owned(),
            ));
        }
        for pattern in &self.render.parts {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("render.parts: invalid pattern {pattern:?}: {e}"))
            })?;
        }
        for unique_id in &self.render.unique_ids {
            require_non_empty(&unique_id.element, "render.unique_ids.element")?;
            require_non_empty(&unique_id.attribute, "render.unique_ids.attribute")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.render.parts.len(), 3);
        assert_eq!(
            config.render.unique_ids,
            vec![
                UniqueIdConfig::new("docPr", "id"),
                UniqueIdConfig::new("cNvPr", "id")
            ]
        );
        assert_eq!(config.images.media_dir, "word/media");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.render.parts, RenderConfig::default().parts);
    }

    #[test]
    fn test_parse_render_config() {
        let toml = r#"
[render]
parts = ["word/document.xml"]

[[render.unique_ids]]
element = "docPr"
attribute = "id"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.render.parts, vec!["word/document.xml".to_owned()]);
        assert_eq!(config.render.unique_ids.len(), 1);
    }

    #[test]
    fn test_matches_part() {
        let render = RenderConfig::default();
        assert!(render.matches_part("word/document.xml"));
        assert!(render.matches_part("word/header1.xml"));
        assert!(render.matches_part("word/footer.xml"));
        assert!(!render.matches_part("word/styles.xml"));
        assert!(!render.matches_part("word/_rels/document.xml.rels"));
    }

    #[test]
    fn test_empty_parts_rejected() {
        let config: Config = toml::from_str("[render]\nparts = []").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("render.parts"));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let config: Config = toml::from_str(r#"[render]
parts = ["word/[header.xml"]"#)
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_media_dir_must_stay_inside_package() {
        let config: Config = toml::from_str("[images]\nmedia_dir = \"../media\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = Config::load(Some(Path::new("/nonexistent/stencil.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file_sets_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[images]\nmedia_dir = \"word/img\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.images.media_dir, "word/img");
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        let overrides = CliSettings {
            parts: Some(vec!["word/document.xml".to_owned()]),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.render.parts, vec!["word/document.xml".to_owned()]);
        assert_eq!(config.images.media_dir, "word/media"); // Unchanged
    }
}
