use crate::{
    cli::OutputFormat,
    error::{CliError, Result},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sources_parser::SourceConfig;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Persistent CLI settings, stored as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_format: OutputFormat,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Pages walked by `catalog` when no limit is given
    pub max_pages: u32,
    pub colored: bool,
    /// Preferences applied to every source
    pub defaults: SourceConfig,
    /// Per-source preferences keyed by source id; set fields win over `defaults`
    pub sources: BTreeMap<String, SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            timeout: 30,
            max_pages: 5,
            colored: true,
            defaults: SourceConfig::default(),
            sources: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file; using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.show()?)?;
        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn reset(path: Option<&Path>) -> Result<()> {
        Self::default().save(path)
    }

    pub fn show(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("anisrc").join("config.toml"))
            .ok_or(CliError::NoConfigDir)
    }

    /// The preferences for `source_id`: its own section over `defaults`.
    pub fn source_config(&self, source_id: &str) -> SourceConfig {
        match self.sources.get(&source_id.to_lowercase()) {
            Some(own) => own.merged_with(&self.defaults),
            None => self.defaults.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
output_format = "json-compact"
timeout = 10

[defaults]
preferred_quality = "720p"

[sources.animeflv]
preferred_server = "Okru"

[sources.kickassanime]
preferred_quality = "1080p"
"#;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.output_format, OutputFormat::JsonCompact);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.max_pages, 5);
        assert!(config.colored);
    }

    #[test]
    fn test_source_section_overrides_defaults() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();

        let flv = config.source_config("AnimeFLV");
        assert_eq!(flv.preferred_server.as_deref(), Some("Okru"));
        assert_eq!(flv.preferred_quality.as_deref(), Some("720p"));

        let kaa = config.source_config("kickassanime");
        assert_eq!(kaa.preferred_quality.as_deref(), Some("1080p"));

        let other = config.source_config("jkanime");
        assert_eq!(other, config.defaults);
    }

    #[test]
    fn test_show_round_trips() {
        let config = AppConfig::from_toml(SAMPLE).unwrap();
        let shown = config.show().unwrap();
        assert_eq!(AppConfig::from_toml(&shown).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let path = std::env::temp_dir().join("anisrc-missing-config.toml");
        let _ = std::fs::remove_file(&path);
        assert_eq!(AppConfig::load(Some(&path)).unwrap(), AppConfig::default());
    }
}
