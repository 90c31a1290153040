use serde::{Deserialize, Serialize};

/// User preferences handed to a source at construction.
///
/// Every field is optional; sources fall back to their own defaults through
/// the `*_or` accessors, so one config can be shared by sources with
/// different defaults (e.g. `"720p"` vs `"1080"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_sub_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_audio_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_english_titles: Option<bool>,
    // custom domain replacing the built-in base url
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url_override: Option<String>,
    // upper bound for catalog walks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
}

impl SourceConfig {
    pub fn preferred_quality_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.preferred_quality).unwrap_or(default)
    }

    pub fn preferred_server_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.preferred_server).unwrap_or(default)
    }

    pub fn preferred_sub_lang_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.preferred_sub_lang).unwrap_or(default)
    }

    pub fn preferred_audio_lang_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.preferred_audio_lang).unwrap_or(default)
    }

    pub fn use_english_titles(&self) -> bool {
        self.use_english_titles.unwrap_or(false)
    }

    /// The base url to use, without a trailing slash.
    pub fn base_url_or(&self, default: &str) -> String {
        non_empty(&self.base_url_override)
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn max_pages_or(&self, default: u32) -> u32 {
        self.max_pages.filter(|n| *n > 0).unwrap_or(default)
    }

    /// Fill unset fields from `fallback`; set fields win.
    pub fn merged_with(&self, fallback: &SourceConfig) -> SourceConfig {
        SourceConfig {
            preferred_quality: self
                .preferred_quality
                .clone()
                .or_else(|| fallback.preferred_quality.clone()),
            preferred_server: self
                .preferred_server
                .clone()
                .or_else(|| fallback.preferred_server.clone()),
            preferred_sub_lang: self
                .preferred_sub_lang
                .clone()
                .or_else(|| fallback.preferred_sub_lang.clone()),
            preferred_audio_lang: self
                .preferred_audio_lang
                .clone()
                .or_else(|| fallback.preferred_audio_lang.clone()),
            use_english_titles: self.use_english_titles.or(fallback.use_english_titles),
            base_url_override: self
                .base_url_override
                .clone()
                .or_else(|| fallback.base_url_override.clone()),
            max_pages: self.max_pages.or(fallback.max_pages),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_to_blank_values() {
        let config = SourceConfig {
            preferred_quality: Some("  ".into()),
            base_url_override: Some("https://mirror.example/".into()),
            ..Default::default()
        };
        assert_eq!(config.preferred_quality_or("720p"), "720p");
        assert_eq!(config.base_url_or("https://site.example"), "https://mirror.example");
        assert_eq!(config.max_pages_or(5), 5);
        assert!(!config.use_english_titles());
    }

    #[test]
    fn test_merge_prefers_own_values() {
        let own = SourceConfig {
            preferred_server: Some("Okru".into()),
            ..Default::default()
        };
        let fallback = SourceConfig {
            preferred_server: Some("StreamTape".into()),
            preferred_quality: Some("1080p".into()),
            ..Default::default()
        };
        let merged = own.merged_with(&fallback);
        assert_eq!(merged.preferred_server.as_deref(), Some("Okru"));
        assert_eq!(merged.preferred_quality.as_deref(), Some("1080p"));
    }

    #[test]
    fn test_serialization_skips_unset() {
        let json = serde_json::to_string(&SourceConfig::default()).unwrap();
        assert_eq!(json, "{}");
    }
}
