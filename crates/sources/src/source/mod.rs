//! Per-site catalog scraping.
//!
//! Every site implements [`AnimeSource`]; [`sites::create_source`] builds one
//! by id. Parsing is kept in plain functions over the page body so it can be
//! exercised without a network.

pub mod config;
pub mod html;
pub mod pagination;
pub mod parallel;
pub mod sites;

use std::fmt;

use async_trait::async_trait;

pub use config::SourceConfig;

use crate::extractor::error::ExtractorError;
use crate::media::{Anime, AnimesPage, Episode, Video};

/// Ordered `key=value` search filters, e.g. `genre=action`.
///
/// Keys may repeat (`genre[]` style multi-selects); order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    entries: Vec<(String, String)>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value for `key`, ignoring blanks.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).next()
    }

    pub fn get_all<'a, 'k>(
        &'a self,
        key: &'k str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'k> {
        self.entries
            .iter()
            .filter(move |(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when no filter carries a value.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.trim().is_empty())
    }

    /// Parse a `key=value` argument.
    pub fn parse(arg: &str) -> Result<(String, String), ExtractorError> {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| ExtractorError::Other(format!("filter must be key=value: {arg}")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ExtractorError::Other(format!("empty filter key: {arg}")));
        }
        Ok((key.to_string(), value.trim().to_string()))
    }
}

impl FromIterator<(String, String)> for SearchFilters {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for SearchFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&parts.join("&"))
    }
}

/// A scraped anime site.
///
/// Urls stored in [`Anime`] and [`Episode`] are relative to
/// [`AnimeSource::base_url`] unless a site links off-site players.
/// Entry points a site does not offer return [`ExtractorError::NotSupported`].
#[async_trait]
pub trait AnimeSource: Send + Sync {
    /// Stable registry id, e.g. `"animeflv"`.
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn lang(&self) -> &str;

    fn base_url(&self) -> &str;

    fn supports_latest(&self) -> bool {
        true
    }

    /// Filter keys understood by [`AnimeSource::search`].
    fn filter_keys(&self) -> &'static [&'static str] {
        &[]
    }

    async fn popular(&self, page: u32) -> Result<AnimesPage, ExtractorError>;

    async fn latest(&self, _page: u32) -> Result<AnimesPage, ExtractorError> {
        Err(ExtractorError::NotSupported("latest updates"))
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<AnimesPage, ExtractorError>;

    async fn details(&self, anime: &Anime) -> Result<Anime, ExtractorError>;

    async fn episodes(&self, anime: &Anime) -> Result<Vec<Episode>, ExtractorError>;

    /// Candidates for an episode, already ranked by the configured preferences.
    async fn videos(&self, episode: &Episode) -> Result<Vec<Video>, ExtractorError>;

    /// The absolute url of a relative path on this site.
    fn absolute(&self, path: &str) -> String {
        crate::extractor::utils::absolute_url(self.base_url(), path)
    }
}
