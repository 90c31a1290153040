use crate::media::MediaFormat;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A subtitle or audio rendition attached to a [`Video`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub url: String,
    // Display label, e.g. "English" or "Portuguese (pt-BR)"
    pub lang: String,
}

impl Track {
    pub fn new(url: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            lang: lang.into(),
        }
    }
}

/// A playable stream candidate produced by a host decoder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Video {
    // Direct media url
    pub url: String,
    // Quality label used for ranking, e.g. "720p" or "Okru:1080p"
    pub quality: String,
    pub format: MediaFormat,
    // Headers the player must send along (Referer, Origin...)
    #[serde(default, skip_serializing_if = "FxHashMap::is_empty")]
    pub headers: FxHashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtitle_tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audio_tracks: Vec<Track>,
}

impl Video {
    /// Shortcut for a video without headers or tracks; the format is guessed from the url.
    pub fn new(url: impl Into<String>, quality: impl Into<String>) -> Self {
        Self::builder(url, quality).build()
    }

    pub fn builder(url: impl Into<String>, quality: impl Into<String>) -> VideoBuilder {
        VideoBuilder::new(url, quality)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialize the Video to a serde_json::Value
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for Video {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.quality, self.format.as_str(), self.url)
    }
}

#[derive(Debug, Clone)]
pub struct VideoBuilder {
    url: String,
    quality: String,
    format: Option<MediaFormat>,
    headers: FxHashMap<String, String>,
    subtitle_tracks: Vec<Track>,
    audio_tracks: Vec<Track>,
}

impl VideoBuilder {
    pub fn new(url: impl Into<String>, quality: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: quality.into(),
            format: None,
            headers: FxHashMap::default(),
            subtitle_tracks: Vec::new(),
            audio_tracks: Vec::new(),
        }
    }

    pub fn format(mut self, format: MediaFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: FxHashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn referer(self, referer: impl Into<String>) -> Self {
        self.header("Referer", referer)
    }

    pub fn subtitle_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.subtitle_tracks = tracks;
        self
    }

    pub fn audio_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.audio_tracks = tracks;
        self
    }

    pub fn build(self) -> Video {
        let format = self
            .format
            .unwrap_or_else(|| MediaFormat::from_url(&self.url));
        Video {
            url: self.url,
            quality: self.quality,
            format,
            headers: self.headers,
            subtitle_tracks: self.subtitle_tracks,
            audio_tracks: self.audio_tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_infers_format() {
        let video = Video::builder("https://cdn.example/a/master.m3u8", "StreamWish - 720p")
            .referer("https://example.com/")
            .build();
        assert_eq!(video.format, MediaFormat::Hls);
        assert_eq!(video.header("referer"), Some("https://example.com/"));
    }

    #[test]
    fn test_explicit_format_wins() {
        let video = Video::builder("https://cdn.example/get?id=1", "Doodstream")
            .format(MediaFormat::Mp4)
            .build();
        assert_eq!(video.format, MediaFormat::Mp4);
    }
}
