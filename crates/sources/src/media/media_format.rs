use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Hls,
    Dash,
    Mp4,
    #[default]
    Unknown,
}

impl MediaFormat {
    pub fn as_str(&self) -> &str {
        match self {
            MediaFormat::Hls => "hls",
            MediaFormat::Dash => "dash",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Unknown => "unknown",
        }
    }

    pub fn from_str(format: &str) -> Option<Self> {
        match format.to_lowercase().as_str() {
            "hls" | "m3u8" => Some(MediaFormat::Hls),
            "dash" | "mpd" => Some(MediaFormat::Dash),
            "mp4" => Some(MediaFormat::Mp4),
            _ => None,
        }
    }

    /// Guess the container from a media URL, ignoring the query string.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        if path.contains(".m3u8") {
            MediaFormat::Hls
        } else if path.ends_with(".mpd") {
            MediaFormat::Dash
        } else if path.ends_with(".mp4") {
            MediaFormat::Mp4
        } else {
            MediaFormat::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        assert_eq!(
            MediaFormat::from_url("https://cdn.example/hls/master.m3u8?t=1&s=2"),
            MediaFormat::Hls
        );
        assert_eq!(
            MediaFormat::from_url("https://cdn.example/v/manifest.mpd"),
            MediaFormat::Dash
        );
        assert_eq!(
            MediaFormat::from_url("https://cdn.example/file.MP4"),
            MediaFormat::Mp4
        );
        assert_eq!(
            MediaFormat::from_url("https://cdn.example/get_video?id=1"),
            MediaFormat::Unknown
        );
    }
}
