use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::split_master_playlist,
    hoster_extractor::{Extractor, HosterExtractor},
};
use crate::media::{MediaFormat, Track, Video};

const API_URL: &str = "https://blog.allanime.pro";
// the playlist host rejects the desktop Chrome agent
const PLAYLIST_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:101.0) Gecko/20100101 Firefox/101.0";

pub struct AllAnime {
    pub extractor: Extractor,
}

impl AllAnime {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("AllAnime", client),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkList {
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub link: String,
    #[serde(default)]
    pub hls: Option<bool>,
    #[serde(default)]
    pub mp4: Option<bool>,
    pub resolution_str: String,
    #[serde(default)]
    pub subtitles: Option<Vec<Subtitle>>,
}

#[derive(Debug, Deserialize)]
pub struct Subtitle {
    pub lang: String,
    pub src: String,
}

impl Link {
    fn tracks(&self) -> Vec<Track> {
        self.subtitles
            .iter()
            .flatten()
            .map(|sub| Track::new(&sub.src, &sub.lang))
            .collect()
    }
}

/// `/apivtwo/clock?id=..` becomes `https://blog.allanime.pro/apivtwo/clock.json?id=..`.
pub fn clock_json_url(path: &str) -> String {
    format!("{API_URL}{}", path.replace("/clock?", "/clock.json?"))
}

/// Label the variants of one HLS link.
pub fn hls_videos(playlist: &str, playlist_url: &str, name: &str, link: &Link) -> Vec<Video> {
    split_master_playlist(playlist, playlist_url)
        .into_iter()
        .map(|variant| {
            Video::builder(
                variant.url,
                format!("{} ({name} - {})", variant.resolution, link.resolution_str),
            )
            .format(MediaFormat::Hls)
            .subtitle_tracks(link.tracks())
            .build()
        })
        .collect()
}

/// The videos of one link; `playlist` is the fetched `(url, body)` of an HLS link.
pub fn link_videos(link: &Link, prefix: &str, playlist: Option<(String, String)>) -> Vec<Video> {
    if link.mp4 == Some(true) {
        return vec![
            Video::builder(
                &link.link,
                format!("Original ({prefix} - {})", link.resolution_str),
            )
            .format(MediaFormat::Mp4)
            .subtitle_tracks(link.tracks())
            .build(),
        ];
    }
    match playlist {
        Some((playlist_url, body)) if link.hls == Some(true) => {
            hls_videos(&body, &playlist_url, prefix, link)
        }
        _ => Vec::new(),
    }
}

impl AllAnime {
    /// The final url and body of an HLS playlist; failures skip the link.
    async fn fetch_playlist(&self, url: &str) -> Option<(String, String)> {
        let response = match self
            .extractor
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, PLAYLIST_UA)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => response,
            Ok(response) => {
                debug!(status = %response.status(), url = %url, "Skipping playlist");
                return None;
            }
            Err(e) => {
                debug!(error = %e, url = %url, "Skipping playlist");
                return None;
            }
        };
        let playlist_url = response.url().to_string();
        match response.text().await {
            Ok(body) => Some((playlist_url, body)),
            Err(e) => {
                warn!(error = %e, url = %url, "Unreadable playlist body");
                None
            }
        }
    }
}

#[async_trait]
impl HosterExtractor for AllAnime {
    fn hoster(&self) -> Hoster {
        Hoster::AllAnime
    }

    /// `prefix` is the server name shown in the labels.
    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let response = self.extractor.get(&clock_json_url(url)).send().await?;
        if response.status() != StatusCode::OK {
            debug!(status = %response.status(), "AllAnime clock unavailable");
            return Ok(Vec::new());
        }
        let list: LinkList = response.json().await?;

        let mut videos = Vec::new();
        for link in &list.links {
            let playlist = if link.mp4 != Some(true) && link.hls == Some(true) {
                match self.fetch_playlist(&link.link).await {
                    Some(playlist) => Some(playlist),
                    None => continue,
                }
            } else {
                None
            };
            videos.extend(link_videos(link, prefix, playlist));
        }
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_json_url() {
        assert_eq!(
            clock_json_url("/apivtwo/clock?id=abc"),
            "https://blog.allanime.pro/apivtwo/clock.json?id=abc"
        );
    }

    #[test]
    fn test_hls_labels_and_relative_variants() {
        let list: LinkList = serde_json::from_str(
            r#"{"links":[{"link":"https://v.example/hls/master.m3u8","hls":true,"resolutionStr":"Hls","subtitles":[{"lang":"en","src":"https://v.example/en.vtt"}]}]}"#,
        )
        .unwrap();
        let link = &list.links[0];
        let playlist = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1,RESOLUTION=1280x720\n720.m3u8\n#EXT-X-STREAM-INF:BANDWIDTH=2,RESOLUTION=1920x1080\nhttps://other.example/1080.m3u8\n";
        let videos = hls_videos(playlist, "https://v.example/hls/master.m3u8", "Ac", link);
        assert_eq!(videos[0].quality, "720p (Ac - Hls)");
        assert_eq!(videos[0].url, "https://v.example/hls/720.m3u8");
        assert_eq!(videos[1].url, "https://other.example/1080.m3u8");
        assert_eq!(videos[1].subtitle_tracks[0].lang, "en");
    }

    #[test]
    fn test_unfetched_playlist_keeps_other_links() {
        let list: LinkList = serde_json::from_str(
            r#"{"links":[{"link":"https://v.example/a.mp4","mp4":true,"resolutionStr":"Mp4"},{"link":"https://v.example/broken.m3u8","hls":true,"resolutionStr":"Hls"}]}"#,
        )
        .unwrap();
        let videos: Vec<Video> = list
            .links
            .iter()
            .flat_map(|link| link_videos(link, "Yt", None))
            .collect();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].quality, "Original (Yt - Mp4)");
        assert_eq!(videos[0].format, MediaFormat::Mp4);

        let playlist = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1,RESOLUTION=1280x720\n720.m3u8\n";
        let fetched = Some(("https://v.example/hls/master.m3u8".to_string(), playlist.to_string()));
        let hls = link_videos(&list.links[1], "Yt", fetched);
        assert_eq!(hls[0].quality, "720p (Yt - Hls)");
    }
}
