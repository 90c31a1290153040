use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
};
use crate::media::{MediaFormat, Video};

pub struct AnimeFire {
    pub extractor: Extractor,
}

impl AnimeFire {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("AnimeFire", client),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnimeFireResponse {
    #[serde(alias = "data")]
    videos: Vec<AnimeFireVideo>,
}

#[derive(Debug, Deserialize)]
struct AnimeFireVideo {
    #[serde(alias = "src")]
    url: String,
    #[serde(alias = "label")]
    quality: String,
}

/// Videos of the JSON behind a `data-video-src` attribute.
pub fn parse_videos(body: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
    let response: AnimeFireResponse = serde_json::from_str(body)?;
    Ok(response
        .videos
        .into_iter()
        .map(|video| {
            let url = video.url.replace('\\', "");
            Video::builder(url, format!("{prefix}{}", video.quality))
                .format(MediaFormat::Mp4)
                .build()
        })
        .collect())
}

#[async_trait]
impl HosterExtractor for AnimeFire {
    fn hoster(&self) -> Hoster {
        Hoster::AnimeFire
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let body = self.extractor.get_text(url).await?;
        parse_videos(&body, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_videos_strips_escapes() {
        let body = r#"{"data":[{"src":"https:\\/\\/lightspeedst.net\\/s3\\/mp4\\/a\\/sd\\/1.mp4","label":"360p"},{"src":"https://lightspeedst.net/s3/mp4/a/hd/1.mp4","label":"720p"}],"resposta":{"status":"200"}}"#;
        let videos = parse_videos(body, "").unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].url, "https://lightspeedst.net/s3/mp4/a/sd/1.mp4");
        assert_eq!(videos[1].quality, "720p");
    }
}
