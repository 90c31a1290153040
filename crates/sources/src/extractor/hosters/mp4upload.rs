use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::Html;

use crate::decode::unpacker;
use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::capture_group_1_owned,
};
use crate::media::{MediaFormat, Video};
use crate::source::html::scripts;

const REFERER: &str = "https://www.mp4upload.com/";

static SRC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"src:\s*"([^"]+)""#).unwrap());
static HEIGHT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bHEIGHT=(\d+)|embed-\w+\.html.*?(\d{3,4})p").unwrap());

pub struct Mp4Upload {
    pub extractor: Extractor,
}

impl Mp4Upload {
    pub fn new(client: Client) -> Self {
        let mut extractor = Extractor::new("Mp4Upload", client);
        extractor.set_referer(REFERER);
        Self { extractor }
    }
}

/// Source url and, when the page tells, the frame height.
pub fn parse_player(html: &str) -> Option<(String, Option<String>)> {
    let document = Html::parse_document(html);
    let script = scripts(&document)
        .map(|script| unpacker::unpack_or_keep(&script))
        .find(|script| script.contains("player.src("))?;
    let url = capture_group_1_owned(&SRC_REGEX, &script)?;
    let height = HEIGHT_REGEX
        .captures(&script)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| format!("{}p", m.as_str()));
    Some((url, height))
}

#[async_trait]
impl HosterExtractor for Mp4Upload {
    fn hoster(&self) -> Hoster {
        Hoster::Mp4Upload
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(url).await?;
        let (video_url, height) = parse_player(&html).ok_or(ExtractorError::NoStreamsFound)?;
        let quality = match height {
            Some(height) => format!("{prefix}Mp4Upload - {height}"),
            None => format!("{prefix}Mp4Upload"),
        };
        Ok(vec![
            Video::builder(video_url, quality)
                .format(MediaFormat::Mp4)
                .referer(REFERER)
                .build(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player() {
        let html = r#"<script>player.src({type: "video/mp4", src: "https://a4.mp4upload.com:183/d/x/video.mp4"}); var HEIGHT=720;</script>"#;
        let (url, height) = parse_player(html).unwrap();
        assert_eq!(url, "https://a4.mp4upload.com:183/d/x/video.mp4");
        assert_eq!(height.as_deref(), Some("720p"));
    }

    #[test]
    fn test_without_height() {
        let html = r#"<script>player.src({src: "https://a4.mp4upload.com/v.mp4"});</script>"#;
        assert_eq!(parse_player(html).unwrap().1, None);
    }
}
