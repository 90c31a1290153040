use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{absolute_url, between_non_empty, substring_after},
};
use crate::media::{MediaFormat, Video};
use crate::source::html::script_containing;

const BASE_URL: &str = "https://video.sibnet.ru";

pub struct Sibnet {
    pub extractor: Extractor,
}

impl Sibnet {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("Sibnet", client),
        }
    }
}

/// The absolute mp4 url from `player.src([{src: "/v/..."}])`.
pub fn video_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = script_containing(&document, "player.src")?;
    let after_src = substring_after(substring_after(&script, "player.src"), "src:");
    let slug = between_non_empty(after_src, "\"", "\"")?;
    Some(absolute_url(BASE_URL, slug))
}

#[async_trait]
impl HosterExtractor for Sibnet {
    fn hoster(&self) -> Hoster {
        Hoster::Sibnet
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(url).await?;
        let video_url = video_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        // the cdn checks that the request comes from the shell page
        Ok(vec![
            Video::builder(video_url, format!("{prefix}Sibnet"))
                .format(MediaFormat::Mp4)
                .referer(url)
                .build(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url() {
        let html = r#"<script>player.src([{src: "/v/abcdef0123/4979123.mp4", type: "video/mp4"}]);</script>"#;
        assert_eq!(
            video_url(html).as_deref(),
            Some("https://video.sibnet.ru/v/abcdef0123/4979123.mp4")
        );
    }
}
