use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{between_non_empty, url_origin},
};
use crate::media::{MediaFormat, Video};
use crate::source::html::script_containing;

pub struct Uqload {
    pub extractor: Extractor,
}

impl Uqload {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("Uqload", client),
        }
    }
}

/// First entry of the `sources: ["..."]` array.
pub fn video_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = script_containing(&document, "sources:")?;
    between_non_empty(&script, "sources: [\"", "\"")
        .filter(|url| url.starts_with("http"))
        .map(ToOwned::to_owned)
}

#[async_trait]
impl HosterExtractor for Uqload {
    fn hoster(&self) -> Hoster {
        Hoster::Uqload
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(url).await?;
        let video_url = video_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        Ok(vec![
            Video::builder(video_url, format!("{prefix}Uqload"))
                .format(MediaFormat::Mp4)
                .referer(format!("{}/", url_origin(url)?))
                .build(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url() {
        let html = r#"<script>var player = new Clappr.Player({ sources: ["https://m180.uqload.io/3rfkx/v.mp4"], poster: "x.jpg" });</script>"#;
        assert_eq!(
            video_url(html).as_deref(),
            Some("https://m180.uqload.io/3rfkx/v.mp4")
        );
        assert_eq!(video_url(r#"<script>sources: [""]</script>"#), None);
    }
}
