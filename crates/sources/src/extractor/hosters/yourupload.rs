use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::file_field,
};
use crate::media::{MediaFormat, Video};
use crate::source::html::script_containing;

const REFERER: &str = "https://www.yourupload.com/";

pub struct YourUpload {
    pub extractor: Extractor,
}

impl YourUpload {
    pub fn new(client: Client) -> Self {
        let mut extractor = Extractor::new("YourUpload", client);
        extractor.set_referer(REFERER);
        Self { extractor }
    }
}

pub fn video_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = script_containing(&document, "jwplayerOptions")?;
    file_field(&script)
}

#[async_trait]
impl HosterExtractor for YourUpload {
    fn hoster(&self) -> Hoster {
        Hoster::YourUpload
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(url).await?;
        let video_url = video_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        Ok(vec![
            Video::builder(video_url, format!("{prefix}YourUpload"))
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
    fn test_video_url() {
        let html = "<script>var jwplayerOptions = { file: 'https://vidcache.net:8161/a/video.mp4', image: 'x.jpg' };</script>";
        assert_eq!(
            video_url(html).as_deref(),
            Some("https://vidcache.net:8161/a/video.mp4")
        );
        assert_eq!(video_url("<script>var jwplayer = 1;</script>"), None);
    }
}
