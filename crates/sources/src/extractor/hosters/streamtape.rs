use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{fix_url, substring_after, substring_before},
};
use crate::media::{MediaFormat, Video};
use crate::source::html::script_containing;

const ROBOTLINK: &str = "document.getElementById('robotlink')";

pub struct StreamTape {
    pub extractor: Extractor,
}

impl StreamTape {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("StreamTape", client),
        }
    }
}

/// `/v/` share links render without the player script.
pub fn embed_url(url: &str) -> String {
    url.replacen("/v/", "/e/", 1)
}

/// Join the two halves the page writes into `#robotlink`.
///
/// `innerHTML = '//host/get_video?id=..&token=' + ('xcdTOKEN').substring(1).substring(2)`
/// keeps the literal prefix and drops the first three characters of the second string.
pub fn video_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = script_containing(&document, ROBOTLINK)?;
    let assignment = substring_after(&script, &format!("{ROBOTLINK}.innerHTML = '"));
    let head = substring_before(assignment, "'");
    let tail = substring_before(substring_after(assignment, "+ ('xcd"), "'");
    if head.is_empty() || tail.is_empty() {
        return None;
    }
    Some(fix_url(&format!("{head}{tail}")))
}

#[async_trait]
impl HosterExtractor for StreamTape {
    fn hoster(&self) -> Hoster {
        Hoster::StreamTape
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(&embed_url(url)).await?;
        let url = video_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        Ok(vec![
            Video::builder(url, format!("{prefix}StreamTape"))
                .format(MediaFormat::Mp4)
                .build(),
        ])
    }
}
