use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
};
use crate::media::{MediaFormat, Video};

static SOURCE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"source#video_source[src], meta[property="og:video"][content]"#).unwrap()
});

pub struct Sendvid {
    pub extractor: Extractor,
}

impl Sendvid {
    pub fn new(client: Client) -> Self {
        let mut extractor = Extractor::new("Sendvid", client);
        extractor.set_referer("https://sendvid.com/");
        Self { extractor }
    }
}

pub fn video_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&SOURCE).find_map(|el| {
        el.value()
            .attr("src")
            .or_else(|| el.value().attr("content"))
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
    })
}

#[async_trait]
impl HosterExtractor for Sendvid {
    fn hoster(&self) -> Hoster {
        Hoster::Sendvid
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(url).await?;
        let video_url = video_url(&html).ok_or(ExtractorError::NoStreamsFound)?;

        if video_url.contains(".m3u8") {
            return extract_from_hls(
                &self.extractor,
                &video_url,
                &format!("{prefix}Sendvid"),
                |res| format!("{prefix}Sendvid:{res}"),
                Vec::new(),
            )
            .await;
        }

        Ok(vec![
            Video::builder(video_url, format!("{prefix}Sendvid"))
                .format(MediaFormat::Mp4)
                .headers(self.extractor.player_headers())
                .build(),
        ])
    }
}
