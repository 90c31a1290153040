use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::decode::unpacker;
use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{absolute_url, file_field, url_origin},
};
use crate::media::Video;
use crate::source::html::scripts;

static IFRAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("iframe[src]").unwrap());

pub struct Filemoon {
    pub extractor: Extractor,
}

impl Filemoon {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("Filemoon", client),
        }
    }
}

/// The playlist url inside the packed player setup.
pub fn playlist_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    scripts(&document)
        .filter(|script| unpacker::is_packed(script))
        .filter_map(|script| unpacker::unpack_all(&script))
        .find_map(|unpacked| file_field(&unpacked))
}

/// Newer pages wrap the player in an iframe on a sibling domain.
pub fn inner_frame(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&IFRAME)
        .next()
        .and_then(|iframe| iframe.value().attr("src"))
        .map(|src| absolute_url(page_url, src))
}

#[async_trait]
impl HosterExtractor for Filemoon {
    fn hoster(&self) -> Hoster {
        Hoster::Filemoon
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let mut extractor = self.extractor.clone();
        let origin = url_origin(url)?;
        extractor.set_referer(&format!("{origin}/"));
        extractor.set_origin(&origin);

        let mut html = extractor.get_text(url).await?;
        let mut playlist = playlist_url(&html);
        if playlist.is_none()
            && let Some(frame) = inner_frame(&html, url)
        {
            html = extractor
                .get(&frame)
                .header(reqwest::header::REFERER, url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            playlist = playlist_url(&html);
        }

        let playlist = playlist.ok_or(ExtractorError::NoStreamsFound)?;
        extract_from_hls(
            &extractor,
            &playlist,
            &format!("{prefix}Filemoon"),
            |res| format!("{prefix}Filemoon - {res}"),
            Vec::new(),
        )
        .await
    }
}
