use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{between_non_empty, url_origin},
};
use crate::media::Video;

static PLAYER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#video_player[data-hash]").unwrap());

pub struct EmTurbo {
    pub extractor: Extractor,
}

impl EmTurbo {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("EmTurbo", client),
        }
    }
}

pub fn playlist_url(html: &str) -> Option<String> {
    if let Some(url) = between_non_empty(html, "var urlPlay = '", "'") {
        return Some(url.to_string());
    }
    let document = Html::parse_document(html);
    document
        .select(&PLAYER)
        .next()
        .and_then(|player| player.value().attr("data-hash"))
        .filter(|hash| hash.starts_with("http"))
        .map(ToOwned::to_owned)
}

#[async_trait]
impl HosterExtractor for EmTurbo {
    fn hoster(&self) -> Hoster {
        Hoster::EmTurbo
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let mut extractor = self.extractor.clone();
        extractor.set_referer(&format!("{}/", url_origin(url)?));

        let html = extractor.get_text(url).await?;
        let playlist = playlist_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        extract_from_hls(
            &extractor,
            &playlist,
            &format!("{prefix}EmTurboVid"),
            |res| format!("{prefix}EmTurboVid:{res}"),
            Vec::new(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_url() {
        let script = "<script>var urlPlay = 'https://turbo.example/m/master.m3u8';</script>";
        assert_eq!(
            playlist_url(script).as_deref(),
            Some("https://turbo.example/m/master.m3u8")
        );
        let div = r#"<div id="video_player" data-hash="https://turbo.example/x/master.m3u8"></div>"#;
        assert_eq!(
            playlist_url(div).as_deref(),
            Some("https://turbo.example/x/master.m3u8")
        );
    }
}
