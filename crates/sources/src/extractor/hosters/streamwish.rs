use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;

use crate::decode::unpacker;
use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{file_field, url_origin},
};
use crate::media::Video;
use crate::source::html::scripts;

pub struct StreamWish {
    pub extractor: Extractor,
}

impl StreamWish {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("StreamWish", client),
        }
    }
}

/// The playlist of the player script, packed or not.
pub fn playlist_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    scripts(&document)
        .filter(|script| script.contains("m3u8") || unpacker::is_packed(script))
        .map(|script| unpacker::unpack_or_keep(&script))
        .filter_map(|script| file_field(&script))
        .find(|file| file.contains(".m3u8"))
}

#[async_trait]
impl HosterExtractor for StreamWish {
    fn hoster(&self) -> Hoster {
        Hoster::StreamWish
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let mut extractor = self.extractor.clone();
        extractor.set_referer(&format!("{}/", url_origin(url)?));

        let html = extractor.get_text(url).await?;
        let playlist = playlist_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        extract_from_hls(
            &extractor,
            &playlist,
            &format!("{prefix}StreamWish"),
            |res| format!("{prefix}StreamWish:{res}"),
            Vec::new(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_player_setup() {
        let html = r#"<script>var x = 1;</script><script>jwplayer("vplayer").setup({sources:[{file:"https://str.example/hls/master.m3u8?t=1"}],image:"https://str.example/p.jpg"});</script>"#;
        assert_eq!(
            playlist_url(html).as_deref(),
            Some("https://str.example/hls/master.m3u8?t=1")
        );
    }

    #[test]
    fn test_no_playlist() {
        let html = r#"<script>jwplayer("vplayer").setup({sources:[{file:"https://str.example/v.mp4"}]});</script>"#;
        assert_eq!(playlist_url(html), None);
    }
}
