use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;

use crate::decode::unpacker;
use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{between_non_empty, fix_url},
};
use crate::media::{MediaFormat, Track, Video};
use crate::source::html::scripts;

pub struct MixDrop {
    pub extractor: Extractor,
}

impl MixDrop {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("MixDrop", client),
        }
    }
}

/// `/f/` landing pages carry no player.
pub fn embed_url(url: &str) -> String {
    url.replacen("/f/", "/e/", 1)
}

/// `MDCore.wurl` from the unpacked player script, plus the remote subtitle if any.
pub fn parse_player(html: &str) -> Option<(String, Option<String>)> {
    let document = Html::parse_document(html);
    let script = scripts(&document)
        .filter(|script| unpacker::is_packed(script))
        .filter_map(|script| unpacker::unpack_all(&script))
        .find(|script| script.contains("MDCore"))?;

    let url = between_non_empty(&script, "MDCore.wurl=\"", "\"").map(fix_url)?;
    let subtitle = between_non_empty(&script, "MDCore.remotesub=\"", "\"")
        .map(|sub| urlencoding::decode(sub).map(|s| s.into_owned()).unwrap_or_else(|_| sub.to_string()));
    Some((url, subtitle))
}

#[async_trait]
impl HosterExtractor for MixDrop {
    fn hoster(&self) -> Hoster {
        Hoster::MixDrop
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let url = embed_url(url);
        let html = self.extractor.get_text(&url).await?;
        let (video_url, subtitle) = parse_player(&html).ok_or(ExtractorError::NoStreamsFound)?;

        let tracks = subtitle
            .map(|sub| vec![Track::new(sub, "Subtitle")])
            .unwrap_or_default();
        Ok(vec![
            Video::builder(video_url, format!("{prefix}MixDrop"))
                .format(MediaFormat::Mp4)
                .referer(url)
                .subtitle_tracks(tracks)
                .build(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_player() {
        // MDCore.wurl="//s-delivery.example/v/a.mp4";MDCore.remotesub="https%3A%2F%2Fs.example%2Fen.vtt"
        let html = r#"<script>eval(function(p,a,c,k,e,d){return p}('0.1="//2/3/4.5";0.6="7%8%9%a";',11,11,'MDCore|wurl|s-delivery.example|v|a|mp4|remotesub|https|3A|2F|2Fs.example%2Fen.vtt'.split('|'),0,{}))</script>"#;
        let (url, sub) = parse_player(html).unwrap();
        assert_eq!(url, "https://s-delivery.example/v/a.mp4");
        assert_eq!(sub.as_deref(), Some("https://s.example/en.vtt"));
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(embed_url("https://mixdrop.co/f/abc"), "https://mixdrop.co/e/abc");
    }
}
