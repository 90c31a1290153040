use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::decode::unpacker;
use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{substring_after, substring_before},
};
use crate::media::{MediaFormat, Video};
use crate::source::html::scripts;

const FASTREAM_URL: &str = "https://fastream.to";
const DEFAULT_PREFIX: &str = "Fastream:";
// anything shorter and the form is rejected
const FORM_DELAY: Duration = Duration::from_millis(5100);

static INPUTS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("input[name]").unwrap());

pub struct Fastream {
    pub extractor: Extractor,
    needs_sleep: bool,
}

impl Fastream {
    pub fn new(client: Client) -> Self {
        let mut extractor = Extractor::new("Fastream", client);
        extractor.set_referer(&format!("{FASTREAM_URL}/"));
        extractor.set_origin(FASTREAM_URL);
        Self {
            extractor,
            needs_sleep: true,
        }
    }

    pub fn needs_sleep(mut self, needs_sleep: bool) -> Self {
        self.needs_sleep = needs_sleep;
        self
    }
}

/// Name/value pairs of every named input on the landing page.
pub fn form_fields(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    document
        .select(&INPUTS)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// The `file:` value of the jwplayer setup, unpacking it first when needed.
pub fn video_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = scripts(&document)
        .find(|script| script.contains("jwplayer") && script.contains("vplayer"))?;
    let script = unpacker::unpack_or_keep(&script);

    let url = substring_before(
        substring_before(substring_after(&script, "file:"), "}"),
        ",",
    )
    .trim_matches(|c| c == '"' || c == '\'' || c == ' ');
    (!url.is_empty()).then(|| url.to_string())
}

#[async_trait]
impl HosterExtractor for Fastream {
    fn hoster(&self) -> Hoster {
        Hoster::Fastream
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let prefix = if prefix.is_empty() { DEFAULT_PREFIX } else { prefix };

        let landing = self.extractor.get_text(url).await?;
        let form = form_fields(&landing);

        if self.needs_sleep {
            debug!(delay = ?FORM_DELAY, "Waiting before posting the Fastream form");
            tokio::time::sleep(FORM_DELAY).await;
        }

        let html = self
            .extractor
            .post(url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let video_url = video_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        if video_url.contains(".m3u8") {
            extract_from_hls(
                &self.extractor,
                &video_url,
                prefix,
                |res| format!("{prefix}{res}"),
                Vec::new(),
            )
            .await
        } else {
            Ok(vec![
                Video::builder(video_url, prefix)
                    .format(MediaFormat::Mp4)
                    .headers(self.extractor.player_headers())
                    .build(),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields() {
        let html = r#"<form method="POST"><input type="hidden" name="op" value="download1"><input type="hidden" name="id" value="abc"><input name="referer"><input type="submit" value="Go"></form>"#;
        assert_eq!(
            form_fields(html),
            [
                ("op".to_string(), "download1".to_string()),
                ("id".to_string(), "abc".to_string()),
                ("referer".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_video_url_plain_setup() {
        let html = r#"<script>var vplayer = jwplayer("vplayer"); vplayer.setup({sources: [{file:"https://fst.example/hls/master.m3u8",label:"x"}]});</script>"#;
        assert_eq!(
            video_url(html).as_deref(),
            Some("https://fst.example/hls/master.m3u8")
        );
    }

    #[test]
    fn test_video_url_single_quotes_before_brace() {
        let html = "<script>jwplayer('vplayer').setup({file: 'https://fst.example/v.mp4'});</script>";
        assert_eq!(video_url(html).as_deref(), Some("https://fst.example/v.mp4"));
    }

    #[test]
    fn test_skips_sleep_when_disabled() {
        let fastream = Fastream::new(Client::new()).needs_sleep(false);
        assert!(!fastream.needs_sleep);
        assert_eq!(
            fastream.extractor.player_headers().get("origin").map(String::as_str),
            Some(FASTREAM_URL)
        );
    }
}
