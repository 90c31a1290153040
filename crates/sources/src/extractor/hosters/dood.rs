use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use reqwest::Client;
use tracing::debug;

use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{between_non_empty, substring_after_last, url_origin},
};
use crate::media::{MediaFormat, Video};

pub struct Dood {
    pub extractor: Extractor,
}

impl Dood {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("DoodStream", client),
        }
    }
}

/// The `/pass_md5/...` path and the token at its end.
pub fn pass_md5_path(html: &str) -> Option<(String, String)> {
    let rest = between_non_empty(html, "/pass_md5/", "'")?;
    let path = format!("/pass_md5/{rest}");
    let token = substring_after_last(&path, "/").to_string();
    Some((path, token))
}

pub fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

/// `<base><10 random chars>?token=<token>&expiry=<unix millis>`
pub fn build_video_url(base: &str, random: &str, token: &str, expiry_millis: i64) -> String {
    format!("{}{random}?token={token}&expiry={expiry_millis}", base.trim())
}

#[async_trait]
impl HosterExtractor for Dood {
    fn hoster(&self) -> Hoster {
        Hoster::Dood
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let response = self.extractor.get(url).send().await?.error_for_status()?;
        // mirrors redirect to whichever domain is alive this week
        let origin = url_origin(response.url().as_str())?;
        let html = response.text().await?;

        let (path, token) = pass_md5_path(&html).ok_or(ExtractorError::NoStreamsFound)?;
        debug!(origin = %origin, "Fetching pass_md5");

        let base = self
            .extractor
            .get(&format!("{origin}{path}"))
            .header(reqwest::header::REFERER, url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let video_url = build_video_url(
            &base,
            &random_suffix(),
            &token,
            Utc::now().timestamp_millis(),
        );
        Ok(vec![
            Video::builder(video_url, format!("{prefix}DoodStream"))
                .format(MediaFormat::Mp4)
                .referer(format!("{origin}/"))
                .build(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_md5_path() {
        let html = "$.get('/pass_md5/12345-67-890-abc/tokenxyz', function(data) {";
        let (path, token) = pass_md5_path(html).unwrap();
        assert_eq!(path, "/pass_md5/12345-67-890-abc/tokenxyz");
        assert_eq!(token, "tokenxyz");
        assert!(pass_md5_path("<html></html>").is_none());
    }

    #[test]
    fn test_build_video_url() {
        let url = build_video_url("https://cdn.example/abc~\n", "AbCdEfGhIj", "tok", 1700000000000);
        assert_eq!(url, "https://cdn.example/abc~AbCdEfGhIj?token=tok&expiry=1700000000000");
    }

    #[test]
    fn test_random_suffix_shape() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 10);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
