use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::decode::voe::stream_url;
use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::between_non_empty,
};
use crate::media::{MediaFormat, Video};

pub struct Voe {
    pub extractor: Extractor,
}

impl Voe {
    pub fn new(client: Client) -> Self {
        Self {
            extractor: Extractor::new("Voe", client),
        }
    }
}

/// Some mirrors answer with a script redirect instead of the player.
pub fn script_redirect(html: &str) -> Option<&str> {
    between_non_empty(html, "window.location.href = '", "'")
}

#[async_trait]
impl HosterExtractor for Voe {
    fn hoster(&self) -> Hoster {
        Hoster::Voe
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let mut html = self.extractor.get_text(url).await?;
        if let Some(target) = script_redirect(&html).map(ToOwned::to_owned) {
            debug!(target = %target, "Following Voe redirect");
            html = self.extractor.get_text(&target).await?;
        }

        let source = stream_url(&html).ok_or(ExtractorError::NoStreamsFound)?;
        if source.contains(".m3u8") {
            let default_name = format!("{prefix}Voe");
            extract_from_hls(
                &self.extractor,
                &source,
                &default_name,
                |res| format!("{prefix}Voe: {res}"),
                Vec::new(),
            )
            .await
        } else {
            Ok(vec![
                Video::builder(source, format!("{prefix}Voe"))
                    .format(MediaFormat::Mp4)
                    .build(),
            ])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_redirect() {
        let html = "<script>window.location.href = 'https://jilliandescribecompany.com/e/abc';</script>";
        assert_eq!(
            script_redirect(html),
            Some("https://jilliandescribecompany.com/e/abc")
        );
        assert_eq!(script_redirect("<html></html>"), None);
    }
}
