use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

use crate::extractor::{
    dash_extractor::extract_from_dash,
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::fix_url,
};
use crate::media::{MediaFormat, Video};

static OPTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[data-options]").unwrap());

pub struct Okru {
    pub extractor: Extractor,
}

impl Okru {
    pub fn new(client: Client) -> Self {
        let mut extractor = Extractor::new("Okru", client);
        extractor.set_referer("https://ok.ru/");
        Self { extractor }
    }
}

#[derive(Debug, Deserialize)]
struct OkruVideo {
    name: String,
    url: String,
}

/// What the player metadata offers, in order of preference.
#[derive(Debug, Clone, PartialEq)]
pub enum OkruStreams {
    Hls(String),
    Dash(String),
    // (quality label, url)
    Files(Vec<(String, String)>),
}

pub fn quality_name(name: &str) -> &str {
    match name {
        "ultra" => "2160p",
        "quad" => "1440p",
        "full" => "1080p",
        "hd" => "720p",
        "sd" => "480p",
        "low" => "360p",
        "lowest" => "240p",
        "mobile" => "144p",
        other => other,
    }
}

/// Read `flashvars.metadata` out of the player's `data-options`.
pub fn parse_streams(html: &str) -> Result<OkruStreams, ExtractorError> {
    let document = Html::parse_document(html);
    let options = document
        .select(&OPTIONS)
        .next()
        .and_then(|div| div.value().attr("data-options"))
        .ok_or_else(|| ExtractorError::missing("data-options"))?;

    let options: Value = serde_json::from_str(options)?;
    let metadata = options
        .pointer("/flashvars/metadata")
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractorError::missing("flashvars.metadata"))?;
    let metadata: Value = serde_json::from_str(metadata)?;

    let non_empty = |key: &str| {
        metadata
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(fix_url)
    };

    if let Some(hls) = non_empty("ondemandHls") {
        return Ok(OkruStreams::Hls(hls));
    }
    if let Some(dash) = non_empty("ondemandDash") {
        return Ok(OkruStreams::Dash(dash));
    }

    let videos: Vec<OkruVideo> = metadata
        .get("videos")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?
        .unwrap_or_default();
    let files: Vec<(String, String)> = videos
        .into_iter()
        .filter(|v| !v.url.is_empty())
        .map(|v| (quality_name(&v.name).to_string(), fix_url(&v.url)))
        .collect();
    if files.is_empty() {
        return Err(ExtractorError::NoStreamsFound);
    }
    Ok(OkruStreams::Files(files))
}

#[async_trait]
impl HosterExtractor for Okru {
    fn hoster(&self) -> Hoster {
        Hoster::Okru
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(&fix_url(url)).await?;
        let name_for = |quality: &str| format!("{prefix}Okru:{quality}");

        match parse_streams(&html)? {
            OkruStreams::Hls(playlist) => {
                extract_from_hls(&self.extractor, &playlist, &name_for("HLS"), name_for, Vec::new())
                    .await
            }
            OkruStreams::Dash(manifest) => {
                extract_from_dash(&self.extractor, &manifest, name_for, Vec::new()).await
            }
            OkruStreams::Files(files) => {
                let headers = self.extractor.player_headers();
                Ok(files
                    .into_iter()
                    .rev()
                    .map(|(quality, url)| {
                        Video::builder(url, name_for(&quality))
                            .format(MediaFormat::Mp4)
                            .headers(headers.clone())
                            .build()
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(metadata: &str) -> String {
        let options = serde_json::json!({ "flashvars": { "metadata": metadata } });
        let escaped = options.to_string().replace('&', "&amp;").replace('"', "&quot;");
        format!(r#"<html><body><div data-module="OKVideo" data-options="{escaped}"></div></body></html>"#)
    }

    #[test]
    fn test_prefers_hls() {
        let html = page(r#"{"ondemandHls":"https://vd.okcdn.ru/hls/1.m3u8?a=1&b=2","ondemandDash":"https://vd.okcdn.ru/1.mpd","videos":[]}"#);
        assert_eq!(
            parse_streams(&html).unwrap(),
            OkruStreams::Hls("https://vd.okcdn.ru/hls/1.m3u8?a=1&b=2".into())
        );
    }

    #[test]
    fn test_falls_back_to_files() {
        let html = page(r#"{"videos":[{"name":"mobile","url":"//vd.okcdn.ru/m"},{"name":"hd","url":"https://vd.okcdn.ru/h"},{"name":"weird","url":"https://vd.okcdn.ru/w"}]}"#);
        let OkruStreams::Files(files) = parse_streams(&html).unwrap() else {
            panic!("expected files");
        };
        assert_eq!(
            files,
            [
                ("144p".to_string(), "https://vd.okcdn.ru/m".to_string()),
                ("720p".to_string(), "https://vd.okcdn.ru/h".to_string()),
                ("weird".to_string(), "https://vd.okcdn.ru/w".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_options() {
        assert!(parse_streams("<html></html>").is_err());
    }
}
