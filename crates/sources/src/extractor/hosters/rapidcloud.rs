use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::decode::crypto_aes::decrypt_with_password;
use crate::extractor::{
    error::ExtractorError,
    factory::Hoster,
    hls_extractor::extract_from_hls,
    hoster_extractor::{Extractor, HosterExtractor},
    utils::{substring_after_last, substring_before, url_origin},
};
use crate::js_engine::{JsError, TokenEvaluator, default_evaluator, find_password};
use crate::media::{Track, Video};

/// Where a player family keeps its sources endpoint and its player script.
struct EmbedKind {
    marker: &'static str,
    sources_path: &'static str,
    script_path: &'static str,
}

static EMBEDS: &[EmbedKind] = &[
    EmbedKind {
        marker: "/embed-2/e-1/",
        sources_path: "/embed-2/ajax/e-1/getSources?id=",
        script_path: "/js/player/a/prod/e1-player.min.js",
    },
    EmbedKind {
        marker: "/embed-4/",
        sources_path: "/ajax/embed-4/getSources?id=",
        script_path: "/js/player/e4-player.min.js",
    },
    EmbedKind {
        marker: "/embed-6/",
        sources_path: "/ajax/embed-6/getSources?id=",
        script_path: "/js/player/prod/e6-player.min.js",
    },
];

/// Megacloud, Rapid-Cloud and their siblings.
pub struct RapidCloud {
    pub extractor: Extractor,
    evaluator: Option<Arc<dyn TokenEvaluator>>,
}

impl RapidCloud {
    pub fn new(client: Client) -> Self {
        let mut extractor = Extractor::new("RapidCloud", client);
        extractor.add_header("X-Requested-With", "XMLHttpRequest");
        Self {
            extractor,
            evaluator: default_evaluator(),
        }
    }

    /// Swap the script evaluator, e.g. for one backed by another engine.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn TokenEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    async fn password(&self, origin: &str, kind: &EmbedKind) -> Result<String, ExtractorError> {
        let evaluator = self.evaluator.clone().ok_or(JsError::Unavailable)?;
        let script = self
            .extractor
            .get_text(&format!("{origin}{}", kind.script_path))
            .await?;
        // QuickJS is synchronous and may take a while on the obfuscated player
        tokio::task::spawn_blocking(move || find_password(&script, evaluator.as_ref()))
            .await
            .map_err(|e| ExtractorError::Other(format!("password task failed: {e}")))?
            .map_err(ExtractorError::from)
    }
}

#[derive(Debug, Deserialize)]
pub struct SourcesResponse {
    // a JSON array, or a CryptoJS payload of one when `encrypted`
    pub sources: Value,
    #[serde(default)]
    pub tracks: Vec<RapidTrack>,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Deserialize)]
pub struct RapidTrack {
    pub file: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RapidSource {
    pub file: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// `(sources url, player script kind)` of an embed url.
fn endpoint(url: &str, origin: &str) -> Result<(String, &'static EmbedKind), ExtractorError> {
    let kind = EMBEDS
        .iter()
        .find(|kind| url.contains(kind.marker))
        .ok_or_else(|| ExtractorError::InvalidUrl(url.to_string()))?;
    let id = substring_before(substring_after_last(url, "/"), "?");
    Ok((format!("{origin}{}{id}", kind.sources_path), kind))
}

pub fn caption_tracks(response: &SourcesResponse) -> Vec<Track> {
    response
        .tracks
        .iter()
        .filter(|t| t.kind.as_deref().is_none_or(|k| k == "captions"))
        .filter_map(|t| t.label.as_ref().map(|label| Track::new(&t.file, label)))
        .collect()
}

/// The source list, decrypting it with `password` when the response says so.
pub fn decode_sources(
    response: &SourcesResponse,
    password: Option<&str>,
) -> Result<Vec<RapidSource>, ExtractorError> {
    match &response.sources {
        Value::String(payload) if response.encrypted => {
            let password = password.ok_or_else(|| ExtractorError::missing("sources password"))?;
            let json = decrypt_with_password(payload, password)?;
            Ok(serde_json::from_str(&json)?)
        }
        other => Ok(serde_json::from_value(other.clone())?),
    }
}

#[async_trait]
impl HosterExtractor for RapidCloud {
    fn hoster(&self) -> Hoster {
        Hoster::RapidCloud
    }

    async fn videos(&self, url: &str, prefix: &str) -> Result<Vec<Video>, ExtractorError> {
        let origin = url_origin(url)?;
        let (sources_url, kind) = endpoint(url, &origin)?;

        let mut extractor = self.extractor.clone();
        extractor.set_referer(url);
        let response: SourcesResponse = extractor
            .get(&sources_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let password = if response.encrypted && response.sources.is_string() {
            Some(self.password(&origin, kind).await?)
        } else {
            None
        };
        let sources = decode_sources(&response, password.as_deref())?;
        let subtitles = caption_tracks(&response);

        let master = sources.first().ok_or(ExtractorError::NoStreamsFound)?;
        debug!(url = %master.file, kind = ?master.kind, "RapidCloud master playlist");
        extract_from_hls(
            &extractor,
            &master.file,
            &format!("{prefix}RapidCloud"),
            |res| format!("{prefix}{res}"),
            subtitles,
        )
        .await
    }
}
