use std::fmt;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ExtractorError;
use super::hoster_extractor::HosterExtractor;
use super::hosters::{
    allanime::AllAnime, animefire::AnimeFire, dood::Dood, emturbo::EmTurbo, fastream::Fastream,
    filemoon::Filemoon, kickassanime::KickAssAnime, mixdrop::MixDrop, mp4upload::Mp4Upload,
    okru::Okru, rapidcloud::RapidCloud, sendvid::Sendvid, sibnet::Sibnet, streamtape::StreamTape,
    streamwish::StreamWish, uqload::Uqload, voe::Voe, yourupload::YourUpload,
};
use crate::media::Video;

/// The video hosts an embed url can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hoster {
    StreamTape,
    Dood,
    Okru,
    Voe,
    Filemoon,
    StreamWish,
    Mp4Upload,
    YourUpload,
    Sibnet,
    Sendvid,
    MixDrop,
    Fastream,
    Uqload,
    EmTurbo,
    AllAnime,
    KickAssAnime,
    AnimeFire,
    RapidCloud,
    Unknown,
}

struct HosterEntry {
    needles: &'static [&'static str],
    hoster: Hoster,
}

macro_rules! hoster_registry {
    ( $( $hoster:path => [ $( $needle:literal ),+ $(,)? ] ),+ $(,)? ) => {
        &[
            $(
                HosterEntry {
                    needles: &[ $( $needle ),+ ],
                    hoster: $hoster,
                },
            )+
        ]
    };
}

// Scanned in order, first match wins. Generic needles ("wish") go last.
static HOSTERS: &[HosterEntry] = hoster_registry![
    Hoster::KickAssAnime => ["kaavid", "krussdomi", "/pink/", "sapphire-duck"],
    Hoster::AllAnime => ["allanime", "/apivtwo/clock"],
    Hoster::AnimeFire => ["animefire"],
    Hoster::RapidCloud => ["rapid-cloud", "megacloud", "rabbitstream", "dokicloud"],
    Hoster::StreamTape => ["streamtape", "strtape", "stape", "shavetape"],
    Hoster::Dood => ["dood", "ds2play", "d0000d", "d000d"],
    Hoster::Okru => ["ok.ru", "okru"],
    Hoster::Filemoon => ["filemoon", "moonplayer"],
    Hoster::Mp4Upload => ["mp4upload"],
    Hoster::YourUpload => ["yourupload"],
    Hoster::Sibnet => ["sibnet"],
    Hoster::Sendvid => ["sendvid"],
    Hoster::MixDrop => ["mixdrop", "mixdroop"],
    Hoster::Fastream => ["fastream"],
    Hoster::Uqload => ["uqload"],
    Hoster::EmTurbo => ["emturbovid", "turbovid"],
    Hoster::Voe => ["voe.sx", "voe"],
    Hoster::StreamWish => ["streamwish", "javplaya", "wish", "sfastwish", "flaswish"],
];

impl Hoster {
    /// Classify an embed url. Total: unknown hosts map to [`Hoster::Unknown`].
    pub fn from_url(url: &str) -> Hoster {
        let url = url.to_ascii_lowercase();
        HOSTERS
            .iter()
            .find(|entry| entry.needles.iter().any(|needle| url.contains(needle)))
            .map(|entry| entry.hoster)
            .unwrap_or(Hoster::Unknown)
    }

    pub fn all() -> impl Iterator<Item = Hoster> {
        HOSTERS.iter().map(|entry| entry.hoster)
    }

    pub fn needles(&self) -> &'static [&'static str] {
        HOSTERS
            .iter()
            .find(|entry| entry.hoster == *self)
            .map(|entry| entry.needles)
            .unwrap_or(&[])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Hoster::StreamTape => "StreamTape",
            Hoster::Dood => "DoodStream",
            Hoster::Okru => "Okru",
            Hoster::Voe => "Voe",
            Hoster::Filemoon => "Filemoon",
            Hoster::StreamWish => "StreamWish",
            Hoster::Mp4Upload => "Mp4Upload",
            Hoster::YourUpload => "YourUpload",
            Hoster::Sibnet => "Sibnet",
            Hoster::Sendvid => "Sendvid",
            Hoster::MixDrop => "MixDrop",
            Hoster::Fastream => "Fastream",
            Hoster::Uqload => "Uqload",
            Hoster::EmTurbo => "EmTurbo",
            Hoster::AllAnime => "AllAnime",
            Hoster::KickAssAnime => "KickAssAnime",
            Hoster::AnimeFire => "AnimeFire",
            Hoster::RapidCloud => "RapidCloud",
            Hoster::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Hoster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds host decoders and runs them with the best-effort policy sites use.
#[derive(Debug, Clone)]
pub struct HosterFactory {
    client: Client,
    // Fastream rejects the form when it is posted too early
    fastream_sleep: bool,
}

impl HosterFactory {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            fastream_sleep: true,
        }
    }

    pub fn with_fastream_sleep(mut self, needs_sleep: bool) -> Self {
        self.fastream_sleep = needs_sleep;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn create_extractor(&self, hoster: Hoster) -> Option<Box<dyn HosterExtractor>> {
        let client = self.client.clone();
        let extractor: Box<dyn HosterExtractor> = match hoster {
            Hoster::StreamTape => Box::new(StreamTape::new(client)),
            Hoster::Dood => Box::new(Dood::new(client)),
            Hoster::Okru => Box::new(Okru::new(client)),
            Hoster::Voe => Box::new(Voe::new(client)),
            Hoster::Filemoon => Box::new(Filemoon::new(client)),
            Hoster::StreamWish => Box::new(StreamWish::new(client)),
            Hoster::Mp4Upload => Box::new(Mp4Upload::new(client)),
            Hoster::YourUpload => Box::new(YourUpload::new(client)),
            Hoster::Sibnet => Box::new(Sibnet::new(client)),
            Hoster::Sendvid => Box::new(Sendvid::new(client)),
            Hoster::MixDrop => Box::new(MixDrop::new(client)),
            Hoster::Fastream => Box::new(Fastream::new(client).needs_sleep(self.fastream_sleep)),
            Hoster::Uqload => Box::new(Uqload::new(client)),
            Hoster::EmTurbo => Box::new(EmTurbo::new(client)),
            Hoster::AllAnime => Box::new(AllAnime::new(client)),
            Hoster::KickAssAnime => Box::new(KickAssAnime::new(client)),
            Hoster::AnimeFire => Box::new(AnimeFire::new(client)),
            Hoster::RapidCloud => Box::new(RapidCloud::new(client)),
            Hoster::Unknown => return None,
        };
        Some(extractor)
    }

    /// Resolve `url` with the matching decoder, surfacing the failure cause.
    pub async fn try_videos_from_url(
        &self,
        url: &str,
        prefix: &str,
    ) -> Result<Vec<Video>, ExtractorError> {
        let hoster = Hoster::from_url(url);
        debug!(url = %url, hoster = ?hoster, "Resolving embed");
        let extractor = self
            .create_extractor(hoster)
            .ok_or_else(|| ExtractorError::UnsupportedHoster(url.to_string()))?;
        extractor.videos(url, prefix).await
    }

    /// Resolve `url`; any failure is logged and yields no videos.
    pub async fn videos_from_url(&self, url: &str, prefix: &str) -> Vec<Video> {
        match self.try_videos_from_url(url, prefix).await {
            Ok(videos) => videos,
            Err(ExtractorError::UnsupportedHoster(_)) => {
                debug!(url = %url, "No decoder for embed");
                Vec::new()
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to resolve embed");
                Vec::new()
            }
        }
    }
}
