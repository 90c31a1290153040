//! The supported sites and the registry that builds them by id.

pub mod animeflv;
pub mod animestream;
pub mod anizm;
pub mod javguru;
pub mod jkanime;
pub mod kickassanime;

use reqwest::Client;
use serde::Serialize;

use super::{AnimeSource, SourceConfig};
use crate::extractor::error::ExtractorError;

use animeflv::AnimeFlv;
use animestream::AnimeStream;
use anizm::Anizm;
use javguru::JavGuru;
use jkanime::Jkanime;
use kickassanime::KickAssAnime;

type Constructor = fn(Client, SourceConfig) -> Result<Box<dyn AnimeSource>, ExtractorError>;

/// What a listing shows about a source without building it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub lang: &'static str,
    pub base_url: &'static str,
}

struct SourceEntry {
    info: SourceInfo,
    constructor: Constructor,
}

macro_rules! source_registry {
    ( $( $id:literal => ($name:literal, $lang:literal, $base_url:literal, $builder:expr) ),+ $(,)? ) => {
        &[
            $(
                SourceEntry {
                    info: SourceInfo {
                        id: $id,
                        name: $name,
                        lang: $lang,
                        base_url: $base_url,
                    },
                    constructor: |client, config| {
                        let source = $builder(client, config)?;
                        Ok(Box::new(source) as Box<dyn AnimeSource>)
                    },
                },
            )+
        ]
    };
}

fn infallible<S>(
    build: fn(Client, SourceConfig) -> S,
) -> impl Fn(Client, SourceConfig) -> Result<S, ExtractorError> {
    move |client, config| Ok(build(client, config))
}

// Single-domain sites. AnimeStream instances come from their own table.
static SOURCES: &[SourceEntry] = source_registry![
    "animeflv" => ("AnimeFLV", "es", "https://www3.animeflv.net", infallible(AnimeFlv::new)),
    "anizm" => ("Anizm", "tr", "https://anizm.net", Anizm::new),
    "javguru" => ("Jav Guru", "all", "https://jav.guru", JavGuru::new),
    "jkanime" => ("Jkanime", "es", "https://jkanime.net", Jkanime::new),
    "kickassanime" => ("KickAssAnime", "en", "https://kaas.am", infallible(KickAssAnime::new)),
];

/// Every source id with its display data, sorted by id.
pub fn available_sources() -> Vec<SourceInfo> {
    let mut sources: Vec<SourceInfo> = SOURCES
        .iter()
        .map(|entry| entry.info)
        .chain(animestream::INSTANCES.iter().map(|instance| SourceInfo {
            id: instance.id,
            name: instance.name,
            lang: instance.lang,
            base_url: instance.base_url,
        }))
        .collect();
    sources.sort_by_key(|info| info.id);
    sources
}

/// Build the source registered under `id` (case-insensitive).
pub fn create_source(
    id: &str,
    client: Client,
    config: SourceConfig,
) -> Result<Box<dyn AnimeSource>, ExtractorError> {
    let id = id.trim().to_lowercase();
    if let Some(entry) = SOURCES.iter().find(|entry| entry.info.id == id) {
        return (entry.constructor)(client, config);
    }
    if let Some(instance) = animestream::instance(&id) {
        return Ok(Box::new(AnimeStream::new(*instance, client, config)));
    }
    Err(ExtractorError::UnknownSource(id))
}
