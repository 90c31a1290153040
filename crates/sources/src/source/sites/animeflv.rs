use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::extractor::{
    Hoster, HosterFactory,
    error::ExtractorError,
    hoster_extractor::Extractor,
    utils::{absolute_url, substring_after, substring_before, url_without_domain},
};
use crate::media::{Anime, AnimeStatus, AnimesPage, Episode, Video};
use crate::quality::VideoSort;
use crate::source::html::{attr, document_first, script_containing, select_first, text};
use crate::source::parallel::parallel_flat_map;
use crate::source::{AnimeSource, SearchFilters, SourceConfig};

const BASE_URL: &str = "https://www3.animeflv.net";
const DEFAULT_QUALITY: &str = "1080";
const DEFAULT_SERVER: &str = "YourUpload";

static ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.Container ul.ListAnimes li article").unwrap());
static ITEM_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.Description a.Button").unwrap());
static ITEM_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a h3").unwrap());
static ITEM_IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a div.Image figure img").unwrap());
static ITEM_SYNOPSIS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.Description p").unwrap());
static NEXT_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"ul.pagination li a[rel="next"]"#).unwrap());
static COVER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.AnimeCover div.Image figure img").unwrap());
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.Ficha.fchlt div.Container .Title").unwrap());
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.Description").unwrap());
static GENRES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("nav.Nvgnrs a").unwrap());
static STATUS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.fa-tv").unwrap());

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// Browse, search and latest pages all render the same card list.
pub fn parse_browse(html: &str, base_url: &str) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(&ITEM)
        .filter_map(|item| {
            let href = select_first(item, &ITEM_LINK).and_then(|a| attr(a, "href"))?;
            let title = select_first(item, &ITEM_TITLE).map(text)?;
            let thumbnail = select_first(item, &ITEM_IMG)
                .and_then(|img| attr(img, "src").or_else(|| attr(img, "data-cfsrc")))
                .map(|src| absolute_url(base_url, &src));
            let synopsis = item.select(&ITEM_SYNOPSIS).nth(1).map(text).map(|s| unquote(&s));
            Some(
                Anime::builder(url_without_domain(&href), title)
                    .thumbnail_url_opt(thumbnail)
                    .description_opt(synopsis.filter(|s| !s.is_empty()))
                    .build(),
            )
        })
        .collect();
    let has_next = document.select(&NEXT_PAGE).next().is_some();
    AnimesPage::new(animes, has_next)
}

pub fn parse_status(raw: &str) -> AnimeStatus {
    if raw.contains("En emision") {
        AnimeStatus::Ongoing
    } else if raw.contains("Finalizado") {
        AnimeStatus::Completed
    } else {
        AnimeStatus::Unknown
    }
}

pub fn parse_details(html: &str, url: &str, base_url: &str) -> Result<Anime, ExtractorError> {
    let document = Html::parse_document(html);
    let title = document_first(&document, &TITLE)
        .map(text)
        .ok_or_else(|| ExtractorError::missing("anime title"))?;
    let genres: Vec<String> = document.select(&GENRES).map(text).collect();
    let status: String = document.select(&STATUS).map(text).collect::<Vec<_>>().join(" ");

    Ok(Anime::builder(url, title)
        .thumbnail_url_opt(
            document_first(&document, &COVER)
                .and_then(|img| attr(img, "src"))
                .map(|src| absolute_url(base_url, &src)),
        )
        .description_opt(document_first(&document, &DESCRIPTION).map(|d| unquote(&text(d))))
        .genre(genres.join(", "))
        .status(parse_status(&status))
        .build())
}

/// Episodes come from the `anime_info` and `episodes` arrays of an inline script.
pub fn parse_episodes(html: &str) -> Result<Vec<Episode>, ExtractorError> {
    let document = Html::parse_document(html);
    let Some(script) = script_containing(&document, "var anime_info =") else {
        return Ok(Vec::new());
    };

    let info = substring_before(substring_after(&script, "var anime_info = ["), "];");
    let info: Vec<Value> = serde_json::from_str(&format!("[{info}]"))?;
    let slug = info
        .get(2)
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractorError::missing("anime slug"))?
        .replace('"', "");

    let episodes = substring_before(substring_after(&script, "var episodes = ["), "];").trim();
    if episodes.is_empty() {
        return Ok(Vec::new());
    }
    Ok(episodes
        .split("],[")
        .filter_map(|entry| {
            let number = entry.replace(['[', ']'], "");
            let number = number.split(',').next()?.trim().to_string();
            let value: f32 = number.parse().ok()?;
            Some(Episode::new(
                format!("/ver/{slug}-{number}"),
                format!("Episodio {number}"),
                value,
            ))
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    title: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    url: Option<String>,
}

/// `(hoster, embed url, label prefix)` of the subbed servers we can decode.
pub fn parse_servers(html: &str) -> Result<Vec<(Hoster, String, &'static str)>, ExtractorError> {
    let document = Html::parse_document(html);
    let Some(script) = script_containing(&document, "var videos = {") else {
        return Ok(Vec::new());
    };
    let json = substring_before(substring_after(&script, "var videos ="), ";").trim();
    let videos: Value = serde_json::from_str(json)?;
    let servers: Vec<ServerEntry> = match videos.get("SUB") {
        Some(sub) => serde_json::from_value(sub.clone())?,
        None => Vec::new(),
    };

    Ok(servers
        .into_iter()
        .filter_map(|server| match server.title.as_str() {
            "Stape" => Some((Hoster::StreamTape, server.url?, "")),
            "Doodstream" => Some((Hoster::Dood, server.code, "")),
            "Okru" => Some((Hoster::Okru, server.code, "")),
            "YourUpload" => Some((Hoster::YourUpload, server.code, "")),
            "SW" => Some((Hoster::StreamWish, server.code, "")),
            other => {
                debug!(server = other, "Skipping unsupported AnimeFlv server");
                None
            }
        })
        .collect())
}

pub fn browse_url(page: u32, query: &str, filters: &SearchFilters) -> String {
    let query = query.trim();
    if query.is_empty() && filters.is_empty() {
        return format!("{BASE_URL}/browse?page={page}&order=rating");
    }
    let mut url = format!("{BASE_URL}/browse?");
    if !query.is_empty() {
        url.push_str(&format!("&q={}", urlencoding::encode(query)));
    }
    if let Some(genre) = filters.get("genre") {
        url.push_str(&format!("&genre[]={genre}"));
    }
    if let Some(status) = filters.get("status") {
        url.push_str(&format!("&status[]={status}"));
    }
    if let Some(kind) = filters.get("type") {
        url.push_str(&format!("&type[]={kind}"));
    }
    url.push_str(&format!("&order={}", filters.get("order").unwrap_or("default")));
    url.push_str(&format!("&page={page}"));
    url
}

pub struct AnimeFlv {
    base_url: String,
    extractor: Extractor,
    factory: HosterFactory,
    config: SourceConfig,
}

impl AnimeFlv {
    pub fn new(client: Client, config: SourceConfig) -> Self {
        let base_url = config.base_url_or(BASE_URL);
        Self {
            extractor: Extractor::new("AnimeFlv", client.clone()),
            factory: HosterFactory::new(client),
            base_url,
            config,
        }
    }

    async fn browse(&self, url: &str) -> Result<AnimesPage, ExtractorError> {
        let html = self.extractor.get_text(url).await?;
        Ok(parse_browse(&html, &self.base_url))
    }

    fn sort(&self) -> VideoSort {
        VideoSort::new()
            .server(self.config.preferred_server_or(DEFAULT_SERVER))
            .quality(self.config.preferred_quality_or(DEFAULT_QUALITY))
            .by_resolution()
    }
}

#[async_trait]
impl AnimeSource for AnimeFlv {
    fn id(&self) -> &str {
        "animeflv"
    }

    fn name(&self) -> &str {
        "AnimeFLV"
    }

    fn lang(&self) -> &str {
        "es"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn filter_keys(&self) -> &'static [&'static str] {
        &["genre", "status", "type", "order"]
    }

    async fn popular(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        self.browse(&format!("{}/browse?order=rating&page={page}", self.base_url))
            .await
    }

    async fn latest(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        self.browse(&format!("{}/browse?order=added&page={page}", self.base_url))
            .await
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<AnimesPage, ExtractorError> {
        let url = browse_url(page, query, filters).replacen(BASE_URL, &self.base_url, 1);
        self.browse(&url).await
    }

    async fn details(&self, anime: &Anime) -> Result<Anime, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&anime.url)).await?;
        parse_details(&html, &anime.url, &self.base_url)
    }

    async fn episodes(&self, anime: &Anime) -> Result<Vec<Episode>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&anime.url)).await?;
        parse_episodes(&html)
    }

    async fn videos(&self, episode: &Episode) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&episode.url)).await?;
        let servers = parse_servers(&html)?;

        let factory = &self.factory;
        let videos = parallel_flat_map(servers, move |(hoster, url, prefix)| async move {
            match factory.create_extractor(hoster) {
                Some(extractor) => extractor.videos(&url, prefix).await,
                None => Err(ExtractorError::UnsupportedHoster(url)),
            }
        })
        .await;
        Ok(self.sort().sorted(videos))
    }
}
