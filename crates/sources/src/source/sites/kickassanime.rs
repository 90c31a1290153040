//! KickAssAnime, a JSON API in front of its own player family.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::decode::base64;
use crate::extractor::{
    Hoster, HosterFactory, error::ExtractorError, hoster_extractor::Extractor,
};
use crate::media::{Anime, AnimeStatus, AnimesPage, Episode, Video};
use crate::quality::{VideoSort, sort_subtitles};
use crate::source::pagination::collect_counted;
use crate::source::parallel::parallel_flat_map;
use crate::source::{AnimeSource, SearchFilters, SourceConfig};

pub const SLUG_PREFIX: &str = "slug:";
const BASE_URL: &str = "https://kaas.am";
const DEFAULT_QUALITY: &str = "720p";
const DEFAULT_SERVER: &str = "SapphireDuck";
const DEFAULT_AUDIO_LANG: &str = "ja-JP";
const DEFAULT_SUB_LANG: &str = "en-US";

const LOCALES: [(&str, &str); 3] = [
    ("en-US", "English"),
    ("es-ES", "Spanish (España)"),
    ("ja-JP", "Japanese"),
];

pub fn locale_name(code: &str) -> &'static str {
    LOCALES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("")
}

#[derive(Debug, Clone, Deserialize)]
pub struct Poster {
    #[serde(default)]
    pub hq: String,
}

impl Poster {
    pub fn path(&self) -> String {
        format!("image/poster/{}.webp", self.hq)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShowItem {
    pub title: String,
    #[serde(default)]
    pub title_en: String,
    pub slug: String,
    pub poster: Poster,
}

#[derive(Debug, Deserialize)]
pub struct PopularResponse {
    pub page_count: u32,
    pub result: Vec<ShowItem>,
}

#[derive(Debug, Deserialize)]
pub struct RecentResponse {
    #[serde(rename = "hadNext")]
    pub had_next: bool,
    pub result: Vec<ShowItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "maxPage")]
    pub max_page: u32,
    pub result: Vec<ShowItem>,
}

#[derive(Debug, Deserialize)]
pub struct ShowInfo {
    pub title: String,
    #[serde(default)]
    pub title_en: String,
    pub slug: String,
    pub poster: Poster,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub year: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Languages {
    pub result: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeItem {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    pub episode_string: String,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeResponse {
    #[serde(default)]
    pub pages: Vec<Value>,
    pub result: Vec<EpisodeItem>,
}

/// A server entry: older responses list bare player urls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Server {
    Url(String),
    Named { name: String, src: String },
}

impl Server {
    pub fn src(&self) -> &str {
        match self {
            Server::Url(src) => src,
            Server::Named { src, .. } => src,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Servers {
    pub servers: Vec<Server>,
}

pub fn parse_status(raw: &str) -> AnimeStatus {
    match raw {
        "finished_airing" => AnimeStatus::Completed,
        "currently_airing" => AnimeStatus::Ongoing,
        _ => AnimeStatus::Unknown,
    }
}

fn display_title<'a>(title: &'a str, title_en: &'a str, use_english: bool) -> &'a str {
    if use_english && !title_en.trim().is_empty() {
        title_en
    } else {
        title
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ShowItem {
    pub fn to_anime(&self, base_url: &str, use_english: bool) -> Anime {
        Anime::builder(
            format!("/{}", self.slug),
            display_title(&self.title, &self.title_en, use_english),
        )
        .thumbnail_url(format!("{base_url}/{}", self.poster.path()))
        .build()
    }
}

impl ShowInfo {
    pub fn to_anime(&self, base_url: &str, use_english: bool, languages: &[String]) -> Anime {
        let dubs: Vec<&str> = languages.iter().map(|l| locale_name(l)).collect();
        let year = self.year.map(|y| y.to_string()).unwrap_or_default();
        let description = format!(
            "{}\n\nAvailable Dub Languages: {}\nSeason: {}\nYear: {year}",
            self.synopsis,
            dubs.join(", "),
            capitalize(&self.season),
        );
        Anime::builder(
            format!("/{}", self.slug),
            display_title(&self.title, &self.title_en, use_english),
        )
        .thumbnail_url(format!("{base_url}/{}", self.poster.path()))
        .genre(self.genres.join(", "))
        .status(parse_status(&self.status))
        .description(description)
        .build()
    }
}

/// The `fsearch` body; filters travel as base64 encoded JSON.
pub fn search_body(page: u32, query: &str, filters: &SearchFilters) -> Value {
    let mut encoded = Map::new();
    let genres: Vec<Value> = filters.get_all("genre").map(|g| json!(g)).collect();
    if !genres.is_empty() {
        encoded.insert("genres".into(), Value::Array(genres));
    }
    for key in ["year", "status", "type"] {
        if let Some(value) = filters.get(key) {
            let value = value
                .parse::<u64>()
                .map(Value::from)
                .unwrap_or_else(|_| json!(value));
            encoded.insert(key.into(), value);
        }
    }

    let mut body = json!({ "page": page, "query": query });
    if !encoded.is_empty() {
        body["filters"] = json!(base64::encode(Value::Object(encoded).to_string().as_bytes()));
    }
    body
}

pub fn episode_from_item(item: &EpisodeItem, anime_url: &str, lang: &str) -> Episode {
    Episode::new(
        format!("{anime_url}/ep-{}-{}", item.episode_string, item.slug),
        format!("Ep. {} - {}", item.episode_string, item.title),
        item.episode_string.parse().unwrap_or(0.0),
    )
    .with_scanlator(Some(locale_name(lang).to_string()).filter(|s| !s.is_empty()))
}

/// The audio language to list: the preferred one when the show has it.
pub fn pick_language(available: &[String], preferred: &str) -> String {
    available
        .iter()
        .find(|l| *l == preferred)
        .cloned()
        .unwrap_or_else(|| DEFAULT_AUDIO_LANG.to_string())
}

pub struct KickAssAnime {
    base_url: String,
    api_url: String,
    extractor: Extractor,
    factory: HosterFactory,
    config: SourceConfig,
}

impl KickAssAnime {
    pub fn new(client: Client, config: SourceConfig) -> Self {
        let base_url = config.base_url_or(BASE_URL);
        Self {
            api_url: format!("{base_url}/api/show"),
            extractor: Extractor::new("KickAssAnime", client.clone()),
            factory: HosterFactory::new(client),
            base_url,
            config,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ExtractorError> {
        let body = self.extractor.get_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn to_page(&self, items: &[ShowItem], has_next: bool) -> AnimesPage {
        let use_english = self.config.use_english_titles();
        AnimesPage::new(
            items
                .iter()
                .map(|item| item.to_anime(&self.base_url, use_english))
                .collect(),
            has_next,
        )
    }

    async fn languages(&self, anime_url: &str) -> Result<Vec<String>, ExtractorError> {
        let languages: Languages = self
            .get_json(&format!("{}{anime_url}/language", self.api_url))
            .await?;
        Ok(languages.result)
    }

    async fn episode_page(
        &self,
        anime_url: &str,
        page: u32,
        lang: &str,
    ) -> Result<EpisodeResponse, ExtractorError> {
        self.get_json(&format!(
            "{}{anime_url}/episodes?page={page}&lang={lang}",
            self.api_url
        ))
        .await
    }

    fn sort(&self) -> VideoSort {
        VideoSort::new()
            .quality(self.config.preferred_quality_or(DEFAULT_QUALITY))
            .server(self.config.preferred_server_or(DEFAULT_SERVER))
    }

    fn rank(&self, videos: Vec<Video>) -> Vec<Video> {
        let mut videos = self.sort().sorted(videos);
        sort_subtitles(
            &mut videos,
            self.config.preferred_sub_lang_or(DEFAULT_SUB_LANG),
        );
        videos
    }
}

#[async_trait]
impl AnimeSource for KickAssAnime {
    fn id(&self) -> &str {
        "kickassanime"
    }

    fn name(&self) -> &str {
        "KickAssAnime"
    }

    fn lang(&self) -> &str {
        "en"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn filter_keys(&self) -> &'static [&'static str] {
        &["sub_page", "genre", "year", "status", "type"]
    }

    async fn popular(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        let data: PopularResponse = self
            .get_json(&format!("{}/popular?page={page}", self.api_url))
            .await?;
        Ok(self.to_page(&data.result, data.page_count > page))
    }

    async fn latest(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        let data: RecentResponse = self
            .get_json(&format!("{}/recent?type=all&page={page}", self.api_url))
            .await?;
        Ok(self.to_page(&data.result, data.had_next))
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<AnimesPage, ExtractorError> {
        if let Some(slug) = query.strip_prefix(SLUG_PREFIX) {
            let anime = self.details(&Anime::from_url(format!("/{}", slug.trim()))).await?;
            return Ok(AnimesPage::single(anime));
        }

        if let Some(sub_page) = filters.get("sub_page") {
            let url = format!("{}/api/{sub_page}?page={page}", self.base_url);
            return match sub_page {
                "recent" | "show/recent" => {
                    let data: RecentResponse = self.get_json(&url).await?;
                    Ok(self.to_page(&data.result, data.had_next))
                }
                "anime" => {
                    let data: SearchResponse = self.get_json(&url).await?;
                    Ok(self.to_page(&data.result, page < data.max_page))
                }
                _ => {
                    let data: PopularResponse = self.get_json(&url).await?;
                    Ok(self.to_page(&data.result, data.page_count > page))
                }
            };
        }

        let query = query.trim();
        if query.is_empty() {
            return Err(ExtractorError::Other("enter a query to search".into()));
        }
        let body = search_body(page, query, filters);
        debug!(body = %body, "KickAssAnime search");
        let text = self
            .extractor
            .post(&format!("{}/api/fsearch", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let data: SearchResponse = serde_json::from_str(&text)?;
        Ok(self.to_page(&data.result, page < data.max_page))
    }

    async fn details(&self, anime: &Anime) -> Result<Anime, ExtractorError> {
        let info: ShowInfo = self
            .get_json(&format!("{}{}", self.api_url, anime.url))
            .await?;
        let languages = self.languages(&anime.url).await?;
        Ok(info.to_anime(&self.base_url, self.config.use_english_titles(), &languages))
    }

    async fn episodes(&self, anime: &Anime) -> Result<Vec<Episode>, ExtractorError> {
        let available = self.languages(&anime.url).await?;
        let lang = pick_language(
            &available,
            self.config.preferred_audio_lang_or(DEFAULT_AUDIO_LANG),
        );

        let first = self.episode_page(&anime.url, 1, &lang).await?;
        let page_count = first.pages.len() as u32;
        let mut items = first.result;
        if page_count > 1 {
            let rest = collect_counted(page_count - 1, |i| {
                let lang = lang.clone();
                async move {
                    Ok(self.episode_page(&anime.url, i + 1, &lang).await?.result)
                }
            })
            .await?;
            items.extend(rest);
        }

        let mut episodes: Vec<Episode> = items
            .iter()
            .map(|item| episode_from_item(item, &anime.url, &lang))
            .collect();
        episodes.reverse();
        Ok(episodes)
    }

    async fn videos(&self, episode: &Episode) -> Result<Vec<Video>, ExtractorError> {
        let url = format!(
            "{}{}",
            self.api_url,
            episode.url.replace("/ep-", "/episode/ep-")
        );
        let data: Servers = self.get_json(&url).await?;

        let factory = &self.factory;
        let videos = parallel_flat_map(data.servers, move |server| async move {
            match factory.create_extractor(Hoster::KickAssAnime) {
                Some(extractor) => extractor.videos(server.src(), "").await,
                None => Err(ExtractorError::UnsupportedHoster(server.src().to_string())),
            }
        })
        .await;
        Ok(self.rank(videos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Track;

    #[test]
    fn test_show_item_titles() {
        let item: ShowItem = serde_json::from_str(
            r#"{"title":"Sousou no Frieren","title_en":"Frieren: Beyond Journey's End","slug":"sousou-no-frieren-b1c2","poster":{"hq":"frieren-hq","sm":"frieren-sm"}}"#,
        )
        .unwrap();
        let romaji = item.to_anime(BASE_URL, false);
        assert_eq!(romaji.title, "Sousou no Frieren");
        assert_eq!(romaji.url, "/sousou-no-frieren-b1c2");
        assert_eq!(
            romaji.thumbnail_url.as_deref(),
            Some("https://kaas.am/image/poster/frieren-hq.webp")
        );
        assert_eq!(item.to_anime(BASE_URL, true).title, "Frieren: Beyond Journey's End");
    }

    #[test]
    fn test_blank_english_title_falls_back() {
        assert_eq!(display_title("Romaji", " ", true), "Romaji");
    }

    #[test]
    fn test_show_info_description() {
        let info: ShowInfo = serde_json::from_str(
            r#"{"title":"One Piece","slug":"one-piece","poster":{"hq":"op"},"genres":["Action","Adventure"],"status":"currently_airing","synopsis":"Pirates.","season":"fall","year":1999}"#,
        )
        .unwrap();
        let anime = info.to_anime(BASE_URL, true, &["ja-JP".into(), "en-US".into()]);
        assert_eq!(anime.status, AnimeStatus::Ongoing);
        assert_eq!(anime.genre.as_deref(), Some("Action, Adventure"));
        assert_eq!(
            anime.description.as_deref(),
            Some("Pirates.\n\nAvailable Dub Languages: Japanese, English\nSeason: Fall\nYear: 1999")
        );
    }

    #[test]
    fn test_servers_accept_both_shapes() {
        let servers: Servers = serde_json::from_str(
            r#"{"servers":["https://kaavid.com/dust/player.php?id=1",{"name":"BirdStream","src":"https://kaavid.com/pink/player.php?id=2"}]}"#,
        )
        .unwrap();
        assert_eq!(servers.servers.len(), 2);
        assert_eq!(servers.servers[0].src(), "https://kaavid.com/dust/player.php?id=1");
        assert_eq!(servers.servers[1].src(), "https://kaavid.com/pink/player.php?id=2");
    }

    #[test]
    fn test_episodes_and_language() {
        let response: EpisodeResponse = serde_json::from_str(
            r#"{"pages":[{"number":1},{"number":2}],"result":[{"slug":"a1b2","title":"The Journey's End","episode_string":"1"},{"slug":"c3d4","title":"","episode_string":"1.5"}]}"#,
        )
        .unwrap();
        assert_eq!(response.pages.len(), 2);
        let episode = episode_from_item(&response.result[0], "/frieren", "en-US");
        assert_eq!(episode.url, "/frieren/ep-1-a1b2");
        assert_eq!(episode.name, "Ep. 1 - The Journey's End");
        assert_eq!(episode.scanlator.as_deref(), Some("English"));
        assert_eq!(episode_from_item(&response.result[1], "/frieren", "xx").episode_number, 1.5);

        let available = vec!["en-US".to_string(), "ja-JP".to_string()];
        assert_eq!(pick_language(&available, "en-US"), "en-US");
        assert_eq!(pick_language(&available, "es-ES"), "ja-JP");
    }

    #[test]
    fn test_search_body() {
        let plain = search_body(2, "frieren", &SearchFilters::new());
        assert_eq!(plain, json!({ "page": 2, "query": "frieren" }));

        let filtered = search_body(1, "x", &SearchFilters::new().with("year", "2023"));
        let encoded = filtered["filters"].as_str().unwrap();
        assert_eq!(base64::decode_to_string(encoded).unwrap(), r#"{"year":2023}"#);
    }

    #[test]
    fn test_sort_quality_then_server() {
        let source = KickAssAnime::new(Client::new(), SourceConfig::default());
        let sorted = source.sort().sorted(vec![
            Video::new("1", "PinkBird - 1080p"),
            Video::new("2", "PinkBird - 720p"),
            Video::new("3", "SapphireDuck - 720p"),
        ]);
        let labels: Vec<_> = sorted.iter().map(|v| v.quality.as_str()).collect();
        assert_eq!(labels, ["SapphireDuck - 720p", "PinkBird - 720p", "PinkBird - 1080p"]);
    }

    #[test]
    fn test_preferred_subtitles_come_first() {
        let tracks = vec![
            Track::new("/subs/en.vtt", "English (en-US)"),
            Track::new("/subs/es.vtt", "Spanish (es-ES)"),
        ];
        let video = || {
            Video::builder("https://kaavid.com/m.m3u8", "SapphireDuck - 720p")
                .subtitle_tracks(tracks.clone())
                .build()
        };

        let default = KickAssAnime::new(Client::new(), SourceConfig::default());
        assert_eq!(default.rank(vec![video()])[0].subtitle_tracks[0].url, "/subs/en.vtt");

        let config = SourceConfig {
            preferred_sub_lang: Some("es-ES".into()),
            ..Default::default()
        };
        let spanish = KickAssAnime::new(Client::new(), config);
        let ranked = spanish.rank(vec![video()]);
        let order: Vec<_> = ranked[0].subtitle_tracks.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(order, ["/subs/es.vtt", "/subs/en.vtt"]);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let source = KickAssAnime::new(Client::new(), SourceConfig::default());
        let result = source.search(1, "", &SearchFilters::new()).await;
        assert!(matches!(result, Err(ExtractorError::Other(_))));
    }
}
