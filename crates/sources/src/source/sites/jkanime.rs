use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use crate::extractor::{
    HosterFactory,
    default::no_redirect_client,
    error::ExtractorError,
    hoster_extractor::Extractor,
    utils::{between_non_empty, substring_after, substring_before, url_without_domain},
};
use crate::media::{Anime, AnimeStatus, AnimesPage, Episode, Video};
use crate::quality::prefer_exact;
use crate::source::html::{attr, document_first, own_text, script_containing, select_first, text};
use crate::source::pagination::collect_counted;
use crate::source::parallel::parallel_flat_map;
use crate::source::{AnimeSource, SearchFilters, SourceConfig};

const BASE_URL: &str = "https://jkanime.net";
const DEFAULT_QUALITY: &str = "Nozomi";
const XTREME_LABEL: &str = "Xtreme S";

static FILE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""file":"([^"]+)""#).unwrap());

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(TOP_ITEM, "div.col-lg-12 div.list");
selector!(TOP_LINK, "div#conb a");
selector!(TOP_IMG, "div#conb a img");
selector!(TOP_INFO, "div#conb div#animinfo p");
selector!(LATEST_ITEM, "div.card.mb-3.custom_item2");
selector!(LATEST_LINK, "div.custom_thumb2 a");
selector!(LATEST_TITLE, "h5.card-title a");
selector!(LATEST_SYNOPSIS, "p.card-text.synopsis");
selector!(LATEST_NEXT, "div.container div.navigation a.text.nav-next");
selector!(SEARCH_ITEM, "div.row div.col-lg-2.col-md-6.col-sm-6");
selector!(SEARCH_LINK, "div.anime__item a");
selector!(SEARCH_TITLE, "div.anime__item div#ainfo div.title");
selector!(SEARCH_BG, "div.anime__item a div");
selector!(IMG, "img");
selector!(DETAILS_PIC, "div.anime__details__pic");
selector!(DETAILS_TITLE, "div.anime__details__text div.anime__details__title h3");
selector!(DETAILS_TEXT, "div.anime__details__text p");
selector!(DETAILS_DATA, "div.row div.col-lg-6.col-md-6 ul li");
selector!(SPAN, "span");
selector!(LINK, "a");
selector!(ANIME_ID, "div#guardar-anime");
selector!(PAGINATION, "div.anime__pagination a");
selector!(SERVER, "div.bg-servers a");
selector!(FORM_VALUE, "form input[value]");

pub fn parse_top(html: &str) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(&TOP_ITEM)
        .filter_map(|item| {
            let link = select_first(item, &TOP_LINK)?;
            Some(
                Anime::builder(url_without_domain(&attr(link, "href")?), attr(link, "title")?)
                    .thumbnail_url_opt(select_first(item, &TOP_IMG).and_then(|img| attr(img, "src")))
                    .description_opt(select_first(item, &TOP_INFO).map(text))
                    .build(),
            )
        })
        .collect();
    AnimesPage::new(animes, false)
}

pub fn parse_latest(html: &str) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(&LATEST_ITEM)
        .filter_map(|card| {
            let link = select_first(card, &LATEST_LINK)?;
            Some(
                Anime::builder(
                    url_without_domain(&attr(link, "href")?),
                    select_first(card, &LATEST_TITLE).map(text).unwrap_or_default(),
                )
                .thumbnail_url_opt(select_first(link, &IMG).and_then(|img| attr(img, "src")))
                .description_opt(select_first(card, &LATEST_SYNOPSIS).map(text))
                .build(),
            )
        })
        .collect();
    let has_next = document.select(&LATEST_NEXT).next().is_some();
    AnimesPage::new(animes, has_next)
}

pub fn parse_search(html: &str) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(&SEARCH_ITEM)
        .filter_map(|item| {
            let href = select_first(item, &SEARCH_LINK).and_then(|a| attr(a, "href"))?;
            Some(
                Anime::builder(
                    url_without_domain(&href),
                    select_first(item, &SEARCH_TITLE).map(text).unwrap_or_default(),
                )
                .thumbnail_url_opt(select_first(item, &SEARCH_BG).and_then(|d| attr(d, "data-setbg")))
                .build(),
            )
        })
        .collect();
    AnimesPage::new(animes, false)
}

pub fn search_url(base_url: &str, page: u32, query: &str, filters: &SearchFilters) -> String {
    let query = query.trim();
    if !query.is_empty() {
        return format!("{base_url}/buscar/{}/{page}", urlencoding::encode(query));
    }
    match filters.get("genre") {
        Some(genre) => format!("{base_url}/genero/{genre}/{page}"),
        None => format!("{base_url}/directorio/{page}"),
    }
}

pub fn parse_status(raw: &str) -> AnimeStatus {
    if raw.contains("En emision") {
        AnimeStatus::Ongoing
    } else if raw.contains("Concluido") {
        AnimeStatus::Completed
    } else {
        AnimeStatus::Unknown
    }
}

pub fn parse_details(html: &str, url: &str) -> Result<Anime, ExtractorError> {
    let document = Html::parse_document(html);
    let title = document_first(&document, &DETAILS_TITLE)
        .map(text)
        .ok_or_else(|| ExtractorError::missing("anime title"))?;

    let mut builder = Anime::builder(url, title)
        .thumbnail_url_opt(document_first(&document, &DETAILS_PIC).and_then(|d| attr(d, "data-setbg")))
        .description_opt(document_first(&document, &DETAILS_TEXT).map(own_text));

    for row in document.select(&DETAILS_DATA) {
        let label: String = row.select(&SPAN).map(text).collect::<Vec<_>>().join(" ");
        let links: Vec<String> = row.select(&LINK).map(text).collect();
        if label.contains("Genero") {
            builder = builder.genre(links.join(", "));
        }
        if label.contains("Estado") {
            builder = builder.status(parse_status(&label));
        }
        if label.contains("Studios") {
            builder = builder.author_opt(Some(links.join(" ")).filter(|s| !s.is_empty()));
        }
    }
    Ok(builder.build())
}

/// The numeric id used by the episode endpoint and the number of episode pages.
pub fn episode_paging(html: &str) -> Option<(String, u32)> {
    let document = Html::parse_document(html);
    let id = document_first(&document, &ANIME_ID).and_then(|d| attr(d, "data-anime"))?;
    let last_page = document
        .select(&PAGINATION)
        .filter_map(|a| attr(a, "href"))
        .filter_map(|href| href.replace("#pag", "").trim().parse::<u32>().ok())
        .max()
        .unwrap_or(1);
    Some((id, last_page))
}

/// Episode numbers from one page of the pagination endpoint.
pub fn parse_episode_page(body: &str) -> Result<Vec<String>, ExtractorError> {
    let entries: Vec<Value> = serde_json::from_str(body)?;
    Ok(entries
        .iter()
        .filter_map(|entry| match entry.get("number")? {
            Value::String(n) => Some(n.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

pub fn episodes_from_numbers(anime_url: &str, numbers: &[String]) -> Vec<Episode> {
    let anime_path = anime_url.trim_end_matches('/');
    let mut episodes: Vec<Episode> = numbers
        .iter()
        .filter_map(|number| {
            let value: f32 = number.parse().ok()?;
            Some(Episode::new(
                format!("{anime_path}/{number}/"),
                format!("Episodio {number}"),
                value,
            ))
        })
        .collect();
    episodes.reverse();
    episodes
}

/// The player embed of every listed server, rewritten to the host it wraps.
pub fn parse_embeds(html: &str, base_url: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let Some(script) = script_containing(&document, "var video = [];") else {
        return Vec::new();
    };
    document
        .select(&SERVER)
        .filter_map(|server| {
            let id = attr(server, "data-id")?;
            let marker = format!("video[{id}] = '<iframe class=\"player_conte\" src=\"");
            if !script.contains(&marker) {
                return None;
            }
            let path = substring_before(substring_after(&script, &marker), "\"");
            let url = format!("{base_url}{path}")
                .replace(&format!("{base_url}/jkokru.php?u="), "http://ok.ru/videoembed/")
                .replace(&format!("{base_url}/jkvmixdrop.php?u="), "https://mixdrop.co/e/")
                .replace(&format!("{base_url}/jk.php?u="), &format!("{base_url}/"));
            Some((text(server), url))
        })
        .collect()
}

/// The stream url of an `um.php` player page.
pub fn um_player_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = script_containing(&document, "var parts = {")?;
    between_non_empty(&script, "url: '", "'").map(ToOwned::to_owned)
}

/// File urls of a Nozomi (`gsplay`) api response.
pub fn nozomi_files(body: &str) -> Vec<String> {
    FILE_REGEX
        .captures_iter(body)
        .map(|caps| caps[1].replace('\\', ""))
        .filter(|url| !url.trim().is_empty() && !url.contains('{'))
        .collect()
}

/// Nozomi files labelled with the server tab they were listed under.
pub fn nozomi_videos(body: &str, server: &str) -> Vec<Video> {
    nozomi_files(body)
        .into_iter()
        .map(|file| Video::new(file, server))
        .collect()
}

pub struct Jkanime {
    base_url: String,
    extractor: Extractor,
    no_redirect: Extractor,
    factory: HosterFactory,
    config: SourceConfig,
}

impl Jkanime {
    pub fn new(client: Client, config: SourceConfig) -> Result<Self, ExtractorError> {
        let base_url = config.base_url_or(BASE_URL);
        let extractor = Extractor::new("Jkanime", client.clone());
        let no_redirect = extractor.with_client(no_redirect_client()?);
        Ok(Self {
            base_url,
            extractor,
            no_redirect,
            factory: HosterFactory::new(client),
            config,
        })
    }

    async fn nozomi(
        &self,
        server: &str,
        url: &str,
        episode_url: &str,
    ) -> Result<Vec<Video>, ExtractorError> {
        let mut page = self.extractor.clone();
        page.set_referer(episode_url);
        let html = page.get_text(url).await?;
        let data_key = {
            let document = Html::parse_document(&html);
            document_first(&document, &FORM_VALUE).and_then(|input| attr(input, "value"))
        };
        let Some(data_key) = data_key else {
            return Ok(Vec::new());
        };

        let mut post = self.no_redirect.clone();
        post.set_referer(url);
        post.set_origin(&self.base_url);
        let response = post
            .post(&format!("{}/gsplay/redirect_post.php", self.base_url))
            .form(&[("data", data_key.as_str())])
            .send()
            .await?;
        let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(Vec::new());
        };
        let post_key = location.replace("/gsplay/player.html#", "");

        let body = self
            .extractor
            .post(&format!("{}/gsplay/api.php", self.base_url))
            .form(&[("v", post_key.as_str())])
            .send()
            .await?
            .text()
            .await?;
        Ok(nozomi_videos(&body, server))
    }

    async fn resolve(
        &self,
        server: &str,
        url: &str,
        episode_url: &str,
    ) -> Result<Vec<Video>, ExtractorError> {
        debug!(server, url, "Resolving Jkanime embed");
        if url.contains("um2") {
            return self.nozomi(server, url, episode_url).await;
        }
        if url.contains("stream/jkmedia") {
            return Ok(vec![Video::new(url, XTREME_LABEL)]);
        }
        if url.contains("um.php") {
            let html = self.extractor.get_text(url).await?;
            return Ok(um_player_url(&html)
                .map(|stream| vec![Video::new(stream, server)])
                .unwrap_or_default());
        }
        self.factory.try_videos_from_url(url, "").await
    }
}

#[async_trait]
impl AnimeSource for Jkanime {
    fn id(&self) -> &str {
        "jkanime"
    }

    fn name(&self) -> &str {
        "Jkanime"
    }

    fn lang(&self) -> &str {
        "es"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn filter_keys(&self) -> &'static [&'static str] {
        &["genre"]
    }

    async fn popular(&self, _page: u32) -> Result<AnimesPage, ExtractorError> {
        let html = self.extractor.get_text(&format!("{}/top/", self.base_url)).await?;
        Ok(parse_top(&html))
    }

    async fn latest(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        let url = format!(
            "{}/directorio/{page}/?filtro=fecha&tipo=none&estado=none&fecha=none&temporada=none&orden=desc",
            self.base_url
        );
        let html = self.extractor.get_text(&url).await?;
        Ok(parse_latest(&html))
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<AnimesPage, ExtractorError> {
        let html = self
            .extractor
            .get_text(&search_url(&self.base_url, page, query, filters))
            .await?;
        Ok(parse_search(&html))
    }

    async fn details(&self, anime: &Anime) -> Result<Anime, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&anime.url)).await?;
        parse_details(&html, &anime.url)
    }

    async fn episodes(&self, anime: &Anime) -> Result<Vec<Episode>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&anime.url)).await?;
        let Some((id, last_page)) = episode_paging(&html) else {
            warn!(url = %anime.url, "No anime id on the details page");
            return Ok(Vec::new());
        };

        let numbers = collect_counted(last_page, |page| {
            let url = format!("{}/ajax/pagination_episodes/{id}/{page}", self.base_url);
            async move {
                let body = self.extractor.get_text(&url).await?;
                parse_episode_page(&body)
            }
        })
        .await?;
        Ok(episodes_from_numbers(&anime.url, &numbers))
    }

    async fn videos(&self, episode: &Episode) -> Result<Vec<Video>, ExtractorError> {
        let episode_url = self.absolute(&episode.url);
        let html = self.extractor.get_text(&episode_url).await?;
        let embeds = parse_embeds(&html, &self.base_url);

        let episode_url = episode_url.as_str();
        let videos = parallel_flat_map(embeds, move |(server, url)| async move {
            self.resolve(&server, &url, episode_url).await
        })
        .await;
        Ok(prefer_exact(
            videos,
            self.config.preferred_quality_or(DEFAULT_QUALITY),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top() {
        let html = r#"<div class="col-lg-12"><div class="list">
            <div id="conb"><a href="https://jkanime.net/shingeki-no-kyojin/" title="Shingeki no Kyojin"><img src="https://cdn.jkanime.net/snk.jpg"></a>
            <div id="animinfo"><p>Titanes.</p></div></div>
          </div></div>"#;
        let page = parse_top(html);
        assert!(!page.has_next_page);
        assert_eq!(page.animes[0].url, "/shingeki-no-kyojin/");
        assert_eq!(page.animes[0].title, "Shingeki no Kyojin");
        assert_eq!(page.animes[0].description.as_deref(), Some("Titanes."));
    }

    #[test]
    fn test_search_url() {
        let filters = SearchFilters::new().with("genre", "latino");
        assert_eq!(
            search_url(BASE_URL, 2, "one piece", &filters),
            "https://jkanime.net/buscar/one%20piece/2"
        );
        assert_eq!(search_url(BASE_URL, 2, "", &filters), "https://jkanime.net/genero/latino/2");
        assert_eq!(
            search_url(BASE_URL, 1, "", &SearchFilters::new()),
            "https://jkanime.net/directorio/1"
        );
    }

    #[test]
    fn test_parse_details() {
        let html = r##"<div class="row">
            <div class="col-lg-3"><div class="anime__details__pic set-bg" data-setbg="https://cdn.jkanime.net/op.jpg"></div></div>
            <div class="col-lg-9"><div class="anime__details__text">
              <div class="anime__details__title"><h3>One Piece</h3><div id="guardar-anime" class="btn btn-light btn-sm ml-2" data-anime="381"></div></div>
              <p>Piratas en busca del tesoro. <span>Leer más</span></p>
              <div class="row"><div class="col-lg-6 col-md-6"><ul>
                <li><span>Genero:</span> <a href="/genero/accion">Acción</a> <a href="/genero/aventura">Aventura</a></li>
                <li><span>Studios:</span> <a href="/studio/toei">Toei Animation</a></li>
                <li><span>Estado:</span> <span class="enemision">En emision</span></li>
              </ul></div></div>
              <div class="anime__pagination"><a href="#pag1">1 - 12</a><a href="#pag2">13 - 24</a><a href="#pag3">25 - 30</a></div>
            </div></div>
          </div>"##;
        let anime = parse_details(html, "/one-piece/").unwrap();
        assert_eq!(anime.title, "One Piece");
        assert_eq!(anime.thumbnail_url.as_deref(), Some("https://cdn.jkanime.net/op.jpg"));
        assert_eq!(anime.description.as_deref(), Some("Piratas en busca del tesoro."));
        assert_eq!(anime.genre.as_deref(), Some("Acción, Aventura"));
        assert_eq!(anime.author.as_deref(), Some("Toei Animation"));
        assert_eq!(anime.status, AnimeStatus::Ongoing);

        assert_eq!(episode_paging(html), Some(("381".to_string(), 3)));
    }

    #[test]
    fn test_episode_pages() {
        let body = r#"[{"id":"1","number":"25","title":"x"},{"id":"2","number":26}]"#;
        let numbers = parse_episode_page(body).unwrap();
        assert_eq!(numbers, ["25", "26"]);

        let episodes = episodes_from_numbers("/one-piece/", &numbers);
        assert_eq!(episodes[0].url, "/one-piece/26/");
        assert_eq!(episodes[0].name, "Episodio 26");
        assert_eq!(episodes[1].episode_number, 25.0);
    }

    #[test]
    fn test_parse_embeds() {
        let html = r#"<div class="col-lg-12 rounded bg-servers text-white p-3 mt-2">
            <a data-id="0">Nozomi</a><a data-id="1">Okru</a><a data-id="2">Mixdrop</a><a data-id="3">Xtreme S</a><a data-id="9">Gone</a>
          </div>
          <script>var video = [];
            video[0] = '<iframe class="player_conte" src="/um2.php?e=abc" width="100%"></iframe>';
            video[1] = '<iframe class="player_conte" src="/jkokru.php?u=12345" width="100%"></iframe>';
            video[2] = '<iframe class="player_conte" src="/jkvmixdrop.php?u=mx1" width="100%"></iframe>';
            video[3] = '<iframe class="player_conte" src="/jk.php?u=stream/jkmedia/abc.mp4" width="100%"></iframe>';
          </script>"#;
        let embeds = parse_embeds(html, BASE_URL);
        assert_eq!(
            embeds,
            [
                ("Nozomi".to_string(), "https://jkanime.net/um2.php?e=abc".to_string()),
                ("Okru".to_string(), "http://ok.ru/videoembed/12345".to_string()),
                ("Mixdrop".to_string(), "https://mixdrop.co/e/mx1".to_string()),
                ("Xtreme S".to_string(), "https://jkanime.net/stream/jkmedia/abc.mp4".to_string()),
            ]
        );
    }

    #[test]
    fn test_player_helpers() {
        let um = r#"<script>var parts = { url: 'https://cdn.jkanime.net/desu/ep1.m3u8', type: 'hls' };</script>"#;
        assert_eq!(
            um_player_url(um).as_deref(),
            Some("https://cdn.jkanime.net/desu/ep1.m3u8")
        );
        let api = r#"{"file":"https:\/\/nozomi.example\/v\/ep1.mp4"}"#;
        assert_eq!(nozomi_files(api), ["https://nozomi.example/v/ep1.mp4"]);
        let videos = nozomi_videos(api, "Nozomi HD");
        assert_eq!(videos[0].quality, "Nozomi HD");
        assert_eq!(videos[0].url, "https://nozomi.example/v/ep1.mp4");
    }

    #[test]
    fn test_preferred_label_first() {
        let videos = vec![
            Video::new("a", "Xtreme S"),
            Video::new("b", "Desu"),
            Video::new("c", "Nozomi"),
        ];
        let sorted = prefer_exact(videos, DEFAULT_QUALITY);
        assert_eq!(sorted[0].quality, "Nozomi");
        assert_eq!(sorted[1].quality, "Xtreme S");
    }
}
