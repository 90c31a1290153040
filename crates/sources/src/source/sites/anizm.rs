use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::extractor::{
    HosterFactory,
    default::no_redirect_client,
    error::ExtractorError,
    hoster_extractor::Extractor,
    utils::{substring_before, substring_before_last, url_without_domain},
};
use crate::media::{Anime, AnimesPage, Episode, Video};
use crate::quality::VideoSort;
use crate::source::html::{abs_attr, attr, document_first, each_text, select_first, text};
use crate::source::pagination::slice_page;
use crate::source::parallel::parallel_flatten;
use crate::source::{AnimeSource, SearchFilters, SourceConfig};

pub const ID_PREFIX: &str = "id:";
const BASE_URL: &str = "https://anizm.net";
const DEFAULT_QUALITY: &str = "720p";
const SEARCH_PAGE_SIZE: usize = 30;

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(POPULAR_ITEM, "div.popularAnimeCarousel a.slideAnimeLink");
selector!(LATEST_ITEM, "div#episodesMiddle div.posterBlock > a");
selector!(LATEST_NEXT, "div.nextBeforeButtons > div.ui > a.right:not(.disabled)");
selector!(ITEM_TITLE, ".title");
selector!(IMG, "img");
selector!(PAGE_TITLE, "h2.anizm_pageTitle");
selector!(POSTER, "div.infoPosterImg > img");
selector!(INFO_BOX, "div.anizm_boxContent");
selector!(GENRES, "span.dataValue > span.tag > span.label");
selector!(DATA_TITLE, "span.dataTitle");
selector!(INFO_DESC, "div.infoDesc");
selector!(DATA_ROW, "li.dataRow");
selector!(ROW_TAG, "span.ui.tag");
selector!(ROW_STAR, "div.star");
selector!(EPISODE, "div.episodeListTabContent div > a");
selector!(FANSUB, "div#fansec > a");
selector!(PLAYER_BUTTON, "a.videoPlayerButtons");

/// An entry of the site's full search index.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    #[serde(rename = "info_title")]
    pub title: String,
    #[serde(rename = "info_slug")]
    pub slug: String,
    #[serde(rename = "info_poster", default)]
    pub thumbnail: String,
    #[serde(rename = "info_othernames", default)]
    pub other_names: Option<String>,
    #[serde(rename = "info_year", default)]
    pub year: Option<String>,
    #[serde(rename = "info_studios", default)]
    pub studios: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    #[serde(alias = "tag_title")]
    pub title: String,
}

impl SearchItem {
    fn matches(&self, query: &str, filters: &SearchFilters) -> bool {
        let query = query.trim().to_lowercase();
        if !query.is_empty() {
            let in_title = self.title.to_lowercase().contains(&query);
            let in_other = self
                .other_names
                .as_deref()
                .is_some_and(|names| names.to_lowercase().contains(&query));
            if !in_title && !in_other {
                return false;
            }
        }
        if let Some(year) = filters.get("year")
            && self.year.as_deref().map(str::trim) != Some(year)
        {
            return false;
        }
        if let Some(studio) = filters.get("studio") {
            let studio = studio.to_lowercase();
            if !self
                .studios
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(&studio))
            {
                return false;
            }
        }
        filters.get_all("genre").all(|genre| {
            self.categories
                .iter()
                .any(|c| c.title.eq_ignore_ascii_case(genre))
        })
    }

    fn to_anime(&self, base_url: &str) -> Anime {
        Anime::builder(format!("/{}", self.slug), &self.title)
            .thumbnail_url(format!("{base_url}/storage/pcovers/{}", self.thumbnail))
            .build()
    }
}

/// Page `page` of the index entries matching `query` and `filters`.
pub fn search_index(
    items: &[SearchItem],
    page: u32,
    query: &str,
    filters: &SearchFilters,
    base_url: &str,
) -> AnimesPage {
    let matching: Vec<&SearchItem> = items.iter().filter(|i| i.matches(query, filters)).collect();
    let (chunk, has_next) = slice_page(&matching, page, SEARCH_PAGE_SIZE);
    AnimesPage::new(chunk.iter().map(|i| i.to_anime(base_url)).collect(), has_next)
}

/// Cards link to an episode; keep the show slug only.
fn show_path(href: &str) -> String {
    url_without_domain(substring_before_last(substring_before(href, "-bolum-izle"), "-"))
}

fn parse_cards(html: &str, item: &Selector, next: Option<&Selector>) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(item)
        .filter_map(|card| {
            let title = select_first(card, &ITEM_TITLE).map(text)?;
            let href = attr(card, "href")?;
            Some(
                Anime::builder(show_path(&href), title)
                    .thumbnail_url_opt(select_first(card, &IMG).and_then(|img| attr(img, "src")))
                    .build(),
            )
        })
        .collect();
    let has_next = next.is_some_and(|next| document.select(next).next().is_some());
    AnimesPage::new(animes, has_next)
}

pub fn parse_popular(html: &str) -> AnimesPage {
    parse_cards(html, &POPULAR_ITEM, None)
}

pub fn parse_latest(html: &str) -> AnimesPage {
    parse_cards(html, &LATEST_ITEM, Some(&*LATEST_NEXT))
}

pub fn parse_details(html: &str, url: &str, base_url: &str) -> Result<Anime, ExtractorError> {
    let document = Html::parse_document(html);
    let title = document_first(&document, &PAGE_TITLE)
        .map(text)
        .ok_or_else(|| ExtractorError::missing("anime title"))?;
    let thumbnail = document_first(&document, &POSTER).and_then(|img| abs_attr(img, "src", base_url));
    let info = document_first(&document, &INFO_BOX)
        .ok_or_else(|| ExtractorError::missing("info box"))?;

    let studio = info
        .select(&DATA_TITLE)
        .find(|t| text(*t).contains("Stüdyo"))
        .and_then(|t| t.next_siblings().find_map(scraper::ElementRef::wrap))
        .map(text);

    let mut description = select_first(info, &INFO_DESC).map(text).unwrap_or_default();
    for row in info.select(&DATA_ROW) {
        if select_first(row, &ROW_TAG).is_some() || select_first(row, &ROW_STAR).is_some() {
            continue;
        }
        for span in row.children().filter_map(scraper::ElementRef::wrap) {
            if span.value().name() != "span" {
                continue;
            }
            if span.value().classes().any(|c| c == "dataTitle") {
                description.push_str(&format!("\n{}: ", text(span)));
            } else {
                description.push_str(&text(span));
            }
        }
    }

    Ok(Anime::builder(url_without_domain(url), title)
        .thumbnail_url_opt(thumbnail)
        .genre(each_text(info, &GENRES).join(", "))
        .artist_opt(studio)
        .description_opt(Some(description).filter(|d| !d.is_empty()))
        .build())
}

/// Episodes, oldest first.
pub fn parse_episodes(html: &str) -> Vec<Episode> {
    let document = Html::parse_document(html);
    let mut episodes: Vec<Episode> = document
        .select(&EPISODE)
        .filter_map(|a| {
            let href = attr(a, "href")?;
            let name = text(a);
            let digits: String = name.chars().filter(char::is_ascii_digit).collect();
            Some(Episode::new(url_without_domain(&href), name, digits.parse().unwrap_or(1.0)))
        })
        .collect();
    episodes.reverse();
    episodes
}

/// The fansub endpoints of an episode page.
pub fn parse_translators(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&FANSUB)
        .filter_map(|a| attr(a, "translator"))
        .collect()
}

#[derive(Debug, Deserialize)]
struct TranslatorResponse {
    data: String,
}

/// Player urls from a translator response, `/video/` rewritten to `/player/`.
pub fn parse_player_urls(body: &str) -> Result<Vec<String>, ExtractorError> {
    let response: TranslatorResponse = serde_json::from_str(body)?;
    let fragment = Html::parse_fragment(&response.data);
    Ok(fragment
        .select(&PLAYER_BUTTON)
        .filter_map(|a| attr(a, "video"))
        .map(|url| url.replace("/video/", "/player/"))
        .collect())
}

pub struct Anizm {
    base_url: String,
    extractor: Extractor,
    no_redirect: Extractor,
    factory: HosterFactory,
    config: SourceConfig,
    search_index: OnceCell<Vec<SearchItem>>,
}

impl Anizm {
    pub fn new(client: Client, config: SourceConfig) -> Result<Self, ExtractorError> {
        let base_url = config.base_url_or(BASE_URL);
        let mut extractor = Extractor::new("Anizm", client.clone());
        extractor.set_origin(&base_url);
        extractor.set_referer(&format!("{base_url}/"));
        let no_redirect = extractor.with_client(no_redirect_client()?);
        Ok(Self {
            base_url,
            extractor,
            no_redirect,
            factory: HosterFactory::new(client),
            config,
            search_index: OnceCell::new(),
        })
    }

    async fn index(&self) -> Result<&[SearchItem], ExtractorError> {
        let items = self
            .search_index
            .get_or_try_init(|| async {
                let url = format!("{}/getAnimeListForSearch", self.base_url);
                let body = self.extractor.get_text(&url).await?;
                let items: Vec<SearchItem> = serde_json::from_str(&body)?;
                debug!(count = items.len(), "Loaded Anizm search index");
                Ok::<_, ExtractorError>(items)
            })
            .await?;
        Ok(items.as_slice())
    }

    async fn player_urls(&self, translator: &str) -> Result<Vec<String>, ExtractorError> {
        let body = self.extractor.get_text(&self.absolute(translator)).await?;
        parse_player_urls(&body)
    }

    async fn resolve_player(&self, player_url: &str) -> Result<Vec<Video>, ExtractorError> {
        let Some(location) = self.no_redirect.location(&self.absolute(player_url)).await? else {
            return Ok(Vec::new());
        };
        Ok(self.factory.videos_from_url(&location, "").await)
    }
}

#[async_trait]
impl AnimeSource for Anizm {
    fn id(&self) -> &str {
        "anizm"
    }

    fn name(&self) -> &str {
        "Anizm"
    }

    fn lang(&self) -> &str {
        "tr"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn filter_keys(&self) -> &'static [&'static str] {
        &["genre", "year", "studio"]
    }

    async fn popular(&self, _page: u32) -> Result<AnimesPage, ExtractorError> {
        let html = self.extractor.get_text(&self.base_url).await?;
        Ok(parse_popular(&html))
    }

    async fn latest(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        let url = format!("{}/anime-izle?sayfa={page}", self.base_url);
        let html = self.extractor.get_text(&url).await?;
        Ok(parse_latest(&html))
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<AnimesPage, ExtractorError> {
        if let Some(id) = query.strip_prefix(ID_PREFIX) {
            let anime = self.details(&Anime::from_url(format!("/{id}"))).await?;
            return Ok(AnimesPage::single(anime));
        }
        let items = self.index().await?;
        Ok(search_index(items, page, query, filters, &self.base_url))
    }

    async fn details(&self, anime: &Anime) -> Result<Anime, ExtractorError> {
        let url = self.absolute(&anime.url);
        let html = self.extractor.get_text(&url).await?;
        parse_details(&html, &url, &self.base_url)
    }

    async fn episodes(&self, anime: &Anime) -> Result<Vec<Episode>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&anime.url)).await?;
        Ok(parse_episodes(&html))
    }

    async fn videos(&self, episode: &Episode) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&episode.url)).await?;

        let mut players = Vec::new();
        for translator in parse_translators(&html) {
            match self.player_urls(&translator).await {
                Ok(urls) => players.extend(urls),
                Err(e) => warn!(translator = %translator, error = %e, "Skipping fansub"),
            }
        }

        let videos = parallel_flatten(players, move |url| async move {
            self.resolve_player(&url).await.unwrap_or_else(|e| {
                warn!(url = %url, error = %e, "Player did not redirect");
                Vec::new()
            })
        })
        .await;

        Ok(VideoSort::new()
            .quality(self.config.preferred_quality_or(DEFAULT_QUALITY))
            .sorted(videos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, slug: &str, year: &str, genres: &[&str]) -> SearchItem {
        SearchItem {
            title: title.into(),
            slug: slug.into(),
            thumbnail: format!("{slug}.jpg"),
            other_names: None,
            year: Some(year.into()),
            studios: Some("Madhouse".into()),
            categories: genres.iter().map(|g| Category { title: g.to_string() }).collect(),
        }
    }

    #[test]
    fn test_show_path_drops_episode_suffix() {
        assert_eq!(
            show_path("https://anizm.net/one-piece-1080-bolum-izle"),
            "/one-piece"
        );
    }

    #[test]
    fn test_search_index_pages_and_filters() {
        let mut items: Vec<SearchItem> = (0..45)
            .map(|i| item(&format!("Show {i}"), &format!("show-{i}"), "2020", &["Aksiyon"]))
            .collect();
        items.push(item("Frieren", "frieren", "2023", &["Fantastik"]));

        let first = search_index(&items, 1, "show", &SearchFilters::new(), BASE_URL);
        assert_eq!(first.animes.len(), 30);
        assert!(first.has_next_page);
        let second = search_index(&items, 2, "show", &SearchFilters::new(), BASE_URL);
        assert_eq!(second.animes.len(), 15);
        assert!(!second.has_next_page);

        let filtered = search_index(
            &items,
            1,
            "",
            &SearchFilters::new().with("year", "2023").with("genre", "fantastik"),
            BASE_URL,
        );
        assert_eq!(filtered.animes.len(), 1);
        assert_eq!(filtered.animes[0].url, "/frieren");
        assert_eq!(
            filtered.animes[0].thumbnail_url.as_deref(),
            Some("https://anizm.net/storage/pcovers/frieren.jpg")
        );
    }

    #[test]
    fn test_search_item_deserializes() {
        let json = r#"[{"info_title":"Naruto","info_slug":"naruto","info_poster":"n.jpg","info_year":"2002","categories":[{"tag_title":"Aksiyon"}]}]"#;
        let items: Vec<SearchItem> = serde_json::from_str(json).unwrap();
        assert_eq!(items[0].categories[0].title, "Aksiyon");
        assert!(items[0].studios.is_none());
    }

    #[test]
    fn test_parse_details() {
        let html = r#"<html><body>
            <div class="infoPosterImg"><img src="/storage/posters/frieren.jpg"></div>
            <h2 class="anizm_pageTitle">Sousou no Frieren</h2>
            <div class="anizm_boxContent">
              <div class="infoDesc">Bir elf büyücü.</div>
              <ul>
                <li class="dataRow"><span class="dataTitle">Stüdyo</span><span class="dataValue">Madhouse</span></li>
                <li class="dataRow"><span class="dataTitle">Bölüm</span><span class="dataValue">28</span></li>
                <li class="dataRow"><span class="dataTitle">Kategori</span><span class="dataValue"><span class="ui tag"><span class="label">Macera</span></span><span class="ui tag"><span class="label">Dram</span></span></span></li>
              </ul>
            </div></body></html>"#;
        let anime = parse_details(html, "https://anizm.net/sousou-no-frieren", BASE_URL).unwrap();
        assert_eq!(anime.url, "/sousou-no-frieren");
        assert_eq!(anime.title, "Sousou no Frieren");
        assert_eq!(
            anime.thumbnail_url.as_deref(),
            Some("https://anizm.net/storage/posters/frieren.jpg")
        );
        assert_eq!(anime.genre.as_deref(), Some("Macera, Dram"));
        assert_eq!(anime.artist.as_deref(), Some("Madhouse"));
        assert_eq!(
            anime.description.as_deref(),
            Some("Bir elf büyücü.\nStüdyo: Madhouse\nBölüm: 28")
        );
    }

    #[test]
    fn test_parse_episodes_oldest_first() {
        let html = r#"<div class="episodeListTabContent"><div>
            <a href="https://anizm.net/frieren-2-bolum-izle">2. Bölüm</a>
            <a href="https://anizm.net/frieren-1-bolum-izle">1. Bölüm</a>
            <a href="https://anizm.net/frieren-ozel-bolum-izle">Özel Bölüm</a>
          </div></div>"#;
        let episodes = parse_episodes(html);
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].name, "Özel Bölüm");
        assert_eq!(episodes[0].episode_number, 1.0);
        assert_eq!(episodes[2].url, "/frieren-2-bolum-izle");
        assert_eq!(episodes[2].episode_number, 2.0);
    }

    #[test]
    fn test_translators_and_players() {
        let html = r#"<div id="fansec"><a translator="https://anizm.net/episode/1/translator/4">TRAnimeÇeviri</a><a>no endpoint</a></div>"#;
        assert_eq!(
            parse_translators(html),
            ["https://anizm.net/episode/1/translator/4"]
        );

        let body = r#"{"data":"<div><a class=\"videoPlayerButtons\" video=\"https://anizm.net/video/991\">Sibnet</a><a class=\"videoPlayerButtons\" video=\"https://anizm.net/video/992\">Voe</a></div>"}"#;
        assert_eq!(
            parse_player_urls(body).unwrap(),
            ["https://anizm.net/player/991", "https://anizm.net/player/992"]
        );
    }

    #[test]
    fn test_latest_next_page() {
        let html = r##"<div id="episodesMiddle"><div class="posterBlock"><a href="https://anizm.net/frieren-28-bolum-izle"><img src="f.jpg"><div class="title">Frieren</div></a></div></div>
            <div class="nextBeforeButtons"><div class="ui"><a class="right disabled" href="#">next</a></div></div>"##;
        let page = parse_latest(html);
        assert_eq!(page.animes[0].url, "/frieren");
        assert!(!page.has_next_page);
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_popular() {
        let source = Anizm::new(Client::new(), SourceConfig::default()).unwrap();
        let page = source.popular(1).await.unwrap();
        assert!(!page.animes.is_empty());
    }
}
