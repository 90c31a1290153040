use std::sync::LazyLock;

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::decode::base64;
use crate::extractor::{
    HosterFactory,
    default::no_redirect_client,
    error::ExtractorError,
    hoster_extractor::Extractor,
    utils::{absolute_url, capture_group_1, substring_before_last, url_without_domain},
};
use crate::media::{Anime, AnimeStatus, AnimesPage, Episode, Video};
use crate::quality::VideoSort;
use crate::source::html::{abs_attr, document_first, script_containing, select_first, text};
use crate::source::pagination::slice_page;
use crate::source::parallel::parallel_flatten;
use crate::source::{AnimeSource, SearchFilters, SourceConfig};

pub const ID_PREFIX: &str = "id:";
const BASE_URL: &str = "https://jav.guru";
const DEFAULT_QUALITY: &str = "720";
const POPULAR_PAGE_SIZE: usize = 20;

/// Filter keys and the listing path each one browses, in priority order.
const FILTER_PATHS: [(&str, &str); 6] = [
    ("tag", "tag"),
    ("category", "category"),
    ("actress", "actress"),
    ("actor", "actor"),
    ("studio", "studio"),
    ("maker", "maker"),
];

static IFRAME_B64_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""iframe_url":"([^"]+)""#).unwrap());
static OLID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var OLID = '([^']+)'").unwrap());
static OLID_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"src="([^"]+)""#).unwrap());

static RANK_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".tabcontent li").unwrap());
static ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.site-content div.inside-article").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static ARTICLE_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2 > a").unwrap());
static PAGENAVI: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.wp-pagenavi a").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".titl").unwrap());
static COVER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".large-screenshot img").unwrap());
static INFO_ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".infoleft li").unwrap());
static INFO_TAG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#".infoleft a[rel*="tag"]"#).unwrap());

/// `/{id}/` when the link's first path segment is the numeric post id.
fn id_path(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    let id: u64 = url.path_segments()?.next()?.parse().ok()?;
    Some(format!("/{id}/"))
}

fn entry_path(link: ElementRef<'_>, base_url: &str) -> Option<String> {
    let href = abs_attr(link, "href", base_url)?;
    Some(id_path(&href).unwrap_or_else(|| url_without_domain(&href)))
}

/// The page number in a `/page/N/` link.
pub fn page_number(url: &str) -> Option<u32> {
    let trimmed = substring_before_last(url, "/");
    Url::parse(trimmed)
        .ok()?
        .path_segments()?
        .next_back()?
        .parse()
        .ok()
}

/// The whole most-watched ranking; the site serves it as one page.
pub fn parse_ranking(html: &str, base_url: &str) -> Vec<Anime> {
    let document = Html::parse_document(html);
    document
        .select(&RANK_ITEM)
        .filter_map(|item| {
            let link = select_first(item, &LINK)?;
            Some(
                Anime::builder(entry_path(link, base_url)?, text(link))
                    .thumbnail_url_opt(
                        select_first(link, &IMG).and_then(|img| abs_attr(img, "src", base_url)),
                    )
                    .build(),
            )
        })
        .collect()
}

/// Latest, search and filter listings. `page` is the page that was requested.
pub fn parse_listing(html: &str, page: u32, base_url: &str) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(&ARTICLE)
        .filter(|article| !text(*article).to_lowercase().contains("nothing"))
        .filter_map(|article| {
            let path = select_first(article, &LINK).and_then(|a| entry_path(a, base_url))?;
            let title = select_first(article, &ARTICLE_TITLE).map(text).unwrap_or_default();
            Some(
                Anime::builder(path, title)
                    .thumbnail_url_opt(
                        select_first(article, &IMG).and_then(|img| abs_attr(img, "src", base_url)),
                    )
                    .build(),
            )
        })
        .collect();

    let last_page = document
        .select(&PAGENAVI)
        .last()
        .and_then(|a| abs_attr(a, "href", base_url))
        .and_then(|href| page_number(&href))
        .unwrap_or(1);
    AnimesPage::new(animes, page.max(1) < last_page)
}

fn info_row<'a>(document: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    document
        .select(&INFO_ROW)
        .find(|row| text(*row).to_lowercase().contains(label))
}

pub fn parse_details(html: &str, url: &str, base_url: &str) -> Anime {
    let document = Html::parse_document(html);
    let row_link = |label: &str| {
        info_row(&document, label)
            .and_then(|row| select_first(row, &LINK))
            .map(text)
    };

    let mut description = String::new();
    for label in ["code", "director", "studio", "label", "actor", "actress"] {
        if let Some(row) = info_row(&document, label) {
            description.push_str(&text(row));
            description.push('\n');
        }
    }
    let genres: Vec<String> = document.select(&INFO_TAG).map(text).collect();

    Anime::builder(url, document.select(&TITLE).map(text).collect::<Vec<_>>().join(" "))
        .thumbnail_url_opt(
            document_first(&document, &COVER).and_then(|img| abs_attr(img, "src", base_url)),
        )
        .genre(genres.join(", "))
        .author_opt(row_link("studio"))
        .artist_opt(row_link("label"))
        .description_opt(Some(description).filter(|d| !d.is_empty()))
        .status(AnimeStatus::Completed)
        .build()
}

/// Player iframe urls, base64 encoded in the page's `iframe_url` fields.
pub fn iframe_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Some(script) = script_containing(&document, "iframe_url") else {
        return Vec::new();
    };
    IFRAME_B64_REGEX
        .captures_iter(&script)
        .filter_map(|caps| base64::decode_to_string(&caps[1]).ok())
        .collect()
}

/// The redirecting url of an iframe page: its `src` with the last query
/// value replaced by the reversed `OLID`.
pub fn olid_url(iframe_html: &str) -> Option<String> {
    let document = Html::parse_document(iframe_html);
    let script = script_containing(&document, "start_player")?;
    let olid: String = capture_group_1(&OLID_REGEX, &script)?.chars().rev().collect();
    let src = capture_group_1(&OLID_URL_REGEX, &script)?;
    Some(format!("{}={olid}", substring_before_last(src, "=")))
}

pub fn search_url(base_url: &str, page: u32, query: &str) -> String {
    let page_path = if page > 1 { format!("/page/{page}/") } else { "/".to_string() };
    format!("{base_url}{page_path}?s={}", urlencoding::encode(query))
}

/// The listing url of the first filter that carries a value.
pub fn filter_url(base_url: &str, page: u32, filters: &SearchFilters) -> Option<(String, bool)> {
    FILTER_PATHS.iter().enumerate().find_map(|(i, (key, path))| {
        let value = filters.get(key)?;
        let slug = value.trim().to_lowercase().replace(' ', "-");
        let page_path = if page > 1 { format!("page/{page}/") } else { String::new() };
        // free-text filters may name something that has no listing
        let tolerate_404 = i >= 2;
        Some((
            format!("{base_url}/{path}/{}/{page_path}", urlencoding::encode(&slug)),
            tolerate_404,
        ))
    })
}

pub struct JavGuru {
    base_url: String,
    extractor: Extractor,
    no_redirect: Extractor,
    factory: HosterFactory,
    config: SourceConfig,
    ranking: RwLock<Vec<Anime>>,
}

impl JavGuru {
    pub fn new(client: Client, config: SourceConfig) -> Result<Self, ExtractorError> {
        let base_url = config.base_url_or(BASE_URL);
        let extractor = Extractor::new("JavGuru", client.clone());
        let no_redirect = extractor.with_client(no_redirect_client()?);
        Ok(Self {
            base_url,
            extractor,
            no_redirect,
            factory: HosterFactory::new(client),
            config,
            ranking: RwLock::new(Vec::new()),
        })
    }

    async fn listing(
        &self,
        url: &str,
        page: u32,
        tolerate_404: bool,
    ) -> Result<AnimesPage, ExtractorError> {
        let response = self.extractor.get(url).send().await?;
        if tolerate_404 && response.status() == StatusCode::NOT_FOUND {
            return Ok(AnimesPage::new(Vec::new(), false));
        }
        let html = response.error_for_status()?.text().await?;
        Ok(parse_listing(&html, page, &self.base_url))
    }

    async fn hoster_url(&self, iframe_url: &str) -> Result<Option<String>, ExtractorError> {
        let response = self.extractor.get(iframe_url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let html = response.text().await?;
        let Some(olid_url) = olid_url(&html) else {
            return Ok(None);
        };

        let mut player = self.no_redirect.clone();
        player.set_referer(iframe_url);
        let location = player.location(&olid_url).await?;
        Ok(location.filter(|url| Url::parse(url).is_ok()))
    }
}

#[async_trait]
impl AnimeSource for JavGuru {
    fn id(&self) -> &str {
        "javguru"
    }

    fn name(&self) -> &str {
        "Jav Guru"
    }

    fn lang(&self) -> &str {
        "all"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn filter_keys(&self) -> &'static [&'static str] {
        &["tag", "category", "actress", "actor", "studio", "maker"]
    }

    async fn popular(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        let refresh = page <= 1 || self.ranking.read().is_empty();
        if refresh {
            let url = format!("{}/most-watched-rank/", self.base_url);
            let html = self.extractor.get_text(&url).await?;
            *self.ranking.write() = parse_ranking(&html, &self.base_url);
        }
        let (animes, has_next) = slice_page(&self.ranking.read(), page, POPULAR_PAGE_SIZE);
        Ok(AnimesPage::new(animes, has_next))
    }

    async fn latest(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        let url = if page > 1 {
            format!("{}/page/{page}/", self.base_url)
        } else {
            self.base_url.clone()
        };
        self.listing(&url, page, false).await
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<AnimesPage, ExtractorError> {
        if let Some(id) = query.strip_prefix(ID_PREFIX) {
            if id.trim().parse::<u64>().is_err() {
                return Ok(AnimesPage::new(Vec::new(), false));
            }
            let anime = self.details(&Anime::from_url(format!("/{}/", id.trim()))).await?;
            return Ok(AnimesPage::single(anime));
        }
        if !query.trim().is_empty() {
            let url = search_url(&self.base_url, page, query.trim());
            return self.listing(&url, page, false).await;
        }
        let (url, tolerate_404) =
            filter_url(&self.base_url, page, filters).ok_or(ExtractorError::MissingFilter)?;
        self.listing(&url, page, tolerate_404).await
    }

    async fn details(&self, anime: &Anime) -> Result<Anime, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&anime.url)).await?;
        Ok(parse_details(&html, &anime.url, &self.base_url))
    }

    async fn episodes(&self, anime: &Anime) -> Result<Vec<Episode>, ExtractorError> {
        Ok(vec![Episode::new(anime.url.clone(), "Episode", 1.0)])
    }

    async fn videos(&self, episode: &Episode) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&episode.url)).await?;
        let iframes = iframe_urls(&html);

        let videos = parallel_flatten(iframes, move |iframe| async move {
            let iframe = absolute_url(&self.base_url, &iframe);
            match self.hoster_url(&iframe).await {
                Ok(Some(url)) => self.factory.videos_from_url(&url, "").await,
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!(iframe = %iframe, error = %e, "Failed to resolve player");
                    Vec::new()
                }
            }
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
    use rstest::rstest;

    #[rstest]
    #[case("https://jav.guru/123456/abp-123-some-title/", "/123456/")]
    #[case("https://jav.guru/abp-123-some-title/", "/abp-123-some-title/")]
    fn test_entry_urls(#[case] href: &str, #[case] expected: &str) {
        let html = format!(r#"<a href="{href}">x</a>"#);
        let fragment = Html::parse_fragment(&html);
        let link = fragment.select(&LINK).next().unwrap();
        assert_eq!(entry_path(link, BASE_URL).as_deref(), Some(expected));
    }

    #[test]
    fn test_page_number() {
        assert_eq!(page_number("https://jav.guru/page/250/"), Some(250));
        assert_eq!(page_number("https://jav.guru/"), None);
    }

    #[test]
    fn test_parse_listing() {
        let html = r#"<div class="site-content">
            <div class="inside-article"><a href="https://jav.guru/4242/abc-001/"><img src="/wp/abc.jpg"></a><h2><a href="https://jav.guru/4242/abc-001/">ABC-001 Title</a></h2></div>
            <div class="inside-article"><p>It seems we can't find what you're looking for. Perhaps searching can help. Nothing here.</p></div>
          </div>
          <div class="wp-pagenavi"><a href="https://jav.guru/page/2/">2</a><a class="last" href="https://jav.guru/page/9/">Last</a></div>"#;
        let page = parse_listing(html, 1, BASE_URL);
        assert_eq!(page.animes.len(), 1);
        assert_eq!(page.animes[0].url, "/4242/");
        assert_eq!(page.animes[0].title, "ABC-001 Title");
        assert_eq!(
            page.animes[0].thumbnail_url.as_deref(),
            Some("https://jav.guru/wp/abc.jpg")
        );
        assert!(page.has_next_page);
        assert!(!parse_listing(html, 9, BASE_URL).has_next_page);
    }

    #[test]
    fn test_ranking_pages_of_twenty() {
        let items: String = (1..=45)
            .map(|i| format!(r#"<li><a href="https://jav.guru/{i}/t/"><img src="/{i}.jpg">T{i}</a></li>"#))
            .collect();
        let html = format!(r#"<div class="tabcontent"><ul>{items}</ul></div>"#);
        let ranking = parse_ranking(&html, BASE_URL);
        assert_eq!(ranking.len(), 45);
        let (third, more) = slice_page(&ranking, 3, POPULAR_PAGE_SIZE);
        assert_eq!(third.len(), 5);
        assert!(!more);
        assert_eq!(third[0].url, "/41/");
    }

    #[test]
    fn test_parse_details() {
        let html = r#"<h1 class="titl">ABC-001 Title</h1>
            <div class="large-screenshot"><img src="https://cdn.jav.guru/abc.jpg"></div>
            <div class="infoleft"><ul>
              <li><strong>Code: </strong>ABC-001</li>
              <li><strong>Studio: </strong><a href="/studio/s1/">S1 Studio</a></li>
              <li><strong>Label: </strong><a href="/label/l1/">Label One</a></li>
              <li><strong>Tags: </strong><a rel="tag" href="/tag/drama/">Drama</a><a rel="category tag" href="/tag/hd/">HD</a></li>
            </ul></div>"#;
        let anime = parse_details(html, "/4242/", BASE_URL);
        assert_eq!(anime.url, "/4242/");
        assert_eq!(anime.title, "ABC-001 Title");
        assert_eq!(anime.author.as_deref(), Some("S1 Studio"));
        assert_eq!(anime.artist.as_deref(), Some("Label One"));
        assert_eq!(anime.genre.as_deref(), Some("Drama, HD"));
        assert_eq!(anime.status, AnimeStatus::Completed);
        assert!(anime.description.unwrap().starts_with("Code: ABC-001\n"));
    }

    #[test]
    fn test_iframe_and_olid() {
        // "https://jav.guru/searcho/?d=1" in base64
        let page = r#"<script>var data = {"iframe_url":"aHR0cHM6Ly9qYXYuZ3VydS9zZWFyY2hvLz9kPTE="};</script>"#;
        assert_eq!(iframe_urls(page), ["https://jav.guru/searcho/?d=1"]);

        let iframe = r#"<script>var OLID = 'cba321'; function start_player(){ document.write('<iframe src="https://jav.guru/searcho/?ed=XYZ"></iframe>'); }</script>"#;
        assert_eq!(
            olid_url(iframe).as_deref(),
            Some("https://jav.guru/searcho/?ed=123abc")
        );
    }

    #[test]
    fn test_search_and_filter_urls() {
        assert_eq!(search_url(BASE_URL, 1, "abc 001"), "https://jav.guru/?s=abc%20001");
        assert_eq!(search_url(BASE_URL, 2, "abc"), "https://jav.guru/page/2/?s=abc");

        let filters = SearchFilters::new().with("actress", "Jane Doe");
        assert_eq!(
            filter_url(BASE_URL, 2, &filters),
            Some(("https://jav.guru/actress/jane-doe/page/2/".to_string(), true))
        );
        assert_eq!(filter_url(BASE_URL, 1, &SearchFilters::new()), None);
    }

    #[tokio::test]
    async fn test_empty_search_needs_filter() {
        let source = JavGuru::new(Client::new(), SourceConfig::default()).unwrap();
        let result = source.search(1, "  ", &SearchFilters::new()).await;
        assert!(matches!(result, Err(ExtractorError::MissingFilter)));
        let result = source.search(1, "id:abc", &SearchFilters::new()).await.unwrap();
        assert!(result.animes.is_empty());
    }
}
