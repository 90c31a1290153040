//! The "AnimeStream" WordPress theme shared by many donghua and anime sites.
//!
//! Every instance differs only by name, language and domain.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::decode::base64;
use crate::extractor::{
    HosterFactory,
    error::ExtractorError,
    hoster_extractor::Extractor,
    utils::{fix_url, substring_before, url_without_domain},
};
use crate::media::{Anime, AnimeStatus, AnimesPage, Episode, Video};
use crate::quality::{VideoSort, sort_subtitles};
use crate::source::html::{each_text, image_url, own_text, select_first, text};
use crate::source::parallel::parallel_flatten;
use crate::source::{AnimeSource, SearchFilters, SourceConfig};

pub const PATH_PREFIX: &str = "path:";
const DEFAULT_QUALITY: &str = "720p";

/// A site running the theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimeStreamInstance {
    pub id: &'static str,
    pub name: &'static str,
    pub base_url: &'static str,
    pub lang: &'static str,
}

macro_rules! instances {
    ( $( $id:literal => ($name:literal, $base_url:literal, $lang:literal) ),+ $(,)? ) => {
        &[
            $(
                AnimeStreamInstance {
                    id: $id,
                    name: $name,
                    base_url: $base_url,
                    lang: $lang,
                },
            )+
        ]
    };
}

pub static INSTANCES: &[AnimeStreamInstance] = instances![
    "animeindo" => ("AnimeIndo", "https://animeindo.quest", "id"),
    "animekhor" => ("AnimeKhor", "https://animekhor.xyz", "en"),
    "animenosub" => ("Animenosub", "https://animenosub.com", "en"),
    "animetitans" => ("AnimeTitans", "https://animetitans.com", "ar"),
    "animexin" => ("AnimeXin", "https://animexin.vip", "all"),
    "asyaanimeleri" => ("AsyaAnimeleri", "https://asyaanimeleri.com", "tr"),
    "chineseanime" => ("ChineseAnime", "https://chineseanime.top", "all"),
    "desuonline" => ("desu-online", "https://desu-online.pl", "pl"),
    "donghuastream" => ("DonghuaStream", "https://donghuastream.co.in", "en"),
    "lmanime" => ("LMAnime", "https://lmanime.com", "all"),
    "luciferdonghua" => ("LuciferDonghua", "https://luciferdonghua.in", "en"),
    "rinecloud" => ("RineCloud", "https://rine.cloud", "pt-BR"),
    "tranimeci" => ("TRAnimeCI", "https://tranimeci.com", "tr"),
];

pub fn instance(id: &str) -> Option<&'static AnimeStreamInstance> {
    INSTANCES.iter().find(|i| i.id == id)
}

macro_rules! selector {
    ($name:ident, $css:literal) => {
        static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

selector!(POPULAR_ITEM, "div.serieslist.wpop-alltime li");
selector!(POPULAR_LINK, "h4 > a.series");
selector!(IMG, "img");
selector!(LIST_ITEM, "div.listupd article a.tip");
selector!(LIST_TITLE, "div.tt");
selector!(NEXT_PAGE, "div.pagination a.next, div.hpage > a.r");
selector!(TITLE, "h1.entry-title");
selector!(THUMB, "div.thumb > img");
selector!(INFOS, "div.info-content");
selector!(GENRES, "div.genxed > a");
selector!(SPAN, "span");
selector!(LINK, "a");
selector!(CONTENT, "div.entry-content");
selector!(SPE_SPANS, "div.spe > span");
selector!(EPISODE, "div.eplister > ul > li > a");
selector!(EPISODE_NUM, "div.epl-num");
selector!(EPISODE_SUB, "div.epl-sub");
selector!(EPISODE_DATE, "div.epl-date");
selector!(MIRROR, "select.mirror > option[data-index]");
selector!(IFRAME, "iframe[src]");

pub fn parse_status(status: Option<&str>) -> AnimeStatus {
    match status.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("completed" | "completo") => AnimeStatus::Completed,
        Some("ongoing" | "lançamento") => AnimeStatus::Ongoing,
        _ => AnimeStatus::Unknown,
    }
}

const PT_MONTHS: [(&str, &str); 12] = [
    ("janeiro", "January"),
    ("fevereiro", "February"),
    ("março", "March"),
    ("abril", "April"),
    ("maio", "May"),
    ("junho", "June"),
    ("julho", "July"),
    ("agosto", "August"),
    ("setembro", "September"),
    ("outubro", "October"),
    ("novembro", "November"),
    ("dezembro", "December"),
];

/// `MMMM d, yyyy` in English, or in Portuguese for pt-BR sites.
pub fn parse_date(raw: &str, lang: &str) -> Option<DateTime<Utc>> {
    let mut raw = raw.trim().to_string();
    if lang == "pt-BR" {
        let lower = raw.to_lowercase();
        if let Some((pt, en)) = PT_MONTHS.iter().find(|(pt, _)| lower.starts_with(pt)) {
            raw = format!("{en}{}", &lower[pt.len()..]);
        }
    }
    NaiveDate::parse_from_str(&raw, "%B %d, %Y")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn episode_prefix(lang: &str) -> &'static str {
    if lang == "pt-BR" { "Episódio" } else { "Episode" }
}

/// The most watched carousel of the home page; it has no pages.
pub fn parse_popular(html: &str, base_url: &str) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(&POPULAR_ITEM)
        .filter_map(|item| {
            let link = select_first(item, &POPULAR_LINK)?;
            let href = link.value().attr("href")?;
            Some(
                Anime::builder(url_without_domain(href), text(link))
                    .thumbnail_url_opt(select_first(item, &IMG).and_then(|img| image_url(img, base_url)))
                    .build(),
            )
        })
        .collect();
    AnimesPage::new(animes, false)
}

/// Search results and the latest updates share the listing markup.
pub fn parse_listing(html: &str, base_url: &str) -> AnimesPage {
    let document = Html::parse_document(html);
    let animes = document
        .select(&LIST_ITEM)
        .filter_map(|item| {
            let href = item.value().attr("href")?;
            let title = select_first(item, &LIST_TITLE).map(own_text)?;
            Some(
                Anime::builder(url_without_domain(href), title)
                    .thumbnail_url_opt(select_first(item, &IMG).and_then(|img| image_url(img, base_url)))
                    .build(),
            )
        })
        .collect();
    let has_next = document.select(&NEXT_PAGE).next().is_some();
    AnimesPage::new(animes, has_next)
}

/// Text of the first info span mentioning `label`: its link text, else its own text.
fn info(infos: ElementRef<'_>, label: &str) -> Option<String> {
    let span = infos.select(&SPAN).find(|span| text(*span).contains(label))?;
    let value = select_first(span, &LINK).map(text).unwrap_or_else(|| own_text(span));
    (!value.is_empty()).then_some(value)
}

pub fn parse_details(html: &str, url: &str, base_url: &str) -> Result<Anime, ExtractorError> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let title = select_first(root, &TITLE)
        .map(text)
        .ok_or_else(|| ExtractorError::missing("h1.entry-title"))?;
    let infos = select_first(root, &INFOS).ok_or_else(|| ExtractorError::missing("div.info-content"))?;

    let mut description = String::new();
    if let Some(content) = select_first(root, &CONTENT) {
        description.push_str(&text(content));
        description.push_str("\n\n");
    }
    for line in each_text(infos, &SPE_SPANS) {
        description.push_str(&line);
        description.push('\n');
    }

    Ok(Anime::builder(url_without_domain(url), title)
        .thumbnail_url_opt(select_first(root, &THUMB).and_then(|img| image_url(img, base_url)))
        .genre(each_text(infos, &GENRES).join(", "))
        .status(parse_status(info(infos, "Status").as_deref()))
        .artist_opt(info(infos, "tudio"))
        .author_opt(info(infos, "Fansub"))
        .description(description.trim_end().to_string())
        .build())
}

pub fn parse_episodes(html: &str, lang: &str) -> Vec<Episode> {
    let document = Html::parse_document(html);
    document
        .select(&EPISODE)
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let num = select_first(link, &EPISODE_NUM).map(text)?;
            let number = substring_before(&num, " ").parse().unwrap_or(0.0);
            Some(
                Episode::new(
                    url_without_domain(href),
                    format!("{} {num}", episode_prefix(lang)),
                    number,
                )
                .with_scanlator(select_first(link, &EPISODE_SUB).map(text).filter(|s| !s.is_empty()))
                .with_date_upload(
                    select_first(link, &EPISODE_DATE).and_then(|date| parse_date(&text(date), lang)),
                ),
            )
        })
        .collect()
}

/// `(mirror name, embed url)` for every mirror option.
///
/// Option values are base64 encoded `<iframe>` snippets.
pub fn parse_mirrors(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    document
        .select(&MIRROR)
        .filter_map(|option| {
            let value = option.value().attr("value")?;
            let snippet = base64::decode_to_string(value).ok()?;
            let fragment = Html::parse_fragment(&snippet);
            let src = fragment
                .select(&IFRAME)
                .filter_map(|iframe| iframe.value().attr("src"))
                .find(|src| !src.trim().is_empty())?;
            Some((text(option), fix_url(src)))
        })
        .collect()
}

pub fn search_url(base_url: &str, page: u32, query: &str, filters: &SearchFilters) -> String {
    if !query.is_empty() {
        return format!("{base_url}/page/{page}/?s={}", urlencoding::encode(query));
    }

    let mut multi = String::new();
    for key in ["genre", "season", "studio"] {
        for value in filters.get_all(key) {
            multi.push_str(&format!("{key}[]={}&", urlencoding::encode(value)));
        }
    }
    let single = |key: &str| filters.get(key).unwrap_or_default();
    format!(
        "{base_url}/anime/?page={page}&{multi}status={}&type={}&sub={}&order={}",
        single("status"),
        single("type"),
        single("sub"),
        single("order"),
    )
}

pub struct AnimeStream {
    instance: AnimeStreamInstance,
    base_url: String,
    extractor: Extractor,
    factory: HosterFactory,
    config: SourceConfig,
}

impl AnimeStream {
    pub fn new(instance: AnimeStreamInstance, client: Client, config: SourceConfig) -> Self {
        let base_url = config.base_url_or(instance.base_url);
        let mut extractor = Extractor::new(instance.name, client.clone());
        extractor.set_referer(&format!("{base_url}/"));
        Self {
            instance,
            base_url,
            extractor,
            factory: HosterFactory::new(client),
            config,
        }
    }

    fn anime_list_url(&self) -> String {
        format!("{}/anime", self.base_url)
    }

    fn rank(&self, videos: Vec<Video>) -> Vec<Video> {
        let mut videos = VideoSort::new()
            .quality_ignore_case(self.config.preferred_quality_or(DEFAULT_QUALITY))
            .sorted(videos);
        if let Some(lang) = self.config.preferred_sub_lang.as_deref() {
            sort_subtitles(&mut videos, lang);
        }
        videos
    }

    async fn details_by_path(&self, path: &str) -> Result<Anime, ExtractorError> {
        let url = self.absolute(path);
        let html = self.extractor.get_text(&url).await?;
        parse_details(&html, &url, &self.base_url)
    }
}

#[async_trait]
impl AnimeSource for AnimeStream {
    fn id(&self) -> &str {
        self.instance.id
    }

    fn name(&self) -> &str {
        self.instance.name
    }

    fn lang(&self) -> &str {
        self.instance.lang
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn filter_keys(&self) -> &'static [&'static str] {
        &["genre", "season", "studio", "status", "type", "sub", "order"]
    }

    async fn popular(&self, _page: u32) -> Result<AnimesPage, ExtractorError> {
        let html = self.extractor.get_text(&self.base_url).await?;
        Ok(parse_popular(&html, &self.base_url))
    }

    async fn latest(&self, page: u32) -> Result<AnimesPage, ExtractorError> {
        let url = format!("{}/?page={page}&order=update", self.anime_list_url());
        let html = self.extractor.get_text(&url).await?;
        Ok(parse_listing(&html, &self.base_url))
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<AnimesPage, ExtractorError> {
        if let Some(path) = query.strip_prefix(PATH_PREFIX) {
            let anime = self.details_by_path(&format!("/{}", path.trim_start_matches('/'))).await?;
            return Ok(AnimesPage::single(anime));
        }
        let url = search_url(&self.base_url, page, query, filters);
        debug!(source = %self.instance.name, url = %url, "Searching");
        let html = self.extractor.get_text(&url).await?;
        Ok(parse_listing(&html, &self.base_url))
    }

    async fn details(&self, anime: &Anime) -> Result<Anime, ExtractorError> {
        self.details_by_path(&anime.url).await
    }

    async fn episodes(&self, anime: &Anime) -> Result<Vec<Episode>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&anime.url)).await?;
        Ok(parse_episodes(&html, self.instance.lang))
    }

    async fn videos(&self, episode: &Episode) -> Result<Vec<Video>, ExtractorError> {
        let html = self.extractor.get_text(&self.absolute(&episode.url)).await?;
        let mirrors = parse_mirrors(&html);
        debug!(count = mirrors.len(), "Resolving mirrors");

        let factory = &self.factory;
        let videos = parallel_flatten(mirrors, move |(name, url)| async move {
            factory.videos_from_url(&url, &format!("{name} - ")).await
        })
        .await;

        Ok(self.rank(videos))
    }
}
