use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use serde::Serialize;
use sources_parser::{Anime, Episode, Hoster, SourceInfo, Video};
use std::borrow::Cow;
use std::io::Write;
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

/// A listing with its paging flag, as printed by `popular`, `latest` and `search`.
#[derive(Serialize)]
struct PageOutput<'a> {
    animes: &'a [Anime],
    #[serde(skip_serializing_if = "Option::is_none")]
    has_next_page: Option<bool>,
}

#[derive(Serialize)]
struct HostOutput {
    name: &'static str,
    domains: &'static [&'static str],
}

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_sources(&self, sources: &[SourceInfo], format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => {
                let mut output = String::new();
                output.push_str(&self.colorize("Available sources:", &Color::Green, true));
                output.push('\n');
                for source in sources {
                    output.push_str(&format!(
                        "  {:<14} {:<20} [{}] {}\n",
                        self.colorize(source.id, &Color::Yellow, false),
                        source.name,
                        self.colorize(source.lang, &Color::Cyan, false),
                        self.colorize(source.base_url, &Color::Blue, false)
                    ));
                }
                Ok(output)
            }
            OutputFormat::Json => Self::to_json(&sources, true),
            OutputFormat::JsonCompact => Self::to_json(&sources, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => {
                #[derive(Tabled)]
                struct SourceRow<'a> {
                    id: &'a str,
                    name: &'a str,
                    lang: &'a str,
                    base_url: &'a str,
                }

                let rows = sources.iter().map(|s| SourceRow {
                    id: s.id,
                    name: s.name,
                    lang: s.lang,
                    base_url: s.base_url,
                });
                Ok(Self::table(rows))
            }
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => self.format_sources(sources, &OutputFormat::Pretty),
            OutputFormat::Csv => Ok(Self::csv(
                &["id", "name", "lang", "base_url"],
                sources
                    .iter()
                    .map(|s| vec![s.id.into(), s.name.into(), s.lang.into(), s.base_url.into()]),
            )),
        }
    }

    pub fn format_hosts(&self, format: &OutputFormat) -> Result<String> {
        let hosts: Vec<HostOutput> = Hoster::all()
            .map(|hoster| HostOutput {
                name: hoster.as_str(),
                domains: hoster.needles(),
            })
            .collect();

        match format {
            OutputFormat::Pretty => {
                let mut output = String::new();
                output.push_str(&self.colorize("Supported hosts:", &Color::Green, true));
                output.push('\n');
                for host in &hosts {
                    output.push_str(&format!(
                        "  {:<16} {}\n",
                        self.colorize(host.name, &Color::Yellow, false),
                        self.colorize(&host.domains.join(", "), &Color::Cyan, false)
                    ));
                }
                Ok(output)
            }
            OutputFormat::Json => Self::to_json(&hosts, true),
            OutputFormat::JsonCompact => Self::to_json(&hosts, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => {
                #[derive(Tabled)]
                struct HostRow {
                    name: &'static str,
                    domains: String,
                }

                let rows = hosts.iter().map(|h| HostRow {
                    name: h.name,
                    domains: h.domains.join(", "),
                });
                Ok(Self::table(rows))
            }
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => self.format_hosts(&OutputFormat::Pretty),
            OutputFormat::Csv => Ok(Self::csv(
                &["name", "domains"],
                hosts
                    .iter()
                    .map(|h| vec![h.name.into(), h.domains.join(" ").into()]),
            )),
        }
    }

    /// A list of entries; `has_next_page` is shown for single pages only.
    pub fn format_animes(
        &self,
        animes: &[Anime],
        has_next_page: Option<bool>,
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Pretty => {
                let mut output = String::new();
                output.push_str(&self.colorize(
                    &format!("{} entries:", animes.len()),
                    &Color::Green,
                    true,
                ));
                output.push('\n');
                for anime in animes {
                    output.push_str(&format!(
                        "  {} {}\n",
                        self.colorize(&anime.title, &Color::Cyan, false),
                        self.colorize(&anime.url, &Color::Blue, false)
                    ));
                }
                if let Some(has_next) = has_next_page {
                    output.push_str(&format!(
                        "{}: {}\n",
                        self.colorize("Next page", &Color::Yellow, false),
                        has_next
                    ));
                }
                Ok(output)
            }
            OutputFormat::Json | OutputFormat::JsonCompact => Self::to_json(
                &PageOutput {
                    animes,
                    has_next_page,
                },
                matches!(format, OutputFormat::Json),
            ),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => {
                #[derive(Tabled)]
                struct AnimeRow<'a> {
                    title: &'a str,
                    url: &'a str,
                    thumbnail: &'a str,
                }

                let rows = animes.iter().map(|a| AnimeRow {
                    title: &a.title,
                    url: &a.url,
                    thumbnail: a.thumbnail_url.as_deref().unwrap_or(""),
                });
                Ok(Self::table(rows))
            }
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => self.format_animes(animes, has_next_page, &OutputFormat::Pretty),
            OutputFormat::Csv => Ok(Self::csv(
                &["title", "url", "thumbnail_url"],
                animes.iter().map(|a| {
                    vec![
                        a.title.as_str().into(),
                        a.url.as_str().into(),
                        a.thumbnail_url.as_deref().unwrap_or("").into(),
                    ]
                }),
            )),
        }
    }

    pub fn format_details(&self, anime: &Anime, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => {
                let mut output = anime.pretty_print(&[]);
                output.push('\n');
                if let Some(description) = anime.description.as_deref().filter(|d| !d.is_empty())
                {
                    output.push_str(&self.colorize("Description:", &Color::Green, true));
                    output.push('\n');
                    output.push_str(description);
                    output.push('\n');
                }
                Ok(output)
            }
            OutputFormat::Json => Self::to_json(anime, true),
            OutputFormat::JsonCompact => Self::to_json(anime, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => {
                #[derive(Tabled)]
                struct TableRow<'a> {
                    property: &'a str,
                    value: &'a str,
                }

                let rows = Self::detail_fields(anime)
                    .into_iter()
                    .map(|(property, value)| TableRow { property, value });
                Ok(Self::table(rows))
            }
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => self.format_details(anime, &OutputFormat::Pretty),
            OutputFormat::Csv => Ok(Self::csv(
                &["property", "value"],
                Self::detail_fields(anime)
                    .into_iter()
                    .map(|(property, value)| vec![property.into(), value.into()]),
            )),
        }
    }

    fn detail_fields(anime: &Anime) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("title", anime.title.as_str()),
            ("url", anime.url.as_str()),
            ("status", anime.status.as_str()),
        ];
        let optional = [
            ("thumbnail_url", &anime.thumbnail_url),
            ("genre", &anime.genre),
            ("author", &anime.author),
            ("artist", &anime.artist),
            ("description", &anime.description),
        ];
        for (property, value) in optional {
            if let Some(value) = value {
                fields.push((property, value.as_str()));
            }
        }
        fields
    }

    pub fn format_episodes(&self, episodes: &[Episode], format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => {
                let mut output = String::new();
                output.push_str(&self.colorize(
                    &format!("{} episodes:", episodes.len()),
                    &Color::Green,
                    true,
                ));
                output.push('\n');
                for episode in episodes {
                    output.push_str(&format!(
                        "  {:>6} {} {}",
                        episode.episode_number,
                        self.colorize(&episode.name, &Color::Cyan, false),
                        self.colorize(&episode.url, &Color::Blue, false)
                    ));
                    if let Some(scanlator) = &episode.scanlator {
                        output.push_str(&format!(" ({scanlator})"));
                    }
                    output.push('\n');
                }
                Ok(output)
            }
            OutputFormat::Json => Self::to_json(&episodes, true),
            OutputFormat::JsonCompact => Self::to_json(&episodes, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => {
                #[derive(Tabled)]
                struct EpisodeRow<'a> {
                    number: f32,
                    name: &'a str,
                    url: &'a str,
                    date: String,
                }

                let rows = episodes.iter().map(|e| EpisodeRow {
                    number: e.episode_number,
                    name: &e.name,
                    url: &e.url,
                    date: e
                        .date_upload
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_default(),
                });
                Ok(Self::table(rows))
            }
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => self.format_episodes(episodes, &OutputFormat::Pretty),
            OutputFormat::Csv => Ok(Self::csv(
                &["episode_number", "name", "url", "scanlator", "date_upload"],
                episodes.iter().map(|e| {
                    vec![
                        e.episode_number.to_string().into(),
                        e.name.as_str().into(),
                        e.url.as_str().into(),
                        e.scanlator.as_deref().unwrap_or("").into(),
                        e.date_upload
                            .map(|d| d.to_rfc3339())
                            .unwrap_or_default()
                            .into(),
                    ]
                }),
            )),
        }
    }

    pub fn format_videos(&self, videos: &[Video], format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => {
                let mut output = String::new();
                output.push_str(&self.colorize(
                    &format!("{} videos:", videos.len()),
                    &Color::Green,
                    true,
                ));
                output.push('\n');
                for (index, video) in videos.iter().enumerate() {
                    output.push_str(&format!(
                        "  {}. {} [{}]\n     {}\n",
                        index + 1,
                        self.colorize(&video.quality, &Color::Cyan, index == 0),
                        video.format.as_str(),
                        self.colorize(&video.url, &Color::Blue, false)
                    ));
                    if let Some(referer) = video.header("referer") {
                        output.push_str(&format!(
                            "     {}: {}\n",
                            self.colorize("Referer", &Color::Yellow, false),
                            referer
                        ));
                    }
                    for track in &video.subtitle_tracks {
                        output.push_str(&format!(
                            "     {} {}: {}\n",
                            self.colorize("Subtitle", &Color::Yellow, false),
                            track.lang,
                            track.url
                        ));
                    }
                    for track in &video.audio_tracks {
                        output.push_str(&format!(
                            "     {} {}: {}\n",
                            self.colorize("Audio", &Color::Yellow, false),
                            track.lang,
                            track.url
                        ));
                    }
                }
                Ok(output)
            }
            OutputFormat::Json => Self::to_json(&videos, true),
            OutputFormat::JsonCompact => Self::to_json(&videos, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => {
                #[derive(Tabled)]
                struct VideoRow<'a> {
                    quality: &'a str,
                    format: &'a str,
                    url: &'a str,
                    subtitles: usize,
                }

                let rows = videos.iter().map(|v| VideoRow {
                    quality: &v.quality,
                    format: v.format.as_str(),
                    url: &v.url,
                    subtitles: v.subtitle_tracks.len(),
                });
                Ok(Self::table(rows))
            }
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => self.format_videos(videos, &OutputFormat::Pretty),
            OutputFormat::Csv => Ok(Self::csv(
                &["quality", "format", "url", "referer"],
                videos.iter().map(|v| {
                    vec![
                        v.quality.as_str().into(),
                        v.format.as_str().into(),
                        v.url.as_str().into(),
                        v.header("referer").unwrap_or("").into(),
                    ]
                }),
            )),
        }
    }

    fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
        let mut output = if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }?;
        output.push('\n');
        Ok(output)
    }

    #[cfg(feature = "table-output")]
    fn table<R: Tabled>(rows: impl IntoIterator<Item = R>) -> String {
        let mut table = Table::new(rows).with(Style::modern()).to_string();
        table.push('\n');
        table
    }

    fn csv<'a>(headers: &[&str], records: impl Iterator<Item = Vec<Cow<'a, str>>>) -> String {
        let mut output = headers.join(",");
        output.push('\n');
        for record in records {
            let escaped: Vec<Cow<str>> = record.iter().map(|field| Self::escape_csv(field)).collect();
            output.push_str(&escaped.join(","));
            output.push('\n');
        }
        output
    }

    // Quote fields holding separators, doubling embedded quotes
    fn escape_csv(s: &str) -> Cow<'_, str> {
        if s.contains([',', '"', '\n']) {
            Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(s)
        }
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}

pub fn write_output(content: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sources_parser::media::AnimeStatus;

    fn sample_anime() -> Anime {
        Anime::builder("/anime/one-piece", "One Piece, the \"movie\"")
            .genre("Action")
            .status(AnimeStatus::Ongoing)
            .build()
    }

    #[test]
    fn test_csv_escapes_separators() {
        let output = OutputManager::new(false)
            .format_animes(&[sample_anime()], Some(true), &OutputFormat::Csv)
            .unwrap();
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("title,url,thumbnail_url"));
        assert_eq!(
            lines.next(),
            Some("\"One Piece, the \"\"movie\"\"\",/anime/one-piece,")
        );
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("a,b", "\"a,b\"")]
    #[case("say \"hi\"", "\"say \"\"hi\"\"\"")]
    #[case("two\nlines", "\"two\nlines\"")]
    fn test_escape_csv(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(OutputManager::escape_csv(raw), expected);
    }

    #[test]
    fn test_page_json_carries_next_flag() {
        let output = OutputManager::new(false)
            .format_animes(&[sample_anime()], Some(false), &OutputFormat::JsonCompact)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["has_next_page"], false);
        assert_eq!(value["animes"][0]["url"], "/anime/one-piece");

        let catalog = OutputManager::new(false)
            .format_animes(&[], None, &OutputFormat::JsonCompact)
            .unwrap();
        assert_eq!(catalog.trim(), r#"{"animes":[]}"#);
    }

    #[test]
    fn test_plain_videos_listing() {
        let video = Video::builder("https://cdn.example/master.m3u8", "Okru:1080p")
            .referer("https://ok.ru/")
            .build();
        let output = OutputManager::new(false)
            .format_videos(&[video], &OutputFormat::Pretty)
            .unwrap();
        assert!(output.starts_with("1 videos:\n"));
        assert!(output.contains("1. Okru:1080p [hls]"));
        assert!(output.contains("Referer: https://ok.ru/"));
    }

    #[test]
    fn test_details_fields_skip_missing() {
        let anime = sample_anime();
        let fields = OutputManager::detail_fields(&anime);
        let names: Vec<_> = fields.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["title", "url", "status", "genre"]);
    }
}
