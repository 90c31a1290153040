use serde::{Deserialize, Serialize};

use super::episode::Episode;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnimeStatus {
    #[default]
    Unknown,
    Ongoing,
    Completed,
}

impl AnimeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AnimeStatus::Unknown => "unknown",
            AnimeStatus::Ongoing => "ongoing",
            AnimeStatus::Completed => "completed",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// A catalog entry, optionally filled in with its detail page.
///
/// Listing pages usually only provide `url`, `title` and `thumbnail_url`;
/// [`AnimeSource::details`](crate::source::AnimeSource::details) fills the rest.
///
/// # Examples
///
/// ```rust
/// use sources_parser::media::{Anime, AnimeStatus};
///
/// let anime = Anime::builder("/anime/one-piece/", "One Piece")
///     .thumbnail_url("https://example.com/cover.jpg")
///     .genre("Action, Adventure")
///     .status(AnimeStatus::Ongoing)
///     .build();
/// assert_eq!(anime.status, AnimeStatus::Ongoing);
/// ```
pub struct Anime {
    // Path relative to the source base url
    pub url: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub artist: Option<String>,
    #[serde(default)]
    pub status: AnimeStatus,
}

#[derive(Debug, Clone)]
pub struct AnimeBuilder {
    url: String,
    title: String,
    thumbnail_url: Option<String>,
    description: Option<String>,
    genre: Option<String>,
    author: Option<String>,
    artist: Option<String>,
    status: AnimeStatus,
}

impl Anime {
    pub fn builder(url: impl Into<String>, title: impl Into<String>) -> AnimeBuilder {
        AnimeBuilder::new(url, title)
    }

    /// An entry that only knows its url, used when a search prefix points at a detail page.
    pub fn from_url(url: impl Into<String>) -> Self {
        AnimeBuilder::new(url, "").build()
    }

    /// Serialize the Anime to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize the Anime to a pretty-formatted JSON string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Returns a boxed, human readable summary of the entry and its episodes.
    pub fn pretty_print(&self, episodes: &[Episode]) -> String {
        use std::fmt::Write;

        let mut output = String::new();
        let width = 60;
        let border_top = format!("╔{}╗", "═".repeat(width));
        let border_bottom = format!("╚{}╝", "═".repeat(width));
        let separator = format!("╠{}╣", "═".repeat(width));
        let thin_separator = format!("╟{}╢", "─".repeat(width));

        let format_line = |label: &str, value: &str| -> String {
            let content = format!("  {} {}", label, truncate(value, width.saturating_sub(label.len() + 4)));
            let padding = width.saturating_sub(content.chars().count());
            format!("║{}{}║", content, " ".repeat(padding))
        };

        let format_title = |title: &str| -> String {
            let padding_total = width.saturating_sub(title.chars().count());
            let left_pad = padding_total / 2;
            let right_pad = padding_total - left_pad;
            format!("║{}{}{}║", " ".repeat(left_pad), title, " ".repeat(right_pad))
        };

        let _ = writeln!(output, "{}", border_top);
        let _ = writeln!(output, "{}", format_title(&truncate(&self.title, width)));
        let _ = writeln!(output, "{}", separator);
        let _ = writeln!(output, "{}", format_line("Url:", &self.url));
        let _ = writeln!(output, "{}", format_line("Status:", self.status.as_str()));

        if let Some(ref genre) = self.genre
            && !genre.is_empty()
        {
            let _ = writeln!(output, "{}", format_line("Genre:", genre));
        }
        if let Some(ref author) = self.author {
            let _ = writeln!(output, "{}", format_line("Author:", author));
        }
        if let Some(ref artist) = self.artist {
            let _ = writeln!(output, "{}", format_line("Studio:", artist));
        }
        if let Some(ref cover) = self.thumbnail_url {
            let _ = writeln!(output, "{}", format_line("Cover:", cover));
        }

        if !episodes.is_empty() {
            let _ = writeln!(output, "{}", thin_separator);
            let _ = writeln!(output, "{}", format_title("EPISODES"));
            for episode in episodes {
                let _ = writeln!(output, "{}", format_line("•", &episode.name));
            }
        }

        let _ = write!(output, "{}", border_bottom);
        output
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let cut: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        value.to_string()
    }
}

impl AnimeBuilder {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            thumbnail_url: None,
            description: None,
            genre: None,
            author: None,
            artist: None,
            status: AnimeStatus::Unknown,
        }
    }

    pub fn thumbnail_url(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    pub fn thumbnail_url_opt(mut self, thumbnail_url: Option<String>) -> Self {
        self.thumbnail_url = thumbnail_url;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn description_opt(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn genre_opt(mut self, genre: Option<String>) -> Self {
        self.genre = genre;
        self
    }

    pub fn author_opt(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn artist_opt(mut self, artist: Option<String>) -> Self {
        self.artist = artist;
        self
    }

    pub fn status(mut self, status: AnimeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Anime {
        Anime {
            url: self.url,
            title: self.title,
            thumbnail_url: self.thumbnail_url,
            description: self.description,
            genre: self.genre,
            author: self.author,
            artist: self.artist,
            status: self.status,
        }
    }
}

/// One page of catalog results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AnimesPage {
    pub animes: Vec<Anime>,
    pub has_next_page: bool,
}

impl AnimesPage {
    pub fn new(animes: Vec<Anime>, has_next_page: bool) -> Self {
        Self {
            animes,
            has_next_page,
        }
    }

    pub fn single(anime: Anime) -> Self {
        Self::new(vec![anime], false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_print_lists_episodes() {
        let anime = Anime::builder("/anime/frieren/", "Sousou no Frieren")
            .status(AnimeStatus::Completed)
            .build();
        let episodes = vec![Episode::new("/frieren-episode-1/", "Episode 1", 1.0)];
        let out = anime.pretty_print(&episodes);
        assert!(out.contains("Sousou no Frieren"));
        assert!(out.contains("completed"));
        assert!(out.contains("Episode 1"));
    }

    #[test]
    fn test_json_round_trip_keeps_status() {
        let anime = Anime::builder("/a/", "A").build();
        let json = anime.to_json().unwrap();
        let back: Anime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, anime);
    }
}
