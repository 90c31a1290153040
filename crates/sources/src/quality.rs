//! Preference-driven ordering of resolved videos.
//!
//! Sources rank their candidates so the one a player should pick first comes
//! first. A [`VideoSort`] lists the criteria in priority order; every
//! criterion yields a number per video and videos are ordered by the
//! resulting tuple, highest first. The sort is stable, so videos that compare
//! equal keep the order the decoders produced them in, and sorting a sorted
//! list changes nothing.

use std::cmp::Reverse;
use std::sync::LazyLock;

use regex::Regex;

use crate::media::{Track, Video};

static RESOLUTION_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)p").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum SortKey {
    // label contains the needle
    Contains { needle: String, ignore_case: bool },
    // numeric part of "(\d+)p"
    Resolution,
}

impl SortKey {
    fn score(&self, quality: &str) -> u32 {
        match self {
            SortKey::Contains { needle, ignore_case } => {
                let hit = if *ignore_case {
                    quality.to_lowercase().contains(&needle.to_lowercase())
                } else {
                    quality.contains(needle.as_str())
                };
                u32::from(hit)
            }
            SortKey::Resolution => resolution_of(quality).unwrap_or(0),
        }
    }
}

/// The resolution number in a quality label, e.g. `1080` for `"Okru:1080p"`.
pub fn resolution_of(quality: &str) -> Option<u32> {
    RESOLUTION_REGEX
        .captures(quality)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Ordered sort criteria; earlier criteria dominate later ones.
///
/// ```rust
/// use sources_parser::quality::VideoSort;
/// use sources_parser::Video;
///
/// let mut videos = vec![
///     Video::new("https://a/1", "Okru:480p"),
///     Video::new("https://a/2", "StreamTape"),
///     Video::new("https://a/3", "Okru:1080p"),
/// ];
/// VideoSort::new().server("okru").quality("1080").by_resolution().sort(&mut videos);
/// assert_eq!(videos[0].quality, "Okru:1080p");
/// assert_eq!(videos[2].quality, "StreamTape");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoSort {
    keys: Vec<SortKey>,
}

impl VideoSort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefer labels naming `server`, ignoring case.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.keys.push(SortKey::Contains {
            needle: server.into(),
            ignore_case: true,
        });
        self
    }

    /// Prefer labels containing `quality` verbatim.
    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.keys.push(SortKey::Contains {
            needle: quality.into(),
            ignore_case: false,
        });
        self
    }

    pub fn quality_ignore_case(mut self, quality: impl Into<String>) -> Self {
        self.keys.push(SortKey::Contains {
            needle: quality.into(),
            ignore_case: true,
        });
        self
    }

    /// Break ties by the numeric resolution, higher first.
    pub fn by_resolution(mut self) -> Self {
        self.keys.push(SortKey::Resolution);
        self
    }

    /// Skip a criterion whose preference is unset.
    pub fn server_opt(self, server: Option<&str>) -> Self {
        match server {
            Some(server) if !server.is_empty() => self.server(server),
            _ => self,
        }
    }

    pub fn quality_opt(self, quality: Option<&str>) -> Self {
        match quality {
            Some(quality) if !quality.is_empty() => self.quality(quality),
            _ => self,
        }
    }

    fn key(&self, video: &Video) -> Vec<u32> {
        self.keys.iter().map(|k| k.score(&video.quality)).collect()
    }

    pub fn sort(&self, videos: &mut [Video]) {
        if self.keys.is_empty() {
            return;
        }
        videos.sort_by_cached_key(|video| Reverse(self.key(video)));
    }

    pub fn sorted(&self, mut videos: Vec<Video>) -> Vec<Video> {
        self.sort(&mut videos);
        videos
    }
}

/// Move videos whose label equals `label` to the front, keeping relative order.
pub fn prefer_exact(videos: Vec<Video>, label: &str) -> Vec<Video> {
    let (mut preferred, rest): (Vec<_>, Vec<_>) =
        videos.into_iter().partition(|v| v.quality == label);
    preferred.extend(rest);
    preferred
}

/// Float subtitle or audio tracks whose label mentions `lang` to the front.
pub fn sort_tracks(tracks: &mut [Track], lang: &str) {
    let needle = lang.to_lowercase();
    tracks.sort_by_cached_key(|track| !track.lang.to_lowercase().contains(&needle));
}

/// [`sort_tracks`] over the subtitles of every video.
pub fn sort_subtitles(videos: &mut [Video], lang: &str) {
    for video in videos {
        sort_tracks(&mut video.subtitle_tracks, lang);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn videos(labels: &[&str]) -> Vec<Video> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| Video::new(format!("https://cdn.example/{i}"), *label))
            .collect()
    }

    fn labels(videos: &[Video]) -> Vec<&str> {
        videos.iter().map(|v| v.quality.as_str()).collect()
    }

    #[test]
    fn test_server_then_quality_then_resolution() {
        let sort = VideoSort::new().server("Okru").quality("720").by_resolution();
        let sorted = sort.sorted(videos(&[
            "StreamTape",
            "Okru:360p",
            "Okru:720p",
            "YourUpload",
            "Okru:1080p",
        ]));
        assert_eq!(
            labels(&sorted),
            ["Okru:720p", "Okru:1080p", "Okru:360p", "StreamTape", "YourUpload"]
        );
    }

    #[test]
    fn test_sort_is_idempotent() {
        let sort = VideoSort::new().quality("720p").server("sapphireduck");
        let once = sort.sorted(videos(&[
            "PinkBird - 1080p",
            "SapphireDuck - 720p",
            "PinkBird - 720p",
            "SapphireDuck - 1080p",
        ]));
        let twice = sort.sorted(once.clone());
        assert_eq!(once, twice);
        assert_eq!(
            labels(&once),
            [
                "SapphireDuck - 720p",
                "PinkBird - 720p",
                "SapphireDuck - 1080p",
                "PinkBird - 1080p"
            ]
        );
    }

    #[test]
    fn test_ties_keep_input_order() {
        let sort = VideoSort::new().quality("1080");
        let input = videos(&["b", "a", "c"]);
        assert_eq!(sort.sorted(input.clone()), input);
    }

    #[test]
    fn test_empty_preference_is_a_no_op() {
        let input = videos(&["360p", "1080p"]);
        let sort = VideoSort::new().quality_opt(None).server_opt(Some(""));
        assert_eq!(sort.sorted(input.clone()), input);
    }

    #[test]
    fn test_quality_case_sensitivity() {
        let input = videos(&["Sub 720P", "Dub 720p"]);
        assert_eq!(
            labels(&VideoSort::new().quality("720P").sorted(input.clone())),
            ["Sub 720P", "Dub 720p"]
        );
        assert_eq!(
            labels(&VideoSort::new().quality_ignore_case("720p").sorted(input)),
            ["Sub 720P", "Dub 720p"]
        );
    }

    #[test]
    fn test_prefer_exact() {
        let sorted = prefer_exact(videos(&["Xtreme S", "Nozomi", "Desu", "Nozomi"]), "Nozomi");
        assert_eq!(labels(&sorted), ["Nozomi", "Nozomi", "Xtreme S", "Desu"]);
        assert_eq!(prefer_exact(sorted.clone(), "Nozomi"), sorted);
    }

    #[rstest]
    #[case("Okru:1080p", Some(1080))]
    #[case("PinkBird - 720p", Some(720))]
    #[case("Original (Default - 480p)", Some(480))]
    #[case("StreamTape", None)]
    fn test_resolution_of(#[case] label: &str, #[case] expected: Option<u32>) {
        assert_eq!(resolution_of(label), expected);
    }

    #[test]
    fn test_sort_tracks() {
        let mut tracks = vec![
            Track::new("a", "Spanish"),
            Track::new("b", "English"),
            Track::new("c", "English (SDH)"),
        ];
        sort_tracks(&mut tracks, "english");
        let order: Vec<_> = tracks.iter().map(|t| t.url.as_str()).collect();
        assert_eq!(order, ["b", "c", "a"]);
    }

    #[test]
    fn test_sort_subtitles_of_every_video() {
        let tracks = vec![Track::new("es.vtt", "Spanish (es)"), Track::new("en.vtt", "English (en-US)")];
        let mut videos = vec![
            Video::builder("https://cdn.example/1", "a").subtitle_tracks(tracks.clone()).build(),
            Video::builder("https://cdn.example/2", "b").subtitle_tracks(tracks).build(),
        ];
        sort_subtitles(&mut videos, "en-US");
        for video in &videos {
            assert_eq!(video.subtitle_tracks[0].url, "en.vtt");
        }
    }
}
