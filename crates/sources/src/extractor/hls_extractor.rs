use m3u8_rs::{AlternativeMediaType, Playlist};
use tracing::debug;

use super::error::ExtractorError;
use super::hoster_extractor::Extractor;
use super::utils::absolute_url;
use crate::media::{MediaFormat, Track, Video};

const STREAM_INF: &str = "#EXT-X-STREAM-INF:";

/// One `#EXT-X-STREAM-INF` entry of a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsVariant {
    // "1080p" from RESOLUTION=1920x1080
    pub resolution: String,
    pub url: String,
}

/// Split a master playlist into its variants.
///
/// Each `#EXT-X-STREAM-INF:` block yields one entry; the variant url is the
/// first non-comment line after the tag, resolved against `playlist_url`.
pub fn split_master_playlist(body: &str, playlist_url: &str) -> Vec<HlsVariant> {
    body.split(STREAM_INF)
        .skip(1)
        .filter_map(|block| {
            let mut lines = block.lines();
            let attributes = lines.next()?;
            let uri = lines
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('#'))?;
            Some(HlsVariant {
                resolution: resolution_label(attributes),
                url: absolute_url(playlist_url, uri),
            })
        })
        .collect()
}

fn resolution_label(attributes: &str) -> String {
    attributes
        .split(',')
        .find_map(|attr| attr.trim().strip_prefix("RESOLUTION="))
        .and_then(|res| res.split_once('x'))
        .map(|(_, height)| format!("{}p", height.trim()))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Subtitle and audio renditions declared with `#EXT-X-MEDIA`.
pub fn alternative_tracks(body: &str, playlist_url: &str) -> (Vec<Track>, Vec<Track>) {
    let mut subtitles = Vec::new();
    let mut audio = Vec::new();

    let Ok(Playlist::MasterPlaylist(playlist)) = m3u8_rs::parse_playlist_res(body.as_bytes())
    else {
        return (subtitles, audio);
    };

    for media in playlist.alternatives {
        let Some(uri) = media.uri else {
            continue;
        };
        let track = Track::new(absolute_url(playlist_url, &uri), media.name);
        match media.media_type {
            AlternativeMediaType::Subtitles => subtitles.push(track),
            AlternativeMediaType::Audio => audio.push(track),
            _ => {}
        }
    }

    (subtitles, audio)
}

/// Turn a fetched playlist into videos.
///
/// A master playlist yields one video per variant named by `name_for(resolution)`;
/// a media playlist yields a single video named `default_name`.
pub fn videos_from_playlist<F>(
    body: &str,
    playlist_url: &str,
    default_name: &str,
    name_for: F,
    extractor: &Extractor,
    mut subtitle_tracks: Vec<Track>,
) -> Vec<Video>
where
    F: Fn(&str) -> String,
{
    let headers = extractor.player_headers();

    if !body.contains(STREAM_INF) {
        return vec![
            Video::builder(playlist_url, default_name)
                .format(MediaFormat::Hls)
                .headers(headers)
                .subtitle_tracks(subtitle_tracks)
                .build(),
        ];
    }

    let (subtitles, audio) = alternative_tracks(body, playlist_url);
    subtitle_tracks.extend(subtitles);

    split_master_playlist(body, playlist_url)
        .into_iter()
        .map(|variant| {
            Video::builder(variant.url, name_for(&variant.resolution))
                .format(MediaFormat::Hls)
                .headers(headers.clone())
                .subtitle_tracks(subtitle_tracks.clone())
                .audio_tracks(audio.clone())
                .build()
        })
        .collect()
}

/// Fetch `playlist_url` with the extractor's headers and expand it.
pub async fn extract_from_hls<F>(
    extractor: &Extractor,
    playlist_url: &str,
    default_name: &str,
    name_for: F,
    subtitle_tracks: Vec<Track>,
) -> Result<Vec<Video>, ExtractorError>
where
    F: Fn(&str) -> String + Send,
{
    let response = extractor.get(playlist_url).send().await?.error_for_status()?;
    // relative variants resolve against where the playlist actually lives
    let final_url = response.url().to_string();
    let body = response.text().await?;

    if !body.trim_start().starts_with("#EXTM3U") {
        return Err(ExtractorError::HlsPlaylistError(format!(
            "not a playlist: {playlist_url}"
        )));
    }

    let videos = videos_from_playlist(
        &body,
        &final_url,
        default_name,
        name_for,
        extractor,
        subtitle_tracks,
    );
    debug!(url = %playlist_url, count = videos.len(), "Expanded HLS playlist");
    Ok(videos)
}
