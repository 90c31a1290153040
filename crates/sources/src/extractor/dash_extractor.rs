use super::error::ExtractorError;
use super::hoster_extractor::Extractor;
use super::utils::{absolute_url, between};
use crate::media::{MediaFormat, Track, Video};

/// A video `<Representation>` of a DASH manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashRepresentation {
    pub resolution: String,
    pub url: String,
}

/// Split an MPD on `<Representation`, keeping the ones that carry a height
/// and a `<BaseURL>`. Audio-only representations have no height and are skipped.
pub fn split_dash_manifest(body: &str, manifest_url: &str) -> Vec<DashRepresentation> {
    body.split("<Representation")
        .skip(1)
        .filter_map(|block| {
            let height = between(block, "height=\"", "\"")?;
            let base_url = between(block, "<BaseURL>", "</BaseURL>")?.trim();
            if base_url.is_empty() {
                return None;
            }
            Some(DashRepresentation {
                resolution: format!("{height}p"),
                url: absolute_url(manifest_url, &base_url.replace("&amp;", "&")),
            })
        })
        .collect()
}

pub async fn extract_from_dash<F>(
    extractor: &Extractor,
    manifest_url: &str,
    name_for: F,
    subtitle_tracks: Vec<Track>,
) -> Result<Vec<Video>, ExtractorError>
where
    F: Fn(&str) -> String + Send,
{
    let body = extractor.get_text(manifest_url).await?;
    let headers = extractor.player_headers();

    let videos: Vec<Video> = split_dash_manifest(&body, manifest_url)
        .into_iter()
        .map(|rep| {
            Video::builder(rep.url, name_for(&rep.resolution))
                .format(MediaFormat::Dash)
                .headers(headers.clone())
                .subtitle_tracks(subtitle_tracks.clone())
                .build()
        })
        .collect();

    if videos.is_empty() {
        return Err(ExtractorError::NoStreamsFound);
    }
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_dash_manifest() {
        let mpd = r#"<?xml version="1.0"?>
<MPD><Period><AdaptationSet mimeType="video/mp4">
<Representation id="1" bandwidth="4000000" width="1920" height="1080">
<BaseURL>https://cdn.example/v/1080.mp4?a=1&amp;b=2</BaseURL>
</Representation>
<Representation id="2" bandwidth="2000000" width="1280" height="720">
<BaseURL>720.mp4</BaseURL>
</Representation>
</AdaptationSet>
<AdaptationSet mimeType="audio/mp4">
<Representation id="3" bandwidth="128000">
<BaseURL>audio.mp4</BaseURL>
</Representation>
</AdaptationSet></Period></MPD>"#;
        let reps = split_dash_manifest(mpd, "https://cdn.example/v/manifest.mpd");
        assert_eq!(
            reps,
            vec![
                DashRepresentation {
                    resolution: "1080p".into(),
                    url: "https://cdn.example/v/1080.mp4?a=1&b=2".into(),
                },
                DashRepresentation {
                    resolution: "720p".into(),
                    url: "https://cdn.example/v/720.mp4".into(),
                },
            ]
        );
    }
}
