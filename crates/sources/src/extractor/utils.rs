use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::extractor::error::ExtractorError;

// The substring helpers return the input unchanged when the delimiter is
// missing. Decoders rely on that to degrade into an empty result instead of
// failing half way through a chain of offsets.

#[inline]
pub fn substring_after<'a>(input: &'a str, delimiter: &str) -> &'a str {
    input
        .find(delimiter)
        .map(|i| &input[i + delimiter.len()..])
        .unwrap_or(input)
}

#[inline]
pub fn substring_after_last<'a>(input: &'a str, delimiter: &str) -> &'a str {
    input
        .rfind(delimiter)
        .map(|i| &input[i + delimiter.len()..])
        .unwrap_or(input)
}

#[inline]
pub fn substring_before<'a>(input: &'a str, delimiter: &str) -> &'a str {
    input.find(delimiter).map(|i| &input[..i]).unwrap_or(input)
}

#[inline]
pub fn substring_before_last<'a>(input: &'a str, delimiter: &str) -> &'a str {
    input.rfind(delimiter).map(|i| &input[..i]).unwrap_or(input)
}

/// Text between `start` and the following `end`, or `None` if `start` is absent.
#[inline]
pub fn between<'a>(input: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = input.find(start)? + start.len();
    let rest = &input[from..];
    Some(rest.find(end).map(|i| &rest[..i]).unwrap_or(rest))
}

/// Like [`between`] but `None` when the value is blank.
#[inline]
pub fn between_non_empty<'a>(input: &'a str, start: &str, end: &str) -> Option<&'a str> {
    between(input, start, end)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[inline]
pub fn capture_group_1_owned(re: &Regex, input: &str) -> Option<String> {
    capture_group_1(re, input).map(ToOwned::to_owned)
}

/// Add a scheme to protocol relative urls (`//host/path`).
pub fn fix_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("https:{url}")
    }
}

/// Resolve `href` against `base`, keeping `href` as is when either fails to parse.
pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Strip scheme and host, the way catalog entries store their url.
pub fn url_without_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let mut out = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                out.push('?');
                out.push_str(query);
            }
            if let Some(fragment) = parsed.fragment() {
                out.push('#');
                out.push_str(fragment);
            }
            out
        }
        Err(_) => url.to_string(),
    }
}

/// `scheme://host[:port]` of a url.
pub fn url_origin(url: &str) -> Result<String, ExtractorError> {
    let parsed = Url::parse(url).map_err(|_| ExtractorError::InvalidUrl(url.to_string()))?;
    Ok(parsed.origin().ascii_serialization())
}

static FILE_FIELD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"file\s*:\s*["']([^"']+)["']"#).unwrap());

/// The first quoted `file:` value of a player setup, the way jwplayer and
/// clappr configs name their source.
pub fn file_field(script: &str) -> Option<String> {
    capture_group_1_owned(&FILE_FIELD_REGEX, script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_helpers_keep_input_when_missing() {
        let s = "file:\"https://a/b.m3u8\",label";
        assert_eq!(substring_after(s, "file:\""), "https://a/b.m3u8\",label");
        assert_eq!(substring_before(substring_after(s, "file:\""), "\""), "https://a/b.m3u8");
        assert_eq!(substring_after(s, "nope"), s);
        assert_eq!(substring_before(s, "nope"), s);
        assert_eq!(substring_after_last("a/b/c", "/"), "c");
        assert_eq!(substring_before_last("a/b/c", "/"), "a/b");
    }

    #[test]
    fn test_between() {
        assert_eq!(between("x = 'abc';", "'", "'"), Some("abc"));
        assert_eq!(between("x = 'abc", "'", "'"), Some("abc"));
        assert_eq!(between("x = abc", "'", "'"), None);
        assert_eq!(between_non_empty("a='' ", "'", "'"), None);
    }

    #[test]
    fn test_file_field() {
        assert_eq!(
            file_field("sources: [{file:\"https://a/b.m3u8\"}]").as_deref(),
            Some("https://a/b.m3u8")
        );
        assert_eq!(file_field("{file : 'x.mp4', label: 'hd'}").as_deref(), Some("x.mp4"));
        assert_eq!(file_field("var a = 1;"), None);
    }

    #[test]
    fn test_fix_url() {
        assert_eq!(fix_url("//ok.ru/videoembed/1"), "https://ok.ru/videoembed/1");
        assert_eq!(fix_url("https://a.b/c"), "https://a.b/c");
    }

    #[test]
    fn test_url_helpers() {
        assert_eq!(
            absolute_url("https://cdn.example/hls/master.m3u8", "720/index.m3u8"),
            "https://cdn.example/hls/720/index.m3u8"
        );
        assert_eq!(
            url_without_domain("https://site.example/anime/one/?x=1"),
            "/anime/one/?x=1"
        );
        assert_eq!(
            url_origin("https://dood.example:8443/e/abc").unwrap(),
            "https://dood.example:8443"
        );
    }
}
