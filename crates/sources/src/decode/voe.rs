use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::Value;

use super::base64;
use crate::extractor::error::ExtractorError;
use crate::extractor::utils::between_non_empty;

static JSON_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/json"]"#).unwrap());

const MARKERS: [&str; 7] = ["@$", "^^", "~@", "%?", "*~", "!!", "#&"];

fn rot13(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'a'..='z' => (((c as u8 - b'a') + 13) % 26 + b'a') as char,
            'A'..='Z' => (((c as u8 - b'A') + 13) % 26 + b'A') as char,
            _ => c,
        })
        .collect()
}

/// Decode the obfuscated payload of a Voe page into its JSON object.
///
/// rot13, marker strip, base64, shift every char by -3, reverse, base64.
pub fn decode_payload(encoded: &str) -> Result<Value, ExtractorError> {
    let mut step = rot13(encoded);
    for marker in MARKERS {
        step = step.replace(marker, "_");
    }
    step.retain(|c| c != '_');

    let shifted: String = base64::decode_to_string(&step)?
        .chars()
        .map(|c| char::from_u32((c as u32).saturating_sub(3)).unwrap_or(c))
        .collect();
    let reversed: String = shifted.chars().rev().collect();

    let json = base64::decode_to_string(&reversed)?;
    Ok(serde_json::from_str(&json)?)
}

/// The encoded string stored as `["..."]` in the page's JSON script tag.
pub fn encoded_payload(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&JSON_SCRIPT).find_map(|script| {
        let text = script.text().collect::<String>();
        between_non_empty(&text, "[\"", "\"]").map(ToOwned::to_owned)
    })
}

/// Older pages expose the playlist as `'hls': '...'`, sometimes base64 encoded.
pub fn legacy_hls(html: &str) -> Option<String> {
    let value = between_non_empty(html, "'hls': '", "'")?;
    if value.starts_with("aHR0") {
        base64::decode_to_string(value).ok()
    } else {
        Some(value.to_string())
    }
}

/// The stream url of a Voe page, trying the encoded payload first.
pub fn stream_url(html: &str) -> Option<String> {
    if let Some(encoded) = encoded_payload(html)
        && let Ok(json) = decode_payload(&encoded)
        && let Some(source) = json
            .get("source")
            .or_else(|| json.get("direct_access_url"))
            .and_then(Value::as_str)
    {
        return Some(source.to_string());
    }
    legacy_hls(html)
}
